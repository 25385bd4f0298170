//! Project and extraction configuration.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

lazy_static! {
    /// Host built-ins that the renderer's expression engine provides.
    pub static ref BUILTIN_GLOBALS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("Array");
        s.insert("Boolean");
        s.insert("Date");
        s.insert("Infinity");
        s.insert("JSON");
        s.insert("Math");
        s.insert("NaN");
        s.insert("Number");
        s.insert("Object");
        s.insert("String");
        s.insert("atob");
        s.insert("btoa");
        s.insert("decodeURI");
        s.insert("decodeURIComponent");
        s.insert("encodeURI");
        s.insert("encodeURIComponent");
        s.insert("isFinite");
        s.insert("isNaN");
        s.insert("parseFloat");
        s.insert("parseInt");
        s.insert("undefined");
        s
    };
}

pub const CONFIG_FILE_NAME: &str = "next-jsx.config.json";

// ═══════════════════════════════════════════════════════════════════════════════
// EXTRACTION OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Names of the framework symbols recognized by Expression Extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractOptions {
    /// Module whose imports are compile-time markers only.
    pub runtime_module: String,
    /// Module that provides the JSX runtime and the resource loaders.
    pub jsx_module: String,
    pub reactive_marker: String,
    pub recursive_marker: String,
    pub style_loader: String,
    pub function_loader: String,
    /// Default-imported name that binds the functions resource.
    pub resource_binding: String,
    /// Ordered, so serialized options are stable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builtin_globals: Option<BTreeSet<String>>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            runtime_module: "next-jsx/runtime".to_string(),
            jsx_module: "next-jsx".to_string(),
            reactive_marker: "bind".to_string(),
            recursive_marker: "recursive".to_string(),
            style_loader: "loadStyleText".to_string(),
            function_loader: "loadFunction".to_string(),
            resource_binding: "FN".to_string(),
            builtin_globals: None,
        }
    }
}

impl ExtractOptions {
    pub fn is_builtin_global(&self, name: &str) -> bool {
        match &self.builtin_globals {
            Some(globals) => globals.contains(name),
            None => BUILTIN_GLOBALS.contains(name),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROJECT CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// A source file or directory (relative to `src_dir`) whose expressions are extracted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub path: PathBuf,
    #[serde(default)]
    pub process_css: bool,
}

impl Target {
    pub fn new(path: impl Into<PathBuf>, process_css: bool) -> Self {
        Target {
            path: path.into(),
            process_css,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub app_id: Option<String>,
    pub src_dir: PathBuf,
    pub out_dir: PathBuf,
    pub cache_dir: Option<PathBuf>,
    pub functions_index: PathBuf,
    pub targets: Vec<Target>,
    pub extract: ExtractOptions,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            app_id: None,
            src_dir: PathBuf::from("src"),
            out_dir: PathBuf::from("temp"),
            cache_dir: None,
            functions_index: PathBuf::from("resources/functions/index.js"),
            targets: vec![
                Target::new("routes.jsx", false),
                Target::new("views", true),
                Target::new("components", true),
                Target::new("resources/menus", false),
            ],
            extract: ExtractOptions::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let data = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Load `next-jsx.config.json` from `root`, falling back to defaults when absent.
    pub fn discover(root: &Path) -> Result<Config> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.exists() {
            Config::load(&path)
        } else {
            Ok(Config::default())
        }
    }

    /// `mock-micro-apps/<appId>` under `root`, where the storyboard is written.
    pub fn storyboard_dir(&self, root: &Path) -> Option<PathBuf> {
        self.app_id
            .as_ref()
            .map(|app_id| root.join("mock-micro-apps").join(app_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_framework_names() {
        let options = ExtractOptions::default();
        assert_eq!(options.runtime_module, "next-jsx/runtime");
        assert_eq!(options.reactive_marker, "bind");
        assert!(options.is_builtin_global("Math"));
        assert!(!options.is_builtin_global("location"));
        assert_eq!(BUILTIN_GLOBALS.len(), 21);
        assert!(BUILTIN_GLOBALS.contains("undefined"));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "appId": "demo", "extract": { "resourceBinding": "FUNCS" } }"#)
                .unwrap();
        assert_eq!(config.app_id.as_deref(), Some("demo"));
        assert_eq!(config.extract.resource_binding, "FUNCS");
        assert_eq!(config.extract.jsx_module, "next-jsx");
        assert_eq!(config.targets.len(), 4);
        assert_eq!(config.out_dir, PathBuf::from("temp"));
        assert_eq!(
            config.storyboard_dir(Path::new("/app")),
            Some(PathBuf::from("/app/mock-micro-apps/demo"))
        );
        assert_eq!(Config::default().storyboard_dir(Path::new("/app")), None);
    }

    #[test]
    fn test_discover_reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::discover(dir.path()).unwrap().app_id, None);

        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{ "appId": "demo", "targets": [{ "path": "views", "processCss": true }] }"#,
        )
        .unwrap();
        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.app_id.as_deref(), Some("demo"));
        assert_eq!(config.targets, vec![Target::new("views", true)]);

        fs::write(dir.path().join(CONFIG_FILE_NAME), "{").unwrap();
        assert!(matches!(Config::discover(dir.path()), Err(Error::Json(_))));
    }

    #[test]
    fn test_custom_builtin_globals() {
        let options: ExtractOptions =
            serde_json::from_str(r#"{ "builtinGlobals": ["location"] }"#).unwrap();
        assert!(options.is_builtin_global("location"));
        assert!(!options.is_builtin_global("Math"));
    }
}
