//! Storyboard assembly.
//!
//! The app entry module evaluates to a `Storyboard`: lowered routes, component
//! definitions and the loaded resources. `finalize` folds resources and
//! components into `meta`, which is the document shape the renderer reads.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::descriptor::{Component, Descriptor, Lowered, Route};
use crate::error::{Error, Result};
use crate::loader::FunctionResource;

pub const STORYBOARD_JSON: &str = "storyboard.json";
pub const STORYBOARD_YAML: &str = "storyboard.yaml";

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    /// Extra `meta` entries, merged first.
    pub meta: IndexMap<String, Value>,
    pub functions: IndexMap<String, FunctionResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menus: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contracts: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub i18n: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct Storyboard {
    pub routes: Vec<Route>,
    pub components: Vec<Component>,
    pub resources: Resources,
    /// Any other top-level entries (`app`, ...), kept as is.
    pub extra: IndexMap<String, Value>,
}

impl Storyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a lowered route or component definition. Other shapes are returned back.
    pub fn push(&mut self, lowered: Lowered) -> std::result::Result<(), Lowered> {
        match lowered {
            Lowered::Component(component) => self.components.push(component),
            Lowered::Descriptor(Descriptor::Route(route)) => self.routes.push(route),
            other => return Err(other),
        }
        Ok(())
    }

    /// Build the renderer document.
    pub fn finalize(&self) -> Result<Value> {
        let mut doc = Map::new();
        doc.insert("routes".to_string(), serde_json::to_value(&self.routes)?);
        for (key, value) in &self.extra {
            doc.insert(key.clone(), value.clone());
        }

        let mut meta = Map::new();
        for (key, value) in &self.resources.meta {
            meta.insert(key.clone(), value.clone());
        }
        meta.insert(
            "customTemplates".to_string(),
            serde_json::to_value(&self.components)?,
        );
        let functions: Vec<&FunctionResource> = self.resources.functions.values().collect();
        meta.insert("functions".to_string(), serde_json::to_value(functions)?);
        let optional = [
            ("menus", &self.resources.menus),
            ("contracts", &self.resources.contracts),
            ("i18n", &self.resources.i18n),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                meta.insert(key.to_string(), value.clone());
            }
        }
        doc.insert("meta".to_string(), Value::Object(meta));

        Ok(Value::Object(doc))
    }

    /// Write `storyboard.json` and `storyboard.yaml` into `dir`.
    pub fn write_storyboard(&self, dir: &Path) -> Result<(PathBuf, PathBuf)> {
        let doc = self.finalize()?;
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

        let json_path = dir.join(STORYBOARD_JSON);
        let json = serde_json::to_string_pretty(&doc)?;
        fs::write(&json_path, json).map_err(|e| Error::io(&json_path, e))?;

        let yaml_path = dir.join(STORYBOARD_YAML);
        let yaml = serde_yaml::to_string(&doc)?;
        fs::write(&yaml_path, yaml).map_err(|e| Error::io(&yaml_path, e))?;

        info!(dir = %dir.display(), routes = self.routes.len(), "storyboard written");
        Ok((json_path, yaml_path))
    }
}
