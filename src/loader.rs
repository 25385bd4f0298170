//! Resource loaders.
//!
//! Generated modules call these with a module-relative URL and `import.meta.url`
//! of the calling module. `from` may be a `file://` URL or a plain path.

use oxc_allocator::{Allocator, CloneIn};
use oxc_ast::ast::{ExportDefaultDeclarationKind, Statement};
use oxc_ast::AstBuilder;
use oxc_codegen::Codegen;
use oxc_span::SourceType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};
use crate::extract::parse_module;

/// A function resource as listed in the storyboard's `meta.functions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResource {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typescript: Option<bool>,
    pub source: String,
}

/// Resolve `url` against the directory holding `from`.
pub fn resolve_relative(url: &str, from: &str) -> PathBuf {
    let from = Path::new(from.strip_prefix("file://").unwrap_or(from));
    from.parent().unwrap_or_else(|| Path::new("")).join(url)
}

/// Load a function resource, stripped of its imports and default export wrapper.
pub fn load_function(url: &str, from: &str) -> Result<FunctionResource> {
    let js_path = resolve_relative(url, from);
    let ts_path = match js_path.to_str().and_then(|p| p.strip_suffix(".js")) {
        Some(stem) => PathBuf::from(format!("{}.ts", stem)),
        None => js_path.clone(),
    };
    let typescript = !js_path.exists() && ts_path.exists();
    let path = if typescript { ts_path } else { js_path };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .and_then(|n| n.split('.').next().map(str::to_string))
        .unwrap_or_default();
    let source = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
    debug!(function = %name, path = %path.display(), typescript, "loading function");

    let source_type = SourceType::default()
        .with_module(true)
        .with_typescript(typescript);
    Ok(FunctionResource {
        name,
        typescript: typescript.then_some(true),
        source: strip_module_syntax(&source, &path.to_string_lossy(), source_type)?,
    })
}

/// Raw text of a stylesheet next to the calling module.
pub fn load_style_text(url: &str, from: &str) -> Result<String> {
    let path = resolve_relative(url, from);
    fs::read_to_string(&path).map_err(|e| Error::io(&path, e))
}

/// Drop every import and unwrap `export default` into a bare statement.
fn strip_module_syntax(source: &str, file_path: &str, source_type: SourceType) -> Result<String> {
    let allocator = Allocator::default();
    let mut program = parse_module(&allocator, source, file_path, source_type)?;
    let ast = AstBuilder::new(&allocator);

    let mut body = ast.vec();
    for stmt in program.body.iter() {
        match stmt {
            Statement::ImportDeclaration(_) => {}
            Statement::ExportDefaultDeclaration(export) => match &export.declaration {
                ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                    body.push(Statement::FunctionDeclaration(func.clone_in(&allocator)));
                }
                ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                    body.push(Statement::ClassDeclaration(class.clone_in(&allocator)));
                }
                kind => {
                    if let Some(expr) = kind.as_expression() {
                        body.push(ast.statement_expression(export.span, expr.clone_in(&allocator)));
                    }
                }
            },
            _ => body.push(stmt.clone_in(&allocator)),
        }
    }
    program.body = body;

    Ok(Codegen::new().build(&program).code)
}
