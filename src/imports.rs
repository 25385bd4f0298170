//! Import bookkeeping for Expression Extraction.
//!
//! Runs after the expression walk over the same module and only looks at
//! top-level import declarations:
//! - relative stylesheet default imports become style-loader calls;
//! - the runtime module import is dropped, its markers are compile-time only;
//! - a module-relative default import of the resource binding is dropped.
//!
//! When a stylesheet import was rewritten, the style loader is imported from
//! the JSX module unless it already is.

use lazy_static::lazy_static;
use oxc_ast::ast::{ImportDeclaration, ImportDeclarationSpecifier, Program, Statement};
use oxc_span::GetSpan;
use regex::Regex;
use serde_json::Value;
use tracing::trace;

use crate::config::ExtractOptions;
use crate::extract::Edit;
use crate::scope::module_export_name;

lazy_static! {
    static ref CSS_IMPORT: Regex = Regex::new(r#"\s+from\s+['"][^'"]+\.css['"]"#).unwrap();
}

/// Whether `source` contains a stylesheet import worth scanning for.
pub fn has_css_import(source: &str) -> bool {
    CSS_IMPORT.is_match(source)
}

fn slice<'s>(source: &'s str, node: &impl GetSpan) -> &'s str {
    let span = node.span();
    &source[span.start as usize..span.end as usize]
}

fn specifiers_of<'d, 'a>(decl: &'d ImportDeclaration<'a>) -> &'d [ImportDeclarationSpecifier<'a>] {
    match &decl.specifiers {
        Some(specifiers) => specifiers,
        None => &[],
    }
}

/// `import { name } from ...` with identical imported and local names.
fn imports_as_itself(specifier: &ImportDeclarationSpecifier<'_>, name: &str) -> bool {
    match specifier {
        ImportDeclarationSpecifier::ImportSpecifier(s) => {
            s.local.name.as_str() == name && module_export_name(&s.imported) == name
        }
        _ => false,
    }
}

/// Print an import declaration from specifier texts.
fn render_import(specifiers: &[&str], named: &[&str], source_literal: &str) -> String {
    let mut clauses: Vec<String> = specifiers.iter().map(|s| s.to_string()).collect();
    if !named.is_empty() {
        clauses.push(format!("{{ {} }}", named.join(", ")));
    }
    if clauses.is_empty() {
        format!("import {};", source_literal)
    } else {
        format!("import {} from {};", clauses.join(", "), source_literal)
    }
}

/// Collect the import edits for one module.
pub fn rewrite_imports(
    program: &Program<'_>,
    source: &str,
    options: &ExtractOptions,
    process_css: bool,
) -> Vec<Edit> {
    let scan_css = process_css && has_css_import(source);
    let mut edits = Vec::new();
    let mut imported_css = false;
    let mut jsx_import: Option<&ImportDeclaration<'_>> = None;
    let mut has_style_loader = false;

    for statement in &program.body {
        let Statement::ImportDeclaration(decl) = statement else {
            continue;
        };
        let module = decl.source.value.as_str();
        let specifiers = specifiers_of(decl);

        if module == options.jsx_module {
            jsx_import = Some(&**decl);
            has_style_loader |= specifiers
                .iter()
                .any(|s| imports_as_itself(s, &options.style_loader));
        }

        let relative = module.starts_with('.');

        if scan_css && relative && module.ends_with(".css") {
            let default = specifiers.iter().find_map(|s| match s {
                ImportDeclarationSpecifier::ImportDefaultSpecifier(d) => Some(d.local.name.as_str()),
                _ => None,
            });
            if let Some(local) = default {
                trace!(stylesheet = %module, "rewriting stylesheet import");
                edits.push(Edit::replace(
                    decl.span,
                    format!(
                        "const {} = {}({}, import.meta.url);",
                        local,
                        options.style_loader,
                        slice(source, &decl.source)
                    ),
                ));
                imported_css = true;
                continue;
            }
        }

        if module == options.runtime_module {
            trace!(module = %module, "removing runtime import");
            edits.push(Edit::replace(decl.span, ""));
            continue;
        }

        if relative {
            let is_resource_binding = |s: &&ImportDeclarationSpecifier<'_>| {
                matches!(s, ImportDeclarationSpecifier::ImportDefaultSpecifier(d)
                    if d.local.name.as_str() == options.resource_binding)
            };
            if specifiers.iter().any(|s| is_resource_binding(&s)) {
                let mut kept = Vec::new();
                let mut named = Vec::new();
                for specifier in specifiers.iter().filter(|s| !is_resource_binding(s)) {
                    match specifier {
                        ImportDeclarationSpecifier::ImportSpecifier(_) => named.push(slice(source, specifier)),
                        _ => kept.push(slice(source, specifier)),
                    }
                }
                edits.push(Edit::replace(
                    decl.span,
                    render_import(&kept, &named, slice(source, &decl.source)),
                ));
            }
        }
    }

    if imported_css && !has_style_loader {
        edits.push(inject_style_loader(jsx_import, source, options));
    }
    edits
}

fn inject_style_loader(
    jsx_import: Option<&ImportDeclaration<'_>>,
    source: &str,
    options: &ExtractOptions,
) -> Edit {
    let fresh = || {
        format!(
            "import {{ {} }} from {};\n",
            options.style_loader,
            Value::String(options.jsx_module.clone())
        )
    };

    let Some(decl) = jsx_import else {
        return Edit::insert(0, fresh());
    };
    let specifiers = specifiers_of(decl);
    // A namespace import can not carry named specifiers.
    if specifiers
        .iter()
        .any(|s| matches!(s, ImportDeclarationSpecifier::ImportNamespaceSpecifier(_)))
    {
        return Edit::insert(0, fresh());
    }

    let mut kept = Vec::new();
    let mut named = Vec::new();
    for specifier in specifiers {
        match specifier {
            ImportDeclarationSpecifier::ImportSpecifier(_) => named.push(slice(source, specifier)),
            _ => kept.push(slice(source, specifier)),
        }
    }
    named.push(options.style_loader.as_str());
    Edit::replace(
        decl.span,
        render_import(&kept, &named, slice(source, &decl.source)),
    )
}
