//! Functions index generation.
//!
//! `resources/functions/index.js` default-imports every function module and
//! default-exports an object listing them. The generated replacement loads each
//! listed module through the function loader instead, so the storyboard receives
//! the function sources rather than live functions.

use indexmap::{IndexMap, IndexSet};
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPattern, Declaration, ExportDefaultDeclarationKind, Expression, ImportDeclarationSpecifier,
    ObjectExpression, ObjectPropertyKind, Program, Statement,
};
use oxc_span::Span;
use tracing::debug;

use crate::config::ExtractOptions;
use crate::diagnostics::SourcePosition;
use crate::error::{CompilerError, ERR_FUNCTIONS};
use crate::extract::{parse_module, source_type_for, string_literal};

/// Rewrite the functions index, or `None` when it lists no functions.
pub fn generate_functions_index(
    source: &str,
    file_path: &str,
    options: &ExtractOptions,
) -> Result<Option<String>, CompilerError> {
    let allocator = Allocator::default();
    let program = parse_module(&allocator, source, file_path, source_type_for(file_path))?;
    let fail = |message: String, span: Span| {
        let pos = SourcePosition::from_offset(source, span.start);
        CompilerError::new(ERR_FUNCTIONS, &message, file_path, pos.line, pos.column)
    };

    let mut imports: IndexMap<&str, &str> = IndexMap::new();
    for stmt in &program.body {
        if let Statement::ImportDeclaration(decl) = stmt {
            for specifier in decl.specifiers.iter().flat_map(|s| s.iter()) {
                if let ImportDeclarationSpecifier::ImportDefaultSpecifier(default) = specifier {
                    imports.insert(default.local.name.as_str(), decl.source.value.as_str());
                }
            }
        }
    }

    let mut functions: IndexSet<&str> = IndexSet::new();
    for stmt in &program.body {
        let Statement::ExportDefaultDeclaration(export) = stmt else {
            continue;
        };
        let object = match &export.declaration {
            ExportDefaultDeclarationKind::Identifier(ident) => {
                find_object_binding(&program, ident.name.as_str()).ok_or_else(|| {
                    fail(
                        format!("No binding variable for functions: {}", ident.name),
                        ident.span,
                    )
                })?
            }
            kind => match kind.as_expression() {
                Some(Expression::ObjectExpression(object)) => &**object,
                _ => {
                    return Err(fail(
                        format!("invalid export default in file {}", file_path),
                        export.span,
                    ))
                }
            },
        };

        for property in &object.properties {
            if let ObjectPropertyKind::ObjectProperty(prop) = property {
                if let Expression::Identifier(ident) = &prop.value {
                    functions.insert(ident.name.as_str());
                }
            }
        }
    }

    if functions.is_empty() {
        debug!(file = %file_path, "functions index lists no functions");
        return Ok(None);
    }

    let mut entries = Vec::with_capacity(functions.len());
    for name in &functions {
        let Some(module) = imports.get(name) else {
            return Err(fail(
                format!("function \"{}\" is not default-imported", name),
                program.span,
            ));
        };
        entries.push(format!(
            "  {}: {}({}, import.meta.url)",
            name,
            options.function_loader,
            string_literal(module)
        ));
    }

    debug!(file = %file_path, functions = entries.len(), "generated functions index");
    Ok(Some(format!(
        "import {{ {} }} from {};\nexport default {{\n{}\n}};\n",
        options.function_loader,
        string_literal(&options.jsx_module),
        entries.join(",\n")
    )))
}

/// Initializer of a top-level variable `name`, when it is an object literal.
fn find_object_binding<'p, 'a>(program: &'p Program<'a>, name: &str) -> Option<&'p ObjectExpression<'a>> {
    let init = program.body.iter().find_map(|stmt| {
        let decl = match stmt {
            Statement::VariableDeclaration(decl) => decl,
            Statement::ExportNamedDeclaration(export) => match &export.declaration {
                Some(Declaration::VariableDeclaration(decl)) => decl,
                _ => return None,
            },
            _ => return None,
        };
        decl.declarations.iter().find_map(|declarator| match &declarator.id {
            BindingPattern::BindingIdentifier(id) if id.name.as_str() == name => {
                declarator.init.as_ref()
            }
            _ => None,
        })
    })?;

    match init {
        Expression::ObjectExpression(object) => Some(&**object),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ERR_PARSE;

    fn generate(source: &str) -> Result<Option<String>, CompilerError> {
        generate_functions_index(
            source,
            "src/resources/functions/index.js",
            &ExtractOptions::default(),
        )
    }

    #[test]
    fn test_inline_object() {
        let out = generate(
            "import sayHello from \"./sayHello\";\nimport add from \"./add.js\";\nexport default { sayHello, plus: add };\n",
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            out,
            "import { loadFunction } from \"next-jsx\";\nexport default {\n  sayHello: loadFunction(\"./sayHello\", import.meta.url),\n  add: loadFunction(\"./add.js\", import.meta.url)\n};\n"
        );
    }

    #[test]
    fn test_identifier_bound_to_object() {
        let out = generate(
            "import a from \"./a\";\nconst FN = { a, a2: a };\nexport default FN;\n",
        )
        .unwrap()
        .unwrap();
        assert_eq!(out.matches("loadFunction(").count(), 1);
    }

    #[test]
    fn test_empty_index() {
        assert_eq!(generate("export default {};\n").unwrap(), None);
        assert_eq!(generate("export default { a: 1 };\n").unwrap(), None);
    }

    #[test]
    fn test_identifier_without_binding() {
        let err = generate("export default FN;\n").unwrap_err();
        assert_eq!(err.code, ERR_FUNCTIONS);
        assert_eq!(err.message, "No binding variable for functions: FN");
        assert_eq!((err.line, err.column), (1, 15));

        let err = generate("const FN = [];\nexport default FN;\n").unwrap_err();
        assert_eq!(err.code, ERR_FUNCTIONS);
    }

    #[test]
    fn test_non_object_export() {
        let err = generate("export default [];\n").unwrap_err();
        assert_eq!(
            err.message,
            "invalid export default in file src/resources/functions/index.js"
        );
    }

    #[test]
    fn test_function_must_be_default_imported() {
        let err = generate("import { a } from \"./a\";\nexport default { a };\n").unwrap_err();
        assert_eq!(err.message, "function \"a\" is not default-imported");
    }

    #[test]
    fn test_parse_error() {
        let err = generate("export default {").unwrap_err();
        assert_eq!(err.code, ERR_PARSE);
    }
}
