//! Scope Module for Expression Extraction.
//!
//! An explicit lexical symbol table. Each scope is populated with its hoisted
//! declarations when it is entered, so a lookup from anywhere inside it sees
//! every name declared in it regardless of source order.

use oxc_ast::ast::{
    BindingIdentifier, BindingPattern, Class, Declaration, ExportDefaultDeclarationKind,
    Expression, FormalParameters, Function, FunctionBody, ImportDeclaration,
    ImportDeclarationSpecifier, ModuleExportName, Program, Statement, SwitchCase, VariableDeclaration,
    VariableDeclarationKind,
};
use oxc_ast_visit::Visit;
use oxc_syntax::scope::ScopeFlags;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedName {
    Default,
    Namespace,
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub source: String,
    pub imported: ImportedName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Import(ImportBinding),
    Local,
}

impl Binding {
    /// `import { name } from "source"` (imported and local name identical).
    pub fn is_named_import(&self, source: &str, name: &str) -> bool {
        matches!(
            self,
            Binding::Import(ImportBinding { source: s, imported: ImportedName::Named(n) })
                if s == source && n == name
        )
    }

    pub fn is_named_import_from(&self, source: &str) -> bool {
        matches!(
            self,
            Binding::Import(ImportBinding { source: s, imported: ImportedName::Named(_) })
                if s == source
        )
    }

    pub fn is_default_import(&self) -> bool {
        matches!(
            self,
            Binding::Import(ImportBinding { imported: ImportedName::Default, .. })
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCOPE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct Scope {
    bindings: HashMap<String, Binding>,
}

impl Scope {
    pub fn new() -> Self {
        Scope::default()
    }

    pub fn declare(&mut self, name: impl Into<String>, binding: Binding) {
        self.bindings.insert(name.into(), binding);
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Module scope: imports, top-level lexical declarations and every `var`.
    pub fn for_program(program: &Program<'_>) -> Scope {
        let mut scope = Scope::new();
        for statement in &program.body {
            if let Statement::ImportDeclaration(decl) = statement {
                scope.declare_imports(decl);
            }
        }
        scope.declare_hoisted(&program.body);
        scope
    }

    pub fn for_function(func: &Function<'_>) -> Scope {
        let mut scope = Scope::new();
        if let Some(id) = &func.id {
            scope.declare(id.name.as_str(), Binding::Local);
        }
        scope.declare_params(&func.params);
        if let Some(body) = &func.body {
            scope.declare_body(body);
        }
        scope
    }

    pub fn for_arrow(params: &FormalParameters<'_>, body: &FunctionBody<'_>) -> Scope {
        let mut scope = Scope::new();
        scope.declare_params(params);
        scope.declare_body(body);
        scope
    }

    /// Block scope: lexical declarations only.
    pub fn for_block(statements: &[Statement<'_>]) -> Scope {
        let mut scope = Scope::new();
        scope.declare_lexical(statements);
        scope
    }

    /// The single block shared by every case of a `switch`.
    pub fn for_switch(cases: &[SwitchCase<'_>]) -> Scope {
        let mut scope = Scope::new();
        for case in cases {
            scope.declare_lexical(&case.consequent);
        }
        scope
    }

    pub fn for_pattern(pattern: &BindingPattern<'_>) -> Scope {
        let mut scope = Scope::new();
        for name in pattern_names(pattern) {
            scope.declare(name, Binding::Local);
        }
        scope
    }

    /// Loop-head scope for `let`/`const` declarations.
    pub fn for_loop_head(decl: &VariableDeclaration<'_>) -> Option<Scope> {
        if decl.kind == VariableDeclarationKind::Var {
            return None;
        }
        let mut scope = Scope::new();
        scope.declare_variables(decl);
        Some(scope)
    }

    pub fn for_class(class: &Class<'_>) -> Option<Scope> {
        let id = class.id.as_ref()?;
        let mut scope = Scope::new();
        scope.declare(id.name.as_str(), Binding::Local);
        Some(scope)
    }

    fn declare_imports(&mut self, decl: &ImportDeclaration<'_>) {
        let source = decl.source.value.to_string();
        let Some(specifiers) = &decl.specifiers else {
            return;
        };
        for specifier in specifiers {
            let (local, imported) = match specifier {
                ImportDeclarationSpecifier::ImportSpecifier(s) => {
                    (&s.local, ImportedName::Named(module_export_name(&s.imported)))
                }
                ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                    (&s.local, ImportedName::Default)
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                    (&s.local, ImportedName::Namespace)
                }
            };
            self.declare(
                local.name.as_str(),
                Binding::Import(ImportBinding {
                    source: source.clone(),
                    imported,
                }),
            );
        }
    }

    fn declare_params(&mut self, params: &FormalParameters<'_>) {
        let mut names = BindingNames::default();
        names.visit_formal_parameters(params);
        for name in names.0 {
            self.declare(name, Binding::Local);
        }
    }

    fn declare_body(&mut self, body: &FunctionBody<'_>) {
        self.declare_hoisted(&body.statements);
    }

    fn declare_hoisted(&mut self, statements: &[Statement<'_>]) {
        self.declare_lexical(statements);
        let mut vars = HoistedVars::default();
        for statement in statements {
            vars.visit_statement(statement);
        }
        for name in vars.0 {
            self.declare(name, Binding::Local);
        }
    }

    fn declare_lexical(&mut self, statements: &[Statement<'_>]) {
        for statement in statements {
            match statement {
                Statement::VariableDeclaration(decl) if decl.kind != VariableDeclarationKind::Var => {
                    self.declare_variables(decl);
                }
                Statement::FunctionDeclaration(func) => self.declare_id(func.id.as_ref()),
                Statement::ClassDeclaration(class) => self.declare_id(class.id.as_ref()),
                Statement::ExportNamedDeclaration(export) => match &export.declaration {
                    Some(Declaration::VariableDeclaration(decl))
                        if decl.kind != VariableDeclarationKind::Var =>
                    {
                        self.declare_variables(decl);
                    }
                    Some(Declaration::FunctionDeclaration(func)) => self.declare_id(func.id.as_ref()),
                    Some(Declaration::ClassDeclaration(class)) => self.declare_id(class.id.as_ref()),
                    _ => {}
                },
                Statement::ExportDefaultDeclaration(export) => match &export.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                        self.declare_id(func.id.as_ref())
                    }
                    ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                        self.declare_id(class.id.as_ref())
                    }
                    _ => {}
                },
                _ => {}
            }
        }
    }

    fn declare_variables(&mut self, decl: &VariableDeclaration<'_>) {
        for declarator in &decl.declarations {
            for name in pattern_names(&declarator.id) {
                self.declare(name, Binding::Local);
            }
        }
    }

    fn declare_id(&mut self, id: Option<&BindingIdentifier<'_>>) {
        if let Some(id) = id {
            self.declare(id.name.as_str(), Binding::Local);
        }
    }
}

pub(crate) fn module_export_name(name: &ModuleExportName<'_>) -> String {
    match name {
        ModuleExportName::IdentifierName(id) => id.name.to_string(),
        ModuleExportName::IdentifierReference(id) => id.name.to_string(),
        ModuleExportName::StringLiteral(s) => s.value.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCOPE STACK
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack::default()
    }

    pub fn push(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    pub fn pop(&mut self) -> Option<Scope> {
        self.scopes.pop()
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Innermost binding of `name`, if any scope declares it.
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLECTORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Names bound by a pattern. Default-value expressions are not entered.
#[derive(Default)]
struct BindingNames(Vec<String>);

impl<'a> Visit<'a> for BindingNames {
    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        self.0.push(ident.name.to_string());
    }

    fn visit_expression(&mut self, _expr: &Expression<'a>) {}
}

pub fn pattern_names(pattern: &BindingPattern<'_>) -> Vec<String> {
    let mut names = BindingNames::default();
    names.visit_binding_pattern(pattern);
    names.0
}

/// `var` declarations of a function body, at any block depth, without entering nested functions.
#[derive(Default)]
struct HoistedVars(Vec<String>);

impl<'a> Visit<'a> for HoistedVars {
    fn visit_variable_declaration(&mut self, decl: &VariableDeclaration<'a>) {
        if decl.kind == VariableDeclarationKind::Var {
            for declarator in &decl.declarations {
                self.0.extend(pattern_names(&declarator.id));
            }
        }
    }

    fn visit_function(&mut self, _func: &Function<'a>, _flags: ScopeFlags) {}

    fn visit_class(&mut self, _class: &Class<'a>) {}

    fn visit_expression(&mut self, _expr: &Expression<'a>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn program_scope(source: &str) -> Scope {
        let allocator = Allocator::default();
        let source_type = SourceType::default().with_module(true).with_jsx(true);
        let ret = Parser::new(&allocator, source, source_type).parse();
        assert!(ret.errors.is_empty());
        Scope::for_program(&ret.program)
    }

    #[test]
    fn test_imports_are_recorded() {
        let scope = program_scope(
            r#"import FN from "./functions";
import { bind, recursive as r } from "next-jsx/runtime";
import * as ns from "./ns";"#,
        );
        assert!(scope.get("FN").unwrap().is_default_import());
        assert!(scope.get("bind").unwrap().is_named_import("next-jsx/runtime", "bind"));
        assert!(!scope.get("r").unwrap().is_named_import("next-jsx/runtime", "r"));
        assert!(scope.get("r").unwrap().is_named_import_from("next-jsx/runtime"));
        assert_eq!(
            scope.get("ns"),
            Some(&Binding::Import(ImportBinding {
                source: "./ns".to_string(),
                imported: ImportedName::Namespace,
            }))
        );
    }

    #[test]
    fn test_hoisting() {
        let scope = program_scope(
            r#"
use(later);
const later = 1;
if (x) { var deep = 2; let inner = 3; }
function f() { var hidden = 4; }
export const { a, b: [c] } = obj;
export default function Page() {}
"#,
        );
        for name in ["later", "deep", "f", "a", "c", "Page"] {
            assert_eq!(scope.get(name), Some(&Binding::Local), "{name}");
        }
        assert!(scope.get("inner").is_none());
        assert!(scope.get("hidden").is_none());
        assert!(scope.get("b").is_none());
    }

    #[test]
    fn test_stack_lookup_prefers_innermost() {
        let mut stack = ScopeStack::new();
        let mut outer = Scope::new();
        outer.declare(
            "bind",
            Binding::Import(ImportBinding {
                source: "next-jsx/runtime".to_string(),
                imported: ImportedName::Named("bind".to_string()),
            }),
        );
        stack.push(outer);
        let mut inner = Scope::new();
        inner.declare("bind", Binding::Local);
        stack.push(inner);

        assert_eq!(stack.lookup("bind"), Some(&Binding::Local));
        stack.pop();
        assert!(stack.lookup("bind").unwrap().is_named_import("next-jsx/runtime", "bind"));
        assert!(stack.lookup("missing").is_none());
    }
}
