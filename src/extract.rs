//! Expression Extraction Module for the storyboard compiler.
//!
//! Walks every expression position of a module once, top-down, and decides
//! per node whether it is plain JSON-compatible data (left in place), a marker
//! call (unwrapped into a reactive or recursive placeholder) or anything else
//! (replaced by a one-shot placeholder). A replaced node is a leaf: its
//! descendants are not visited.
//!
//! The traversal is read-only. It produces a list of span edits that are spliced
//! into the original text afterwards, so everything that is not rewritten keeps
//! its exact bytes.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, ArrayExpressionElement, ArrowFunctionExpression, BlockStatement, CallExpression,
    CatchClause, Class, Expression, ForInStatement, ForOfStatement, ForStatement, ForStatementInit,
    ForStatementLeft, Function, IdentifierReference, ObjectExpression, ObjectProperty,
    ObjectPropertyKind, Program, PropertyKey, PropertyKind, SwitchStatement,
};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::{ParseOptions, Parser};
use oxc_span::{GetSpan, SourceType, Span};
use oxc_syntax::operator::UnaryOperator;
use oxc_syntax::scope::ScopeFlags;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::ExtractOptions;
use crate::diagnostics::{code_frame, Diagnostic, Severity, SourcePosition};
use crate::error::{CompilerError, ERR_MARKER_ARITY, ERR_PARSE};
use crate::imports::rewrite_imports;
use crate::placeholder::{EvalMode, Placeholder};
use crate::resolver::{BindingResolver, IdentifierClass, Marker};
use crate::scope::Scope;

/// Result of processing one module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Extraction {
    /// Rewritten source, or `None` when nothing in the module qualified.
    pub code: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
    /// Number of expressions replaced by placeholders.
    pub placeholders: usize,
}

/// Replace the bytes `start..end` of the original source with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: u32,
    pub end: u32,
    pub text: String,
}

impl Edit {
    pub fn replace(span: Span, text: impl Into<String>) -> Self {
        Edit {
            start: span.start,
            end: span.end,
            text: text.into(),
        }
    }

    pub fn insert(offset: u32, text: impl Into<String>) -> Self {
        Edit {
            start: offset,
            end: offset,
            text: text.into(),
        }
    }
}

/// Apply non-overlapping edits back to front.
pub fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    // A replacement starting at an insertion point must run before the insertion.
    edits.sort_by(|a, b| (b.start, b.end).cmp(&(a.start, a.end)));
    let mut result = source.to_string();
    for edit in edits {
        result.replace_range((edit.start as usize)..(edit.end as usize), &edit.text);
    }
    result
}

pub(crate) fn source_type_for(file_path: &str) -> SourceType {
    SourceType::default()
        .with_module(true)
        .with_jsx(file_path.ends_with(".jsx"))
}

pub(crate) fn parse_options() -> ParseOptions {
    ParseOptions {
        preserve_parens: false,
        ..ParseOptions::default()
    }
}

/// Parse a module, turning the first syntax error into a located `CompilerError`.
pub(crate) fn parse_module<'a>(
    allocator: &'a Allocator,
    source: &'a str,
    file_path: &str,
    source_type: SourceType,
) -> Result<Program<'a>, CompilerError> {
    let ret = Parser::new(allocator, source, source_type)
        .with_options(parse_options())
        .parse();

    if let Some(err) = ret.errors.first() {
        let offset = err
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map(|label| label.offset() as u32)
            .unwrap_or(0);
        let pos = SourcePosition::from_offset(source, offset);
        let message = err.to_string();
        let frame = code_frame(source, file_path, offset, offset + 1, Severity::Error, &message);
        return Err(CompilerError::with_details(
            ERR_PARSE,
            &message,
            file_path,
            pos.line,
            pos.column,
            Some(frame),
            vec![],
        ));
    }
    Ok(ret.program)
}

/// JS string literal holding `text`.
pub(crate) fn string_literal(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINT
// ═══════════════════════════════════════════════════════════════════════════════

/// Rewrite the dynamic expressions and framework imports of one module.
pub fn process_expressions(
    source: &str,
    file_path: &str,
    options: &ExtractOptions,
    process_css: bool,
) -> Result<Extraction, CompilerError> {
    let allocator = Allocator::default();
    let program = parse_module(&allocator, source, file_path, source_type_for(file_path))?;
    let mut extractor = ExpressionExtractor::new(source, file_path, options);
    extractor.visit_program(&program);

    let ExpressionExtractor {
        mut edits,
        diagnostics,
        error,
        ..
    } = extractor;
    if let Some(err) = error {
        return Err(err);
    }

    let placeholders = edits.len();
    let import_edits = rewrite_imports(&program, source, options, process_css);
    if edits.is_empty() && import_edits.is_empty() {
        debug!(file = %file_path, "no expressions to extract");
        return Ok(Extraction {
            code: None,
            diagnostics,
            placeholders,
        });
    }

    debug!(
        file = %file_path,
        placeholders,
        import_edits = import_edits.len(),
        "extracted expressions"
    );
    edits.extend(import_edits);
    Ok(Extraction {
        code: Some(apply_edits(source, edits)),
        diagnostics,
        placeholders,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXTRACTOR
// ═══════════════════════════════════════════════════════════════════════════════

struct ExpressionExtractor<'s, 'o> {
    source: &'s str,
    file_path: &'s str,
    resolver: BindingResolver<'o>,
    edits: Vec<Edit>,
    diagnostics: Vec<Diagnostic>,
    error: Option<CompilerError>,
}

impl<'s, 'o> ExpressionExtractor<'s, 'o> {
    fn new(source: &'s str, file_path: &'s str, options: &'o ExtractOptions) -> Self {
        ExpressionExtractor {
            source,
            file_path,
            resolver: BindingResolver::new(options),
            edits: Vec::new(),
            diagnostics: Vec::new(),
            error: None,
        }
    }

    fn text(&self, span: Span) -> &'s str {
        &self.source[span.start as usize..span.end as usize]
    }

    fn replace_with(&mut self, span: Span, placeholder: Placeholder) {
        self.edits
            .push(Edit::replace(span, string_literal(&placeholder.to_string())));
    }

    fn with_scope(&mut self, scope: Option<Scope>, visit: impl FnOnce(&mut Self)) {
        let entered = scope.is_some();
        if let Some(scope) = scope {
            self.resolver.enter(scope);
        }
        visit(self);
        if entered {
            self.resolver.leave();
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Marker calls
    // ───────────────────────────────────────────────────────────────────────────

    fn marker_of(&self, call: &CallExpression<'_>) -> Option<Marker> {
        match &call.callee {
            Expression::Identifier(ident) => self.resolver.marker(&ident.name),
            _ => None,
        }
    }

    fn marker_argument<'c, 'a>(
        &self,
        call: &'c CallExpression<'a>,
        marker: Marker,
    ) -> Result<&'c Argument<'a>, CompilerError> {
        if call.arguments.len() == 1 {
            return Ok(&call.arguments[0]);
        }
        let name = match marker {
            Marker::Reactive => &self.resolver.options().reactive_marker,
            Marker::Recursive => &self.resolver.options().recursive_marker,
        };
        let message = format!(
            "`{}()` expects exactly one argument, received: {}",
            name,
            call.arguments.len()
        );
        let pos = SourcePosition::from_offset(self.source, call.span.start);
        let frame = code_frame(
            self.source,
            self.file_path,
            call.span.start,
            call.span.end,
            Severity::Error,
            &message,
        );
        error!(file = %self.file_path, line = pos.line, column = pos.column, "{}", message);
        error!("\n{}", frame);
        Err(CompilerError::with_details(
            ERR_MARKER_ARITY,
            &message,
            self.file_path,
            pos.line,
            pos.column,
            Some(frame),
            vec![format!("wrap the whole expression: {}(a + b)", name)],
        ))
    }

    /// Unwrap a marker call, including a nested pair of different markers.
    fn unwrap_marker(&self, call: &CallExpression<'_>) -> Result<Option<Placeholder>, CompilerError> {
        let Some(outer) = self.marker_of(call) else {
            return Ok(None);
        };
        let argument = self.marker_argument(call, outer)?;

        if let Argument::CallExpression(inner_call) = argument {
            if let Some(inner) = self.marker_of(inner_call).filter(|inner| *inner != outer) {
                let inner_argument = self.marker_argument(inner_call, inner)?;
                return Ok(Some(Placeholder::tracked(self.text(inner_argument.span()))));
            }
        }

        let mode = match outer {
            Marker::Reactive => EvalMode::Bind,
            Marker::Recursive => EvalMode::Recursive,
        };
        Ok(Some(Placeholder::new(mode, self.text(argument.span()))))
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Static classification
    // ───────────────────────────────────────────────────────────────────────────

    fn identifier_is_static(&mut self, ident: &IdentifierReference<'_>) -> bool {
        match self.resolver.classify(&ident.name) {
            IdentifierClass::Free => {
                self.report_free_variable(ident);
                true
            }
            class => class.is_static(),
        }
    }

    fn report_free_variable(&mut self, ident: &IdentifierReference<'_>) {
        let pos = SourcePosition::from_offset(self.source, ident.span.start);
        let message = format!("unknown variable \"{}\"", ident.name);
        let frame = code_frame(
            self.source,
            self.file_path,
            ident.span.start,
            ident.span.end,
            Severity::Warning,
            &message,
        );
        warn!(
            variable = %ident.name,
            file = %self.file_path,
            line = pos.line,
            column = pos.column,
            "unknown variable"
        );
        warn!("\n{}", frame);
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            message,
            file: self.file_path.to_string(),
            line: pos.line,
            column: pos.column,
            frame,
        });
    }

    fn is_json_compatible(&mut self, expr: &Expression<'_>) -> bool {
        match expr {
            Expression::StringLiteral(_)
            | Expression::NumericLiteral(_)
            | Expression::BooleanLiteral(_)
            | Expression::NullLiteral(_)
            | Expression::JSXElement(_)
            | Expression::JSXFragment(_)
            | Expression::MetaProperty(_) => true,
            Expression::UnaryExpression(unary) => {
                unary.operator == UnaryOperator::UnaryNegation
                    && matches!(&unary.argument, Expression::NumericLiteral(n) if n.value != 0.0)
            }
            Expression::StaticMemberExpression(member) => {
                matches!(member.object, Expression::MetaProperty(_))
            }
            Expression::ComputedMemberExpression(member) => {
                matches!(member.object, Expression::MetaProperty(_))
            }
            Expression::Identifier(ident) => self.identifier_is_static(ident),
            Expression::ObjectExpression(object) => has_plain_keys(object),
            Expression::ArrayExpression(array) => array.elements.iter().all(|element| {
                !matches!(
                    element,
                    ArrayExpressionElement::SpreadElement(_) | ArrayExpressionElement::Elision(_)
                )
            }),
            _ => false,
        }
    }
}

fn has_plain_keys(object: &ObjectExpression<'_>) -> bool {
    object.properties.iter().all(|property| match property {
        ObjectPropertyKind::ObjectProperty(p) => {
            p.kind == PropertyKind::Init
                && !p.method
                && match &p.key {
                    PropertyKey::StaticIdentifier(_) => !p.computed,
                    PropertyKey::StringLiteral(_) => true,
                    _ => false,
                }
        }
        ObjectPropertyKind::SpreadProperty(_) => false,
    })
}

impl<'a> Visit<'a> for ExpressionExtractor<'_, '_> {
    fn visit_program(&mut self, program: &Program<'a>) {
        self.with_scope(Some(Scope::for_program(program)), |this| {
            walk::walk_program(this, program)
        });
    }

    fn visit_function(&mut self, func: &Function<'a>, flags: ScopeFlags) {
        self.with_scope(Some(Scope::for_function(func)), |this| {
            walk::walk_function(this, func, flags)
        });
    }

    fn visit_arrow_function_expression(&mut self, arrow: &ArrowFunctionExpression<'a>) {
        self.with_scope(Some(Scope::for_arrow(&arrow.params, &arrow.body)), |this| {
            walk::walk_arrow_function_expression(this, arrow)
        });
    }

    fn visit_class(&mut self, class: &Class<'a>) {
        self.with_scope(Scope::for_class(class), |this| walk::walk_class(this, class));
    }

    fn visit_block_statement(&mut self, block: &BlockStatement<'a>) {
        self.with_scope(Some(Scope::for_block(&block.body)), |this| {
            walk::walk_block_statement(this, block)
        });
    }

    fn visit_catch_clause(&mut self, clause: &CatchClause<'a>) {
        let scope = clause.param.as_ref().map(|param| Scope::for_pattern(&param.pattern));
        self.with_scope(scope, |this| walk::walk_catch_clause(this, clause));
    }

    fn visit_for_statement(&mut self, stmt: &ForStatement<'a>) {
        let scope = match &stmt.init {
            Some(ForStatementInit::VariableDeclaration(decl)) => Scope::for_loop_head(decl),
            _ => None,
        };
        self.with_scope(scope, |this| walk::walk_for_statement(this, stmt));
    }

    fn visit_for_in_statement(&mut self, stmt: &ForInStatement<'a>) {
        let scope = match &stmt.left {
            ForStatementLeft::VariableDeclaration(decl) => Scope::for_loop_head(decl),
            _ => None,
        };
        self.with_scope(scope, |this| walk::walk_for_in_statement(this, stmt));
    }

    fn visit_for_of_statement(&mut self, stmt: &ForOfStatement<'a>) {
        let scope = match &stmt.left {
            ForStatementLeft::VariableDeclaration(decl) => Scope::for_loop_head(decl),
            _ => None,
        };
        self.with_scope(scope, |this| walk::walk_for_of_statement(this, stmt));
    }

    fn visit_switch_statement(&mut self, stmt: &SwitchStatement<'a>) {
        self.visit_expression(&stmt.discriminant);
        self.with_scope(Some(Scope::for_switch(&stmt.cases)), |this| {
            for case in &stmt.cases {
                this.visit_switch_case(case);
            }
        });
    }

    fn visit_object_property(&mut self, prop: &ObjectProperty<'a>) {
        if self.error.is_some() {
            return;
        }
        // `{ a }` has no key text to keep once the value becomes a string.
        if prop.shorthand {
            if let Expression::Identifier(ident) = &prop.value {
                if !self.identifier_is_static(ident) {
                    let placeholder = Placeholder::new(EvalMode::Once, self.text(ident.span));
                    let literal = string_literal(&placeholder.to_string());
                    self.edits
                        .push(Edit::replace(prop.span, format!("{}: {}", ident.name, literal)));
                }
                return;
            }
        }
        walk::walk_object_property(self, prop);
    }

    fn visit_expression(&mut self, expr: &Expression<'a>) {
        if self.error.is_some() {
            return;
        }

        if let Expression::CallExpression(call) = expr {
            if let Expression::Identifier(callee) = &call.callee {
                if self.resolver.is_style_loader(&callee.name) {
                    walk::walk_expression(self, expr);
                    return;
                }
            }
            match self.unwrap_marker(call) {
                Ok(Some(placeholder)) => {
                    self.replace_with(call.span, placeholder);
                    return;
                }
                Ok(None) => {}
                Err(err) => {
                    self.error = Some(err);
                    return;
                }
            }
        }

        if self.is_json_compatible(expr) {
            walk::walk_expression(self, expr);
            return;
        }

        let span = expr.span();
        let placeholder = Placeholder::new(EvalMode::Once, self.text(span));
        self.replace_with(span, placeholder);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_edits_back_to_front() {
        let source = "abc def ghi";
        let edits = vec![
            Edit::replace(Span::new(0, 3), "X"),
            Edit::replace(Span::new(8, 11), "YYYY"),
            Edit::insert(0, "> "),
        ];
        assert_eq!(apply_edits(source, edits), "> X def YYYY");
    }

    #[test]
    fn test_string_literal_escapes() {
        assert_eq!(string_literal("<% a[\"b\"] %>"), r#""<% a[\"b\"] %>""#);
    }

    #[test]
    fn test_untouched_module_has_no_code() {
        let result = process_expressions(
            "export default { a: 1, b: [true, null, -2] };\n",
            "src/resources/menus/a.js",
            &ExtractOptions::default(),
            false,
        )
        .unwrap();
        assert!(result.code.is_none());
        assert_eq!(result.placeholders, 0);
    }
}
