#[cfg(test)]
mod tests {
    use crate::config::ExtractOptions;
    use crate::diagnostics::Severity;
    use crate::error::{ERR_MARKER_ARITY, ERR_PARSE};
    use crate::extract::{process_expressions, Extraction};
    use crate::placeholder::{EvalMode, Placeholder, TrackHint};

    fn run(source: &str, file: &str, css: bool) -> Extraction {
        process_expressions(source, file, &ExtractOptions::default(), css).unwrap()
    }

    fn view(source: &str) -> String {
        run(source, "src/views/page.jsx", true)
            .code
            .expect("module should be rewritten")
    }

    fn menu(source: &str) -> Option<String> {
        run(source, "src/resources/menus/main.js", false).code
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MARKER CALLS
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_reactive_marker_is_unwrapped() {
        let out = view(
            "import { bind } from \"next-jsx/runtime\";\nexport default <my-button label={bind(CTX.label)} />;\n",
        );
        assert_eq!(
            out,
            "\nexport default <my-button label={\"<%= CTX.label %>\"} />;\n"
        );
    }

    #[test]
    fn test_recursive_marker_is_unwrapped() {
        let out = view(
            "import { recursive } from \"next-jsx/runtime\";\nexport default <x v={recursive(CTX.tpl)} />;\n",
        );
        assert!(out.contains("v={\"<%~ CTX.tpl %>\"}"));
    }

    #[test]
    fn test_combined_markers_carry_track_hint() {
        let out = view(
            r#"import { bind, recursive } from "next-jsx/runtime";
export default <x a={recursive(bind(STATE.count))} b={bind(recursive(CTX.total))} />;
"#,
        );
        assert!(out.contains(r#"a={"<%~ \"track state\",STATE.count %>"}"#));
        assert!(out.contains(r#"b={"<%~ \"track context\",CTX.total %>"}"#));
    }

    #[test]
    fn test_same_marker_nesting_wraps_inner_call() {
        let out = view(
            "import { bind } from \"next-jsx/runtime\";\nexport default <x a={bind(bind(y))} />;\n",
        );
        assert!(out.contains("a={\"<%= bind(y) %>\"}"));
    }

    #[test]
    fn test_marker_arity_is_fatal() {
        let err = process_expressions(
            "import { bind } from \"next-jsx/runtime\";\nexport default <x a={bind(a, b)} />;\n",
            "src/views/page.jsx",
            &ExtractOptions::default(),
            true,
        )
        .unwrap_err();

        assert_eq!(err.code, ERR_MARKER_ARITY);
        assert_eq!(err.message, "`bind()` expects exactly one argument, received: 2");
        assert_eq!((err.line, err.column), (2, 21));
        assert!(err.context.unwrap().contains("bind(a, b)"));
    }

    #[test]
    fn test_inner_marker_arity_is_fatal() {
        let err = process_expressions(
            "import { bind, recursive } from \"next-jsx/runtime\";\nexport default <x a={bind(recursive(a, b))} />;\n",
            "src/views/page.jsx",
            &ExtractOptions::default(),
            true,
        )
        .unwrap_err();

        assert_eq!(err.code, ERR_MARKER_ARITY);
        assert_eq!(err.message, "`recursive()` expects exactly one argument, received: 2");
        assert_eq!((err.line, err.column), (2, 26));
    }

    #[test]
    fn test_runtime_import_alone_is_removed() {
        let result = run(
            "import { bind } from \"next-jsx/runtime\";\nexport default { a: 1 };\n",
            "src/resources/menus/main.js",
            false,
        );
        assert_eq!(result.code.as_deref(), Some("\nexport default { a: 1 };\n"));
        assert_eq!(result.placeholders, 0);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_shadowed_marker_is_a_plain_call() {
        let out = view(
            "import { bind } from \"next-jsx/runtime\";\nfunction render(bind) {\n  return <a b={bind(1)} />;\n}\n",
        );
        assert_eq!(
            out,
            "\nfunction render(bind) {\n  return <a b={\"<% bind(1) %>\"} />;\n}\n"
        );
    }

    #[test]
    fn test_aliased_marker_is_not_recognized() {
        let out = view(
            "import { bind as b } from \"next-jsx/runtime\";\nexport default <x a={b(y)} />;\n",
        );
        assert_eq!(out, "\nexport default <x a={\"<% b(y) %>\"} />;\n");
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // JSON COMPATIBILITY
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_object_and_array_classification() {
        let out = menu(
            r#"const x = "k";
const rest = [];
export const a = { a: 1, "b": [1, 2, -1] };
export const b = { a: 1, [x]: 2 };
export const c = [1, ...rest];
"#,
        )
        .unwrap();

        assert_eq!(
            out,
            r#"const x = "k";
const rest = [];
export const a = { a: 1, "b": [1, 2, -1] };
export const b = "<% { a: 1, [x]: 2 } %>";
export const c = "<% [1, ...rest] %>";
"#
        );
    }

    #[test]
    fn test_negative_zero_is_dynamic() {
        let out = menu("export const z = [-0, -1, (2)];\n").unwrap();
        assert_eq!(out, "export const z = [\"<% -0 %>\", -1, (2)];\n");
    }

    #[test]
    fn test_static_module_is_untouched() {
        let result = run(
            "export default {\n  // menu\n  title: 'Main',\n  items: [{ text: \"Home\", to: null, on: true }],\n};\n",
            "src/resources/menus/main.js",
            false,
        );
        assert!(result.code.is_none());
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_builtin_globals_are_dynamic() {
        let out = menu("export const t = { now: Date, max: Math.max(1, 2) };\n").unwrap();
        assert_eq!(
            out,
            "export const t = { now: \"<% Date %>\", max: \"<% Math.max(1, 2) %>\" };\n"
        );
    }

    #[test]
    fn test_source_text_is_verbatim() {
        let out = menu("export const f = (a)   =>  a  + `x${a}`;\n").unwrap();
        assert_eq!(out, "export const f = \"<% (a)   =>  a  + `x${a}` %>\";\n");

        let out = menu("const a = {};\nexport const s = a[\"b\"];\n").unwrap();
        assert!(out.ends_with("export const s = \"<% a[\\\"b\\\"] %>\";\n"));
    }

    #[test]
    fn test_jsx_children_are_visited() {
        let out = view("export default <div title=\"t\">{CTX.name}<b>{1}</b></div>;\n");
        assert_eq!(
            out,
            "export default <div title=\"t\">{\"<% CTX.name %>\"}<b>{1}</b></div>;\n"
        );
    }

    #[test]
    fn test_import_meta_is_static() {
        let result = run(
            "export const u = { url: import.meta.url, meta: import.meta };\n",
            "src/resources/menus/main.js",
            false,
        );
        assert!(result.code.is_none());
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BINDINGS
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_resource_binding_shorthand_and_import() {
        let out = menu("import FN from \"./functions\";\nexport default { FN, call: FN.run };\n").unwrap();
        assert_eq!(
            out,
            "import \"./functions\";\nexport default { FN: \"<% FN %>\", call: \"<% FN.run %>\" };\n"
        );
    }

    #[test]
    fn test_resource_binding_keeps_other_specifiers() {
        let out = menu("import FN, { helper } from './functions';\nexport default { helper };\n").unwrap();
        assert_eq!(out, "import { helper } from './functions';\nexport default { helper };\n");
    }

    #[test]
    fn test_resource_binding_from_package_is_kept() {
        let out = menu("import FN from \"functions-lib\";\nexport default { FN };\n").unwrap();
        assert_eq!(
            out,
            "import FN from \"functions-lib\";\nexport default { FN: \"<% FN %>\" };\n"
        );
    }

    #[test]
    fn test_free_variable_warns_and_stays() {
        let result = run(
            "export default { a: CTX };\n",
            "src/resources/menus/main.js",
            false,
        );
        assert!(result.code.is_none());
        assert_eq!(result.diagnostics.len(), 1);

        let diagnostic = &result.diagnostics[0];
        assert_eq!(diagnostic.severity, Severity::Warning);
        assert_eq!(diagnostic.message, "unknown variable \"CTX\"");
        assert_eq!((diagnostic.line, diagnostic.column), (1, 20));
        assert!(diagnostic.frame.contains("export default { a: CTX };"));
    }

    #[test]
    fn test_hoisted_declarations_resolve() {
        let result = run(
            "export default { a: later, b: helper };\nconst later = 1;\nfunction helper() {}\n",
            "src/resources/menus/main.js",
            false,
        );
        assert!(result.code.is_none());
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_block_scoped_names_do_not_leak() {
        let result = run(
            "if (true) { let hidden = 1; }\nexport default { a: hidden };\n",
            "src/resources/menus/main.js",
            false,
        );
        assert_eq!(result.diagnostics.len(), 1);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STYLESHEETS
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_stylesheet_import_joins_jsx_import() {
        let out = view(
            r#"import { jsx } from "next-jsx";
import styles from "./page.css";
export default <div style={styles} />;
"#,
        );
        assert_eq!(
            out,
            r#"import { jsx, loadStyleText } from "next-jsx";
const styles = loadStyleText("./page.css", import.meta.url);
export default <div style={styles} />;
"#
        );
    }

    #[test]
    fn test_stylesheet_import_adds_loader_import() {
        let out = view("import s from './a.css';\nexport default <style>{s}</style>;\n");
        assert_eq!(
            out,
            "import { loadStyleText } from \"next-jsx\";\nconst s = loadStyleText('./a.css', import.meta.url);\nexport default <style>{s}</style>;\n"
        );
    }

    #[test]
    fn test_stylesheet_loader_already_imported() {
        let out = view(
            "import { loadStyleText } from \"next-jsx\";\nimport s from \"./a.css\";\nexport default <i>{s}</i>;\n",
        );
        assert!(out.starts_with("import { loadStyleText } from \"next-jsx\";\nconst s = loadStyleText("));
        assert_eq!(out.matches("loadStyleText }").count(), 1);
    }

    #[test]
    fn test_stylesheets_ignored_without_css_processing() {
        let result = run(
            "import s from './a.css';\nexport default { s };\n",
            "src/resources/menus/main.js",
            false,
        );
        assert!(result.code.is_none());
    }

    #[test]
    fn test_style_loader_call_is_kept() {
        let result = run(
            "export const s = loadStyleText(\"./x.css\", import.meta.url);\n",
            "src/resources/menus/main.js",
            false,
        );
        assert!(result.code.is_none());
        assert!(result.diagnostics.is_empty());
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FAILURES & ROUND TRIP
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_parse_error() {
        let err = process_expressions(
            "export default {",
            "src/resources/menus/main.js",
            &ExtractOptions::default(),
            false,
        )
        .unwrap_err();
        assert_eq!(err.code, ERR_PARSE);
        assert_eq!(err.file, "src/resources/menus/main.js");
    }

    #[test]
    fn test_placeholder_recovers_source() {
        let source = "CTX.list.filter((item) => item.on)";
        let out = menu(&format!("export const v = {};\n", source)).unwrap();
        let literal = out
            .trim_start_matches("export const v = ")
            .trim_end_matches(";\n");
        let text: String = serde_json::from_str(literal).unwrap();
        let placeholder = Placeholder::parse(&text).unwrap();
        assert_eq!(placeholder.mode, EvalMode::Once);
        assert_eq!(placeholder.source, source);

        let tracked = Placeholder::parse("<%~ \"track state\",STATE.a %>").unwrap();
        assert_eq!(tracked.hint, Some(TrackHint::State));
    }

    #[test]
    fn test_placeholder_count() {
        let result = run(
            "export default [a(), b(), { c: d() }];\n",
            "src/resources/menus/main.js",
            false,
        );
        assert_eq!(result.placeholders, 3);
    }
}
