//! # next-jsx storyboard compiler
//!
//! Two compile-time passes turn a JSX-authored app into a storyboard:
//!
//! 1. **Node Lowering** (`jsx` / `jsxs`): the JSX runtime entry points. Each call
//!    receives an element type and its configuration and returns a storyboard
//!    descriptor: a brick, a route, a component definition or a fragment.
//!    Children are flattened, text is coerced to text bricks and everything is
//!    bucketed into named slots.
//!
//! 2. **Expression Extraction** (`process_expressions`): a source-to-source pass
//!    that keeps JSON-compatible data as written and turns every other
//!    expression into a `<% ... %>` placeholder string for the renderer's
//!    expression engine. Identifiers are classified by the Binding Resolver.
//!
//! ## Placeholder modes
//!
//! - `<% expr %>`: evaluated once.
//! - `<%= expr %>`: reactive, wrapped with `bind(...)` in source.
//! - `<%~ expr %>`: recursive, wrapped with `recursive(...)` in source.
//! - `<%~ "track state",expr %>`: both markers, the hint names the tracked root.
//!
//! The batch driver (`process_project`), resource loaders, functions index
//! generation and storyboard assembly cover the rest of a build.

mod cache;
mod config;
mod descriptor;
mod diagnostics;
mod error;
mod extract;
mod functions;
mod imports;
mod loader;
mod lowering;
mod pipeline;
mod placeholder;
mod resolver;
mod scope;
mod storyboard;

#[cfg(test)]
mod expression_tests;

pub use cache::IncrementalCache;
pub use config::{Config, ExtractOptions, Target, BUILTIN_GLOBALS, CONFIG_FILE_NAME};
pub use descriptor::{
    Brick, Child, Component, Config as ElementConfig, ConfigValue, Descriptor, ElementType,
    Lowered, Route, RouteBody, SlotBucket, SlotKind, Slots,
};
pub use diagnostics::{code_frame, Diagnostic, Severity, SourcePosition};
pub use error::{
    CompilerError, Error, LowerError, Result, ERR_FUNCTIONS, ERR_MARKER_ARITY, ERR_PARSE,
};
pub use extract::{apply_edits, process_expressions, Edit, Extraction};
pub use functions::generate_functions_index;
pub use loader::{load_function, load_style_text, resolve_relative, FunctionResource};
pub use lowering::{children_to_slots, fix_brick_children, jsx, jsxs};
pub use pipeline::{process_project, ProcessReport};
pub use placeholder::{EvalMode, Placeholder, TrackHint};
pub use resolver::{BindingResolver, IdentifierClass, Marker};
pub use scope::{pattern_names, Binding, ImportBinding, ImportedName, Scope, ScopeStack};
pub use storyboard::{Resources, Storyboard, STORYBOARD_JSON, STORYBOARD_YAML};
