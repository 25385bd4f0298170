//! Binding Resolver for Expression Extraction.
//!
//! Classifies identifier references against the lexical scope stack and the
//! framework names configured in `ExtractOptions`.

use crate::config::ExtractOptions;
use crate::scope::{Binding, Scope, ScopeStack};

/// What an identifier reference resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierClass {
    /// Declared in the module or an enclosing scope.
    Bound,
    /// A runtime-module named import or the resource binding default import.
    FrameworkImport,
    /// Unbound member of the built-in allow-list.
    Global,
    /// The unbound style-loader name.
    StyleLoader,
    /// Not declared anywhere and not recognized.
    Free,
}

impl IdentifierClass {
    /// Whether a reference of this class can stay in the emitted code as is.
    pub fn is_static(self) -> bool {
        !matches!(self, IdentifierClass::FrameworkImport | IdentifierClass::Global)
    }
}

/// The two evaluation-mode markers exported by the runtime module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Reactive,
    Recursive,
}

pub struct BindingResolver<'o> {
    options: &'o ExtractOptions,
    scopes: ScopeStack,
}

impl<'o> BindingResolver<'o> {
    pub fn new(options: &'o ExtractOptions) -> Self {
        BindingResolver {
            options,
            scopes: ScopeStack::new(),
        }
    }

    pub fn options(&self) -> &ExtractOptions {
        self.options
    }

    pub fn enter(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    pub fn leave(&mut self) {
        self.scopes.pop();
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.lookup(name)
    }

    pub fn classify(&self, name: &str) -> IdentifierClass {
        match self.lookup(name) {
            Some(binding) => {
                if binding.is_named_import_from(&self.options.runtime_module)
                    || (binding.is_default_import() && name == self.options.resource_binding)
                {
                    IdentifierClass::FrameworkImport
                } else {
                    IdentifierClass::Bound
                }
            }
            None if self.options.is_builtin_global(name) => IdentifierClass::Global,
            None if name == self.options.style_loader => IdentifierClass::StyleLoader,
            None => IdentifierClass::Free,
        }
    }

    /// Marker named by a callee, if it is bound to the runtime module's export of the same name.
    pub fn marker(&self, callee: &str) -> Option<Marker> {
        let marker = if callee == self.options.reactive_marker {
            Marker::Reactive
        } else if callee == self.options.recursive_marker {
            Marker::Recursive
        } else {
            return None;
        };
        self.lookup(callee)
            .filter(|binding| binding.is_named_import(&self.options.runtime_module, callee))
            .map(|_| marker)
    }

    /// A style-loader call is recognized when the name is unbound or imported from the JSX module.
    pub fn is_style_loader(&self, callee: &str) -> bool {
        if callee != self.options.style_loader {
            return false;
        }
        match self.lookup(callee) {
            None => true,
            Some(binding) => binding.is_named_import(&self.options.jsx_module, callee),
        }
    }
}
