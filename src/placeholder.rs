//! Deferred-evaluation placeholders.
//!
//! A placeholder replaces a runtime-only expression in the emitted code. Its
//! textual form is `<%MODE HINT SOURCE %>`:
//! - MODE is empty (evaluate once), `=` (reactive) or `~` (recursive evaluation).
//! - HINT is only present when both markers wrap the same expression:
//!   `"track state",` when the source reads `STATE`, `"track context",` otherwise.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    static ref STATE_ACCESS: Regex = Regex::new(r"\bSTATE\s*[.\[]").unwrap();
    static ref PLACEHOLDER: Regex =
        Regex::new(r#"(?s)^<%([=~]?) ("track (state|context)",)?(.*) %>$"#).unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvalMode {
    Once,
    Bind,
    Recursive,
}

impl EvalMode {
    pub fn sigil(self) -> &'static str {
        match self {
            EvalMode::Once => "",
            EvalMode::Bind => "=",
            EvalMode::Recursive => "~",
        }
    }

    fn from_sigil(sigil: &str) -> Option<EvalMode> {
        match sigil {
            "" => Some(EvalMode::Once),
            "=" => Some(EvalMode::Bind),
            "~" => Some(EvalMode::Recursive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackHint {
    State,
    Context,
}

impl TrackHint {
    /// Scope tracked by a combined reactive and recursive expression.
    pub fn detect(source: &str) -> TrackHint {
        if STATE_ACCESS.is_match(source) {
            TrackHint::State
        } else {
            TrackHint::Context
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            TrackHint::State => "state",
            TrackHint::Context => "context",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub mode: EvalMode,
    pub hint: Option<TrackHint>,
    pub source: String,
}

impl Placeholder {
    pub fn new(mode: EvalMode, source: impl Into<String>) -> Self {
        Placeholder {
            mode,
            hint: None,
            source: source.into(),
        }
    }

    /// A recursive placeholder over a reactive one, annotated with the tracked scope.
    pub fn tracked(source: impl Into<String>) -> Self {
        let source = source.into();
        Placeholder {
            mode: EvalMode::Recursive,
            hint: Some(TrackHint::detect(&source)),
            source,
        }
    }

    /// Read back a placeholder string produced by `Display`.
    pub fn parse(text: &str) -> Option<Placeholder> {
        let caps = PLACEHOLDER.captures(text)?;
        let mode = EvalMode::from_sigil(caps.get(1).map_or("", |m| m.as_str()))?;
        let hint = match caps.get(3).map(|m| m.as_str()) {
            Some("state") => Some(TrackHint::State),
            Some("context") => Some(TrackHint::Context),
            _ => None,
        };
        Some(Placeholder {
            mode,
            hint,
            source: caps.get(4).map_or("", |m| m.as_str()).to_string(),
        })
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<%{} ", self.mode.sigil())?;
        if let Some(hint) = self.hint {
            write!(f, "\"track {}\",", hint.as_str())?;
        }
        write!(f, "{} %>", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes() {
        assert_eq!(Placeholder::new(EvalMode::Once, "CTX.a").to_string(), "<% CTX.a %>");
        assert_eq!(Placeholder::new(EvalMode::Bind, "CTX.a").to_string(), "<%= CTX.a %>");
        assert_eq!(
            Placeholder::new(EvalMode::Recursive, "CTX.a").to_string(),
            "<%~ CTX.a %>"
        );
    }

    #[test]
    fn test_tracked_hint() {
        assert_eq!(
            Placeholder::tracked("STATE.count + 1").to_string(),
            "<%~ \"track state\",STATE.count + 1 %>"
        );
        assert_eq!(
            Placeholder::tracked("CTX.count").to_string(),
            "<%~ \"track context\",CTX.count %>"
        );
        assert_eq!(TrackHint::detect("STATE [\"x\"]"), TrackHint::State);
        assert_eq!(TrackHint::detect("MY_STATE.x"), TrackHint::Context);
        assert_eq!(TrackHint::detect("STATE"), TrackHint::Context);
    }

    #[test]
    fn test_parse_reads_display_output() {
        let placeholder = Placeholder::tracked("STATE.a\n  .b");
        let parsed = Placeholder::parse(&placeholder.to_string()).unwrap();
        assert_eq!(parsed, placeholder);
        let once = Placeholder::new(EvalMode::Once, "a ? b : c");
        assert_eq!(Placeholder::parse(&once.to_string()).unwrap(), once);
        assert!(Placeholder::parse("plain text").is_none());
    }
}
