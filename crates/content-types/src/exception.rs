//! Detached snapshots of failures and their causes.
//!
//! An `ExceptionChain` copies everything it needs out of a live error at the
//! moment of handling, so it can be attached to an outcome or job status and
//! serialized long after the original error has been dropped.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of links captured from a `source()` chain.
pub const MAX_CHAIN_DEPTH: usize = 32;

/// Serializable snapshot of an error and its causes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionChain {
    /// Type (or variant) name of the original failure
    pub kind: String,
    /// Rendered error message
    pub message: String,
    /// Backtrace rendering; empty when backtraces are disabled
    #[serde(default)]
    pub stack_trace: String,
    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,
    /// Snapshot of the underlying cause, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<ExceptionChain>>,
}

impl ExceptionChain {
    /// Create a synthesized failure with no cause.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            stack_trace: String::new(),
            timestamp: Utc::now(),
            cause: None,
        }
    }

    /// Capture a typed error; the kind is the short type name of `E`.
    pub fn capture<E: Error + 'static>(err: &E) -> Self {
        let mut chain = Self::snapshot(short_type_name::<E>(), err.to_string(), err.source(), 0);
        chain.stack_trace = render_backtrace();
        chain
    }

    /// Capture a type-erased error; the kind is taken from its `Debug` rendering.
    pub fn from_dyn(err: &(dyn Error + 'static)) -> Self {
        let mut chain = Self::snapshot(kind_from_debug(err), err.to_string(), err.source(), 0);
        chain.stack_trace = render_backtrace();
        chain
    }

    /// Capture the payload of a caught panic.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with non-string payload".to_string()
        };
        Self::new("panic", message)
    }

    /// Attach a cause, replacing any existing one.
    pub fn with_cause(mut self, cause: ExceptionChain) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Iterate this link followed by every cause.
    pub fn iter(&self) -> impl Iterator<Item = &ExceptionChain> {
        std::iter::successors(Some(self), |link| link.cause.as_deref())
    }

    /// Number of links in the chain (at least 1).
    pub fn depth(&self) -> usize {
        self.iter().count()
    }

    /// The innermost cause.
    pub fn root_cause(&self) -> &ExceptionChain {
        self.iter().last().unwrap_or(self)
    }

    fn snapshot(
        kind: String,
        message: String,
        source: Option<&(dyn Error + 'static)>,
        depth: usize,
    ) -> Self {
        let cause = match source {
            Some(inner) if depth + 1 < MAX_CHAIN_DEPTH => Some(Box::new(Self::snapshot(
                kind_from_debug(inner),
                inner.to_string(),
                inner.source(),
                depth + 1,
            ))),
            _ => None,
        };

        Self {
            kind,
            message,
            stack_trace: String::new(),
            timestamp: Utc::now(),
            cause,
        }
    }
}

impl fmt::Display for ExceptionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        for cause in self.iter().skip(1) {
            write!(f, "\n  caused by {}: {}", cause.kind, cause.message)?;
        }
        if !self.stack_trace.is_empty() {
            write!(f, "\n{}", self.stack_trace)?;
        }
        Ok(())
    }
}

fn short_type_name<E: ?Sized>() -> String {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

// `Debug` for derived errors starts with the type or variant name.
fn kind_from_debug(err: &(dyn Error + 'static)) -> String {
    let debug = format!("{err:?}");
    let kind: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if kind.is_empty() {
        "Error".to_string()
    } else {
        kind
    }
}

fn render_backtrace() -> String {
    let backtrace = Backtrace::capture();
    match backtrace.status() {
        BacktraceStatus::Captured => backtrace.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContentError;

    #[derive(Debug)]
    struct Wrapped {
        message: String,
        inner: Option<Box<Wrapped>>,
    }

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.message)
        }
    }

    impl Error for Wrapped {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            self.inner.as_deref().map(|e| e as &(dyn Error + 'static))
        }
    }

    fn nested(levels: usize) -> Wrapped {
        let mut err = Wrapped {
            message: "level 0".to_string(),
            inner: None,
        };
        for i in 1..levels {
            err = Wrapped {
                message: format!("level {i}"),
                inner: Some(Box::new(err)),
            };
        }
        err
    }

    #[test]
    fn test_capture_records_kind_and_message() {
        let err = ContentError::NotFound("/sitecore/content/home".to_string());
        let chain = ExceptionChain::capture(&err);

        assert_eq!(chain.kind, "ContentError");
        assert_eq!(chain.message, "Item does not exist at /sitecore/content/home");
        assert!(chain.cause.is_none());
        assert_eq!(chain.depth(), 1);
    }

    #[test]
    fn test_capture_walks_source_chain() {
        let chain = ExceptionChain::capture(&nested(3));

        assert_eq!(chain.depth(), 3);
        let messages: Vec<&str> = chain.iter().map(|c| c.message.as_str()).collect();
        assert_eq!(messages, vec!["level 2", "level 1", "level 0"]);
        assert_eq!(chain.root_cause().message, "level 0");
        assert_eq!(chain.cause.as_ref().unwrap().kind, "Wrapped");
    }

    #[test]
    fn test_chain_survives_dropped_error() {
        let err = nested(2);
        let chain = ExceptionChain::capture(&err);
        let before = chain.clone();
        drop(err);

        assert_eq!(chain.message, "level 1");
        assert_eq!(chain.stack_trace, before.stack_trace);
        assert_eq!(chain.cause.as_ref().unwrap().message, "level 0");
        assert_eq!(chain, before);
    }

    #[test]
    fn test_depth_is_bounded() {
        let chain = ExceptionChain::capture(&nested(MAX_CHAIN_DEPTH + 8));
        assert_eq!(chain.depth(), MAX_CHAIN_DEPTH);
    }

    #[test]
    fn test_clone_is_independent() {
        let original = ExceptionChain::capture(&nested(2));
        let mut copy = original.clone();
        assert_eq!(copy.timestamp, original.timestamp);

        copy.cause.as_mut().unwrap().message = "changed".to_string();
        assert_eq!(original.cause.as_ref().unwrap().message, "level 0");
    }

    #[test]
    fn test_from_dyn_uses_debug_kind() {
        let err: Box<dyn Error + 'static> =
            Box::new(ContentError::TemplateNotFound("Common/Folder".into()));
        let chain = ExceptionChain::from_dyn(err.as_ref());
        assert_eq!(chain.kind, "TemplateNotFound");
    }

    #[test]
    fn test_from_panic_payloads() {
        let chain = ExceptionChain::from_panic(&"boom");
        assert_eq!(chain.kind, "panic");
        assert_eq!(chain.message, "boom");

        let chain = ExceptionChain::from_panic(&String::from("owned boom"));
        assert_eq!(chain.message, "owned boom");

        let chain = ExceptionChain::from_panic(&42u32);
        assert!(chain.message.contains("non-string"));
    }

    #[test]
    fn test_display_lists_causes() {
        let chain = ExceptionChain::new("Outer", "outer failed")
            .with_cause(ExceptionChain::new("Inner", "inner failed"));
        let rendered = chain.to_string();
        assert!(rendered.starts_with("Outer: outer failed"));
        assert!(rendered.contains("caused by Inner: inner failed"));
    }

    #[test]
    fn test_serde_roundtrip_keeps_cause() {
        let chain = ExceptionChain::capture(&nested(2));
        let json = serde_json::to_string(&chain).unwrap();
        let back: ExceptionChain = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chain);
    }
}
