//! Error taxonomy of a facade run.

use std::fmt;

use thiserror::Error;

/// Errors raised while walking, resolving and rendering a facade.
///
/// Only a handful of these abort a run: a structural error on the root
/// target, a root package that cannot be loaded, an unresolved placeholder and
/// output I/O. Everything else is reported and skipped.
#[derive(Error, Debug, Clone)]
pub enum FacadeError {
    #[error("{package}.{target} is a {kind}, only struct, interface, map, array and slice types are supported")]
    Structural {
        package: String,
        target: String,
        kind: String,
    },

    #[error("type {target} not found in package {package}")]
    NotFound { package: String, target: String },

    /// Repeat visit of an already walked target.
    #[error("{0} already processed")]
    Processed(String),

    #[error("{0}")]
    ParserWarning(String),

    #[error("unable to load package {package}: {reason}")]
    Load { package: String, reason: String },

    #[error("generic placeholder {ident} from {package} was never resolved")]
    UnresolvedPlaceholder { ident: String, package: String },

    #[error("{0}")]
    Io(String),
}

impl FacadeError {
    /// Whether this error is the re-visit sentinel and must not be reported.
    pub fn is_benign(&self) -> bool {
        matches!(self, FacadeError::Processed(_))
    }

    pub fn parser_warning(message: impl Into<String>) -> Self {
        FacadeError::ParserWarning(message.into())
    }
}

impl From<std::io::Error> for FacadeError {
    fn from(err: std::io::Error) -> Self {
        FacadeError::Io(err.to_string())
    }
}

impl From<fmt::Error> for FacadeError {
    fn from(err: fmt::Error) -> Self {
        FacadeError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FacadeError>;

/// Why the duplicate checker dropped a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionKind {
    /// Two non-interface members share a name.
    Ambiguous,
    /// An interface member collides with a different signature.
    Signature,
}

impl RejectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionKind::Ambiguous => "ambiguous",
            RejectionKind::Signature => "signature",
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionKind::Ambiguous => write!(f, "ambiguous selector"),
            RejectionKind::Signature => write!(f, "signature mismatch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benign() {
        assert!(FacadeError::Processed("a.B".into()).is_benign());
        assert!(!FacadeError::parser_warning("x").is_benign());
        assert!(!FacadeError::NotFound {
            package: "a".into(),
            target: "B".into()
        }
        .is_benign());
    }

    #[test]
    fn test_messages() {
        let err = FacadeError::Structural {
            package: "example.com/a".into(),
            target: "Fn".into(),
            kind: "function".into(),
        };
        assert!(err.to_string().contains("is a function"));

        let err = FacadeError::Load {
            package: "example.com/missing".into(),
            reason: "no such directory".into(),
        };
        assert_eq!(
            err.to_string(),
            "unable to load package example.com/missing: no such directory"
        );
    }
}
