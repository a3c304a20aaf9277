//! Console diagnostics for gofacade runs.
//!
//! Diagnostics go to stderr so the generated source can be piped from
//! stdout. Two formats exist for the end-of-run summary:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::{Deserialize, Serialize};

use crate::checker::Rejection;

/// Environment variable enabling debug output.
pub const DEBUG_ENV: &str = "GOFACADE_DEBUG";

/// Plain progress message.
pub fn info(message: impl AsRef<str>) {
    eprintln!("{}", message.as_ref());
}

/// Recoverable problem: a skipped member, package or argument.
pub fn caution(message: impl AsRef<str>) {
    eprintln!("{} {}", "Warning:".yellow().bold(), message.as_ref().yellow());
}

/// Fatal problem.
pub fn critical(message: impl AsRef<str>) {
    eprintln!("{} {}", "Error:".red().bold(), message.as_ref().red());
}

pub fn is_debug() -> bool {
    std::env::var(DEBUG_ENV).is_ok()
}

/// Debug message, printed only when `GOFACADE_DEBUG` is set.
pub fn debug(message: impl AsRef<str>) {
    if is_debug() {
        eprintln!("[debug] {}", message.as_ref());
    }
}

/// Rejected members, grouped by name and kind with occurrence counts.
pub fn group_rejections(rejections: &[Rejection]) -> Vec<RejectionSummary> {
    let mut groups: Vec<RejectionSummary> = Vec::new();
    for rejection in rejections {
        match groups
            .iter_mut()
            .find(|g| g.name == rejection.function.name && g.kind == rejection.kind.as_str())
        {
            Some(group) => group.count += 1,
            None => groups.push(RejectionSummary {
                name: rejection.function.name.clone(),
                kind: rejection.kind.as_str().to_string(),
                origin: format!(
                    "{} from {}",
                    rejection.function.origin.label, rejection.function.origin.package
                ),
                signature: rejection.identity.clone(),
                accepted: rejection.accepted.clone(),
                count: 1,
            }),
        }
    }
    groups
}

/// Print the rejection summary in pretty format.
pub fn write_rejections(rejections: &[Rejection]) {
    if rejections.is_empty() {
        return;
    }

    eprintln!();
    eprintln!(
        "{}",
        format!("{} member(s) dropped from the facade:", rejections.len())
            .yellow()
            .bold()
    );
    for group in group_rejections(rejections) {
        let times = if group.count == 1 {
            String::new()
        } else {
            format!(" ({} times)", group.count)
        };
        eprintln!(
            "  {} {} {}{}",
            "✗".yellow(),
            group.name.bold(),
            format!("[{}]", group.kind).dimmed(),
            times
        );
        eprintln!("    {} {}", "rejected:".dimmed(), group.signature);
        eprintln!("    {} {}", "kept:    ".dimmed(), group.accepted);
        eprintln!("    {} {}", "origin:  ".dimmed(), group.origin);
    }
}

// =============================================================================
// JSON Format
// =============================================================================

/// Machine-readable run summary.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub version: String,
    pub package: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub packages_loaded: usize,
    pub delegates: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implemented: Vec<String>,
    pub rejected: Vec<RejectionSummary>,
}

/// One rejected member name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectionSummary {
    pub name: String,
    pub kind: String,
    pub origin: String,
    pub signature: String,
    pub accepted: String,
    pub count: usize,
}

/// Print the run summary as JSON on stderr.
pub fn write_json(summary: &RunSummary) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    eprintln!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::{Origin, WrappedFunction};
    use crate::error::RejectionKind;
    use crate::syntax::Signature;

    fn rejection(name: &str, kind: RejectionKind) -> Rejection {
        Rejection {
            kind,
            function: WrappedFunction {
                name: name.to_string(),
                origin: Origin::new("example.com/a", "A", "<A>"),
                interface: false,
                doc: None,
                call_path: vec![],
                signature: Signature::default(),
            },
            identity: "func()".to_string(),
            accepted: "func(int)".to_string(),
        }
    }

    #[test]
    fn test_group_rejections() {
        let groups = group_rejections(&[
            rejection("Run", RejectionKind::Ambiguous),
            rejection("Write", RejectionKind::Signature),
            rejection("Run", RejectionKind::Ambiguous),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "Run");
        assert_eq!(groups[0].count, 2);
        assert_eq!(groups[0].origin, "<A> from example.com/a");
        assert_eq!(groups[1].kind, "signature");
    }

    #[test]
    fn test_summary_json() {
        let summary = RunSummary {
            version: "0.1.0".into(),
            package: "example.com/a".into(),
            target: "A".into(),
            output: None,
            packages_loaded: 1,
            delegates: vec!["Run".into()],
            implemented: vec![],
            rejected: vec![],
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"delegates\":[\"Run\"]"));
        assert!(!json.contains("output"));
        assert!(!json.contains("implemented"));
    }
}
