use crate::range::Range;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which processing stage detected an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueKind {
    Lexical,
    Syntactic,
    Semantic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueSeverity {
    Error,
    Warning,
    Info,
}

/// A diagnostic attached to a run's result.
///
/// Issues are collected in ordered lists and never used as control flow,
/// except at engine boundaries where a run decides whether to fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub message: String,
    pub severity: IssueSeverity,
    pub range: Option<Range>,
}

impl Issue {
    pub fn lexical(
        message: impl Into<String>,
        severity: IssueSeverity,
        range: Option<Range>,
    ) -> Issue {
        Issue {
            kind: IssueKind::Lexical,
            message: message.into(),
            severity,
            range,
        }
    }

    pub fn syntactic(
        message: impl Into<String>,
        severity: IssueSeverity,
        range: Option<Range>,
    ) -> Issue {
        Issue {
            kind: IssueKind::Syntactic,
            message: message.into(),
            severity,
            range,
        }
    }

    pub fn semantic(
        message: impl Into<String>,
        severity: IssueSeverity,
        range: Option<Range>,
    ) -> Issue {
        Issue {
            kind: IssueKind::Semantic,
            message: message.into(),
            severity,
            range,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == IssueSeverity::Error
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            IssueKind::Lexical => "lexical",
            IssueKind::Syntactic => "syntactic",
            IssueKind::Semantic => "semantic",
        };
        let severity = match self.severity {
            IssueSeverity::Error => "error",
            IssueSeverity::Warning => "warning",
            IssueSeverity::Info => "info",
        };
        write!(f, "{} {}: {}", kind, severity, self.message)?;
        if let Some(range) = &self.range {
            write!(f, " at {}", range)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::Point;

    #[test]
    fn issues_round_trip_through_json() {
        let issue = Issue::semantic(
            "Source node not mapped: FooCtx",
            IssueSeverity::Warning,
            Some(Range::new(Point::new(1, 0), Point::new(1, 7))),
        );
        let encoded = serde_json::to_string(&issue).unwrap();
        let decoded: Issue = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, issue);
    }

    #[test]
    fn display_includes_kind_severity_and_range() {
        let issue = Issue::syntactic(
            "the whole input was not consumed",
            IssueSeverity::Error,
            Some(Range::at(Point::new(2, 7))),
        );
        assert_eq!(
            issue.to_string(),
            "syntactic error: the whole input was not consumed at 2:7..2:7"
        );
    }
}
