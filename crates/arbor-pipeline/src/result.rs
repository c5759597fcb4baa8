use crate::parse_tree::ParseTreeNode;
use arbor_core::{Issue, Node, Range};
use std::rc::Rc;

/// What the first-stage collaborator hands back to the driver.
pub struct FirstStageOutput {
    pub root: Option<Rc<dyn ParseTreeNode>>,
    /// Whether the parser consumed the entire input.
    pub fully_consumed: bool,
    /// Where the unconsumed remainder starts, for the verification issue.
    pub remainder_range: Option<Range>,
}

impl FirstStageOutput {
    pub fn new(root: Option<Rc<dyn ParseTreeNode>>) -> FirstStageOutput {
        FirstStageOutput {
            root,
            fully_consumed: true,
            remainder_range: None,
        }
    }

    pub fn partially_consumed(
        root: Option<Rc<dyn ParseTreeNode>>,
        remainder_range: Option<Range>,
    ) -> FirstStageOutput {
        FirstStageOutput {
            root,
            fully_consumed: false,
            remainder_range,
        }
    }
}

/// Outcome of stage 1: the source tree plus its verification issues.
pub struct FirstStageResult {
    pub issues: Vec<Issue>,
    pub root: Option<Rc<dyn ParseTreeNode>>,
    pub elapsed_ms: u64,
}

/// Outcome of a whole run: issues from both stages in order, the target
/// tree (absent when the run produced nothing), and timings.
pub struct ParsingResult {
    pub issues: Vec<Issue>,
    pub root: Option<Node>,
    pub source_text: Option<String>,
    pub elapsed_ms: u64,
    pub first_stage: FirstStageResult,
}

impl ParsingResult {
    /// Whether the run finished without error-severity issues.
    pub fn is_correct(&self) -> bool {
        !self.issues.iter().any(Issue::is_error)
    }
}
