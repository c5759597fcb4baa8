//! The two-stage parser driver.
//!
//! Stage 1 runs an external tokenizer+parser producing a source tree and
//! verifies it (full consumption, no error markers). Stage 2 feeds that tree
//! into the transformation engine. Issues merge stage-1-then-stage-2, each in
//! traversal order; a run moves NotStarted → Stage1Running → Stage1Done →
//! Stage2Running → Done synchronously, with no suspension or cancellation.

use crate::error::{PipelineError, Result};
use crate::parse_tree::ParseTreeNode;
use crate::result::{FirstStageOutput, FirstStageResult, ParsingResult};
use arbor_core::{Issue, IssueSeverity, Node, SourceNode};
use arbor_transform::Transformer;
use std::rc::Rc;
use std::time::Instant;
use tracing::debug;

/// A complete description of a two-stage parser, from source text to target
/// AST. Implementors supply the stage-1 collaborator call and the engine;
/// the provided methods drive the stages.
pub trait AstParser {
    /// Invokes the external tokenizer+grammar parser. Lexical and syntactic
    /// issues arrive through the injected list; collaborator failures
    /// propagate and abort the run.
    fn parse_source_tree(&mut self, code: &str, issues: &mut Vec<Issue>)
        -> eyre::Result<FirstStageOutput>;

    /// The transformation engine, configured once and reused across runs.
    fn transformer(&mut self) -> &mut Transformer;

    /// When disabled, every provenance link is stripped from the output in a
    /// final pass, trading traceability for deterministic, position-free
    /// trees.
    fn consider_position(&self) -> bool {
        true
    }

    /// Hook running on the transformed root before the result is assembled.
    fn post_process(&mut self, root: Node) -> Node {
        root
    }

    /// Executes only the first stage: the production of the source tree plus
    /// its verification.
    fn parse_first_stage(&mut self, code: &str) -> Result<FirstStageResult> {
        let started = Instant::now();
        debug!(stage = "stage1", "running first-stage parser");
        let mut issues = Vec::new();
        let output = self
            .parse_source_tree(code, &mut issues)
            .map_err(PipelineError::FirstStage)?;
        verify_source_tree(&output, &mut issues);
        Ok(FirstStageResult {
            issues,
            root: output.root,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Executes both stages and assembles the run's result.
    fn parse(&mut self, code: &str) -> Result<ParsingResult> {
        let started = Instant::now();
        let first_stage = self.parse_first_stage(code)?;
        debug!(stage = "stage2", "transforming the source tree");
        let watermark;
        let mut root = {
            let transformer = self.transformer();
            watermark = transformer.issues().len();
            transformer.extend_issues(first_stage.issues.iter().cloned());
            match &first_stage.root {
                Some(tree) => transformer.transform(&tree.clone().to_source(), None)?,
                None => None,
            }
        };
        if let Some(node) = root.take() {
            root = Some(self.post_process(node));
        }
        if let Some(node) = &root {
            node.assign_parents();
            if !self.consider_position() {
                node.strip_origins();
            }
        }
        let issues = self.transformer().issues()[watermark..].to_vec();
        debug!(
            stage = "done",
            issues = issues.len(),
            "parsing run finished"
        );
        Ok(ParsingResult {
            issues,
            root,
            source_text: Some(code.to_string()),
            elapsed_ms: started.elapsed().as_millis() as u64,
            first_stage,
        })
    }
}

/// Stage-1 verification: the entire input must have been consumed and no
/// error-marker nodes may remain. Violations append syntactic issues without
/// aborting the run.
fn verify_source_tree(output: &FirstStageOutput, issues: &mut Vec<Issue>) {
    if !output.fully_consumed {
        issues.push(Issue::syntactic(
            "The whole input was not consumed",
            IssueSeverity::Error,
            output.remainder_range,
        ));
    }
    if let Some(root) = &output.root {
        collect_error_markers(root.clone(), issues);
    }
}

fn collect_error_markers(node: Rc<dyn ParseTreeNode>, issues: &mut Vec<Issue>) {
    if node.is_error_marker() {
        let message = match node.text() {
            Some(text) => format!("Error node found (token: {})", text),
            None => "Error node found".to_string(),
        };
        issues.push(Issue::syntactic(message, IssueSeverity::Error, node.range()));
    }
    for child in node.children() {
        collect_error_markers(child, issues);
    }
}
