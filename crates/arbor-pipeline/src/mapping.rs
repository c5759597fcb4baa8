//! Registration helpers for grammars built on [`ParseNode`] trees.

use crate::parse_tree::ParseNode;
use arbor_core::{NodeType, SourceNode, SourceRef};
use arbor_transform::{TransformRule, Transformer};
use std::rc::Rc;

/// Extra registration modes available when the source tree is made of
/// [`ParseNode`]s.
pub trait ParseNodeRules {
    /// Grammars often have rules that only wrap a single inner rule. This
    /// registers a rule translating such a wrapper to the translation of its
    /// only node child, flattening the wrapper away.
    fn register_unwrapping_rule(&mut self, source_type: &NodeType) -> Rc<TransformRule>;
}

impl ParseNodeRules for Transformer {
    fn register_unwrapping_rule(&mut self, source_type: &NodeType) -> Rc<TransformRule> {
        self.register_rule(source_type, |source: &SourceRef, transformer| {
            let parse_node = source
                .as_any()
                .downcast_ref::<ParseNode>()
                .ok_or_else(|| eyre::eyre!("unwrapping rules require a ParseNode source tree"))?;
            let children: Vec<_> = parse_node
                .child_nodes()
                .iter()
                .filter(|child| !child.is_terminal())
                .cloned()
                .collect();
            eyre::ensure!(
                children.len() == 1,
                "wrapper node {} was expected to have exactly one rule child, it has {}",
                parse_node.node_type().name(),
                children.len()
            );
            let child: SourceRef = children[0].clone();
            Ok(transformer.transform(&child, None)?)
        })
    }
}
