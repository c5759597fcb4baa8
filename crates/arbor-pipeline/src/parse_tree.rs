//! The source tree handed from stage 1 to stage 2.
//!
//! External parsers either implement [`ParseTreeNode`] on their own tree or
//! build the ready-made [`ParseNode`], which carries everything the driver
//! and the engine need: a kind descriptor, a span, children, labeled
//! accessors and the error-marker flag.

use arbor_core::{NodeType, Range, RawValue, SourceNode, SourceRef, Value};
use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

/// A node of the tree produced by the first-stage parser.
pub trait ParseTreeNode: SourceNode {
    fn children(&self) -> Vec<Rc<dyn ParseTreeNode>>;

    /// Whether the parser inserted this node while recovering from a syntax
    /// error.
    fn is_error_marker(&self) -> bool {
        false
    }

    /// The same node as an engine-facing source reference.
    fn to_source(self: Rc<Self>) -> SourceRef;
}

/// A labeled child accessor of a [`ParseNode`].
#[derive(Clone)]
enum Labeled {
    Value(Value),
    Node(Rc<ParseNode>),
    Nodes(Vec<Rc<ParseNode>>),
}

/// Ready-made parse tree node for parsers that do not bring their own tree.
pub struct ParseNode {
    node_type: NodeType,
    range: Option<Range>,
    token_text: Option<String>,
    children: Vec<Rc<ParseNode>>,
    labeled: HashMap<String, Labeled>,
    error_marker: bool,
}

impl ParseNode {
    pub fn new(node_type: &NodeType) -> ParseNode {
        ParseNode {
            node_type: node_type.clone(),
            range: None,
            token_text: None,
            children: Vec::new(),
            labeled: HashMap::new(),
            error_marker: false,
        }
    }

    pub fn with_range(mut self, range: Range) -> ParseNode {
        self.range = Some(range);
        self
    }

    /// The covered text, for terminals.
    pub fn with_token_text(mut self, text: impl Into<String>) -> ParseNode {
        self.token_text = Some(text.into());
        self
    }

    pub fn error_marker(mut self) -> ParseNode {
        self.error_marker = true;
        self
    }

    pub fn with_child(mut self, child: Rc<ParseNode>) -> ParseNode {
        self.children.push(child);
        self
    }

    /// Adds a labeled child; it is also part of the ordinary child list.
    pub fn with_labeled_child(mut self, label: impl Into<String>, child: Rc<ParseNode>) -> ParseNode {
        self.children.push(child.clone());
        self.labeled.insert(label.into(), Labeled::Node(child));
        self
    }

    pub fn with_labeled_children(
        mut self,
        label: impl Into<String>,
        children: Vec<Rc<ParseNode>>,
    ) -> ParseNode {
        self.children.extend(children.iter().cloned());
        self.labeled.insert(label.into(), Labeled::Nodes(children));
        self
    }

    /// Records a token-derived value under a label, e.g. an identifier text
    /// or a parsed literal.
    pub fn with_attribute(mut self, label: impl Into<String>, value: Value) -> ParseNode {
        self.labeled.insert(label.into(), Labeled::Value(value));
        self
    }

    pub fn child_nodes(&self) -> &[Rc<ParseNode>] {
        &self.children
    }

    /// Whether this node is a terminal (it carries token text directly).
    pub fn is_terminal(&self) -> bool {
        self.token_text.is_some()
    }

    fn covered_text(&self) -> Option<String> {
        if let Some(text) = &self.token_text {
            return Some(text.clone());
        }
        let parts: Vec<String> = self
            .children
            .iter()
            .filter_map(|child| child.covered_text())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

impl SourceNode for ParseNode {
    fn node_type(&self) -> &NodeType {
        &self.node_type
    }

    /// The explicitly set span, or the union of the children's spans.
    fn range(&self) -> Option<Range> {
        self.range.or_else(|| {
            self.children
                .iter()
                .filter_map(|child| SourceNode::range(child.as_ref()))
                .reduce(|merged, next| merged.union(&next))
        })
    }

    fn text(&self) -> Option<String> {
        self.covered_text()
    }

    fn child(&self, name: &str) -> Option<RawValue> {
        Some(match self.labeled.get(name)? {
            Labeled::Value(value) => RawValue::Value(value.clone()),
            Labeled::Node(node) => RawValue::Node(node.clone() as SourceRef),
            Labeled::Nodes(nodes) => {
                RawValue::Nodes(nodes.iter().map(|node| node.clone() as SourceRef).collect())
            }
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ParseTreeNode for ParseNode {
    fn children(&self) -> Vec<Rc<dyn ParseTreeNode>> {
        self.children
            .iter()
            .map(|child| child.clone() as Rc<dyn ParseTreeNode>)
            .collect()
    }

    fn is_error_marker(&self) -> bool {
        self.error_marker
    }

    fn to_source(self: Rc<Self>) -> SourceRef {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::{NodeType, Point};

    #[test]
    fn range_is_derived_from_children_when_unset() {
        let terminal = NodeType::builder("terminal").build().unwrap();
        let rule = NodeType::builder("rule").build().unwrap();
        let first = Rc::new(
            ParseNode::new(&terminal)
                .with_token_text("set")
                .with_range(Range::new(Point::new(1, 0), Point::new(1, 3))),
        );
        let second = Rc::new(
            ParseNode::new(&terminal)
                .with_token_text("foo")
                .with_range(Range::new(Point::new(1, 4), Point::new(1, 7))),
        );
        let parent = ParseNode::new(&rule).with_child(first).with_child(second);
        assert_eq!(
            SourceNode::range(&parent),
            Some(Range::new(Point::new(1, 0), Point::new(1, 7)))
        );
        assert_eq!(SourceNode::text(&parent), Some("set foo".to_string()));
    }

    #[test]
    fn labeled_accessors_surface_as_raw_values() {
        let rule = NodeType::builder("setStatement").build().unwrap();
        let node = ParseNode::new(&rule)
            .with_attribute("variable", Value::str("foo"))
            .with_attribute("value", Value::Int(123));
        assert!(matches!(
            node.child("variable"),
            Some(RawValue::Value(Value::Str(text))) if text == "foo"
        ));
        assert!(node.child("missing").is_none());
    }
}
