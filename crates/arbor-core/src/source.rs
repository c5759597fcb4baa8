//! Abstraction over source trees fed to the transformation engine.

use crate::node_type::NodeType;
use crate::range::Range;
use crate::value::Value;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// What the engine needs from any source tree element: a runtime type
/// descriptor for rule dispatch, optional position and text for provenance,
/// and named child access for declarative resolvers.
///
/// Implemented by parse-tree nodes produced by first-stage parsers and by
/// [`Node`](crate::node::Node) itself, so trees already in the node model can
/// be transformed again (AST to AST).
pub trait SourceNode: Any {
    fn node_type(&self) -> &NodeType;

    fn range(&self) -> Option<Range> {
        None
    }

    /// The text this element covers in the original source, if known.
    fn text(&self) -> Option<String> {
        None
    }

    /// Reads a named child or attribute off this element. `None` means the
    /// element has no such accessor; a present-but-empty child is
    /// `Some(RawValue::Absent)`.
    fn child(&self, name: &str) -> Option<RawValue> {
        let _ = name;
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a source tree element.
pub type SourceRef = Rc<dyn SourceNode>;

/// A child value read off a source node, before transformation.
#[derive(Clone)]
pub enum RawValue {
    Absent,
    Node(SourceRef),
    Nodes(Vec<SourceRef>),
    /// A value passed through untransformed, e.g. a token text.
    Value(Value),
}

impl RawValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, RawValue::Absent)
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = SourceRef>) -> RawValue {
        RawValue::Nodes(nodes.into_iter().collect())
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> RawValue {
        RawValue::Value(value)
    }
}

impl From<SourceRef> for RawValue {
    fn from(node: SourceRef) -> RawValue {
        RawValue::Node(node)
    }
}

impl fmt::Debug for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Absent => write!(f, "Absent"),
            RawValue::Node(node) => write!(f, "Node({})", node.node_type().name()),
            RawValue::Nodes(nodes) => {
                write!(f, "Nodes[")?;
                for (index, node) in nodes.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", node.node_type().name())?;
                }
                write!(f, "]")
            }
            RawValue::Value(value) => write!(f, "Value({:?})", value),
        }
    }
}
