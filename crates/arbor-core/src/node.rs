use crate::error::{ModelError, Result};
use crate::node_type::{Multiplicity, NodeType};
use crate::origin::Origin;
use crate::range::Range;
use crate::source::{RawValue, SourceNode, SourceRef};
use crate::value::Value;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Auxiliary data attached to a node without being part of the containment
/// tree: markers, resolved semantics, tool-specific payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub name: String,
    pub value: Option<Value>,
}

impl Annotation {
    pub fn new(name: impl Into<String>, value: Option<Value>) -> Annotation {
        Annotation {
            name: name.into(),
            value,
        }
    }
}

/// An identity-bearing tree element of the target model.
///
/// `Node` is a cheap handle: clones share the same underlying element, and
/// equality is identity. Feature values live in ordered slots matching the
/// type's feature table; the parent link is a non-owning back-reference
/// maintained by the engine and by [`assign_parents`](Node::assign_parents).
///
/// Handles are deliberately single-threaded (`Rc`-based): an engine and the
/// trees it produces stay on the thread that created them.
#[derive(Clone)]
pub struct Node {
    inner: Rc<NodeInner>,
}

struct NodeInner {
    node_type: NodeType,
    state: RefCell<NodeState>,
}

struct NodeState {
    slots: Vec<Option<Value>>,
    origin: Option<Origin>,
    range_override: Option<Range>,
    parent: Option<Weak<NodeInner>>,
    annotations: Vec<Annotation>,
}

impl Node {
    /// Creates a node with every feature at its default. Fails when the type
    /// is abstract or has a required feature without a default.
    pub fn new(node_type: &NodeType) -> Result<Node> {
        if node_type.is_abstract() {
            return Err(ModelError::AbstractType(node_type.name().to_string()));
        }
        if let Some(required) = node_type.first_required_feature() {
            return Err(ModelError::NotDefaultConstructible {
                type_name: node_type.name().to_string(),
                feature: required.name().to_string(),
            });
        }
        Ok(Node::with_slots(node_type, default_slots(node_type)))
    }

    /// Creates a node binding the given feature values by name; unbound
    /// features fall back to their defaults, and a required feature left
    /// without a value fails the construction.
    pub fn with_values<I>(node_type: &NodeType, values: I) -> Result<Node>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        if node_type.is_abstract() {
            return Err(ModelError::AbstractType(node_type.name().to_string()));
        }
        let mut slots = default_slots(node_type);
        for (name, value) in values {
            let index = node_type.feature_index(&name)?;
            let feature = &node_type.features()[index];
            feature
                .admits(&value)
                .map_err(|(expected, actual)| ModelError::TypeMismatch {
                    type_name: node_type.name().to_string(),
                    feature: name.clone(),
                    expected,
                    actual,
                })?;
            slots[index] = Some(value);
        }
        for (index, feature) in node_type.features().iter().enumerate() {
            if slots[index].is_none() && feature.multiplicity() == Multiplicity::Single {
                return Err(ModelError::MissingFeatureValue {
                    type_name: node_type.name().to_string(),
                    feature: feature.name().to_string(),
                });
            }
        }
        Ok(Node::with_slots(node_type, slots))
    }

    fn with_slots(node_type: &NodeType, slots: Vec<Option<Value>>) -> Node {
        Node {
            inner: Rc::new(NodeInner {
                node_type: node_type.clone(),
                state: RefCell::new(NodeState {
                    slots,
                    origin: None,
                    range_override: None,
                    parent: None,
                    annotations: Vec::new(),
                }),
            }),
        }
    }

    pub fn node_type(&self) -> &NodeType {
        &self.inner.node_type
    }

    /// Reads a feature value. Fails on unknown feature names.
    pub fn get(&self, feature: &str) -> Result<Option<Value>> {
        let index = self.inner.node_type.feature_index(feature)?;
        Ok(self.inner.state.borrow().slots[index].clone())
    }

    /// Writes a feature value, checking kind and multiplicity. `None` clears.
    pub fn set(&self, feature: &str, value: Option<Value>) -> Result<()> {
        let index = self.inner.node_type.feature_index(feature)?;
        if let Some(value) = &value {
            let declared = &self.inner.node_type.features()[index];
            declared
                .admits(value)
                .map_err(|(expected, actual)| ModelError::TypeMismatch {
                    type_name: self.inner.node_type.name().to_string(),
                    feature: feature.to_string(),
                    expected,
                    actual,
                })?;
        }
        self.inner.state.borrow_mut().slots[index] = value;
        Ok(())
    }

    pub fn origin(&self) -> Option<Origin> {
        self.inner.state.borrow().origin.clone()
    }

    /// Sets the provenance link. A node set as its own origin is normalized
    /// to no origin, which would otherwise form a cycle.
    pub fn set_origin(&self, origin: Option<Origin>) {
        let normalized = origin.filter(|o| !o.refers_to(self));
        self.inner.state.borrow_mut().origin = normalized;
    }

    /// The range explicitly set on this node, or the one derived from its
    /// origin.
    pub fn range(&self) -> Option<Range> {
        let state = self.inner.state.borrow();
        state
            .range_override
            .or_else(|| state.origin.as_ref().and_then(Origin::range))
    }

    pub fn set_range(&self, range: Option<Range>) {
        self.inner.state.borrow_mut().range_override = range;
    }

    pub fn parent(&self) -> Option<Node> {
        self.inner
            .state
            .borrow()
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Node { inner })
    }

    pub fn set_parent(&self, parent: Option<&Node>) {
        self.inner.state.borrow_mut().parent = parent.map(|p| Rc::downgrade(&p.inner));
    }

    pub fn annotations(&self) -> Vec<Annotation> {
        self.inner.state.borrow().annotations.clone()
    }

    pub fn add_annotation(&self, annotation: Annotation) {
        self.inner.state.borrow_mut().annotations.push(annotation);
    }

    /// The contained children, in feature declaration order; list features
    /// contribute their elements in order. Derived features are skipped.
    pub fn children(&self) -> Vec<Node> {
        let mut children = Vec::new();
        let state = self.inner.state.borrow();
        for (index, feature) in self.inner.node_type.features().iter().enumerate() {
            if feature.is_derived() || !feature.is_containment() {
                continue;
            }
            match &state.slots[index] {
                Some(Value::Node(node)) => children.push(node.clone()),
                Some(Value::List(values)) => {
                    for value in values {
                        if let Value::Node(node) = value {
                            children.push(node.clone());
                        }
                    }
                }
                _ => {}
            }
        }
        children
    }

    /// Structural comparison: same type name, same feature values, children
    /// compared recursively. Identity, parents, origins and annotations are
    /// ignored.
    pub fn structurally_equals(&self, other: &Node) -> bool {
        if self.inner.node_type.name() != other.inner.node_type.name() {
            return false;
        }
        let ours = self.inner.state.borrow();
        let theirs = other.inner.state.borrow();
        if ours.slots.len() != theirs.slots.len() {
            return false;
        }
        ours.slots
            .iter()
            .zip(theirs.slots.iter())
            .all(|(a, b)| match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => values_structurally_equal(a, b),
                _ => false,
            })
    }
}

fn default_slots(node_type: &NodeType) -> Vec<Option<Value>> {
    node_type
        .features()
        .iter()
        .map(|feature| match feature.default() {
            Some(default) => Some(default.clone()),
            None => match feature.multiplicity() {
                Multiplicity::Many => Some(Value::List(Vec::new())),
                _ => None,
            },
        })
        .collect()
}

fn values_structurally_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Node(a), Value::Node(b)) => a.structurally_equals(b),
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(a, b)| values_structurally_equal(a, b))
        }
        _ => a == b,
    }
}

impl PartialEq for Node {
    /// Nodes are identity-bearing: equality is handle identity. Use
    /// [`structurally_equals`](Node::structurally_equals) to compare shapes.
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        let mut s = f.debug_struct(self.inner.node_type.name());
        for (index, feature) in self.inner.node_type.features().iter().enumerate() {
            if let Some(value) = &state.slots[index] {
                s.field(feature.name(), value);
            }
        }
        s.finish()
    }
}

impl SourceNode for Node {
    fn node_type(&self) -> &NodeType {
        &self.inner.node_type
    }

    fn range(&self) -> Option<Range> {
        Node::range(self)
    }

    fn text(&self) -> Option<String> {
        self.origin().and_then(|origin| origin.text())
    }

    fn child(&self, name: &str) -> Option<RawValue> {
        let index = self.inner.node_type.feature_index(name).ok()?;
        let slot = self.inner.state.borrow().slots[index].clone();
        Some(match slot {
            None => RawValue::Absent,
            Some(Value::Node(node)) => RawValue::Node(Rc::new(node) as SourceRef),
            Some(Value::List(values)) => raw_from_list(values),
            Some(value) => RawValue::Value(value),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn raw_from_list(values: Vec<Value>) -> RawValue {
    let mut nodes: Vec<SourceRef> = Vec::with_capacity(values.len());
    for value in &values {
        match value {
            Value::Node(node) => nodes.push(Rc::new(node.clone()) as SourceRef),
            _ => return RawValue::Value(Value::List(values)),
        }
    }
    RawValue::Nodes(nodes)
}
