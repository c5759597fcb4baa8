use crate::node::Node;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Descriptor of a closed set of named constants, usable as an attribute kind.
#[derive(Clone)]
pub struct EnumType {
    inner: Rc<EnumTypeInner>,
}

struct EnumTypeInner {
    name: String,
    literals: Vec<String>,
}

impl EnumType {
    pub fn new(name: impl Into<String>, literals: impl IntoIterator<Item = impl Into<String>>) -> EnumType {
        EnumType {
            inner: Rc::new(EnumTypeInner {
                name: name.into(),
                literals: literals.into_iter().map(Into::into).collect(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn literals(&self) -> &[String] {
        &self.inner.literals
    }

    pub fn has_literal(&self, literal: &str) -> bool {
        self.inner.literals.iter().any(|l| l == literal)
    }

    /// The first declared constant, used as the canonical zero value.
    pub fn first_literal(&self) -> Option<&str> {
        self.inner.literals.first().map(String::as_str)
    }
}

impl fmt::Debug for EnumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnumType({})", self.inner.name)
    }
}

impl PartialEq for EnumType {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner) || self.inner.name == other.inner.name
    }
}

/// A named, non-owning link to a node, possibly outside the current subtree.
///
/// The target starts out unresolved; finalizers or later passes resolve it.
/// Cloning shares the resolution state.
#[derive(Clone)]
pub struct ReferenceByName {
    state: Rc<RefCell<ReferenceState>>,
}

struct ReferenceState {
    name: String,
    target: Option<Node>,
}

impl ReferenceByName {
    pub fn new(name: impl Into<String>) -> ReferenceByName {
        ReferenceByName {
            state: Rc::new(RefCell::new(ReferenceState {
                name: name.into(),
                target: None,
            })),
        }
    }

    pub fn name(&self) -> String {
        self.state.borrow().name.clone()
    }

    pub fn resolved(&self) -> bool {
        self.state.borrow().target.is_some()
    }

    pub fn target(&self) -> Option<Node> {
        self.state.borrow().target.clone()
    }

    pub fn resolve(&self, target: Node) {
        self.state.borrow_mut().target = Some(target);
    }
}

impl fmt::Debug for ReferenceByName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        if state.target.is_some() {
            write!(f, "Reference({}, resolved)", state.name)
        } else {
            write!(f, "Reference({})", state.name)
        }
    }
}

impl PartialEq for ReferenceByName {
    fn eq(&self, other: &Self) -> bool {
        if Rc::ptr_eq(&self.state, &other.state) {
            return true;
        }
        let a = self.state.borrow();
        let b = other.state.borrow();
        a.name == b.name
            && match (&a.target, &b.target) {
                (None, None) => true,
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
    }
}

/// A feature value carried by a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    EnumLiteral { owner: EnumType, literal: String },
    Reference(ReferenceByName),
    Node(Node),
    List(Vec<Value>),
}

impl Value {
    pub fn str(value: impl Into<String>) -> Value {
        Value::Str(value.into())
    }

    pub fn enum_literal(owner: &EnumType, literal: impl Into<String>) -> Value {
        Value::EnumLiteral {
            owner: owner.clone(),
            literal: literal.into(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(values) => Some(values),
            _ => None,
        }
    }

    /// Short description of the value's shape, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "boolean",
            Value::EnumLiteral { .. } => "enum literal",
            Value::Reference(_) => "reference",
            Value::Node(_) => "node",
            Value::List(_) => "list",
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Value {
        Value::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Value {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::Bool(value)
    }
}

impl From<Node> for Value {
    fn from(value: Node) -> Value {
        Value::Node(value)
    }
}
