//! Runtime type descriptors.
//!
//! Every tree element carries a [`NodeType`]: its name, its declared
//! supertypes and an ordered table of [`Feature`]s. Descriptors are built
//! once, by the type's author, and are immutable afterwards; the ordered
//! feature table is the cached introspection product that the engine
//! enumerates instead of reflecting over concrete structs.

use crate::error::{ModelError, Result};
use crate::value::{EnumType, Value};
use once_cell::unsync::OnceCell;
use std::fmt;
use std::rc::Rc;

/// Names that clash with intrinsic node accessors.
pub const RESERVED_FEATURE_NAMES: [&str; 3] = ["parent", "range", "features"];

/// How many values a feature carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    Optional,
    Single,
    Many,
}

/// The declared kind of a feature's values.
///
/// A feature is node-valued (a containment) iff its kind is [`ValueKind::Node`];
/// references are plain attributes and are never traversed as children.
#[derive(Debug, Clone)]
pub enum ValueKind {
    Str,
    Int,
    Float,
    Bool,
    Enum(EnumType),
    Reference,
    /// Contained child nodes. `None` admits any node type.
    Node(Option<NodeType>),
}

impl ValueKind {
    pub fn is_node(&self) -> bool {
        matches!(self, ValueKind::Node(_))
    }

    fn describe(&self) -> String {
        match self {
            ValueKind::Str => "string".to_string(),
            ValueKind::Int => "integer".to_string(),
            ValueKind::Float => "float".to_string(),
            ValueKind::Bool => "boolean".to_string(),
            ValueKind::Enum(e) => format!("enum {}", e.name()),
            ValueKind::Reference => "reference".to_string(),
            ValueKind::Node(Some(ty)) => format!("node of type {}", ty.name()),
            ValueKind::Node(None) => "node".to_string(),
        }
    }
}

/// A structural feature of a node type.
#[derive(Debug, Clone)]
pub struct Feature {
    name: String,
    multiplicity: Multiplicity,
    kind: ValueKind,
    derived: bool,
    default: Option<Value>,
}

impl Feature {
    pub fn new(name: impl Into<String>, multiplicity: Multiplicity, kind: ValueKind) -> Feature {
        Feature {
            name: name.into(),
            multiplicity,
            kind,
            derived: false,
            default: None,
        }
    }

    /// Marks the feature as derived: computed, not part of the containment tree.
    pub fn derived(mut self) -> Feature {
        self.derived = true;
        self
    }

    /// Declares a default value, making the feature omissible at construction.
    pub fn with_default(mut self, default: Value) -> Feature {
        self.default = Some(default);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn is_derived(&self) -> bool {
        self.derived
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Whether the feature is node-valued, i.e. a containment.
    pub fn is_containment(&self) -> bool {
        self.kind.is_node()
    }

    /// Whether construction may omit this feature: optional and many features
    /// have natural empties, everything else needs a declared default.
    pub fn is_omissible(&self) -> bool {
        match self.multiplicity {
            Multiplicity::Optional | Multiplicity::Many => true,
            Multiplicity::Single => self.default.is_some(),
        }
    }

    /// Checks a single (non-list) value against the declared kind.
    fn admits_element(&self, value: &Value) -> bool {
        match (&self.kind, value) {
            (ValueKind::Str, Value::Str(_)) => true,
            (ValueKind::Int, Value::Int(_)) => true,
            (ValueKind::Float, Value::Float(_)) => true,
            (ValueKind::Bool, Value::Bool(_)) => true,
            (ValueKind::Enum(owner), Value::EnumLiteral { owner: actual, literal }) => {
                owner == actual && owner.has_literal(literal)
            }
            (ValueKind::Reference, Value::Reference(_)) => true,
            (ValueKind::Node(expected), Value::Node(node)) => match expected {
                None => true,
                // Placeholder nodes stand in for any node type.
                Some(ty) => node.node_type().is_placeholder() || node.node_type().is_subtype_of(ty),
            },
            _ => false,
        }
    }

    /// Checks a value against kind and multiplicity, reporting the mismatch.
    pub(crate) fn admits(&self, value: &Value) -> std::result::Result<(), (String, String)> {
        match self.multiplicity {
            Multiplicity::Many => match value {
                Value::List(elements) => {
                    for element in elements {
                        if !self.admits_element(element) {
                            return Err((
                                format!("list of {}", self.kind.describe()),
                                format!("list containing {}", element.kind_name()),
                            ));
                        }
                    }
                    Ok(())
                }
                other => Err((
                    format!("list of {}", self.kind.describe()),
                    other.kind_name().to_string(),
                )),
            },
            Multiplicity::Optional | Multiplicity::Single => {
                if self.admits_element(value) {
                    Ok(())
                } else {
                    Err((self.kind.describe(), value.kind_name().to_string()))
                }
            }
        }
    }
}

/// Runtime type descriptor: name, declared supertypes, ordered feature table.
///
/// Cheap to clone; abstract types additionally carry the closed list of
/// concrete variants, sealed once after the variants have been declared.
#[derive(Clone)]
pub struct NodeType {
    inner: Rc<NodeTypeInner>,
}

struct NodeTypeInner {
    name: String,
    supertypes: Vec<NodeType>,
    features: Vec<Feature>,
    is_abstract: bool,
    placeholder: bool,
    variants: OnceCell<Vec<NodeType>>,
}

impl NodeType {
    pub fn builder(name: impl Into<String>) -> NodeTypeBuilder {
        NodeTypeBuilder {
            name: name.into(),
            supertypes: Vec::new(),
            features: Vec::new(),
            is_abstract: false,
        }
    }

    fn from_builder(builder: NodeTypeBuilder, placeholder: bool) -> NodeType {
        NodeType {
            inner: Rc::new(NodeTypeInner {
                name: builder.name,
                supertypes: builder.supertypes,
                features: builder.features,
                is_abstract: builder.is_abstract,
                placeholder,
                variants: OnceCell::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn supertypes(&self) -> &[NodeType] {
        &self.inner.supertypes
    }

    /// The ordered feature table, in declaration order.
    pub fn features(&self) -> &[Feature] {
        &self.inner.features
    }

    pub fn is_abstract(&self) -> bool {
        self.inner.is_abstract
    }

    /// Whether this is one of the built-in stand-in types (generic or error
    /// node), which are admitted into any node-valued slot.
    pub fn is_placeholder(&self) -> bool {
        self.inner.placeholder
    }

    /// The concrete variants of an abstract type, empty until sealed.
    pub fn variants(&self) -> &[NodeType] {
        self.inner.variants.get().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Declares the closed set of variants of an abstract type. Callable once.
    pub fn seal_variants(&self, variants: impl IntoIterator<Item = NodeType>) -> Result<()> {
        if !self.inner.is_abstract {
            return Err(ModelError::NotAbstract(self.inner.name.clone()));
        }
        self.inner
            .variants
            .set(variants.into_iter().collect())
            .map_err(|_| ModelError::VariantsAlreadySealed(self.inner.name.clone()))
    }

    pub fn feature(&self, name: &str) -> Result<&Feature> {
        self.inner
            .features
            .iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| ModelError::UnknownFeature {
                type_name: self.inner.name.clone(),
                feature: name.to_string(),
            })
    }

    pub(crate) fn feature_index(&self, name: &str) -> Result<usize> {
        self.inner
            .features
            .iter()
            .position(|f| f.name() == name)
            .ok_or_else(|| ModelError::UnknownFeature {
                type_name: self.inner.name.clone(),
                feature: name.to_string(),
            })
    }

    /// Whether every feature can be omitted at construction.
    pub fn is_default_constructible(&self) -> bool {
        self.inner.features.iter().all(Feature::is_omissible)
    }

    /// The first feature blocking default construction, if any.
    pub fn first_required_feature(&self) -> Option<&Feature> {
        self.inner.features.iter().find(|f| !f.is_omissible())
    }

    /// Walks the declared supertypes depth-first, in declaration order.
    pub fn is_subtype_of(&self, other: &NodeType) -> bool {
        if self == other {
            return true;
        }
        self.inner
            .supertypes
            .iter()
            .any(|supertype| supertype.is_subtype_of(other))
    }
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner) || self.inner.name == other.inner.name
    }
}

impl Eq for NodeType {}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeType({})", self.inner.name)
    }
}

/// Builder for [`NodeType`]; rejects reserved and duplicate feature names.
pub struct NodeTypeBuilder {
    name: String,
    supertypes: Vec<NodeType>,
    features: Vec<Feature>,
    is_abstract: bool,
}

impl NodeTypeBuilder {
    pub fn supertype(mut self, supertype: &NodeType) -> NodeTypeBuilder {
        self.supertypes.push(supertype.clone());
        self
    }

    pub fn abstract_type(mut self) -> NodeTypeBuilder {
        self.is_abstract = true;
        self
    }

    pub fn feature(mut self, feature: Feature) -> NodeTypeBuilder {
        self.features.push(feature);
        self
    }

    /// A required single-valued attribute.
    pub fn attribute(self, name: impl Into<String>, kind: ValueKind) -> NodeTypeBuilder {
        self.feature(Feature::new(name, Multiplicity::Single, kind))
    }

    pub fn optional_attribute(self, name: impl Into<String>, kind: ValueKind) -> NodeTypeBuilder {
        self.feature(Feature::new(name, Multiplicity::Optional, kind))
    }

    /// A required single-valued containment.
    pub fn containment(self, name: impl Into<String>, ty: &NodeType) -> NodeTypeBuilder {
        self.feature(Feature::new(
            name,
            Multiplicity::Single,
            ValueKind::Node(Some(ty.clone())),
        ))
    }

    pub fn optional_containment(self, name: impl Into<String>, ty: &NodeType) -> NodeTypeBuilder {
        self.feature(Feature::new(
            name,
            Multiplicity::Optional,
            ValueKind::Node(Some(ty.clone())),
        ))
    }

    pub fn containment_list(self, name: impl Into<String>, ty: &NodeType) -> NodeTypeBuilder {
        self.feature(Feature::new(
            name,
            Multiplicity::Many,
            ValueKind::Node(Some(ty.clone())),
        ))
    }

    /// A named reference: an attribute, never traversed as a child.
    pub fn reference(self, name: impl Into<String>) -> NodeTypeBuilder {
        self.feature(Feature::new(name, Multiplicity::Single, ValueKind::Reference))
    }

    pub fn build(self) -> Result<NodeType> {
        for feature in &self.features {
            if RESERVED_FEATURE_NAMES.contains(&feature.name()) {
                return Err(ModelError::ReservedFeatureName(feature.name().to_string()));
            }
        }
        for (index, feature) in self.features.iter().enumerate() {
            if self.features[..index].iter().any(|f| f.name() == feature.name()) {
                return Err(ModelError::DuplicateFeature {
                    type_name: self.name.clone(),
                    feature: feature.name().to_string(),
                });
            }
        }
        Ok(NodeType::from_builder(self, false))
    }
}

/// The feature holding an error node's message.
pub const ERROR_MESSAGE_FEATURE: &str = "message";

thread_local! {
    static GENERIC_NODE_TYPE: NodeType = NodeType::from_builder(
        NodeType::builder("GenericNode"),
        true,
    );
    static ERROR_NODE_TYPE: NodeType = NodeType::from_builder(
        NodeType::builder("ErrorNode").attribute(ERROR_MESSAGE_FEATURE, ValueKind::Str),
        true,
    );
}

/// The built-in untyped stand-in used when no transformation rule applies.
pub fn generic_node_type() -> NodeType {
    GENERIC_NODE_TYPE.with(NodeType::clone)
}

/// The built-in stand-in recording a failed construction, with a `message`
/// attribute carrying the failure text.
pub fn error_node_type() -> NodeType {
    ERROR_NODE_TYPE.with(NodeType::clone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_feature_names_are_rejected() {
        let result = NodeType::builder("Broken")
            .attribute("parent", ValueKind::Str)
            .build();
        assert!(matches!(result, Err(ModelError::ReservedFeatureName(name)) if name == "parent"));
    }

    #[test]
    fn duplicate_feature_names_are_rejected() {
        let result = NodeType::builder("Broken")
            .attribute("value", ValueKind::Str)
            .attribute("value", ValueKind::Int)
            .build();
        assert!(matches!(result, Err(ModelError::DuplicateFeature { .. })));
    }

    #[test]
    fn unknown_feature_lookup_fails() {
        let ty = NodeType::builder("Empty").build().unwrap();
        assert!(matches!(
            ty.feature("missing"),
            Err(ModelError::UnknownFeature { .. })
        ));
    }

    #[test]
    fn subtype_walk_covers_transitive_supertypes() {
        let top = NodeType::builder("Top").abstract_type().build().unwrap();
        let mid = NodeType::builder("Mid")
            .abstract_type()
            .supertype(&top)
            .build()
            .unwrap();
        let leaf = NodeType::builder("Leaf").supertype(&mid).build().unwrap();
        assert!(leaf.is_subtype_of(&leaf));
        assert!(leaf.is_subtype_of(&mid));
        assert!(leaf.is_subtype_of(&top));
        assert!(!top.is_subtype_of(&leaf));
    }

    #[test]
    fn default_constructibility_follows_feature_shape() {
        let open = NodeType::builder("Open")
            .optional_attribute("label", ValueKind::Str)
            .feature(Feature::new("count", Multiplicity::Single, ValueKind::Int).with_default(Value::Int(0)))
            .build()
            .unwrap();
        assert!(open.is_default_constructible());

        let closed = NodeType::builder("Closed")
            .attribute("label", ValueKind::Str)
            .build()
            .unwrap();
        assert!(!closed.is_default_constructible());
        assert_eq!(closed.first_required_feature().map(Feature::name), Some("label"));
    }

    #[test]
    fn sealing_variants_twice_fails() {
        let top = NodeType::builder("Top").abstract_type().build().unwrap();
        let leaf = NodeType::builder("Leaf").supertype(&top).build().unwrap();
        top.seal_variants([leaf.clone()]).unwrap();
        assert_eq!(top.variants().len(), 1);
        assert!(matches!(
            top.seal_variants([leaf]),
            Err(ModelError::VariantsAlreadySealed(_))
        ));
    }

    #[test]
    fn sealing_a_concrete_type_fails() {
        let leaf = NodeType::builder("Leaf").build().unwrap();
        assert!(matches!(leaf.seal_variants([]), Err(ModelError::NotAbstract(_))));
    }
}
