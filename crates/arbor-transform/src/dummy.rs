//! Placeholder construction: well-typed, semantically empty instances.
//!
//! Used to fill a typed slot when no real content is available, e.g. while
//! recovering from partial input. Abstract types are resolved through their
//! sealed variant closure; self-referential closures terminate through a
//! deterministic, depth-indexed variant choice plus an explicit bound.

use crate::error::{Result, TransformError};
use arbor_core::{generic_node_type, Feature, Node, NodeType, ReferenceByName, Value, ValueKind};

const MAX_DEPTH: usize = 16;

/// Builds a semantically empty instance of the given type: defaults where
/// declared, canonical zero values elsewhere, and recursively built children
/// for required containments.
pub fn dummy_instance(node_type: &NodeType) -> Result<Node> {
    instance_at(node_type, 0)
}

fn instance_at(node_type: &NodeType, depth: usize) -> Result<Node> {
    let concrete = pick_concrete(node_type, depth)?;
    let mut values = Vec::new();
    for feature in concrete.features() {
        if feature.is_omissible() {
            continue;
        }
        values.push((feature.name().to_string(), zero_value(feature, depth)?));
    }
    Ok(Node::with_values(&concrete, values)?)
}

/// The canonical zero value for a required feature.
fn zero_value(feature: &Feature, depth: usize) -> Result<Value> {
    match feature.kind() {
        ValueKind::Str => Ok(Value::str("")),
        ValueKind::Int => Ok(Value::Int(0)),
        ValueKind::Float => Ok(Value::Float(0.0)),
        ValueKind::Bool => Ok(Value::Bool(false)),
        ValueKind::Enum(owner) => match owner.first_literal() {
            Some(literal) => Ok(Value::enum_literal(owner, literal)),
            None => Err(TransformError::EmptyEnum(owner.name().to_string())),
        },
        ValueKind::Reference => Ok(Value::Reference(ReferenceByName::new("unknown"))),
        ValueKind::Node(Some(child_type)) => {
            Ok(Value::Node(instance_at(child_type, depth + 1)?))
        }
        ValueKind::Node(None) => Ok(Value::Node(Node::new(&generic_node_type())?)),
    }
}

/// Resolves an abstract type to a concrete variant. A variant with an
/// all-defaults construction is preferred; otherwise the choice is indexed
/// by the current recursion depth, which keeps self-referential closures
/// from looping on the same variant forever.
fn pick_concrete(node_type: &NodeType, depth: usize) -> Result<NodeType> {
    if !node_type.is_abstract() {
        return Ok(node_type.clone());
    }
    if depth > MAX_DEPTH {
        return Err(TransformError::PlaceholderDepthExceeded(
            node_type.name().to_string(),
        ));
    }
    let candidates: Vec<&NodeType> = node_type
        .variants()
        .iter()
        .filter(|variant| is_instantiable(variant))
        .collect();
    if candidates.is_empty() {
        return Err(TransformError::NoInstantiableVariant(
            node_type.name().to_string(),
        ));
    }
    if let Some(defaulted) = candidates
        .iter()
        .find(|variant| !variant.is_abstract() && variant.is_default_constructible())
    {
        return Ok((*defaulted).clone());
    }
    let chosen = candidates[depth % candidates.len()];
    pick_concrete(chosen, depth + 1)
}

fn is_instantiable(node_type: &NodeType) -> bool {
    if node_type.is_abstract() {
        node_type.variants().iter().any(is_instantiable)
    } else {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::{EnumType, Multiplicity, NodeType, ValueKind};

    #[test]
    fn concrete_type_gets_zero_values() {
        let color = EnumType::new("Color", ["Red", "Green"]);
        let ty = NodeType::builder("Shape")
            .attribute("label", ValueKind::Str)
            .attribute("sides", ValueKind::Int)
            .attribute("filled", ValueKind::Bool)
            .attribute("color", ValueKind::Enum(color.clone()))
            .build()
            .unwrap();
        let node = dummy_instance(&ty).unwrap();
        assert_eq!(node.get("label").unwrap(), Some(Value::str("")));
        assert_eq!(node.get("sides").unwrap(), Some(Value::Int(0)));
        assert_eq!(node.get("filled").unwrap(), Some(Value::Bool(false)));
        assert_eq!(
            node.get("color").unwrap(),
            Some(Value::enum_literal(&color, "Red"))
        );
    }

    #[test]
    fn abstract_type_prefers_default_constructible_variant() {
        let ty = NodeType::builder("Expression").abstract_type().build().unwrap();
        let literal = NodeType::builder("Literal")
            .supertype(&ty)
            .feature(
                arbor_core::Feature::new("value", Multiplicity::Single, ValueKind::Int)
                    .with_default(Value::Int(0)),
            )
            .build()
            .unwrap();
        let call = NodeType::builder("Call")
            .supertype(&ty)
            .attribute("callee", ValueKind::Str)
            .build()
            .unwrap();
        ty.seal_variants([call, literal.clone()]).unwrap();
        let node = dummy_instance(&ty).unwrap();
        assert_eq!(node.node_type().name(), "Literal");
    }

    #[test]
    fn self_referential_closure_terminates() {
        let ty = NodeType::builder("Type").abstract_type().build().unwrap();
        let array = NodeType::builder("ArrayType")
            .supertype(&ty)
            .containment("element", &ty)
            .build()
            .unwrap();
        let primitive = NodeType::builder("PrimitiveType")
            .supertype(&ty)
            .attribute("name", ValueKind::Str)
            .build()
            .unwrap();
        ty.seal_variants([array, primitive]).unwrap();
        // No all-defaults variant exists, so the pick rotates with depth and
        // must bottom out instead of recursing on ArrayType forever.
        let node = dummy_instance(&ty).unwrap();
        assert!(node.walk().count() <= MAX_DEPTH + 2);
    }

    #[test]
    fn unsealed_abstract_type_has_no_variant() {
        let ty = NodeType::builder("Never").abstract_type().build().unwrap();
        assert!(matches!(
            dummy_instance(&ty),
            Err(TransformError::NoInstantiableVariant(_))
        ));
    }
}
