//! Declarative registration: rules inferred from feature names.
//!
//! When a target type's features line up one-to-one with the source type's
//! accessors, no hand-written factory is needed: the engine reads each
//! feature's namesake child off the source, transforms it, and constructs
//! the target. Name mismatches are bridged with explicit rename pairs.

use crate::rule::TransformRule;
use crate::transformer::Transformer;
use arbor_core::{NodeType, RawValue, SourceNode, SourceRef};
use std::rc::Rc;

impl Transformer {
    /// Registers a rule mapping `source_type` to `target_type` by matching
    /// feature names against source accessors.
    pub fn register_declarative(
        &mut self,
        source_type: &NodeType,
        target_type: &NodeType,
    ) -> Rc<TransformRule> {
        self.register_declarative_renamed(source_type, target_type, &[])
    }

    /// Like [`register_declarative`](Transformer::register_declarative), with
    /// `(target feature, source accessor)` rename pairs for the features
    /// whose names differ between the two types.
    pub fn register_declarative_renamed(
        &mut self,
        source_type: &NodeType,
        target_type: &NodeType,
        renames: &[(&str, &str)],
    ) -> Rc<TransformRule> {
        let rule = TransformRule::declarative(source_type.name(), target_type.clone());
        for feature in target_type.features() {
            if feature.is_derived() {
                continue;
            }
            let accessor = renames
                .iter()
                .find(|(target, _)| *target == feature.name())
                .map(|(_, source)| source.to_string())
                .unwrap_or_else(|| feature.name().to_string());
            rule.with_child(feature.name(), move |source: &SourceRef| {
                Ok(source.child(&accessor).unwrap_or(RawValue::Absent))
            });
        }
        self.insert_rule(rule)
    }
}
