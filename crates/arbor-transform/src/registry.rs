use crate::rule::TransformRule;
use arbor_core::NodeType;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// The transformation rules known to an engine, keyed by source type name.
#[derive(Default)]
pub struct RuleRegistry {
    rules: HashMap<String, Rc<TransformRule>>,
}

impl RuleRegistry {
    pub fn new() -> RuleRegistry {
        RuleRegistry::default()
    }

    /// Registers a rule for its source type. Re-registering a type replaces
    /// the previous rule; the replacement is only surfaced in the logs.
    pub fn insert(&mut self, rule: TransformRule) -> Rc<TransformRule> {
        let rule = Rc::new(rule);
        let previous = self
            .rules
            .insert(rule.source_type().to_string(), rule.clone());
        if previous.is_some() {
            debug!(
                source_type = rule.source_type(),
                "replacing previously registered transformation rule"
            );
        }
        rule
    }

    /// Dispatches a source type to a rule: the exact type first, then its
    /// declared supertypes depth-first in declaration order. An exact match
    /// always wins over an inherited one.
    pub fn lookup(&self, node_type: &NodeType) -> Option<Rc<TransformRule>> {
        if let Some(rule) = self.rules.get(node_type.name()) {
            return Some(rule.clone());
        }
        node_type
            .supertypes()
            .iter()
            .find_map(|supertype| self.lookup(supertype))
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}
