//! The tree-to-tree transformation engine.
//!
//! For each source type a rule knows how to produce target nodes; the engine
//! drives dispatch, child resolution, provenance and parent links, and
//! collects diagnostics along the way. When no rule matches and the generic
//! fallback is enabled, a placeholder node keeps the output well-formed.

use crate::error::{is_configuration_defect, Result, TransformError};
use crate::registry::RuleRegistry;
use crate::rule::{ResolverEntry, RuleBody, TransformRule};
use arbor_core::node_type::ERROR_MESSAGE_FEATURE;
use arbor_core::{
    error_node_type, generic_node_type, Feature, Issue, IssueSeverity, ModelError, Multiplicity,
    Node, NodeType, Origin, Range, RawValue, SourceNode, SourceRef, Value,
};
use itertools::Itertools;
use std::rc::Rc;
use tracing::debug;

/// Transformation engine: an instance is configured once (rules, fallback
/// policy, seed issues) and then reused across any number of sequential runs.
///
/// The engine appends to its issue list and never mutates source trees. It is
/// deliberately single-threaded; concurrent runs need one engine per thread.
pub struct Transformer {
    registry: RuleRegistry,
    issues: Vec<Issue>,
    allow_generic_node: bool,
}

impl Default for Transformer {
    fn default() -> Transformer {
        Transformer::new()
    }
}

impl Transformer {
    pub fn new() -> Transformer {
        Transformer {
            registry: RuleRegistry::new(),
            issues: Vec::new(),
            allow_generic_node: true,
        }
    }

    /// Seeds the engine with pre-existing issues; they are preserved and
    /// appended to.
    pub fn with_issues(issues: Vec<Issue>) -> Transformer {
        Transformer {
            registry: RuleRegistry::new(),
            issues,
            allow_generic_node: true,
        }
    }

    /// Disables or re-enables the generic-node fallback for unmapped source
    /// types and failing rules.
    pub fn allow_generic_node(mut self, allow: bool) -> Transformer {
        self.allow_generic_node = allow;
        self
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn extend_issues(&mut self, issues: impl IntoIterator<Item = Issue>) {
        self.issues.extend(issues);
    }

    /// Appends a semantic issue, returning it for convenience.
    pub fn add_issue(
        &mut self,
        message: impl Into<String>,
        severity: IssueSeverity,
        range: Option<Range>,
    ) -> Issue {
        let issue = Issue::semantic(message, severity, range);
        self.issues.push(issue.clone());
        issue
    }

    /// Registers a single-result rule for a source type.
    pub fn register_rule(
        &mut self,
        source_type: &NodeType,
        factory: impl Fn(&SourceRef, &mut Transformer) -> eyre::Result<Option<Node>> + 'static,
    ) -> Rc<TransformRule> {
        self.registry
            .insert(TransformRule::single(source_type.name(), factory))
    }

    /// Registers a rule that may produce zero or many nodes, used to drop or
    /// flatten wrapper source nodes.
    pub fn register_multi_rule(
        &mut self,
        source_type: &NodeType,
        factory: impl Fn(&SourceRef, &mut Transformer) -> eyre::Result<Vec<Node>> + 'static,
    ) -> Rc<TransformRule> {
        self.registry
            .insert(TransformRule::multi(source_type.name(), factory))
    }

    /// Keeps nodes of the given type as they are, reattaching provenance and
    /// leaving their subtree untouched.
    pub fn register_identity(&mut self, node_type: &NodeType) -> Rc<TransformRule> {
        let rule = self.register_rule(node_type, |source, _| {
            let node = source
                .as_any()
                .downcast_ref::<Node>()
                .cloned()
                .ok_or_else(|| eyre::eyre!("identity rule applied to a source outside the node model"))?;
            Ok(Some(node))
        });
        rule.skip_children(true);
        rule
    }

    pub(crate) fn insert_rule(&mut self, rule: TransformRule) -> Rc<TransformRule> {
        self.registry.insert(rule)
    }

    /// Transforms one source node, requiring at most one result. A
    /// multi-result rule producing more fails with
    /// [`TransformError::AmbiguousResult`].
    pub fn transform(
        &mut self,
        source: &SourceRef,
        parent: Option<&Node>,
    ) -> Result<Option<Node>> {
        let nodes = self.transform_nodes(source, parent)?;
        match nodes.len() {
            0 | 1 => Ok(nodes.into_iter().next()),
            count => Err(TransformError::AmbiguousResult {
                type_name: source.node_type().name().to_string(),
                count,
            }),
        }
    }

    /// Transforms a node and, recursively, its descendants.
    pub fn transform_nodes(
        &mut self,
        source: &SourceRef,
        parent: Option<&Node>,
    ) -> Result<Vec<Node>> {
        let Some(rule) = self.registry.lookup(source.node_type()) else {
            return self.untranslated(source, parent);
        };
        let nodes = self.make_nodes(&rule, source)?;
        if !rule.is_skip_children() && !rule.is_children_set_at_construction() {
            for node in &nodes {
                self.populate_children(&rule, source, node)?;
            }
        }
        for node in &nodes {
            node.set_parent(parent);
            if let Some(finalizer) = rule.finalizer() {
                (*finalizer)(node, self);
            }
        }
        Ok(nodes)
    }

    /// Transforms an optional source, mapping absence to absence.
    pub fn transform_optional(&mut self, source: Option<&SourceRef>) -> Result<Option<Node>> {
        match source {
            Some(source) => self.transform(source, None),
            None => Ok(None),
        }
    }

    /// Transforms a whole sequence, flattening each element's results in
    /// source order.
    pub fn transform_list(&mut self, sources: &[SourceRef]) -> Result<Vec<Node>> {
        sources
            .iter()
            .map(|source| self.transform_nodes(source, None))
            .flatten_ok()
            .collect()
    }

    fn untranslated(&mut self, source: &SourceRef, parent: Option<&Node>) -> Result<Vec<Node>> {
        if !self.allow_generic_node {
            return Err(TransformError::UntranslatedNode {
                type_name: source.node_type().name().to_string(),
            });
        }
        debug!(
            source_type = source.node_type().name(),
            "no transformation rule matched, synthesizing a generic node"
        );
        let origin = origin_of(source);
        let range = origin.as_ref().and_then(Origin::range);
        let node = Node::new(&generic_node_type())?;
        node.set_origin(origin);
        node.set_parent(parent);
        self.issues.push(Issue::semantic(
            format!("Source node not mapped: {}", source.node_type().name()),
            IssueSeverity::Warning,
            range,
        ));
        Ok(vec![node])
    }

    /// Runs the rule's constructor and attaches provenance to every produced
    /// node that does not carry its own. A failing constructor downgrades to
    /// an error node when the fallback is enabled, unless the failure is a
    /// configuration defect, which stays fatal.
    fn make_nodes(&mut self, rule: &Rc<TransformRule>, source: &SourceRef) -> Result<Vec<Node>> {
        let produced = match rule.body() {
            RuleBody::Factory(factory) => factory(source, self),
            RuleBody::Declarative { target } => {
                let target = target.clone();
                self.construct_declarative(rule, &target, source)
            }
        };
        let nodes = match produced {
            Ok(nodes) => nodes,
            Err(report) => {
                let report = match report.downcast::<TransformError>() {
                    Ok(structural) => return Err(structural),
                    Err(report) => report,
                };
                let report = match report.downcast::<ModelError>() {
                    Ok(defect) if is_configuration_defect(&defect) => return Err(defect.into()),
                    Ok(model) => eyre::Report::new(model),
                    Err(report) => report,
                };
                if !self.allow_generic_node {
                    return Err(TransformError::RuleFailed {
                        type_name: rule.source_type().to_string(),
                        report,
                    });
                }
                vec![error_node(&report)?]
            }
        };
        for node in &nodes {
            if node.origin().is_none() {
                node.set_origin(origin_of(source));
            }
        }
        Ok(nodes)
    }

    /// Construction-time binding: resolve every configured child feature
    /// first, then construct with the values bound by name. Features without
    /// a resolver fall back to their declared defaults.
    fn construct_declarative(
        &mut self,
        rule: &Rc<TransformRule>,
        target: &NodeType,
        source: &SourceRef,
    ) -> eyre::Result<Vec<Node>> {
        if !rule.is_children_set_at_construction() {
            return Ok(vec![Node::new(target)?]);
        }
        let mut bound = Vec::new();
        for feature in target.features() {
            let ResolverEntry::Configured(resolver) =
                rule.resolver_entry(target.name(), feature.name())
            else {
                continue;
            };
            let raw = resolver.get(source)?;
            if let Some(value) = self.resolve_raw(&raw, feature, None)? {
                bound.push((feature.name().to_string(), value));
            }
        }
        let node = Node::with_values(target, bound)?;
        for child in node.children() {
            child.set_parent(Some(&node));
        }
        Ok(vec![node])
    }

    /// Post-construction population: walk the produced node's features and
    /// assign every one with a configured resolver; the rest are cached as
    /// no-child entries so later transformations skip them.
    fn populate_children(
        &mut self,
        rule: &Rc<TransformRule>,
        source: &SourceRef,
        node: &Node,
    ) -> Result<()> {
        let node_type = node.node_type().clone();
        for feature in node_type.features() {
            match rule.resolver_entry(node_type.name(), feature.name()) {
                ResolverEntry::Configured(resolver) => {
                    let raw = resolver
                        .get(source)
                        .map_err(|report| TransformError::ChildAssignmentFailed {
                            feature: feature.name().to_string(),
                            report,
                        })?;
                    let value = self.resolve_raw(&raw, feature, Some(node))?;
                    let setter =
                        resolver
                            .setter()
                            .ok_or_else(|| TransformError::ChildAssignmentFailed {
                                feature: feature.name().to_string(),
                                report: eyre::eyre!(
                                    "resolver has no setter and children are not set at construction"
                                ),
                            })?;
                    (*setter)(node, value).map_err(|report| TransformError::ChildAssignmentFailed {
                        feature: feature.name().to_string(),
                        report,
                    })?;
                }
                ResolverEntry::NoChild => {}
                ResolverEntry::Unconfigured => rule.cache_no_child(node_type.name(), feature.name()),
            }
        }
        Ok(())
    }

    /// Turns a raw child value into a target feature value, transforming
    /// node-valued raws recursively. A many feature expects an ordered
    /// sequence whose elements transform independently and flatten; a single
    /// feature requires at most one result per element.
    fn resolve_raw(
        &mut self,
        raw: &RawValue,
        feature: &Feature,
        parent: Option<&Node>,
    ) -> Result<Option<Value>> {
        match feature.multiplicity() {
            Multiplicity::Many => match raw {
                RawValue::Absent => Ok(None),
                RawValue::Nodes(sources) => {
                    let nodes: Vec<Node> = sources
                        .iter()
                        .map(|source| self.transform_nodes(source, parent))
                        .flatten_ok()
                        .collect::<Result<_>>()?;
                    Ok(Some(Value::List(nodes.into_iter().map(Value::Node).collect())))
                }
                RawValue::Node(_) => Err(TransformError::ValueWhereCollectionExpected {
                    feature: feature.name().to_string(),
                }),
                RawValue::Value(value) => Ok(Some(value.clone())),
            },
            Multiplicity::Optional | Multiplicity::Single => match raw {
                RawValue::Absent => Ok(None),
                RawValue::Node(source) => {
                    Ok(self.transform(source, parent)?.map(Value::Node))
                }
                RawValue::Nodes(_) => Err(TransformError::CollectionWhereValueExpected {
                    feature: feature.name().to_string(),
                }),
                RawValue::Value(value) => Ok(Some(value.clone())),
            },
        }
    }
}

/// The provenance record a source node contributes to its transformation.
pub fn origin_of(source: &SourceRef) -> Option<Origin> {
    match source.as_any().downcast_ref::<Node>() {
        Some(node) => Some(Origin::Node(node.clone())),
        None => Some(Origin::Source(source.clone())),
    }
}

fn error_node(report: &eyre::Report) -> Result<Node> {
    let node = Node::with_values(
        &error_node_type(),
        vec![(
            ERROR_MESSAGE_FEATURE.to_string(),
            Value::Str(format!("{:#}", report)),
        )],
    )?;
    Ok(node)
}
