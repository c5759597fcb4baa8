//! Transformation rules: how one source type becomes target nodes.

use crate::transformer::Transformer;
use arbor_core::{Node, NodeType, RawValue, SourceRef, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Reads a raw child value off a source node.
pub type GetterFn = dyn Fn(&SourceRef) -> eyre::Result<RawValue>;
/// Assigns a transformed value onto an already-built target node.
pub type SetterFn = dyn Fn(&Node, Option<Value>) -> eyre::Result<()>;
/// Builds target nodes from a source node; may recurse through the engine.
pub type FactoryFn = dyn Fn(&SourceRef, &mut Transformer) -> eyre::Result<Vec<Node>>;
/// Runs on every produced node after origin and parent are in place.
pub type FinalizerFn = dyn Fn(&Node, &mut Transformer);

/// How a child value travels from source to target: a getter, and optionally
/// a setter. A resolver without a setter can only feed construction-time
/// binding, so registering one forces `children_set_at_construction`.
pub struct ChildResolver {
    name: String,
    getter: Rc<GetterFn>,
    setter: Option<Rc<SetterFn>>,
}

impl ChildResolver {
    fn new(
        name: impl Into<String>,
        getter: impl Fn(&SourceRef) -> eyre::Result<RawValue> + 'static,
        setter: Option<Rc<SetterFn>>,
    ) -> ChildResolver {
        ChildResolver {
            name: name.into(),
            getter: Rc::new(getter),
            setter,
        }
    }

    /// A resolver assigning through the target's own feature slot.
    fn with_feature_setter(
        feature: impl Into<String>,
        getter: impl Fn(&SourceRef) -> eyre::Result<RawValue> + 'static,
    ) -> ChildResolver {
        let feature = feature.into();
        let slot = feature.clone();
        let setter: Rc<SetterFn> = Rc::new(move |node: &Node, value: Option<Value>| {
            node.set(&slot, value)?;
            Ok(())
        });
        ChildResolver::new(feature, getter, Some(setter))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, source: &SourceRef) -> eyre::Result<RawValue> {
        (*self.getter)(source)
    }

    pub(crate) fn setter(&self) -> Option<Rc<SetterFn>> {
        self.setter.clone()
    }
}

pub(crate) enum RuleBody {
    Factory(Box<FactoryFn>),
    /// The engine itself constructs the given target type from the
    /// configured resolvers.
    Declarative { target: NodeType },
}

/// How resolver lookup for a feature turned out.
pub(crate) enum ResolverEntry {
    Configured(Rc<ChildResolver>),
    /// Cached knowledge that this feature has no child to populate.
    NoChild,
    Unconfigured,
}

/// A registered transformation rule for one source type.
///
/// Configuration is fluent and interior-mutable, so a rule can be adjusted
/// through the handle returned at registration; the engine reads it through
/// the same handle while transforming.
pub struct TransformRule {
    source_type: String,
    body: RuleBody,
    children: RefCell<HashMap<String, Option<Rc<ChildResolver>>>>,
    finalizer: RefCell<Option<Rc<FinalizerFn>>>,
    skip_children: Cell<bool>,
    children_set_at_construction: Cell<bool>,
}

impl TransformRule {
    pub(crate) fn single(
        source_type: impl Into<String>,
        factory: impl Fn(&SourceRef, &mut Transformer) -> eyre::Result<Option<Node>> + 'static,
    ) -> TransformRule {
        TransformRule::multi(source_type, move |source, transformer| {
            Ok(factory(source, transformer)?.into_iter().collect())
        })
    }

    pub(crate) fn multi(
        source_type: impl Into<String>,
        factory: impl Fn(&SourceRef, &mut Transformer) -> eyre::Result<Vec<Node>> + 'static,
    ) -> TransformRule {
        TransformRule {
            source_type: source_type.into(),
            body: RuleBody::Factory(Box::new(factory)),
            children: RefCell::new(HashMap::new()),
            finalizer: RefCell::new(None),
            skip_children: Cell::new(false),
            children_set_at_construction: Cell::new(false),
        }
    }

    pub(crate) fn declarative(source_type: impl Into<String>, target: NodeType) -> TransformRule {
        let children_at_construction = !target.is_default_constructible();
        TransformRule {
            source_type: source_type.into(),
            body: RuleBody::Declarative { target },
            children: RefCell::new(HashMap::new()),
            finalizer: RefCell::new(None),
            skip_children: Cell::new(false),
            children_set_at_construction: Cell::new(children_at_construction),
        }
    }

    pub fn source_type(&self) -> &str {
        &self.source_type
    }

    pub(crate) fn body(&self) -> &RuleBody {
        &self.body
    }

    /// Configures how to read and assign one target feature. The transformed
    /// value is assigned through the feature's own slot.
    pub fn with_child(
        &self,
        feature: impl Into<String>,
        getter: impl Fn(&SourceRef) -> eyre::Result<RawValue> + 'static,
    ) -> &Self {
        let feature = feature.into();
        self.insert_resolver(
            feature.clone(),
            ChildResolver::with_feature_setter(feature, getter),
        );
        self
    }

    /// Like [`with_child`](TransformRule::with_child), scoped to one target
    /// type: disambiguates rules producing different types that share a
    /// feature name.
    pub fn with_child_for(
        &self,
        target_type: &NodeType,
        feature: impl Into<String>,
        getter: impl Fn(&SourceRef) -> eyre::Result<RawValue> + 'static,
    ) -> &Self {
        let feature = feature.into();
        let key = qualified(target_type.name(), &feature);
        self.insert_resolver(key, ChildResolver::with_feature_setter(feature, getter));
        self
    }

    /// Configures a feature with an explicit setter, for targets that expose
    /// assignment through something other than the plain feature slot.
    pub fn with_child_setter(
        &self,
        feature: impl Into<String>,
        getter: impl Fn(&SourceRef) -> eyre::Result<RawValue> + 'static,
        setter: impl Fn(&Node, Option<Value>) -> eyre::Result<()> + 'static,
    ) -> &Self {
        let feature = feature.into();
        self.insert_resolver(
            feature.clone(),
            ChildResolver::new(feature, getter, Some(Rc::new(setter))),
        );
        self
    }

    /// Configures a getter-only feature. With no way to assign after the
    /// fact, children must be supplied at construction, so this forces
    /// `children_set_at_construction`.
    pub fn with_construction_child(
        &self,
        feature: impl Into<String>,
        getter: impl Fn(&SourceRef) -> eyre::Result<RawValue> + 'static,
    ) -> &Self {
        let feature = feature.into();
        self.insert_resolver(feature.clone(), ChildResolver::new(feature, getter, None));
        self.children_set_at_construction.set(true);
        self
    }

    pub fn with_finalizer(&self, finalizer: impl Fn(&Node, &mut Transformer) + 'static) -> &Self {
        *self.finalizer.borrow_mut() = Some(Rc::new(finalizer));
        self
    }

    /// Tells the engine this rule already takes care of the whole subtree:
    /// no automatic child population happens for its results.
    pub fn skip_children(&self, skip: bool) -> &Self {
        self.skip_children.set(skip);
        self
    }

    pub fn children_set_at_construction(&self, at_construction: bool) -> &Self {
        self.children_set_at_construction.set(at_construction);
        self
    }

    pub fn is_skip_children(&self) -> bool {
        self.skip_children.get()
    }

    pub fn is_children_set_at_construction(&self) -> bool {
        self.children_set_at_construction.get()
    }

    fn insert_resolver(&self, key: String, resolver: ChildResolver) {
        self.children
            .borrow_mut()
            .insert(key, Some(Rc::new(resolver)));
    }

    /// Looks a resolver up for a (target type, feature) pair: the
    /// type-qualified entry wins over the bare one.
    pub(crate) fn resolver_entry(&self, target_type: &str, feature: &str) -> ResolverEntry {
        let children = self.children.borrow();
        let entry = children
            .get(&qualified(target_type, feature))
            .or_else(|| children.get(feature));
        match entry {
            Some(Some(resolver)) => ResolverEntry::Configured(resolver.clone()),
            Some(None) => ResolverEntry::NoChild,
            None => ResolverEntry::Unconfigured,
        }
    }

    /// Remembers that a feature has no configured child, so later
    /// transformations skip the lookup.
    pub(crate) fn cache_no_child(&self, target_type: &str, feature: &str) {
        self.children
            .borrow_mut()
            .insert(qualified(target_type, feature), None);
    }

    pub(crate) fn finalizer(&self) -> Option<Rc<FinalizerFn>> {
        self.finalizer.borrow().clone()
    }
}

fn qualified(target_type: &str, feature: &str) -> String {
    format!("{}#{}", target_type, feature)
}
