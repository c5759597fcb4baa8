//! End-to-end engine behavior over a small statement language: a foreign
//! source tree with a compilation unit containing `set` and `display`
//! statements, mapped onto a typed target model.

use arbor_core::{
    IssueSeverity, ModelError, Node, NodeType, Point, Range, RawValue, SourceNode, SourceRef,
    Value, ValueKind,
};
use arbor_transform::{TransformError, Transformer};
use pretty_assertions::assert_eq;
use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

/// A foreign source tree element, outside the target node model.
struct Ctx {
    ty: NodeType,
    fields: HashMap<String, RawValue>,
    range: Option<Range>,
    text: Option<String>,
}

impl SourceNode for Ctx {
    fn node_type(&self) -> &NodeType {
        &self.ty
    }

    fn range(&self) -> Option<Range> {
        self.range
    }

    fn text(&self) -> Option<String> {
        self.text.clone()
    }

    fn child(&self, name: &str) -> Option<RawValue> {
        self.fields.get(name).cloned()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn ctx(ty: &NodeType, fields: Vec<(&str, RawValue)>, range: Option<Range>) -> SourceRef {
    Rc::new(Ctx {
        ty: ty.clone(),
        fields: fields
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect(),
        range,
        text: None,
    })
}

fn line_range(line: u32, len: u32) -> Range {
    Range::new(Point::new(line, 0), Point::new(line, len))
}

/// Source and target type descriptors for the statement language.
struct Fixture {
    src_unit: NodeType,
    src_set: NodeType,
    src_display: NodeType,
    unit: NodeType,
    set: NodeType,
    display: NodeType,
}

fn fixture() -> Fixture {
    let src_unit = NodeType::builder("CompilationUnitCtx").build().unwrap();
    let src_set = NodeType::builder("SetStatementCtx").build().unwrap();
    let src_display = NodeType::builder("DisplayStatementCtx").build().unwrap();

    let statement = NodeType::builder("Statement").abstract_type().build().unwrap();
    let set = NodeType::builder("SetStatement")
        .supertype(&statement)
        .attribute("variable", ValueKind::Str)
        .attribute("value", ValueKind::Int)
        .build()
        .unwrap();
    let display = NodeType::builder("DisplayIntStatement")
        .supertype(&statement)
        .attribute("value", ValueKind::Int)
        .build()
        .unwrap();
    let unit = NodeType::builder("CompilationUnit")
        .containment_list("statements", &statement)
        .build()
        .unwrap();
    statement.seal_variants([set.clone(), display.clone()]).unwrap();

    Fixture {
        src_unit,
        src_set,
        src_display,
        unit,
        set,
        display,
    }
}

fn register_statement_rules(transformer: &mut Transformer, fixture: &Fixture) {
    let unit = fixture.unit.clone();
    let rule = transformer.register_rule(&fixture.src_unit, move |_, _| Ok(Some(Node::new(&unit)?)));
    rule.with_child("statements", |source: &SourceRef| {
        Ok(source.child("statements").unwrap_or(RawValue::Absent))
    });

    transformer.register_declarative(&fixture.src_set, &fixture.set);
    transformer.register_declarative(&fixture.src_display, &fixture.display);
}

/// The two-statement source tree: `set foo = 123` and `display 456`.
fn statement_source(fixture: &Fixture) -> SourceRef {
    let set = ctx(
        &fixture.src_set,
        vec![
            ("variable", RawValue::Value(Value::str("foo"))),
            ("value", RawValue::Value(Value::Int(123))),
        ],
        Some(line_range(1, 13)),
    );
    let display = ctx(
        &fixture.src_display,
        vec![("value", RawValue::Value(Value::Int(456)))],
        Some(line_range(2, 11)),
    );
    ctx(
        &fixture.src_unit,
        vec![("statements", RawValue::Nodes(vec![set, display]))],
        Some(Range::new(Point::new(1, 0), Point::new(2, 11))),
    )
}

#[test]
fn statements_map_to_typed_nodes_with_provenance() {
    let fixture = fixture();
    let mut transformer = Transformer::new();
    register_statement_rules(&mut transformer, &fixture);

    let source = statement_source(&fixture);
    let root = transformer.transform(&source, None).unwrap().unwrap();

    assert!(transformer.issues().is_empty());
    assert_eq!(root.node_type().name(), "CompilationUnit");
    let statements = root.children();
    assert_eq!(statements.len(), 2);

    let set = &statements[0];
    assert_eq!(set.node_type().name(), "SetStatement");
    assert_eq!(set.get("variable").unwrap(), Some(Value::str("foo")));
    assert_eq!(set.get("value").unwrap(), Some(Value::Int(123)));
    assert_eq!(set.range(), Some(line_range(1, 13)));

    let display = &statements[1];
    assert_eq!(display.node_type().name(), "DisplayIntStatement");
    assert_eq!(display.get("value").unwrap(), Some(Value::Int(456)));
    assert_eq!(display.range(), Some(line_range(2, 11)));
}

#[test]
fn transforming_twice_yields_structurally_equal_trees() {
    let fixture = fixture();
    let source = statement_source(&fixture);

    let build = || {
        let mut transformer = Transformer::new();
        register_statement_rules(&mut transformer, &fixture);
        transformer.transform(&source, None).unwrap().unwrap()
    };
    let first = build();
    let second = build();

    assert!(first != second);
    assert!(first.structurally_equals(&second));
    for (a, b) in first.walk().zip(second.walk()) {
        assert_eq!(a.range(), b.range());
    }
}

#[test]
fn parent_links_cover_the_whole_tree() {
    let fixture = fixture();
    let mut transformer = Transformer::new();
    register_statement_rules(&mut transformer, &fixture);
    let root = transformer
        .transform(&statement_source(&fixture), None)
        .unwrap()
        .unwrap();

    for node in root.walk() {
        match node.parent() {
            Some(parent) => assert!(parent.children().contains(&node)),
            None => assert!(node == root),
        }
    }
}

#[test]
fn unmapped_source_falls_back_to_a_generic_node() {
    let fixture = fixture();
    let mut transformer = Transformer::new();
    let unknown = ctx(&fixture.src_display, vec![], Some(line_range(4, 5)));

    let nodes = transformer.transform_nodes(&unknown, None).unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].node_type().name(), "GenericNode");
    assert_eq!(nodes[0].range(), Some(line_range(4, 5)));

    assert_eq!(transformer.issues().len(), 1);
    let issue = &transformer.issues()[0];
    assert_eq!(issue.severity, IssueSeverity::Warning);
    assert!(issue.message.contains("DisplayStatementCtx"));
}

#[test]
fn unmapped_source_fails_without_the_fallback() {
    let fixture = fixture();
    let mut transformer = Transformer::new().allow_generic_node(false);
    let unknown = ctx(&fixture.src_display, vec![], None);

    let result = transformer.transform_nodes(&unknown, None);
    assert!(matches!(
        result,
        Err(TransformError::UntranslatedNode { type_name }) if type_name == "DisplayStatementCtx"
    ));
}

#[test]
fn list_elements_transform_independently_and_in_order() {
    let fixture = fixture();
    let mut transformer = Transformer::new();
    register_statement_rules(&mut transformer, &fixture);

    let displays: Vec<SourceRef> = (0..3)
        .map(|index| {
            ctx(
                &fixture.src_display,
                vec![("value", RawValue::Value(Value::Int(index)))],
                None,
            )
        })
        .collect();
    let unit = ctx(
        &fixture.src_unit,
        vec![("statements", RawValue::Nodes(displays))],
        None,
    );

    let root = transformer.transform(&unit, None).unwrap().unwrap();
    let values: Vec<Option<Value>> = root
        .children()
        .iter()
        .map(|child| child.get("value").unwrap())
        .collect();
    assert_eq!(
        values,
        vec![Some(Value::Int(0)), Some(Value::Int(1)), Some(Value::Int(2))]
    );
}

#[test]
fn one_source_element_may_expand_to_many_targets() {
    let fixture = fixture();
    let mut transformer = Transformer::new();
    register_statement_rules(&mut transformer, &fixture);

    // A wrapper statement flattening into two displays.
    let src_pair = NodeType::builder("PairStatementCtx").build().unwrap();
    let display = fixture.display.clone();
    transformer.register_multi_rule(&src_pair, move |_, _| {
        let first = Node::with_values(&display, vec![("value".to_string(), Value::Int(7))])?;
        let second = Node::with_values(&display, vec![("value".to_string(), Value::Int(8))])?;
        Ok(vec![first, second])
    });

    let unit = ctx(
        &fixture.src_unit,
        vec![(
            "statements",
            RawValue::Nodes(vec![ctx(&src_pair, vec![], None)]),
        )],
        None,
    );
    let root = transformer.transform(&unit, None).unwrap().unwrap();
    assert_eq!(root.children().len(), 2);
}

#[test]
fn multi_result_rule_cannot_fill_a_single_slot() {
    let fixture = fixture();
    let mut transformer = Transformer::new();

    let src_pair = NodeType::builder("PairStatementCtx").build().unwrap();
    let display = fixture.display.clone();
    transformer.register_multi_rule(&src_pair, move |_, _| {
        Ok(vec![
            Node::with_values(&display, vec![("value".to_string(), Value::Int(1))])?,
            Node::with_values(&display, vec![("value".to_string(), Value::Int(2))])?,
        ])
    });

    let source = ctx(&src_pair, vec![], None);
    let result = transformer.transform(&source, None);
    assert!(matches!(
        result,
        Err(TransformError::AmbiguousResult { count: 2, .. })
    ));
}

#[test]
fn exact_rule_wins_over_inherited_rule() {
    let base = NodeType::builder("ExpressionCtx").build().unwrap();
    let exact = NodeType::builder("LiteralCtx").supertype(&base).build().unwrap();
    let inherited_only = NodeType::builder("NameCtx").supertype(&base).build().unwrap();

    let base_target = NodeType::builder("BaseNode").build().unwrap();
    let exact_target = NodeType::builder("LiteralNode").build().unwrap();

    let mut transformer = Transformer::new();
    let target = base_target.clone();
    transformer.register_rule(&base, move |_, _| Ok(Some(Node::new(&target)?)));
    let target = exact_target.clone();
    transformer.register_rule(&exact, move |_, _| Ok(Some(Node::new(&target)?)));

    let from_exact = transformer
        .transform(&ctx(&exact, vec![], None), None)
        .unwrap()
        .unwrap();
    assert_eq!(from_exact.node_type().name(), "LiteralNode");

    let from_supertype = transformer
        .transform(&ctx(&inherited_only, vec![], None), None)
        .unwrap()
        .unwrap();
    assert_eq!(from_supertype.node_type().name(), "BaseNode");
}

#[test]
fn re_registration_silently_replaces_the_rule() {
    let src = NodeType::builder("StatementCtx").build().unwrap();
    let first = NodeType::builder("FirstNode").build().unwrap();
    let second = NodeType::builder("SecondNode").build().unwrap();

    let mut transformer = Transformer::new();
    let target = first.clone();
    transformer.register_rule(&src, move |_, _| Ok(Some(Node::new(&target)?)));
    let target = second.clone();
    transformer.register_rule(&src, move |_, _| Ok(Some(Node::new(&target)?)));

    let node = transformer
        .transform(&ctx(&src, vec![], None), None)
        .unwrap()
        .unwrap();
    assert_eq!(node.node_type().name(), "SecondNode");
}

#[test]
fn getter_only_resolvers_feed_construction_time_binding() {
    let fixture = fixture();
    let mut transformer = Transformer::new();

    // SetStatement has two required attributes, so it cannot be built empty
    // and the declarative rule binds children at construction.
    let rule = transformer.register_declarative(&fixture.src_set, &fixture.set);
    assert!(rule.is_children_set_at_construction());
    rule.with_construction_child("variable", |source: &SourceRef| {
        Ok(source.child("variable").unwrap_or(RawValue::Absent))
    });

    let source = ctx(
        &fixture.src_set,
        vec![
            ("variable", RawValue::Value(Value::str("bar"))),
            ("value", RawValue::Value(Value::Int(9))),
        ],
        None,
    );
    let node = transformer.transform(&source, None).unwrap().unwrap();
    assert_eq!(node.get("variable").unwrap(), Some(Value::str("bar")));
    assert_eq!(node.get("value").unwrap(), Some(Value::Int(9)));
}

#[test]
fn default_constructible_targets_populate_after_construction() {
    let src = NodeType::builder("LabelCtx").build().unwrap();
    let target_ty = NodeType::builder("Label")
        .optional_attribute("text", ValueKind::Str)
        .build()
        .unwrap();

    let mut transformer = Transformer::new();
    let rule = transformer.register_declarative(&src, &target_ty);
    assert!(!rule.is_children_set_at_construction());

    let source = ctx(&src, vec![("text", RawValue::Value(Value::str("hi")))], None);
    let node = transformer.transform(&source, None).unwrap().unwrap();
    assert_eq!(node.get("text").unwrap(), Some(Value::str("hi")));
}

#[test]
fn failing_rule_becomes_an_error_node_with_the_failure_text() {
    let fixture = fixture();
    let mut transformer = Transformer::new();
    register_statement_rules(&mut transformer, &fixture);

    let src_bad = NodeType::builder("BadStatementCtx").build().unwrap();
    transformer.register_rule(&src_bad, |source: &SourceRef, _| {
        if let Some(RawValue::Value(Value::Str(message))) = source.child("exception") {
            eyre::bail!("parse exception: {}", message);
        }
        Ok(None)
    });

    let unit = ctx(
        &fixture.src_unit,
        vec![(
            "statements",
            RawValue::Nodes(vec![ctx(
                &src_bad,
                vec![("exception", RawValue::Value(Value::str("unexpected token")))],
                None,
            )]),
        )],
        None,
    );

    let root = transformer.transform(&unit, None).unwrap().unwrap();
    let children = root.children();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].node_type().name(), "ErrorNode");
    let message = children[0].get("message").unwrap().unwrap();
    assert!(message.as_str().unwrap().contains("unexpected token"));
}

#[test]
fn failing_rule_is_fatal_without_the_fallback() {
    let src_bad = NodeType::builder("BadStatementCtx").build().unwrap();
    let mut transformer = Transformer::new().allow_generic_node(false);
    transformer.register_rule(&src_bad, |_, _| Err(eyre::eyre!("boom")));

    let result = transformer.transform(&ctx(&src_bad, vec![], None), None);
    assert!(matches!(result, Err(TransformError::RuleFailed { .. })));
}

#[test]
fn configuration_defects_stay_fatal_despite_the_fallback() {
    let src = NodeType::builder("StatementCtx").build().unwrap();
    let target_ty = NodeType::builder("Plain").build().unwrap();

    let mut transformer = Transformer::new();
    let target = target_ty.clone();
    transformer.register_rule(&src, move |_, _| {
        let node = Node::new(&target)?;
        // Unknown feature: a defect in the rule, not in the input.
        node.set("no_such_feature", Some(Value::Int(1)))?;
        Ok(Some(node))
    });

    let result = transformer.transform(&ctx(&src, vec![], None), None);
    assert!(matches!(
        result,
        Err(TransformError::Model(ModelError::UnknownFeature { .. }))
    ));
}

#[test]
fn skip_children_leaves_the_rules_subtree_alone() {
    let src = NodeType::builder("WrapperCtx").build().unwrap();
    let leaf = NodeType::builder("Leaf")
        .optional_attribute("marker", ValueKind::Str)
        .build()
        .unwrap();
    let holder_ty = NodeType::builder("Holder")
        .optional_containment("content", &leaf)
        .build()
        .unwrap();

    let mut transformer = Transformer::new();
    let (holder, leaf_ty) = (holder_ty.clone(), leaf.clone());
    let rule = transformer.register_rule(&src, move |_, _| {
        let node = Node::new(&holder)?;
        let content = Node::new(&leaf_ty)?;
        content.set("marker", Some(Value::str("built by rule")))?;
        node.set("content", Some(Value::Node(content)))?;
        Ok(Some(node))
    });
    rule.with_child("content", |_source: &SourceRef| {
        Ok(RawValue::Value(Value::str("should never run")))
    })
    .skip_children(true);

    let node = transformer
        .transform(&ctx(&src, vec![], None), None)
        .unwrap()
        .unwrap();
    let content = node.get("content").unwrap().unwrap();
    assert_eq!(
        content.as_node().unwrap().get("marker").unwrap(),
        Some(Value::str("built by rule"))
    );
}

#[test]
fn identity_rules_keep_nodes_and_reattach_provenance() {
    let fixture = fixture();
    let mut transformer = Transformer::new();
    transformer.register_identity(&fixture.set);

    let original = Node::with_values(
        &fixture.set,
        vec![
            ("variable".to_string(), Value::str("x")),
            ("value".to_string(), Value::Int(1)),
        ],
    )
    .unwrap();
    let source: SourceRef = Rc::new(original.clone());
    let result = transformer.transform(&source, None).unwrap().unwrap();
    assert!(result == original);
    // The node is its own source here, so no origin cycle is created.
    assert!(result.origin().is_none());
}

#[test]
fn finalizers_run_after_parents_are_linked() {
    let fixture = fixture();
    let mut transformer = Transformer::new();

    let src = NodeType::builder("RefCtx").build().unwrap();
    let target_ty = NodeType::builder("VarReference")
        .reference("target")
        .build()
        .unwrap();

    let target = target_ty.clone();
    let rule = transformer.register_rule(&src, move |_, _| {
        Ok(Some(Node::with_values(
            &target,
            vec![(
                "target".to_string(),
                Value::Reference(arbor_core::ReferenceByName::new("foo")),
            )],
        )?))
    });
    let resolved = Node::with_values(
        &fixture.set,
        vec![
            ("variable".to_string(), Value::str("foo")),
            ("value".to_string(), Value::Int(123)),
        ],
    )
    .unwrap();
    let resolution = resolved.clone();
    rule.with_finalizer(move |node, _| {
        if let Ok(Some(Value::Reference(reference))) = node.get("target") {
            reference.resolve(resolution.clone());
        }
    });

    let node = transformer
        .transform(&ctx(&src, vec![], None), None)
        .unwrap()
        .unwrap();
    let Some(Value::Reference(reference)) = node.get("target").unwrap() else {
        panic!("expected a reference value");
    };
    assert!(reference.resolved());
    assert!(reference.target().unwrap() == resolved);
}

#[test]
fn declarative_renames_bridge_differing_accessor_names() {
    let src_ty = NodeType::builder("AssignCtx").build().unwrap();
    let target_ty = NodeType::builder("Assignment")
        .attribute("variable", ValueKind::Str)
        .attribute("value", ValueKind::Int)
        .build()
        .unwrap();

    let mut transformer = Transformer::new();
    transformer.register_declarative_renamed(&src_ty, &target_ty, &[("variable", "lhs")]);

    let source = ctx(
        &src_ty,
        vec![
            ("lhs", RawValue::Value(Value::str("total"))),
            ("value", RawValue::Value(Value::Int(5))),
        ],
        None,
    );
    let node = transformer.transform(&source, None).unwrap().unwrap();
    assert_eq!(node.get("variable").unwrap(), Some(Value::str("total")));
    assert_eq!(node.get("value").unwrap(), Some(Value::Int(5)));
}

#[test]
fn issues_keep_arrival_order_and_preexisting_entries() {
    let fixture = fixture();
    let seed = arbor_core::Issue::syntactic("leftover input", IssueSeverity::Error, None);
    let mut transformer = Transformer::with_issues(vec![seed.clone()]);

    let unknown = ctx(&fixture.src_display, vec![], None);
    transformer.transform_nodes(&unknown, None).unwrap();
    transformer.add_issue("manual note", IssueSeverity::Info, None);

    let issues = transformer.issues();
    assert_eq!(issues.len(), 3);
    assert_eq!(issues[0], seed);
    assert!(issues[1].message.contains("not mapped"));
    assert_eq!(issues[2].message, "manual note");
}

#[test]
fn collection_in_a_single_slot_is_a_caller_error() {
    let fixture = fixture();
    let src = NodeType::builder("HolderCtx").build().unwrap();
    let holder_ty = NodeType::builder("Holder")
        .optional_containment("content", &fixture.set)
        .build()
        .unwrap();

    let mut transformer = Transformer::new();
    let rule = transformer.register_declarative(&src, &holder_ty);
    rule.with_child("content", |source: &SourceRef| {
        Ok(source.child("items").unwrap_or(RawValue::Absent))
    });

    let item = ctx(&fixture.src_set, vec![], None);
    let source = ctx(&src, vec![("items", RawValue::Nodes(vec![item]))], None);
    let result = transformer.transform(&source, None);
    assert!(matches!(
        result,
        Err(TransformError::CollectionWhereValueExpected { feature }) if feature == "content"
    ));
}
