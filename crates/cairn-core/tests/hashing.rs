use cairn_canonical::{
    decode, encode, CanonicalizationError, ErrorClass, FieldValue, Node, NodeArena, NodeId,
    NodeKind,
};
use cairn_core::{structurally_equal, ContentHasher, CoreError, Document, HasherConfig};

fn hash(arena: &NodeArena, root: NodeId) -> cairn_core::HashOutput {
    ContentHasher::default().hash(arena, root).unwrap()
}

fn literal(author: &str) -> (NodeArena, NodeId) {
    let mut arena = NodeArena::new();
    let id = arena.insert(
        Node::new(NodeKind::Literal)
            .with("value", "10")
            .with("type", "Int32")
            .with("author", author),
    );
    (arena, id)
}

fn empty_map() -> FieldValue {
    FieldValue::Map(Vec::new())
}

fn empty_list() -> FieldValue {
    FieldValue::List(Vec::new())
}

#[test]
fn contextual_author_does_not_change_cid() {
    let (alice, a) = literal("alice");
    let (bob, b) = literal("bob");
    assert_eq!(hash(&alice, a).root, hash(&bob, b).root);
    assert!(structurally_equal(&alice, a, &bob, b).unwrap());
}

#[test]
fn different_kinds_with_same_value_differ() {
    let mut arena = NodeArena::new();
    let var = arena.insert(Node::new(NodeKind::Var).with("name", "10"));
    let primitive = arena.insert(Node::new(NodeKind::PrimitiveType).with("name", "10"));
    let composite = arena.insert(
        Node::new(NodeKind::CompositeType)
            .with("name", "10")
            .with("fields", empty_map()),
    );
    let cids = [
        hash(&arena, var).root,
        hash(&arena, primitive).root,
        hash(&arena, composite).root,
    ];
    assert_ne!(cids[0], cids[1]);
    assert_ne!(cids[0], cids[2]);
    assert_ne!(cids[1], cids[2]);
}

#[test]
fn bin_op_bytes_match_across_runs() {
    let build = || {
        let mut arena = NodeArena::new();
        let a = arena.insert(Node::new(NodeKind::Var).with("name", "a"));
        let one = arena.insert(Node::new(NodeKind::Literal).with("value", 1));
        let root = arena.insert(
            Node::new(NodeKind::BinOp)
                .with("op", "+")
                .with("left", a)
                .with("right", one),
        );
        (arena, root)
    };
    let (first_arena, first) = build();
    let (second_arena, second) = build();
    let one = hash(&first_arena, first);
    let two = hash(&second_arena, second);
    assert_eq!(one, two);
    assert_eq!(one.bytes_of(&one.root), two.bytes_of(&two.root));
}

#[test]
fn operand_order_is_significant() {
    let mut arena = NodeArena::new();
    let a = arena.insert(Node::new(NodeKind::Var).with("name", "a"));
    let b = arena.insert(Node::new(NodeKind::Var).with("name", "b"));
    let ab = arena.insert(
        Node::new(NodeKind::BinOp).with("op", "-").with("left", a).with("right", b),
    );
    let ba = arena.insert(
        Node::new(NodeKind::BinOp).with("op", "-").with("left", b).with("right", a),
    );
    assert_ne!(hash(&arena, ab).root, hash(&arena, ba).root);
}

#[test]
fn named_map_insertion_order_is_irrelevant() {
    let mut arena = NodeArena::new();
    let forward = arena.insert(
        Node::new(NodeKind::Constraint)
            .with("predicate", "range")
            .with("params", FieldValue::map([("max", 9), ("min", 0)])),
    );
    let backward = arena.insert(
        Node::new(NodeKind::Constraint)
            .with("predicate", "range")
            .with("params", FieldValue::map([("min", 0), ("max", 9)])),
    );
    let one = hash(&arena, forward);
    let two = hash(&arena, backward);
    assert_eq!(one.root, two.root);
    assert_eq!(
        ContentHasher::normal_form(&arena, forward, &one).unwrap(),
        ContentHasher::normal_form(&arena, backward, &two).unwrap()
    );
}

#[test]
fn block_statement_order_is_preserved() {
    let mut arena = NodeArena::new();
    let x = arena.insert(Node::new(NodeKind::Var).with("name", "x"));
    let y = arena.insert(Node::new(NodeKind::Var).with("name", "y"));
    let xy = arena.insert(Node::new(NodeKind::Block).with("statements", FieldValue::list([x, y])));
    let yx = arena.insert(Node::new(NodeKind::Block).with("statements", FieldValue::list([y, x])));
    let xx = arena.insert(Node::new(NodeKind::Block).with("statements", FieldValue::list([x, x])));
    let x_only = arena.insert(Node::new(NodeKind::Block).with("statements", FieldValue::list([x])));
    assert_ne!(hash(&arena, xy).root, hash(&arena, yx).root);
    assert_ne!(hash(&arena, xx).root, hash(&arena, x_only).root);
}

#[test]
fn absent_optional_differs_from_empty_and_default() {
    let mut arena = NodeArena::new();
    let body = arena.insert(Node::new(NodeKind::Block).with("statements", empty_list()));
    let unconditional = arena.insert(Node::new(NodeKind::Loop).with("body", body));
    let truthy = arena.insert(Node::new(NodeKind::Literal).with("value", true));
    let conditional = arena.insert(
        Node::new(NodeKind::Loop)
            .with("condition", truthy)
            .with("body", body),
    );
    assert_ne!(hash(&arena, unconditional).root, hash(&arena, conditional).root);

    let unsized_int = arena.insert(Node::new(NodeKind::PrimitiveType).with("name", "int"));
    let zero_bits = arena.insert(
        Node::new(NodeKind::PrimitiveType)
            .with("name", "int")
            .with("bits", 0),
    );
    assert_ne!(hash(&arena, unsized_int).root, hash(&arena, zero_bits).root);

    let no_result = arena.insert(Node::new(NodeKind::Block).with("statements", empty_list()));
    let empty_stmt = arena.insert(Node::new(NodeKind::Block).with("statements", empty_list()));
    let with_result = arena.insert(
        Node::new(NodeKind::Block)
            .with("statements", empty_list())
            .with("result", empty_stmt),
    );
    assert_ne!(hash(&arena, no_result).root, hash(&arena, with_result).root);
}

#[test]
fn cycles_are_rejected() {
    let mut arena = NodeArena::new();
    // Forward handle: node 0 points at node 1, which points back at node 0.
    let first = arena.insert(
        Node::new(NodeKind::BinOp)
            .with("op", "+")
            .with("left", NodeId::new(1))
            .with("right", NodeId::new(1)),
    );
    arena.insert(
        Node::new(NodeKind::BinOp)
            .with("op", "-")
            .with("left", first)
            .with("right", first),
    );
    let err = ContentHasher::default().hash(&arena, first).unwrap_err();
    match err {
        CoreError::Canonicalization(inner @ CanonicalizationError::CycleDetected { .. }) => {
            assert_eq!(inner.class(), ErrorClass::Structural);
        }
        other => panic!("expected a cycle, got {other:?}"),
    }
}

#[test]
fn self_loop_is_rejected_in_parallel_mode() {
    let mut arena = NodeArena::new();
    let block = arena.insert(
        Node::new(NodeKind::Block).with("statements", FieldValue::list([NodeId::new(0)])),
    );
    let hasher = ContentHasher::new(HasherConfig {
        parallel: true,
        ..HasherConfig::default()
    });
    assert!(matches!(
        hasher.hash(&arena, block),
        Err(CoreError::Canonicalization(CanonicalizationError::CycleDetected { .. }))
    ));
}

fn callee(arena: &mut NodeArena, note: &str) -> NodeId {
    let int = arena.insert(Node::new(NodeKind::PrimitiveType).with("name", "int"));
    let x = arena.insert(Node::new(NodeKind::Var).with("name", "x"));
    arena.insert(
        Node::new(NodeKind::Unit)
            .with("name", "math.identity")
            .with("params", FieldValue::map([("x", int)]))
            .with("returns", int)
            .with("body", x)
            .with("constraints", empty_list())
            .with("note", note),
    )
}

fn caller(target: FieldValue) -> (NodeArena, NodeId) {
    let mut arena = NodeArena::new();
    let arg = arena.insert(Node::new(NodeKind::Literal).with("value", 41));
    let call = arena.insert(
        Node::new(NodeKind::Call)
            .with("target", target)
            .with("args", FieldValue::list([arg]))
            .with("named_args", empty_map()),
    );
    let unit = arena.insert(
        Node::new(NodeKind::Unit)
            .with("name", "main")
            .with("params", empty_map())
            .with("body", call)
            .with("constraints", empty_list()),
    );
    (arena, unit)
}

#[test]
fn unit_references_unit_by_cid() {
    let mut callee_arena = NodeArena::new();
    let target_v1 = callee(&mut callee_arena, "draft");
    let target_v2 = callee(&mut callee_arena, "reviewed");
    let callee_v1 = hash(&callee_arena, target_v1);
    let callee_v2 = hash(&callee_arena, target_v2);
    assert_eq!(callee_v1.root, callee_v2.root);

    let (arena_v1, main_v1) = caller(callee_v1.reference());
    let (arena_v2, main_v2) = caller(callee_v2.reference());
    let out_v1 = hash(&arena_v1, main_v1);
    assert_eq!(out_v1.root, hash(&arena_v2, main_v2).root);

    let call = NodeId::new(1);
    let form = decode(out_v1.bytes_of(&out_v1.cid_of(call).unwrap()).unwrap()).unwrap();
    assert!(form.cids().contains(&callee_v1.root));
    // The callee's own nodes never enter the caller's output.
    assert!(!out_v1.blobs.contains_key(&callee_v1.root));
}

#[test]
fn inline_unit_in_reference_slot_is_unresolved() {
    let mut arena = NodeArena::new();
    let target = callee(&mut arena, "inline");
    let call = arena.insert(
        Node::new(NodeKind::Call)
            .with("target", target)
            .with("args", empty_list())
            .with("named_args", empty_map()),
    );
    let err = ContentHasher::default().hash(&arena, call).unwrap_err();
    match err {
        CoreError::Canonicalization(CanonicalizationError::UnresolvedReference { path, .. }) => {
            assert_eq!(path.to_string(), "Call.target");
        }
        other => panic!("expected unresolved reference, got {other:?}"),
    }
}

#[test]
fn schema_violation_carries_path() {
    let mut arena = NodeArena::new();
    let bad = arena.insert(Node::new(NodeKind::Var));
    let a = arena.insert(Node::new(NodeKind::Var).with("name", "a"));
    let root = arena.insert(
        Node::new(NodeKind::Block).with("statements", FieldValue::list([a, bad])),
    );
    let err = ContentHasher::default().hash(&arena, root).unwrap_err();
    match err {
        CoreError::Canonicalization(CanonicalizationError::SchemaViolation { path, .. }) => {
            assert_eq!(path.to_string(), "Block.statements[1]/Var.name");
        }
        other => panic!("expected schema violation, got {other:?}"),
    }
}

// Block.result chain: Block(Block(...(Var leaf)...)).
fn chain(depth: usize, leaf: Node) -> (NodeArena, NodeId) {
    let mut arena = NodeArena::new();
    let mut tip = arena.insert(leaf);
    for _ in 0..depth {
        tip = arena.insert(
            Node::new(NodeKind::Block)
                .with("statements", empty_list())
                .with("result", tip),
        );
    }
    (arena, tip)
}

#[test]
fn deep_chain_hashes_in_both_modes() {
    let (arena, root) = chain(50_000, Node::new(NodeKind::Var).with("name", "leaf"));
    let sequential = hash(&arena, root);
    let parallel = ContentHasher::new(HasherConfig {
        parallel: true,
        ..HasherConfig::default()
    })
    .hash(&arena, root)
    .unwrap();
    assert_eq!(sequential.node_cids.len(), 50_001);
    assert_eq!(sequential.blobs.len(), 50_001);
    assert_eq!(sequential, parallel);
}

#[test]
fn deep_chain_error_reports_full_path() {
    let (arena, root) = chain(3, Node::new(NodeKind::Var));
    let err = ContentHasher::default().hash(&arena, root).unwrap_err();
    match err {
        CoreError::Canonicalization(CanonicalizationError::SchemaViolation { path, .. }) => {
            assert_eq!(path.depth(), 4);
            assert_eq!(
                path.to_string(),
                "Block.result/Block.result/Block.result/Var.name"
            );
        }
        other => panic!("expected schema violation, got {other:?}"),
    }
}

#[test]
fn document_round_trip_through_bytes() {
    let doc = Document::from_json(
        r#"{"root": 3, "nodes": [
            {"kind": "Var", "fields": {"name": "a", "span": "1:1"}},
            {"kind": "Literal", "fields": {"value": 1.5}},
            {"kind": "BinOp", "fields": {"op": "*", "left": {"node": 0}, "right": {"node": 1}}},
            {"kind": "Block", "fields": {"statements": [{"node": 2}, {"node": 2}], "result": {"node": 0}}}
        ]}"#,
    )
    .unwrap();
    let output = hash(&doc.arena, doc.root);
    assert_eq!(output.node_cids.len(), 4);
    for id in output.node_cids.keys() {
        let form = ContentHasher::normal_form(&doc.arena, *id, &output).unwrap();
        let bytes = encode(&form);
        assert_eq!(decode(&bytes).unwrap(), form);
        assert_eq!(Some(bytes.as_slice()), output.bytes_of(&output.cid_of(*id).unwrap()));
    }
}
