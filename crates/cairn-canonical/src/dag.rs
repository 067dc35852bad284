//! DAG validation over node handles.
//!
//! The traversal is an iterative depth-first walk with an explicit work stack,
//! tracking which handles are on the active path. Reaching a handle that is
//! still on the path is a cycle; reaching one that is already finished is
//! structural sharing and is legal.

use std::collections::HashMap;

use tracing::trace;

use crate::canonicalizer::CanonicalizationError;
use crate::node::{FieldValue, Node, NodeArena, NodeId};
use crate::path::{Element, NodePath, PathStep};
use crate::schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnPath,
    Done,
}

struct Frame {
    id: NodeId,
    edges: Vec<(NodeId, PathStep)>,
    next: usize,
}

/// Result of a successful validation: a children-first order over every
/// reachable node, plus the first-discovered edge into each node.
#[derive(Debug, Clone)]
pub struct Traversal {
    root: NodeId,
    order: Vec<NodeId>,
    parents: HashMap<NodeId, (NodeId, PathStep)>,
}

impl Traversal {
    /// Root handle.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Reachable handles, each listed once, children before parents.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// Number of distinct reachable nodes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Always `false`: a traversal contains at least its root.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Path from the root to `id` along first-discovered edges.
    pub fn path_to(&self, id: NodeId) -> NodePath {
        let mut steps = Vec::new();
        let mut cursor = id;
        while let Some((parent, step)) = self.parents.get(&cursor) {
            steps.push(step.clone());
            cursor = *parent;
        }
        steps.reverse();
        NodePath::from_steps(steps)
    }
}

/// Outgoing child edges of `node`, with the slot step that leads to each.
pub fn child_edges(node: &Node) -> Vec<(NodeId, PathStep)> {
    let kind = node.kind();
    let mut edges = Vec::new();
    for (name, value) in node.attrs() {
        let step = PathStep {
            kind,
            slot: schema::slot_index(kind, name),
            name: name.to_string(),
            element: None,
        };
        collect_edges(value, &step, &mut edges);
    }
    edges
}

fn collect_edges(value: &FieldValue, step: &PathStep, out: &mut Vec<(NodeId, PathStep)>) {
    match value {
        FieldValue::Node(id) => out.push((*id, step.clone())),
        FieldValue::List(items) => {
            for (idx, item) in items.iter().enumerate() {
                let step = PathStep {
                    element: Some(step.element.clone().unwrap_or(Element::Index(idx))),
                    ..step.clone()
                };
                collect_edges(item, &step, out);
            }
        }
        FieldValue::Map(entries) => {
            for (key, item) in entries {
                let step = PathStep {
                    element: Some(
                        step.element
                            .clone()
                            .unwrap_or_else(|| Element::Key(key.clone())),
                    ),
                    ..step.clone()
                };
                collect_edges(item, &step, out);
            }
        }
        FieldValue::Scalar(_) | FieldValue::Cid(_) => {}
    }
}

/// Checks that the graph reachable from `root` is a DAG of existing nodes.
///
/// # Errors
///
/// - [`CanonicalizationError::CycleDetected`] on a back edge.
/// - [`CanonicalizationError::SchemaViolation`] on a dangling handle.
pub fn validate(arena: &NodeArena, root: NodeId) -> Result<(), CanonicalizationError> {
    topological_order(arena, root).map(|_| ())
}

/// Validates the graph and returns its children-first order.
pub fn topological_order(
    arena: &NodeArena,
    root: NodeId,
) -> Result<Traversal, CanonicalizationError> {
    let root_node = arena
        .get(root)
        .ok_or_else(|| CanonicalizationError::SchemaViolation {
            path: NodePath::root(),
            reason: format!("root handle {root} is not in the arena"),
        })?;

    let mut marks: HashMap<NodeId, Mark> = HashMap::new();
    let mut parents = HashMap::new();
    let mut order = Vec::new();
    let mut active: Vec<PathStep> = Vec::new();
    let mut stack = vec![Frame {
        id: root,
        edges: child_edges(root_node),
        next: 0,
    }];
    marks.insert(root, Mark::OnPath);

    while let Some(frame) = stack.last_mut() {
        let Some((child, step)) = frame.edges.get(frame.next).cloned() else {
            let id = frame.id;
            stack.pop();
            active.pop();
            marks.insert(id, Mark::Done);
            order.push(id);
            continue;
        };
        frame.next += 1;
        let parent = frame.id;

        match marks.get(&child) {
            Some(Mark::Done) => {
                trace!(node = %child, "shared sub-DAG revisited");
            }
            Some(Mark::OnPath) => {
                let path = active
                    .iter()
                    .cloned()
                    .chain(std::iter::once(step))
                    .fold(NodePath::root(), |path, step| path.push(step));
                return Err(CanonicalizationError::CycleDetected { path, node: child });
            }
            None => {
                let node = arena
                    .get(child)
                    .ok_or_else(|| CanonicalizationError::SchemaViolation {
                        path: active
                            .iter()
                            .cloned()
                            .chain(std::iter::once(step.clone()))
                            .fold(NodePath::root(), |path, step| path.push(step)),
                        reason: format!("child handle {child} is not in the arena"),
                    })?;
                parents.insert(child, (parent, step.clone()));
                active.push(step);
                marks.insert(child, Mark::OnPath);
                stack.push(Frame {
                    id: child,
                    edges: child_edges(node),
                    next: 0,
                });
            }
        }
    }

    Ok(Traversal {
        root,
        order,
        parents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::NodeKind;
    use crate::node::Node;

    fn var(arena: &mut NodeArena, name: &str) -> NodeId {
        arena.insert(Node::new(NodeKind::Var).with("name", name))
    }

    #[test]
    fn orders_children_before_parents() {
        let mut arena = NodeArena::new();
        let a = var(&mut arena, "a");
        let b = var(&mut arena, "b");
        let op = arena.insert(
            Node::new(NodeKind::BinOp)
                .with("op", "+")
                .with("left", a)
                .with("right", b),
        );
        let traversal = topological_order(&arena, op).unwrap();
        let order = traversal.order();
        assert_eq!(order.last(), Some(&op));
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn shared_subtree_is_not_a_cycle() {
        let mut arena = NodeArena::new();
        let shared = var(&mut arena, "x");
        let op = arena.insert(
            Node::new(NodeKind::BinOp)
                .with("op", "*")
                .with("left", shared)
                .with("right", shared),
        );
        let traversal = topological_order(&arena, op).unwrap();
        assert_eq!(traversal.len(), 2);
    }

    #[test]
    fn back_edge_is_reported_with_path() {
        let mut arena = NodeArena::new();
        // Block #0 -> Loop #1 -> Block #0
        let block = arena.insert(
            Node::new(NodeKind::Block).with("statements", FieldValue::list([NodeId::new(1)])),
        );
        arena.insert(Node::new(NodeKind::Loop).with("body", block));
        let err = validate(&arena, block).unwrap_err();
        match err {
            CanonicalizationError::CycleDetected { path, node } => {
                assert_eq!(node, block);
                assert_eq!(path.to_string(), "Block.statements[0]/Loop.body");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut arena = NodeArena::new();
        let id = arena.insert(Node::new(NodeKind::Block).with("result", NodeId::new(0)));
        assert!(matches!(
            validate(&arena, id),
            Err(CanonicalizationError::CycleDetected { .. })
        ));
    }

    #[test]
    fn dangling_child_is_a_schema_violation() {
        let mut arena = NodeArena::new();
        let id = arena.insert(Node::new(NodeKind::Block).with("result", NodeId::new(9)));
        assert!(matches!(
            validate(&arena, id),
            Err(CanonicalizationError::SchemaViolation { .. })
        ));
    }

    #[test]
    fn path_to_follows_first_discovery() {
        let mut arena = NodeArena::new();
        let a = var(&mut arena, "a");
        let block = arena.insert(
            Node::new(NodeKind::Block).with("statements", FieldValue::list([a])),
        );
        let traversal = topological_order(&arena, block).unwrap();
        assert_eq!(traversal.path_to(a).to_string(), "Block.statements[0]");
        assert_eq!(traversal.path_to(block).to_string(), "root");
    }

    #[test]
    fn deep_chains_do_not_overflow() {
        let mut arena = NodeArena::new();
        let mut tip = var(&mut arena, "leaf");
        for _ in 0..50_000 {
            tip = arena.insert(Node::new(NodeKind::Block).with("result", tip));
        }
        let traversal = topological_order(&arena, tip).unwrap();
        assert_eq!(traversal.len(), 50_001);
    }
}
