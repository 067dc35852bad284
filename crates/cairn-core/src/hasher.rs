//! Bottom-up content hashing over a node arena.
//!
//! The hasher validates the DAG once, walks it in post-order and, for every
//! node not yet in the memo, canonicalizes it against the CIDs of its already
//! hashed children, encodes it and digests the bytes. The memo is keyed by
//! [`NodeId`], so a sub-DAG shared by several parents is hashed once.
//!
//! In parallel mode nodes are grouped by height (leaves are height 0) and each
//! level is hashed on the rayon pool against the memo filled by lower levels.
//! Output is byte-identical to sequential mode.

use std::collections::{BTreeMap, HashMap};

use cairn_canonical::{
    dag, encode, topological_order, CanonicalizationError, Canonicalizer, Cid, CidAlg,
    FieldValue, NodeArena, NodeId, NodePath, NormalForm, Traversal,
};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::errors::CoreError;

/// Hasher settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HasherConfig {
    /// Digest algorithm for every CID in the output.
    pub alg: CidAlg,
    /// Hash independent nodes of each height level on the rayon pool.
    pub parallel: bool,
}

/// Result of hashing one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashOutput {
    /// CID of the root node.
    pub root: Cid,
    /// CID of every node reachable from the root.
    pub node_cids: BTreeMap<NodeId, Cid>,
    /// Canonical bytes per distinct CID.
    pub blobs: BTreeMap<Cid, Vec<u8>>,
}

impl HashOutput {
    /// Value a producer places in a reference slot of another document.
    pub fn reference(&self) -> FieldValue {
        FieldValue::Cid(self.root)
    }

    /// CID of `id`, if it was reachable from the root.
    pub fn cid_of(&self, id: NodeId) -> Option<Cid> {
        self.node_cids.get(&id).copied()
    }

    /// Canonical bytes stored under `cid`.
    pub fn bytes_of(&self, cid: &Cid) -> Option<&[u8]> {
        self.blobs.get(cid).map(Vec::as_slice)
    }
}

/// Computes CIDs for node DAGs.
#[derive(Debug, Clone, Default)]
pub struct ContentHasher {
    config: HasherConfig,
}

impl ContentHasher {
    /// Creates a hasher with the given configuration.
    pub fn new(config: HasherConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> HasherConfig {
        self.config
    }

    /// Hashes the DAG rooted at `root`.
    ///
    /// # Errors
    ///
    /// Fails on the first structural or normalization error; no partial
    /// output is returned.
    pub fn hash(&self, arena: &NodeArena, root: NodeId) -> Result<HashOutput, CoreError> {
        self.session(arena).hash(root)
    }

    /// Opens a session that keeps its memo across several roots of `arena`.
    pub fn session<'a>(&self, arena: &'a NodeArena) -> HashSession<'a> {
        HashSession {
            arena,
            config: self.config,
            memo: HashMap::new(),
            blobs: HashMap::new(),
        }
    }

    /// Re-derives the normal form of `id` from a completed output.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotHashed`] if `output` does not cover `id`.
    pub fn normal_form(
        arena: &NodeArena,
        id: NodeId,
        output: &HashOutput,
    ) -> Result<NormalForm, CoreError> {
        if !output.node_cids.contains_key(&id) {
            return Err(CoreError::NotHashed(id));
        }
        Ok(Canonicalizer::new(arena).canonicalize(id, &output.node_cids, &NodePath::root())?)
    }
}

/// Hashing state shared across roots of one arena.
pub struct HashSession<'a> {
    arena: &'a NodeArena,
    config: HasherConfig,
    memo: HashMap<NodeId, Cid>,
    blobs: HashMap<Cid, Vec<u8>>,
}

impl HashSession<'_> {
    /// Number of nodes hashed so far.
    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    /// Hashes the DAG rooted at `root`, reusing work from earlier roots.
    ///
    /// # Errors
    ///
    /// See [`ContentHasher::hash`].
    pub fn hash(&mut self, root: NodeId) -> Result<HashOutput, CoreError> {
        let traversal = topological_order(self.arena, root)?;
        let pending: Vec<NodeId> = traversal
            .order()
            .iter()
            .copied()
            .filter(|id| !self.memo.contains_key(id))
            .collect();
        debug!(
            %root,
            reachable = traversal.len(),
            pending = pending.len(),
            alg = %self.config.alg,
            parallel = self.config.parallel,
            "hashing document"
        );

        if self.config.parallel {
            self.hash_levels(&traversal, &pending)?;
        } else {
            let canonicalizer = Canonicalizer::new(self.arena);
            for id in pending {
                let (cid, bytes) =
                    hash_node(&canonicalizer, self.config.alg, id, &self.memo, &traversal)?;
                self.record(id, cid, bytes);
            }
        }

        let node_cids: BTreeMap<NodeId, Cid> = traversal
            .order()
            .iter()
            .filter_map(|id| self.memo.get(id).map(|cid| (*id, *cid)))
            .collect();
        let blobs: BTreeMap<Cid, Vec<u8>> = node_cids
            .values()
            .filter_map(|cid| self.blobs.get(cid).map(|bytes| (*cid, bytes.clone())))
            .collect();
        let root_cid = node_cids
            .get(&root)
            .copied()
            .ok_or(CoreError::NotHashed(root))?;
        debug!(%root_cid, nodes = node_cids.len(), blobs = blobs.len(), "hashed document");
        Ok(HashOutput {
            root: root_cid,
            node_cids,
            blobs,
        })
    }

    fn record(&mut self, id: NodeId, cid: Cid, bytes: Vec<u8>) {
        trace!(node = %id, %cid, len = bytes.len(), "hashed node");
        self.memo.insert(id, cid);
        self.blobs.entry(cid).or_insert(bytes);
    }

    fn hash_levels(&mut self, traversal: &Traversal, pending: &[NodeId]) -> Result<(), CoreError> {
        let levels = height_levels(self.arena, traversal, pending);
        let canonicalizer = Canonicalizer::new(self.arena);
        let alg = self.config.alg;
        for (height, level) in levels.iter().enumerate() {
            trace!(height, width = level.len(), "hashing level");
            let memo = &self.memo;
            let results: Vec<Result<(Cid, Vec<u8>), CanonicalizationError>> = level
                .par_iter()
                .map(|id| hash_node(&canonicalizer, alg, *id, memo, traversal))
                .collect();
            // Results keep level order, so the reported error does not depend on scheduling.
            let hashed = results.into_iter().collect::<Result<Vec<_>, _>>()?;
            for (id, (cid, bytes)) in level.iter().zip(hashed) {
                self.record(*id, cid, bytes);
            }
        }
        Ok(())
    }
}

fn hash_node(
    canonicalizer: &Canonicalizer<'_>,
    alg: CidAlg,
    id: NodeId,
    memo: &HashMap<NodeId, Cid>,
    traversal: &Traversal,
) -> Result<(Cid, Vec<u8>), CanonicalizationError> {
    let form = match canonicalizer.canonicalize(id, memo, &NodePath::root()) {
        Ok(form) => form,
        // Error paths walk back to the root, so they are built only on failure.
        Err(_) => canonicalizer.canonicalize(id, memo, &traversal.path_to(id))?,
    };
    let bytes = encode(&form);
    Ok((Cid::of_canonical_bytes(alg, &bytes), bytes))
}

/// Groups `pending` nodes by height above the leaves of the traversal.
fn height_levels(arena: &NodeArena, traversal: &Traversal, pending: &[NodeId]) -> Vec<Vec<NodeId>> {
    let mut heights: HashMap<NodeId, usize> = HashMap::with_capacity(traversal.len());
    // Post-order guarantees every child is assigned before its parents.
    for id in traversal.order() {
        let height = arena
            .get(*id)
            .map(|node| {
                dag::child_edges(node)
                    .iter()
                    .filter_map(|(child, _)| heights.get(child))
                    .map(|h| h + 1)
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0);
        heights.insert(*id, height);
    }

    let mut levels: Vec<Vec<NodeId>> = Vec::new();
    for id in pending {
        let height = heights.get(id).copied().unwrap_or(0);
        if levels.len() <= height {
            levels.resize_with(height + 1, Vec::new);
        }
        levels[height].push(*id);
    }
    levels
}

/// Returns `true` if the two roots have the same semantic content.
///
/// # Errors
///
/// Propagates hashing failures from either side.
pub fn structurally_equal(
    arena_a: &NodeArena,
    a: NodeId,
    arena_b: &NodeArena,
    b: NodeId,
) -> Result<bool, CoreError> {
    let hasher = ContentHasher::default();
    Ok(hasher.hash(arena_a, a)?.root == hasher.hash(arena_b, b)?.root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_canonical::{decode, Node, NodeKind};

    fn bin_op(arena: &mut NodeArena) -> NodeId {
        let a = arena.insert(Node::new(NodeKind::Var).with("name", "a"));
        let one = arena.insert(Node::new(NodeKind::Literal).with("value", 1));
        arena.insert(
            Node::new(NodeKind::BinOp)
                .with("op", "+")
                .with("left", a)
                .with("right", one),
        )
    }

    #[test]
    fn output_covers_every_reachable_node() {
        let mut arena = NodeArena::new();
        let root = bin_op(&mut arena);
        let output = ContentHasher::default().hash(&arena, root).unwrap();
        assert_eq!(output.node_cids.len(), 3);
        assert_eq!(output.blobs.len(), 3);
        assert_eq!(output.cid_of(root), Some(output.root));
        for (cid, bytes) in &output.blobs {
            assert!(cid.matches(bytes));
            assert!(decode(bytes).is_ok());
        }
    }

    #[test]
    fn shared_child_is_hashed_once() {
        let mut arena = NodeArena::new();
        let x = arena.insert(Node::new(NodeKind::Var).with("name", "x"));
        let root = arena.insert(
            Node::new(NodeKind::BinOp)
                .with("op", "*")
                .with("left", x)
                .with("right", x),
        );
        let output = ContentHasher::default().hash(&arena, root).unwrap();
        assert_eq!(output.node_cids.len(), 2);
        assert_eq!(output.blobs.len(), 2);
    }

    #[test]
    fn equal_subtrees_share_a_blob() {
        let mut arena = NodeArena::new();
        let left = arena.insert(Node::new(NodeKind::Var).with("name", "x"));
        let right = arena.insert(Node::new(NodeKind::Var).with("name", "x").with("line", 3));
        let root = arena.insert(
            Node::new(NodeKind::BinOp)
                .with("op", "-")
                .with("left", left)
                .with("right", right),
        );
        let output = ContentHasher::default().hash(&arena, root).unwrap();
        assert_eq!(output.cid_of(left), output.cid_of(right));
        assert_eq!(output.node_cids.len(), 3);
        assert_eq!(output.blobs.len(), 2);
    }

    #[test]
    fn parallel_matches_sequential() {
        let mut arena = NodeArena::new();
        let statements: Vec<NodeId> = (0..16).map(|_| bin_op(&mut arena)).collect();
        let block = arena.insert(
            Node::new(NodeKind::Block).with("statements", FieldValue::list(statements)),
        );
        let sequential = ContentHasher::default().hash(&arena, block).unwrap();
        let parallel = ContentHasher::new(HasherConfig {
            parallel: true,
            ..HasherConfig::default()
        })
        .hash(&arena, block)
        .unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn algorithm_changes_every_cid() {
        let mut arena = NodeArena::new();
        let root = bin_op(&mut arena);
        let blake = ContentHasher::default().hash(&arena, root).unwrap();
        let sha = ContentHasher::new(HasherConfig {
            alg: CidAlg::Sha256,
            parallel: false,
        })
        .hash(&arena, root)
        .unwrap();
        assert_eq!(blake.root.alg(), CidAlg::Blake3);
        assert_eq!(sha.root.alg(), CidAlg::Sha256);
        assert_eq!(blake.bytes_of(&blake.root), sha.bytes_of(&sha.root));
    }

    #[test]
    fn session_reuses_memo_across_roots() {
        let mut arena = NodeArena::new();
        let first = bin_op(&mut arena);
        let wrapper = arena.insert(
            Node::new(NodeKind::Block)
                .with("statements", FieldValue::list([first]))
                .with("result", first),
        );
        let hasher = ContentHasher::default();
        let mut session = hasher.session(&arena);
        let inner = session.hash(first).unwrap();
        assert_eq!(session.memo_len(), 3);
        let outer = session.hash(wrapper).unwrap();
        assert_eq!(session.memo_len(), 4);
        assert_eq!(outer.cid_of(first), Some(inner.root));
        assert_eq!(outer, hasher.hash(&arena, wrapper).unwrap());
    }

    #[test]
    fn normal_form_requires_covered_node() {
        let mut arena = NodeArena::new();
        let root = bin_op(&mut arena);
        let stray = arena.insert(Node::new(NodeKind::Var).with("name", "z"));
        let output = ContentHasher::default().hash(&arena, root).unwrap();
        let form = ContentHasher::normal_form(&arena, root, &output).unwrap();
        assert_eq!(encode(&form), output.bytes_of(&output.root).unwrap());
        assert_eq!(
            ContentHasher::normal_form(&arena, stray, &output),
            Err(CoreError::NotHashed(stray))
        );
    }

    #[test]
    fn height_levels_put_leaves_first() {
        let mut arena = NodeArena::new();
        let root = bin_op(&mut arena);
        let traversal = topological_order(&arena, root).unwrap();
        let levels = height_levels(&arena, &traversal, traversal.order());
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].len(), 2);
        assert_eq!(levels[1], vec![root]);
    }
}
