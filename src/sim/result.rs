//! The result tree: per-move outcomes linked into a lookahead hierarchy.
//!
//! Nodes live in a flat arena and reference each other by [`NodeId`], so a
//! parent exclusively owns its child list while children keep a non-owning
//! index back to their parent for upward walks. All structural mutation
//! (adopting children, recomputing hashes, heuristic back-propagation) goes
//! through the owning [`ResultTree`].
//!
//! A node's content hash covers its payload *and* its children, so the tree
//! recomputes hashes children-first whenever the child set changes; a stale
//! cached hash is never observable through the public API.

use rustc_hash::FxHasher;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use crate::board::{Board, Move};
use crate::core::ValueSpan;

use super::snapshot::RequestId;

/// Index into the result-tree node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel value representing no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Create a new node ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Check if this is the NONE sentinel.
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_none() {
            write!(f, "NodeId(NONE)")
        } else {
            write!(f, "NodeId({})", self.0)
        }
    }
}

/// The aggregated distributions of one move's outcome set.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NodeSpans {
    /// Net score dealt to the stage.
    pub score: ValueSpan,
    /// Net gold earned.
    pub gold: ValueSpan,
    /// Mega-evolution progress gained.
    pub mega_progress: ValueSpan,
    /// Pieces cleared from the board.
    pub blocks_cleared: ValueSpan,
    /// Disruptions removed.
    pub disruptions_cleared: ValueSpan,
    /// Combos triggered across the cascade.
    pub combos_cleared: ValueSpan,
    /// Gold earned from clears on the right half of the board; seeds the
    /// ranking heuristic.
    pub right_side_gold: ValueSpan,
}

/// One move's aggregated outcome, a node in the result tree.
#[derive(Clone, Debug)]
pub struct ResultNode {
    mv: Option<Move>,
    board: Board,
    spans: NodeSpans,
    heuristic: ValueSpan,
    request: RequestId,
    started_ms: u64,
    ply: u16,
    parent: NodeId,
    children: Vec<NodeId>,
    hash: u64,
}

impl ResultNode {
    /// Create a detached node (no parent, no children, ply 0).
    ///
    /// The heuristic starts as the raw right-side-gold span and is only ever
    /// changed by back-propagation.
    #[must_use]
    pub fn new(
        mv: Option<Move>,
        board: Board,
        spans: NodeSpans,
        request: RequestId,
        started_ms: u64,
    ) -> Self {
        let mut node = Self {
            mv,
            board,
            heuristic: spans.right_side_gold,
            spans,
            request,
            started_ms,
            ply: 0,
            parent: NodeId::NONE,
            children: Vec::new(),
            hash: 0,
        };
        node.hash = node.content_hash(&[]);
        node
    }

    /// The move this node evaluates; `None` is the settle case.
    #[must_use]
    pub fn mv(&self) -> Option<Move> {
        self.mv
    }

    /// The board after this node's move resolved. Owned by this node.
    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Net score distribution.
    #[must_use]
    pub fn score(&self) -> ValueSpan {
        self.spans.score
    }

    /// Net gold distribution.
    #[must_use]
    pub fn gold(&self) -> ValueSpan {
        self.spans.gold
    }

    /// Mega-progress distribution.
    #[must_use]
    pub fn mega_progress(&self) -> ValueSpan {
        self.spans.mega_progress
    }

    /// Blocks-cleared distribution.
    #[must_use]
    pub fn blocks_cleared(&self) -> ValueSpan {
        self.spans.blocks_cleared
    }

    /// Disruptions-cleared distribution.
    #[must_use]
    pub fn disruptions_cleared(&self) -> ValueSpan {
        self.spans.disruptions_cleared
    }

    /// Combos-cleared distribution.
    #[must_use]
    pub fn combos_cleared(&self) -> ValueSpan {
        self.spans.combos_cleared
    }

    /// The mutable ranking heuristic ("right-side gold score").
    #[must_use]
    pub fn heuristic(&self) -> ValueSpan {
        self.heuristic
    }

    /// The request this node belongs to.
    #[must_use]
    pub fn request(&self) -> RequestId {
        self.request
    }

    /// Start timestamp of the owning request, in milliseconds.
    #[must_use]
    pub fn started_ms(&self) -> u64 {
        self.started_ms
    }

    /// Lookahead depth: 0 is an immediate move.
    #[must_use]
    pub fn ply(&self) -> u16 {
        self.ply
    }

    /// Parent node, `NodeId::NONE` at the top level.
    #[must_use]
    pub fn parent(&self) -> NodeId {
        self.parent
    }

    /// Child nodes in insertion order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// A node with no children is the deepest explored ply of its branch.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The content-derived hash, covering payload and children.
    #[must_use]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Spend one move from this node's board, for lookahead bookkeeping.
    ///
    /// The counter is outside structural equality and hashing, so this never
    /// invalidates the stored hash.
    pub fn decrement_board_moves(&mut self) {
        self.board.decrement_moves_remaining();
    }

    fn content_hash(&self, child_hashes: &[u64]) -> u64 {
        let mut h = FxHasher::default();
        self.mv.hash(&mut h);
        self.board.hash(&mut h);
        self.spans.score.hash(&mut h);
        self.spans.gold.hash(&mut h);
        self.spans.mega_progress.hash(&mut h);
        self.spans.blocks_cleared.hash(&mut h);
        self.spans.disruptions_cleared.hash(&mut h);
        self.spans.combos_cleared.hash(&mut h);
        self.heuristic.hash(&mut h);
        self.request.0.hash(&mut h);
        self.started_ms.hash(&mut h);
        self.ply.hash(&mut h);
        child_hashes.hash(&mut h);
        h.finish()
    }
}

impl std::fmt::Display for ResultNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.mv {
            Some(mv) => write!(f, "{mv}: ")?,
            None => write!(f, "settle: ")?,
        }
        write!(
            f,
            "{} score, {}g, {} combos, {} blocks, {} disruptions, {} mega, {} heuristic",
            self.spans.score,
            self.spans.gold,
            self.spans.combos_cleared,
            self.spans.blocks_cleared,
            self.spans.disruptions_cleared,
            self.spans.mega_progress,
            self.heuristic,
        )
    }
}

/// A node with its subtree, built off-arena.
///
/// Aggregation produces detached nodes in parallel; the orchestrating thread
/// then adopts whole subtrees into the arena in one pass, which is the only
/// place parent links, ply indices, and hashes are assigned.
#[derive(Debug)]
pub struct Detached {
    /// The node itself.
    pub node: ResultNode,
    /// Its children, one subtree per expanded move.
    pub children: Vec<Detached>,
}

impl Detached {
    /// A subtree of one childless node.
    #[must_use]
    pub fn leaf(node: ResultNode) -> Self {
        Self {
            node,
            children: Vec::new(),
        }
    }
}

/// Arena-owned result tree for one computation request.
#[derive(Debug)]
pub struct ResultTree {
    nodes: Vec<ResultNode>,
    roots: Vec<NodeId>,
    request: RequestId,
    propagated: bool,
}

impl ResultTree {
    /// Create an empty tree for a request.
    #[must_use]
    pub fn new(request: RequestId) -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
            request,
            propagated: false,
        }
    }

    /// The owning request.
    #[must_use]
    pub fn request(&self) -> RequestId {
        self.request
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level nodes, in ranked order once ranking has run.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Get a node by ID.
    #[inline]
    #[must_use]
    pub fn get(&self, id: NodeId) -> &ResultNode {
        &self.nodes[id.0 as usize]
    }

    /// Iterate over all nodes.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ResultNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId::new(i as u32), n))
    }

    /// Adopt a detached subtree as a new top-level node.
    ///
    /// Wires parent back-references and ply indices, and recomputes content
    /// hashes children-first so every stored hash reflects the final child
    /// sets.
    pub fn adopt_root(&mut self, subtree: Detached) -> NodeId {
        let id = self.adopt_under(NodeId::NONE, 0, subtree);
        self.roots.push(id);
        id
    }

    fn adopt_under(&mut self, parent: NodeId, ply: u16, subtree: Detached) -> NodeId {
        let Detached { mut node, children } = subtree;
        node.parent = parent;
        node.ply = ply;

        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(node);

        let child_ids: Vec<NodeId> = children
            .into_iter()
            .map(|c| self.adopt_under(id, ply + 1, c))
            .collect();
        self.nodes[id.0 as usize].children = child_ids;
        self.recompute_hash(id);
        id
    }

    /// Recompute one node's content hash from its payload and the stored
    /// hashes of its children.
    pub fn recompute_hash(&mut self, id: NodeId) {
        let child_hashes: Vec<u64> = self.get(id)
            .children
            .iter()
            .map(|c| self.get(*c).hash)
            .collect();
        let node = &mut self.nodes[id.0 as usize];
        node.hash = node.content_hash(&child_hashes);
    }

    /// Recompute every hash, children before parents.
    ///
    /// Children always carry larger arena indices than their parent (they
    /// are adopted after it), so a reverse index sweep is bottom-up.
    pub fn refresh_hashes(&mut self) {
        for i in (0..self.nodes.len()).rev() {
            self.recompute_hash(NodeId::new(i as u32));
        }
    }

    /// The strict descendant of `id` with the maximum heuristic span.
    ///
    /// Ties go to the first node discovered in depth-first, insertion-order
    /// traversal. Returns `None` for a leaf.
    #[must_use]
    pub fn max_descendant(&self, id: NodeId) -> Option<NodeId> {
        let mut best: Option<NodeId> = None;
        let mut stack: Vec<NodeId> = self.get(id).children.iter().rev().copied().collect();

        while let Some(n) = stack.pop() {
            let better = match best {
                Some(b) => self.get(n).heuristic.cmp(&self.get(b).heuristic) == Ordering::Greater,
                None => true,
            };
            if better {
                best = Some(n);
            }
            stack.extend(self.get(n).children.iter().rev().copied());
        }
        best
    }

    /// Smooth each top-level node's heuristic with its best continuation.
    ///
    /// For every root: find the maximum-heuristic descendant, then walk from
    /// it up through each parent, adding the descendant's heuristic scaled
    /// by `1/i` at each ancestor (`i` starts at 2 and grows per step up).
    /// Moves with a strong best case one ply later rank higher as a result.
    ///
    /// Mutates only heuristic spans, never the primary distributions. The
    /// pass runs at most once per tree: later calls are no-ops returning
    /// `false`, so re-running cannot double-count.
    pub fn propagate_heuristics(&mut self) -> bool {
        if self.propagated {
            return false;
        }
        self.propagated = true;

        for root in self.roots.clone() {
            let Some(best) = self.max_descendant(root) else {
                continue;
            };
            let boost = self.get(best).heuristic;

            let mut damping = 2u32;
            let mut cursor = self.get(best).parent;
            while !cursor.is_none() {
                let scaled = boost.scale(1.0 / f64::from(damping));
                let node = &mut self.nodes[cursor.0 as usize];
                node.heuristic = node.heuristic.add(&scaled);
                damping += 1;
                cursor = self.get(cursor).parent;
            }
        }

        // Heuristics feed the content hash; bring every node back in sync.
        self.refresh_hashes();
        true
    }

    /// Sort the top-level nodes by a comparison, keeping insertion order
    /// for equal-ranked elements.
    pub fn sort_roots_by<F>(&mut self, mut cmp: F)
    where
        F: FnMut(&ResultNode, &ResultNode) -> Ordering,
    {
        let mut roots = std::mem::take(&mut self.roots);
        roots.sort_by(|a, b| cmp(self.get(*a), self.get(*b)));
        self.roots = roots;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans_with_heuristic(value: f64) -> NodeSpans {
        NodeSpans {
            right_side_gold: ValueSpan::from_value(value),
            ..NodeSpans::default()
        }
    }

    fn node(heuristic: f64) -> ResultNode {
        ResultNode::new(
            Some(Move::new(1, 1, 1, 2)),
            Board::empty(),
            spans_with_heuristic(heuristic),
            RequestId(1),
            1000,
        )
    }

    #[test]
    fn test_detached_node_defaults() {
        let n = node(5.0);
        assert_eq!(n.ply(), 0);
        assert!(n.parent().is_none());
        assert!(n.is_leaf());
        assert_eq!(n.heuristic(), ValueSpan::from_value(5.0));
    }

    #[test]
    fn test_adopt_wires_parents_and_plies() {
        let mut tree = ResultTree::new(RequestId(1));
        let root = tree.adopt_root(Detached {
            node: node(1.0),
            children: vec![Detached::leaf(node(2.0)), Detached::leaf(node(3.0))],
        });

        let root_node = tree.get(root);
        assert_eq!(root_node.ply(), 0);
        assert_eq!(root_node.children().len(), 2);

        for &child in root_node.children() {
            assert_eq!(tree.get(child).parent(), root);
            assert_eq!(tree.get(child).ply(), 1);
        }
    }

    #[test]
    fn test_hash_depends_on_children() {
        let detached = node(1.0);
        let solo_hash = detached.hash();

        let mut tree = ResultTree::new(RequestId(1));
        let root = tree.adopt_root(Detached {
            node: node(1.0),
            children: vec![Detached::leaf(node(2.0))],
        });

        // Same payload, but the adopted node hashes its child set.
        assert_ne!(tree.get(root).hash(), solo_hash);

        // Recomputing without structural change is stable.
        let before = tree.get(root).hash();
        tree.recompute_hash(root);
        assert_eq!(tree.get(root).hash(), before);
    }

    #[test]
    fn test_max_descendant_searches_whole_subtree() {
        let mut tree = ResultTree::new(RequestId(1));
        let root = tree.adopt_root(Detached {
            node: node(0.0),
            children: vec![
                Detached {
                    node: node(1.0),
                    children: vec![Detached::leaf(node(9.0))],
                },
                Detached::leaf(node(5.0)),
            ],
        });

        let best = tree.max_descendant(root).unwrap();
        assert_eq!(tree.get(best).heuristic(), ValueSpan::from_value(9.0));
        // The grandchild, not the direct children.
        assert_eq!(tree.get(best).ply(), 2);
    }

    #[test]
    fn test_max_descendant_tie_breaks_first_discovered() {
        let mut tree = ResultTree::new(RequestId(1));
        let root = tree.adopt_root(Detached {
            node: node(0.0),
            children: vec![Detached::leaf(node(4.0)), Detached::leaf(node(4.0))],
        });

        let best = tree.max_descendant(root).unwrap();
        assert_eq!(best, tree.get(root).children()[0]);
    }

    #[test]
    fn test_max_descendant_of_leaf_is_none() {
        let mut tree = ResultTree::new(RequestId(1));
        let root = tree.adopt_root(Detached::leaf(node(1.0)));
        assert!(tree.max_descendant(root).is_none());
    }

    #[test]
    fn test_propagation_damps_by_depth() {
        let mut tree = ResultTree::new(RequestId(1));
        let root = tree.adopt_root(Detached {
            node: node(0.0),
            children: vec![Detached {
                node: node(0.0),
                children: vec![Detached::leaf(node(8.0))],
            }],
        });
        let child = tree.get(root).children()[0];

        assert!(tree.propagate_heuristics());

        // Best descendant is the grandchild at 8.0; its parent gains 8/2,
        // the root gains 8/3.
        assert_eq!(tree.get(child).heuristic(), ValueSpan::from_value(4.0));
        assert!((tree.get(root).heuristic().mean() - 8.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_propagation_runs_once() {
        let mut tree = ResultTree::new(RequestId(1));
        let root = tree.adopt_root(Detached {
            node: node(0.0),
            children: vec![Detached::leaf(node(6.0))],
        });

        assert!(tree.propagate_heuristics());
        let after_first = tree.get(root).heuristic();

        assert!(!tree.propagate_heuristics());
        assert_eq!(tree.get(root).heuristic(), after_first);
    }

    #[test]
    fn test_propagation_leaves_primary_spans_alone() {
        let mut tree = ResultTree::new(RequestId(1));
        let mut spans = spans_with_heuristic(3.0);
        spans.score = ValueSpan::from_value(100.0);
        let root = tree.adopt_root(Detached {
            node: ResultNode::new(None, Board::empty(), spans, RequestId(1), 0),
            children: vec![Detached::leaf(node(6.0))],
        });

        tree.propagate_heuristics();

        assert_eq!(tree.get(root).score(), ValueSpan::from_value(100.0));
        assert_ne!(tree.get(root).heuristic(), ValueSpan::from_value(3.0));
    }

    #[test]
    fn test_propagation_refreshes_hashes() {
        let mut tree = ResultTree::new(RequestId(1));
        let root = tree.adopt_root(Detached {
            node: node(0.0),
            children: vec![Detached::leaf(node(6.0))],
        });
        let before = tree.get(root).hash();

        tree.propagate_heuristics();

        // The heuristic changed, and so must the stored hash.
        assert_ne!(tree.get(root).hash(), before);
        let recheck = tree.get(root).hash();
        tree.recompute_hash(root);
        assert_eq!(tree.get(root).hash(), recheck);
    }

    #[test]
    fn test_sort_roots_is_stable() {
        let mut tree = ResultTree::new(RequestId(1));
        let a = tree.adopt_root(Detached::leaf(node(1.0)));
        let b = tree.adopt_root(Detached::leaf(node(1.0)));
        let c = tree.adopt_root(Detached::leaf(node(7.0)));

        tree.sort_roots_by(|x, y| y.heuristic().cmp(&x.heuristic()));

        assert_eq!(tree.roots(), &[c, a, b]);
    }

    #[test]
    fn test_display_settle_node() {
        let n = ResultNode::new(None, Board::empty(), spans_with_heuristic(0.0), RequestId(1), 0);
        assert!(n.to_string().starts_with("settle:"));
    }
}
