use std::rc::Rc;

/// A node in the search tree.
///
/// Each node owns a reference-counted link to its parent, so a path stays
/// valid for as long as its terminal node is alive, even after the search
/// that produced it has dropped its frontier.
#[derive(Debug)]
pub struct SearchNode<S, A> {
    pub state: S,
    pub parent: Option<Rc<SearchNode<S, A>>>,
    /// The action applied to the parent's state. `None` only at the root.
    pub action: Option<A>,
    pub depth: usize,
    pub path_cost: u32,
    pub heuristic: u32,
}

impl<S, A: Copy> SearchNode<S, A> {
    pub fn root(state: S, heuristic: u32) -> Self {
        SearchNode {
            state,
            parent: None,
            action: None,
            depth: 0,
            path_cost: 0,
            heuristic,
        }
    }

    pub fn child(parent: &Rc<Self>, state: S, action: A, step_cost: u32, heuristic: u32) -> Self {
        SearchNode {
            state,
            parent: Some(Rc::clone(parent)),
            action: Some(action),
            depth: parent.depth + 1,
            path_cost: parent.path_cost + step_cost,
            heuristic,
        }
    }

    /// `path_cost + heuristic`.
    pub fn total_cost(&self) -> u64 {
        u64::from(self.path_cost) + u64::from(self.heuristic)
    }

    /// This node followed by each ancestor up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = &SearchNode<S, A>> {
        std::iter::successors(Some(self), |node| node.parent.as_deref())
    }

    /// Actions from the root to this node. Its length equals `depth`.
    pub fn path(&self) -> Vec<A> {
        let mut path: Vec<A> = self.ancestors().filter_map(|node| node.action).collect();
        path.reverse();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_walks_parents_in_order() {
        let root = Rc::new(SearchNode::root("a", 4));
        let b = Rc::new(SearchNode::child(&root, "b", 'x', 1, 3));
        let c = Rc::new(SearchNode::child(&b, "c", 'y', 0, 2));
        let d = SearchNode::child(&c, "d", 'z', 2, 0);

        assert_eq!(d.path(), vec!['x', 'y', 'z']);
        assert_eq!(d.depth, 3);
        assert_eq!(d.path().len(), d.depth);
        assert_eq!(d.path_cost, 3);
        assert_eq!(c.total_cost(), 3);

        let states: Vec<&str> = d.ancestors().map(|node| node.state).collect();
        assert_eq!(states, vec!["d", "c", "b", "a"]);
    }

    #[test]
    fn root_has_empty_path() {
        let root: SearchNode<u8, char> = SearchNode::root(0, 9);
        assert!(root.path().is_empty());
        assert_eq!(root.total_cost(), 9);
    }

    #[test]
    fn siblings_share_a_parent() {
        let root = Rc::new(SearchNode::root(0u8, 0));
        let left = SearchNode::child(&root, 1, 'l', 1, 0);
        let right = SearchNode::child(&root, 2, 'r', 1, 0);
        assert_eq!(Rc::strong_count(&root), 3);
        assert_eq!(left.path(), vec!['l']);
        assert_eq!(right.path(), vec!['r']);
        assert_eq!(root.state, 0);
    }
}
