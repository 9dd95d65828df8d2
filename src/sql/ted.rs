#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Ordered labeled tree edit distance (Zhang and Shasha, 1989).

use std::sync::Arc;

use super::tree::ParseNode;

/// Flattened postorder view of a tree used by the dynamic program.
struct Indexed<'a> {
    /// Nodes in postorder.
    nodes:    Vec<&'a ParseNode>,
    /// Postorder index of each node's leftmost leaf descendant.
    leftmost: Vec<usize>,
    /// Keyroots in ascending postorder.
    keyroots: Vec<usize>,
}

impl<'a> Indexed<'a> {
    /// Numbers the tree in postorder and computes leftmost leaves and keyroots.
    fn new(root: &'a ParseNode) -> Self {
        let mut nodes = Vec::new();
        let mut leftmost = Vec::new();
        walk(root, &mut nodes, &mut leftmost);

        // A keyroot is the highest node for each distinct leftmost leaf; since
        // ancestors come later in postorder the last occurrence wins.
        let mut last_with_leaf = vec![None; nodes.len()];
        for (i, &l) in leftmost.iter().enumerate() {
            last_with_leaf[l] = Some(i);
        }
        let mut keyroots: Vec<usize> = last_with_leaf.into_iter().flatten().collect();
        keyroots.sort_unstable();

        Self {
            nodes,
            leftmost,
            keyroots,
        }
    }

    /// Number of nodes.
    fn len(&self) -> usize {
        self.nodes.len()
    }
}

/// Postorder walk; returns the postorder index of the leftmost leaf of `node`.
fn walk<'a>(node: &'a ParseNode, nodes: &mut Vec<&'a ParseNode>, leftmost: &mut Vec<usize>) -> usize {
    let mut first_leaf = None;
    for child in node.children() {
        let leaf = walk(child, nodes, leftmost);
        first_leaf.get_or_insert(leaf);
    }
    let index = nodes.len();
    nodes.push(node);
    let leaf = first_leaf.unwrap_or(index);
    leftmost.push(leaf);
    leaf
}

/// Rename cost: 0 when both key and value match, 1 otherwise.
fn rename_cost(a: &ParseNode, b: &ParseNode) -> usize {
    usize::from(a.key() != b.key() || a.value() != b.value())
}

/// Computes the minimum number of unit-cost node insertions, deletions and
/// renames that transform `a` into `b`.
///
/// Ties between equal-cost alignments are resolved in the fixed order delete,
/// insert, rename, so repeated calls on the same inputs are reproducible.
pub fn tree_edit_distance(a: &ParseNode, b: &ParseNode) -> usize {
    let t1 = Indexed::new(a);
    let t2 = Indexed::new(b);
    let mut tree_dist = vec![vec![0usize; t2.len()]; t1.len()];

    for &i in &t1.keyroots {
        for &j in &t2.keyroots {
            forest_distance(&t1, &t2, i, j, &mut tree_dist);
        }
    }

    tree_dist[t1.len() - 1][t2.len() - 1]
}

/// Convenience wrapper for optional trees; a missing tree has size zero.
pub fn distance_between(a: Option<&Arc<ParseNode>>, b: Option<&Arc<ParseNode>>) -> usize {
    match (a, b) {
        (Some(a), Some(b)) => tree_edit_distance(a, b),
        (Some(t), None) | (None, Some(t)) => t.size(),
        (None, None) => 0,
    }
}

/// Fills `tree_dist` for every pair of subtrees sharing the leftmost leaves
/// of keyroots `i` and `j`.
fn forest_distance(
    t1: &Indexed<'_>,
    t2: &Indexed<'_>,
    i: usize,
    j: usize,
    tree_dist: &mut [Vec<usize>],
) {
    let li = t1.leftmost[i];
    let lj = t2.leftmost[j];
    let rows = i - li + 2;
    let cols = j - lj + 2;
    let mut fd = vec![vec![0usize; cols]; rows];

    for x in 1..rows {
        fd[x][0] = fd[x - 1][0] + 1;
    }
    for y in 1..cols {
        fd[0][y] = fd[0][y - 1] + 1;
    }

    for x in 1..rows {
        let i1 = li + x - 1;
        for y in 1..cols {
            let j1 = lj + y - 1;
            let delete = fd[x - 1][y] + 1;
            let insert = fd[x][y - 1] + 1;

            if t1.leftmost[i1] == li && t2.leftmost[j1] == lj {
                let rename = fd[x - 1][y - 1] + rename_cost(t1.nodes[i1], t2.nodes[j1]);
                fd[x][y] = delete.min(insert).min(rename);
                tree_dist[i1][j1] = fd[x][y];
            } else {
                let px = t1.leftmost[i1] - li;
                let py = t2.leftmost[j1] - lj;
                let subtree = fd[px][py] + tree_dist[i1][j1];
                fd[x][y] = delete.min(insert).min(subtree);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(key: &str, children: Vec<Arc<ParseNode>>) -> Arc<ParseNode> {
        ParseNode::new(key, "", children)
    }

    #[test]
    fn classic_example_distance_is_two() {
        // f(d(a, c(b)), e) vs f(c(d(a, b)), e)
        let left = node(
            "f",
            vec![
                node("d", vec![node("a", vec![]), node("c", vec![node("b", vec![])])]),
                node("e", vec![]),
            ],
        );
        let right = node(
            "f",
            vec![
                node("c", vec![node("d", vec![node("a", vec![]), node("b", vec![])])]),
                node("e", vec![]),
            ],
        );
        assert_eq!(tree_edit_distance(&left, &right), 2);
    }

    #[test]
    fn value_change_is_one_rename() {
        let a = node("x", vec![ParseNode::leaf("ival", "101")]);
        let b = node("x", vec![ParseNode::leaf("ival", "202")]);
        assert_eq!(tree_edit_distance(&a, &b), 1);
    }
}
