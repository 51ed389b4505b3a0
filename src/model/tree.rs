//! Parsed sentence trees stored as a post-ordered node arena

use serde::{Deserialize, Serialize};

use crate::training::data::DataError;

/// A single node of a parsed sentence tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Embedding index of the token at this node, if it carries one
    #[serde(default)]
    pub word: Option<u32>,
    /// Sentiment label attached to this node
    #[serde(default)]
    pub label: Option<usize>,
    /// Indices of the child nodes, all smaller than this node's index
    #[serde(default)]
    pub children: Vec<usize>,
}

impl TreeNode {
    /// A leaf carrying a token
    pub fn leaf(word: u32) -> Self {
        Self {
            word: Some(word),
            label: None,
            children: Vec::new(),
        }
    }

    /// An inner node over the given children
    pub fn inner(children: Vec<usize>) -> Self {
        Self {
            word: None,
            label: None,
            children,
        }
    }

    /// Attach a label to this node
    pub fn with_label(mut self, label: usize) -> Self {
        self.label = Some(label);
        self
    }
}

/// A parsed sentence tree.
///
/// Nodes are kept in post-order: every child precedes its parent and the
/// root is the last node. Models emit one prediction per node in this same
/// order, so the root prediction is always the final one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TreeNode>", into = "Vec<TreeNode>")]
pub struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    /// Build a tree from post-ordered nodes, checking the arena invariants
    pub fn new(nodes: Vec<TreeNode>) -> Result<Self, DataError> {
        validate_nodes(&nodes)?;
        Ok(Self { nodes })
    }

    /// Single-token tree
    pub fn leaf(word: u32) -> Self {
        Self {
            nodes: vec![TreeNode::leaf(word)],
        }
    }

    /// Join subtrees under a fresh unlabeled root
    pub fn join(subtrees: Vec<Tree>) -> Self {
        let mut nodes = Vec::new();
        let mut roots = Vec::with_capacity(subtrees.len());
        for subtree in subtrees {
            let offset = nodes.len();
            nodes.extend(subtree.nodes.into_iter().map(|mut node| {
                for child in &mut node.children {
                    *child += offset;
                }
                node
            }));
            roots.push(nodes.len() - 1);
        }
        nodes.push(TreeNode::inner(roots));
        Self { nodes }
    }

    /// Nodes in post-order
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false for a validated tree
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The root node
    pub fn root(&self) -> &TreeNode {
        // validated trees are never empty
        &self.nodes[self.nodes.len() - 1]
    }

    /// Label attached to the root, if any
    pub fn root_label(&self) -> Option<usize> {
        self.root().label
    }

    /// Set the root label, replacing any previous one
    pub fn set_root_label(&mut self, label: usize) {
        let last = self.nodes.len() - 1;
        self.nodes[last].label = Some(label);
    }

    /// Largest child count over all nodes
    pub fn max_degree(&self) -> usize {
        self.nodes.iter().map(|n| n.children.len()).max().unwrap_or(0)
    }

    /// Token ids in node order
    pub fn words(&self) -> impl Iterator<Item = u32> + '_ {
        self.nodes.iter().filter_map(|n| n.word)
    }
}

impl TryFrom<Vec<TreeNode>> for Tree {
    type Error = DataError;

    fn try_from(nodes: Vec<TreeNode>) -> Result<Self, Self::Error> {
        Tree::new(nodes)
    }
}

impl From<Tree> for Vec<TreeNode> {
    fn from(tree: Tree) -> Self {
        tree.nodes
    }
}

fn validate_nodes(nodes: &[TreeNode]) -> Result<(), DataError> {
    if nodes.is_empty() {
        return Err(DataError::MalformedTree {
            reason: "tree has no nodes".to_string(),
        });
    }

    let mut has_parent = vec![false; nodes.len()];
    for (index, node) in nodes.iter().enumerate() {
        for &child in &node.children {
            if child >= index {
                return Err(DataError::MalformedTree {
                    reason: format!("node {index} references child {child} that does not precede it"),
                });
            }
            if has_parent[child] {
                return Err(DataError::MalformedTree {
                    reason: format!("node {child} has more than one parent"),
                });
            }
            has_parent[child] = true;
        }
    }

    let root = nodes.len() - 1;
    if let Some(orphan) = has_parent[..root].iter().position(|&p| !p) {
        return Err(DataError::MalformedTree {
            reason: format!("node {orphan} is detached from the root"),
        });
    }

    Ok(())
}
