use std::collections::{HashMap, HashSet};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("category {0} is not in the tree")]
    Unknown(i64),
    #[error("category {id} is part of a parent cycle through {through}")]
    Cycle { id: i64, through: i64 },
}

#[derive(Debug)]
struct Node {
    id: i64,
    declared_parent: i64,
    parent: Option<usize>,
}

/// Category hierarchy built once from `(id, parent_id)` pairs.
///
/// Nodes live in an arena indexed by position; `parent_id` 0 marks a root.
/// A node whose declared parent does not exist is kept as a root and reported
/// by [`CategoryTree::orphans`].
#[derive(Debug, Default)]
pub struct CategoryTree {
    nodes: Vec<Node>,
    index: HashMap<i64, usize>,
}

impl CategoryTree {
    pub fn build<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (i64, i64)>,
    {
        let mut tree = CategoryTree::default();
        for (id, parent) in edges {
            if tree.index.contains_key(&id) {
                continue;
            }
            tree.index.insert(id, tree.nodes.len());
            tree.nodes.push(Node {
                id,
                declared_parent: parent,
                parent: None,
            });
        }

        for pos in 0..tree.nodes.len() {
            let declared = tree.nodes[pos].declared_parent;
            if declared <= 0 {
                continue;
            }
            tree.nodes[pos].parent = tree.index.get(&declared).copied();
        }
        tree
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids whose declared parent is missing from the tree.
    pub fn orphans(&self) -> Vec<i64> {
        self.nodes
            .iter()
            .filter(|n| n.declared_parent > 0 && n.parent.is_none())
            .map(|n| n.id)
            .collect()
    }

    pub fn roots(&self) -> Vec<i64> {
        self.nodes
            .iter()
            .filter(|n| n.parent.is_none())
            .map(|n| n.id)
            .collect()
    }

    /// Ancestor ids from the root down to and including `id`.
    pub fn path(&self, id: i64) -> Result<Vec<i64>, TreeError> {
        let mut pos = *self.index.get(&id).ok_or(TreeError::Unknown(id))?;
        let mut seen = HashSet::new();
        let mut path = Vec::new();
        loop {
            if !seen.insert(pos) {
                return Err(TreeError::Cycle {
                    id,
                    through: self.nodes[pos].id,
                });
            }
            path.push(self.nodes[pos].id);
            match self.nodes[pos].parent {
                Some(parent) => pos = parent,
                None => break,
            }
        }
        path.reverse();
        Ok(path)
    }

    /// Depth below the root; roots are level 0.
    pub fn level(&self, id: i64) -> Result<u32, TreeError> {
        Ok(self.path(id)?.len().saturating_sub(1) as u32)
    }
}
