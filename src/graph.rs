// SPDX-License-Identifier: MIT OR Apache-2.0

//! Group containment graph discovered while expanding group memberships.
//!
//! Nodes are principals, an edge `a -> b` means "group `a` directly contains `b`". Group nesting
//! can contain cycles (group A contains group B which contains group A again), all traversals
//! here visit every node at most once.
use std::collections::HashMap;

use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;

use crate::principal::{GroupRecord, Principal, PrincipalRef, UserRecord};

/// Index of a principal inside a [`MembershipGraph`].
pub type NodeId = usize;

#[derive(Clone, Debug, Default)]
pub struct MembershipGraph {
    principals: Vec<Principal>,
    index: HashMap<PrincipalRef, NodeId>,
    graph: DiGraphMap<NodeId, ()>,
}

impl MembershipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a principal, returning its node and whether it was not known before.
    pub fn add_principal(&mut self, principal: Principal) -> (NodeId, bool) {
        if let Some(node) = self.index.get(principal.reference()) {
            return (*node, false);
        }

        let node = self.principals.len();
        self.index.insert(principal.reference().clone(), node);
        self.principals.push(principal);
        self.graph.add_node(node);
        (node, true)
    }

    /// Record that `group` directly contains `member`.
    pub fn add_membership(&mut self, group: NodeId, member: NodeId) {
        self.graph.add_edge(group, member, ());
    }

    pub fn principal(&self, node: NodeId) -> Option<&Principal> {
        self.principals.get(node)
    }

    pub fn node(&self, reference: &PrincipalRef) -> Option<NodeId> {
        self.index.get(reference).copied()
    }

    pub fn len(&self) -> usize {
        self.principals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }

    /// Every principal reachable from `root` through any number of containment edges, in
    /// depth-first order. The root itself is not included.
    pub fn reachable(&self, root: NodeId) -> Vec<&Principal> {
        if !self.graph.contains_node(root) {
            return Vec::new();
        }

        let mut reachable = Vec::new();
        let mut dfs = Dfs::new(&self.graph, root);
        while let Some(node) = dfs.next(&self.graph) {
            if node == root {
                continue;
            }
            if let Some(principal) = self.principal(node) {
                reachable.push(principal);
            }
        }
        reachable
    }

    /// Transitive user members of `root`.
    pub fn users(&self, root: NodeId) -> Vec<&UserRecord> {
        self.reachable(root)
            .into_iter()
            .filter_map(|principal| match principal {
                Principal::User(user) => Some(user),
                Principal::Group(_) => None,
            })
            .collect()
    }

    /// Transitive group members of `root`.
    pub fn groups(&self, root: NodeId) -> Vec<&GroupRecord> {
        self.reachable(root)
            .into_iter()
            .filter_map(|principal| match principal {
                Principal::User(_) => None,
                Principal::Group(group) => Some(group),
            })
            .collect()
    }

    /// Return `true` if `to` is a (possibly indirect) member of `from`.
    pub fn has_path(&self, from: NodeId, to: NodeId) -> bool {
        if !self.graph.contains_node(from) {
            return false;
        }

        let mut dfs = Dfs::new(&self.graph, from);
        while let Some(node) = dfs.next(&self.graph) {
            if node == to && node != from {
                return true;
            }
        }
        false
    }
}
