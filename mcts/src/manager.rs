//! Pooled node arena.
//!
//! Nodes are allocated once and recycled: releasing a node resets it and
//! pushes its id onto a free list, so root shifts that drop whole subtrees
//! do not churn the allocator. The arena only ever grows. One mutex guards
//! the node table, the free list, and the in-use set; node state itself is
//! protected by the nodes' own locks.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::config::PlayerConfig;
use crate::evaluator::Evaluator;
use crate::node::{Node, NodeId};
use crate::processor::Processor;

struct ManagerInner {
    nodes: Vec<Arc<Node>>,
    free: Vec<NodeId>,
    in_use: HashSet<u32>,
}

/// Allocation snapshot for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerStats {
    pub total: usize,
    pub in_use: usize,
    pub free: usize,
}

pub struct NodeManager {
    evaluator: Evaluator,
    width: i32,
    height: i32,
    inner: Mutex<ManagerInner>,
}

impl NodeManager {
    pub fn new(processor: Arc<Processor>, config: &PlayerConfig) -> Self {
        Self {
            evaluator: Evaluator::new(processor, config.komi, config.rule, config.superko),
            width: config.width,
            height: config.height,
            inner: Mutex::new(ManagerInner {
                nodes: Vec::new(),
                free: Vec::new(),
                in_use: HashSet::new(),
            }),
        }
    }

    /// A node initialized as a clear-board root.
    pub fn create_root(&self) -> Arc<Node> {
        let node = self.create_node();
        node.init_as_root();
        node
    }

    /// A recycled node if one is free, otherwise a freshly allocated one.
    /// The caller is responsible for initialization.
    pub fn create_node(&self) -> Arc<Node> {
        let mut inner = self.inner.lock().expect("node manager poisoned");
        let node = match inner.free.pop() {
            Some(id) => Arc::clone(&inner.nodes[id.0 as usize]),
            None => {
                let id = NodeId(inner.nodes.len() as u32);
                let node = Arc::new(Node::new(
                    id,
                    self.evaluator.clone(),
                    self.width,
                    self.height,
                ));
                inner.nodes.push(Arc::clone(&node));
                node
            }
        };
        inner.in_use.insert(node.id().0);
        node
    }

    /// Returns a node to the pool. Unknown or already-free ids are ignored.
    pub fn release(&self, id: NodeId) {
        let node = {
            let mut inner = self.inner.lock().expect("node manager poisoned");
            if !inner.in_use.remove(&id.0) {
                return;
            }
            inner.free.push(id);
            Arc::clone(&inner.nodes[id.0 as usize])
        };
        // Reset outside the table lock; the node's own locks suffice.
        node.reset();
    }

    /// Resolves an id to its node.
    pub fn get(&self, id: NodeId) -> Arc<Node> {
        let inner = self.inner.lock().expect("node manager poisoned");
        Arc::clone(&inner.nodes[id.0 as usize])
    }

    pub fn stats(&self) -> ManagerStats {
        let inner = self.inner.lock().expect("node manager poisoned");
        ManagerStats {
            total: inner.nodes.len(),
            in_use: inner.in_use.len(),
            free: inner.free.len(),
        }
    }
}
