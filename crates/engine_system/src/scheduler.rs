//! Update-order resolution from declared system dependencies.
//!
//! A system that depends on a component type owned by another system runs
//! after that owner. The order is a topological sort (Kahn's algorithm) in
//! which ready systems are taken in registration order, so independent
//! systems keep the order they were added in.

use std::collections::{BTreeSet, HashMap};

use engine_component::ComponentTypeId;

/// The scheduling-relevant view of one registered system.
#[derive(Debug, Clone)]
pub struct SystemNode {
    /// The component type the system owns.
    pub component: ComponentTypeId,
    /// Component types the system requires.
    pub dependencies: Vec<ComponentTypeId>,
}

/// Compute an update order over `nodes` (indices are registration order).
///
/// Dependencies on the node's own type, and on types no node owns, add no
/// edge.
///
/// # Errors
///
/// Returns the indices of every node that could not be ordered (the members
/// of a cycle and anything downstream of one).
pub fn resolve_order(nodes: &[SystemNode]) -> Result<Vec<usize>, Vec<usize>> {
    let owners: HashMap<ComponentTypeId, usize> = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.component, idx))
        .collect();

    // 1. Build adjacency (owner -> dependant) and in-degree counts.
    let mut dependants: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut in_degree = vec![0usize; nodes.len()];
    for (idx, node) in nodes.iter().enumerate() {
        let upstream: BTreeSet<usize> = node
            .dependencies
            .iter()
            .filter_map(|dep| owners.get(dep).copied())
            .filter(|&owner| owner != idx)
            .collect();
        for owner in upstream {
            dependants[owner].push(idx);
            in_degree[idx] += 1;
        }
    }

    // 2. Seed with every node that waits on nothing.
    let mut ready: BTreeSet<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();

    // 3. Always take the earliest-registered ready node.
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(idx) = ready.pop_first() {
        order.push(idx);
        for &next in &dependants[idx] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.insert(next);
            }
        }
    }

    // 4. Anything left over sits on or behind a cycle.
    if order.len() == nodes.len() {
        Ok(order)
    } else {
        Err((0..nodes.len()).filter(|&i| in_degree[i] > 0).collect())
    }
}
