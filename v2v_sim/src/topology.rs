//! Fixed adjacency topologies.
//!
//! Unlike [`ProximityIndex`](crate::network::ProximityIndex) these ignore
//! positions and radii entirely, which makes hop counts exact in tests.

use parking_lot::RwLock;
use std::collections::HashMap;
use v2v_core::{AgentId, NeighborFinder, PeerHandle, Position};

/// Neighbor finder over an explicit adjacency list.
///
/// Agents are registered in index order after construction, since each
/// agent needs the finder before its handle exists.
pub struct FixedTopology {
    adjacency: Vec<Vec<usize>>,
    handles: RwLock<Vec<PeerHandle>>,
    index: RwLock<HashMap<AgentId, usize>>,
}

impl FixedTopology {
    fn from_adjacency(adjacency: Vec<Vec<usize>>) -> Self {
        Self {
            adjacency,
            handles: RwLock::new(Vec::new()),
            index: RwLock::new(HashMap::new()),
        }
    }

    /// Agents in a `rows x cols` grid, each linked to its 3 to 8 surrounding
    /// cells.
    pub fn grid(rows: usize, cols: usize) -> Self {
        let mut adjacency = vec![Vec::new(); rows * cols];

        for row in 0..rows {
            for col in 0..cols {
                let idx = row * cols + col;

                for dr in -1i64..=1 {
                    for dc in -1i64..=1 {
                        if dr == 0 && dc == 0 {
                            continue;
                        }

                        let nr = row as i64 + dr;
                        let nc = col as i64 + dc;

                        if nr >= 0 && nr < rows as i64 && nc >= 0 && nc < cols as i64 {
                            adjacency[idx].push(nr as usize * cols + nc as usize);
                        }
                    }
                }
            }
        }

        Self::from_adjacency(adjacency)
    }

    /// Agents on a line, each linked to its predecessor and successor.
    pub fn chain(n: usize) -> Self {
        let adjacency = (0..n)
            .map(|i| {
                let mut neighbors = Vec::new();
                if i > 0 {
                    neighbors.push(i - 1);
                }
                if i + 1 < n {
                    neighbors.push(i + 1);
                }
                neighbors
            })
            .collect();
        Self::from_adjacency(adjacency)
    }

    /// Every agent linked to every other.
    pub fn full(n: usize) -> Self {
        let adjacency = (0..n)
            .map(|i| (0..n).filter(|&j| j != i).collect())
            .collect();
        Self::from_adjacency(adjacency)
    }

    /// Registers the next agent. Returns its index.
    pub fn register(&self, handle: PeerHandle) -> usize {
        let mut handles = self.handles.write();
        let idx = handles.len();
        self.index.write().insert(handle.id(), idx);
        handles.push(handle);
        idx
    }

    /// Neighbor indices of an agent.
    pub fn neighbors(&self, idx: usize) -> &[usize] {
        self.adjacency.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of slots in the topology.
    pub fn agent_count(&self) -> usize {
        self.adjacency.len()
    }
}

impl NeighborFinder for FixedTopology {
    fn query(&self, _position: &Position, _radius: f64, exclude: AgentId) -> Vec<PeerHandle> {
        let Some(idx) = self.index.read().get(&exclude).copied() else {
            return Vec::new();
        };

        let handles = self.handles.read();
        self.neighbors(idx)
            .iter()
            .filter_map(|&n| handles.get(n).cloned())
            .collect()
    }
}
