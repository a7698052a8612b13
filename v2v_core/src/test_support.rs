//! Fixed-adjacency neighbor finder for unit tests.

use crate::gossip::FloodSource;
use crate::neighbors::{NeighborFinder, PeerHandle};
use crate::record::Position;
use crate::store::LocalStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use v2v_env::AgentId;

struct Inner {
    stores: Vec<Arc<LocalStore>>,
    index: HashMap<AgentId, usize>,
    adjacency: Vec<Vec<usize>>,
    queries: AtomicUsize,
}

impl NeighborFinder for Inner {
    fn query(&self, _position: &Position, _radius: f64, exclude: AgentId) -> Vec<PeerHandle> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let Some(&idx) = self.index.get(&exclude) else {
            return Vec::new();
        };
        self.adjacency[idx]
            .iter()
            .map(|&n| {
                PeerHandle::new(
                    self.stores[n].owner(),
                    position_of(n),
                    1000.0,
                    Arc::clone(&self.stores[n]),
                )
            })
            .collect()
    }
}

fn position_of(idx: usize) -> Position {
    Position::new(idx as f64 * 10.0, 0.0, 0.0)
}

/// Agents `0..n` wired by an explicit adjacency list.
pub(crate) struct StaticTopology {
    inner: Arc<Inner>,
}

impl StaticTopology {
    fn from_adjacency(adjacency: Vec<Vec<usize>>) -> Self {
        let stores: Vec<_> = (0..adjacency.len())
            .map(|i| Arc::new(LocalStore::new(AgentId::from_seed(i as u64))))
            .collect();
        let index = stores
            .iter()
            .enumerate()
            .map(|(i, s)| (s.owner(), i))
            .collect();
        Self {
            inner: Arc::new(Inner {
                stores,
                index,
                adjacency,
                queries: AtomicUsize::new(0),
            }),
        }
    }

    pub fn full_mesh(n: usize) -> Self {
        Self::from_adjacency(
            (0..n)
                .map(|i| (0..n).filter(|&j| j != i).collect())
                .collect(),
        )
    }

    pub fn chain(n: usize) -> Self {
        Self::from_adjacency(
            (0..n)
                .map(|i| {
                    let mut v = Vec::new();
                    if i > 0 {
                        v.push(i - 1);
                    }
                    if i + 1 < n {
                        v.push(i + 1);
                    }
                    v
                })
                .collect(),
        )
    }

    pub fn ring(n: usize) -> Self {
        Self::from_adjacency(
            (0..n)
                .map(|i| vec![(i + n - 1) % n, (i + 1) % n])
                .collect(),
        )
    }

    pub fn finder(&self) -> Arc<dyn NeighborFinder> {
        self.inner.clone()
    }

    pub fn id(&self, idx: usize) -> AgentId {
        self.inner.stores[idx].owner()
    }

    pub fn store(&self, idx: usize) -> Arc<LocalStore> {
        Arc::clone(&self.inner.stores[idx])
    }

    pub fn source(&self, idx: usize) -> FloodSource {
        FloodSource {
            id: self.id(idx),
            position: position_of(idx),
            radius: 1000.0,
        }
    }

    pub fn query_count(&self) -> usize {
        self.inner.queries.load(Ordering::Relaxed)
    }
}
