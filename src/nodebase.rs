//! Node base: the set of unique node ids of a collection.

use crate::cnl::{NodeId, Result};
use crate::config::{Membership, SizeFilter};
use crate::files::Collection;
use crate::streaming::parsing::parse_node_id;
use crate::streaming::{CollectionReader, LineBuffer};
use rustc_hash::FxHashSet;
use tracing::{info, warn};

/// Set of unique node ids.
#[derive(Debug, Default, Clone)]
pub struct NodeBase {
    ids: FxHashSet<NodeId>,
}

impl NodeBase {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.ids.contains(&id)
    }

    #[inline]
    pub fn insert(&mut self, id: NodeId) -> bool {
        self.ids.insert(id)
    }

    /// Number of ids the base holds without rehashing.
    pub fn capacity(&self) -> usize {
        self.ids.capacity()
    }

    /// Make room for `nodes` ids in total.
    pub fn reserve_total(&mut self, nodes: usize) {
        if self.capacity() < nodes {
            self.ids.reserve(nodes - self.ids.len());
        }
    }

    /// The ids in ascending order.
    pub fn sorted_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.ids.iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Extend<NodeId> for NodeBase {
    fn extend<I: IntoIterator<Item = NodeId>>(&mut self, ids: I) {
        self.ids.extend(ids);
    }
}

impl FromIterator<NodeId> for NodeBase {
    fn from_iter<I: IntoIterator<Item = NodeId>>(ids: I) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }
}

/// Load the unique node ids of a collection.
///
/// Members of the clusters rejected by `filter` are not included. No
/// cluster deduplication is performed, repeated ids coalesce in the set.
pub fn load_nodes<C: Collection + ?Sized>(
    source: &mut C,
    membership: Membership,
    filter: SizeFilter,
) -> Result<NodeBase> {
    let mut line = LineBuffer::new();
    let mut reader = CollectionReader::open(source, &mut line, membership)?;
    let mut nodebase = NodeBase::new();
    nodebase.reserve_total(reader.estimate().nodes);

    let mut members: Vec<NodeId> = Vec::new();
    let mut total_members = 0usize;
    while let Some(tokens) = reader.next_cluster() {
        members.clear();
        for tok in tokens {
            match parse_node_id(tok) {
                Some(id) => members.push(id),
                None => warn!(
                    "invalid node id '{}' skipped",
                    String::from_utf8_lossy(tok)
                ),
            }
        }
        total_members += members.len();
        if !members.is_empty() && filter.accepts(members.len()) {
            nodebase.extend(members.iter().copied());
        }
    }

    let name = reader.name().to_owned();
    let clusters = reader.finish()?;
    info!(
        "the loaded node base of '{}' has {} nodes from {} members of {} clusters",
        name,
        nodebase.len(),
        total_members,
        clusters
    );
    Ok(nodebase)
}
