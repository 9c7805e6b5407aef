//! Collection size estimation.
//!
//! When a collection header omits its counts, they are inferred from the
//! file size. The estimates only presize the dedup index and node sets,
//! they never affect the results.

use crate::cnl::CollectionHeader;
use crate::config::Membership;

/// Expected number of clusters and nodes of a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Estimate {
    pub clusters: usize,
    pub nodes: usize,
}

/// Estimate the number of nodes listed in `byte_size` bytes of a collection.
///
/// Fills the decimal-width brackets of ids from the shortest: 10 one-digit
/// ids, 90 two-digit ids and so on, each id taking its digits plus one
/// separator byte. The count is divided by the membership.
pub fn estimate_node_count(byte_size: u64, membership: Membership) -> usize {
    let mut remaining = byte_size;
    let mut nodes: u64 = 0;
    let mut entry: u64 = 2; // 1 digit + separator
    let mut bracket_ids: u64 = 10;
    while remaining > 0 {
        let taken = remaining.min(bracket_ids.saturating_mul(entry));
        nodes += taken / entry;
        remaining -= taken;
        entry += 1;
        bracket_ids = if bracket_ids == 10 {
            90
        } else {
            bracket_ids.saturating_mul(10)
        };
    }
    (nodes as f64 / membership.get() as f64) as usize
}

/// Estimate the number of clusters from the number of nodes.
///
/// The number of clusters typically does not exceed the square root of the
/// number of nodes. Returns 0 for 0 nodes.
pub fn estimate_cluster_count(nodes: usize, membership: Membership) -> usize {
    if nodes == 0 {
        return 0;
    }
    (nodes as f64 * membership.get() as f64).sqrt() as usize + 1
}

/// Resolve the sizing hint of a collection from its header and byte size.
///
/// Declared counts win. Declared clusters without nodes imply
/// `clusters² / membership` nodes. Without any declaration the node count is
/// estimated from `byte_size` (unknown size leaves it 0). The result is
/// capped by the byte size, as `N` bytes can not list more than `N / 2` ids.
pub fn resolve_counts(
    header: CollectionHeader,
    byte_size: Option<u64>,
    membership: Membership,
) -> Estimate {
    let mut clusters = header.clusters;
    let mut nodes = header.nodes;

    if clusters == 0 {
        if nodes == 0 {
            if let Some(bytes) = byte_size {
                nodes = estimate_node_count(bytes, membership);
            }
        }
        clusters = estimate_cluster_count(nodes, membership);
    } else if nodes == 0 {
        nodes = (clusters as f64 * clusters as f64 / membership.get() as f64) as usize;
    }

    if let Some(bytes) = byte_size {
        let limit = usize::try_from(bytes / 2 + 1).unwrap_or(usize::MAX);
        clusters = clusters.min(limit);
        nodes = nodes.min(limit);
    }
    Estimate { clusters, nodes }
}
