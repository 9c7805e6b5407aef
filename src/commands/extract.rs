//! Extraction of the node base from clustering collections.
//!
//! The unique member ids of all the input clusters passing the size filter
//! are written as a single cluster. Ids are written in ascending order.

use super::ensure_empty;
use crate::cnl::{NodeId, Result};
use crate::config::{Membership, SizeFilter};
use crate::files::Collection;
use crate::nodebase::NodeBase;
use crate::streaming::{parse_node_id, patch_header, CnlWriter, CollectionReader, HeaderKind, LineBuffer};
use std::fmt;
use std::io::{Seek, Write};
use tracing::{debug, info, warn};

/// The node base is reserved only when its capacity is below 1/RESERVE_RATIO
/// of the estimated node count.
const RESERVE_RATIO: usize = 25;

/// Node base extraction command configuration.
#[derive(Debug, Clone, Default)]
pub struct ExtractBaseCommand {
    /// Filter of the clusters contributing their members
    pub filter: SizeFilter,
    /// Average node membership, a sizing heuristic
    pub membership: Membership,
}

impl ExtractBaseCommand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cluster size filter.
    pub fn with_filter(mut self, filter: SizeFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the average node membership.
    pub fn with_membership(mut self, membership: Membership) -> Self {
        self.membership = membership;
        self
    }

    /// Extract the node base of `inputs` into `output`.
    ///
    /// The output must be empty.
    pub fn run<W, C>(&self, output: &mut W, inputs: &mut [C]) -> Result<ExtractStats>
    where
        W: Write + Seek,
        C: Collection,
    {
        ensure_empty(output)?;

        let mut stats = ExtractStats::default();
        let mut writer = CnlWriter::new(&mut *output);
        writer.write_header(HeaderKind::NodeBase)?;

        let mut nodebase = NodeBase::new();
        let mut line = LineBuffer::new();
        let mut members: Vec<NodeId> = Vec::new();

        for input in inputs.iter_mut() {
            let name = input.name().to_owned();
            let mut reader = match CollectionReader::open(input, &mut line, self.membership) {
                Ok(reader) => reader,
                Err(e) => {
                    warn!("can't read '{}': {}", name, e);
                    stats.inputs_failed += 1;
                    continue;
                }
            };

            let nodes = reader.estimate().nodes;
            if nodebase.capacity() < nodes / RESERVE_RATIO {
                nodebase.reserve_total(nodes);
            }

            while let Some(tokens) = reader.next_cluster() {
                stats.clusters_read += 1;
                members.clear();
                for tok in tokens {
                    match parse_node_id(tok) {
                        Some(id) => members.push(id),
                        None => warn!(
                            "'{}': invalid node id '{}' skipped",
                            name,
                            String::from_utf8_lossy(tok)
                        ),
                    }
                }
                stats.members_read += members.len();

                if !members.is_empty() && self.filter.accepts(members.len()) {
                    nodebase.extend(members.iter().copied());
                } else {
                    stats.clusters_filtered += 1;
                }
            }

            match reader.finish() {
                Ok(clusters) => {
                    debug!("'{}': {} clusters processed", name, clusters);
                    stats.inputs_processed += 1;
                }
                Err(e) => {
                    warn!("reading of '{}' stopped early: {}", name, e);
                    stats.inputs_failed += 1;
                }
            }
        }

        writer.write_ids(nodebase.sorted_ids())?;
        let output = writer.into_inner()?;
        stats.nodes = nodebase.len();
        stats.header_patched = match patch_header(output, HeaderKind::NodeBase, 1, stats.nodes) {
            Ok(()) => true,
            Err(e) => {
                warn!("the provisional header has not been replaced: {}", e);
                false
            }
        };

        info!("node base extraction completed: {}", stats);
        Ok(stats)
    }
}

/// Statistics from the node base extraction.
#[derive(Debug, Default, Clone)]
pub struct ExtractStats {
    /// Inputs read to the end
    pub inputs_processed: usize,
    /// Inputs that could not be read or stopped early
    pub inputs_failed: usize,
    /// Number of cluster lines read
    pub clusters_read: usize,
    /// Clusters rejected by the size filter or without valid members
    pub clusters_filtered: usize,
    /// Number of valid member ids read, including repetitions
    pub members_read: usize,
    /// Unique nodes in the extracted base
    pub nodes: usize,
    /// The provisional header was replaced with the final count
    pub header_patched: bool,
}

impl fmt::Display for ExtractStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Inputs: {} ({} failed), Read: {} clusters / {} members, Filtered: {}, Nodes: {}",
            self.inputs_processed,
            self.inputs_failed,
            self.clusters_read,
            self.members_read,
            self.clusters_filtered,
            self.nodes
        )
    }
}
