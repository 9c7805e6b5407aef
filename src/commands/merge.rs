//! Merge of clustering collections with size filtering and deduplication.
//!
//! # Algorithm
//!
//! 1. Optionally load the node base to synchronize with. Without it the node
//!    base is formed from the members of the written clusters.
//! 2. Write a provisional header with fixed-width count fields.
//! 3. Stream the clusters of each input collection:
//!    - drop members missing in the loaded node base (if any),
//!    - skip clusters left empty or rejected by the size filter,
//!    - write the cluster unless its fingerprint was already seen.
//! 4. Patch the header with the number of written clusters and nodes.
//!
//! # Memory Complexity
//!
//! O(c + n) - one fingerprint per written cluster and the node base,
//! input lines are streamed.

use super::ensure_empty;
use crate::cnl::{NodeId, Result};
use crate::config::{Membership, SizeFilter};
use crate::files::Collection;
use crate::fingerprint::{DedupIndex, Fingerprint};
use crate::nodebase::{load_nodes, NodeBase};
use crate::streaming::{parse_node_id, patch_header, CnlWriter, CollectionReader, HeaderKind, LineBuffer};
use std::fmt;
use std::io::{Seek, Write};
use tracing::{debug, info, warn};

/// Merge command configuration.
#[derive(Debug, Clone, Default)]
pub struct MergeCommand {
    /// Cluster size filter, applied after the node base synchronization
    pub filter: SizeFilter,
    /// Average node membership, a sizing heuristic
    pub membership: Membership,
}

impl MergeCommand {
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

    /// Merge `inputs` into `output`, optionally synchronizing the cluster
    /// members with the node base of `sync_base`.
    ///
    /// The output must be empty. Failures to read an input stop only that
    /// input, write failures abort the merge. A failed header patch is
    /// reported in the stats and leaves the provisional header in place.
    pub fn run<W, C>(
        &self,
        output: &mut W,
        inputs: &mut [C],
        sync_base: Option<&mut dyn Collection>,
    ) -> Result<MergeStats>
    where
        W: Write + Seek,
        C: Collection,
    {
        ensure_empty(output)?;

        let mut nodebase = NodeBase::new();
        let mut synchronized = false;
        if let Some(base) = sync_base {
            nodebase = load_nodes(base, self.membership, SizeFilter::default())?;
            if nodebase.is_empty() {
                warn!("the node base to synchronize with is empty, the merged clusters form it instead");
            }
            synchronized = !nodebase.is_empty();
        }

        let mut stats = MergeStats {
            synchronized,
            ..Default::default()
        };
        let mut writer = CnlWriter::new(&mut *output);
        writer.write_header(HeaderKind::Collection)?;

        let mut index = DedupIndex::new();
        let mut line = LineBuffer::new();
        let mut members: Vec<NodeId> = Vec::new();
        let mut fp = Fingerprint::new();
        // Member tokens of the written cluster, share suffixes retained
        let mut text: Vec<u8> = Vec::new();

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

            let estimate = reader.estimate();
            index.reserve_total(estimate.clusters);
            if !synchronized {
                nodebase.reserve_total(estimate.nodes);
            }
            // Cluster size typically does not exceed the square root of the node count
            members.reserve((estimate.nodes as f64).sqrt() as usize);

            while let Some(tokens) = reader.next_cluster() {
                stats.clusters_read += 1;
                members.clear();
                fp.clear();
                text.clear();

                for tok in tokens {
                    let Some(id) = parse_node_id(tok) else {
                        warn!("'{}': invalid node id '{}' skipped", name, String::from_utf8_lossy(tok));
                        continue;
                    };
                    stats.members_read += 1;
                    if synchronized && !nodebase.contains(id) {
                        continue;
                    }
                    members.push(id);
                    fp.add(id);
                    if !text.is_empty() {
                        text.push(b' ');
                    }
                    text.extend_from_slice(tok);
                }

                if members.is_empty() {
                    stats.clusters_emptied += 1;
                    continue;
                }
                if !self.filter.accepts(members.len()) {
                    stats.clusters_filtered += 1;
                    continue;
                }
                if !index.try_insert(&fp) {
                    stats.duplicates += 1;
                    continue;
                }

                if !synchronized {
                    nodebase.extend(members.iter().copied());
                }
                writer.write_line(&text)?;
                stats.clusters_written += 1;
                stats.members_written += members.len();
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

        let output = writer.into_inner()?;
        stats.clusters = index.len();
        stats.nodes = nodebase.len();
        stats.header_patched =
            match patch_header(output, HeaderKind::Collection, stats.clusters, stats.nodes) {
                Ok(()) => true,
                Err(e) => {
                    warn!("the provisional header has not been replaced: {}", e);
                    false
                }
            };

        info!("merge completed: {}", stats);
        Ok(stats)
    }
}

/// Statistics from the merge operation.
#[derive(Debug, Default, Clone)]
pub struct MergeStats {
    /// Inputs read to the end
    pub inputs_processed: usize,
    /// Inputs that could not be read or stopped early
    pub inputs_failed: usize,
    /// Number of cluster lines read
    pub clusters_read: usize,
    /// Number of valid member ids read, including repetitions
    pub members_read: usize,
    /// Clusters left without members (invalid ids or missing in the node base)
    pub clusters_emptied: usize,
    /// Clusters rejected by the size filter
    pub clusters_filtered: usize,
    /// Clusters dropped as duplicates
    pub duplicates: usize,
    /// Clusters written
    pub clusters_written: usize,
    /// Members of the written clusters
    pub members_written: usize,
    /// Clusters declared by the output header
    pub clusters: usize,
    /// Nodes declared by the output header
    pub nodes: usize,
    /// The members were synchronized with a loaded node base
    pub synchronized: bool,
    /// The provisional header was replaced with the final counts
    pub header_patched: bool,
}

impl MergeStats {
    /// Fraction of the read clusters retained in the output.
    pub fn retention_ratio(&self) -> f64 {
        if self.clusters_read == 0 {
            0.0
        } else {
            self.clusters_written as f64 / self.clusters_read as f64
        }
    }
}

impl fmt::Display for MergeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Inputs: {} ({} failed), Read: {} clusters / {} members, Emptied: {}, Filtered: {}, \
             Duplicates: {}, Written: {} clusters / {} members, Nodes: {}, Retention: {:.2}",
            self.inputs_processed,
            self.inputs_failed,
            self.clusters_read,
            self.members_read,
            self.clusters_emptied,
            self.clusters_filtered,
            self.duplicates,
            self.clusters_written,
            self.members_written,
            self.nodes,
            self.retention_ratio()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cnl::{parse_header, CnlError, CollectionHeader};
    use crate::commands::failing::{FlakyCollection, SeekLimited, SizeLimited};
    use crate::files::MemoryCollection;
    use std::io::Cursor;

    fn merge(cmd: &MergeCommand, inputs: &[&str], base: Option<&str>) -> (String, MergeStats) {
        let mut colls: Vec<MemoryCollection> = inputs
            .iter()
            .enumerate()
            .map(|(i, content)| MemoryCollection::new(format!("in{}", i), *content))
            .collect();
        let mut base = base.map(|content| MemoryCollection::new("base", content));
        let mut output = Cursor::new(Vec::new());
        let stats = cmd
            .run(
                &mut output,
                &mut colls,
                base.as_mut().map(|b| b as &mut dyn Collection),
            )
            .unwrap();
        (String::from_utf8(output.into_inner()).unwrap(), stats)
    }

    fn body(text: &str) -> Vec<&str> {
        text.lines().skip(1).collect()
    }

    fn header_of(text: &str) -> CollectionHeader {
        let mut input = text.as_bytes();
        parse_header(&mut input, &mut LineBuffer::new()).0
    }

    #[test]
    fn test_merge_dedups_across_files() {
        let cmd = MergeCommand::new().with_filter(SizeFilter::new(2, 0).unwrap());
        let (text, stats) = merge(
            &cmd,
            &["# Clusters: 2, Nodes: 4\n1 2\n3 4\n", "2 1\n5 6\n"],
            None,
        );

        assert_eq!(body(&text), vec!["1 2", "3 4", "5 6"]);
        assert_eq!(header_of(&text), CollectionHeader { clusters: 3, nodes: 6 });
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.clusters_written, 3);
        assert!(stats.header_patched);
        assert!(!stats.synchronized);
    }

    #[test]
    fn test_merge_size_filter() {
        let cmd = MergeCommand::new().with_filter(SizeFilter::new(2, 3).unwrap());
        let (text, stats) = merge(&cmd, &["1\n1 2\n1 2 3\n1 2 3 4\n"], None);

        assert_eq!(body(&text), vec!["1 2", "1 2 3"]);
        assert_eq!(stats.clusters_filtered, 2);
        assert_eq!(header_of(&text), CollectionHeader { clusters: 2, nodes: 3 });
    }

    #[test]
    fn test_merge_keeps_share_suffix_and_drops_label() {
        let cmd = MergeCommand::new();
        let (text, _) = merge(&cmd, &["c1> 1:0.5 2:0.5\n"], None);
        assert_eq!(body(&text), vec!["1:0.5 2:0.5"]);
    }

    #[test]
    fn test_merge_with_sync_base() {
        let cmd = MergeCommand::new().with_filter(SizeFilter::new(2, 0).unwrap());
        let (text, stats) = merge(
            &cmd,
            &["1 2 9\n3 9\n9 8\n4 5 6\n"],
            Some("# Clusters: 1, Nodes: 6\n1 2 3 4 5 6\n"),
        );

        // "3 9" shrinks below the size filter, "9 8" is emptied
        assert_eq!(body(&text), vec!["1 2", "4 5 6"]);
        assert!(stats.synchronized);
        assert_eq!(stats.clusters_emptied, 1);
        assert_eq!(stats.clusters_filtered, 1);
        assert_eq!(header_of(&text), CollectionHeader { clusters: 2, nodes: 6 });
    }

    #[test]
    fn test_merge_empty_sync_base_self_synchronizes() {
        let cmd = MergeCommand::new();
        let (text, stats) = merge(&cmd, &["1 2\n"], Some("# nothing here\n"));
        assert!(!stats.synchronized);
        assert_eq!(body(&text), vec!["1 2"]);
    }

    #[test]
    fn test_merge_skips_invalid_tokens() {
        let cmd = MergeCommand::new();
        let (text, stats) = merge(&cmd, &["1 x 2\nfoo bar\n"], None);
        assert_eq!(body(&text), vec!["1 2"]);
        assert_eq!(stats.clusters_emptied, 1);
        assert_eq!(stats.members_read, 2);
    }

    #[test]
    fn test_merge_rejects_non_empty_output() {
        let cmd = MergeCommand::new();
        let mut colls = vec![MemoryCollection::new("in", "1 2\n")];
        let mut output = Cursor::new(b"existing\n".to_vec());
        let result = cmd.run(&mut output, &mut colls, None);
        assert!(matches!(result, Err(CnlError::Config(_))));
        assert_eq!(output.into_inner(), b"existing\n");
    }

    #[test]
    fn test_merge_no_clusters_keeps_valid_header() {
        let cmd = MergeCommand::new();
        let (text, stats) = merge(&cmd, &["# Clusters: 0\n", ""], None);
        assert!(body(&text).is_empty());
        assert!(header_of(&text).is_unspecified());
        assert_eq!(stats.inputs_processed, 2);
    }

    #[test]
    fn test_merge_colliding_fingerprint_is_dropped() {
        // {1, 5, 6} and {2, 3, 7}: size 3, sum 12, sum of squares 62
        let cmd = MergeCommand::new();
        let (text, stats) = merge(&cmd, &["1 5 6\n2 3 7\n"], None);

        assert_eq!(body(&text), vec!["1 5 6"]);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.nodes, 3);
        assert_eq!(header_of(&text), CollectionHeader { clusters: 1, nodes: 3 });
    }

    #[test]
    fn test_merge_header_patch_failure_keeps_provisional_header() {
        let cmd = MergeCommand::new();
        let mut colls = vec![MemoryCollection::new("in", "1 2\n3 4\n")];
        // Both seeks of the empty output check succeed, the patch seek fails
        let mut output = SeekLimited::new(2);

        let stats = cmd.run(&mut output, &mut colls, None).unwrap();

        assert!(!stats.header_patched);
        assert_eq!(stats.clusters_written, 2);
        let text = output.text();
        assert!(text.starts_with("# Clusters: 0,"));
        assert!(header_of(&text).is_unspecified());
        assert_eq!(body(&text), vec!["1 2", "3 4"]);
    }

    #[test]
    fn test_merge_write_failure_aborts() {
        let cmd = MergeCommand::new();
        let mut colls = vec![MemoryCollection::new("in", "1 2\n3 4\n5 6\n")];
        let mut output = SizeLimited::new(70);

        let result = cmd.run(&mut output, &mut colls, None);
        assert!(matches!(result, Err(CnlError::Io(_))));
    }

    #[test]
    fn test_merge_read_failure_skips_to_next_input() {
        let cmd = MergeCommand::new();
        let mut colls = vec![
            FlakyCollection::broken("broken", "7 8\n9"),
            FlakyCollection::healthy("healthy", "1 2\n"),
        ];
        let mut output = Cursor::new(Vec::new());

        let stats = cmd.run(&mut output, &mut colls, None).unwrap();

        assert_eq!(stats.inputs_failed, 1);
        assert_eq!(stats.inputs_processed, 1);
        assert!(stats.header_patched);
        let text = String::from_utf8(output.into_inner()).unwrap();
        assert_eq!(body(&text), vec!["7 8", "1 2"]);
        assert_eq!(header_of(&text), CollectionHeader { clusters: 2, nodes: 4 });
    }
}
