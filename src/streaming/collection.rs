//! Streaming reader of a single collection.
//!
//! Parses the header, resolves the sizing hint and then yields the member
//! tokens of each cluster line, skipping blank lines, comments and empty
//! clusters. The tokens borrow the shared line buffer, so a cluster must be
//! consumed before the next one is requested.

use super::parsing::Tokens;
use super::LineBuffer;
use crate::cnl::{cluster_members, is_cluster_line, parse_header, CollectionHeader, Result};
use crate::config::Membership;
use crate::estimate::{resolve_counts, Estimate};
use crate::files::Collection;
use std::io::{self, BufRead};
use tracing::debug;

pub struct CollectionReader<'a> {
    reader: Box<dyn BufRead + 'a>,
    line: &'a mut LineBuffer,
    name: String,
    header: CollectionHeader,
    estimate: Estimate,
    /// The line buffer holds a line not yet consumed
    loaded: bool,
    clusters: usize,
}

impl<'a> CollectionReader<'a> {
    /// Open the collection and parse its header.
    pub fn open<C: Collection + ?Sized>(
        source: &'a mut C,
        line: &'a mut LineBuffer,
        membership: Membership,
    ) -> Result<Self> {
        let name = source.name().to_owned();
        let byte_size = source.byte_size();
        let mut reader = source.reader()?;

        let (header, loaded) = parse_header(&mut reader, line);
        let estimate = resolve_counts(header, byte_size, membership);
        if header.is_unspecified() {
            debug!(
                "'{}': {} nodes, {} clusters estimated from {:?} bytes",
                name, estimate.nodes, estimate.clusters, byte_size
            );
        } else {
            debug!(
                "'{}': declared {} clusters, {} nodes (expected {} clusters, {} nodes)",
                name, header.clusters, header.nodes, estimate.clusters, estimate.nodes
            );
        }

        Ok(Self {
            reader,
            line,
            name,
            header,
            estimate,
            loaded,
            clusters: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Counts declared by the header.
    pub fn header(&self) -> CollectionHeader {
        self.header
    }

    /// Expected counts of the collection, a sizing hint.
    pub fn estimate(&self) -> Estimate {
        self.estimate
    }

    /// Member tokens of the next cluster, None at the end of the collection.
    pub fn next_cluster(&mut self) -> Option<Tokens<'_>> {
        loop {
            if !self.loaded && !self.line.read_line(&mut self.reader) {
                return None;
            }
            self.loaded = false;
            if is_cluster_line(self.line.as_bytes()) {
                self.clusters += 1;
                return Some(cluster_members(self.line.as_bytes()));
            }
        }
    }

    /// Finish reading, returning the number of clusters read or the read
    /// error that stopped the collection early.
    pub fn finish(self) -> io::Result<usize> {
        match self.line.take_error() {
            Some(e) => Err(e),
            None => Ok(self.clusters),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::MemoryCollection;

    fn clusters_of(content: &str) -> Vec<Vec<String>> {
        let mut coll = MemoryCollection::new("test", content);
        let mut line = LineBuffer::new();
        let mut reader = CollectionReader::open(&mut coll, &mut line, Membership::default()).unwrap();
        let mut clusters = Vec::new();
        while let Some(tokens) = reader.next_cluster() {
            clusters.push(
                tokens
                    .map(|t| String::from_utf8_lossy(t).into_owned())
                    .collect(),
            );
        }
        assert_eq!(reader.finish().unwrap(), clusters.len());
        clusters
    }

    #[test]
    fn test_reads_clusters_after_header() {
        let clusters = clusters_of("# Clusters: 2, Nodes: 4\n1 2\n\n# note\nc> 3 4\nempty>\n");
        assert_eq!(clusters, vec![vec!["1", "2"], vec!["3", "4"]]);
    }

    #[test]
    fn test_first_line_is_a_cluster() {
        let clusters = clusters_of("5 6\n7");
        assert_eq!(clusters, vec![vec!["5", "6"], vec!["7"]]);
    }

    #[test]
    fn test_header_and_estimate() {
        let mut coll = MemoryCollection::new("test", "# Clusters: 3\n1 2\n");
        let mut line = LineBuffer::new();
        let reader = CollectionReader::open(&mut coll, &mut line, Membership::default()).unwrap();
        assert_eq!(reader.header(), CollectionHeader { clusters: 3, nodes: 0 });
        assert_eq!(reader.estimate(), Estimate { clusters: 3, nodes: 9 });
        assert_eq!(reader.name(), "test");
    }
}
