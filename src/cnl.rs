//! CNL (cluster node list) format vocabulary.
//!
//! A CNL collection is a text file with one cluster per line:
//!
//! ```text
//! # Clusters: 3, Nodes: 6, Fuzzy: 0, Numbered: 0
//! 1 2
//! 7> 3 4
//! 5 6:0.5
//! ```
//!
//! The optional leading comment declares the number of clusters and nodes.
//! A cluster line may start with a label token ending in `>`, the remaining
//! tokens are node ids, optionally carrying a share suffix that is ignored.

use crate::streaming::parsing::{is_comment, parse_u64_fast, tokens_by, Tokens};
use crate::streaming::LineBuffer;
use std::io::{self, BufRead};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// Node id, unique per physical node. Zero is a valid id.
pub type NodeId = u32;

/// Errors that can occur while merging or extracting collections.
#[derive(Error, Debug)]
pub enum CnlError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Input unavailable: {0}")]
    InputUnavailable(String),

    #[error("Output file '{}' already exists, use --rewrite to overwrite it", .0.display())]
    OutputConflict(PathBuf),
}

pub type Result<T> = std::result::Result<T, CnlError>;

/// Counts declared by the collection header, 0 means not specified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionHeader {
    pub clusters: usize,
    pub nodes: usize,
}

impl CollectionHeader {
    /// Whether neither count was declared.
    pub fn is_unspecified(&self) -> bool {
        self.clusters == 0 && self.nodes == 0
    }
}

/// Delimiters of the header attribute names and values.
const ATTR_DELIMS: &[u8] = b" \t\r\n:,";

/// Parse the leading comment block of a collection.
///
/// Reads lines while they are empty or comments. The first comment carrying
/// `clusters` / `nodes` attributes is taken as the header, comments without
/// recognized attributes are skipped as commentary. Scanning stops at the
/// first non-comment line, which stays loaded in `line`.
///
/// Returns the declared counts and whether `line` holds an unconsumed line.
pub fn parse_header<R: BufRead>(input: &mut R, line: &mut LineBuffer) -> (CollectionHeader, bool) {
    let mut header = CollectionHeader::default();
    let mut found = false;

    while line.read_line(input) {
        if line.is_empty() {
            continue;
        }
        let bytes = line.as_bytes();
        if !is_comment(bytes) {
            return (validated(header), true);
        }
        if !found {
            found = parse_attributes(comment_body(bytes), &mut header);
        }
    }

    (validated(header), false)
}

/// Text of a comment line after the leading `#`.
fn comment_body(line: &[u8]) -> &[u8] {
    let start = line.iter().position(|&b| b == b'#').map_or(0, |pos| pos + 1);
    &line[start..]
}

/// Parse `clusters` and `nodes` attributes of a header comment.
///
/// Returns whether any attribute was recognized.
fn parse_attributes(body: &[u8], header: &mut CollectionHeader) -> bool {
    let mut toks = tokens_by(body, ATTR_DELIMS);
    let mut attrs = 0;

    while attrs < 2 {
        let Some(tok) = toks.next() else { break };
        // Continued comment, e.g. "##"
        if attrs == 0 && tok[0] == b'#' {
            break;
        }
        let slot = if tok.eq_ignore_ascii_case(b"clusters") {
            &mut header.clusters
        } else if tok.eq_ignore_ascii_case(b"nodes") {
            &mut header.nodes
        } else {
            if attrs == 0 {
                debug!(
                    "comment without header attributes skipped: {}",
                    String::from_utf8_lossy(tok)
                );
            } else {
                warn!(
                    "header parsing is omitted because of the unexpected attribute: {}",
                    String::from_utf8_lossy(tok)
                );
            }
            break;
        };
        *slot = match toks.next().map(|val| (val, parse_u64_fast(val))) {
            Some((_, Some(val))) => usize::try_from(val).unwrap_or(usize::MAX),
            Some((val, None)) => {
                warn!(
                    "invalid header count value '{}', considered unspecified",
                    String::from_utf8_lossy(val)
                );
                0
            }
            None => {
                warn!("header attribute without a value, considered unspecified");
                0
            }
        };
        attrs += 1;
    }

    attrs > 0
}

/// Clamp the declared cluster count to the node count when both are given.
fn validated(mut header: CollectionHeader) -> CollectionHeader {
    if header.nodes != 0 && header.clusters > header.nodes {
        warn!(
            "the number of clusters ({}) typically should not exceed the number of nodes ({})",
            header.clusters, header.nodes
        );
        header.clusters = header.nodes;
    }
    header
}

/// Whether the line holds a cluster with at least one member token.
///
/// Blank lines and comments are not clusters. A line holding only a label
/// token is an empty cluster, it is reported and skipped.
pub fn is_cluster_line(line: &[u8]) -> bool {
    let mut toks = Tokens::new(line);
    let Some(first) = toks.next() else {
        return false;
    };
    if first[0] == b'#' {
        return false;
    }
    if is_label(first) && toks.next().is_none() {
        warn!(
            "empty cluster exists: '{}', skipped",
            String::from_utf8_lossy(first)
        );
        return false;
    }
    true
}

/// Member tokens of a cluster line, the label token is skipped.
///
/// Expects a line accepted by [`is_cluster_line`].
pub fn cluster_members(line: &[u8]) -> Tokens<'_> {
    let mut toks = Tokens::new(line);
    let mut peek = toks.clone();
    if peek.next().is_some_and(is_label) {
        toks = peek;
    }
    toks
}

#[inline]
fn is_label(tok: &[u8]) -> bool {
    tok.last() == Some(&b'>')
}
