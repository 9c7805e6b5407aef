//! Efficient CNL output with a patchable header.
//!
//! Output collections start with a provisional header whose counts are
//! fixed-width fields. Once the body is written and the final counts are
//! known, the fields are overwritten in place. An unpatched header still
//! parses, declaring 0 (unspecified) counts.

use super::buffers::DEFAULT_OUTPUT_BUFFER;
use crate::cnl::NodeId;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};

/// Width of a header count field: the decimal digits of the largest
/// [`NodeId`] plus the terminating comma.
pub const FIELD_WIDTH: usize = NodeId::MAX.ilog10() as usize + 2;

const CLUSTERS_PREFIX: &str = "# Clusters: ";
const NODES_PREFIX: &str = " Nodes: ";
const BASE_PREFIX: &str = "# Clusters: 1, Nodes: ";
const HEADER_SUFFIX: &str = " Fuzzy: 0, Numbered: 0\n";

/// Layout of the output header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    /// Collection of clusters, both counts are patched.
    Collection,
    /// Node base stored as a single cluster, only the node count is patched.
    NodeBase,
}

impl HeaderKind {
    /// Render the provisional header with stub count fields.
    pub fn provisional(self) -> Vec<u8> {
        let stub = count_field(0).unwrap_or([b' '; FIELD_WIDTH]);
        let mut header = Vec::with_capacity(64 + 2 * FIELD_WIDTH);
        match self {
            HeaderKind::Collection => {
                header.extend_from_slice(CLUSTERS_PREFIX.as_bytes());
                header.extend_from_slice(&stub);
                header.extend_from_slice(NODES_PREFIX.as_bytes());
                header.extend_from_slice(&stub);
            }
            HeaderKind::NodeBase => {
                header.extend_from_slice(BASE_PREFIX.as_bytes());
                header.extend_from_slice(&stub);
            }
        }
        header.extend_from_slice(HEADER_SUFFIX.as_bytes());
        header
    }

    fn clusters_offset(self) -> Option<u64> {
        match self {
            HeaderKind::Collection => Some(CLUSTERS_PREFIX.len() as u64),
            HeaderKind::NodeBase => None,
        }
    }

    fn nodes_offset(self) -> u64 {
        match self {
            HeaderKind::Collection => (CLUSTERS_PREFIX.len() + FIELD_WIDTH + NODES_PREFIX.len()) as u64,
            HeaderKind::NodeBase => BASE_PREFIX.len() as u64,
        }
    }
}

/// Comma-terminated, space-padded count field, None if the value does not fit.
fn count_field(value: usize) -> Option<[u8; FIELD_WIDTH]> {
    let mut itoa_buf = itoa::Buffer::new();
    let digits = itoa_buf.format(value).as_bytes();
    if digits.len() + 1 > FIELD_WIDTH {
        return None;
    }
    let mut field = [b' '; FIELD_WIDTH];
    field[..digits.len()].copy_from_slice(digits);
    field[digits.len()] = b',';
    Some(field)
}

/// Overwrite the provisional header counts in place.
///
/// `clusters` is ignored for [`HeaderKind::NodeBase`]. The stream position
/// is left at the end of the output.
pub fn patch_header<W: Write + Seek>(
    output: &mut W,
    kind: HeaderKind,
    clusters: usize,
    nodes: usize,
) -> io::Result<()> {
    let overflow = |value: usize| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("count {} exceeds the reserved header field", value),
        )
    };
    let nodes_field = count_field(nodes).ok_or_else(|| overflow(nodes))?;

    if let Some(offset) = kind.clusters_offset() {
        let clusters_field = count_field(clusters).ok_or_else(|| overflow(clusters))?;
        output.seek(SeekFrom::Start(offset))?;
        output.write_all(&clusters_field)?;
    }
    output.seek(SeekFrom::Start(kind.nodes_offset()))?;
    output.write_all(&nodes_field)?;
    output.flush()?;
    output.seek(SeekFrom::End(0))?;
    Ok(())
}

/// Buffered CNL collection writer.
///
/// Uses itoa for zero-allocation id formatting.
pub struct CnlWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
}

impl<W: Write> CnlWriter<W> {
    /// Create a new CnlWriter with the default 2MB buffer.
    pub fn new(output: W) -> Self {
        Self::with_capacity(DEFAULT_OUTPUT_BUFFER, output)
    }

    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            itoa_buf: itoa::Buffer::new(),
        }
    }

    /// Write the provisional header of the given layout.
    pub fn write_header(&mut self, kind: HeaderKind) -> io::Result<()> {
        self.writer.write_all(&kind.provisional())
    }

    /// Write a full line as-is with newline.
    #[inline]
    pub fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        self.writer.write_all(line)?;
        self.writer.write_all(b"\n")
    }

    /// Write ids as a single space-separated line.
    pub fn write_ids<I: IntoIterator<Item = NodeId>>(&mut self, ids: I) -> io::Result<()> {
        let mut first = true;
        for id in ids {
            if !first {
                self.writer.write_all(b" ")?;
            }
            first = false;
            self.writer.write_all(self.itoa_buf.format(id).as_bytes())?;
        }
        self.writer.write_all(b"\n")
    }

    /// Flush the buffer and return the underlying output.
    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}
