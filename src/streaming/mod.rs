//! Centralized streaming utilities for ResMerge.
//!
//! This module provides shared components for the merge and extraction:
//! - Reusable line buffer for arbitrarily long lines
//! - Zero-allocation tokenizing of cluster lines
//! - Per-collection reading pipeline
//! - Buffered output with a patchable header
//!
//! Collections are streamed line by line, memory is bounded by the longest
//! line plus the deduplication state.

pub mod buffers;
pub mod collection;
pub mod line_buffer;
pub mod output;
pub mod parsing;

pub use collection::CollectionReader;
pub use line_buffer::LineBuffer;
pub use output::{patch_header, CnlWriter, HeaderKind};
pub use parsing::{parse_node_id, Tokens};
