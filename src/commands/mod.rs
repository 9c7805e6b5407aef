//! Command implementations for ResMerge.

pub mod extract;
pub mod merge;

pub use extract::{ExtractBaseCommand, ExtractStats};
pub use merge::{MergeCommand, MergeStats};

use crate::cnl::{CnlError, Result};
use std::io::{Seek, SeekFrom};

/// Fail unless the output is empty, leaving it positioned at the start.
pub(crate) fn ensure_empty<W: Seek>(output: &mut W) -> Result<()> {
    let len = output.seek(SeekFrom::End(0))?;
    if len != 0 {
        return Err(CnlError::Config(format!(
            "the output should be empty, it holds {} bytes",
            len
        )));
    }
    output.seek(SeekFrom::Start(0))?;
    Ok(())
}
