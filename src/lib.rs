//! ResMerge: merge of clustering collections in the CNL format.
//!
//! This library merges multiple collections of clusters into a single one,
//! dropping duplicate clusters, and extracts node bases of collections.
//!
//! # Features
//!
//! - **Streaming I/O**: collections are read line by line, the output header
//!   is patched in place once the counts are known
//! - **Deduplication**: clusters are identified by an order-independent
//!   fingerprint of their members
//! - **Filtering**: by cluster size and by a node base to synchronize with
//!
//! # Example
//!
//! ```rust,no_run
//! use resmerge::commands::MergeCommand;
//! use resmerge::config::SizeFilter;
//! use resmerge::files::{create_output, open_inputs};
//! use std::path::Path;
//!
//! let mut inputs = open_inputs(&["a.cnl", "b.cnl"], None).unwrap();
//! let mut output = create_output(Path::new("merged.cnl"), false).unwrap();
//!
//! let cmd = MergeCommand::new().with_filter(SizeFilter::new(2, 0).unwrap());
//! let stats = cmd.run(&mut output, &mut inputs, None).unwrap();
//! println!("{}", stats);
//! ```

pub mod cnl;
pub mod commands;
pub mod config;
pub mod estimate;
pub mod files;
pub mod fingerprint;
pub mod nodebase;
pub mod streaming;

// Re-export commonly used types
pub use cnl::{CnlError, CollectionHeader, NodeId};
pub use files::{Collection, MemoryCollection, NamedFile};
pub use fingerprint::{DedupIndex, Fingerprint};
pub use nodebase::NodeBase;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::cnl::{CnlError, NodeId, Result};
    pub use crate::commands::{ExtractBaseCommand, MergeCommand};
    pub use crate::config::{Membership, SizeFilter};
    pub use crate::files::{create_output, open_inputs, Collection, MemoryCollection, NamedFile};
    pub use crate::nodebase::{load_nodes, NodeBase};
}
