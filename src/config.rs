//! Validated run parameters shared by the merge and extraction commands.

use crate::cnl::{CnlError, Result};
use std::fmt;

/// Average membership of a node across clusters, `> 0`, typically ~1.
///
/// Only used as a heuristic input of the size estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Membership(f32);

impl Membership {
    pub fn new(value: f32) -> Result<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(CnlError::Config(format!(
                "membership should be a positive finite number: {}",
                value
            )));
        }
        Ok(Self(value))
    }

    #[inline]
    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for Membership {
    fn default() -> Self {
        Self(1.0)
    }
}

impl fmt::Display for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cluster size (member count) filter, `max_size == 0` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeFilter {
    pub min_size: usize,
    pub max_size: usize,
}

impl SizeFilter {
    pub fn new(min_size: usize, max_size: usize) -> Result<Self> {
        if max_size != 0 && min_size > max_size {
            return Err(CnlError::Config(format!(
                "min cluster size ({}) exceeds max cluster size ({})",
                min_size, max_size
            )));
        }
        Ok(Self { min_size, max_size })
    }

    /// Whether a cluster of `size` members passes the filter.
    #[inline]
    pub fn accepts(&self, size: usize) -> bool {
        size >= self.min_size && (self.max_size == 0 || size <= self.max_size)
    }
}
