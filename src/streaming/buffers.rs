//! Buffer size constants for streaming operations.

/// Small memory page size, the growth unit of the line buffer.
pub const PAGE_SIZE: usize = 4096;

/// Initial line buffer capacity (one page).
/// Sufficient for most cluster lines, longer lines grow the buffer.
pub const DEFAULT_LINE_BUFFER: usize = PAGE_SIZE;

/// Default input buffer size (256 KB).
pub const DEFAULT_INPUT_BUFFER: usize = 256 * 1024;

/// Default output buffer size (2 MB).
pub const DEFAULT_OUTPUT_BUFFER: usize = 2 * 1024 * 1024;

/// Next capacity of a buffer that was filled without reaching a line end.
///
/// Grows by whole pages, roughly by half of the current size for large
/// buffers, never less than `required`.
#[inline]
pub const fn grown_capacity(current: usize, required: usize) -> usize {
    let mut cap = current + (current / (PAGE_SIZE * 2) + 1) * PAGE_SIZE;
    while cap < required {
        cap += (cap / (PAGE_SIZE * 2) + 1) * PAGE_SIZE;
    }
    cap
}
