//! Zero-allocation CNL line parsing utilities.
//!
//! Tokens are borrowed slices of the line buffer, nothing is copied or
//! modified in place.

use crate::cnl::NodeId;
use memchr::memchr3;

/// Delimiters of the cluster member tokens.
pub const WHITESPACE: &[u8] = b" \t\r\n";

/// Iterator over delimiter-separated tokens of a line.
///
/// Empty tokens (repeated delimiters) are skipped.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    rest: &'a [u8],
    delims: &'a [u8],
    /// The delimiters are [`WHITESPACE`], token ends are found with memchr
    whitespace: bool,
}

impl<'a> Tokens<'a> {
    /// Tokenize by whitespace.
    pub fn new(line: &'a [u8]) -> Self {
        Self {
            rest: line,
            delims: WHITESPACE,
            whitespace: true,
        }
    }

    #[inline]
    fn token_end(&self) -> usize {
        if self.whitespace {
            memchr3(b' ', b'\t', b'\n', self.rest).unwrap_or(self.rest.len())
        } else {
            self.rest
                .iter()
                .position(|b| self.delims.contains(b))
                .unwrap_or(self.rest.len())
        }
    }
}

/// Tokenize by a custom delimiter set.
pub fn tokens_by<'a>(line: &'a [u8], delims: &'a [u8]) -> Tokens<'a> {
    Tokens {
        rest: line,
        delims,
        whitespace: false,
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        loop {
            let skip = self
                .rest
                .iter()
                .position(|b| !self.delims.contains(b))
                .unwrap_or(self.rest.len());
            self.rest = &self.rest[skip..];
            if self.rest.is_empty() {
                return None;
            }

            let end = self.token_end();
            let mut tok = &self.rest[..end];
            self.rest = &self.rest[end..];
            // CRLF endings, memchr3 does not look for '\r'
            while let [head @ .., b'\r'] = tok {
                tok = head;
            }
            if !tok.is_empty() {
                return Some(tok);
            }
        }
    }
}

/// Fast u64 parsing - no allocation, no error formatting.
///
/// Returns None if the input is empty or contains non-digit characters.
#[inline(always)]
pub fn parse_u64_fast(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }
    let mut n: u64 = 0;
    for &b in bytes {
        let d = b.wrapping_sub(b'0');
        if d > 9 {
            return None;
        }
        n = n.checked_mul(10)?.checked_add(d as u64)?;
    }
    Some(n)
}

/// Parse the node id of a member token.
///
/// The leading decimal digits form the id, a non-numeric share suffix
/// (e.g. `12:0.5`) is ignored. Returns None when the token does not start
/// with a digit or the id overflows [`NodeId`].
#[inline]
pub fn parse_node_id(tok: &[u8]) -> Option<NodeId> {
    let digits = tok
        .iter()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(tok.len());
    let id = parse_u64_fast(&tok[..digits])?;
    NodeId::try_from(id).ok()
}

/// Whether the first non-blank character of the line is `#`.
#[inline]
pub fn is_comment(line: &[u8]) -> bool {
    line.iter()
        .find(|b| !WHITESPACE.contains(b))
        .is_some_and(|&b| b == b'#')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u64_fast() {
        assert_eq!(parse_u64_fast(b"12345"), Some(12345));
        assert_eq!(parse_u64_fast(b"0"), Some(0));
        assert_eq!(parse_u64_fast(b""), None);
        assert_eq!(parse_u64_fast(b"abc"), None);
        assert_eq!(parse_u64_fast(b"123abc"), None);
        assert_eq!(parse_u64_fast(b"18446744073709551615"), Some(u64::MAX));
        assert_eq!(parse_u64_fast(b"18446744073709551616"), None);
    }

    #[test]
    fn test_parse_node_id() {
        assert_eq!(parse_node_id(b"42"), Some(42));
        assert_eq!(parse_node_id(b"0"), Some(0));
        assert_eq!(parse_node_id(b"7:0.25"), Some(7));
        assert_eq!(parse_node_id(b"4294967295"), Some(NodeId::MAX));
        assert_eq!(parse_node_id(b"4294967296"), None);
        assert_eq!(parse_node_id(b"x1"), None);
        assert_eq!(parse_node_id(b"-3"), None);
    }

    #[test]
    fn test_tokens_whitespace() {
        let toks: Vec<&[u8]> = Tokens::new(b"  1\t2   3 \n").collect();
        assert_eq!(toks, vec![&b"1"[..], &b"2"[..], &b"3"[..]]);

        let toks: Vec<&[u8]> = Tokens::new(b"1 2\r\n").collect();
        assert_eq!(toks, vec![&b"1"[..], &b"2"[..]]);

        assert_eq!(Tokens::new(b" \r\n").next(), None);
        assert_eq!(Tokens::new(b"").next(), None);
    }

    #[test]
    fn test_tokens_by_whitespace_delims() {
        let toks: Vec<&[u8]> = tokens_by(b" 1\t2\r\n", WHITESPACE).collect();
        assert_eq!(toks, vec![&b"1"[..], &b"2"[..]]);
    }

    #[test]
    fn test_tokens_custom_delims() {
        let toks: Vec<&[u8]> = tokens_by(b"Clusters: 2, Nodes: 4\n", b" :,\n").collect();
        assert_eq!(
            toks,
            vec![&b"Clusters"[..], &b"2"[..], &b"Nodes"[..], &b"4"[..]]
        );
    }

    #[test]
    fn test_is_comment() {
        assert!(is_comment(b"#comment"));
        assert!(is_comment(b"  # indented comment\n"));
        assert!(!is_comment(b"\n"));
        assert!(!is_comment(b"1 2 3 # trailing\n"));
    }
}
