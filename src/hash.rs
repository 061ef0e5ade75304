//! 128-bit keyed hash used as the identity of a translated `@cImport` block.
//!
//! Keyed so that two stores (e.g. in tests) never collide on the same
//! generated C source by accident; the key is fixed per process, matching
//! the spec's "C-import identity" role rather than a cryptographic one.

use std::fmt;

const CIMPORT_HASH_KEY: [u8; 32] = *b"zigls-document-store-cimport-k10";

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; 16]);

impl Hash {
    /// Hashes `c_source`, the text generated for an `@cImport` node.
    pub fn of_c_source(c_source: &[u8]) -> Self {
        let digest = blake3::keyed_hash(&CIMPORT_HASH_KEY, c_source);
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest.as_bytes()[..16]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_same_hash() {
        assert_eq!(Hash::of_c_source(b"int x;"), Hash::of_c_source(b"int x;"));
    }

    #[test]
    fn different_input_different_hash() {
        assert_ne!(Hash::of_c_source(b"int x;"), Hash::of_c_source(b"int y;"));
    }
}
