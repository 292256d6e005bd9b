//! # Secure Buffers
//!
//! `SecureBuffer` is the container for every sensitive byte string in the
//! protocol: plaintext structures, ephemeral keys, ciphertexts awaiting
//! overwrite. It is fixed-size after construction, cannot be cloned, and is
//! zeroized (including spare capacity) on drop.
//!
//! ## Overwrite Discipline
//!
//! [`overwrite_multipass`] writes the configured number of fixed patterns
//! (cycling through [`DELETION_PATTERNS`]), then one pass of CSPRNG bytes,
//! then zero. A compiler fence and `black_box` after every pass keep the
//! intermediate writes from being elided as dead stores.

use std::sync::atomic::{compiler_fence, Ordering};

use forget_core::{ContentDigest, Sha256Accumulator};
use rand::RngCore;
use rand_core::OsRng;
use zeroize::Zeroize;

/// Repeating units of the seven fixed overwrite patterns, applied in order.
pub const DELETION_PATTERNS: [&[u8]; 7] = [
    &[0x00],
    &[0xFF],
    &[0x92, 0x49, 0x24],
    &[0x49, 0x92, 0x24],
    &[0x24, 0x49, 0x92],
    &[0x00, 0x00, 0x00],
    &[0xFF, 0xFF, 0xFF],
];

/// Fixed-size, non-cloneable, zeroize-on-drop byte buffer.
pub struct SecureBuffer {
    bytes: Vec<u8>,
}

impl SecureBuffer {
    /// Take ownership of an existing allocation without copying it.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Copy a slice into a fresh buffer.
    pub fn copy_from(data: &[u8]) -> Self {
        Self {
            bytes: data.to_vec(),
        }
    }

    /// A buffer of `len` CSPRNG bytes.
    pub fn random(len: usize) -> Self {
        let mut bytes = vec![0u8; len];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Read access.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Write access. Length cannot change.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// SHA-256 of the current contents.
    pub fn digest(&self) -> ContentDigest {
        let mut acc = Sha256Accumulator::new();
        acc.update(&self.bytes);
        acc.finalize()
    }

    /// True if every byte is zero.
    pub fn is_zeroed(&self) -> bool {
        self.bytes.iter().all(|b| *b == 0)
    }
}

impl Drop for SecureBuffer {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SecureBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureBuffer(<redacted, {} bytes>)", self.bytes.len())
    }
}

/// Overwrite `buf` with `passes` fixed patterns, one random pass, then zero.
///
/// Returns the total number of passes written, including the random and
/// zero passes.
pub fn overwrite_multipass(buf: &mut [u8], passes: u32) -> u32 {
    for pass in 0..passes {
        let pattern = DELETION_PATTERNS[pass as usize % DELETION_PATTERNS.len()];
        for (dst, src) in buf.iter_mut().zip(pattern.iter().cycle()) {
            *dst = *src;
        }
        settle(buf);
    }
    OsRng.fill_bytes(buf);
    settle(buf);
    buf.zeroize();
    settle(buf);
    passes + 2
}

fn settle(buf: &mut [u8]) {
    compiler_fence(Ordering::SeqCst);
    std::hint::black_box(&mut *buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_leaves_zeros() {
        let mut buf = b"hello world, this is sensitive".to_vec();
        let written = overwrite_multipass(&mut buf, 7);
        assert_eq!(written, 9);
        assert!(buf.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_overwrite_empty_buffer() {
        let mut buf: Vec<u8> = Vec::new();
        assert_eq!(overwrite_multipass(&mut buf, 3), 5);
    }

    #[test]
    fn test_patterns_cycle_when_passes_exceed_seven() {
        let mut buf = vec![1u8; 10];
        overwrite_multipass(&mut buf, 35);
        assert!(buf.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_three_byte_patterns_present() {
        assert_eq!(DELETION_PATTERNS.len(), 7);
        assert_eq!(DELETION_PATTERNS[2], &[0x92, 0x49, 0x24]);
        assert_eq!(DELETION_PATTERNS[6], &[0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_from_vec_keeps_allocation() {
        let v = vec![5u8; 16];
        let ptr = v.as_ptr();
        let buf = SecureBuffer::from_vec(v);
        assert_eq!(buf.as_slice().as_ptr(), ptr);
        assert_eq!(buf.len(), 16);
    }

    #[test]
    fn test_is_zeroed_and_digest() {
        let mut buf = SecureBuffer::copy_from(b"abc");
        assert!(!buf.is_zeroed());
        let before = buf.digest();
        overwrite_multipass(buf.as_mut_slice(), 3);
        assert!(buf.is_zeroed());
        assert_ne!(buf.digest(), before);
    }

    #[test]
    fn test_random_buffer_not_zero() {
        let buf = SecureBuffer::random(32);
        assert_eq!(buf.len(), 32);
        assert!(!buf.is_zeroed());
    }

    #[test]
    fn test_debug_redacted() {
        let buf = SecureBuffer::copy_from(b"topsecret");
        assert!(!format!("{buf:?}").contains("topsecret"));
    }
}
