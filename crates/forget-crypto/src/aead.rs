//! # Ephemeral Keys and Sealing
//!
//! Each structure destroyed during Obliteration is first encrypted under a
//! fresh key that exists only for that structure. Erasing the key is what
//! makes the ciphertext unrecoverable; the subsequent overwrite of the
//! ciphertext is belt on top of that.
//!
//! Cipher selection follows the key length:
//!
//! | Security level | Key bytes | Cipher |
//! |---|---|---|
//! | 128 | 16 | AES-128-GCM |
//! | 256 | 32 | AES-256-GCM |
//! | 512 | 64 | AES-256-GCM under `SHA-256(key)` |
//!
//! Cipher instances wipe their expanded round keys on drop.
//!
//! Nonces are 96 bits from the OS CSPRNG. Keys are never reused, so nonce
//! collision across keys is irrelevant.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};
use forget_core::{CryptoError, SecurityLevel};
use sha2::digest::generic_array::GenericArray;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::buffer::SecureBuffer;
use crate::entropy::random_array;

/// A single-use symmetric key of `security_level / 8` bytes.
pub struct EphemeralKey {
    level: SecurityLevel,
    material: SecureBuffer,
}

impl EphemeralKey {
    /// Generate a fresh key from the OS CSPRNG.
    pub fn generate(level: SecurityLevel) -> Self {
        Self {
            level,
            material: SecureBuffer::random(level.key_bytes()),
        }
    }

    /// The security level the key was generated for.
    pub fn level(&self) -> SecurityLevel {
        self.level
    }

    /// Key length in bytes.
    pub fn len(&self) -> usize {
        self.material.len()
    }

    /// Always false for a generated key; true only for a zero-length key.
    pub fn is_empty(&self) -> bool {
        self.material.is_empty()
    }

    /// The key's storage, for erasure.
    pub fn material_mut(&mut self) -> &mut SecureBuffer {
        &mut self.material
    }

    /// True once every key byte has been overwritten with zero.
    pub fn is_erased(&self) -> bool {
        self.material.is_zeroed()
    }

    fn cipher_key(&self) -> Result<CipherKey, CryptoError> {
        let bytes = self.material.as_slice();
        if self.is_erased() {
            return Err(CryptoError::KeyError("ephemeral key has been erased".into()));
        }
        match bytes.len() {
            16 => Aes128Gcm::new_from_slice(bytes)
                .map(CipherKey::Aes128)
                .map_err(|e| CryptoError::KeyError(e.to_string())),
            32 => Aes256Gcm::new_from_slice(bytes)
                .map(CipherKey::Aes256)
                .map_err(|e| CryptoError::KeyError(e.to_string())),
            64 => {
                let mut condensed = Zeroizing::new([0u8; 32]);
                Sha256::new()
                    .chain_update(bytes)
                    .finalize_into(GenericArray::from_mut_slice(&mut condensed[..]));
                Aes256Gcm::new_from_slice(condensed.as_slice())
                    .map(CipherKey::Aes256)
                    .map_err(|e| CryptoError::KeyError(e.to_string()))
            }
            n => Err(CryptoError::KeyError(format!("unsupported key length {n}"))),
        }
    }
}

impl std::fmt::Debug for EphemeralKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EphemeralKey({}, <redacted>)", self.level)
    }
}

enum CipherKey {
    Aes128(Aes128Gcm),
    Aes256(Aes256Gcm),
}

/// A sealed structure: nonce plus ciphertext with tag appended.
#[derive(Debug)]
pub struct Sealed {
    /// 96-bit nonce.
    pub nonce: [u8; 12],
    /// Ciphertext and authentication tag.
    pub ciphertext: SecureBuffer,
}

/// Encrypt `plaintext` under `key`, binding `aad`.
///
/// # Errors
///
/// [`CryptoError::KeyError`] if the key has been erased or has an
/// unsupported length, [`CryptoError::Encryption`] if the cipher fails.
pub fn seal(key: &EphemeralKey, plaintext: &[u8], aad: &[u8]) -> Result<Sealed, CryptoError> {
    let nonce: [u8; 12] = random_array();
    let payload = Payload { msg: plaintext, aad };
    let ct = match key.cipher_key()? {
        CipherKey::Aes128(c) => c.encrypt(Nonce::from_slice(&nonce), payload),
        CipherKey::Aes256(c) => c.encrypt(Nonce::from_slice(&nonce), payload),
    }
    .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    Ok(Sealed {
        nonce,
        ciphertext: SecureBuffer::from_vec(ct),
    })
}

/// Decrypt a sealed structure. Fails once the key has been erased.
pub fn open(key: &EphemeralKey, sealed: &Sealed, aad: &[u8]) -> Result<SecureBuffer, CryptoError> {
    let payload = Payload {
        msg: sealed.ciphertext.as_slice(),
        aad,
    };
    let pt = match key.cipher_key()? {
        CipherKey::Aes128(c) => c.decrypt(Nonce::from_slice(&sealed.nonce), payload),
        CipherKey::Aes256(c) => c.decrypt(Nonce::from_slice(&sealed.nonce), payload),
    }
    .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    Ok(SecureBuffer::from_vec(pt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::overwrite_multipass;

    #[test]
    fn test_key_lengths_follow_security_level() {
        assert_eq!(EphemeralKey::generate(SecurityLevel::Standard).len(), 16);
        assert_eq!(EphemeralKey::generate(SecurityLevel::High).len(), 32);
        assert_eq!(EphemeralKey::generate(SecurityLevel::Ultra).len(), 64);
    }

    #[test]
    fn test_seal_open_each_level() {
        for level in [SecurityLevel::Standard, SecurityLevel::High, SecurityLevel::Ultra] {
            let key = EphemeralKey::generate(level);
            let sealed = seal(&key, b"hello world", b"original").unwrap();
            assert_eq!(sealed.ciphertext.len(), 11 + 16);
            let pt = open(&key, &sealed, b"original").unwrap();
            assert_eq!(pt.as_slice(), b"hello world");
        }
    }

    #[test]
    fn test_ultra_key_condensed_with_sha256() {
        let key = EphemeralKey::generate(SecurityLevel::Ultra);
        let sealed = seal(&key, b"condensed", b"aad").unwrap();
        let condensed = Sha256::digest(key.material.as_slice());
        let cipher = Aes256Gcm::new_from_slice(&condensed).unwrap();
        let payload = Payload {
            msg: sealed.ciphertext.as_slice(),
            aad: b"aad",
        };
        let pt = cipher.decrypt(Nonce::from_slice(&sealed.nonce), payload).unwrap();
        assert_eq!(pt, b"condensed");
    }

    #[test]
    fn test_wrong_aad_fails() {
        let key = EphemeralKey::generate(SecurityLevel::High);
        let sealed = seal(&key, b"data", b"lowercase").unwrap();
        assert!(open(&key, &sealed, b"uppercase").is_err());
    }

    #[test]
    fn test_erased_key_cannot_open() {
        let mut key = EphemeralKey::generate(SecurityLevel::High);
        let sealed = seal(&key, b"data", b"").unwrap();
        overwrite_multipass(key.material_mut().as_mut_slice(), 3);
        assert!(key.is_erased());
        assert!(open(&key, &sealed, b"").is_err());
        assert!(seal(&key, b"more", b"").is_err());
    }

    #[test]
    fn test_fresh_nonce_per_seal() {
        let key = EphemeralKey::generate(SecurityLevel::Standard);
        let a = seal(&key, b"same", b"").unwrap();
        let b = seal(&key, b"same", b"").unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext.as_slice(), b.ciphertext.as_slice());
    }

    #[test]
    fn test_debug_redacted() {
        let key = EphemeralKey::generate(SecurityLevel::High);
        assert_eq!(format!("{key:?}"), "EphemeralKey(256-bit, <redacted>)");
    }
}
