//! HMAC-SHA256 signing for the audit hash chain (C3).
//!
//! Each audit entry's signature is `HMAC(signing_key, canonical_json(entry
//! without its own signature field))`; `previous_hash` is simply the
//! predecessor's signature. `ChainSigner` wraps the signing key so the audit
//! crate never has to touch raw key bytes directly.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Errors raised while signing or verifying with a [`ChainSigner`].
#[derive(Debug, Error)]
pub enum SignerError {
    /// The configured key was not a valid HMAC key (never happens for
    /// `Hmac<Sha256>`, which accepts any length, but kept for forward
    /// compatibility with key-constrained MAC constructions).
    #[error("invalid signing key")]
    InvalidKey,
}

/// HMAC-SHA256 signer/verifier bound to a single 32-byte signing key.
#[derive(Clone)]
pub struct ChainSigner {
    key: [u8; 32],
}

impl ChainSigner {
    /// Build a signer from exactly 32 key bytes, as read from
    /// `AUDIT_SIGNING_KEY` (base64-decoded).
    #[must_use]
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Sign `message`, returning the raw 32-byte HMAC tag.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> [u8; 32] {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("Hmac<Sha256> accepts any key length");
        mac.update(message);
        let result = mac.finalize().into_bytes();
        let mut out = [0u8; 32];
        out.copy_from_slice(&result);
        out
    }

    /// Sign and return the lowercase hex encoding, the form entries store.
    #[must_use]
    pub fn sign_hex(&self, message: &[u8]) -> String {
        hex::encode(self.sign(message))
    }

    /// Verify `signature` against `message` in constant time.
    #[must_use]
    pub fn verify(&self, message: &[u8], signature: &[u8; 32]) -> bool {
        let expected = self.sign(message);
        expected.ct_eq(signature).into()
    }
}

impl std::fmt::Debug for ChainSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainSigner").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> ChainSigner {
        ChainSigner::new([7u8; 32])
    }

    #[test]
    fn sign_is_deterministic() {
        let signer = signer();
        assert_eq!(signer.sign(b"entry"), signer.sign(b"entry"));
    }

    #[test]
    fn verify_accepts_matching_signature() {
        let signer = signer();
        let sig = signer.sign(b"entry");
        assert!(signer.verify(b"entry", &sig));
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let signer = signer();
        let sig = signer.sign(b"entry");
        assert!(!signer.verify(b"tampered", &sig));
    }

    #[test]
    fn different_keys_produce_different_signatures() {
        let a = ChainSigner::new([1u8; 32]);
        let b = ChainSigner::new([2u8; 32]);
        assert_ne!(a.sign(b"entry"), b.sign(b"entry"));
    }
}
