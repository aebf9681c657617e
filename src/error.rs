// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Idvault Contributors

//! Crate-wide error taxonomy.
//!
//! Every fallible wallet operation returns [`WalletResult`]. Expected
//! conditions (lookup misses, validation failures, uniqueness violations) are
//! explicit variants; only genuinely unexpected states (unreadable index
//! files, I/O failures) surface through the `Io`/`Serde` wrappers.

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// Lookup miss. Not fatal; the caller decides what to do.
    #[error("not found: {0}")]
    NotFound(String),

    /// Re-storing a key id with different key material.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// An alias is already taken by another record.
    #[error("alias conflict: {0}")]
    AliasConflict(String),

    /// Ciphertext failed authenticated decryption (tampered record or a
    /// missing/rotated vault key). Fatal to that record only.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Token does not have the three-segment structure or a decodable
    /// payload.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The kind asserted inside a credential token does not match the kind
    /// the caller expected.
    #[error("credential kind mismatch: expected {expected}, token asserts {found:?}")]
    KindMismatch { expected: String, found: Vec<String> },

    /// A required claim is absent from a token payload.
    #[error("missing required claim: {0}")]
    MissingClaim(&'static str),

    /// Token signature did not verify against the issuer's resolved key.
    #[error("invalid signature")]
    InvalidSignature,

    /// Token expiration time is not in the future.
    #[error("token expired")]
    Expired,

    /// Compliance block carries an unexpected trust-framework tag.
    #[error("invalid compliance tag: {0}")]
    InvalidComplianceTag(String),

    /// A presentation policy cannot be satisfied from the stored
    /// credentials. Reported before any signing occurs.
    #[error("incomplete credential set, missing kinds: {missing:?}")]
    IncompleteCredentialSet { missing: Vec<String> },

    /// The referenced DID document does not publish the vault key's public
    /// component.
    #[error("key mismatch: {0}")]
    KeyMismatch(String),

    /// External collaborator (resolver, registrar, signer) failure.
    #[error("provider error: {0}")]
    Provider(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type WalletResult<T> = Result<T, WalletError>;
