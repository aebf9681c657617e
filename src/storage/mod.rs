// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Idvault Contributors

//! # Wallet Storage Module
//!
//! File-backed persistence for the wallet. Private key material is encrypted
//! at rest with a per-vault symmetric key; everything else (certificate
//! metadata, credential tokens, DID references, indexes) is cleartext JSON.
//!
//! ## Storage Layout
//!
//! ```text
//! <root>/
//!   .vault-key            # base64url symmetric key, access-restricted
//!   keys/
//!     {internal_id}.enc   # nonce || ciphertext of the private key JWK
//!     index.json          # internal_id -> alias, kind, flags, timestamps
//!   certificates/
//!     {internal_id}.json  # cleartext certificate metadata
//!   credentials/
//!     {file_id}.jwt       # raw credential token
//!     index.json          # credential_id -> metadata record
//!   dids/
//!     {internal_id}.json  # DID reference record
//! ```
//!
//! ## Durability
//!
//! Index files are replaced atomically (write-to-temp-then-rename); a reader
//! racing a writer sees either the old or the new index, never a torn one.
//! The layer provides no other locking; callers serialize mutating
//! operations per wallet instance.

pub mod cipher;
pub mod fs;
pub mod paths;

pub use cipher::VaultKey;
pub use fs::FileStore;
pub use paths::WalletPaths;
