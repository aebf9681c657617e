// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Idvault Contributors

//! idvault - Encrypted identity wallet storage and presentation envelopes
//!
//! A single-process, file-backed wallet: private keys encrypted at rest,
//! certificate metadata, typed verifiable-credential storage and DID
//! references, plus an envelope engine that wraps stored credentials into
//! signed tokens and composes them into a holder presentation.
//!
//! ## Modules
//!
//! - `keys` - Encrypted key vault (store/load/list/delete/rename)
//! - `credentials` - Type-validated credential storage and policy sets
//! - `dids` - DID references bound to vault keys
//! - `envelope` - Envelope/presentation composition and verification
//! - `provider` - Collaborator traits (key material, DID resolver/registrar)
//! - `storage` - Paths, atomic file I/O, at-rest cipher
//!
//! ## Concurrency
//!
//! The design is synchronous and single-process. Filesystem and collaborator
//! calls block the calling thread. Index files are replaced atomically, so
//! concurrent readers see either the old or the new index; beyond that there
//! is no internal locking. Callers must serialize mutating operations
//! (`store`, `delete`, `rename`, `import`) per wallet instance, e.g. with a
//! single writer or an external mutex. There is no internal retry, timeout
//! or cancellation; transient I/O failures surface as errors.

pub mod claims;
pub mod config;
pub mod credentials;
pub mod dids;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod provider;
pub mod storage;
pub mod token;

pub use claims::{ClaimMap, ClaimValue};
pub use credentials::{
    CredentialKind, CredentialRecord, CredentialStore, PresentationPolicy, RequiredCredential,
    RequiredSet,
};
pub use dids::{DidOrigin, DidReference, DidStore};
pub use error::{WalletError, WalletResult};
pub use keys::{KeyRecord, KeyVault};
pub use provider::{
    DidDocument, DidRegistrar, DidResolver, KeyMaterial, PublicJwk, RegisteredDid,
    Secp256k1Key, VerificationMethod,
};
