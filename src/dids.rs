// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Idvault Contributors

//! DID reference store.
//!
//! Associates vault keys with DID documents: either an existing DID resolved
//! and checked against the key's public component, or a freshly registered
//! one. A key holds at most one reference at a time; re-association
//! overwrites.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{WalletError, WalletResult};
use crate::keys::KeyVault;
use crate::provider::{DidDocument, DidRegistrar, DidResolver};
use crate::storage::{FileStore, WalletPaths};

/// How a DID reference came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DidOrigin {
    /// An existing DID imported after key validation.
    Imported,
    /// A DID registered by this wallet.
    Generated,
}

/// A persisted DID-to-key association.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DidReference {
    /// Internal id of the vault key this reference belongs to.
    pub internal_id: String,
    /// The DID locator, e.g. `did:web:example.com`.
    pub did_locator: String,
    /// Lookup alias for this reference.
    pub alias: String,
    /// The resolved or registered DID document.
    pub document: DidDocument,
    /// Ordered certificate-chain URLs backing the key.
    pub certificate_chain_locators: Vec<String>,
    /// Whether the reference was imported or generated.
    pub origin: DidOrigin,
    /// Domain the DID was generated under, for generated references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Path the DID was generated under, for generated references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// When the association was created.
    pub created_at: DateTime<Utc>,
}

/// Storage of DID references keyed by vault key.
pub struct DidStore {
    files: FileStore,
}

impl DidStore {
    /// Open a DID store rooted at the given wallet directory.
    pub fn open(root: impl AsRef<Path>) -> WalletResult<Self> {
        let files = FileStore::open(WalletPaths::new(root))?;
        Ok(Self { files })
    }

    /// Import an existing DID reference for a vault key.
    ///
    /// The key must already exist in the vault. The DID document is resolved
    /// through `resolver` and must publish the key's public component
    /// (`KeyMismatch` otherwise).
    pub fn import_reference(
        &self,
        vault: &KeyVault,
        resolver: &dyn DidResolver,
        did_locator: &str,
        key_id_or_alias: &str,
        certificate_chain_locators: &[String],
        alias: Option<&str>,
    ) -> WalletResult<DidReference> {
        let key = vault.lookup(key_id_or_alias)?;
        let document = resolver.resolve(did_locator)?;

        if !document.contains_key(&key.public_jwk) {
            return Err(WalletError::KeyMismatch(format!(
                "document {did_locator} does not publish the public key of {}",
                key.internal_id
            )));
        }

        let reference = DidReference {
            internal_id: key.internal_id,
            did_locator: did_locator.to_string(),
            alias: alias
                .map(str::to_string)
                .unwrap_or_else(|| format!("imported-did-{}", Utc::now().timestamp_millis())),
            document,
            certificate_chain_locators: certificate_chain_locators.to_vec(),
            origin: DidOrigin::Imported,
            domain: None,
            path: None,
            created_at: Utc::now(),
        };
        self.persist(&reference)?;
        Ok(reference)
    }

    /// Register a new DID for a vault key and persist the association.
    pub fn generate_reference(
        &self,
        vault: &KeyVault,
        registrar: &dyn DidRegistrar,
        domain: &str,
        path: &str,
        key_id_or_alias: &str,
        certificate_chain_locators: &[String],
        alias: Option<&str>,
    ) -> WalletResult<DidReference> {
        let key = vault.lookup(key_id_or_alias)?;
        let registered = registrar.register(domain, path, &[key.public_jwk.clone()])?;

        let reference = DidReference {
            internal_id: key.internal_id,
            did_locator: registered.locator,
            alias: alias
                .map(str::to_string)
                .unwrap_or_else(|| format!("generated-did-{}", Utc::now().timestamp_millis())),
            document: registered.document,
            certificate_chain_locators: certificate_chain_locators.to_vec(),
            origin: DidOrigin::Generated,
            domain: Some(domain.to_string()),
            path: Some(path.to_string()),
            created_at: Utc::now(),
        };
        self.persist(&reference)?;
        Ok(reference)
    }

    /// List all stored DID references. Unreadable record files are skipped
    /// with a warning rather than failing the whole listing.
    pub fn list(&self) -> WalletResult<Vec<DidReference>> {
        let dir = self.files.paths().dids_dir();
        let mut references = Vec::new();
        for stem in self.files.list_files(&dir, "json")? {
            let path = self.files.paths().did_reference(&stem);
            match self.files.read_json::<DidReference>(&path) {
                Ok(reference) => references.push(reference),
                Err(err) => {
                    tracing::warn!(file = %path.display(), error = %err, "skipping unreadable DID reference");
                }
            }
        }
        Ok(references)
    }

    /// Load the DID reference for a key, by internal id or reference alias.
    pub fn load_by_key(&self, id_or_alias: &str) -> WalletResult<DidReference> {
        // Direct hit on the internal id avoids scanning.
        let direct = self.files.paths().did_reference(id_or_alias);
        if self.files.exists(&direct) {
            return self.files.read_json(direct);
        }

        self.list()?
            .into_iter()
            .find(|reference| reference.alias == id_or_alias)
            .ok_or_else(|| WalletError::NotFound(format!("DID reference {id_or_alias}")))
    }

    fn persist(&self, reference: &DidReference) -> WalletResult<()> {
        self.files.write_json(
            self.files.paths().did_reference(&reference.internal_id),
            reference,
        )?;
        tracing::debug!(
            did = %reference.did_locator,
            key_id = %reference.internal_id,
            origin = ?reference.origin,
            "persisted DID reference"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{
        KeyMaterial, PublicJwk, RegisteredDid, Secp256k1Key, VerificationMethod,
    };
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn make_document(did: &str, jwk: PublicJwk) -> DidDocument {
        DidDocument {
            context: vec!["https://www.w3.org/ns/did/v1".to_string()],
            id: did.to_string(),
            verification_method: vec![VerificationMethod {
                id: format!("{did}#key-1"),
                method_type: "JsonWebKey2020".to_string(),
                controller: did.to_string(),
                public_key_jwk: jwk,
                certificate_chain_url: None,
            }],
            assertion_method: vec![format!("{did}#key-1")],
        }
    }

    struct StaticResolver {
        documents: HashMap<String, DidDocument>,
    }

    impl DidResolver for StaticResolver {
        fn resolve(&self, locator: &str) -> WalletResult<DidDocument> {
            self.documents
                .get(locator)
                .cloned()
                .ok_or_else(|| WalletError::Provider(format!("cannot resolve {locator}")))
        }

        fn resolve_to_key(&self, locator: &str) -> WalletResult<Box<dyn KeyMaterial>> {
            let document = self.resolve(locator)?;
            let jwk = &document.verification_method[0].public_key_jwk;
            Ok(Box::new(Secp256k1Key::from_public_jwk(jwk)?))
        }
    }

    struct WebRegistrar;

    impl DidRegistrar for WebRegistrar {
        fn register(
            &self,
            domain: &str,
            path: &str,
            public_keys: &[PublicJwk],
        ) -> WalletResult<RegisteredDid> {
            let locator = if path.is_empty() {
                format!("did:web:{domain}")
            } else {
                format!("did:web:{domain}:{}", path.replace('/', ":"))
            };
            Ok(RegisteredDid {
                document: make_document(&locator, public_keys[0].clone()),
                locator,
            })
        }
    }

    fn fixture() -> (tempfile::TempDir, KeyVault, DidStore, Secp256k1Key) {
        let dir = tempdir().unwrap();
        let vault = KeyVault::open(dir.path()).unwrap();
        let store = DidStore::open(dir.path()).unwrap();
        let key = Secp256k1Key::generate();
        vault.store(&key, None, Some("org-key")).unwrap();
        (dir, vault, store, key)
    }

    #[test]
    fn import_requires_an_existing_key() {
        let (_dir, vault, store, _key) = fixture();
        let resolver = StaticResolver {
            documents: HashMap::new(),
        };

        let result = store.import_reference(
            &vault,
            &resolver,
            "did:web:example.com",
            "no-such-key",
            &[],
            None,
        );
        assert!(matches!(result, Err(WalletError::NotFound(_))));
    }

    #[test]
    fn import_rejects_documents_without_the_key() {
        let (_dir, vault, store, _key) = fixture();
        let stranger = Secp256k1Key::generate();
        let mut documents = HashMap::new();
        documents.insert(
            "did:web:example.com".to_string(),
            make_document("did:web:example.com", stranger.export_public()),
        );
        let resolver = StaticResolver { documents };

        let result = store.import_reference(
            &vault,
            &resolver,
            "did:web:example.com",
            "org-key",
            &[],
            None,
        );
        assert!(matches!(result, Err(WalletError::KeyMismatch(_))));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn import_persists_matching_reference() {
        let (_dir, vault, store, key) = fixture();
        let mut documents = HashMap::new();
        documents.insert(
            "did:web:example.com".to_string(),
            make_document("did:web:example.com", key.export_public()),
        );
        let resolver = StaticResolver { documents };

        let chain = vec!["https://example.com/chain.pem".to_string()];
        let reference = store
            .import_reference(
                &vault,
                &resolver,
                "did:web:example.com",
                "org-key",
                &chain,
                Some("company-did"),
            )
            .unwrap();

        assert_eq!(reference.internal_id, key.stable_id());
        assert_eq!(reference.origin, DidOrigin::Imported);
        assert_eq!(reference.certificate_chain_locators, chain);

        let loaded = store.load_by_key(&key.stable_id()).unwrap();
        assert_eq!(loaded.did_locator, "did:web:example.com");
        let by_alias = store.load_by_key("company-did").unwrap();
        assert_eq!(by_alias.did_locator, "did:web:example.com");
    }

    #[test]
    fn generate_persists_with_domain_and_path() {
        let (_dir, vault, store, key) = fixture();

        let reference = store
            .generate_reference(
                &vault,
                &WebRegistrar,
                "example.com",
                "org/wallet",
                "org-key",
                &[],
                None,
            )
            .unwrap();

        assert_eq!(reference.did_locator, "did:web:example.com:org:wallet");
        assert_eq!(reference.origin, DidOrigin::Generated);
        assert_eq!(reference.domain.as_deref(), Some("example.com"));
        assert_eq!(reference.path.as_deref(), Some("org/wallet"));
        assert!(reference.alias.starts_with("generated-did-"));
        assert!(reference.document.contains_key(&key.export_public()));
    }

    #[test]
    fn reassociation_overwrites_the_previous_reference() {
        let (_dir, vault, store, key) = fixture();
        let mut documents = HashMap::new();
        documents.insert(
            "did:web:old.example".to_string(),
            make_document("did:web:old.example", key.export_public()),
        );
        let resolver = StaticResolver { documents };

        store
            .import_reference(&vault, &resolver, "did:web:old.example", "org-key", &[], None)
            .unwrap();
        store
            .generate_reference(&vault, &WebRegistrar, "new.example", "", "org-key", &[], None)
            .unwrap();

        let references = store.list().unwrap();
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].did_locator, "did:web:new.example");
    }

    #[test]
    fn list_skips_unreadable_files() {
        let (_dir, vault, store, _key) = fixture();
        store
            .generate_reference(&vault, &WebRegistrar, "example.com", "", "org-key", &[], None)
            .unwrap();

        std::fs::write(store.files.paths().did_reference("corrupt"), b"not json").unwrap();

        let references = store.list().unwrap();
        assert_eq!(references.len(), 1);
    }

    #[test]
    fn key_delete_does_not_cascade_into_references() {
        let (_dir, vault, store, key) = fixture();
        store
            .generate_reference(&vault, &WebRegistrar, "example.com", "", "org-key", &[], None)
            .unwrap();

        assert!(vault.delete("org-key").unwrap());

        // the reference survives and must be deleted separately
        let reference = store.load_by_key(&key.stable_id()).unwrap();
        assert_eq!(reference.did_locator, "did:web:example.com");
    }
}
