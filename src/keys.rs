// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Idvault Contributors

//! Encrypted key vault.
//!
//! Stores private key material encrypted at rest, certificate metadata in
//! cleartext, and an alias index. Records are addressed by an internal id
//! derived from the key material itself, or by a human-assigned alias.
//!
//! Deleting a key does not cascade into the DID reference or credential
//! stores; those records have independent lifecycles and must be deleted
//! explicitly.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::claims::ClaimMap;
use crate::config;
use crate::error::{WalletError, WalletResult};
use crate::provider::{KeyMaterial, PublicJwk};
use crate::storage::{FileStore, VaultKey, WalletPaths};

/// Index entry for a stored key.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct KeyIndexEntry {
    alias: String,
    kind: String,
    public_jwk: PublicJwk,
    imported_at: DateTime<Utc>,
    has_private_material: bool,
    certificate_available: bool,
}

/// Summary of a stored key, as returned by [`KeyVault::list`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Internal id, derived deterministically from the key material.
    pub internal_id: String,
    /// Human-assigned alias, unique across the vault.
    pub alias: String,
    /// Key kind label, e.g. `ec-secp256k1`.
    pub kind: String,
    /// Canonical public component.
    pub public_jwk: PublicJwk,
    /// When the key was imported.
    pub imported_at: DateTime<Utc>,
    /// Whether the record holds encrypted private material.
    pub has_private_material: bool,
    /// Whether certificate metadata was stored alongside the key.
    pub certificate_available: bool,
}

type KeyIndex = BTreeMap<String, KeyIndexEntry>;

/// Encrypted at-rest storage for asymmetric key material.
///
/// The vault encryption key is instance state: loaded from the wallet root
/// at construction, generated and persisted on first use. The vault
/// exclusively owns the encrypted bytes; records exist until explicitly
/// deleted.
pub struct KeyVault {
    files: FileStore,
    vault_key: VaultKey,
}

impl KeyVault {
    /// Open a vault rooted at the given directory, creating the layout and
    /// the vault encryption key on first use.
    pub fn open(root: impl AsRef<Path>) -> WalletResult<Self> {
        let files = FileStore::open(WalletPaths::new(root))?;
        let vault_key = load_or_generate_vault_key(&files)?;
        Ok(Self { files, vault_key })
    }

    /// Open a vault at the configured default location (`WALLET_DIR` or
    /// `./wallet-storage`).
    pub fn open_default() -> WalletResult<Self> {
        Self::open(config::wallet_dir())
    }

    /// The storage paths backing this vault.
    pub fn paths(&self) -> &WalletPaths {
        self.files.paths()
    }

    /// Store private key material with optional certificate metadata.
    ///
    /// The internal id is the key's stable id. Re-storing identical material
    /// is idempotent; re-storing different material under the same id fails
    /// with `DuplicateKey`. An alias owned by another record fails with
    /// `AliasConflict`.
    pub fn store(
        &self,
        key: &dyn KeyMaterial,
        certificate_metadata: Option<&ClaimMap>,
        alias: Option<&str>,
    ) -> WalletResult<String> {
        let internal_id = key.stable_id();
        let public_jwk = key.export_public();
        let kind = kind_label(&public_jwk);
        let mut index = self.load_index()?;

        if let Some(alias) = alias {
            if let Some(owner) = owner_of_alias(&index, alias) {
                if owner != internal_id {
                    return Err(WalletError::AliasConflict(alias.to_string()));
                }
            }
        }

        let exported = key.export_private()?;
        let record_path = self.files.paths().key_record(&internal_id);

        if self.files.exists(&record_path) {
            let existing = self.vault_key.open(&self.files.read_raw(&record_path)?)?;
            if existing != exported.as_bytes() {
                return Err(WalletError::DuplicateKey(internal_id));
            }
        } else {
            let sealed = self.vault_key.seal(exported.as_bytes())?;
            self.files.write_raw(&record_path, &sealed)?;
        }

        if let Some(metadata) = certificate_metadata {
            self.files
                .write_json(self.files.paths().certificate(&internal_id), metadata)?;
        }

        let certificate_available = certificate_metadata.is_some()
            || self
                .files
                .exists(self.files.paths().certificate(&internal_id));

        match index.get_mut(&internal_id) {
            Some(entry) => {
                if let Some(alias) = alias {
                    entry.alias = alias.to_string();
                }
                entry.certificate_available = certificate_available;
            }
            None => {
                let alias = alias
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{kind}-{}", Utc::now().timestamp_millis()));
                index.insert(
                    internal_id.clone(),
                    KeyIndexEntry {
                        alias,
                        kind,
                        public_jwk,
                        imported_at: Utc::now(),
                        has_private_material: true,
                        certificate_available,
                    },
                );
            }
        }

        self.save_index(&index)?;
        tracing::debug!(key_id = %internal_id, "stored key record");
        Ok(internal_id)
    }

    /// Load the decrypted private key representation (JWK JSON).
    pub fn load(&self, id_or_alias: &str) -> WalletResult<String> {
        let index = self.load_index()?;
        let internal_id = resolve(&index, id_or_alias)
            .ok_or_else(|| WalletError::NotFound(format!("key {id_or_alias}")))?;

        let record_path = self.files.paths().key_record(&internal_id);
        if !self.files.exists(&record_path) {
            return Err(WalletError::NotFound(format!("key record {internal_id}")));
        }

        let plaintext = self.vault_key.open(&self.files.read_raw(&record_path)?)?;
        String::from_utf8(plaintext).map_err(|_| {
            WalletError::DecryptionFailed("decrypted record is not UTF-8".to_string())
        })
    }

    /// Load the certificate metadata stored alongside a key.
    pub fn load_certificate_metadata(&self, id_or_alias: &str) -> WalletResult<ClaimMap> {
        let index = self.load_index()?;
        let internal_id = resolve(&index, id_or_alias)
            .ok_or_else(|| WalletError::NotFound(format!("key {id_or_alias}")))?;

        let path = self.files.paths().certificate(&internal_id);
        if !self.files.exists(&path) {
            return Err(WalletError::NotFound(format!(
                "certificate metadata for key {internal_id}"
            )));
        }
        self.files.read_json(path)
    }

    /// Look up a key's summary record by id or alias.
    pub fn lookup(&self, id_or_alias: &str) -> WalletResult<KeyRecord> {
        let index = self.load_index()?;
        let internal_id = resolve(&index, id_or_alias)
            .ok_or_else(|| WalletError::NotFound(format!("key {id_or_alias}")))?;
        let entry = &index[&internal_id];
        Ok(to_record(&internal_id, entry))
    }

    /// List all stored keys in index iteration order.
    pub fn list(&self) -> WalletResult<Vec<KeyRecord>> {
        let index = self.load_index()?;
        Ok(index
            .iter()
            .map(|(id, entry)| to_record(id, entry))
            .collect())
    }

    /// Delete a key record: shred the ciphertext, remove the certificate
    /// companion and the index entry. Returns `false` if the record did not
    /// exist. DID references and credentials that mention this key are left
    /// in place.
    pub fn delete(&self, id_or_alias: &str) -> WalletResult<bool> {
        let mut index = self.load_index()?;
        let Some(internal_id) = resolve(&index, id_or_alias) else {
            return Ok(false);
        };

        self.files
            .shred(self.files.paths().key_record(&internal_id))?;
        self.files
            .delete(self.files.paths().certificate(&internal_id))?;

        index.remove(&internal_id);
        self.save_index(&index)?;
        tracing::debug!(key_id = %internal_id, "deleted key record");
        Ok(true)
    }

    /// Change a key's alias. Index-only update; fails with `AliasConflict`
    /// if the alias belongs to another record, leaving the index unchanged.
    pub fn rename(&self, id_or_alias: &str, new_alias: &str) -> WalletResult<()> {
        let mut index = self.load_index()?;
        let internal_id = resolve(&index, id_or_alias)
            .ok_or_else(|| WalletError::NotFound(format!("key {id_or_alias}")))?;

        if let Some(owner) = owner_of_alias(&index, new_alias) {
            if owner != internal_id {
                return Err(WalletError::AliasConflict(new_alias.to_string()));
            }
        }

        if let Some(entry) = index.get_mut(&internal_id) {
            entry.alias = new_alias.to_string();
        }
        self.save_index(&index)
    }

    fn load_index(&self) -> WalletResult<KeyIndex> {
        let path = self.files.paths().key_index();
        if !self.files.exists(&path) {
            return Ok(KeyIndex::new());
        }
        self.files.read_json(path)
    }

    fn save_index(&self, index: &KeyIndex) -> WalletResult<()> {
        self.files.write_json(self.files.paths().key_index(), index)
    }
}

fn load_or_generate_vault_key(files: &FileStore) -> WalletResult<VaultKey> {
    let path = files.paths().vault_key_file();
    if files.exists(&path) {
        let encoded = String::from_utf8(files.read_raw(&path)?)
            .map_err(|_| WalletError::DecryptionFailed("vault key file is corrupt".to_string()))?;
        return VaultKey::decode(&encoded);
    }

    let key = VaultKey::generate();
    files.write_raw(&path, key.encode().as_bytes())?;
    restrict_permissions(&path)?;
    Ok(key)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> WalletResult<()> {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o600);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> WalletResult<()> {
    Ok(())
}

fn resolve(index: &KeyIndex, id_or_alias: &str) -> Option<String> {
    if index.contains_key(id_or_alias) {
        return Some(id_or_alias.to_string());
    }
    index
        .iter()
        .find(|(_, entry)| entry.alias == id_or_alias)
        .map(|(id, _)| id.clone())
}

fn owner_of_alias(index: &KeyIndex, alias: &str) -> Option<String> {
    index
        .iter()
        .find(|(_, entry)| entry.alias == alias)
        .map(|(id, _)| id.clone())
}

fn kind_label(jwk: &PublicJwk) -> String {
    match (&jwk.kty[..], jwk.crv.as_deref()) {
        ("EC", Some(crv)) => format!("ec-{}", crv.to_lowercase()),
        ("RSA", _) => "rsa".to_string(),
        (other, _) => other.to_lowercase(),
    }
}

fn to_record(internal_id: &str, entry: &KeyIndexEntry) -> KeyRecord {
    KeyRecord {
        internal_id: internal_id.to_string(),
        alias: entry.alias.clone(),
        kind: entry.kind.clone(),
        public_jwk: entry.public_jwk.clone(),
        imported_at: entry.imported_at,
        has_private_material: entry.has_private_material,
        certificate_available: entry.certificate_available,
    }
}
