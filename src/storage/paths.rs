// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Idvault Contributors

//! Path constants and utilities for the wallet storage layout.

use std::path::{Path, PathBuf};

/// Storage path utilities for a wallet root directory.
#[derive(Debug, Clone)]
pub struct WalletPaths {
    root: PathBuf,
}

impl WalletPaths {
    /// Create a new WalletPaths with the given root.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all wallet data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the vault encryption key file.
    pub fn vault_key_file(&self) -> PathBuf {
        self.root.join(".vault-key")
    }

    // ========== Key Paths ==========

    /// Directory containing encrypted key records.
    pub fn keys_dir(&self) -> PathBuf {
        self.root.join("keys")
    }

    /// Path to the ciphertext record for a key.
    pub fn key_record(&self, internal_id: &str) -> PathBuf {
        self.keys_dir().join(format!("{internal_id}.enc"))
    }

    /// Path to the key index file.
    pub fn key_index(&self) -> PathBuf {
        self.keys_dir().join("index.json")
    }

    // ========== Certificate Paths ==========

    /// Directory containing cleartext certificate metadata.
    pub fn certificates_dir(&self) -> PathBuf {
        self.root.join("certificates")
    }

    /// Path to the certificate metadata record for a key.
    pub fn certificate(&self, internal_id: &str) -> PathBuf {
        self.certificates_dir().join(format!("{internal_id}.json"))
    }

    // ========== Credential Paths ==========

    /// Directory containing raw credential tokens.
    pub fn credentials_dir(&self) -> PathBuf {
        self.root.join("credentials")
    }

    /// Path to a raw credential token file.
    pub fn credential_token(&self, file_id: &str) -> PathBuf {
        self.credentials_dir().join(format!("{file_id}.jwt"))
    }

    /// Path to the credential metadata index file.
    pub fn credential_index(&self) -> PathBuf {
        self.credentials_dir().join("index.json")
    }

    // ========== DID Reference Paths ==========

    /// Directory containing DID reference records.
    pub fn dids_dir(&self) -> PathBuf {
        self.root.join("dids")
    }

    /// Path to the DID reference record for a key.
    pub fn did_reference(&self, internal_id: &str) -> PathBuf {
        self.dids_dir().join(format!("{internal_id}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_hang_off_the_root() {
        let paths = WalletPaths::new("/tmp/wallet");
        assert_eq!(paths.root(), Path::new("/tmp/wallet"));
        assert_eq!(
            paths.vault_key_file(),
            PathBuf::from("/tmp/wallet/.vault-key")
        );
        assert_eq!(
            paths.key_record("abc"),
            PathBuf::from("/tmp/wallet/keys/abc.enc")
        );
        assert_eq!(
            paths.key_index(),
            PathBuf::from("/tmp/wallet/keys/index.json")
        );
        assert_eq!(
            paths.certificate("abc"),
            PathBuf::from("/tmp/wallet/certificates/abc.json")
        );
        assert_eq!(
            paths.credential_token("cred-1"),
            PathBuf::from("/tmp/wallet/credentials/cred-1.jwt")
        );
        assert_eq!(
            paths.credential_index(),
            PathBuf::from("/tmp/wallet/credentials/index.json")
        );
        assert_eq!(
            paths.did_reference("abc"),
            PathBuf::from("/tmp/wallet/dids/abc.json")
        );
    }
}
