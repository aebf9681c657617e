// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Idvault Contributors

//! Filesystem operations for wallet storage.
//!
//! Index files are rewritten atomically (write-to-temp-then-rename) so a
//! crash mid-write leaves either the old or the new index on disk, never a
//! partially written one. Record files (ciphertext, raw tokens) are written
//! in place; their authoritative existence is tracked by the index.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use rand::RngCore;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::WalletResult;

use super::WalletPaths;

/// Number of random-overwrite passes before a shredded file is unlinked.
const SHRED_PASSES: usize = 3;

/// File-backed store rooted at a wallet directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    paths: WalletPaths,
}

impl FileStore {
    /// Open a store, creating the directory layout if needed.
    pub fn open(paths: WalletPaths) -> WalletResult<Self> {
        let dirs = [
            paths.keys_dir(),
            paths.certificates_dir(),
            paths.credentials_dir(),
            paths.dids_dir(),
        ];
        for dir in dirs {
            fs::create_dir_all(&dir)?;
        }
        Ok(Self { paths })
    }

    /// Get the storage paths.
    pub fn paths(&self) -> &WalletPaths {
        &self.paths
    }

    /// Check if a file exists.
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        path.as_ref().is_file()
    }

    // ========== Generic JSON Operations ==========

    /// Read a JSON file and deserialize it.
    pub fn read_json<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> WalletResult<T> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        let value = serde_json::from_reader(reader)?;
        Ok(value)
    }

    /// Write a JSON file (atomic write via rename).
    pub fn write_json<T: Serialize>(
        &self,
        path: impl AsRef<Path>,
        value: &T,
    ) -> WalletResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
        }

        fs::rename(&temp_path, path)?;
        Ok(())
    }

    // ========== Raw File Operations ==========

    /// Write raw bytes to a file.
    pub fn write_raw(&self, path: impl AsRef<Path>, data: &[u8]) -> WalletResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }

    /// Read raw bytes from a file.
    pub fn read_raw(&self, path: impl AsRef<Path>) -> WalletResult<Vec<u8>> {
        let mut file = File::open(path.as_ref())?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    /// List the stems of all files in a directory with the given extension.
    pub fn list_files(
        &self,
        dir: impl AsRef<Path>,
        extension: &str,
    ) -> WalletResult<Vec<String>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut stems = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file()
                && path.extension().is_some_and(|ext| ext == extension)
            {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    stems.push(stem.to_string());
                }
            }
        }
        stems.sort();
        Ok(stems)
    }

    /// Delete a file. Returns `false` if it did not exist.
    pub fn delete(&self, path: impl AsRef<Path>) -> WalletResult<bool> {
        let path = path.as_ref();
        if !path.is_file() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }

    /// Overwrite a file with random bytes before unlinking it, so sensitive
    /// content cannot be recovered from the storage medium. Returns `false`
    /// if the file did not exist.
    pub fn shred(&self, path: impl AsRef<Path>) -> WalletResult<bool> {
        let path = path.as_ref();
        let len = match fs::metadata(path) {
            Ok(meta) if meta.is_file() => meta.len() as usize,
            _ => return Ok(false),
        };

        let mut rng = rand::thread_rng();
        let mut file = OpenOptions::new().write(true).open(path)?;
        let mut buf = vec![0u8; len];
        for _ in 0..SHRED_PASSES {
            rng.fill_bytes(&mut buf);
            file.write_all(&buf)?;
            file.flush()?;
            file.rewind()?;
        }
        drop(file);

        fs::remove_file(path)?;
        Ok(true)
    }
}
