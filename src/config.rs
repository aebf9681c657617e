// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Idvault Contributors

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and default values used by
//! wallet constructors. Configuration is read from the environment when a
//! wallet root is not given explicitly.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `WALLET_DIR` | Root directory for wallet storage | `./wallet-storage` |

use std::path::PathBuf;

/// Environment variable name for the wallet storage root.
pub const WALLET_DIR_ENV: &str = "WALLET_DIR";

/// Default wallet storage root, relative to the working directory.
pub const DEFAULT_WALLET_DIR: &str = "./wallet-storage";

/// Resolve the wallet root directory from the environment, falling back to
/// [`DEFAULT_WALLET_DIR`].
pub fn wallet_dir() -> PathBuf {
    std::env::var(WALLET_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_WALLET_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_relative_wallet_storage() {
        assert_eq!(DEFAULT_WALLET_DIR, "./wallet-storage");
    }
}
