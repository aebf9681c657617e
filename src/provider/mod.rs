// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Idvault Contributors

//! External collaborator interfaces.
//!
//! The wallet never implements cryptographic primitives or DID network
//! operations itself. Signing, verification, DID resolution and DID
//! registration are capabilities of these provider traits; callers plug in
//! an implementation (the crate ships a secp256k1 reference signer in
//! [`secp256k1`], tests use in-memory resolvers).

pub mod secp256k1;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::WalletResult;
use crate::token::encode_segment;

pub use secp256k1::Secp256k1Key;

/// Public component of a key in JWK form.
///
/// Only the canonical public fields are carried. Equality is field-for-field,
/// which is what DID document key matching relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicJwk {
    /// Key type, e.g. `EC` or `RSA`.
    pub kty: String,
    /// Curve name for elliptic-curve keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    /// X coordinate (base64url) for elliptic-curve keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    /// Y coordinate (base64url) for elliptic-curve keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    /// Modulus (base64url) for RSA keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// Exponent (base64url) for RSA keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

impl PublicJwk {
    /// RFC 7638 thumbprint: SHA-256 over the canonical JSON of the required
    /// public members, base64url-encoded. Stable across re-imports of the
    /// same key material, which is what makes it usable as a record id.
    pub fn thumbprint(&self) -> String {
        // Canonical form: required members only, lexicographic order.
        let canonical = match self.kty.as_str() {
            "EC" => format!(
                r#"{{"crv":"{}","kty":"EC","x":"{}","y":"{}"}}"#,
                self.crv.as_deref().unwrap_or(""),
                self.x.as_deref().unwrap_or(""),
                self.y.as_deref().unwrap_or("")
            ),
            "RSA" => format!(
                r#"{{"e":"{}","kty":"RSA","n":"{}"}}"#,
                self.e.as_deref().unwrap_or(""),
                self.n.as_deref().unwrap_or("")
            ),
            other => format!(
                r#"{{"crv":"{}","kty":"{}","x":"{}"}}"#,
                self.crv.as_deref().unwrap_or(""),
                other,
                self.x.as_deref().unwrap_or("")
            ),
        };
        encode_segment(&Sha256::digest(canonical.as_bytes()))
    }
}

/// A verification method inside a DID document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub method_type: String,
    pub controller: String,
    #[serde(rename = "publicKeyJwk")]
    pub public_key_jwk: PublicJwk,
    /// URL of the certificate chain backing this key, if any.
    #[serde(rename = "x5u", skip_serializing_if = "Option::is_none")]
    pub certificate_chain_url: Option<String>,
}

/// A resolved or constructed DID document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DidDocument {
    #[serde(rename = "@context", default = "DidDocument::default_context")]
    pub context: Vec<String>,
    pub id: String,
    #[serde(rename = "verificationMethod", default)]
    pub verification_method: Vec<VerificationMethod>,
    #[serde(
        rename = "assertionMethod",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub assertion_method: Vec<String>,
}

impl DidDocument {
    fn default_context() -> Vec<String> {
        vec!["https://www.w3.org/ns/did/v1".to_string()]
    }

    /// Whether any verification method publishes the given public key.
    pub fn contains_key(&self, jwk: &PublicJwk) -> bool {
        self.verification_method
            .iter()
            .any(|vm| &vm.public_key_jwk == jwk)
    }
}

/// Result of registering a DID with a registrar.
#[derive(Debug, Clone)]
pub struct RegisteredDid {
    /// The DID locator, e.g. `did:web:example.com:org`.
    pub locator: String,
    /// The document published under that locator.
    pub document: DidDocument,
}

/// Asymmetric key material capability set.
///
/// The wallet treats keys as opaque: it asks for a stable id, the public
/// component, an exportable private representation to encrypt at rest, and
/// signatures. `algorithm` names the JWS algorithm for token headers.
pub trait KeyMaterial {
    /// Stable identifier derived deterministically from the key material.
    fn stable_id(&self) -> String;

    /// JWS algorithm label, e.g. `ES256K`.
    fn algorithm(&self) -> &'static str;

    /// Canonical public component.
    fn export_public(&self) -> PublicJwk;

    /// Exportable private representation (JWK JSON). Fails for keys that
    /// carry no private component.
    fn export_private(&self) -> WalletResult<String>;

    /// Sign raw bytes. Fails for keys that carry no private component.
    fn sign(&self, data: &[u8]) -> WalletResult<Vec<u8>>;

    /// Verify a signature over raw bytes.
    fn verify(&self, signature: &[u8], data: &[u8]) -> bool;
}

/// DID resolution collaborator.
pub trait DidResolver {
    /// Resolve a DID locator to its document.
    fn resolve(&self, locator: &str) -> WalletResult<DidDocument>;

    /// Resolve a DID locator to verification key material.
    fn resolve_to_key(&self, locator: &str) -> WalletResult<Box<dyn KeyMaterial>>;
}

/// DID registration collaborator.
pub trait DidRegistrar {
    /// Register a DID under `domain`/`path` publishing the given public key
    /// set, returning the locator and the published document.
    fn register(
        &self,
        domain: &str,
        path: &str,
        public_keys: &[PublicJwk],
    ) -> WalletResult<RegisteredDid>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_jwk() -> PublicJwk {
        PublicJwk {
            kty: "EC".to_string(),
            crv: Some("secp256k1".to_string()),
            x: Some("eHg".to_string()),
            y: Some("eXk".to_string()),
            n: None,
            e: None,
        }
    }

    #[test]
    fn thumbprint_is_deterministic() {
        let a = sample_jwk().thumbprint();
        let b = sample_jwk().thumbprint();
        assert_eq!(a, b);

        let mut other = sample_jwk();
        other.x = Some("different".to_string());
        assert_ne!(a, other.thumbprint());
    }

    #[test]
    fn document_key_matching_is_exact() {
        let doc = DidDocument {
            context: DidDocument::default_context(),
            id: "did:web:example.com".to_string(),
            verification_method: vec![VerificationMethod {
                id: "did:web:example.com#key-1".to_string(),
                method_type: "JsonWebKey2020".to_string(),
                controller: "did:web:example.com".to_string(),
                public_key_jwk: sample_jwk(),
                certificate_chain_url: None,
            }],
            assertion_method: vec![],
        };

        assert!(doc.contains_key(&sample_jwk()));

        let mut tweaked = sample_jwk();
        tweaked.y = Some("tweaked".to_string());
        assert!(!doc.contains_key(&tweaked));
    }

    #[test]
    fn jwk_serializes_without_absent_fields() {
        let json = serde_json::to_string(&sample_jwk()).unwrap();
        assert!(!json.contains("\"n\""));
        assert!(!json.contains("\"e\""));
    }
}
