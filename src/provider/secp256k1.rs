// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Idvault Contributors

//! secp256k1 reference implementation of [`KeyMaterial`].
//!
//! Signs with deterministic ECDSA (RFC 6979) over SHA-256, the `ES256K` JWS
//! algorithm. Private keys export as JWK so the vault can encrypt them at
//! rest and re-import after decryption.

use base64ct::{Base64UrlUnpadded, Encoding};
use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;

use crate::error::{WalletError, WalletResult};
use crate::provider::{KeyMaterial, PublicJwk};

/// A secp256k1 key pair, or a verify-only public key.
#[derive(Clone)]
pub struct Secp256k1Key {
    signing: Option<SigningKey>,
    verifying: VerifyingKey,
}

impl std::fmt::Debug for Secp256k1Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secp256k1Key")
            .field("stable_id", &self.stable_id())
            .field("has_private", &self.signing.is_some())
            .finish()
    }
}

impl Secp256k1Key {
    /// Generate a fresh key pair from the system RNG.
    pub fn generate() -> Self {
        let signing = SigningKey::random(&mut OsRng);
        let verifying = *signing.verifying_key();
        Self {
            signing: Some(signing),
            verifying,
        }
    }

    /// Import a private key from its JWK representation (as produced by
    /// [`KeyMaterial::export_private`]).
    pub fn from_private_jwk(jwk: &str) -> WalletResult<Self> {
        let value: serde_json::Value = serde_json::from_str(jwk)
            .map_err(|_| WalletError::Provider("private JWK is not valid JSON".to_string()))?;
        let d = value
            .get("d")
            .and_then(|v| v.as_str())
            .ok_or_else(|| WalletError::Provider("private JWK lacks 'd'".to_string()))?;
        let d_bytes = Base64UrlUnpadded::decode_vec(d)
            .map_err(|_| WalletError::Provider("private JWK 'd' is not base64url".to_string()))?;
        let signing = SigningKey::from_slice(&d_bytes)
            .map_err(|e| WalletError::Provider(format!("invalid secp256k1 scalar: {e}")))?;
        let verifying = *signing.verifying_key();
        Ok(Self {
            signing: Some(signing),
            verifying,
        })
    }

    /// Build a verify-only key from a public JWK, as published in DID
    /// documents.
    pub fn from_public_jwk(jwk: &PublicJwk) -> WalletResult<Self> {
        if jwk.kty != "EC" || jwk.crv.as_deref() != Some("secp256k1") {
            return Err(WalletError::Provider(format!(
                "unsupported key type {}/{:?}",
                jwk.kty, jwk.crv
            )));
        }
        let x = decode_coordinate(jwk.x.as_deref(), "x")?;
        let y = decode_coordinate(jwk.y.as_deref(), "y")?;
        let point = k256::EncodedPoint::from_affine_coordinates(
            k256::FieldBytes::from_slice(&x),
            k256::FieldBytes::from_slice(&y),
            false,
        );
        let verifying = VerifyingKey::from_encoded_point(&point)
            .map_err(|e| WalletError::Provider(format!("invalid public point: {e}")))?;
        Ok(Self {
            signing: None,
            verifying,
        })
    }

    /// Whether this key carries a private component.
    pub fn has_private(&self) -> bool {
        self.signing.is_some()
    }

    fn coordinates(&self) -> (String, String) {
        let point = self.verifying.to_encoded_point(false);
        let x = point.x().map(|b| Base64UrlUnpadded::encode_string(b));
        let y = point.y().map(|b| Base64UrlUnpadded::encode_string(b));
        // Uncompressed SEC1 points always carry both coordinates.
        (x.unwrap_or_default(), y.unwrap_or_default())
    }
}

fn decode_coordinate(value: Option<&str>, name: &str) -> WalletResult<Vec<u8>> {
    let encoded = value
        .ok_or_else(|| WalletError::Provider(format!("public JWK lacks '{name}'")))?;
    let bytes = Base64UrlUnpadded::decode_vec(encoded)
        .map_err(|_| WalletError::Provider(format!("public JWK '{name}' is not base64url")))?;
    if bytes.len() != 32 {
        return Err(WalletError::Provider(format!(
            "public JWK '{name}' must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(bytes)
}

impl KeyMaterial for Secp256k1Key {
    fn stable_id(&self) -> String {
        self.export_public().thumbprint()
    }

    fn algorithm(&self) -> &'static str {
        "ES256K"
    }

    fn export_public(&self) -> PublicJwk {
        let (x, y) = self.coordinates();
        PublicJwk {
            kty: "EC".to_string(),
            crv: Some("secp256k1".to_string()),
            x: Some(x),
            y: Some(y),
            n: None,
            e: None,
        }
    }

    fn export_private(&self) -> WalletResult<String> {
        let signing = self
            .signing
            .as_ref()
            .ok_or_else(|| WalletError::Provider("key has no private component".to_string()))?;
        let (x, y) = self.coordinates();
        let d = Base64UrlUnpadded::encode_string(&signing.to_bytes());
        Ok(serde_json::json!({
            "kty": "EC",
            "crv": "secp256k1",
            "x": x,
            "y": y,
            "d": d,
        })
        .to_string())
    }

    fn sign(&self, data: &[u8]) -> WalletResult<Vec<u8>> {
        let signing = self
            .signing
            .as_ref()
            .ok_or_else(|| WalletError::Provider("key has no private component".to_string()))?;
        let signature: Signature = signing.sign(data);
        Ok(signature.to_vec())
    }

    fn verify(&self, signature: &[u8], data: &[u8]) -> bool {
        match Signature::from_slice(signature) {
            Ok(sig) => self.verifying.verify(data, &sig).is_ok(),
            Err(_) => false,
        }
    }
}
