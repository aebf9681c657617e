// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Idvault Contributors

//! Signed token wire format.
//!
//! Tokens are three dot-separated base64url (unpadded) segments:
//! `header.payload.signature`. The header carries `{alg, typ, kid}`, the
//! payload a JSON claim set, and the signature covers the raw
//! `header.payload` bytes. External verifiers depend on this exact layout, so
//! segment handling lives here and nowhere else.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde_json::Value;

use crate::error::{WalletError, WalletResult};

/// The decoded segments of a signed token.
#[derive(Debug, Clone)]
pub struct TokenParts {
    /// Decoded header object.
    pub header: Value,
    /// Decoded payload claim set.
    pub payload: Value,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
    /// The exact `header.payload` input the signature covers.
    pub signing_input: String,
}

/// Encode one token segment.
pub fn encode_segment(bytes: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(bytes)
}

/// Decode one token segment.
pub fn decode_segment(segment: &str) -> WalletResult<Vec<u8>> {
    Base64UrlUnpadded::decode_vec(segment)
        .map_err(|_| WalletError::MalformedToken("segment is not valid base64url".to_string()))
}

/// Serialize a JSON object into a token segment.
pub fn encode_json_segment(value: &Value) -> WalletResult<String> {
    Ok(encode_segment(serde_json::to_string(value)?.as_bytes()))
}

/// Decode a token segment into a JSON object.
fn decode_json_segment(segment: &str) -> WalletResult<Value> {
    let bytes = decode_segment(segment)?;
    serde_json::from_slice(&bytes)
        .map_err(|_| WalletError::MalformedToken("segment is not valid JSON".to_string()))
}

/// Assemble a signed token from pre-encoded header/payload segments and a
/// raw signature.
pub fn assemble(signing_input: &str, signature: &[u8]) -> String {
    format!("{signing_input}.{}", encode_segment(signature))
}

/// Build the signing input from header and payload objects.
pub fn signing_input(header: &Value, payload: &Value) -> WalletResult<String> {
    Ok(format!(
        "{}.{}",
        encode_json_segment(header)?,
        encode_json_segment(payload)?
    ))
}

/// Split and decode a token. Fails with `MalformedToken` unless the token
/// has exactly three decodable segments with JSON header and payload.
pub fn split(token: &str) -> WalletResult<TokenParts> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(WalletError::MalformedToken(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }

    let header = decode_json_segment(segments[0])?;
    let payload = decode_json_segment(segments[1])?;
    let signature = decode_segment(segments[2])?;

    Ok(TokenParts {
        header,
        payload,
        signature,
        signing_input: format!("{}.{}", segments[0], segments[1]),
    })
}

/// Decode only the payload claim set of a token.
pub fn decode_payload(token: &str) -> WalletResult<Value> {
    Ok(split(token)?.payload)
}
