// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Idvault Contributors

//! Envelope engine.
//!
//! Builds signed envelope tokens around stored credentials, composes
//! envelopes into a holder presentation, and verifies envelope/presentation
//! tokens. Construction is a pure function of its inputs; nothing here is
//! persisted. Composition never signs when the required credential set is
//! incomplete: [`crate::credentials::RequiredSet`] can only be obtained
//! complete.
//!
//! Wire constants below are interop-critical; external verifiers check them
//! literally.

use chrono::Utc;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::claims::ClaimMap;
use crate::credentials::{PresentationPolicy, RequiredSet};
use crate::error::{WalletError, WalletResult};
use crate::provider::{DidResolver, KeyMaterial};
use crate::token;

/// Envelope and presentation validity window, in seconds.
pub const VALIDITY_SECS: i64 = 3600;

/// Claim carrying the compliance block.
pub const COMPLIANCE_CLAIM: &str = "gx:compliance";

/// Expected trust-framework tag inside a compliance block.
pub const TRUST_FRAMEWORK: &str = "GAIA-X";

/// Trust-framework version asserted in compliance blocks.
pub const FRAMEWORK_VERSION: &str = "2210";

/// Issuance policy asserted in envelope compliance blocks.
pub const ISSUANCE_POLICY: &str = "eIDAS";

/// Extra claim tagging an envelope with its credential kind.
pub const CREDENTIAL_TAG_CLAIM: &str = "gx:credentialType";

/// Claims every envelope and presentation must carry.
const REQUIRED_CLAIMS: [&str; 5] = ["iss", "sub", "iat", "exp", "jti"];

/// A verified token: decoded header and claim set.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub header: Value,
    pub claims: Value,
}

/// Outcome of a presentation compliance check.
#[derive(Debug, Clone)]
pub struct ComplianceCheck {
    pub compliant: bool,
    pub message: String,
}

/// A parsed presentation request from a verifier.
#[derive(Debug, Clone)]
pub struct PresentationRequest {
    pub audience: String,
    pub nonce: String,
    pub response_type: String,
    pub scope: String,
}

impl PresentationRequest {
    /// Parse and validate a presentation request. All of `aud`, `nonce`,
    /// `response_type` and `scope` must be present.
    pub fn parse(raw: &str) -> WalletResult<Self> {
        let value: Value = serde_json::from_str(raw).map_err(|_| {
            WalletError::MalformedToken("presentation request is not valid JSON".to_string())
        })?;

        let field = |name: &'static str| -> WalletResult<String> {
            value
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or(WalletError::MissingClaim(name))
        };

        let request = Self {
            audience: field("aud")?,
            nonce: field("nonce")?,
            response_type: field("response_type")?,
            scope: field("scope")?,
        };

        if !request.scope.contains("gaia-x") && !request.scope.contains("legal-person") {
            tracing::warn!(scope = %request.scope, "presentation request scope does not name a known framework");
        }
        Ok(request)
    }
}

/// Build a signed envelope around a single credential token.
///
/// The claim set is `{iss, sub, iat, exp, jti, vc, gx:compliance}` plus any
/// `extra_claims`; `exp` is always strictly later than `iat`.
pub fn seal_credential(
    raw_credential: &str,
    key: &dyn KeyMaterial,
    holder_did: &str,
    extra_claims: &ClaimMap,
) -> WalletResult<String> {
    let issued_at = Utc::now().timestamp();

    let mut payload = Map::new();
    payload.insert("iss".to_string(), json!(holder_did));
    payload.insert("sub".to_string(), json!(holder_did));
    payload.insert("iat".to_string(), json!(issued_at));
    payload.insert("exp".to_string(), json!(issued_at + VALIDITY_SECS));
    payload.insert("jti".to_string(), json!(unique_id()));
    payload.insert("vc".to_string(), json!(raw_credential));

    for (name, value) in extra_claims {
        payload.insert(name.clone(), value.to_json());
    }

    payload.insert(
        COMPLIANCE_CLAIM.to_string(),
        json!({
            "gx:trustFramework": TRUST_FRAMEWORK,
            "gx:version": FRAMEWORK_VERSION,
            "gx:issuancePolicy": ISSUANCE_POLICY,
        }),
    );

    sign_payload(&Value::Object(payload), key)
}

/// Compose a signed presentation over a complete required credential set.
///
/// One envelope is built per credential, tagged with its kind, preserving
/// the order the set supplied them in. The outer token carries holder,
/// audience, nonce and an aggregate compliance block naming all embedded
/// kinds.
pub fn compose_presentation(
    set: &RequiredSet,
    key: &dyn KeyMaterial,
    holder_did: &str,
    audience: &str,
    nonce: Option<&str>,
) -> WalletResult<String> {
    let mut envelopes = Vec::with_capacity(set.entries().len());
    for entry in set.entries() {
        let mut tag = ClaimMap::new();
        tag.insert(
            CREDENTIAL_TAG_CLAIM.to_string(),
            entry.kind.token_label().into(),
        );
        envelopes.push(seal_credential(&entry.raw_token, key, holder_did, &tag)?);
    }

    let embedded_kinds: Vec<&str> = set
        .entries()
        .iter()
        .map(|entry| entry.kind.token_label())
        .collect();

    let issued_at = Utc::now().timestamp();
    let payload = json!({
        "iss": holder_did,
        "sub": holder_did,
        "aud": audience,
        "iat": issued_at,
        "exp": issued_at + VALIDITY_SECS,
        "jti": unique_id(),
        "nonce": nonce.map(str::to_string).unwrap_or_else(generate_nonce),
        "vp": {
            "@context": [
                "https://www.w3.org/2018/credentials/v1",
                "https://gaia-x.eu/credentials/v1",
            ],
            "type": ["VerifiablePresentation", "GaiaXParticipantPresentation"],
            "id": unique_id(),
            "holder": holder_did,
            "verifiableCredential": envelopes,
            COMPLIANCE_CLAIM: {
                "gx:trustFramework": TRUST_FRAMEWORK,
                "gx:version": FRAMEWORK_VERSION,
                "gx:participantType": "legal-person",
                "gx:credentialTypes": embedded_kinds,
            },
        },
    });

    sign_payload(&payload, key)
}

/// Compose the presentation answering a verifier's request, binding its
/// audience and nonce.
pub fn compose_for_request(
    request: &PresentationRequest,
    set: &RequiredSet,
    key: &dyn KeyMaterial,
    holder_did: &str,
) -> WalletResult<String> {
    compose_presentation(set, key, holder_did, &request.audience, Some(&request.nonce))
}

/// Verify an envelope or presentation token.
///
/// Resolves the issuer's key through `resolver`, checks the signature over
/// the `header.payload` bytes, then validates structure: the required
/// claims, a future expiration, and the compliance trust-framework tag when
/// a compliance block is present. Read-only.
pub fn verify_token(raw: &str, resolver: &dyn DidResolver) -> WalletResult<VerifiedToken> {
    let parts = token::split(raw)?;

    let issuer = parts
        .payload
        .get("iss")
        .and_then(Value::as_str)
        .ok_or(WalletError::MissingClaim("iss"))?;

    let verification_key = resolver.resolve_to_key(issuer)?;
    if !verification_key.verify(&parts.signature, parts.signing_input.as_bytes()) {
        return Err(WalletError::InvalidSignature);
    }

    for claim in REQUIRED_CLAIMS {
        if parts.payload.get(claim).is_none() {
            return Err(WalletError::MissingClaim(claim));
        }
    }

    let expires_at = parts
        .payload
        .get("exp")
        .and_then(Value::as_i64)
        .ok_or_else(|| WalletError::MalformedToken("exp claim is not a number".to_string()))?;
    if expires_at <= Utc::now().timestamp() {
        return Err(WalletError::Expired);
    }

    if let Some(block) = parts.payload.get(COMPLIANCE_CLAIM) {
        let tag = block.get("gx:trustFramework").and_then(Value::as_str);
        if tag != Some(TRUST_FRAMEWORK) {
            return Err(WalletError::InvalidComplianceTag(
                tag.unwrap_or("absent").to_string(),
            ));
        }
    }

    Ok(VerifiedToken {
        header: parts.header,
        claims: parts.payload,
    })
}

/// Check the aggregate compliance block of a presentation against a policy.
///
/// Structural only; use [`verify_token`] for signature and temporal checks.
pub fn check_compliance(
    raw: &str,
    policy: &PresentationPolicy,
) -> WalletResult<ComplianceCheck> {
    let payload = token::decode_payload(raw)?;

    let Some(vp) = payload.get("vp") else {
        return Ok(not_compliant("token carries no vp claim"));
    };
    let Some(block) = vp.get(COMPLIANCE_CLAIM) else {
        return Ok(not_compliant("presentation carries no compliance block"));
    };

    let tag = block.get("gx:trustFramework").and_then(Value::as_str);
    if tag != Some(TRUST_FRAMEWORK) {
        return Ok(not_compliant(&format!(
            "unexpected trust framework: {}",
            tag.unwrap_or("absent")
        )));
    }

    let embedded = vp
        .get("verifiableCredential")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    if embedded < policy.required.len() {
        return Ok(not_compliant(&format!(
            "{embedded} embedded credentials, policy {} requires {}",
            policy.name,
            policy.required.len()
        )));
    }

    Ok(ComplianceCheck {
        compliant: true,
        message: format!("presentation satisfies the {} policy", policy.name),
    })
}

fn not_compliant(message: &str) -> ComplianceCheck {
    ComplianceCheck {
        compliant: false,
        message: message.to_string(),
    }
}

fn sign_payload(payload: &Value, key: &dyn KeyMaterial) -> WalletResult<String> {
    let header = json!({
        "alg": key.algorithm(),
        "typ": "JWT",
        "kid": key.stable_id(),
    });
    let signing_input = token::signing_input(&header, payload)?;
    let signature = key.sign(signing_input.as_bytes())?;
    Ok(token::assemble(&signing_input, &signature))
}

fn unique_id() -> String {
    format!("urn:uuid:{}", Uuid::new_v4())
}

fn generate_nonce() -> String {
    Uuid::new_v4().simple().to_string()
}
