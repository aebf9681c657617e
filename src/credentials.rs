// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Idvault Contributors

//! Credential store.
//!
//! Holds opaque signed credential tokens together with extracted metadata.
//! Import validates the token's *structure* and asserted kind only; the
//! cryptographic signature is never checked here, that is the verifier's
//! job via the envelope engine.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::claims::{ClaimMap, ClaimValue};
use crate::error::{WalletError, WalletResult};
use crate::storage::{FileStore, WalletPaths};
use crate::token;

/// Closed enumeration of credential kinds the wallet understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialKind {
    /// Organization identity credential.
    LegalPerson,
    /// Legal registration number credential.
    RegistrationNumber,
    /// Terms-and-conditions acceptance credential.
    TermsAcceptance,
}

impl CredentialKind {
    /// All kinds, in canonical order.
    pub const ALL: [CredentialKind; 3] = [
        CredentialKind::LegalPerson,
        CredentialKind::RegistrationNumber,
        CredentialKind::TermsAcceptance,
    ];

    /// Stable kebab-case label used in records and error messages.
    pub fn label(self) -> &'static str {
        match self {
            CredentialKind::LegalPerson => "legal-person",
            CredentialKind::RegistrationNumber => "registration-number",
            CredentialKind::TermsAcceptance => "terms-acceptance",
        }
    }

    /// Type labels accepted inside tokens. Each kind has historical
    /// synonyms issued by different authorities.
    pub fn accepted_labels(self) -> &'static [&'static str] {
        match self {
            CredentialKind::LegalPerson => &["LegalPersonCredential", "LegalPerson"],
            CredentialKind::RegistrationNumber => {
                &["LRNCredential", "LegalRegistrationNumberCredential"]
            }
            CredentialKind::TermsAcceptance => {
                &["TermsAndConditionsCredential", "ParticipantTermsAndConditions"]
            }
        }
    }

    /// Primary label used when tagging envelopes.
    pub fn token_label(self) -> &'static str {
        self.accepted_labels()[0]
    }
}

impl std::fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Metadata record for an imported credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Credential id, from the token's own id claim or generated at import.
    pub credential_id: String,
    /// Lookup alias.
    pub alias: String,
    /// Validated credential kind.
    pub kind: CredentialKind,
    /// Issuer identifier asserted in the token.
    pub issuer: String,
    /// Subject identifier asserted in the token.
    pub subject: String,
    /// Issuance date string asserted in the token, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
    /// Expiration date string asserted in the token, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    /// Kind-specific display metadata extracted at import.
    pub display: ClaimMap,
    /// When the credential was imported.
    pub imported_at: DateTime<Utc>,
}

/// A named set of credential kinds required by a presentation policy.
#[derive(Debug, Clone)]
pub struct PresentationPolicy {
    /// Policy name, e.g. `participant`.
    pub name: &'static str,
    /// Kinds that must all be present.
    pub required: Vec<CredentialKind>,
}

impl PresentationPolicy {
    /// The participant policy: legal person + registration number + terms
    /// acceptance.
    pub fn participant() -> Self {
        Self {
            name: "participant",
            required: CredentialKind::ALL.to_vec(),
        }
    }
}

/// One entry of a satisfied [`PresentationPolicy`]: the chosen record and
/// its raw token, ready for enveloping.
#[derive(Debug, Clone)]
pub struct RequiredCredential {
    pub kind: CredentialKind,
    pub record: CredentialRecord,
    pub raw_token: String,
}

/// A complete required set, in policy order. Constructed only when every
/// required kind was available, so downstream composition can sign without
/// re-checking.
#[derive(Debug, Clone)]
pub struct RequiredSet {
    entries: Vec<RequiredCredential>,
}

impl RequiredSet {
    /// The satisfied entries, in the order the policy listed their kinds.
    pub fn entries(&self) -> &[RequiredCredential] {
        &self.entries
    }
}

type CredentialIndex = BTreeMap<String, CredentialRecord>;

/// Storage and type-validated retrieval of credential tokens.
pub struct CredentialStore {
    files: FileStore,
}

impl CredentialStore {
    /// Open a credential store rooted at the given wallet directory.
    pub fn open(root: impl AsRef<Path>) -> WalletResult<Self> {
        let files = FileStore::open(WalletPaths::new(root))?;
        Ok(Self { files })
    }

    /// Import a credential token after validating its asserted kind.
    ///
    /// The token must have the three-segment structure with a decodable
    /// payload carrying a `vc` object (`MalformedToken` otherwise), and the
    /// `vc.type` labels must include one accepted by `expected_kind`
    /// (`KindMismatch` otherwise).
    pub fn import(
        &self,
        raw_token: &str,
        expected_kind: CredentialKind,
        alias: Option<&str>,
    ) -> WalletResult<CredentialRecord> {
        let payload = token::decode_payload(raw_token)?;
        let vc = payload
            .get("vc")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                WalletError::MalformedToken("token does not carry a vc claim".to_string())
            })?;

        let asserted: Vec<String> = vc
            .get("type")
            .and_then(Value::as_array)
            .map(|types| {
                types
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let accepted = expected_kind.accepted_labels();
        if !asserted.iter().any(|t| accepted.contains(&t.as_str())) {
            return Err(WalletError::KindMismatch {
                expected: expected_kind.label().to_string(),
                found: asserted,
            });
        }

        let credential_id = vc
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("urn:uuid:{}", Uuid::new_v4()));

        let record = CredentialRecord {
            credential_id: credential_id.clone(),
            alias: alias
                .map(str::to_string)
                .unwrap_or_else(|| {
                    format!("{}-{}", expected_kind.label(), Utc::now().timestamp_millis())
                }),
            kind: expected_kind,
            issuer: string_claim(vc.get("issuer"))
                .or_else(|| string_claim(payload.get("iss")))
                .unwrap_or_else(|| "unknown".to_string()),
            subject: vc
                .get("credentialSubject")
                .and_then(|s| s.get("id"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| "unknown".to_string()),
            issued_at: string_claim(vc.get("issuanceDate")),
            expires_at: string_claim(vc.get("expirationDate")),
            display: extract_display(vc, expected_kind),
            imported_at: Utc::now(),
        };

        self.files.write_raw(
            self.files
                .paths()
                .credential_token(&file_id(&credential_id)),
            raw_token.as_bytes(),
        )?;

        let mut index = self.load_index()?;
        index.insert(credential_id, record.clone());
        self.save_index(&index)?;

        tracing::debug!(
            credential_id = %record.credential_id,
            kind = %record.kind,
            "imported credential"
        );
        Ok(record)
    }

    /// List imported credentials, optionally filtered by kind.
    pub fn list(&self, kind: Option<CredentialKind>) -> WalletResult<Vec<CredentialRecord>> {
        let index = self.load_index()?;
        Ok(index
            .into_values()
            .filter(|record| kind.map_or(true, |k| record.kind == k))
            .collect())
    }

    /// Load the raw token of a credential by id or alias.
    pub fn load_raw_token(&self, id_or_alias: &str) -> WalletResult<String> {
        let index = self.load_index()?;
        let credential_id = resolve(&index, id_or_alias)
            .ok_or_else(|| WalletError::NotFound(format!("credential {id_or_alias}")))?;

        let path = self.files.paths().credential_token(&file_id(&credential_id));
        if !self.files.exists(&path) {
            return Err(WalletError::NotFound(format!(
                "credential token {credential_id}"
            )));
        }
        let bytes = self.files.read_raw(&path)?;
        String::from_utf8(bytes)
            .map_err(|_| WalletError::MalformedToken("stored token is not UTF-8".to_string()))
    }

    /// Delete a credential: removes both the metadata record and the raw
    /// token. Returns `false` if the credential did not exist.
    pub fn delete(&self, id_or_alias: &str) -> WalletResult<bool> {
        let mut index = self.load_index()?;
        let Some(credential_id) = resolve(&index, id_or_alias) else {
            return Ok(false);
        };

        self.files
            .delete(self.files.paths().credential_token(&file_id(&credential_id)))?;
        index.remove(&credential_id);
        self.save_index(&index)?;
        tracing::debug!(credential_id = %credential_id, "deleted credential");
        Ok(true)
    }

    /// Resolve a policy's required set: the first available record of each
    /// required kind, with its raw token loaded. Fails with
    /// `IncompleteCredentialSet` naming every missing kind.
    pub fn required_set_for(&self, policy: &PresentationPolicy) -> WalletResult<RequiredSet> {
        let mut entries = Vec::with_capacity(policy.required.len());
        let mut missing = Vec::new();

        for &kind in &policy.required {
            match self.list(Some(kind))?.into_iter().next() {
                Some(record) => {
                    let raw_token = self.load_raw_token(&record.credential_id)?;
                    entries.push(RequiredCredential {
                        kind,
                        record,
                        raw_token,
                    });
                }
                None => missing.push(kind.label().to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(WalletError::IncompleteCredentialSet { missing });
        }
        Ok(RequiredSet { entries })
    }

    fn load_index(&self) -> WalletResult<CredentialIndex> {
        let path = self.files.paths().credential_index();
        if !self.files.exists(&path) {
            return Ok(CredentialIndex::new());
        }
        self.files.read_json(path)
    }

    fn save_index(&self, index: &CredentialIndex) -> WalletResult<()> {
        self.files
            .write_json(self.files.paths().credential_index(), index)
    }
}

fn string_claim(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

/// Filename for a credential id. Ids come out of tokens, so path-hostile
/// characters are mapped away.
fn file_id(credential_id: &str) -> String {
    credential_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

fn resolve(index: &CredentialIndex, id_or_alias: &str) -> Option<String> {
    if index.contains_key(id_or_alias) {
        return Some(id_or_alias.to_string());
    }
    index
        .iter()
        .find(|(_, record)| record.alias == id_or_alias)
        .map(|(id, _)| id.clone())
}

fn extract_display(vc: &serde_json::Map<String, Value>, kind: CredentialKind) -> ClaimMap {
    let subject = vc.get("credentialSubject").and_then(Value::as_object);
    let fields: &[&str] = match kind {
        CredentialKind::LegalPerson => &["legalName", "registrationNumber", "legalIdentifier"],
        CredentialKind::RegistrationNumber => &["lrn", "registrationAuthority", "registrationDate"],
        CredentialKind::TermsAcceptance => &["termsUrl", "acceptanceDate", "version"],
    };

    let mut display = ClaimMap::new();
    if let Some(subject) = subject {
        for &field in fields {
            if let Some(value) = subject.get(field).and_then(ClaimValue::from_json) {
                display.insert(field.to_string(), value);
            }
        }
    }
    display
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::encode_segment;
    use serde_json::json;
    use tempfile::tempdir;

    fn forge_token(vc: Value) -> String {
        let header = encode_segment(
            json!({"alg": "ES256K", "typ": "JWT"}).to_string().as_bytes(),
        );
        let payload = encode_segment(
            json!({"iss": "did:web:issuer.example", "vc": vc})
                .to_string()
                .as_bytes(),
        );
        let signature = encode_segment(b"unverified-signature");
        format!("{header}.{payload}.{signature}")
    }

    fn legal_person_token() -> String {
        forge_token(json!({
            "id": "urn:uuid:11111111-2222-3333-4444-555555555555",
            "type": ["VerifiableCredential", "LegalPersonCredential"],
            "issuer": "did:web:authority.example",
            "issuanceDate": "2024-01-15T10:00:00Z",
            "expirationDate": "2026-01-15T10:00:00Z",
            "credentialSubject": {
                "id": "did:web:company.example",
                "legalName": "Example GmbH",
                "registrationNumber": "DE123456789"
            }
        }))
    }

    fn terms_token() -> String {
        forge_token(json!({
            "type": ["VerifiableCredential", "ParticipantTermsAndConditions"],
            "issuer": "did:web:authority.example",
            "credentialSubject": {
                "id": "did:web:company.example",
                "termsUrl": "https://example.com/terms",
                "version": "1.1"
            }
        }))
    }

    fn registration_token() -> String {
        forge_token(json!({
            "type": ["VerifiableCredential", "LRNCredential"],
            "issuer": "did:web:registry.example",
            "credentialSubject": {
                "id": "did:web:company.example",
                "lrn": "LRN-4711"
            }
        }))
    }

    #[test]
    fn import_extracts_metadata() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::open(dir.path()).unwrap();

        let record = store
            .import(&legal_person_token(), CredentialKind::LegalPerson, Some("org"))
            .unwrap();

        assert_eq!(
            record.credential_id,
            "urn:uuid:11111111-2222-3333-4444-555555555555"
        );
        assert_eq!(record.alias, "org");
        assert_eq!(record.kind, CredentialKind::LegalPerson);
        assert_eq!(record.issuer, "did:web:authority.example");
        assert_eq!(record.subject, "did:web:company.example");
        assert_eq!(record.issued_at.as_deref(), Some("2024-01-15T10:00:00Z"));
        assert_eq!(
            record.display.get("legalName").and_then(|v| v.as_str()),
            Some("Example GmbH")
        );
    }

    #[test]
    fn import_accepts_any_label_synonym() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::open(dir.path()).unwrap();

        // ParticipantTermsAndConditions is a synonym for terms-acceptance
        let result = store.import(&terms_token(), CredentialKind::TermsAcceptance, None);
        assert!(result.is_ok());
    }

    #[test]
    fn import_rejects_kind_mismatch() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::open(dir.path()).unwrap();

        let result = store.import(&legal_person_token(), CredentialKind::TermsAcceptance, None);
        match result {
            Err(WalletError::KindMismatch { expected, found }) => {
                assert_eq!(expected, "terms-acceptance");
                assert!(found.contains(&"LegalPersonCredential".to_string()));
            }
            other => panic!("expected KindMismatch, got {other:?}"),
        }
    }

    #[test]
    fn import_rejects_malformed_tokens() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::open(dir.path()).unwrap();

        // not three segments
        let result = store.import("a.b", CredentialKind::LegalPerson, None);
        assert!(matches!(result, Err(WalletError::MalformedToken(_))));

        // three segments but no vc claim
        let header = encode_segment(b"{}");
        let payload = encode_segment(json!({"iss": "x"}).to_string().as_bytes());
        let token = format!("{header}.{payload}.{}", encode_segment(b"sig"));
        let result = store.import(&token, CredentialKind::LegalPerson, None);
        assert!(matches!(result, Err(WalletError::MalformedToken(_))));
    }

    #[test]
    fn generated_id_when_token_has_none() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::open(dir.path()).unwrap();

        let record = store
            .import(&terms_token(), CredentialKind::TermsAcceptance, None)
            .unwrap();
        assert!(record.credential_id.starts_with("urn:uuid:"));
    }

    #[test]
    fn list_filters_by_kind() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::open(dir.path()).unwrap();

        store
            .import(&terms_token(), CredentialKind::TermsAcceptance, Some("tc-v1"))
            .unwrap();

        let terms = store.list(Some(CredentialKind::TermsAcceptance)).unwrap();
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].alias, "tc-v1");

        let legal = store.list(Some(CredentialKind::LegalPerson)).unwrap();
        assert!(legal.is_empty());
    }

    #[test]
    fn raw_token_roundtrip_by_alias() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::open(dir.path()).unwrap();

        let original = terms_token();
        store
            .import(&original, CredentialKind::TermsAcceptance, Some("tc"))
            .unwrap();

        assert_eq!(store.load_raw_token("tc").unwrap(), original);
        assert!(matches!(
            store.load_raw_token("nope"),
            Err(WalletError::NotFound(_))
        ));
    }

    #[test]
    fn delete_removes_token_and_metadata() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::open(dir.path()).unwrap();

        let record = store
            .import(&terms_token(), CredentialKind::TermsAcceptance, Some("tc"))
            .unwrap();

        assert!(store.delete("tc").unwrap());
        assert!(!store.delete("tc").unwrap());
        assert!(store
            .list(Some(CredentialKind::TermsAcceptance))
            .unwrap()
            .is_empty());
        assert!(matches!(
            store.load_raw_token(&record.credential_id),
            Err(WalletError::NotFound(_))
        ));
    }

    #[test]
    fn required_set_reports_missing_kinds() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::open(dir.path()).unwrap();

        store
            .import(&terms_token(), CredentialKind::TermsAcceptance, Some("tc-v1"))
            .unwrap();

        let result = store.required_set_for(&PresentationPolicy::participant());
        match result {
            Err(WalletError::IncompleteCredentialSet { missing }) => {
                assert_eq!(missing, vec!["legal-person", "registration-number"]);
            }
            other => panic!("expected IncompleteCredentialSet, got {other:?}"),
        }
    }

    #[test]
    fn required_set_complete_in_policy_order() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::open(dir.path()).unwrap();

        // import out of policy order on purpose
        store
            .import(&terms_token(), CredentialKind::TermsAcceptance, None)
            .unwrap();
        store
            .import(&legal_person_token(), CredentialKind::LegalPerson, None)
            .unwrap();
        store
            .import(&registration_token(), CredentialKind::RegistrationNumber, None)
            .unwrap();

        let set = store
            .required_set_for(&PresentationPolicy::participant())
            .unwrap();
        let kinds: Vec<CredentialKind> = set.entries().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, CredentialKind::ALL.to_vec());
        assert!(set.entries().iter().all(|e| !e.raw_token.is_empty()));
    }
}
