//! # DID parsing & cryptonym binding
//!
//! A Veres One DID is a "cryptonym": its identifier *is* the fingerprint of
//! its initial capability-invocation key, so no registration authority is
//! needed to bind the two together — only arithmetic.

use std::fmt::{self, Display, Formatter};

use regex::Regex;
use std::sync::OnceLock;

use crate::config::Environment;
use crate::document::DidDocument;
use crate::error::{Error, Result};
use crate::multibase::fingerprint_of_base58;

fn did_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^did:v1(:test)?:nym:([1-9A-HJ-NP-Za-km-z]+)$")
            .expect("DID pattern is a valid regex")
    })
}

/// A parsed, environment-checked Veres One DID.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Did {
    raw: String,
    test: bool,
    fingerprint: String,
}

impl Did {
    /// The full DID string, e.g. `did:v1:nym:z6Mk...`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether this DID uses the `:test:` environment segment.
    #[must_use]
    pub const fn is_test(&self) -> bool {
        self.test
    }

    /// The multibase fingerprint segment of the DID (e.g. `z6Mk...`).
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl Display for Did {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Parse a candidate DID string, requiring the `:test:` segment iff `env`
/// is [`Environment::Test`].
///
/// # Errors
///
/// Returns [`Error::validation`] if `s` does not match
/// `did:v1(:test)?:nym:<base58>` for the given environment.
pub fn parse_did(s: &str, env: Environment) -> Result<Did> {
    let Some(captures) = did_pattern().captures(s) else {
        return Err(Error::validation(format!("'{s}' is not a well-formed did:v1:nym DID")));
    };
    let test = captures.get(1).is_some();
    let expected_test = env == Environment::Test;
    if test != expected_test {
        return Err(Error::validation(format!(
            "DID environment segment does not match the configured environment: '{s}'"
        )));
    }
    let fingerprint = captures[2].to_string();
    Ok(Did {
        raw: s.to_string(),
        test,
        fingerprint,
    })
}

/// Verify that `did`'s fingerprint equals the fingerprint of the document's
/// `capabilityInvocation[0]` public key, and that the key's `id` is exactly
/// `<did>#z<fingerprint>`.
///
/// # Errors
///
/// Returns [`Error::validation`] if `capabilityInvocation` is empty, if the
/// key's `id` doesn't match the expected shape, or if the fingerprints
/// disagree (the cryptonym binding is broken).
pub fn bind_did(did: &Did, doc: &DidDocument) -> Result<()> {
    let Some(invocation_key) = doc.capability_invocation.first() else {
        return Err(Error::validation("document has no capabilityInvocation verification methods"));
    };
    let key_fingerprint = fingerprint_of_base58(&invocation_key.public_key_base58)?;
    let expected_id = format!("{}#{key_fingerprint}", doc.id);
    if invocation_key.id != expected_id {
        return Err(Error::validation(format!(
            "capabilityInvocation[0].id '{}' does not match expected '{expected_id}'",
            invocation_key.id
        )));
    }
    if did.fingerprint() != &key_fingerprint[1..] {
        return Err(Error::validation(
            "DID fingerprint does not match the capabilityInvocation[0] key fingerprint",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::VerificationMethod;

    fn sample_key() -> (String, String) {
        // publicKeyBase58 for a fixed all-zero Ed25519 key, plus its
        // expected z-fingerprint.
        let raw = [0u8; 32];
        let public_key_base58 = bs58::encode(raw).into_string();
        let fp = crate::multibase::fingerprint(&raw);
        (public_key_base58, fp)
    }

    #[test]
    fn parses_prod_did() {
        let (_, fp) = sample_key();
        let did = parse_did(&format!("did:v1:nym:{}", &fp[1..]), Environment::Prod)
            .expect("should parse");
        assert!(!did.is_test());
    }

    #[test]
    fn parses_test_did() {
        let (_, fp) = sample_key();
        let did = parse_did(&format!("did:v1:test:nym:{}", &fp[1..]), Environment::Test)
            .expect("should parse");
        assert!(did.is_test());
    }

    #[test]
    fn rejects_env_mismatch() {
        let (_, fp) = sample_key();
        let err = parse_did(&format!("did:v1:test:nym:{}", &fp[1..]), Environment::Prod)
            .expect_err("should reject test DID under prod env");
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn rejects_malformed() {
        assert!(parse_did("did:v2:nym:abc", Environment::Prod).is_err());
        assert!(parse_did("not-a-did", Environment::Prod).is_err());
    }

    #[test]
    fn binds_matching_document() {
        let (public_key_base58, fp) = sample_key();
        let did_str = format!("did:v1:nym:{}", &fp[1..]);
        let did = parse_did(&did_str, Environment::Prod).expect("should parse");
        let vm = VerificationMethod {
            id: format!("{did_str}#{fp}"),
            type_: "Ed25519VerificationKey2018".to_string(),
            controller: did_str.clone(),
            public_key_base58,
        };
        let doc = DidDocument {
            id: did_str,
            authentication: vec![vm.clone()],
            capability_invocation: vec![vm.clone()],
            capability_delegation: vec![vm],
            service: vec![],
            sequence: None,
            allowed_service_base_url: None,
        };
        bind_did(&did, &doc).expect("should bind");
    }

    #[test]
    fn rejects_mismatched_key() {
        let (_, fp) = sample_key();
        let did_str = format!("did:v1:nym:{}", &fp[1..]);
        let did = parse_did(&did_str, Environment::Prod).expect("should parse");

        let other_key = bs58::encode([9u8; 32]).into_string();
        let other_fp = crate::multibase::fingerprint(&[9u8; 32]);
        let vm = VerificationMethod {
            id: format!("{did_str}#{other_fp}"),
            type_: "Ed25519VerificationKey2018".to_string(),
            controller: did_str.clone(),
            public_key_base58: other_key,
        };
        let doc = DidDocument {
            id: did_str,
            authentication: vec![vm.clone()],
            capability_invocation: vec![vm.clone()],
            capability_delegation: vec![vm],
            service: vec![],
            sequence: None,
            allowed_service_base_url: None,
        };
        let err = bind_did(&did, &doc).expect_err("should reject mismatched key");
        assert!(matches!(err, Error::Validation { .. }));
    }
}
