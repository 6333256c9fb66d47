//! # Capability-invocation proof verifier
//!
//! Establishes that a signed operation envelope carries a valid
//! `capabilityInvocation` proof: the invoker is a key authorized by the
//! target document, the claimed capability and action match what the
//! operation is actually attempting, and the detached JWS signature over the
//! canonicalized, proof-stripped operation verifies against that key.

use base64ct::Encoding;
use ed25519_dalek::{Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Digest;

use crate::config::ActionSynonyms;
use crate::error::{Error, ProofVerifyError, ProofVerifyResult, Result};
use crate::loader::{Loader, LedgerView};

/// `proofPurpose` a capability-invocation proof must carry.
pub const CAPABILITY_INVOCATION: &str = "capabilityInvocation";

/// `proofPurpose` of the schema-only companion proof (never itself an
/// authorization authority — see SPEC_FULL.md §4.5 tie-break note).
pub const AUTHORIZE_REQUEST: &str = "authorizeRequest";

/// The canonical operation kind a proof is being checked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapabilityAction {
    /// A create operation.
    Create,
    /// An update operation.
    Update,
}

impl CapabilityAction {
    const fn canonical(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
        }
    }
}

/// An object-capability proof attached to an operation envelope.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    /// MUST be `Ed25519Signature2018`.
    #[serde(rename = "type")]
    pub type_: String,

    /// RFC 3339 creation timestamp, carried through but not interpreted.
    pub created: String,

    /// `<did>#<fingerprint>` of the invoking key.
    pub verification_method: String,

    /// `capabilityInvocation` or `AuthorizeRequest`.
    pub proof_purpose: String,

    /// The DID whose root capability is being invoked.
    pub capability: String,

    /// The action this invocation authorizes, e.g. `"create"`.
    pub capability_action: String,

    /// Detached-payload JWS compact serialization.
    pub jws: String,
}

/// Find the `capabilityInvocation` proof among `proofs`.
///
/// # Errors
///
/// Returns [`Error::validation`] if no proof has
/// `proofPurpose = "capabilityInvocation"`.
pub fn find_capability_invocation(proofs: &[Proof]) -> Result<&Proof> {
    proofs
        .iter()
        .find(|p| p.proof_purpose == CAPABILITY_INVOCATION)
        .ok_or_else(|| Error::validation("operation has no capabilityInvocation proof"))
}

/// Verify that `proof` authorizes `expected_action` against `target_did`,
/// and that its detached JWS signs `canonical_subject` (the operation with
/// its proof array already stripped, pre-canonicalized by the caller into a
/// JSON value).
///
/// # Errors
///
/// Returns [`Error::validation`] for any of the structural/authorization
/// mismatches in SPEC_FULL.md §4.5, and [`Error::NotFound`] if
/// `verificationMethod` does not resolve.
pub async fn verify_capability_invocation<L: LedgerView>(
    proof: &Proof, target_did: &str, expected_action: CapabilityAction, synonyms: &ActionSynonyms,
    loader: &Loader<'_, L>, canonical_subject: &Value,
) -> Result<ProofVerifyResult> {
    let accepted = match expected_action {
        CapabilityAction::Create => synonyms.is_create(&proof.capability_action),
        CapabilityAction::Update => synonyms.is_update(&proof.capability_action),
    };
    if !accepted {
        return Err(Error::validation(format!(
            "capabilityAction '{}' does not authorize a {} operation",
            proof.capability_action,
            expected_action.canonical()
        )));
    }

    // Resolve the invoking key and check the signature before trusting any
    // other field of the proof: until the signature over the canonicalized
    // operation verifies, `proof.capability` itself might be tampered.
    let owner = loader.load_key_owner(&proof.verification_method).await?;
    let Some(invoker) = owner.verification_method(&proof.verification_method) else {
        return Err(Error::NotFound(format!(
            "verification method '{}' is not present in its owning document",
            proof.verification_method
        )));
    };
    if let Err(message) = verify_signature(proof, invoker, canonical_subject) {
        return Ok(failure(&message));
    }

    if proof.capability != target_did {
        return Ok(failure("does not match root capability target"));
    }

    let is_authorized_invoker =
        invoker.controller == target_did && owner.capability_invocation.iter().any(|vm| vm.id == invoker.id);
    if !is_authorized_invoker {
        return Ok(failure(
            "The authorized invoker does not match the verification method or its controller.",
        ));
    }

    Ok(ProofVerifyResult {
        verified: true,
        error: None,
    })
}

fn failure(message: &str) -> ProofVerifyResult {
    ProofVerifyResult {
        verified: false,
        error: vec![ProofVerifyError {
            message: message.to_string(),
            http_status_code: None,
        }],
    }
}

/// Verify `proof.jws` against `canonical_subject` (the operation value with
/// its `proof` array already removed) using `invoker`'s public key.
fn verify_signature(
    proof: &Proof, invoker: &crate::document::VerificationMethod, canonical_subject: &Value,
) -> std::result::Result<(), String> {
    let (header_b64, signature_b64) =
        proof.jws.split_once("..").ok_or_else(|| "jws is not a detached-payload JWS".to_string())?;

    let header_bytes = base64ct::Base64UrlUnpadded::decode_vec(header_b64)
        .map_err(|_| "jws header is not valid base64url".to_string())?;
    let header: JwsHeader =
        serde_json::from_slice(&header_bytes).map_err(|_| "jws header is not valid JSON".to_string())?;
    if header.alg != "EdDSA" {
        return Err(format!("unsupported jws alg '{}' - must be 'EdDSA'", header.alg));
    }
    if header.b64 != Some(false) {
        return Err("jws header must set b64=false for a detached payload".to_string());
    }

    let signature_bytes = base64ct::Base64UrlUnpadded::decode_vec(signature_b64)
        .map_err(|_| "jws signature is not valid base64url".to_string())?;
    let signature_bytes: [u8; 64] =
        signature_bytes.try_into().map_err(|_| "jws signature has the wrong length".to_string())?;
    let signature = Signature::from_bytes(&signature_bytes);

    let canonical = serde_json_canonicalizer::to_string(canonical_subject)
        .map_err(|e| format!("failed to canonicalize operation: {e}"))?;
    let payload_hash = sha2::Sha256::digest(canonical.as_bytes());
    let signing_input = format!("{header_b64}.{}", base64ct::Base64UrlUnpadded::encode_string(&payload_hash));

    let raw = bs58::decode(&invoker.public_key_base58)
        .into_vec()
        .map_err(|_| "invoker public key is not valid base58".to_string())?;
    let key_bytes: [u8; 32] =
        raw.try_into().map_err(|_| "invoker public key has the wrong length".to_string())?;
    let verifying_key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|_| "invoker public key is not a valid Ed25519 key".to_string())?;

    verifying_key
        .verify_strict(signing_input.as_bytes(), &signature)
        .map_err(|_| "Invalid signature.".to_string())
}

#[derive(Deserialize)]
struct JwsHeader {
    alg: String,
    #[serde(default)]
    b64: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_proof() -> Proof {
        Proof {
            type_: "Ed25519Signature2018".to_string(),
            created: "2026-01-01T00:00:00Z".to_string(),
            verification_method: "did:v1:nym:zabc#zkey".to_string(),
            proof_purpose: CAPABILITY_INVOCATION.to_string(),
            capability: "did:v1:nym:zabc".to_string(),
            capability_action: "create".to_string(),
            jws: "eyJhbGciOiJFZERTQSIsImI2NCI6ZmFsc2UsImNyaXQiOlsiYjY0Il19..sig".to_string(),
        }
    }

    #[test]
    fn finds_capability_invocation_proof() {
        let proofs = vec![sample_proof()];
        assert!(find_capability_invocation(&proofs).is_ok());
    }

    #[test]
    fn missing_capability_invocation_is_an_error() {
        let mut proof = sample_proof();
        proof.proof_purpose = AUTHORIZE_REQUEST.to_string();
        let err = find_capability_invocation(&[proof]).expect_err("should error");
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn rejects_malformed_jws() {
        let proof = sample_proof();
        let vm = crate::document::VerificationMethod {
            id: proof.verification_method.clone(),
            type_: "Ed25519VerificationKey2018".to_string(),
            controller: proof.capability.clone(),
            public_key_base58: bs58::encode([1u8; 32]).into_string(),
        };
        let subject = serde_json::json!({"id": "did:v1:nym:zabc"});
        let err = verify_signature(&proof, &vm, &subject).expect_err("should fail");
        assert!(err.contains("base64") || err.contains("length") || err.contains("Invalid signature"));
    }

    struct OwnerOnlyLedger {
        doc: crate::document::DidDocument,
    }

    impl LedgerView for OwnerOnlyLedger {
        async fn get_record(&self, did: &str) -> Result<Option<crate::document::DidDocument>> {
            if did == self.doc.id {
                Ok(Some(self.doc.clone()))
            } else {
                Ok(None)
            }
        }
    }

    #[tokio::test]
    async fn unresolvable_verification_method_id_is_not_found() {
        // The owning DID exists on the ledger, but no verification method
        // with the proof's id is present in its document — syntactically
        // resolvable, semantically absent (SPEC_FULL.md §7).
        let owner_did = "did:v1:nym:zabc";
        let doc = crate::document::DidDocument {
            id: owner_did.to_string(),
            ..Default::default()
        };
        let ledger = OwnerOnlyLedger { doc };
        let loader = Loader::new(&ledger);

        let mut proof = sample_proof();
        proof.verification_method = format!("{owner_did}#znotpresent");
        let subject = serde_json::json!({});
        let synonyms = ActionSynonyms::default();

        let err = verify_capability_invocation(
            &proof,
            owner_did,
            CapabilityAction::Create,
            &synonyms,
            &loader,
            &subject,
        )
        .await
        .expect_err("should be NotFound, not a ValidationError failure result");
        assert!(matches!(err, Error::NotFound(_)));
    }
}
