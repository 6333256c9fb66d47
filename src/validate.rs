//! # Validator orchestrator (C8)
//!
//! The top-level `validate` entry point: dispatches create vs update,
//! composes C2–C7, and shapes the final `{ valid, error? }` result. Never
//! returns `Err` to its caller — every failure mode is reflected in
//! [`ValidationResult`].

use serde_json::Value;

use crate::config::{ActionSynonyms, Environment};
use crate::did::{bind_did, parse_did};
use crate::document::validate_schema;
use crate::error::{Error, ErrorEnvelope, Result};
use crate::loader::{Loader, LedgerView};
use crate::operation::{Operation, ValidatorConfig};
use crate::patch::apply_patch;
use crate::policy::check_service_policy;
use crate::proof::{find_capability_invocation, verify_capability_invocation, CapabilityAction};

/// Everything `validate` needs beyond the ledger view itself.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidateRequest {
    /// The ledger height the caller's `ledgerNode` view is fixed at. Carried
    /// through for logging only — `validate` never reasons about block
    /// heights itself, that is the `LedgerView`'s contract.
    pub basis_block_height: u64,

    /// The signed create/update operation to validate.
    pub validator_input: Operation,

    /// Per-ledger validator configuration.
    pub validator_config: ValidatorConfig,
}

/// The outcome of a `validate` call.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationResult {
    /// Whether the operation is admissible.
    pub valid: bool,

    /// Populated iff `valid` is `false`.
    pub error: Option<ErrorEnvelope>,
}

impl ValidationResult {
    const fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn err(error: Error) -> Self {
        Self {
            valid: false,
            error: Some(error.into_envelope()),
        }
    }
}

/// Validate a signed create or update operation against `ledger` under
/// `env`.
///
/// This function is a pure function of its arguments plus whatever `ledger`
/// observes; it holds no state of its own and never panics on malformed
/// input — structural problems surface as `ValidationResult { valid: false,
/// .. }`.
pub async fn validate<L: LedgerView>(request: &ValidateRequest, ledger: &L, env: Environment) -> ValidationResult {
    let synonyms = ActionSynonyms::default();
    let loader = Loader::new(ledger);
    let target_did = request.validator_input.target();

    let proofs = request.validator_input.proofs();
    let result = match &request.validator_input {
        Operation::Create(create) => {
            validate_create(create, proofs, target_did, env, &synonyms, &loader, &request.validator_config).await
        }
        Operation::Update(update) => {
            validate_update(update, proofs, target_did, env, &synonyms, &loader, &request.validator_config).await
        }
    };

    match &result {
        Ok(()) => tracing::debug!(did = target_did, "operation validated"),
        Err(err) => tracing::warn!(did = target_did, error = %err, name = err.name(), "operation rejected"),
    }

    result.map_or_else(ValidationResult::err, |()| ValidationResult::ok())
}

async fn validate_create<L: LedgerView>(
    create: &crate::operation::CreateRecord, proofs: &[crate::proof::Proof], target: &str, env: Environment,
    synonyms: &ActionSynonyms, loader: &Loader<'_, L>, config: &ValidatorConfig,
) -> Result<()> {
    validate_schema(&create.record, env)?;
    let did = parse_did(&create.record.id, env)?;
    bind_did(&did, &create.record)?;

    if loader.try_load_did(target).await?.is_some() {
        return Err(Error::Duplicate(target.to_string()));
    }

    // The record being created has no ledger entry yet; prime the loader so
    // its own capability-invocation proof resolves against itself.
    loader.prime(target, create.record.clone());

    let proof = find_capability_invocation(proofs)?;
    let canonical_subject = strip_jws(
        serde_json::to_value(create).map_err(|e| Error::validation(format!("failed to serialize operation: {e}")))?,
    );
    let result = verify_capability_invocation(
        proof,
        target,
        CapabilityAction::Create,
        synonyms,
        loader,
        &canonical_subject,
    )
    .await?;
    if !result.verified {
        return Err(Error::validation(
            result.error.first().map_or_else(|| "capability invocation failed".to_string(), |e| e.message.clone()),
        ));
    }

    check_service_policy(&create.record, config.validator_parameter_set.as_deref(), loader).await
}

async fn validate_update<L: LedgerView>(
    update: &crate::operation::UpdateRecord, proofs: &[crate::proof::Proof], target: &str, env: Environment,
    synonyms: &ActionSynonyms, loader: &Loader<'_, L>, config: &ValidatorConfig,
) -> Result<()> {
    let proof = find_capability_invocation(proofs)?;
    let canonical_subject = strip_jws(
        serde_json::to_value(update).map_err(|e| Error::validation(format!("failed to serialize operation: {e}")))?,
    );
    let result = verify_capability_invocation(
        proof,
        target,
        CapabilityAction::Update,
        synonyms,
        loader,
        &canonical_subject,
    )
    .await?;
    if !result.verified {
        return Err(Error::validation(
            result.error.first().map_or_else(|| "capability invocation failed".to_string(), |e| e.message.clone()),
        ));
    }

    let current = loader.load_did(target).await?;
    let patched = apply_patch(&current, &update.record_patch, env)?;

    check_service_policy(&patched, config.validator_parameter_set.as_deref(), loader).await
}

/// Strip every proof's `jws` field from a serialized operation before
/// canonicalizing it, per SPEC_FULL.md §4.5 step 6.
fn strip_jws(mut value: Value) -> Value {
    if let Some(proof_array) = value.get_mut("proof").and_then(Value::as_array_mut) {
        for proof in proof_array {
            if let Some(obj) = proof.as_object_mut() {
                obj.remove("jws");
            }
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use base64ct::Encoding;
    use ed25519_dalek::{Signer, SigningKey};
    use sha2::Digest;

    use super::*;
    use crate::document::{DidDocument, VerificationMethod};
    use crate::multibase::fingerprint;
    use crate::operation::CreateRecord;
    use crate::proof::Proof;

    struct InMemoryLedger {
        records: HashMap<String, DidDocument>,
    }

    impl LedgerView for InMemoryLedger {
        async fn get_record(&self, did: &str) -> Result<Option<DidDocument>> {
            Ok(self.records.get(did).cloned())
        }
    }

    fn signed_create(seed: u8) -> (CreateRecord, String) {
        let signing_key = SigningKey::from_bytes(&[seed; 32]);
        let raw = signing_key.verifying_key().to_bytes();
        let fp = fingerprint(&raw);
        let did = format!("did:v1:nym:{}", &fp[1..]);
        let vm = VerificationMethod {
            id: format!("{did}#{fp}"),
            type_: "Ed25519VerificationKey2018".to_string(),
            controller: did.clone(),
            public_key_base58: bs58::encode(raw).into_string(),
        };
        let record = DidDocument {
            id: did.clone(),
            authentication: vec![vm.clone()],
            capability_invocation: vec![vm.clone()],
            capability_delegation: vec![vm.clone()],
            service: vec![],
            sequence: Some(0),
            allowed_service_base_url: None,
        };

        let mut proof = Proof {
            type_: "Ed25519Signature2018".to_string(),
            created: "2026-01-01T00:00:00Z".to_string(),
            verification_method: vm.id.clone(),
            proof_purpose: "capabilityInvocation".to_string(),
            capability: did.clone(),
            capability_action: "create".to_string(),
            jws: String::new(),
        };
        let unsigned = CreateRecord {
            record: record.clone(),
            proof: vec![proof.clone()],
        };
        let canonical_subject = strip_jws(serde_json::to_value(&unsigned).expect("serializes"));
        let canonical = serde_json_canonicalizer::to_string(&canonical_subject).expect("canonicalizes");
        let hash = sha2::Sha256::digest(canonical.as_bytes());
        let header_b64 = base64ct::Base64UrlUnpadded::encode_string(
            br#"{"alg":"EdDSA","b64":false,"crit":["b64"]}"#,
        );
        let signing_input = format!("{header_b64}.{}", base64ct::Base64UrlUnpadded::encode_string(&hash));
        let signature = signing_key.sign(signing_input.as_bytes());
        let signature_b64 = base64ct::Base64UrlUnpadded::encode_string(&signature.to_bytes());
        proof.jws = format!("{header_b64}..{signature_b64}");

        (
            CreateRecord {
                record,
                proof: vec![proof],
            },
            did,
        )
    }

    #[tokio::test]
    async fn accepts_a_well_formed_create() {
        let (create, did) = signed_create(1);
        let ledger = InMemoryLedger {
            records: HashMap::new(),
        };
        let request = ValidateRequest {
            basis_block_height: 1,
            validator_input: Operation::Create(create),
            validator_config: ValidatorConfig::default(),
        };
        let result = validate(&request, &ledger, Environment::Prod).await;
        assert!(result.valid, "{:?}", result.error);
        let _ = did;
    }

    #[tokio::test]
    async fn rejection_is_observable_via_tracing() {
        use tracing::Level;
        use tracing_subscriber::FmtSubscriber;

        let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (create, did) = signed_create(5);
        let ledger = InMemoryLedger {
            records: [(did, create.record.clone())].into_iter().collect(),
        };
        let request = ValidateRequest {
            basis_block_height: 1,
            validator_input: Operation::Create(create),
            validator_config: ValidatorConfig::default(),
        };
        let result = validate(&request, &ledger, Environment::Prod).await;
        assert!(!result.valid, "a duplicate create should be rejected and logged");
    }

    #[tokio::test]
    async fn rejects_a_duplicate_create() {
        let (create, did) = signed_create(2);
        let mut records = HashMap::new();
        records.insert(did, create.record.clone());
        let ledger = InMemoryLedger { records };
        let request = ValidateRequest {
            basis_block_height: 1,
            validator_input: Operation::Create(create),
            validator_config: ValidatorConfig::default(),
        };
        let result = validate(&request, &ledger, Environment::Prod).await;
        assert!(!result.valid);
        assert_eq!(result.error.expect("should carry an error").name, "DuplicateError");
    }

    #[tokio::test]
    async fn rejects_a_tampered_record() {
        let (mut create, _did) = signed_create(3);
        create.record.service.push(crate::document::ServiceDescriptor {
            id: format!("{}#agent", create.record.id),
            type_: "AgentService".to_string(),
            service_endpoint: "https://example.com".to_string(),
        });
        let ledger = InMemoryLedger {
            records: HashMap::new(),
        };
        let request = ValidateRequest {
            basis_block_height: 1,
            validator_input: Operation::Create(create),
            validator_config: ValidatorConfig::default(),
        };
        let result = validate(&request, &ledger, Environment::Prod).await;
        assert!(!result.valid);
    }
}
