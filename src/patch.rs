//! # Patch engine
//!
//! Applies an update operation's RFC 6902 patch to a deep-cloned working
//! copy of the current document, then re-runs the schema and cryptonym
//! checks against the result — an update can never leave the ledger in a
//! state a fresh create wouldn't be allowed to reach.

use serde::{Deserialize, Serialize};

use crate::config::Environment;
use crate::did::{bind_did, parse_did};
use crate::document::{validate_schema, DidDocument};
use crate::error::{Error, Result};

/// An RFC 6902 patch targeting an existing DID document.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    /// The DID being updated.
    pub target: String,

    /// Expected `D₀.sequence + 1`, when the ledger tracks sequence numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,

    /// The JSON Patch to apply to the current document.
    pub patch: json_patch::Patch,
}

/// Apply `recordPatch.patch` to `current`, yielding the candidate next
/// document. Re-validates schema and cryptonym binding on the result.
///
/// # Errors
///
/// Returns [`Error::validation`] if the sequence check fails, the patch
/// itself fails to apply (bad path, failed `test` op), or the patched
/// document fails schema validation or cryptonym re-binding.
pub fn apply_patch(current: &DidDocument, record_patch: &RecordPatch, env: Environment) -> Result<DidDocument> {
    if let (Some(expected_next), Some(current_sequence)) = (record_patch.sequence, current.sequence) {
        if expected_next != current_sequence + 1 {
            return Err(Error::validation(format!(
                "recordPatch.sequence {expected_next} does not equal the expected {}",
                current_sequence + 1
            )));
        }
    }

    let mut working_copy =
        serde_json::to_value(current).map_err(|e| Error::validation(format!("failed to serialize current document: {e}")))?;
    json_patch::patch(&mut working_copy, &record_patch.patch)
        .map_err(|e| Error::validation(format!("failed to apply patch: {e}")))?;
    let patched: DidDocument = serde_json::from_value(working_copy)
        .map_err(|e| Error::validation(format!("patched document is not well-formed JSON: {e}")))?;

    validate_schema(&patched, env)?;

    let did = parse_did(&patched.id, env)?;
    bind_did(&did, &patched)?;

    let original_invocation_key =
        current.capability_invocation.first().map(|vm| (&vm.id, &vm.public_key_base58));
    let patched_invocation_key =
        patched.capability_invocation.first().map(|vm| (&vm.id, &vm.public_key_base58));
    if original_invocation_key != patched_invocation_key {
        return Err(Error::validation(
            "the capabilityInvocation[0] cryptonym key may not be removed or rotated by an update",
        ));
    }

    Ok(patched)
}
