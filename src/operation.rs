//! # Operation & configuration shapes
//!
//! The signed envelope a ledger node hands to [`crate::validate::validate`],
//! and the small configuration value that accompanies it. `Operation`
//! replaces the dynamic `type`-string dispatch of the wire format with a
//! tagged enum — SPEC_FULL.md §9's "replace dynamic dispatch with a tagged
//! variant."

use serde::{Deserialize, Serialize};

use crate::document::DidDocument;
use crate::patch::RecordPatch;
use crate::proof::Proof;

/// A signed create-or-update operation submitted for validation.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum Operation {
    /// Create a new DID record.
    #[serde(rename = "CreateWebLedgerRecord")]
    Create(CreateRecord),

    /// Patch an existing DID record.
    #[serde(rename = "UpdateWebLedgerRecord")]
    Update(UpdateRecord),
}

impl Operation {
    /// The target DID of this operation: `record.id` for a create, or
    /// `recordPatch.target` for an update.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Create(create) => &create.record.id,
            Self::Update(update) => &update.record_patch.target,
        }
    }

    /// The proofs attached to this operation.
    #[must_use]
    pub fn proofs(&self) -> &[Proof] {
        match self {
            Self::Create(create) => &create.proof,
            Self::Update(update) => &update.proof,
        }
    }
}

/// A `CreateWebLedgerRecord` operation.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecord {
    /// The candidate DID document.
    pub record: DidDocument,

    /// The `AuthorizeRequest` and `capabilityInvocation` proofs.
    pub proof: Vec<Proof>,
}

/// An `UpdateWebLedgerRecord` operation.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecord {
    /// The patch to apply to the ledger's current document.
    pub record_patch: RecordPatch,

    /// The `AuthorizeRequest` and `capabilityInvocation` proofs.
    pub proof: Vec<Proof>,
}

/// Per-ledger validator configuration accompanying each `validate` call.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorConfig {
    /// MUST be `"VeresOneValidator2017"`.
    #[serde(rename = "type")]
    pub type_: String,

    /// MUST contain `"RecordOperation"`.
    pub validator_filter: Vec<String>,

    /// The DID of the ledger's service-endpoint policy document, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator_parameter_set: Option<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            type_: "VeresOneValidator2017".to_string(),
            validator_filter: vec!["RecordOperation".to_string()],
            validator_parameter_set: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_shape() {
        let config = ValidatorConfig::default();
        assert_eq!(config.type_, "VeresOneValidator2017");
        assert_eq!(config.validator_filter, vec!["RecordOperation".to_string()]);
        assert!(config.validator_parameter_set.is_none());
    }
}
