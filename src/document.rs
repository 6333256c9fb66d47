//! # DID document schema validator
//!
//! A [`DidDocument`] here is a simplified, ledger-specific JSON-LD document:
//! this validator's target ledger uses exactly one verification-method type
//! (`Ed25519VerificationKey2018`) and one key encoding (`publicKeyBase58`),
//! so the richer multi-format `VerificationMethod` the teacher's DID
//! resolver supports is narrowed down to what the spec actually allows.

use serde::{Deserialize, Serialize};

use crate::config::Environment;
use crate::error::{Error, Result};
use crate::multibase::fingerprint_of_base58;

/// The Ed25519Signature2018-family verification method type this ledger
/// accepts. No other type is recognized.
pub const ED25519_VERIFICATION_KEY_2018: &str = "Ed25519VerificationKey2018";

/// A DID document as admitted to (or read from) the ledger.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    /// The DID this document describes.
    pub id: String,

    /// Verification methods authorized to authenticate as this DID.
    pub authentication: Vec<VerificationMethod>,

    /// Verification methods authorized to invoke capabilities (mutate this
    /// DID's document). `[0]` is the cryptonym-binding key.
    pub capability_invocation: Vec<VerificationMethod>,

    /// Verification methods authorized to delegate capabilities.
    pub capability_delegation: Vec<VerificationMethod>,

    /// Service descriptors advertised by this DID, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<ServiceDescriptor>,

    /// Ledger-side bookkeeping: the sequence number of the operation that
    /// produced this document, if the ledger tracks one. Not part of the
    /// DID-document JSON-LD shape proper — carried alongside it the way
    /// `DocumentMetadata` carries `created`/`updated`/`version_id` in the
    /// wider DID-resolution ecosystem.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,

    /// Present only on a DID designated as a ledger's `validatorParameterSet`
    /// (see [`crate::policy`]): the base URLs service endpoints across the
    /// ledger are restricted to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_service_base_url: Option<Vec<String>>,
}

impl DidDocument {
    /// Find a verification method by its `id` across all proof-purpose
    /// sections.
    #[must_use]
    pub fn verification_method(&self, id: &str) -> Option<&VerificationMethod> {
        self.authentication
            .iter()
            .chain(&self.capability_invocation)
            .chain(&self.capability_delegation)
            .find(|vm| vm.id == id)
    }

    /// Find a service descriptor by its `id`.
    #[must_use]
    pub fn service(&self, id: &str) -> Option<&ServiceDescriptor> {
        self.service.iter().find(|s| s.id == id)
    }

    /// All verification methods across all proof-purpose sections, in
    /// section order (`authentication`, `capabilityInvocation`,
    /// `capabilityDelegation`).
    fn all_verification_methods(&self) -> impl Iterator<Item = &VerificationMethod> {
        self.authentication.iter().chain(&self.capability_invocation).chain(&self.capability_delegation)
    }
}

/// A cryptographic key bound to a DID for a particular proof purpose.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// `<did>#<z-fingerprint>`.
    pub id: String,

    /// MUST be `Ed25519VerificationKey2018`.
    #[serde(rename = "type")]
    pub type_: String,

    /// MUST equal the owning document's `id`.
    pub controller: String,

    /// The raw (no multibase prefix) base58-encoded Ed25519 public key.
    pub public_key_base58: String,
}

/// A way of communicating with the DID subject or an associated entity.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    /// `<did>#<fragment>`.
    pub id: String,

    /// Service type, e.g. `"AgentService"`.
    #[serde(rename = "type")]
    pub type_: String,

    /// Absolute `https://` endpoint URL.
    pub service_endpoint: String,
}

/// Validate the structural shape of a [`DidDocument`] (SPEC_FULL.md §4.3).
///
/// Does not check cryptonym binding (see [`crate::did::bind_did`]) — this is
/// purely the schema check shared by both create and (post-patch) update.
///
/// # Errors
///
/// Returns [`Error::validation`] on the first structural violation found.
pub fn validate_schema(doc: &DidDocument, env: Environment) -> Result<()> {
    if doc.id.is_empty() {
        return Err(Error::validation("document 'id' must be present"));
    }
    crate::did::parse_did(&doc.id, env)?;

    if doc.authentication.is_empty() {
        return Err(Error::validation("'authentication' must be a nonempty array"));
    }
    if doc.capability_invocation.is_empty() {
        return Err(Error::validation("'capabilityInvocation' must be a nonempty array"));
    }
    if doc.capability_delegation.is_empty() {
        return Err(Error::validation("'capabilityDelegation' must be a nonempty array"));
    }

    let mut seen_ids = std::collections::HashSet::new();
    for vm in doc.all_verification_methods() {
        validate_verification_method(doc, vm)?;
        if !seen_ids.insert(vm.id.clone()) {
            return Err(Error::validation(format!(
                "verification method id '{}' is not unique across proof-purpose sections",
                vm.id
            )));
        }
    }

    for service in &doc.service {
        validate_service(doc, service)?;
    }

    Ok(())
}

fn validate_verification_method(doc: &DidDocument, vm: &VerificationMethod) -> Result<()> {
    if vm.type_ != ED25519_VERIFICATION_KEY_2018 {
        return Err(Error::validation(format!(
            "verification method '{}' has unsupported type '{}'",
            vm.id, vm.type_
        )));
    }
    if vm.controller != doc.id {
        return Err(Error::validation(format!(
            "verification method '{}' controller '{}' does not match document id '{}'",
            vm.id, vm.controller, doc.id
        )));
    }
    if vm.public_key_base58.is_empty() {
        return Err(Error::validation(format!("verification method '{}' has an empty public key", vm.id)));
    }

    let Some((_, fragment)) = vm.id.split_once('#') else {
        return Err(Error::validation(format!("verification method id '{}' has no fragment", vm.id)));
    };
    let expected_fragment = fingerprint_of_base58(&vm.public_key_base58)?;
    if fragment != expected_fragment {
        return Err(Error::validation(format!(
            "verification method '{}' fragment does not match the fingerprint of its public key",
            vm.id
        )));
    }
    Ok(())
}

fn validate_service(doc: &DidDocument, service: &ServiceDescriptor) -> Result<()> {
    let Some((did, fragment)) = service.id.split_once('#') else {
        return Err(Error::validation(format!("service id '{}' has no fragment", service.id)));
    };
    if did != doc.id {
        return Err(Error::validation(format!(
            "service id '{}' does not belong to document '{}'",
            service.id, doc.id
        )));
    }
    if fragment.is_empty() {
        return Err(Error::validation(format!("service id '{}' has an empty fragment", service.id)));
    }
    if service.type_.is_empty() {
        return Err(Error::validation(format!("service '{}' has an empty type", service.id)));
    }
    if !service.service_endpoint.starts_with("https://") {
        return Err(Error::validation(format!(
            "service '{}' endpoint must be an absolute https:// URL",
            service.id
        )));
    }
    Ok(())
}
