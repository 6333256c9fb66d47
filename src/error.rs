//! Error taxonomy for the validator.
//!
//! The validator never throws across its public boundary (see
//! [`crate::validate`]): every [`Error`] produced internally is funnelled
//! into an [`ErrorEnvelope`] before it reaches the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating an operation.
///
/// Variant names map 1:1 onto the `name` field of the wire [`ErrorEnvelope`].
#[derive(Error, Debug)]
pub enum Error {
    /// Schema, DID binding, patch, service policy, signature, action or
    /// capability-target mismatch.
    #[error("{message}")]
    Validation {
        /// Human-readable summary.
        message: String,
        /// Structured detail payload, if any.
        details: Option<ErrorDetails>,
    },

    /// A create operation's `record.id` already exists on the ledger.
    #[error("{0} already exists")]
    Duplicate(String),

    /// An update's target, or a resolved verification method, does not
    /// exist.
    #[error("{0}")]
    NotFound(String),

    /// A referenced `validatorParameterSet` is absent from the ledger.
    #[error("{0}")]
    InvalidState(String),

    /// A document-loader call exceeded its deadline.
    #[error("timed out loading {0}")]
    Timeout(String),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with no structured details.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: None,
        }
    }

    /// Shorthand for a [`Error::Validation`] carrying a single
    /// `proofVerifyResult` error message.
    #[must_use]
    pub fn proof_verify(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Validation {
            message: message.clone(),
            details: Some(ErrorDetails {
                proof_verify_result: Some(ProofVerifyResult {
                    verified: false,
                    error: vec![ProofVerifyError {
                        message,
                        http_status_code: None,
                    }],
                }),
                allowed_service_base_url: None,
            }),
        }
    }

    /// Shorthand for a [`Error::Validation`] carrying an
    /// `allowedServiceBaseUrl` detail.
    #[must_use]
    pub fn service_policy(message: impl Into<String>, allowed: Vec<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: Some(ErrorDetails {
                proof_verify_result: None,
                allowed_service_base_url: Some(allowed),
            }),
        }
    }

    /// The `name` this error serializes as on the wire.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::Duplicate(_) => "DuplicateError",
            Self::NotFound(_) => "NotFoundError",
            Self::InvalidState(_) => "InvalidStateError",
            Self::Timeout(_) => "TimeoutError",
        }
    }

    /// Convert to the wire envelope returned by [`crate::validate`].
    #[must_use]
    pub fn into_envelope(self) -> ErrorEnvelope {
        let name = self.name();
        let details = match &self {
            Self::Validation { details, .. } => details.clone(),
            _ => None,
        };
        ErrorEnvelope {
            name: name.to_string(),
            message: self.to_string(),
            details,
        }
    }
}

/// Structured detail payload attached to a [`ValidationError`](Error::Validation).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    /// Present when the failure originated in proof verification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_verify_result: Option<ProofVerifyResult>,

    /// Present when the failure originated in the service-endpoint policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_service_base_url: Option<Vec<String>>,
}

/// Result of attempting to verify a capability-invocation proof.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProofVerifyResult {
    /// Whether the proof verified successfully.
    pub verified: bool,

    /// Errors encountered while attempting verification. Callers
    /// pattern-match on `error[0].message`, so message text is preserved
    /// verbatim from the point of failure.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub error: Vec<ProofVerifyError>,
}

/// A single proof-verification failure.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProofVerifyError {
    /// Human-readable message. Exact wording matters to callers.
    pub message: String,

    /// HTTP status code analogue, where one applies (e.g. 404 for a
    /// dereference miss).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status_code: Option<u16>,
}

/// The wire-level result of [`crate::validate`].
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ErrorEnvelope {
    /// One of `ValidationError`, `DuplicateError`, `NotFoundError`,
    /// `InvalidStateError`, `TimeoutError`.
    pub name: String,

    /// Human-readable message.
    pub message: String,

    /// Structured detail payload, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

/// Convenience result alias used throughout the crate's internals.
pub type Result<T> = std::result::Result<T, Error>;
