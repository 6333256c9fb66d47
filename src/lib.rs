//! # veres-validator
//!
//! Operation validator for a Veres One–style decentralized identifier (DID)
//! ledger. Given a signed create or update operation, [`validate::validate`]
//! decides, deterministically, whether it is well-formed, cryptographically
//! authorized, and consistent with the ledger's current view of the named
//! DID — without mutating anything itself.
//!
//! ```text
//! validate() -> (schema + cryptonym binding) -> (load current state)
//!            -> (capability-invocation proof verification)
//!            -> (for update: patch + re-validate) -> (service policy) -> result
//! ```
//!
//! The validator is a pure function of its arguments plus an injected
//! read-only [`loader::LedgerView`]; it holds no state, no cache across
//! calls, and never throws — every failure mode surfaces as a
//! [`validate::ValidationResult`].

pub mod config;
pub mod did;
pub mod document;
pub mod error;
pub mod loader;
pub mod multibase;
pub mod operation;
pub mod patch;
pub mod policy;
pub mod proof;
pub mod validate;

pub use config::Environment;
pub use document::DidDocument;
pub use error::{Error, ErrorEnvelope};
pub use loader::LedgerView;
pub use operation::{CreateRecord, Operation, UpdateRecord, ValidatorConfig};
pub use validate::{validate, ValidateRequest, ValidationResult};
