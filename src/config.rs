//! # Configuration
//!
//! The validator's only ambient configuration is which DID pattern
//! (`did:v1:...` vs `did:v1:test:...`) is accepted, selected once via the
//! `VALIDATOR_ENV` environment variable, plus a table of legacy
//! `capabilityAction` synonyms. Neither is ever mutated once constructed: no
//! singletons, no hot reload.

use std::collections::HashSet;
use std::env;

/// The environment the validator is running in.
///
/// Selects which DID pattern [`crate::did::parse_did`] accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    /// Production: DIDs look like `did:v1:nym:<fingerprint>`.
    #[default]
    Prod,

    /// Test: DIDs look like `did:v1:test:nym:<fingerprint>`.
    Test,
}

impl Environment {
    /// Read `VALIDATOR_ENV` once and resolve an [`Environment`].
    ///
    /// Defaults to [`Environment::Prod`] if the variable is unset or holds
    /// any value other than `test`.
    #[must_use]
    pub fn from_env() -> Self {
        match env::var("VALIDATOR_ENV").as_deref() {
            Ok("test") => Self::Test,
            _ => Self::Prod,
        }
    }
}

/// Table of `capabilityAction` strings accepted as synonyms for the
/// canonical `create`/`update` actions.
///
/// Earlier testnets used `RegisterDid`/`UpdateDidDocument`; this table keeps
/// the canonical-action check (SPEC_FULL.md §4.9) from hard-coding that
/// history.
#[derive(Clone, Debug)]
pub struct ActionSynonyms {
    create: HashSet<String>,
    update: HashSet<String>,
}

impl Default for ActionSynonyms {
    fn default() -> Self {
        Self {
            create: ["create", "RegisterDid"].map(String::from).into_iter().collect(),
            update: ["update", "UpdateDidDocument"].map(String::from).into_iter().collect(),
        }
    }
}

impl ActionSynonyms {
    /// Returns `true` if `action` is an accepted synonym for `create`.
    #[must_use]
    pub fn is_create(&self, action: &str) -> bool {
        self.create.contains(action)
    }

    /// Returns `true` if `action` is an accepted synonym for `update`.
    #[must_use]
    pub fn is_update(&self, action: &str) -> bool {
        self.update.contains(action)
    }
}
