//! # Document loader
//!
//! The sole ledger read path used during verification. Resolves a DID or a
//! `<did>#<fragment>` reference to a JSON document, read-through against the
//! injected [`LedgerView`].
//!
//! Per SPEC_FULL.md §4.4/§5, loads are memoized for the duration of one
//! [`crate::validate::validate`] call and the memo is discarded when the
//! call returns — callers construct a fresh [`Loader`] per call.
//!
//! Context-URL resolution (SPEC_FULL.md §4.4's "if `url` is a known JSON-LD
//! context URL, return a built-in copy") is out of scope for this loader:
//! see DESIGN.md for why.

use std::future::Future;
use std::time::Duration;

use dashmap::DashMap;

use crate::document::DidDocument;
use crate::error::{Error, Result};

/// A read-only view of the ledger at a fixed `basisBlockHeight`.
///
/// Implementors back this with whatever storage engine the node uses; the
/// validator only ever calls [`LedgerView::get_record`].
pub trait LedgerView: Send + Sync {
    /// Look up the current DID document for `did`, or `None` if it has never
    /// been created (or was created after this view's `basisBlockHeight`).
    fn get_record(&self, did: &str) -> impl Future<Output = Result<Option<DidDocument>>> + Send;
}

/// Resolves DIDs and key-id fragments during one
/// [`crate::validate::validate`] call.
pub struct Loader<'a, L: LedgerView> {
    ledger: &'a L,
    deadline: Option<Duration>,
    cache: DashMap<String, DidDocument>,
}

impl<'a, L: LedgerView> Loader<'a, L> {
    /// Construct a loader over `ledger` with no per-call deadline.
    #[must_use]
    pub fn new(ledger: &'a L) -> Self {
        Self {
            ledger,
            deadline: None,
            cache: DashMap::new(),
        }
    }

    /// Construct a loader with a deadline applied to every ledger read.
    #[must_use]
    pub fn with_deadline(ledger: &'a L, deadline: Duration) -> Self {
        Self {
            ledger,
            deadline: Some(deadline),
            cache: DashMap::new(),
        }
    }

    /// Load the current DID document for `did`, memoizing within this
    /// loader's lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the DID has no record on the ledger,
    /// or [`Error::Timeout`] if a configured deadline elapses first.
    pub async fn load_did(&self, did: &str) -> Result<DidDocument> {
        if let Some(doc) = self.cache.get(did) {
            return Ok(doc.clone());
        }
        let record = self.fetch(did).await?;
        let Some(doc) = record else {
            return Err(Error::NotFound(format!("no record found for '{did}'")));
        };
        self.cache.insert(did.to_string(), doc.clone());
        Ok(doc)
    }

    /// Like [`Loader::load_did`] but returns `None` instead of
    /// [`Error::NotFound`] when absent (used for duplicate checks, where
    /// absence is the expected, non-error case).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if a configured deadline elapses.
    pub async fn try_load_did(&self, did: &str) -> Result<Option<DidDocument>> {
        if let Some(doc) = self.cache.get(did) {
            return Ok(Some(doc.clone()));
        }
        let record = self.fetch(did).await?;
        if let Some(doc) = &record {
            self.cache.insert(did.to_string(), doc.clone());
        }
        Ok(record)
    }

    /// Seed the cache with a document that has no ledger record yet — used
    /// so a create operation's capability-invocation proof can resolve
    /// against the record it is creating, before [`LedgerView`] knows about
    /// it.
    pub fn prime(&self, did: &str, doc: DidDocument) {
        self.cache.insert(did.to_string(), doc);
    }

    /// Resolve a `<did>#<fragment>` verification-method reference to the
    /// owning document, loading it via [`Loader::load_did`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the referenced DID has no record, or
    /// if `key_url` has no fragment at all.
    pub async fn load_key_owner(&self, key_url: &str) -> Result<DidDocument> {
        let Some((did, _fragment)) = key_url.split_once('#') else {
            return Err(Error::NotFound(format!("'{key_url}' is not a DID URL with a fragment")));
        };
        self.load_did(did).await
    }

    async fn fetch(&self, did: &str) -> Result<Option<DidDocument>> {
        match self.deadline {
            None => self.ledger.get_record(did).await,
            Some(deadline) => match tokio::time::timeout(deadline, self.ledger.get_record(did)).await {
                Ok(result) => result,
                Err(_elapsed) => Err(Error::Timeout(did.to_string())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DidDocument;

    struct FakeLedger {
        docs: std::collections::HashMap<String, DidDocument>,
    }

    impl LedgerView for FakeLedger {
        async fn get_record(&self, did: &str) -> Result<Option<DidDocument>> {
            Ok(self.docs.get(did).cloned())
        }
    }

    fn doc(id: &str) -> DidDocument {
        DidDocument {
            id: id.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn loads_and_memoizes() {
        let ledger = FakeLedger {
            docs: [("did:v1:nym:abc".to_string(), doc("did:v1:nym:abc"))].into_iter().collect(),
        };
        let loader = Loader::new(&ledger);
        let first = loader.load_did("did:v1:nym:abc").await.expect("should load");
        let second = loader.load_did("did:v1:nym:abc").await.expect("should load from cache");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let ledger = FakeLedger {
            docs: std::collections::HashMap::new(),
        };
        let loader = Loader::new(&ledger);
        let err = loader.load_did("did:v1:nym:missing").await.expect_err("should 404");
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn try_load_returns_none_when_absent() {
        let ledger = FakeLedger {
            docs: std::collections::HashMap::new(),
        };
        let loader = Loader::new(&ledger);
        let result = loader.try_load_did("did:v1:nym:missing").await.expect("should not error");
        assert!(result.is_none());
    }
}
