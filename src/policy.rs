//! # Service-endpoint policy
//!
//! An optional, per-ledger allowlist of service-endpoint base URLs. When a
//! `validatorParameterSet` DID is configured, every service descriptor in
//! the document under validation must point at one of that DID's
//! `allowedServiceBaseUrl` prefixes; otherwise the ledger runs in permissive
//! mode and admits any well-formed service descriptor.

use url::Url;

use crate::document::DidDocument;
use crate::error::{Error, Result};
use crate::loader::{Loader, LedgerView};

/// Check every service descriptor in `doc` against the ledger's configured
/// `validatorParameterSet`, if any.
///
/// # Errors
///
/// Returns [`Error::InvalidState`] if `validator_parameter_set` is configured
/// but absent from the ledger, or [`Error::validation`] (with
/// `details.allowedServiceBaseUrl` populated) if any service endpoint falls
/// outside the allowlist.
pub async fn check_service_policy<L: LedgerView>(
    doc: &DidDocument, validator_parameter_set: Option<&str>, loader: &Loader<'_, L>,
) -> Result<()> {
    let Some(parameter_set_did) = validator_parameter_set else {
        return Ok(());
    };

    let owner = loader.load_did(parameter_set_did).await.map_err(|_| {
        Error::InvalidState(format!("validatorParameterSet '{parameter_set_did}' has no ledger record"))
    })?;
    let allowed = owner.allowed_service_base_url.clone().unwrap_or_default();

    for service in &doc.service {
        if !is_allowed(&service.service_endpoint, &allowed) {
            return Err(Error::service_policy(
                format!("service endpoint '{}' is not within an allowed base URL", service.service_endpoint),
                allowed.clone(),
            ));
        }
    }
    Ok(())
}

fn is_allowed(endpoint: &str, allowed_bases: &[String]) -> bool {
    let Ok(endpoint_url) = Url::parse(endpoint) else {
        return false;
    };
    allowed_bases.iter().any(|base| base_matches(&endpoint_url, base))
}

fn base_matches(endpoint_url: &Url, base: &str) -> bool {
    let Ok(base_url) = Url::parse(base) else {
        return false;
    };
    if endpoint_url.scheme() != base_url.scheme() || endpoint_url.host_str() != base_url.host_str() {
        return false;
    }
    if base_url.port() != endpoint_url.port() {
        return false;
    }
    endpoint_url.path().starts_with(base_url.path())
}
