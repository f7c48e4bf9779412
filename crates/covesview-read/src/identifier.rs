//! Resolves the various forms a community identifier can take in a request
//! path into a DID, per spec 4.8.

use covesview_core::error::{AppError, AppResult};
use covesview_core::traits::RecordStore;
use covesview_core::types::Community;

/// Resolve an identifier to a DID. `instance_host` is this AppView's
/// configured host, used to validate the scoped `!<name>@<host>` form.
pub async fn resolve_identifier(
    store: &dyn RecordStore,
    raw: &str,
    instance_host: &str,
) -> AppResult<String> {
    Ok(resolve_community(store, raw, instance_host).await?.did)
}

/// As [`resolve_identifier`], but returns the full indexed community.
pub async fn resolve_community(
    store: &dyn RecordStore,
    raw: &str,
    instance_host: &str,
) -> AppResult<Community> {
    let trimmed = raw.trim();

    if trimmed.starts_with("did:") {
        return store
            .get_community_by_did(trimmed)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no community with did {trimmed}")));
    }

    if let Some(rest) = trimmed.strip_prefix('@') {
        return lookup_by_handle(store, &rest.to_lowercase()).await;
    }

    if let Some(rest) = trimmed.strip_prefix('!') {
        let (name, host) = rest
            .split_once('@')
            .ok_or_else(|| AppError::Validation(scoped_form_error()))?;
        if !is_valid_dns_label(name) {
            return Err(AppError::Validation(scoped_form_error()));
        }
        let host = host.to_lowercase();
        if !is_valid_dns_name(&host) || host != instance_host.to_lowercase() {
            return Err(AppError::Validation(scoped_form_error()));
        }
        let handle = format!("c-{name}.{host}");
        return lookup_by_handle(store, &handle).await;
    }

    if trimmed.contains('.') {
        return lookup_by_handle(store, &trimmed.to_lowercase()).await;
    }

    Err(AppError::Validation(
        "identifier must be a DID, handle, or scoped identifier".to_string(),
    ))
}

fn scoped_form_error() -> String {
    "scoped identifier must be !<name>@<host> with a valid DNS label and this instance's host".to_string()
}

async fn lookup_by_handle(store: &dyn RecordStore, handle: &str) -> AppResult<Community> {
    store
        .get_community_by_name(handle)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no community with handle {handle}")))
}

fn is_valid_dns_label(label: &str) -> bool {
    if label.is_empty() || label.len() > 63 {
        return false;
    }
    if label.starts_with('-') || label.ends_with('-') {
        return false;
    }
    label
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

fn is_valid_dns_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 253 {
        return false;
    }
    name.split('.').all(is_valid_dns_label)
}
