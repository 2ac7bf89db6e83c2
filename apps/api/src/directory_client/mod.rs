/// Directory Client — read access to tenant-scoped records (jobs, candidates,
/// departments, test sessions) for the list endpoints.
use std::time::Duration;

use reqwest::{Client, Url};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::listing::Resource;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Expected a JSON array from {path}")]
    NotAList { path: String },

    #[error("Invalid directory service URL: {0}")]
    InvalidUrl(String),
}

#[derive(Clone)]
pub struct DirectoryClient {
    client: Client,
    base_url: Url,
}

impl DirectoryClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DirectoryError> {
        let base_url = Url::parse(base_url).map_err(|e| DirectoryError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(DirectoryError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
        })
    }

    /// Fetches every record of `resource` for a tenant. Filtering and paging
    /// happen locally in the list view-model.
    pub async fn fetch_records(
        &self,
        tenant_id: &str,
        resource: Resource,
    ) -> Result<Vec<Value>, DirectoryError> {
        let url = resource_url(&self.base_url, tenant_id, resource)?;
        let path = url.path().to_string();
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let records = unwrap_records(response.json().await?).ok_or(DirectoryError::NotAList { path })?;
        debug!("Fetched {} {} record(s) for tenant {tenant_id}", records.len(), resource.as_str());
        Ok(records)
    }
}

/// `{base}/tenants/{tenant_id}/{resource}`, with the tenant id encoded as a
/// single path segment.
fn resource_url(base: &Url, tenant_id: &str, resource: Resource) -> Result<Url, DirectoryError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| DirectoryError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(["tenants", tenant_id, resource.as_str()]);
    Ok(url)
}

/// Accepts a bare array or an array wrapped in a `data` envelope.
fn unwrap_records(body: Value) -> Option<Vec<Value>> {
    match body {
        Value::Array(records) => Some(records),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(records)) => Some(records),
            _ => None,
        },
        _ => None,
    }
}
