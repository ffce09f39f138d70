//! Remote blob-service document backend.
//!
//! Documents live at `{base_url}/{key}.{ext}`; that URL is the reference
//! stored on the staff record. The service is spoken to with plain HTTP:
//! `PUT` to store, `GET` to fetch, `DELETE` to release.
//!
//! Some services answer a `GET` with a JSON metadata document describing the
//! asset instead of the asset itself. [`RemoteDocumentStore::resolve`]
//! detects that by content type and follows the `secure_url` (or `url`)
//! field once. Anything else is reported as unavailable rather than handed
//! back as document bytes.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DocumentError, Result};
use crate::reference::{content_type_for, document_extension, document_name, is_pending};
use crate::store::{DocumentStore, ResolvedDocument};

/// Connection settings for the remote blob service.
#[derive(Clone, Debug)]
pub struct RemoteConfig {
    /// Base URL documents are stored under, without trailing slash.
    pub base_url: String,
    /// Bearer credential sent with requests under `base_url`.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Metadata document some services return in place of the asset.
#[derive(Debug, Deserialize)]
struct AssetMetadata {
    secure_url: Option<String>,
    url: Option<String>,
}

impl AssetMetadata {
    fn asset_url(self) -> Option<String> {
        self.secure_url
            .or(self.url)
            .filter(|u| !u.trim().is_empty())
    }
}

#[derive(Clone, Debug)]
pub struct RemoteDocumentStore {
    config: RemoteConfig,
    client: Client,
}

impl RemoteDocumentStore {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn locator(&self, name: &str) -> String {
        format!("{}/{}", self.config.base_url, name)
    }

    fn owns(&self, reference: &str) -> bool {
        reference
            .strip_prefix(&self.config.base_url)
            .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1)
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    /// The bearer credential only goes to URLs under our own base; an asset
    /// link from a metadata document may point anywhere.
    async fn fetch(&self, url: &str) -> Result<(Bytes, Option<String>)> {
        let mut req = self.client.get(url);
        if self.owns(url) {
            req = self.authorized(req);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DocumentError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(DocumentError::Unavailable(format!(
                "GET {} returned {}",
                url, status
            )));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let data = resp.bytes().await?;
        Ok((data, content_type))
    }
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| {
        let essence = ct.split(';').next().unwrap_or("").trim();
        essence.eq_ignore_ascii_case("application/json") || essence.ends_with("+json")
    })
}

#[async_trait]
impl DocumentStore for RemoteDocumentStore {
    fn backend_name(&self) -> &'static str {
        "remote"
    }

    async fn put(
        &self,
        tenant_id: i64,
        staff_id: i64,
        data: Bytes,
        filename: &str,
    ) -> Result<String> {
        let ext = document_extension(filename)?;
        let name = document_name(tenant_id, staff_id, &ext);
        let url = self.locator(&name);
        let size = data.len();

        let resp = self
            .authorized(self.client.put(&url))
            .header(CONTENT_TYPE, content_type_for(&name))
            .body(data)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(DocumentError::Unavailable(format!(
                "PUT {} returned {}",
                url,
                resp.status()
            )));
        }

        info!("[Documents] Uploaded {} ({} bytes) to remote store", name, size);
        Ok(url)
    }

    async fn delete(&self, reference: &str) -> Result<()> {
        if is_pending(reference) {
            return Ok(());
        }
        if !self.owns(reference) {
            debug!("[Documents] Ignoring delete of foreign reference {:?}", reference);
            return Ok(());
        }

        let resp = self
            .authorized(self.client.delete(reference))
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            info!("[Documents] Released remote document {}", reference);
            Ok(())
        } else {
            Err(DocumentError::Unavailable(format!(
                "DELETE {} returned {}",
                reference, status
            )))
        }
    }

    async fn resolve(&self, reference: &str) -> Result<ResolvedDocument> {
        if is_pending(reference) || !self.owns(reference) {
            return Err(DocumentError::NotFound(reference.to_string()));
        }

        let (data, content_type) = self.fetch(reference).await?;
        if !is_json(content_type.as_deref()) {
            return Ok(ResolvedDocument {
                data,
                content_type: content_type_for(reference).to_string(),
            });
        }

        // Metadata in place of the asset: follow the link exactly once.
        let asset_url = serde_json::from_slice::<AssetMetadata>(&data)
            .ok()
            .and_then(AssetMetadata::asset_url)
            .ok_or_else(|| {
                warn!(
                    "[Documents] Metadata for {} carries no asset link",
                    reference
                );
                DocumentError::Unavailable(format!(
                    "remote service returned metadata without an asset link for {}",
                    reference
                ))
            })?;

        debug!("[Documents] Following metadata indirection to {}", asset_url);
        let (data, content_type) = self.fetch(&asset_url).await?;
        if is_json(content_type.as_deref()) {
            return Err(DocumentError::Unavailable(format!(
                "remote service returned metadata twice for {}",
                reference
            )));
        }

        Ok(ResolvedDocument {
            data,
            content_type: content_type_for(reference).to_string(),
        })
    }
}
