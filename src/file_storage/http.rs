//! # Remote Blob Backend
//!
//! REST client for a hosted blob store:
//! - list: `GET <base>?prefix=<key>` with bearer auth, JSON `{"blobs": [...]}`
//! - read: `GET <blob url>`, no auth
//! - write: `POST <base>` with bearer auth, multipart `file` + `pathname` +
//!   `access=public`; 200 or 201 is success
//!
//! Every call uses the client's fixed timeout. Nothing is retried.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{instrument, warn};

use super::backend::{BlobBackend, BlobEntry};
use super::errors::{BlobError, BlobResult};

/// Default hosted blob endpoint
pub const DEFAULT_BLOB_BASE_URL: &str = "https://blob.vercel-storage.com";

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    blobs: Vec<BlobEntry>,
}

/// Blob backend talking to the hosted blob REST API
pub struct HttpBlobBackend {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl HttpBlobBackend {
    /// Create a backend for `base_url`, authenticating with `token`
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> BlobResult<Self> {
        let token = token.into();
        if token.is_empty() {
            warn!("blob storage token is not set, writes will fail");
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn expect_status(
        operation: &'static str,
        status: StatusCode,
        accepted: &[StatusCode],
    ) -> BlobResult<()> {
        if accepted.contains(&status) {
            Ok(())
        } else {
            Err(BlobError::Status {
                operation,
                status: status.as_u16(),
            })
        }
    }
}

impl fmt::Debug for HttpBlobBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBlobBackend")
            .field("base_url", &self.base_url)
            .field("token", &(if self.token.is_empty() { "<unset>" } else { "<redacted>" }))
            .finish()
    }
}

#[async_trait]
impl BlobBackend for HttpBlobBackend {
    fn backend_tag(&self) -> &'static str {
        "http"
    }

    #[instrument(name = "blob_http_list", skip(self))]
    async fn list(&self, prefix: &str) -> BlobResult<Vec<BlobEntry>> {
        let resp = self
            .client
            .get(&self.base_url)
            .bearer_auth(&self.token)
            .query(&[("prefix", prefix)])
            .send()
            .await?;
        Self::expect_status("list", resp.status(), &[StatusCode::OK])?;
        let listing: ListResponse = resp.json().await?;
        Ok(listing.blobs)
    }

    #[instrument(name = "blob_http_read", skip(self, entry), fields(pathname = %entry.pathname))]
    async fn read(&self, entry: &BlobEntry) -> BlobResult<Vec<u8>> {
        let resp = self.client.get(&entry.url).send().await?;
        Self::expect_status("read", resp.status(), &[StatusCode::OK])?;
        Ok(resp.bytes().await?.to_vec())
    }

    #[instrument(name = "blob_http_write", skip(self, data), fields(bytes = data.len()))]
    async fn write(&self, pathname: &str, data: Vec<u8>) -> BlobResult<()> {
        if self.token.is_empty() {
            return Err(BlobError::MissingToken);
        }
        let file = Part::bytes(data)
            .file_name(pathname.to_string())
            .mime_str("application/json")?;
        // Keys contain '/', which must reach the server unescaped
        let form = Form::new()
            .percent_encode_noop()
            .part("file", file)
            .text("pathname", pathname.to_string())
            .text("access", "public");

        let resp = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;
        Self::expect_status("write", resp.status(), &[StatusCode::OK, StatusCode::CREATED])
    }
}
