//! Signed-URL part storage over HTTP `PUT`.

use std::time::Duration;

use bytes::Bytes;
use parcel_protocol::constants::ETAG_HEADER;
use parcel_uploader::{PutResponse, StorageBackend, TransportError, TransportFuture};
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::Error;

/// PUTs part bodies straight to the object store.
pub struct HttpStorage {
    http: reqwest::Client,
}

impl HttpStorage {
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Uploads `body` to `url`.
    ///
    /// Every HTTP answer is returned as-is; only transport failures are
    /// errors. The response text is kept for failed statuses only.
    pub async fn put(
        &self,
        url: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<PutResponse, Error> {
        let len = body.len();
        let resp = self
            .http
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;
        let status = resp.status();
        let etag = resp
            .headers()
            .get(ETAG_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        debug!(status = status.as_u16(), bytes = len, "part PUT answered");

        let body = if status.is_success() {
            String::new()
        } else {
            resp.text().await.unwrap_or_default()
        };
        Ok(PutResponse {
            status: status.as_u16(),
            etag,
            body,
        })
    }
}

impl StorageBackend for HttpStorage {
    fn put_part(
        &self,
        url: String,
        body: Bytes,
        content_type: String,
    ) -> TransportFuture<'_, PutResponse> {
        Box::pin(async move {
            self.put(&url, body, &content_type)
                .await
                .map_err(TransportError::from)
        })
    }
}
