//! Control-plane client over JSON `POST`.

use std::time::Duration;

use parcel_protocol::Command;
use parcel_protocol::messages::{
    AbortRequest, AbortResponse, CompleteRequest, CompleteResponse, InitiateRequest,
    InitiateResponse, SignedUrlRequest, SignedUrlResponse,
};
use parcel_uploader::{ControlPlane, TransportError, TransportFuture};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::Error;

/// Talks to the upload server's `/api/upload/*` routes.
pub struct HttpControlPlane {
    http: reqwest::Client,
    base_url: String,
}

impl HttpControlPlane {
    /// Creates a client for the server at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::InvalidUrl(base_url.to_string()));
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Posts `body` as JSON to the route of `command`, returning the raw
    /// response body.
    async fn post<T: Serialize>(&self, command: Command, body: &T) -> Result<Vec<u8>, Error> {
        let url = format!("{}{}", self.base_url, command.route());
        debug!(command = %command, url = %url, "control plane request");
        let resp = self.http.post(&url).json(body).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.bytes().await?.to_vec())
    }

    async fn call<T: Serialize, R: DeserializeOwned>(
        &self,
        command: Command,
        body: &T,
    ) -> Result<R, Error> {
        let body = self.post(command, body).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn initiate_upload(&self, req: &InitiateRequest) -> Result<InitiateResponse, Error> {
        self.call(Command::Initiate, req).await
    }

    pub async fn get_signed_url(&self, req: &SignedUrlRequest) -> Result<SignedUrlResponse, Error> {
        self.call(Command::SignUrl, req).await
    }

    pub async fn complete_upload(&self, req: &CompleteRequest) -> Result<CompleteResponse, Error> {
        self.call(Command::Complete, req).await
    }

    /// Aborts a session. An empty 2xx body counts as acknowledged.
    pub async fn abort_upload(&self, req: &AbortRequest) -> Result<AbortResponse, Error> {
        let body = self.post(Command::Abort, req).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(AbortResponse::default());
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

impl ControlPlane for HttpControlPlane {
    fn initiate(&self, req: InitiateRequest) -> TransportFuture<'_, InitiateResponse> {
        Box::pin(async move { self.initiate_upload(&req).await.map_err(TransportError::from) })
    }

    fn signed_url(&self, req: SignedUrlRequest) -> TransportFuture<'_, SignedUrlResponse> {
        Box::pin(async move { self.get_signed_url(&req).await.map_err(TransportError::from) })
    }

    fn complete(&self, req: CompleteRequest) -> TransportFuture<'_, CompleteResponse> {
        Box::pin(async move { self.complete_upload(&req).await.map_err(TransportError::from) })
    }

    fn abort(&self, req: AbortRequest) -> TransportFuture<'_, AbortResponse> {
        Box::pin(async move { self.abort_upload(&req).await.map_err(TransportError::from) })
    }
}
