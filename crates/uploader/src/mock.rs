//! In-memory collaborators for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use parcel_protocol::messages::{
    AbortRequest, AbortResponse, CompleteRequest, CompleteResponse, InitiateRequest,
    InitiateResponse, SignedUrlRequest, SignedUrlResponse,
};

use crate::control::{ControlPlane, PutResponse, StorageBackend, TransportFuture};
use crate::error::TransportError;

/// A recorded control-plane call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Initiate(InitiateRequest),
    SignedUrl(SignedUrlRequest),
    Complete(CompleteRequest),
    Abort(AbortRequest),
}

/// Control plane that hands out `u1`/`k1` and records every call.
#[derive(Default)]
pub struct MockControl {
    pub calls: Mutex<Vec<Call>>,
    pub fail_initiate: bool,
    pub fail_complete: bool,
    pub fail_abort: bool,
    /// Time the server takes to answer initiate.
    pub initiate_delay: Option<Duration>,
    /// Part numbers whose signing always fails.
    pub fail_sign: HashSet<u32>,
}

impl MockControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn complete_calls(&self) -> Vec<CompleteRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Complete(req) => Some(req),
                _ => None,
            })
            .collect()
    }

    pub fn abort_calls(&self) -> Vec<AbortRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Abort(req) => Some(req),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn server_error() -> TransportError {
    TransportError::Status {
        status: 500,
        body: "Internal Server Error".into(),
    }
}

impl ControlPlane for MockControl {
    fn initiate(&self, req: InitiateRequest) -> TransportFuture<'_, InitiateResponse> {
        Box::pin(async move {
            self.record(Call::Initiate(req));
            if let Some(delay) = self.initiate_delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_initiate {
                return Err(server_error());
            }
            Ok(InitiateResponse {
                upload_id: "u1".into(),
                key: "k1".into(),
            })
        })
    }

    fn signed_url(&self, req: SignedUrlRequest) -> TransportFuture<'_, SignedUrlResponse> {
        Box::pin(async move {
            let part = req.part_number;
            let url = format!(
                "mock://storage/{}?uploadId={}&partNumber={part}",
                req.key, req.upload_id
            );
            self.record(Call::SignedUrl(req));
            if self.fail_sign.contains(&part) {
                return Err(TransportError::Request("connection refused".into()));
            }
            Ok(SignedUrlResponse { signed_url: url })
        })
    }

    fn complete(&self, req: CompleteRequest) -> TransportFuture<'_, CompleteResponse> {
        Box::pin(async move {
            let key = req.key.clone();
            self.record(Call::Complete(req));
            if self.fail_complete {
                return Err(server_error());
            }
            Ok(CompleteResponse {
                location: format!("http://storage.local/uploads/{key}"),
                bucket: "uploads".into(),
                key,
                etag: "final-etag".into(),
            })
        })
    }

    fn abort(&self, req: AbortRequest) -> TransportFuture<'_, AbortResponse> {
        Box::pin(async move {
            self.record(Call::Abort(req));
            if self.fail_abort {
                return Err(server_error());
            }
            Ok(AbortResponse { ok: true })
        })
    }
}

/// How the mock storage answers one part.
#[derive(Debug, Clone)]
pub enum PartBehavior {
    /// Always answer with this HTTP status and no ETag.
    Status(u16),
    /// Answer 200 without an ETag header.
    MissingEtag,
    /// Fail the first `n` attempts with a 503, then succeed.
    FailTimes(usize),
}

/// Received part body.
#[derive(Debug, Clone, PartialEq)]
pub struct Received {
    pub part_number: u32,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Storage backend that answers `"<token>"` ETags and tracks concurrency.
#[derive(Default)]
pub struct MockStorage {
    /// ETag per part; defaults to `etag-<n>`.
    pub tokens: HashMap<u32, String>,
    pub behaviors: HashMap<u32, PartBehavior>,
    /// Delay per part before answering.
    pub delays: HashMap<u32, Duration>,
    pub received: Mutex<Vec<Received>>,
    attempts: Mutex<HashMap<u32, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: &[(u32, &str)]) -> Self {
        Self {
            tokens: tokens.iter().map(|(n, t)| (*n, t.to_string())).collect(),
            ..Self::default()
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn attempts(&self, part_number: u32) -> usize {
        self.attempts
            .lock()
            .unwrap()
            .get(&part_number)
            .copied()
            .unwrap_or(0)
    }

    pub fn received(&self) -> Vec<Received> {
        let mut r = self.received.lock().unwrap().clone();
        r.sort_by_key(|p| p.part_number);
        r
    }
}

/// Extracts the part number from a mock signed URL.
fn part_from_url(url: &str) -> Result<u32, TransportError> {
    url.rsplit_once("partNumber=")
        .and_then(|(_, n)| n.parse().ok())
        .ok_or_else(|| TransportError::InvalidResponse(format!("bad url {url}")))
}

impl StorageBackend for MockStorage {
    fn put_part(
        &self,
        url: String,
        body: Bytes,
        content_type: String,
    ) -> TransportFuture<'_, PutResponse> {
        Box::pin(async move {
            let part = match part_from_url(&url) {
                Ok(part) => part,
                Err(e) => return Err(e),
            };
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(delay) = self.delays.get(&part) {
                tokio::time::sleep(*delay).await;
            } else {
                tokio::task::yield_now().await;
            }

            let attempt = {
                let mut attempts = self.attempts.lock().unwrap();
                let n = attempts.entry(part).or_insert(0);
                *n += 1;
                *n
            };
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let failure = match self.behaviors.get(&part) {
                Some(PartBehavior::Status(status)) => Some(*status),
                Some(PartBehavior::MissingEtag) => {
                    return Ok(PutResponse {
                        status: 200,
                        etag: None,
                        body: String::new(),
                    });
                }
                Some(PartBehavior::FailTimes(n)) if attempt <= *n => Some(503),
                _ => None,
            };
            if let Some(status) = failure {
                return Ok(PutResponse {
                    status,
                    etag: None,
                    body: format!("status {status}"),
                });
            }

            self.received.lock().unwrap().push(Received {
                part_number: part,
                bytes: body.to_vec(),
                content_type,
            });
            let token = self
                .tokens
                .get(&part)
                .cloned()
                .unwrap_or_else(|| format!("etag-{part}"));
            Ok(PutResponse {
                status: 200,
                etag: Some(format!("\"{token}\"")),
                body: String::new(),
            })
        })
    }
}
