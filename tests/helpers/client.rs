use multipart_file_upload::SendRequest;
use multipart_file_upload::error::{Error, Result};
use multipart_file_upload::request::*;

use bytes::{Bytes, BytesMut};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const UPLOAD_ID: &str = "mock-upload-id";
pub const OBJECT_ETAG: &str = "mock-object-etag";

/// How a part request is made to fail.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    /// Fail every attempt with an error that is not retried.
    Permanent,
    /// Fail the next `n` attempts with an error that is retried.
    Transient(u32),
}

/// In-memory stand-in for the storage service.
///
/// Stores the bodies of uploaded parts and assembles the object on complete.
#[derive(Debug, Default)]
pub struct MockClient {
    pub creates: AtomicUsize,
    pub part_requests: AtomicUsize,
    pub completes: AtomicUsize,
    pub aborts: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    in_flight: AtomicUsize,
    fail_create: bool,
    fail_complete: bool,
    fail_abort: bool,
    failures: Mutex<HashMap<i32, Failure>>,
    delay: Option<fn(i32) -> Duration>,
    parts: Mutex<HashMap<i32, Bytes>>,
    finished: Mutex<Vec<i32>>,
    manifest: Mutex<Vec<(i32, String)>>,
    object: Mutex<Option<Bytes>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_create(self) -> Self {
        Self {
            fail_create: true,
            ..self
        }
    }

    pub fn fail_complete(self) -> Self {
        Self {
            fail_complete: true,
            ..self
        }
    }

    pub fn fail_abort(self) -> Self {
        Self {
            fail_abort: true,
            ..self
        }
    }

    pub fn fail_part(self, part: i32, failure: Failure) -> Self {
        self.failures.lock().unwrap().insert(part, failure);
        self
    }

    /// Delay every part request by an amount depending on its part number.
    pub fn with_delay(self, delay: fn(i32) -> Duration) -> Self {
        Self {
            delay: Some(delay),
            ..self
        }
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Part numbers in the order their requests succeeded.
    pub fn finish_order(&self) -> Vec<i32> {
        self.finished.lock().unwrap().clone()
    }

    /// Part numbers and entity tags of the last complete request.
    pub fn manifest(&self) -> Vec<(i32, String)> {
        self.manifest.lock().unwrap().clone()
    }

    /// The assembled object, if the upload was completed.
    pub fn object(&self) -> Option<Bytes> {
        self.object.lock().unwrap().clone()
    }

    fn injected_failure(&self, part: i32) -> Option<Error> {
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(&part)? {
            Failure::Permanent => Some(Error::from_dyn(std::io::Error::other(format!(
                "injected permanent failure of part {part}"
            )))),
            Failure::Transient(0) => None,
            Failure::Transient(n) => {
                *n -= 1;
                Some(Error::retryable(std::io::Error::other(format!(
                    "injected transient failure of part {part}"
                ))))
            }
        }
    }
}

impl SendRequest for MockClient {
    async fn send_create_upload_request(&self, req: CreateRequest) -> Result<UploadData> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.fail_create {
            return Err(Error::from_dyn(std::io::Error::other("access denied")));
        }
        Ok(UploadData::new(UPLOAD_ID, req.uri().clone()))
    }

    async fn send_new_part_upload_request(&self, req: UploadPartRequest) -> Result<CompletedPart> {
        self.part_requests.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let n = *req.part_number();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay(n)).await;
        }
        let res = match self.injected_failure(n) {
            Some(e) => Err(e),
            None => {
                let body = Bytes::copy_from_slice(req.body());
                let etag = EntityTag::from(format!("etag-{n}-{}", body.len()));
                self.parts.lock().unwrap().insert(n, body);
                self.finished.lock().unwrap().push(n);
                Ok(CompletedPart::new(
                    etag,
                    req.part_number(),
                    req.body().size() as u64,
                ))
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        res
    }

    async fn send_complete_upload_request(&self, req: CompleteRequest) -> Result<CompletedUpload> {
        self.completes.fetch_add(1, Ordering::SeqCst);
        let manifest: Vec<(i32, String)> = req
            .completed_parts()
            .iter()
            .map(|p| (*p.part_number, p.etag.to_string()))
            .collect();
        *self.manifest.lock().unwrap() = manifest.clone();

        if self.fail_complete {
            return Err(Error::from_dyn(std::io::Error::other("invalid part order")));
        }

        let parts = self.parts.lock().unwrap();
        let mut object = BytesMut::new();
        for (n, _) in &manifest {
            let Some(body) = parts.get(n) else {
                return Err(Error::from_dyn(std::io::Error::other("unknown part")));
            };
            object.extend_from_slice(body);
        }
        *self.object.lock().unwrap() = Some(object.freeze());

        Ok(CompletedUpload::new(
            req.uri().clone(),
            EntityTag::from(OBJECT_ETAG),
        ))
    }

    async fn send_abort_upload_request(&self, req: AbortRequest) -> Result<()> {
        self.aborts.fetch_add(1, Ordering::SeqCst);
        assert_eq!(&**req.id(), UPLOAD_ID);
        if self.fail_abort {
            return Err(Error::from_dyn(std::io::Error::other("service unavailable")));
        }
        Ok(())
    }
}
