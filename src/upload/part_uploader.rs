use crate::client::{SendRequest as _, UploadClient, UploadData};
use crate::error::{ErrorKind, ErrorRepr, Result};
use crate::plan::Part;
use crate::request::{CompletedPart, UploadPartRequest};
use crate::retry::{Exhausted, RetryPolicy, retry_loop};
use crate::source::ReadPart;

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Uploads single parts of one multipart upload.
///
/// The bytes of a part are read from the source once and resent on every
/// attempt the [`RetryPolicy`] allows.
pub struct PartUploader<S> {
    client: UploadClient,
    source: Arc<S>,
    data: UploadData,
    retry: RetryPolicy,
    verbose: bool,
}

impl<S: ReadPart> PartUploader<S> {
    /// Create an uploader for parts of the upload `data` read from `source`.
    pub fn new(client: UploadClient, source: Arc<S>, data: UploadData, retry: RetryPolicy) -> Self {
        Self {
            client,
            source,
            data,
            retry,
            verbose: false,
        }
    }

    /// Emit an event for every part and every retry.
    pub fn verbose(self, verbose: bool) -> Self {
        Self { verbose, ..self }
    }

    /// The upload parts are sent to.
    pub fn upload_data(&self) -> &UploadData {
        &self.data
    }

    /// Upload `part`, retrying transient failures.
    ///
    /// The part is abandoned as soon as `token` is cancelled, in which case
    /// the error has kind [`ErrorKind::Cancelled`]. Any other failure is
    /// reported as an [`ErrorKind::UploadPart`] error carrying the part
    /// number and the number of attempts made.
    pub async fn upload(&self, part: Part, token: CancellationToken) -> Result<CompletedPart> {
        let (id, uri) = (&self.data.id, &self.data.uri);
        if self.verbose {
            debug!(
                %id,
                part = %part.part_number,
                offset = part.offset,
                len = part.len,
                "reading part",
            );
        }

        let body = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(ErrorRepr::Cancelled)?,
            res = self.source.read_part(&part) => res,
        };
        let body = body.map_err(ErrorRepr::from_upload_err(id, uri, part.part_number, 0))?;

        let res = retry_loop(
            &self.retry,
            &token,
            |_| {
                let client = self.client.clone();
                let req = UploadPartRequest::new(&self.data, body.clone(), part.part_number);
                async move { client.send_new_part_upload_request(req).await }
            },
            |attempt, error, delay| {
                if self.verbose {
                    debug!(%id, part = %part.part_number, attempt, ?delay, %error, "retrying part");
                } else {
                    trace!(%id, part = %part.part_number, attempt, ?delay, %error, "retrying part");
                }
            },
        )
        .await;

        match res {
            Ok(completed) => {
                if self.verbose {
                    debug!(
                        %id,
                        part = %completed.part_number,
                        etag = %completed.etag,
                        size = completed.part_size,
                        "uploaded part",
                    );
                }
                Ok(completed)
            }
            Err(Exhausted { error, .. }) if error.kind() == ErrorKind::Cancelled => Err(error),
            Err(Exhausted { attempts, error }) => {
                warn!(%id, part = %part.part_number, attempts, %error, "part upload failed");
                Err(ErrorRepr::from_upload_err(id, uri, part.part_number, attempts)(error).into())
            }
        }
    }
}

impl<S> Clone for PartUploader<S> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            source: Arc::clone(&self.source),
            data: self.data.clone(),
            retry: self.retry,
            verbose: self.verbose,
        }
    }
}

impl<S> Debug for PartUploader<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartUploader")
            .field("client", &self.client)
            .field("data", &self.data)
            .field("retry", &self.retry)
            .field("verbose", &self.verbose)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::request::{AbortRequest, CompleteRequest, CompletedUpload, CreateRequest};
    use crate::error::Error;
    use crate::plan::PartPlan;
    use crate::request::EntityTag;
    use crate::retry::ExponentialBackoff;

    use bytes::Bytes;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Fails the first `failures` part requests with the given error.
    struct Flaky {
        failures: Mutex<u32>,
        error: fn() -> Error,
        bodies: Mutex<Vec<Vec<u8>>>,
    }

    impl Flaky {
        fn new(failures: u32, error: fn() -> Error) -> Self {
            Self {
                failures: Mutex::new(failures),
                error,
                bodies: Mutex::new(Vec::new()),
            }
        }
    }

    impl crate::client::SendRequest for Flaky {
        async fn send_create_upload_request(&self, _: CreateRequest) -> Result<UploadData> {
            unimplemented!()
        }

        async fn send_new_part_upload_request(
            &self,
            req: UploadPartRequest,
        ) -> Result<CompletedPart> {
            self.bodies.lock().unwrap().push(req.body().to_vec());
            {
                let mut failures = self.failures.lock().unwrap();
                if *failures > 0 {
                    *failures -= 1;
                    return Err((self.error)());
                }
            }
            let etag = EntityTag::from(format!("etag-{}", *req.part_number()));
            Ok(CompletedPart::new(etag, req.part_number(), req.body().size() as u64))
        }

        async fn send_complete_upload_request(&self, _: CompleteRequest) -> Result<CompletedUpload> {
            unimplemented!()
        }

        async fn send_abort_upload_request(&self, _: AbortRequest) -> Result<()> {
            unimplemented!()
        }
    }

    fn uploader(client: Arc<Flaky>, policy: RetryPolicy) -> (PartUploader<Bytes>, PartPlan) {
        let source = Bytes::from_static(b"hello multipart world");
        let plan = PartPlan::new(source.len() as u64, 8).unwrap();
        let data = UploadData::new("upload-1", ("bucket", "key").into());
        let uploader = PartUploader::new(UploadClient::new(client), Arc::new(source), data, policy);
        (uploader, plan)
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::default().backoff(ExponentialBackoff::new(
            Duration::from_millis(1),
            Duration::from_millis(1),
            1.0,
        ))
    }

    #[tokio::test]
    async fn uploads_the_bytes_of_the_part() {
        let client = Arc::new(Flaky::new(0, || unreachable!()));
        let (uploader, plan) = uploader(Arc::clone(&client), fast_retry());
        assert_eq!(&*uploader.upload_data().id, "upload-1");

        let completed = uploader.upload(plan[1], CancellationToken::new()).await.unwrap();
        assert_eq!(completed.part_number, plan[1].part_number);
        assert_eq!(completed.part_size, 8);
        assert_eq!(&*completed.etag, "etag-2");
        assert_eq!(client.bodies.lock().unwrap()[0], b"ltipart ");
    }

    #[tokio::test]
    async fn transient_failures_resend_the_same_body() {
        let client = Arc::new(Flaky::new(2, || {
            Error::retryable(std::io::Error::other("connection reset"))
        }));
        let (uploader, plan) = uploader(Arc::clone(&client), fast_retry());

        let completed = uploader.upload(plan[2], CancellationToken::new()).await.unwrap();
        assert_eq!(completed.part_size, 5);

        let bodies = client.bodies.lock().unwrap();
        assert_eq!(bodies.len(), 3);
        assert!(bodies.iter().all(|b| b == b"world"));
    }

    #[tokio::test]
    async fn permanent_failure_names_the_part() {
        let client = Arc::new(Flaky::new(1, || {
            Error::from_dyn(std::io::Error::other("access denied"))
        }));
        let (uploader, plan) = uploader(client, fast_retry());

        let err = uploader.upload(plan[0], CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UploadPart);
        assert_eq!(err.part_number(), Some(plan[0].part_number));
        assert_eq!(err.upload_id().map(|id| &**id), Some("upload-1"));
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let client = Arc::new(Flaky::new(0, || unreachable!()));
        let (uploader, plan) = uploader(Arc::clone(&client), fast_retry());
        let token = CancellationToken::new();
        token.cancel();

        let err = uploader.upload(plan[0], token).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(client.bodies.lock().unwrap().is_empty());
    }
}
