use super::{PartUploader, ResultAggregator, SessionState, UploadResult, WorkerPool};
use crate::client::{SendRequest as _, UploadClient, UploadData, UploadId};
use crate::error::{Error, ErrorKind, ErrorRepr, Result};
use crate::plan::PartPlan;
use crate::request::{AbortRequest, CompleteRequest, CompletedParts, CompletedUpload, CreateRequest};
use crate::retry::RetryPolicy;
use crate::source::{ReadPart, SourceFile};
use crate::uri::ObjectUri;

use futures::StreamExt as _;
use std::fmt::{self, Debug, Formatter};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// One multipart upload of a source to an object.
///
/// A session is single use. [`upload`] creates the multipart upload, sends
/// every planned part, and either completes the upload or aborts it exactly
/// once. Calling it again fails.
///
/// [`upload`]: UploadSession::upload
pub struct UploadSession<S = SourceFile> {
    client: UploadClient,
    uri: ObjectUri,
    source: Arc<S>,
    plan: PartPlan,
    workers: NonZeroUsize,
    retry: RetryPolicy,
    verbose: bool,
    token: CancellationToken,
    state: SessionState,
    upload_id: Option<UploadId>,
}

impl<S: ReadPart> UploadSession<S> {
    pub(crate) fn new(
        client: UploadClient,
        uri: ObjectUri,
        source: S,
        plan: PartPlan,
        workers: NonZeroUsize,
        retry: RetryPolicy,
        verbose: bool,
    ) -> Self {
        Self {
            client,
            uri,
            source: Arc::new(source),
            plan,
            workers,
            retry,
            verbose,
            token: CancellationToken::new(),
            state: SessionState::Initiated,
            upload_id: None,
        }
    }

    /// Current state of the session.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Destination of the upload.
    pub fn uri(&self) -> &ObjectUri {
        &self.uri
    }

    /// The parts the source is uploaded in.
    pub fn plan(&self) -> &PartPlan {
        &self.plan
    }

    /// Maximum number of parts in flight.
    pub fn workers(&self) -> usize {
        self.workers.get()
    }

    /// ID of the multipart upload, once it has been created.
    pub fn upload_id(&self) -> Option<&UploadId> {
        self.upload_id.as_ref()
    }

    /// A token that cancels the upload when cancelled.
    ///
    /// Parts in flight are abandoned, no new part is started, and the
    /// multipart upload is aborted. The upload then fails with an error of
    /// kind [`ErrorKind::Cancelled`].
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Run the upload to the end.
    ///
    /// # Errors
    ///
    /// * [`ErrorKind::Config`] when the session was already used.
    /// * [`ErrorKind::Initiate`] when the upload could not be created. Nothing
    ///   is left in storage and the session ends `Failed`.
    /// * [`ErrorKind::UploadPart`] with the first part that failed,
    ///   [`ErrorKind::Complete`] when the upload could not be completed, or
    ///   [`ErrorKind::Cancelled`]. In each case the upload was aborted and the
    ///   session ends `Aborted`.
    /// * [`ErrorKind::AbortFailed`] when aborting after one of the above
    ///   failed too. The original error is available from [`Error::cause`]
    ///   and the multipart upload may still exist in storage.
    ///
    /// # Cancel safety
    ///
    /// Dropping the returned future, for instance on a timeout, stops the
    /// parts in flight but sends no abort. The session stays `InFlight` and
    /// the multipart upload is orphaned. Cancel the token from
    /// [`cancellation_token`] and await the future to have it aborted.
    ///
    /// [`cancellation_token`]: UploadSession::cancellation_token
    pub async fn upload(&mut self) -> Result<UploadResult> {
        if self.state != SessionState::Initiated {
            return Err(ErrorRepr::SessionFinished(self.state))?;
        }
        if self.token.is_cancelled() {
            self.state = SessionState::Failed;
            return Err(ErrorRepr::Cancelled)?;
        }

        let start = Instant::now();
        info!(
            uri = %self.uri,
            bytes = self.plan.file_size(),
            parts = self.plan.len(),
            part_size = self.plan.part_size(),
            workers = self.workers.get(),
            "initiating multipart upload",
        );
        let data = match self.create().await {
            Ok(data) => data,
            Err(e) => {
                error!(uri = %self.uri, error = %e, "initiating multipart upload failed");
                self.state = SessionState::Failed;
                return Err(e);
            }
        };
        self.upload_id = Some(data.get_id());
        self.state = SessionState::InFlight;
        info!(id = %data.id, uri = %data.uri, "initiated multipart upload");

        let res = match self.upload_parts(&data).await {
            Ok(parts) => self.complete(&data, parts).await,
            Err(e) => Err(e),
        };

        match res {
            Ok((parts, completed)) => {
                self.state = SessionState::Completed;
                let result = UploadResult {
                    bucket: completed.uri.bucket,
                    key: completed.uri.key,
                    total_bytes: parts.size(),
                    part_count: parts.count(),
                    etag: completed.etag,
                    elapsed: start.elapsed(),
                };
                info!(
                    id = %data.id,
                    uri = %data.uri,
                    bytes = result.total_bytes,
                    parts = result.part_count,
                    elapsed = ?result.elapsed,
                    "completed multipart upload",
                );
                Ok(result)
            }
            Err(e) => {
                self.state = SessionState::Aborted;
                Err(self.abort(&data, e).await)
            }
        }
    }

    async fn create(&self) -> Result<UploadData> {
        let req = CreateRequest::new(self.uri.clone());
        self.client
            .send_create_upload_request(req)
            .await
            .map_err(|e| ErrorRepr::from_create_err(&self.uri)(e).into())
    }

    async fn upload_parts(&self, data: &UploadData) -> Result<CompletedParts> {
        let uploader = PartUploader::new(
            self.client.clone(),
            Arc::clone(&self.source),
            data.clone(),
            self.retry,
        )
        .verbose(self.verbose);

        let mut pool = WorkerPool::new(
            self.plan.iter().copied(),
            self.workers,
            self.token.child_token(),
            move |part, token| {
                let uploader = uploader.clone();
                async move { uploader.upload(part, token).await }
            },
        );

        let mut results = ResultAggregator::new(&self.plan);
        while let Some((part, res)) = pool.next().await {
            results.record(part, res);
        }
        results.finish()
    }

    async fn complete(
        &self,
        data: &UploadData,
        parts: CompletedParts,
    ) -> Result<(CompletedParts, CompletedUpload)> {
        debug!(id = %data.id, parts = parts.count(), "completing multipart upload");
        let req = CompleteRequest::new(data, parts.clone());
        match self.client.send_complete_upload_request(req).await {
            Ok(completed) => Ok((parts, completed)),
            Err(e) => {
                let e = ErrorRepr::from_complete_err(&data.id, &data.uri, parts.count())(e);
                Err(e.into())
            }
        }
    }

    /// Abort the upload after `cause`, returning the error to report.
    async fn abort(&self, data: &UploadData, cause: Error) -> Error {
        if cause.kind() == ErrorKind::Cancelled {
            warn!(id = %data.id, uri = %data.uri, "upload cancelled, aborting");
        } else {
            error!(id = %data.id, uri = %data.uri, error = %cause, "upload failed, aborting");
        }

        let req = AbortRequest::new(data);
        match self.client.send_abort_upload_request(req).await {
            Ok(()) => {
                info!(id = %data.id, uri = %data.uri, "aborted multipart upload");
                cause
            }
            Err(e) => {
                let abort: Error = ErrorRepr::from_abort_err(&data.id, &data.uri)(e).into();
                error!(
                    id = %data.id,
                    uri = %data.uri,
                    error = %abort,
                    "aborting multipart upload failed, upload is orphaned",
                );
                ErrorRepr::AbortFailed {
                    cause: Box::new(cause),
                    abort: Box::new(abort),
                }
                .into()
            }
        }
    }
}

impl<S> Debug for UploadSession<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSession")
            .field("uri", &self.uri)
            .field("parts", &self.plan.len())
            .field("workers", &self.workers)
            .field("state", &self.state)
            .field("upload_id", &self.upload_id)
            .finish()
    }
}
