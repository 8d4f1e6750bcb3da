//! Errors this crate can emit.
use crate::client::UploadId;
use crate::request::PartNumber;
use crate::upload::SessionState;
use crate::uri::ObjectUri;

use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

/// A specialized `Result` type for this crate.
pub type Result<T, E = Error> = ::std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The value returned in this crate when an error occurs.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct Error(pub(crate) ErrorRepr);

impl Error {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match &self.0 {
            ErrorRepr::Config(_) | ErrorRepr::Source { .. } | ErrorRepr::SessionFinished(_) => {
                ErrorKind::Config
            }
            ErrorRepr::EmptyFile => ErrorKind::EmptyFile,
            ErrorRepr::TooManyParts { .. } => ErrorKind::TooManyParts,
            ErrorRepr::Create { .. } => ErrorKind::Initiate,
            ErrorRepr::UploadPart { .. } => ErrorKind::UploadPart,
            ErrorRepr::Complete { .. } => ErrorKind::Complete,
            ErrorRepr::Abort { .. } | ErrorRepr::AbortFailed { .. } => ErrorKind::AbortFailed,
            ErrorRepr::Cancelled | ErrorRepr::Incomplete { .. } => ErrorKind::Cancelled,
            ErrorRepr::Missing(_, _) | ErrorRepr::Request { .. } | ErrorRepr::Timeout(_) => {
                ErrorKind::Request
            }
            ErrorRepr::Io(_) | ErrorRepr::OutOfBounds { .. } => ErrorKind::Io,
            ErrorRepr::TaskPanicked(_) | ErrorRepr::UnknownPart(_) => ErrorKind::Unknown,
            ErrorRepr::Any { kind, .. } => *kind,
        }
    }

    /// Wrap an arbitrary error as a permanent failure of a request.
    pub fn from_dyn<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(ErrorRepr::Request {
            retryable: false,
            source: Box::new(e),
        })
    }

    /// Wrap an arbitrary error as a transient failure of a request, one that
    /// is worth retrying.
    pub fn retryable<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(ErrorRepr::Request {
            retryable: true,
            source: Box::new(e),
        })
    }

    /// Create an error of the given kind with a static message.
    pub fn from_kind(kind: ErrorKind, msg: &'static str) -> Self {
        Self(ErrorRepr::Any { kind, msg })
    }

    /// Whether the failed operation may succeed if attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.0,
            ErrorRepr::Request {
                retryable: true,
                ..
            } | ErrorRepr::Timeout(_)
        )
    }

    /// The part that failed, if this error is about a single part.
    pub fn part_number(&self) -> Option<PartNumber> {
        match &self.0 {
            ErrorRepr::UploadPart { part, .. }
            | ErrorRepr::OutOfBounds { part, .. }
            | ErrorRepr::TaskPanicked(part)
            | ErrorRepr::UnknownPart(part) => Some(*part),
            ErrorRepr::AbortFailed { cause, .. } => cause.part_number(),
            _ => None,
        }
    }

    /// The ID of the multipart upload this error is associated with, if one
    /// had been created.
    pub fn upload_id(&self) -> Option<&UploadId> {
        match &self.0 {
            ErrorRepr::UploadPart { id, .. }
            | ErrorRepr::Complete { id, .. }
            | ErrorRepr::Abort { id, .. } => Some(id),
            ErrorRepr::AbortFailed { abort, .. } => abort.upload_id(),
            _ => None,
        }
    }

    /// When aborting the upload failed, the error that caused the abort.
    pub fn cause(&self) -> Option<&Error> {
        match &self.0 {
            ErrorRepr::AbortFailed { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// When aborting the upload failed, the error returned by the abort
    /// request.
    pub fn abort_error(&self) -> Option<&Error> {
        match &self.0 {
            ErrorRepr::AbortFailed { abort, .. } => Some(abort),
            _ => None,
        }
    }

    /// Returns `true` if a multipart upload was left open in storage.
    ///
    /// Parts of an orphaned upload are billed until the upload is aborted
    /// out of band, for instance by a bucket lifecycle rule.
    pub fn is_orphaned(&self) -> bool {
        matches!(self.0, ErrorRepr::AbortFailed { .. })
    }
}

impl From<ErrorRepr> for Error {
    fn from(value: ErrorRepr) -> Self {
        Self(value)
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self(ErrorRepr::Io(value))
    }
}

/// The category of the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The upload was configured with an invalid part size, worker count,
    /// source file or destination.
    Config,
    /// The source is empty.
    EmptyFile,
    /// The source needs more parts than storage allows for the part size.
    TooManyParts,
    /// The multipart upload could not be created.
    Initiate,
    /// A part failed permanently or exhausted its retries.
    UploadPart,
    /// All parts were uploaded but the upload could not be completed.
    Complete,
    /// Aborting the upload failed after another error.
    AbortFailed,
    /// The upload was cancelled.
    Cancelled,
    /// A single request to storage failed.
    Request,
    /// Reading the source failed.
    Io,
    /// An error that fits no other category.
    Unknown,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::EmptyFile => write!(f, "empty file"),
            Self::TooManyParts => write!(f, "too many parts"),
            Self::Initiate => write!(f, "initiate"),
            Self::UploadPart => write!(f, "upload part"),
            Self::Complete => write!(f, "complete"),
            Self::AbortFailed => write!(f, "abort"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Request => write!(f, "request"),
            Self::Io => write!(f, "io"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Internal error type that we are free to change at will.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ErrorRepr {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("cannot use {path:?} as upload source: {source}")]
    Source {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("upload session cannot be reused in state {0}")]
    SessionFinished(SessionState),
    #[error("empty sources cannot be uploaded as multipart uploads")]
    EmptyFile,
    #[error("{parts} parts exceed the limit of {max_parts}, use a part size of at least {min_part_size} bytes")]
    TooManyParts {
        parts: u64,
        max_parts: u64,
        min_part_size: u64,
    },
    #[error("{0} missing required field: {1}")]
    Missing(&'static str, &'static str),
    #[error("request failed: {source}")]
    Request { retryable: bool, source: BoxError },
    #[error("request attempt timed out after {0:?}")]
    Timeout(Duration),
    #[error("operation cancelled")]
    Cancelled,
    #[error("upload stopped with {completed} of {expected} parts uploaded")]
    Incomplete { expected: usize, completed: usize },
    #[error("reading {part} at offset {offset} with length {len} is outside the source of {size} bytes")]
    OutOfBounds {
        part: PartNumber,
        offset: u64,
        len: u64,
        size: u64,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("task uploading {0} panicked")]
    TaskPanicked(PartNumber),
    #[error("received result for {0}, which is not in the plan")]
    UnknownPart(PartNumber),
    #[error("creating multipart upload for {uri} failed: {source}")]
    Create { uri: ObjectUri, source: Box<Error> },
    #[error("uploading {part} to upload {id} failed ({attempts} attempts): {source}")]
    UploadPart {
        id: UploadId,
        uri: ObjectUri,
        part: PartNumber,
        attempts: u32,
        source: Box<Error>,
    },
    #[error("completing upload {id} with {parts} parts failed: {source}")]
    Complete {
        id: UploadId,
        uri: ObjectUri,
        parts: usize,
        source: Box<Error>,
    },
    #[error("aborting upload {id} for {uri} failed: {source}")]
    Abort {
        id: UploadId,
        uri: ObjectUri,
        source: Box<Error>,
    },
    #[error("{cause}; the upload is orphaned: {abort}")]
    AbortFailed {
        #[source]
        cause: Box<Error>,
        abort: Box<Error>,
    },
    #[error("{kind} error: {msg}")]
    Any { kind: ErrorKind, msg: &'static str },
}

impl ErrorRepr {
    /// Classify an SDK error as transient or permanent.
    ///
    /// Timeouts, I/O failures while dispatching, unparseable responses, 5xx
    /// responses and throttling are transient.
    pub(crate) fn from_sdk_err<E, R>(e: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
        R: HttpStatus + fmt::Debug + Send + Sync + 'static,
    {
        let retryable = match &e {
            SdkError::TimeoutError(_) | SdkError::ResponseError(_) => true,
            SdkError::DispatchFailure(failure) => failure.is_io() || failure.is_timeout(),
            SdkError::ServiceError(service) => {
                let status = service.raw().status_code();
                status >= 500
                    || status == 429
                    || matches!(
                        service.err().code(),
                        Some("SlowDown" | "RequestTimeout" | "Throttling" | "ThrottlingException")
                    )
            }
            _ => false,
        };
        Self::Request {
            retryable,
            source: Box::new(e),
        }
    }

    pub(crate) fn from_create_err(uri: &ObjectUri) -> impl FnOnce(Error) -> Self {
        move |e| Self::Create {
            uri: uri.clone(),
            source: Box::new(e),
        }
    }

    pub(crate) fn from_upload_err(
        id: &UploadId,
        uri: &ObjectUri,
        part: PartNumber,
        attempts: u32,
    ) -> impl FnOnce(Error) -> Self {
        move |e| Self::UploadPart {
            id: id.clone(),
            uri: uri.clone(),
            part,
            attempts,
            source: Box::new(e),
        }
    }

    pub(crate) fn from_complete_err(
        id: &UploadId,
        uri: &ObjectUri,
        parts: usize,
    ) -> impl FnOnce(Error) -> Self {
        move |e| Self::Complete {
            id: id.clone(),
            uri: uri.clone(),
            parts,
            source: Box::new(e),
        }
    }

    pub(crate) fn from_abort_err(id: &UploadId, uri: &ObjectUri) -> impl FnOnce(Error) -> Self {
        move |e| Self::Abort {
            id: id.clone(),
            uri: uri.clone(),
            source: Box::new(e),
        }
    }
}

/// Access to the HTTP status of a raw response carried in an `SdkError`.
pub(crate) trait HttpStatus {
    fn status_code(&self) -> u16;
}

impl HttpStatus for aws_sdk_s3::config::http::HttpResponse {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::http::HttpResponse;
    use aws_sdk_s3::error::ErrorMetadata;
    use aws_sdk_s3::operation::upload_part::UploadPartError;
    use aws_sdk_s3::primitives::ByteStream;

    fn service_error(status: u16, code: &str) -> Error {
        let meta = ErrorMetadata::builder().code(code).build();
        let body = ByteStream::from_static(b"").into_inner();
        let raw = HttpResponse::new(status.try_into().unwrap(), body);
        let e = SdkError::service_error(UploadPartError::generic(meta), raw);
        ErrorRepr::from_sdk_err(e).into()
    }

    #[test]
    fn server_errors_are_retryable() {
        assert!(service_error(500, "InternalError").is_retryable());
        assert!(service_error(503, "ServiceUnavailable").is_retryable());
    }

    #[test]
    fn throttling_is_retryable() {
        assert!(service_error(429, "TooManyRequests").is_retryable());
        assert!(service_error(400, "Throttling").is_retryable());
        assert!(service_error(400, "RequestTimeout").is_retryable());
        // S3 answers SlowDown with a 503 but the code alone is enough.
        assert!(service_error(200, "SlowDown").is_retryable());
    }

    #[test]
    fn client_errors_are_permanent() {
        let denied = service_error(403, "AccessDenied");
        assert!(!denied.is_retryable());
        assert_eq!(denied.kind(), ErrorKind::Request);
        assert!(!service_error(404, "NoSuchUpload").is_retryable());
        assert!(!service_error(400, "MalformedXML").is_retryable());
    }

    #[test]
    fn timeouts_are_retryable() {
        let e: SdkError<UploadPartError, HttpResponse> =
            SdkError::timeout_error(std::io::Error::other("timed out"));
        assert!(Error::from(ErrorRepr::from_sdk_err(e)).is_retryable());
        assert!(Error::from(ErrorRepr::Timeout(Duration::from_secs(1))).is_retryable());
    }

    #[test]
    fn abort_failure_keeps_both_errors() {
        let uri = ObjectUri::from(("bucket", "key"));
        let id = UploadId::from("id");
        let cause = ErrorRepr::from_complete_err(&id, &uri, 2)(service_error(400, "InvalidPart"));
        let abort = ErrorRepr::from_abort_err(&id, &uri)(service_error(503, "SlowDown"));
        let err: Error = ErrorRepr::AbortFailed {
            cause: Box::new(cause.into()),
            abort: Box::new(abort.into()),
        }
        .into();

        assert!(err.is_orphaned());
        assert_eq!(err.kind(), ErrorKind::AbortFailed);
        assert_eq!(err.cause().map(Error::kind), Some(ErrorKind::Complete));
        assert_eq!(err.upload_id().map(|id| &**id), Some("id"));
    }
}
