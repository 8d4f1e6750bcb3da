//! Running a multipart upload of a source to a single object.
//!
//! An [`UploadSession`] owns the lifecycle of one multipart upload: it creates
//! the upload, hands the planned parts to a [`WorkerPool`] of bounded size in
//! which every part is sent by a [`PartUploader`], folds the outcomes with a
//! [`ResultAggregator`], and finally completes or aborts the upload.
use crate::request::EntityTag;
use crate::uri::{Bucket, Key};

use serde::Serialize;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

mod aggregate;
pub use self::aggregate::ResultAggregator;

mod part_uploader;
pub use self::part_uploader::PartUploader;

mod pool;
pub use self::pool::WorkerPool;

mod session;
pub use self::session::UploadSession;

/// Where an [`UploadSession`] is in its lifecycle.
///
/// A session starts out `Initiated` and moves to `InFlight` once storage has
/// assigned an upload ID. From there it ends either `Completed` or `Aborted`.
/// A session whose upload could not be created ends `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// The session has been built and no request has been made.
    Initiated,
    /// The multipart upload exists and parts are being uploaded.
    InFlight,
    /// The object was assembled from all parts.
    Completed,
    /// The multipart upload was aborted after a failure.
    Aborted,
    /// The multipart upload could not be created.
    Failed,
}

impl SessionState {
    /// Whether the session cannot make progress anymore.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted | Self::Failed)
    }
}

impl Display for SessionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initiated => write!(f, "initiated"),
            Self::InFlight => write!(f, "in_flight"),
            Self::Completed => write!(f, "completed"),
            Self::Aborted => write!(f, "aborted"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Summary of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    /// Bucket the object was written to.
    pub bucket: Bucket,
    /// Key of the written object.
    pub key: Key,
    /// Number of bytes uploaded, equal to the size of the source.
    pub total_bytes: u64,
    /// Number of parts the object was assembled from.
    pub part_count: usize,
    /// Entity tag of the object, when storage returned one.
    pub etag: Option<EntityTag>,
    /// Wall-clock time from creating the upload to completing it.
    pub elapsed: Duration,
}

impl UploadResult {
    /// Average throughput of the upload in bytes per second.
    pub fn bytes_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total_bytes as f64 / secs
        } else {
            self.total_bytes as f64
        }
    }
}
