#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

//! # Description
//!
//! Upload a local file to S3, or any storage speaking the S3 multipart API,
//! as a multipart upload of parts sent concurrently.
//!
//! The file is split into a [`PartPlan`] of equally sized parts. An
//! [`UploadSession`] creates the multipart upload, sends the parts with a
//! bounded number of workers, retries parts that fail transiently, and then
//! either completes the upload or aborts it so that no parts are left behind.
//!
//! # Examples
//!
//! ```rust
//! # async fn f() -> multipart_file_upload::error::Result<()> {
//! use multipart_file_upload::{ByteSize, SdkClient, UploadBuilder};
//!
//! /// Build a default multipart upload client from `aws_sdk_s3::Client`.
//! ///
//! /// For convenience `aws_config` is re-exported, as is `aws_sdk_s3` under the
//! /// symbol `aws_sdk`.
//! let client = SdkClient::defaults().await;
//!
//! /// Upload the file in parts of 8 MiB with at most 4 parts in flight.
//! let mut session = UploadBuilder::new(client)
//!     .part_size(ByteSize::mib(8))
//!     .workers(4)
//!     .build_from_file(("a-bucket-us-east-1", "backups/db.tar"), "db.tar")
//!     .await?;
//!
//! let res = session.upload().await?;
//! println!(
//!     "uploaded {} bytes in {} parts to s3://{}/{}",
//!     res.total_bytes, res.part_count, res.bucket, res.key,
//! );
//! #     Ok(())
//! # }
//! ```
//!
//! [`PartPlan`]: plan::PartPlan
//! [`UploadSession`]: upload::UploadSession
use self::error::{ErrorRepr, Result};
use self::plan::PartPlan;
use self::retry::RetryPolicy;
use self::source::{ReadPart, SourceFile};
use self::upload::UploadSession;

use aws_sdk::operation::abort_multipart_upload as abort_upload;
use aws_sdk::operation::complete_multipart_upload as complete_upload;
use aws_sdk::operation::create_multipart_upload as create_upload;
use aws_sdk::operation::upload_part as part_upload;

use std::num::NonZeroUsize;
use std::path::Path;

#[doc(hidden)]
pub extern crate aws_config;
#[doc(hidden)]
pub extern crate aws_sdk_s3 as aws_sdk;

pub use bytesize::ByteSize;

#[macro_use]
mod trace;

mod client;
pub use client::{SdkClient, SendRequest, UploadClient};

pub mod error;
pub mod plan;
pub mod retry;
pub mod source;
pub mod upload;

pub mod request {
    //! Request interface of the multipart upload API.
    //!
    //! This module contains the trait [`RequestBuilder`] for customizing the
    //! request object sent for a multipart upload operation, and types
    //! appearing in request or response objects.
    pub use super::client::part::*;
    pub use super::client::request::*;
    pub use super::client::{UploadData, UploadId};
}

pub mod uri;
#[doc(inline)]
pub use uri::ObjectUri;

// https://docs.aws.amazon.com/AmazonS3/latest/userguide/qfacts.html
/// Maximum number of parts in a multipart upload.
pub const MAX_PART_COUNT: u64 = 10_000;
/// Maximum size of a single part.
pub const MAX_PART_SIZE: ByteSize = ByteSize::gib(5);
/// Part size used unless configured otherwise.
pub const DEFAULT_PART_SIZE: ByteSize = ByteSize::mib(10);

/// Configures and builds an [`UploadSession`].
#[derive(Debug)]
#[non_exhaustive]
pub struct UploadBuilder {
    client: UploadClient,
    part_size: ByteSize,
    workers: Option<usize>,
    max_parts: u64,
    retry: RetryPolicy,
    verbose: bool,
}

impl UploadBuilder {
    /// Create a `UploadBuilder` from a [`SendRequest`] client.
    pub fn new<C>(client: C) -> Self
    where
        C: SendRequest + 'static,
    {
        Self {
            client: UploadClient::new(client),
            part_size: DEFAULT_PART_SIZE,
            workers: None,
            max_parts: MAX_PART_COUNT,
            retry: RetryPolicy::default(),
            verbose: false,
        }
    }

    /// Set the size of every part but the last.
    ///
    /// Must be positive and at most [`MAX_PART_SIZE`].
    pub fn part_size(self, size: ByteSize) -> Self {
        Self {
            part_size: size,
            ..self
        }
    }

    /// Set the maximum number of parts in flight at one time.
    ///
    /// Defaults to the available parallelism of the machine.
    pub fn workers(self, limit: usize) -> Self {
        Self {
            workers: Some(limit),
            ..self
        }
    }

    /// Lower the maximum number of parts the upload may have.
    ///
    /// Values above [`MAX_PART_COUNT`] are clamped to it.
    pub fn max_parts(self, limit: u64) -> Self {
        Self {
            max_parts: limit.min(MAX_PART_COUNT),
            ..self
        }
    }

    /// Set how part uploads are retried.
    pub fn retry_policy(self, retry: RetryPolicy) -> Self {
        Self { retry, ..self }
    }

    /// Emit an event for every part and every retry.
    pub fn verbose(self, verbose: bool) -> Self {
        Self { verbose, ..self }
    }

    /// Build a session uploading the file at `path` to `uri`.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid, the file cannot be opened, the
    /// file is empty, or it needs more parts than allowed.
    pub async fn build_from_file<T, P>(self, uri: T, path: P) -> Result<UploadSession<SourceFile>>
    where
        T: Into<ObjectUri>,
        P: AsRef<Path>,
    {
        let uri = uri.into();
        self.validate(&uri)?;
        let source = SourceFile::open(path).await?;
        self.build(uri, source)
    }

    /// Build a session uploading `source` to `uri`.
    pub fn build<T, S>(self, uri: T, source: S) -> Result<UploadSession<S>>
    where
        T: Into<ObjectUri>,
        S: ReadPart,
    {
        let uri = uri.into();
        let workers = self.validate(&uri)?;
        let plan = PartPlan::with_max_parts(source.size(), self.part_size.as_u64(), self.max_parts)?;
        debug!(
            %uri,
            bytes = plan.file_size(),
            parts = plan.len(),
            part_size = %self.part_size,
            workers = workers.get(),
            "planned upload",
        );

        Ok(UploadSession::new(
            self.client,
            uri,
            source,
            plan,
            workers,
            self.retry,
            self.verbose,
        ))
    }

    fn validate(&self, uri: &ObjectUri) -> Result<NonZeroUsize> {
        if uri.is_empty() {
            return Err(ErrorRepr::Config(format!("bucket and key are required: {uri}")))?;
        }
        if self.part_size.as_u64() == 0 || self.part_size > MAX_PART_SIZE {
            let msg = format!(
                "part size must be between 1 byte and {MAX_PART_SIZE}, got {}",
                self.part_size
            );
            return Err(ErrorRepr::Config(msg))?;
        }
        if self.max_parts == 0 {
            return Err(ErrorRepr::Config("part limit must be positive".into()))?;
        }
        match self.workers {
            Some(n) => NonZeroUsize::new(n)
                .ok_or_else(|| ErrorRepr::Config("worker count must be positive".into()).into()),
            None => Ok(std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)),
        }
    }
}
