//! This module contains `SendRequest`, which defines the core
//! operations needed during a multipart upload.
use self::inner::{BoxedSendRequest, SendRequestInner};
use self::part::CompletedPart;
use self::request::*;
use crate::create_upload::CreateMultipartUploadOutput as CreateResponse;
use crate::error::{ErrorRepr, Result};
use crate::uri::ObjectUri;

use std::borrow::Cow;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

mod inner;
pub(crate) mod part;
pub(crate) mod request;

mod sdk;
pub use sdk::SdkClient;

/// `SendRequest` represents the atomic operations in a multipart upload.
///
/// Implementations report failures of a single request. Errors that are worth
/// retrying should be created with [`Error::retryable`], everything else is
/// treated as permanent.
///
/// [`Error::retryable`]: crate::error::Error::retryable
pub trait SendRequest: Send + Sync {
    /// Send a request to create a new multipart upload, returning an
    /// [`UploadData`] having the upload ID assignment.
    fn send_create_upload_request(
        &self,
        req: CreateRequest,
    ) -> impl Future<Output = Result<UploadData>> + Send;

    /// Send a request to upload a part to a multipart upload, returning the
    /// [`CompletedPart`] containing entity tag and part number, which are
    /// required in the subsequent complete upload request.
    fn send_new_part_upload_request(
        &self,
        req: UploadPartRequest,
    ) -> impl Future<Output = Result<CompletedPart>> + Send;

    /// Send a request to complete a multipart upload, returning a
    /// [`CompletedUpload`], which has the entity tag of the object if storage
    /// returned one.
    fn send_complete_upload_request(
        &self,
        req: CompleteRequest,
    ) -> impl Future<Output = Result<CompletedUpload>> + Send;

    /// Send a request to abort a multipart upload, discarding every part that
    /// was uploaded to it.
    fn send_abort_upload_request(&self, req: AbortRequest)
    -> impl Future<Output = Result<()>> + Send;
}

impl<D, T> SendRequest for T
where
    D: SendRequest,
    T: Deref<Target = D> + Send + Sync,
{
    async fn send_create_upload_request(&self, req: CreateRequest) -> Result<UploadData> {
        self.deref().send_create_upload_request(req).await
    }

    async fn send_new_part_upload_request(&self, req: UploadPartRequest) -> Result<CompletedPart> {
        self.deref().send_new_part_upload_request(req).await
    }

    async fn send_complete_upload_request(&self, req: CompleteRequest) -> Result<CompletedUpload> {
        self.deref().send_complete_upload_request(req).await
    }

    async fn send_abort_upload_request(&self, req: AbortRequest) -> Result<()> {
        self.deref().send_abort_upload_request(req).await
    }
}

/// `UploadClient` holds a type that can implement the interface of
/// [`SendRequest`].
///
/// It is cheap to clone, so every part upload task gets its own handle.
#[derive(Clone)]
pub struct UploadClient {
    pub(crate) inner: Arc<dyn BoxedSendRequest + Send + Sync>,
}

impl UploadClient {
    /// Create this value from any [`SendRequest`] implementation.
    pub fn new<C>(client: C) -> Self
    where
        C: SendRequest + Send + Sync + 'static,
    {
        let inner = SendRequestInner::new(client);
        Self {
            inner: Arc::new(inner),
        }
    }
}

impl SendRequest for UploadClient {
    async fn send_create_upload_request(&self, req: CreateRequest) -> Result<UploadData> {
        self.inner.send_create(req).await
    }

    async fn send_new_part_upload_request(&self, req: UploadPartRequest) -> Result<CompletedPart> {
        self.inner.send_upload(req).await
    }

    async fn send_complete_upload_request(&self, req: CompleteRequest) -> Result<CompletedUpload> {
        self.inner.send_complete(req).await
    }

    async fn send_abort_upload_request(&self, req: AbortRequest) -> Result<()> {
        self.inner.send_abort(req).await
    }
}

impl Debug for UploadClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadClient")
            .field("inner", &"SendRequest")
            .finish()
    }
}

/// ID assigned to a multipart upload by storage when it is created.
///
/// Every part upload, and the complete or abort request, refers to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UploadId(Cow<'static, str>);

impl UploadId {
    pub(crate) fn try_from_create_resp(value: CreateResponse) -> Result<Self, ErrorRepr> {
        value
            .upload_id
            .map(Self::from)
            .ok_or(ErrorRepr::Missing("CreateMultipartUploadOutput", "upload_id"))
    }
}

impl Deref for UploadId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Display for UploadId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<&str> for UploadId {
    fn from(value: &str) -> Self {
        Self(Cow::Owned(value.to_string()))
    }
}

impl From<String> for UploadId {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

/// `UploadData` is an active `UploadId` with the bucket and object key that
/// it was created with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadData {
    /// The ID for the upload assigned by storage.
    pub id: UploadId,
    /// The URI of the object being uploaded.
    pub uri: ObjectUri,
}

impl UploadData {
    /// Create a new value from an upload ID and object URI.
    pub fn new<T: Into<UploadId>>(id: T, uri: ObjectUri) -> Self {
        Self { id: id.into(), uri }
    }

    /// Get an owned upload ID.
    pub fn get_id(&self) -> UploadId {
        self.id.clone()
    }

    /// Get an owned object URI.
    pub fn get_uri(&self) -> ObjectUri {
        self.uri.clone()
    }
}
