use super::CompleteRequestBuilder;
use crate::client::part::{CompletedParts, EntityTag};
use crate::client::{UploadData, UploadId};
use crate::error::{ErrorRepr, Result};
use crate::uri::ObjectUri;

use aws_sdk_s3::types::CompletedMultipartUpload;

/// Request object for completing a multipart upload.
#[derive(Debug, Clone)]
pub struct CompleteRequest {
    pub(crate) id: UploadId,
    pub(crate) uri: ObjectUri,
    pub(crate) completed_parts: CompletedParts,
}

impl CompleteRequest {
    /// Create a new `CompleteRequest` from the minimum required.
    ///
    /// The parts are sorted by part number if they are not already.
    pub fn new(data: &UploadData, mut completed_parts: CompletedParts) -> Self {
        if !completed_parts.is_sorted() {
            completed_parts.sort_ascending();
        }
        Self {
            id: data.get_id(),
            uri: data.get_uri(),
            completed_parts,
        }
    }

    /// Set the required properties on the SDK request builder for the operation.
    pub fn with_builder(&self, builder: CompleteRequestBuilder) -> CompleteRequestBuilder {
        let parts = CompletedMultipartUpload::from(&self.completed_parts);

        builder
            .upload_id(&*self.id)
            .bucket(&*self.uri.bucket)
            .key(&*self.uri.key)
            .multipart_upload(parts)
    }

    /// Returns a reference to the assigned `UploadId` for this request.
    pub fn id(&self) -> &UploadId {
        &self.id
    }

    /// Returns a reference to the `ObjectUri` for this request.
    pub fn uri(&self) -> &ObjectUri {
        &self.uri
    }

    /// Returns a reference to the `CompletedParts` for this request.
    pub fn completed_parts(&self) -> &CompletedParts {
        &self.completed_parts
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.id.is_empty() || self.uri.is_empty() {
            return Err(
                ErrorRepr::Missing("CompleteRequest", "empty upload id and/or uri").into(),
            );
        }
        if self.completed_parts.count() == 0 {
            return Err(ErrorRepr::Missing("CompleteRequest", "completed parts").into());
        }
        Ok(())
    }
}

/// The value for a successful multipart upload.
#[derive(Debug, Clone, Default)]
pub struct CompletedUpload {
    /// The URI of the created object.
    pub uri: ObjectUri,
    /// The entity tag of the created object, if storage returned one.
    pub etag: Option<EntityTag>,
}

impl CompletedUpload {
    /// Create a new value from object URI and entity tag.
    pub fn new<T: Into<Option<EntityTag>>>(uri: ObjectUri, etag: T) -> Self {
        Self {
            uri,
            etag: etag.into(),
        }
    }
}
