use crate::complete_upload::CompleteMultipartUploadOutput as CompleteResponse;
use crate::error::{ErrorRepr, Result};
use crate::part_upload::UploadPartOutput as UploadResponse;

use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use std::ops::Deref;

/// Body of a part upload request.
///
/// The bytes are reference counted, so cloning a `PartBody` to resend it on a
/// retry does not copy the data.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct PartBody(Bytes);

impl PartBody {
    /// Construct a body from [`Bytes`].
    pub fn new(bytes: Bytes) -> Self {
        Self(bytes)
    }

    /// Current size in bytes of the `PartBody`.
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Convert this type into a [`ByteStream`], which is the type required by
    /// the SDK in the request to add a part to a multipart upload.
    ///
    /// This only increments the reference count of the inner buffer.
    pub fn as_sdk_body(&self) -> ByteStream {
        ByteStream::from(self.0.clone())
    }
}

impl From<Bytes> for PartBody {
    fn from(value: Bytes) -> Self {
        Self(value)
    }
}

impl From<Vec<u8>> for PartBody {
    fn from(value: Vec<u8>) -> Self {
        Self(Bytes::from(value))
    }
}

impl Deref for PartBody {
    type Target = Bytes;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for PartBody {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

/// Number of a part in a multipart upload.
///
/// This, along with the entity tag found in the response, is required in the
/// request to complete a multipart upload because it identifies where the
/// part goes when assembling the full object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartNumber(i32);

impl Default for PartNumber {
    fn default() -> Self {
        Self(1)
    }
}

impl PartNumber {
    /// Create a new `PartNumber` from a plain integer.
    ///
    /// Uploads are required to start with a part number of 1, which is how
    /// `PartNumber: Default`.
    pub fn new(n: i32) -> Self {
        Self(n)
    }
}

impl Deref for PartNumber {
    type Target = i32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for PartNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "part_{}", self.0)
    }
}

/// Entity tag.
///
/// This value is an opaque identifier of stored bytes. It is assigned to an
/// uploaded part and returned in the response from a part upload request.
///
/// It is also assigned to a completed upload and may be found in a successful
/// complete upload response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EntityTag(Cow<'static, str>);

impl EntityTag {
    fn new<T: Into<Cow<'static, str>>>(etag: T) -> Self {
        Self(etag.into())
    }

    pub(crate) fn try_from_upload_resp(value: UploadResponse) -> Result<Self, ErrorRepr> {
        value
            .e_tag
            .map(Self::from)
            .ok_or(ErrorRepr::Missing("UploadPartOutput", "e_tag"))
    }

    pub(crate) fn from_complete_resp(value: &CompleteResponse) -> Option<Self> {
        value.e_tag.as_deref().map(Self::from)
    }
}

impl Deref for EntityTag {
    type Target = str;

    fn deref(&self) -> &str {
        self.0.deref()
    }
}

impl AsRef<str> for EntityTag {
    fn as_ref(&self) -> &str {
        self.deref()
    }
}

impl Display for EntityTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for EntityTag {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl From<String> for EntityTag {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

/// The value for a successful part upload request.
///
/// Every planned part needs a `CompletedPart` to construct a valid complete
/// upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    /// The entity tag of the uploaded part.
    pub etag: EntityTag,
    /// The incrementing integer starting with 1 that identifies this part in
    /// the upload.
    pub part_number: PartNumber,
    /// The size of this part in bytes.
    pub part_size: u64,
}

impl CompletedPart {
    /// Create a new value from entity tag and part number used in the upload.
    pub fn new(etag: EntityTag, part_number: PartNumber, part_size: u64) -> Self {
        Self {
            etag,
            part_number,
            part_size,
        }
    }
}

/// All completed part uploads for a multipart upload, the manifest of a
/// complete upload request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletedParts(Vec<CompletedPart>);

impl CompletedParts {
    /// Returns the number of parts that have been successfully uploaded.
    pub fn count(&self) -> usize {
        self.0.len()
    }

    /// Returns the current size in bytes of this upload.
    pub fn size(&self) -> u64 {
        self.0.iter().map(|p| p.part_size).sum()
    }

    /// Sort the `CompletedPart`s in increasing order by part number.
    ///
    /// It is an error to make a request where the completed parts are not in
    /// order.
    pub fn sort_ascending(&mut self) {
        self.0.sort_by_key(|part| part.part_number);
    }

    /// Whether the parts are in strictly increasing order by part number.
    pub fn is_sorted(&self) -> bool {
        self.0
            .windows(2)
            .all(|w| w[0].part_number < w[1].part_number)
    }
}

impl Deref for CompletedParts {
    type Target = [CompletedPart];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromIterator<CompletedPart> for CompletedParts {
    fn from_iter<T: IntoIterator<Item = CompletedPart>>(iter: T) -> Self {
        let mut parts = Self(iter.into_iter().collect());
        parts.sort_ascending();
        parts
    }
}

impl From<&CompletedParts> for aws_sdk_s3::types::CompletedMultipartUpload {
    fn from(value: &CompletedParts) -> Self {
        let completed_parts = value
            .0
            .iter()
            .map(|v| {
                aws_sdk_s3::types::CompletedPart::builder()
                    .e_tag(v.etag.to_string())
                    .part_number(*v.part_number)
                    .build()
            })
            .collect();

        aws_sdk_s3::types::CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build()
    }
}
