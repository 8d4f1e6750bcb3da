use super::part::{CompletedPart, EntityTag};
use super::request::*;
use super::{SendRequest, UploadData, UploadId};
use crate::error::{ErrorRepr, Result};

use aws_config::SdkConfig;
use aws_sdk_s3 as s3;

/// S3 [`Client`] type from the AWS SDK.
///
/// Any S3-compatible service speaking the XML multipart API can be targeted
/// by building the client from an [`SdkConfig`] with a custom endpoint URL.
///
/// Note that the SDK applies its own retry configuration to every request.
/// Part uploads are additionally retried by the session's [`RetryPolicy`].
///
/// [`Client`]: aws_sdk_s3::Client
/// [`RetryPolicy`]: crate::retry::RetryPolicy
#[derive(Debug, Clone)]
pub struct SdkClient<B = DefaultRequestBuilder>(s3::Client, B);

impl SdkClient {
    /// Create a new `SdkClient` from an existing SDK `Client`.
    ///
    /// [`Client`]: aws_sdk_s3::Client
    pub fn new(client: s3::Client) -> Self {
        SdkClient(client, DefaultRequestBuilder)
    }

    /// Create a new `SdkClient` from an [`SdkConfig`].
    ///
    /// [`SdkConfig`]: aws_config::SdkConfig
    pub fn from_sdk_config(config: SdkConfig) -> Self {
        let client = s3::Client::new(&config);
        Self::new(client)
    }

    /// Create a new `SdkClient` with configuration loaded from the
    /// environment.
    pub async fn defaults() -> Self {
        let config = aws_config::load_from_env().await;
        Self::from_sdk_config(config)
    }

    /// Set a request builder for this client.
    pub fn request_builder<B: RequestBuilder>(self, builder: B) -> SdkClient<B> {
        SdkClient(self.0, builder)
    }
}

impl<B: RequestBuilder> SdkClient<B> {
    /// Get a reference to the SDK client.
    pub fn get_ref(&self) -> &s3::Client {
        &self.0
    }
}

impl<B: RequestBuilder> SendRequest for SdkClient<B> {
    async fn send_create_upload_request(&self, req: CreateRequest) -> Result<UploadData> {
        req.validate()?;
        let base = self.0.create_multipart_upload();
        let builder = req.with_builder(base);
        let request = self.1.with_create_builder(builder);

        let id = request
            .send()
            .await
            .map_err(ErrorRepr::from_sdk_err)
            .and_then(UploadId::try_from_create_resp)?;

        Ok(UploadData::new(id, req.uri().clone()))
    }

    async fn send_new_part_upload_request(&self, req: UploadPartRequest) -> Result<CompletedPart> {
        req.validate()?;
        let part_size = req.body().size() as u64;

        let base = self.0.upload_part();
        let builder = req.with_builder(base);
        let request = self.1.with_upload_part_builder(builder);

        let etag = request
            .send()
            .await
            .map_err(ErrorRepr::from_sdk_err)
            .and_then(EntityTag::try_from_upload_resp)?;

        Ok(CompletedPart::new(etag, req.part_number(), part_size))
    }

    async fn send_complete_upload_request(&self, req: CompleteRequest) -> Result<CompletedUpload> {
        req.validate()?;
        let base = self.0.complete_multipart_upload();
        let builder = req.with_builder(base);
        let request = self.1.with_complete_builder(builder);

        let resp = request.send().await.map_err(ErrorRepr::from_sdk_err)?;
        let etag = EntityTag::from_complete_resp(&resp);

        Ok(CompletedUpload::new(req.uri().clone(), etag))
    }

    async fn send_abort_upload_request(&self, req: AbortRequest) -> Result<()> {
        req.validate()?;
        let base = self.0.abort_multipart_upload();
        let builder = req.with_builder(base);
        let request = self.1.with_abort_builder(builder);

        request.send().await.map_err(ErrorRepr::from_sdk_err)?;
        Ok(())
    }
}
