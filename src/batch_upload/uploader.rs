use color_eyre::eyre::{Result, WrapErr};
use reqwest::multipart::{Form, Part};
use url::Url;

use crate::batch_upload::SelectedFile;
use crate::http_server::http_routes::upload::UploadResponse;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Upload request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Upload rejected with status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Sends one file to the upload endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, file: &SelectedFile, prefix: &str) -> Result<UploadResponse, UploadError>;
}

/// Multipart client for `POST /api/upload`.
pub struct HttpUploader {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpUploader {
    pub fn new(server: &Url) -> Result<Self> {
        let endpoint = server
            .join("api/upload")
            .wrap_err_with(|| format!("Invalid server URL: {server}"))?;

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, file: &SelectedFile, prefix: &str) -> Result<UploadResponse, UploadError> {
        let part = Part::bytes(file.bytes.as_ref().clone())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)?;
        let form = Form::new()
            .part("file", part)
            .text("prefix", prefix.to_string());

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<UploadResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_is_resolved_against_server() {
        let uploader = HttpUploader::new(&Url::parse("http://localhost:3000/").unwrap()).unwrap();
        assert_eq!(
            uploader.endpoint().as_str(),
            "http://localhost:3000/api/upload"
        );
    }
}
