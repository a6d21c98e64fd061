//! REST API client for the composer HTTP endpoints.
//!
//! Wraps the composer service API (file upload and training, status lookup,
//! job cancellation, composition generation) using [`reqwest`].

use std::time::Duration;

use serde::Deserialize;

use cadenza_core::artifact::Artifact;
use cadenza_core::status::JobStatus;

/// A user-selected file queued for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Filename sent in the multipart part (display name only).
    pub name: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// HTTP client for a single composer service.
pub struct ComposerApi {
    client: reqwest::Client,
    api_url: String,
}

/// Response returned by `POST /upload-and-train` after a job is accepted.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Server-assigned identifier for the new job.
    pub job_id: String,
    /// Initial human-readable message (e.g. "queued").
    pub message: String,
}

/// Response returned by `GET /status/{job_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub status: JobStatus,
    pub message: String,
}

/// Errors from the composer REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ComposerApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Composer API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for diagnostics.
        body: String,
    },
}

impl ComposerApi {
    /// Create a new API client for a composer service.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://localhost:8000`.
    /// * `request_timeout` - Per-request timeout applied to every call.
    pub fn new(api_url: String, request_timeout: Duration) -> Result<Self, ComposerApiError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self { client, api_url })
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self { client, api_url }
    }

    /// HTTP base URL this client talks to.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Upload MIDI files and start a training job.
    ///
    /// Sends a `POST /upload-and-train` request with one multipart part per
    /// file, all under the repeated field name `files`.  Returns the
    /// server-assigned `job_id` and its initial message.
    pub async fn upload_and_train(
        &self,
        files: Vec<UploadFile>,
    ) -> Result<SubmitResponse, ComposerApiError> {
        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let part = reqwest::multipart::Part::bytes(file.bytes)
                .file_name(file.name)
                .mime_str("audio/midi")?;
            form = form.part("files", part);
        }

        let response = self
            .client
            .post(format!("{}/upload-and-train", self.api_url))
            .multipart(form)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Look up the current status of a job.
    ///
    /// Sends a `GET /status/{job_id}` request.
    pub async fn job_status(&self, job_id: &str) -> Result<StatusResponse, ComposerApiError> {
        let response = self
            .client
            .get(format!("{}/status/{}", self.api_url, job_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Ask the service to stop a running job.
    ///
    /// Sends a `POST /stop/{job_id}` request.  The response body is ignored;
    /// whether the cancellation took effect is only observable through
    /// subsequent status polls.
    pub async fn stop_job(&self, job_id: &str) -> Result<(), ComposerApiError> {
        let response = self
            .client
            .post(format!("{}/stop/{}", self.api_url, job_id))
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Retrieve the generated composition for a completed job.
    ///
    /// Sends a `GET /generate/{job_id}` request and returns the binary
    /// response body as an [`Artifact`].
    pub async fn generate(&self, job_id: &str) -> Result<Artifact, ComposerApiError> {
        let response = self
            .client
            .get(format!("{}/generate/{}", self.api_url, job_id))
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        Ok(Artifact::new(bytes.to_vec()))
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code.  Returns the response
    /// unchanged on success, or a [`ComposerApiError::Api`] containing the
    /// status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ComposerApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ComposerApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ComposerApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ComposerApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}
