//! Client side of the external field-extraction service.
//!
//! The service takes a document image and answers with the fields it found
//! (`{"fields": {...}, "confidence": {...}, "raw_text": "..."}`). OCR and
//! field heuristics live entirely on the service side.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{OverlayError, Result};
use crate::fields::{ExtractionResponse, FieldMap};

fn default_document_type() -> String {
    "general".to_string()
}

fn default_language() -> String {
    "eng".to_string()
}

/// Hints passed to the extraction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractRequest {
    /// `id_card`, `passport`, `form` or `general`.
    #[serde(default = "default_document_type")]
    pub document_type: String,
    /// Tesseract language code (`eng`, `spa`, `fra`, ...).
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for ExtractRequest {
    fn default() -> Self {
        Self {
            document_type: default_document_type(),
            language: default_language(),
        }
    }
}

/// Something that turns a document image into field data.
#[async_trait]
pub trait FieldSource: Send + Sync {
    async fn extract(
        &self,
        document: Vec<u8>,
        filename: &str,
        request: &ExtractRequest,
    ) -> Result<FieldMap>;
}

/// Extraction over HTTP.
pub struct HttpFieldSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFieldSource {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("formfill/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OverlayError::Extraction(format!("HTTP client error: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/extract-fields", self.base_url)
    }
}

#[async_trait]
impl FieldSource for HttpFieldSource {
    async fn extract(
        &self,
        document: Vec<u8>,
        filename: &str,
        request: &ExtractRequest,
    ) -> Result<FieldMap> {
        let mime = image::guess_format(&document)
            .map(|f| f.to_mime_type())
            .unwrap_or("application/octet-stream");
        let part = reqwest::multipart::Part::bytes(document)
            .file_name(filename.to_string())
            .mime_str(mime)
            .map_err(|e| OverlayError::Extraction(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint())
            .query(&[
                ("document_type", request.document_type.as_str()),
                ("language", request.language.as_str()),
            ])
            .multipart(form)
            .send()
            .await
            .map_err(|e| OverlayError::Extraction(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OverlayError::Extraction(format!(
                "service returned {}: {}",
                status, body
            )));
        }

        let parsed: ExtractionResponse = response
            .json()
            .await
            .map_err(|e| OverlayError::Extraction(format!("invalid response: {}", e)))?;
        tracing::info!(
            "extracted {} field(s) from {} ({})",
            parsed.fields.len(),
            filename,
            request.document_type
        );
        Ok(parsed.fields)
    }
}

/// Returns the same fields for every document.
pub struct StaticFieldSource(pub FieldMap);

#[async_trait]
impl FieldSource for StaticFieldSource {
    async fn extract(&self, _: Vec<u8>, _: &str, _: &ExtractRequest) -> Result<FieldMap> {
        Ok(self.0.clone())
    }
}
