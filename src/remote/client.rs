use crate::config::WorkspaceConfig;
use crate::error::{BalanceSheetError, Result};
use crate::export::ExportedSheet;
use crate::remote::types::*;
use log::{debug, warn};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::Path;
use tokio::fs;

/// HTTP client for the upload/analysis and problem service.
///
/// Nothing here touches workspace state: callers feed results into
/// `Workspace::apply_analysis`, so a failed call never leaves a partial
/// merge behind.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &WorkspaceConfig) -> Self {
        Self::new(config.backend_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn check(res: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let error_text = res.text().await.unwrap_or_default();
        warn!("{} failed (status {}): {}", what, status, error_text);
        Err(BalanceSheetError::ExternalCall(format!(
            "{} failed (status {}): {}",
            what, status, error_text
        )))
    }

    /// Uploads a file and returns the reference used by `analyze_file_url`.
    pub async fn upload_file(&self, path: &Path) -> Result<String> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| BalanceSheetError::ExternalCall("Invalid file name".to_string()))?
            .to_string();
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();
        let file_bytes = fs::read(path).await?;

        let part = Part::bytes(file_bytes)
            .file_name(file_name.clone())
            .mime_str(&mime_type)?;
        let form = Form::new().part("file", part);

        let res = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;
        let body: UploadResponse = Self::check(res, "File upload").await?.json().await?;
        debug!("Uploaded '{}' ({})", file_name, mime_type);

        body.file_url
            .ok_or_else(|| BalanceSheetError::ExternalCall("File upload failed.".to_string()))
    }

    /// Exchanges an uploaded file reference for a balance sheet payload.
    /// `None` means the service found nothing to merge.
    pub async fn analyze_file_url(&self, file_url: &str) -> Result<Option<serde_json::Value>> {
        let res = self
            .client
            .post(self.endpoint("analyzeFileUrl"))
            .json(&AnalyzeRequest {
                file_url: file_url.to_string(),
            })
            .send()
            .await?;
        let body: AnalyzeResponse = Self::check(res, "File analysis").await?.json().await?;
        Ok(body.balance_sheet_data)
    }

    /// Upload followed by analysis.
    pub async fn analyze_file(&self, path: &Path) -> Result<Option<serde_json::Value>> {
        let file_url = self.upload_file(path).await?;
        self.analyze_file_url(&file_url).await
    }

    pub async fn fetch_random_problems(&self, kind: &str) -> Result<Vec<Problem>> {
        let res = self
            .client
            .get(self.endpoint("problems/random"))
            .query(&[("type", kind)])
            .send()
            .await?;
        Ok(Self::check(res, "Fetching problems").await?.json().await?)
    }

    /// Hands the flattened sheets to the processing endpoint.
    pub async fn process_financial_data(
        &self,
        sheets: &[ExportedSheet],
    ) -> Result<serde_json::Value> {
        let res = self
            .client
            .post(self.endpoint("process-data"))
            .json(sheets)
            .send()
            .await?;
        Ok(Self::check(res, "Processing financial data").await?.json().await?)
    }
}
