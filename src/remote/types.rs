use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub file_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    /// Balance-sheet-shaped payload to deep-merge into the active sheet.
    pub balance_sheet_data: Option<serde_json::Value>,
}

/// A quiz question as returned by the problem service. The shape is owned
/// by the service, so the record is kept as raw JSON.
pub type Problem = serde_json::Value;
