//! Excel upload endpoints.

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
};
use maws_common::{AppError, AppResult};
use maws_core::{Capability, MappingImportReport, SimpleImportReport, services::column_mapper};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use super::gallery_with;
use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Largest accepted workbook upload.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Parts of an upload form.
#[derive(Default)]
struct UploadForm {
    file: Option<Vec<u8>>,
    column_mappings: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("잘못된 업로드 요청입니다: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("파일을 읽을 수 없습니다: {e}")))?;
        match name.as_str() {
            "file" => form.file = Some(bytes.to_vec()),
            "column_mappings" => {
                form.column_mappings = Some(String::from_utf8_lossy(&bytes).into_owned());
            }
            _ => {}
        }
    }
    Ok(form)
}

fn require_file(form: &UploadForm) -> AppResult<&[u8]> {
    form.file
        .as_deref()
        .filter(|f| !f.is_empty())
        .ok_or_else(|| AppError::BadRequest("파일이 없습니다.".to_string()))
}

/// Decode the `column_mappings` form field. Missing or blank means no mapping.
fn parse_mappings(raw: Option<&str>) -> AppResult<BTreeMap<String, String>> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| AppError::BadRequest(format!("column_mappings 형식이 잘못되었습니다: {e}"))),
        None => Ok(BTreeMap::new()),
    }
}

/// Import with a header-to-column mapping.
async fn upload(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<ApiResponse<MappingImportReport>> {
    let gallery = gallery_with(&state, &user, Capability::ManageClients).await?;
    let form = read_form(multipart).await?;
    let mapping = parse_mappings(form.column_mappings.as_deref())?;
    let file = require_file(&form)?;

    info!(gallery_id = %gallery.id, user_id = %user.id, bytes = file.len(), "Excel upload");
    let report = state.excel.import_with_mapping(&gallery.id, file, &mapping).await?;
    Ok(ApiResponse::ok(report))
}

/// Import using the built-in header rules.
async fn upload_simple(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<ApiResponse<SimpleImportReport>> {
    let gallery = gallery_with(&state, &user, Capability::ManageClients).await?;
    let form = read_form(multipart).await?;
    let file = require_file(&form)?;

    info!(gallery_id = %gallery.id, user_id = %user.id, bytes = file.len(), "Simple Excel upload");
    Ok(ApiResponse::ok(state.excel.import_simple(&gallery.id, file).await?))
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeHeadersRequest {
    #[serde(default)]
    pub headers: Vec<String>,
}

#[derive(Serialize)]
pub struct AnalyzeHeadersResponse {
    pub mapping: BTreeMap<String, String>,
}

async fn analyze_headers(
    AuthUser(_user): AuthUser,
    Json(req): Json<AnalyzeHeadersRequest>,
) -> AppResult<ApiResponse<AnalyzeHeadersResponse>> {
    if req.headers.is_empty() {
        return Err(AppError::BadRequest("headers가 필요합니다.".to_string()));
    }
    Ok(ApiResponse::ok(AnalyzeHeadersResponse {
        mapping: column_mapper::analyze_headers(&req.headers),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ProcessDataRequest {
    #[serde(default)]
    pub data: Vec<Map<String, Value>>,
}

#[derive(Serialize)]
pub struct ProcessDataResponse {
    pub processed_data: Vec<Map<String, Value>>,
    pub column_mapping: BTreeMap<String, String>,
}

/// Rename row keys to field names.
async fn process_data(
    AuthUser(_user): AuthUser,
    Json(req): Json<ProcessDataRequest>,
) -> AppResult<ApiResponse<ProcessDataResponse>> {
    if req.data.is_empty() {
        return Err(AppError::BadRequest("data가 필요합니다.".to_string()));
    }
    let (processed_data, column_mapping) = column_mapper::process_data(&req.data);
    Ok(ApiResponse::ok(ProcessDataResponse {
        processed_data,
        column_mapping,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .route("/upload-simple", post(upload_simple))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .route("/analyze-headers", post(analyze_headers))
        .route("/process-data", post(process_data))
}
