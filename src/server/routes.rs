//! `POST /api/analyze`.

use super::filename::secure_filename;
use super::AppState;
use crate::error::FileError;
use crate::output::AnalysisResult;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// An upload after it has been read from the request.
enum Upload {
    Saved { path: PathBuf, name: String },
    Failed(AnalysisResult),
}

async fn save_upload(dir: &Path, slot: usize, name: &str, data: &[u8]) -> Result<PathBuf, FileError> {
    let slot_dir = dir.join(slot.to_string());
    let failed = |e: std::io::Error| FileError::UploadFailed {
        detail: e.to_string(),
    };
    tokio::fs::create_dir(&slot_dir).await.map_err(failed)?;
    let path = slot_dir.join(name);
    tokio::fs::write(&path, data).await.map_err(failed)?;
    Ok(path)
}

/// Handle a multipart analysis request.
///
/// Uploads are stored in a temporary directory that is removed when the
/// handler returns, whatever the outcome. A body that is not multipart is
/// answered like a request without files.
pub async fn analyze_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut multipart = match multipart {
        Ok(m) => m,
        Err(rejection) => {
            warn!("Request is not multipart: {}", rejection);
            return json_error(StatusCode::BAD_REQUEST, "No files part in the request");
        }
    };

    let tmp = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            error!("Could not create temporary directory: {}", e);
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Could not store uploads");
        }
    };

    let mut saw_files_field = false;
    let mut prompt = String::new();
    let mut model_override: Option<String> = None;
    let mut uploads: Vec<Upload> = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Malformed multipart request: {}", e);
                return json_error(StatusCode::BAD_REQUEST, format!("Malformed multipart request: {e}"));
            }
        };

        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "files" => {
                saw_files_field = true;
                let original = field.file_name().unwrap_or("").to_string();
                if original.is_empty() {
                    warn!("Skipping file with empty filename");
                    continue;
                }
                let mut name = secure_filename(&original);
                if name.is_empty() {
                    name = format!("upload_{}", uploads.len() + 1);
                }
                let upload = match field.bytes().await {
                    Ok(data) => {
                        debug!("Received {} ({} bytes)", name, data.len());
                        match save_upload(tmp.path(), uploads.len(), &name, &data).await {
                            Ok(path) => Upload::Saved { path, name },
                            Err(e) => Upload::Failed(AnalysisResult::error(name, &e)),
                        }
                    }
                    Err(e) => Upload::Failed(AnalysisResult::error(
                        name,
                        &FileError::UploadFailed {
                            detail: e.to_string(),
                        },
                    )),
                };
                uploads.push(upload);
            }
            "prompt" => match field.text().await {
                Ok(text) => prompt = text,
                Err(e) => {
                    return json_error(StatusCode::BAD_REQUEST, format!("Could not read prompt: {e}"))
                }
            },
            "model" => match field.text().await {
                Ok(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        model_override = Some(text.to_string());
                    }
                }
                Err(e) => {
                    return json_error(StatusCode::BAD_REQUEST, format!("Could not read model: {e}"))
                }
            },
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    if !saw_files_field {
        warn!("Request has no 'files' part");
        return json_error(StatusCode::BAD_REQUEST, "No files part in the request");
    }
    let prompt = prompt.trim();
    if prompt.is_empty() {
        warn!("Prompt text is missing or empty");
        return json_error(StatusCode::BAD_REQUEST, "Prompt text is required");
    }
    if uploads.is_empty() {
        warn!("No files selected");
        return json_error(StatusCode::BAD_REQUEST, "No files selected");
    }

    info!(
        "Received {} file(s); prompt: '{}'",
        uploads.len(),
        prompt.chars().take(100).collect::<String>()
    );

    let mut results = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let result = match upload {
            Upload::Saved { path, name } => {
                state
                    .analyzer
                    .analyze_named(&path, &name, prompt, model_override.as_deref())
                    .await
            }
            Upload::Failed(result) => result,
        };
        results.push(result);
    }
    drop(tmp);

    let (status, body) = build_response(&results);
    info!("Responding with {}", status);
    (status, Json(body)).into_response()
}

/// Shape per-file results into the response status and JSON body.
///
/// Info results count as analysis entries.
pub fn build_response(results: &[AnalysisResult]) -> (StatusCode, Value) {
    let (failed, analysed): (Vec<&AnalysisResult>, Vec<&AnalysisResult>) =
        results.iter().partition(|r| r.is_error());

    let analysis: Vec<Value> = analysed
        .iter()
        .map(|r| json!({ "filename": r.filename, "analysis": r.rendered() }))
        .collect();
    let errors: Vec<Value> = failed
        .iter()
        .map(|r| json!({ "filename": r.filename, "error": r.rendered() }))
        .collect();

    match (analysed.as_slice(), errors.is_empty()) {
        ([], false) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "Analysis failed for all files", "details": errors }),
        ),
        (_, false) => (
            StatusCode::MULTI_STATUS,
            json!({ "message": "Partial success", "analysis": analysis, "errors": errors }),
        ),
        ([], true) => (
            StatusCode::BAD_REQUEST,
            json!({ "error": "No analysis could be performed (check file validity or logs)" }),
        ),
        ([single], true) => (StatusCode::OK, json!({ "analysis": single.rendered() })),
        (_, true) => (StatusCode::OK, json!({ "analysis": analysis })),
    }
}
