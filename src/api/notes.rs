//! Notes Routes
//!
//! PDF notes private to their owner. The PDF itself lives in object storage
//! under `{user_id}/{millis}-{safe_name}`; the note row keeps the key.
//!
//! Routes:
//! - GET /notes - List notes, most recently updated first
//! - POST /notes - Upload a PDF (multipart: `file`, optional `title`)
//! - PATCH /notes/:id - Rename a note
//! - DELETE /notes/:id - Delete a note and its stored file
//! - GET /notes/:id/file - Download the PDF

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::db::{self, NewNote, Note};
use crate::middleware::AuthUser;
use crate::services::{object_key, safe_file_name};
use crate::{AppState, Error, Result};

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Build note routes. Uploads may be up to `max_upload` bytes.
pub fn routes(max_upload: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_notes)
                .post(upload_note)
                // Multipart framing on top of the file itself
                .layer(DefaultBodyLimit::max(max_upload + 64 * 1024)),
        )
        .route("/:id", patch(rename_note).delete(delete_note))
        .route("/:id/file", get(download_note))
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub title: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /notes
async fn list_notes(State(state): State<AppState>, user: AuthUser) -> Result<Json<Vec<Note>>> {
    Ok(Json(db::list_notes(&state.db, &user.user_id).await?))
}

/// Upload a PDF note.
///
/// POST /notes
async fn upload_note(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Note>)> {
    let max_size = state.config.storage.max_attachment_size;
    let mut title: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("Failed to read multipart field: {}", e)))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "title" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| Error::Validation(format!("Failed to read title: {}", e)))?;
                title = Some(text);
            }
            "file" => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                if content_type != PDF_CONTENT_TYPE {
                    return Err(Error::InvalidFileType("Only PDF files are allowed".to_string()));
                }
                let filename = field.file_name().unwrap_or("document.pdf").to_string();
                let data = field.bytes().await.map_err(|e| {
                    Error::PayloadTooLarge(format!("Failed to read file: {}", e))
                })?;
                if data.len() > max_size {
                    return Err(Error::PayloadTooLarge(format!(
                        "File exceeds the {} byte limit",
                        max_size
                    )));
                }
                file = Some((filename, data.to_vec()));
            }
            _ => continue,
        }
    }

    let (filename, data) = file.ok_or_else(|| Error::Validation("No file provided".to_string()))?;
    let title = note_title(title.as_deref(), &filename);

    let id = uuid::Uuid::new_v4().to_string();
    let key = object_key(&user.user_id, &id, &filename);
    state.storage.put(&key, &data).await?;

    let created = db::create_note(
        &state.db,
        NewNote {
            id: id.clone(),
            user_id: user.user_id.clone(),
            title,
            pdf_url: Some(format!("/api/notes/{}/file", id)),
            pdf_name: Some(filename),
            storage_key: Some(key.clone()),
        },
    )
    .await;

    match created {
        Ok(note) => {
            info!(note_id = %note.id, size = data.len(), "Note uploaded");
            Ok((StatusCode::CREATED, Json(note)))
        }
        Err(e) => {
            if let Err(cleanup) = state.storage.delete(&key).await {
                warn!(key, error = %cleanup, "Failed to remove orphaned upload");
            }
            Err(e)
        }
    }
}

/// PATCH /notes/:id
async fn rename_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(request): Json<RenameRequest>,
) -> Result<Json<Note>> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(Error::Validation("Title is required".to_string()));
    }
    Ok(Json(db::rename_note(&state.db, &id, &user.user_id, title).await?))
}

/// Delete a note. The stored file is removed best-effort.
///
/// DELETE /notes/:id
async fn delete_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let note = db::delete_note(&state.db, &id, &user.user_id).await?;
    if let Some(key) = note.storage_key {
        if let Err(e) = state.storage.delete(&key).await {
            warn!(key, error = %e, "Failed to delete note file");
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /notes/:id/file
async fn download_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response> {
    let note = db::get_owned_note(&state.db, &id, &user.user_id).await?;
    let key = note
        .storage_key
        .ok_or_else(|| Error::NotFound("Note has no file".to_string()))?;
    let data = state.storage.get(&key).await?;
    let filename = safe_file_name(note.pdf_name.as_deref().unwrap_or("note.pdf"));

    Response::builder()
        .header(header::CONTENT_TYPE, PDF_CONTENT_TYPE)
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", filename),
        )
        .header(header::CONTENT_LENGTH, data.len())
        .body(Body::from(data))
        .map_err(|e| Error::Internal(format!("Failed to build response: {}", e)))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Explicit title, else the file name without `.pdf`, else `Untitled`.
fn note_title(explicit: Option<&str>, filename: &str) -> String {
    if let Some(title) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return title.to_string();
    }
    let stem = if filename.to_ascii_lowercase().ends_with(".pdf") {
        &filename[..filename.len() - 4]
    } else {
        filename
    };
    let stem = stem.trim();
    if stem.is_empty() {
        "Untitled".to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_title() {
        assert_eq!(note_title(Some(" Lecture 1 "), "x.pdf"), "Lecture 1");
        assert_eq!(note_title(Some("  "), "Rust Book.PDF"), "Rust Book");
        assert_eq!(note_title(None, "notes"), "notes");
        assert_eq!(note_title(None, ".pdf"), "Untitled");
    }
}
