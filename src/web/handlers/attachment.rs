//! Attachment download handler.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};

use crate::attachment::{content_disposition, AttachmentService};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::MaybeUser;

/// Types served as-is; anything else goes out as `application/octet-stream`
/// so browsers never render uploaded markup.
fn is_safe_type(mime: &str) -> bool {
    matches!(
        mime,
        "image/png" | "image/jpeg" | "image/gif" | "image/webp" | "text/plain"
    )
}

/// GET /api/attachments/:id - Download a file.
pub async fn download_attachment(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Path(attachment_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let download = AttachmentService::new(&state.db, &state.storage, &state.config.attachments)
        .download(attachment_id, viewer.user())
        .await?;
    let attachment = download.attachment;

    let disposition = content_disposition(&attachment.original_name);
    let content_type = if is_safe_type(&attachment.mime_type) {
        attachment.mime_type
    } else {
        "application/octet-stream".to_string()
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, "private, max-age=3600".to_string()),
        ],
        download.content,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_types() {
        assert!(is_safe_type("image/png"));
        assert!(is_safe_type("text/plain"));
        assert!(!is_safe_type("text/html"));
        assert!(!is_safe_type("image/svg+xml"));
        assert!(!is_safe_type("application/pdf"));
    }
}
