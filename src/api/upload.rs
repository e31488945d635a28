use axum::{
    Json, Router,
    extract::{Request, State},
    http::header,
    routing::post,
};
use multer::{Constraints, Multipart, SizeLimit};
use std::sync::Arc;

use crate::api::AppState;
use crate::services::file_storage::FileStorage;
use crate::services::file_validation::{MAX_FILES_PER_UPLOAD, validate_mime_type};
use crate::services::upload::{StagedBatch, UploadOptions, UploadReceipt, publish_batch};
use crate::utils::error::{AppError, AppResult};

const FORM_FIELD_LIMIT: u64 = 64 * 1024;

async fn upload(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> AppResult<Json<UploadReceipt>> {
    let boundary = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or_else(|| AppError::BadRequest("Expected multipart/form-data".to_string()))?;

    let max_file_size = state.config.max_file_size;
    let constraints = Constraints::new().size_limit(
        SizeLimit::new()
            .whole_stream(
                max_file_size
                    .saturating_mul(MAX_FILES_PER_UPLOAD as u64)
                    .saturating_add(1024 * 1024),
            )
            .for_field("expirationDays", FORM_FIELD_LIMIT)
            .for_field("password", FORM_FIELD_LIMIT)
            .for_field("brandName", FORM_FIELD_LIMIT)
            .for_field("language", FORM_FIELD_LIMIT),
    );
    let mut multipart =
        Multipart::with_constraints(request.into_body().into_data_stream(), boundary, constraints);

    let mut batch = StagedBatch::new(state.storage.clone());
    let options = match read_form(&mut multipart, &state.storage, max_file_size, &mut batch).await
    {
        Ok(options) => options,
        Err(e) => {
            batch.discard().await;
            return Err(e);
        }
    };

    tracing::info!(
        "Upload received: {} files, {} bytes",
        batch.len(),
        batch.total_size()
    );

    let receipt = publish_batch(&state.store, &state.config, batch, options).await?;
    Ok(Json(receipt))
}

/// Streams every `files` part to storage and collects the text fields.
/// Files already written stay in `batch` so the caller can roll them back.
async fn read_form(
    multipart: &mut Multipart<'static>,
    storage: &FileStorage,
    max_file_size: u64,
    batch: &mut StagedBatch,
) -> AppResult<UploadOptions> {
    let mut options = UploadOptions::default();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "files" => {
                if batch.len() >= MAX_FILES_PER_UPLOAD {
                    return Err(AppError::Validation(format!(
                        "Too many files (max {})",
                        MAX_FILES_PER_UPLOAD
                    )));
                }

                let original_name = display_name(field.file_name());
                let declared = field
                    .content_type()
                    .map(|m| m.to_string())
                    .unwrap_or_default();
                let mime_type = validate_mime_type(&declared)?;

                let mut sink = storage
                    .create_sink(&original_name, &mime_type, max_file_size)
                    .await?;
                loop {
                    match field.chunk().await {
                        Ok(Some(chunk)) => {
                            if let Err(e) = sink.write_chunk(&chunk).await {
                                sink.abort().await;
                                return Err(e);
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            sink.abort().await;
                            return Err(multipart_error(e));
                        }
                    }
                }
                batch.push(sink.finish().await?);
            }
            "expirationDays" => {
                let raw = field.text().await.map_err(multipart_error)?;
                options.expiration_days = parse_expiration_days(&raw)?;
            }
            "password" => {
                let raw = field.text().await.map_err(multipart_error)?;
                options.password = Some(raw).filter(|p| !p.is_empty());
            }
            "brandName" => {
                let raw = field.text().await.map_err(multipart_error)?;
                options.brand_name = Some(raw.trim().to_string()).filter(|b| !b.is_empty());
            }
            "language" => {
                let raw = field.text().await.map_err(multipart_error)?;
                options.language = Some(raw.trim().to_string()).filter(|l| !l.is_empty());
            }
            other => {
                tracing::debug!("Ignoring unknown upload field: {}", other);
            }
        }
    }

    Ok(options)
}

fn parse_expiration_days(raw: &str) -> AppResult<Option<i64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    raw.parse::<i64>()
        .map(Some)
        .map_err(|_| AppError::Validation(format!("Invalid expirationDays: {}", raw)))
}

/// Last path component of the client-supplied name; some browsers send
/// full paths.
fn display_name(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| name.rsplit(['/', '\\']).next())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("file")
        .to_string()
}

fn multipart_error(err: multer::Error) -> AppError {
    match err {
        multer::Error::FieldSizeExceeded { .. } | multer::Error::StreamSizeExceeded { .. } => {
            AppError::PayloadTooLarge(err.to_string())
        }
        _ => AppError::BadRequest(format!("Malformed multipart payload: {}", err)),
    }
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(upload))
        .with_state(state)
}
