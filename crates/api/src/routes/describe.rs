//! Describe-image route

use std::sync::Arc;
use std::time::Instant;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use image_classifier::Prediction;
use pixel_tensor::{decode_image, RGB_CHANNELS};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::upload::{stage_upload, StagedUpload};
use crate::AppState;

/// Classify one uploaded image.
///
/// Requests that are not multipart at all are treated the same as a multipart
/// body without the image field.
pub async fn describe_image(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<Prediction>>, ApiError> {
    let request_id = Uuid::new_v4();
    let start = Instant::now();

    let result = async {
        let mut multipart = multipart.map_err(|e| {
            debug!("Not a multipart request: {}", e);
            ApiError::MissingInput
        })?;
        handle(&state, &mut multipart).await
    }
    .instrument(info_span!("describe_image", %request_id))
    .await;

    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => e.outcome(),
    };
    crate::metrics::record_request(outcome, start.elapsed());

    result.map(Json)
}

async fn handle(state: &AppState, multipart: &mut Multipart) -> Result<Vec<Prediction>, ApiError> {
    let upload = stage_upload(multipart, &state.upload.field_name, &state.upload.dir)
        .await?
        .ok_or(ApiError::MissingInput)?;

    info!(
        "Received {:?} ({} bytes) in field {}",
        upload.file_name().unwrap_or("<unnamed>"),
        upload.size(),
        upload.field_name()
    );

    let result = classify_upload(state, &upload).await;

    let path = upload.path().to_path_buf();
    if let Err(e) = upload.remove() {
        warn!("Failed to remove upload {}: {}", path.display(), e);
        crate::metrics::record_cleanup_failure();
    }

    result
}

async fn classify_upload(state: &AppState, upload: &StagedUpload) -> Result<Vec<Prediction>, ApiError> {
    let bytes = upload.read().await?;

    let decoded = tokio::task::spawn_blocking(move || decode_image(&bytes, RGB_CHANNELS)).await??;
    debug!(
        "Decoded {:?} into rank-{} tensor {:?}",
        decoded.format,
        decoded.tensor.rank(),
        decoded.tensor.shape()
    );

    let classifier = state.model.get().await?;
    let image = decoded.tensor.into_rgb();

    let predictions = tokio::task::spawn_blocking(move || classifier.classify(&image)).await??;
    if let Some(top) = predictions.first() {
        info!("Top prediction: {} ({:.3})", top.class_name, top.probability);
    }
    Ok(predictions)
}
