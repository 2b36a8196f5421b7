//! Import Routes
//!
//! - POST /api/v1/import - Start an import run
//! - GET /api/v1/import/status - Current run state

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::{ImportAccepted, ImportRequest, ImportStatusResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::import::report::{progress_label, FailureReport, ImportSummary};
use crate::import::{ImportSnapshot, ImportState, Record};

/// POST /api/v1/import
///
/// Starts a run in the background and returns its id. Progress and the
/// outcome are read from the status endpoint. A new request supersedes
/// any run still in progress.
pub async fn start_import(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<(StatusCode, Json<ImportAccepted>)> {
    if request.data_element.id.trim().is_empty() {
        return Err(ApiError::Validation("dataElement.id is required".to_string()));
    }

    let data: Arc<[Record]> = request.data.into();
    let data_element = Arc::new(request.data_element);
    let chunks = state.controller.pipeline().chunk_count(&data);

    let run = state
        .controller
        .begin(Arc::clone(&data), Arc::clone(&data_element))
        .await
        .ok_or_else(|| ApiError::Internal("Import inputs were not accepted".to_string()))?;

    tracing::info!(
        run,
        data_element = %data_element.id,
        records = data.len(),
        chunks,
        "Import requested"
    );

    let controller = Arc::clone(&state.controller);
    tokio::spawn(async move {
        // outcome is published through the controller
        let _ = controller.execute(run, &data, &data_element).await;
    });

    Ok((StatusCode::ACCEPTED, Json(ImportAccepted { run, chunks })))
}

/// GET /api/v1/import/status
pub async fn import_status(State(state): State<Arc<AppState>>) -> Json<ImportStatusResponse> {
    Json(status_response(state.controller.snapshot()))
}

fn status_response(snapshot: ImportSnapshot) -> ImportStatusResponse {
    let message = match &snapshot.state {
        ImportState::Idle => None,
        ImportState::Importing { progress, .. } => Some(progress_label(*progress)),
        ImportState::Completed(result) => Some(ImportSummary(result).to_string()),
        ImportState::Failed(failure) => Some(FailureReport(failure).to_string()),
    };

    ImportStatusResponse {
        run: snapshot.run,
        state: snapshot.state,
        message,
    }
}
