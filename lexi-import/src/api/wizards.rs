//! Wizard session endpoints
//!
//! POST /wizards creates a session; every other route addresses one session
//! by id and returns its updated state. Sessions live in memory only and are
//! dropped once submitted.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use lexi_common::AuthContext;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{ImportKind, LinkedTextRef, RelationType};
use crate::services::{CommandOutcome, StructureCommand};
use crate::wizard::{ImportWizard, WizardSession};
use crate::AppState;

/// Header carrying the acting CMS user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// POST /wizards request
#[derive(Debug, Deserialize)]
pub struct CreateWizardRequest {
    pub kind: ImportKind,
}

/// POST /wizards/:id/file request
#[derive(Debug, Deserialize)]
pub struct FileRequest {
    pub file_name: String,
    pub content: String,
}

/// POST /wizards/:id/legislation request
#[derive(Debug, Deserialize)]
pub struct LegislationRequest {
    pub legislation_id: u64,
}

/// POST /wizards/:id/selection request
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SelectionRequest {
    Rows { rows: Vec<usize>, selected: bool },
    All { all: bool },
}

/// POST /wizards/:id/links request; without `row` the links go to every selected row
#[derive(Debug, Deserialize)]
pub struct LinksRequest {
    #[serde(default)]
    pub row: Option<usize>,
    pub relation: RelationType,
    #[serde(default)]
    pub ids: Vec<u64>,
}

/// GET /wizards/:id/candidates query
#[derive(Debug, Deserialize)]
pub struct CandidatesQuery {
    pub relation: RelationType,
}

#[derive(Debug, Serialize)]
pub struct LinksResponse {
    pub rows_updated: usize,
    pub session: WizardSession,
}

#[derive(Debug, Serialize)]
pub struct StructureResponse {
    pub outcome: CommandOutcome,
    pub session: WizardSession,
}

/// Credentials from `Authorization: Bearer` and `X-User-Id`, falling back to
/// the service defaults
fn auth_from_headers(headers: &HeaderMap, fallback: &AuthContext) -> AuthContext {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());

    AuthContext::new(token, user_id).or(fallback.clone())
}

async fn find_wizard(state: &AppState, id: Uuid) -> ApiResult<Arc<Mutex<ImportWizard>>> {
    state
        .wizards
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Wizard not found: {}", id)))
}

/// POST /wizards
pub async fn create_wizard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateWizardRequest>,
) -> ApiResult<(StatusCode, Json<WizardSession>)> {
    let auth = auth_from_headers(&headers, &state.default_auth);
    let wizard =
        ImportWizard::start(request.kind, state.repo.clone(), auth, state.page_size).await;
    let session = wizard.session().clone();
    state.wizards.insert(wizard).await;

    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /wizards/:id
pub async fn get_wizard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WizardSession>> {
    let wizard = find_wizard(&state, id).await?;
    let session = wizard.lock().await.session().clone();
    Ok(Json(session))
}

/// DELETE /wizards/:id
pub async fn abandon_wizard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !state.wizards.remove(id).await {
        return Err(ApiError::NotFound(format!("Wizard not found: {}", id)));
    }

    tracing::info!(session_id = %id, "Wizard abandoned");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /wizards/:id/file
pub async fn select_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<FileRequest>,
) -> ApiResult<Json<WizardSession>> {
    let wizard = find_wizard(&state, id).await?;
    let mut wizard = wizard.lock().await;
    wizard.select_file(&request.file_name, &request.content).await?;
    Ok(Json(wizard.session().clone()))
}

/// POST /wizards/:id/legislation
pub async fn select_legislation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<LegislationRequest>,
) -> ApiResult<Json<WizardSession>> {
    let wizard = find_wizard(&state, id).await?;
    let mut wizard = wizard.lock().await;
    wizard.select_legislation(request.legislation_id).await?;
    Ok(Json(wizard.session().clone()))
}

/// POST /wizards/:id/selection
pub async fn update_selection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SelectionRequest>,
) -> ApiResult<Json<WizardSession>> {
    let wizard = find_wizard(&state, id).await?;
    let mut wizard = wizard.lock().await;
    match request {
        SelectionRequest::Rows { rows, selected } => wizard.set_row_selected(&rows, selected)?,
        SelectionRequest::All { all } => wizard.select_all(all)?,
    }
    Ok(Json(wizard.session().clone()))
}

/// GET /wizards/:id/candidates?relation=…
pub async fn list_candidates(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<CandidatesQuery>,
) -> ApiResult<Json<Vec<LinkedTextRef>>> {
    let wizard = find_wizard(&state, id).await?;
    let candidates = wizard.lock().await.candidates(query.relation)?;
    Ok(Json(candidates))
}

/// POST /wizards/:id/links
pub async fn assign_links(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<LinksRequest>,
) -> ApiResult<Json<LinksResponse>> {
    let wizard = find_wizard(&state, id).await?;
    let mut wizard = wizard.lock().await;
    let rows_updated = match request.row {
        Some(row) => {
            wizard.assign_links(row, request.relation, &request.ids)?;
            1
        }
        None => wizard.bulk_assign_links(request.relation, &request.ids)?,
    };
    Ok(Json(LinksResponse {
        rows_updated,
        session: wizard.session().clone(),
    }))
}

/// POST /wizards/:id/structure
pub async fn edit_structure(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(command): Json<StructureCommand>,
) -> ApiResult<Json<StructureResponse>> {
    let wizard = find_wizard(&state, id).await?;
    let mut wizard = wizard.lock().await;
    let outcome = wizard.apply_structure(&command)?;
    Ok(Json(StructureResponse {
        outcome,
        session: wizard.session().clone(),
    }))
}

/// POST /wizards/:id/next
pub async fn next_step(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WizardSession>> {
    let wizard = find_wizard(&state, id).await?;
    let mut wizard = wizard.lock().await;
    wizard.next().await?;
    Ok(Json(wizard.session().clone()))
}

/// POST /wizards/:id/previous
pub async fn previous_step(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WizardSession>> {
    let wizard = find_wizard(&state, id).await?;
    let mut wizard = wizard.lock().await;
    wizard.previous()?;
    Ok(Json(wizard.session().clone()))
}

/// POST /wizards/:id/confirm
///
/// A submitted wizard is done with; it leaves the registry.
pub async fn confirm_import(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WizardSession>> {
    let wizard = find_wizard(&state, id).await?;
    let session = {
        let mut wizard = wizard.lock().await;
        wizard.confirm().await?;
        wizard.session().clone()
    };

    state.wizards.remove(id).await;
    tracing::info!(session_id = %id, "Completed wizard released");
    Ok(Json(session))
}

/// GET /wizards/:id/export
pub async fn export_csv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let wizard = find_wizard(&state, id).await?;
    let wizard = wizard.lock().await;
    let csv = wizard.export()?;
    let disposition = format!(
        "attachment; filename=\"import-{}-{}.csv\"",
        wizard.session().kind.slug(),
        id
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

/// Build wizard routes
pub fn wizard_routes() -> Router<AppState> {
    Router::new()
        .route("/wizards", post(create_wizard))
        .route("/wizards/:id", get(get_wizard).delete(abandon_wizard))
        .route("/wizards/:id/file", post(select_file))
        .route("/wizards/:id/legislation", post(select_legislation))
        .route("/wizards/:id/selection", post(update_selection))
        .route("/wizards/:id/candidates", get(list_candidates))
        .route("/wizards/:id/links", post(assign_links))
        .route("/wizards/:id/structure", post(edit_structure))
        .route("/wizards/:id/next", post(next_step))
        .route("/wizards/:id/previous", post(previous_step))
        .route("/wizards/:id/confirm", post(confirm_import))
        .route("/wizards/:id/export", get(export_csv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_auth_from_headers_prefers_request() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("42"));
        let fallback = AuthContext::new(Some("env".to_string()), Some(1));

        let auth = auth_from_headers(&headers, &fallback);
        assert_eq!(auth.bearer(), Some("abc"));
        assert_eq!(auth.user_id, Some(42));

        let auth = auth_from_headers(&HeaderMap::new(), &fallback);
        assert_eq!(auth.bearer(), Some("env"));
        assert_eq!(auth.user_id, Some(1));
    }

    #[test]
    fn test_selection_request_shapes() {
        let rows: SelectionRequest =
            serde_json::from_str(r#"{"rows":[0,2],"selected":true}"#).unwrap();
        assert!(matches!(rows, SelectionRequest::Rows { selected: true, .. }));
        let all: SelectionRequest = serde_json::from_str(r#"{"all":false}"#).unwrap();
        assert!(matches!(all, SelectionRequest::All { all: false }));
    }
}
