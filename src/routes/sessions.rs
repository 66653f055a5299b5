use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::adaptive::SessionMetrics;
use crate::response::{ok, AppError, SuccessResponse};
use crate::services::sessions::{
    NextItemResponse, StartSessionRequest, StartSessionResponse, SubmitAnswerRequest,
    SubmitAnswerResponse,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub(super) struct SessionQuery {
    #[serde(default)]
    session_id: String,
}

type ApiResult<T> = Result<Json<SuccessResponse<T>>, AppError>;

pub(super) async fn start(
    State(state): State<AppState>,
    body: Result<Json<StartSessionRequest>, JsonRejection>,
) -> ApiResult<StartSessionResponse> {
    let Json(req) = body.map_err(reject)?;
    let started = state.sessions().start_session(req)?;
    Ok(ok(started))
}

pub(super) async fn question(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<NextItemResponse> {
    let next = state.sessions().next_item(&query.session_id).await?;
    Ok(ok(next))
}

pub(super) async fn answer(
    State(state): State<AppState>,
    body: Result<Json<SubmitAnswerRequest>, JsonRejection>,
) -> ApiResult<SubmitAnswerResponse> {
    let Json(req) = body.map_err(reject)?;
    let outcome = state.sessions().submit_answer(req).await?;
    Ok(ok(outcome))
}

pub(super) async fn metrics(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<SessionMetrics> {
    let metrics = state.sessions().metrics(&query.session_id).await?;
    Ok(ok(metrics))
}

fn reject(rejection: JsonRejection) -> AppError {
    AppError::bad_request(rejection.body_text())
}
