use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    utils::{Claims, message_to_api_response, success_to_api_response},
};

use super::model::{
    ChangeStatusRequest, Complaint, ComplaintInfo, CreateComplaintRequest, SoftDeleteRequest,
    UpdateComplaintRequest,
};

#[axum::debug_handler]
pub async fn create_complaint(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateComplaintRequest>,
) -> Result<impl IntoResponse, AppError> {
    let complaint = Complaint::create(&state.pool, claims.sub, req).await?;

    Ok((
        StatusCode::CREATED,
        success_to_api_response(Some("complaint created"), ComplaintInfo::from(complaint)),
    ))
}

#[axum::debug_handler]
pub async fn list_complaints(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let complaints = Complaint::list_for(&state.pool, claims.sub, claims.role).await?;
    let infos = complaints
        .into_iter()
        .map(ComplaintInfo::from)
        .collect::<Vec<_>>();

    Ok((StatusCode::OK, success_to_api_response(None, infos)))
}

#[axum::debug_handler]
pub async fn update_complaint(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(complaint_id): Path<Uuid>,
    Json(req): Json<UpdateComplaintRequest>,
) -> Result<impl IntoResponse, AppError> {
    let complaint = Complaint::update_fields(&state.pool, claims.sub, complaint_id, req).await?;

    Ok((
        StatusCode::OK,
        success_to_api_response(Some("complaint updated"), ComplaintInfo::from(complaint)),
    ))
}

/// Reached only through the manager gate.
#[axum::debug_handler]
pub async fn change_status(
    State(state): State<AppState>,
    Path(complaint_id): Path<Uuid>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let new_status = req.validate()?;
    let complaint = Complaint::change_status(&state.pool, complaint_id, new_status).await?;

    Ok((
        StatusCode::OK,
        success_to_api_response(Some("complaint status updated"), ComplaintInfo::from(complaint)),
    ))
}

#[axum::debug_handler]
pub async fn delete_complaint(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(complaint_id): Path<Uuid>,
    Json(req): Json<SoftDeleteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let reason = req.validate()?;
    Complaint::soft_delete(&state.pool, claims.sub, complaint_id, &reason).await?;

    Ok((StatusCode::OK, message_to_api_response("complaint deleted")))
}
