//! Admin API HTTP 处理器

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::{
    middleware::AdminState,
    types::{
        ListAdminsQuery, RegisterAdminRequest, RemoveAdminsRequest, SuccessResponse,
        UpdateAdminRequest,
    },
};

/// GET /api/admin/admins
/// 分页查询管理员
pub async fn list_admins(
    State(state): State<AdminState>,
    Query(query): Query<ListAdminsQuery>,
) -> impl IntoResponse {
    let search = query.search.unwrap_or_default();
    match state.service.list(&search, query.page, query.limit).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => (e.status_code(), Json(e.into_response())).into_response(),
    }
}

/// POST /api/admin/admins
/// 创建管理员
pub async fn create_admin(
    State(state): State<AdminState>,
    Json(payload): Json<RegisterAdminRequest>,
) -> impl IntoResponse {
    match state.service.register(payload).await {
        Ok(profile) => (StatusCode::CREATED, Json(profile)).into_response(),
        Err(e) => (e.status_code(), Json(e.into_response())).into_response(),
    }
}

/// DELETE /api/admin/admins
/// 批量删除管理员
pub async fn remove_admins(
    State(state): State<AdminState>,
    Json(payload): Json<RemoveAdminsRequest>,
) -> impl IntoResponse {
    let count = payload.ids.len();
    match state.service.remove(payload.ids).await {
        Ok(_) => Json(SuccessResponse::new(format!("{} admin(s) removed", count))).into_response(),
        Err(e) => (e.status_code(), Json(e.into_response())).into_response(),
    }
}

/// GET /api/admin/admins/{id}
pub async fn get_admin(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.service.get_by_id(&id).await {
        Ok(profile) => Json(profile).into_response(),
        Err(e) => (e.status_code(), Json(e.into_response())).into_response(),
    }
}

/// PUT /api/admin/admins/{id}
pub async fn update_admin(
    State(state): State<AdminState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateAdminRequest>,
) -> impl IntoResponse {
    match state.service.update(&id, payload).await {
        Ok(profile) => Json(profile).into_response(),
        Err(e) => (e.status_code(), Json(e.into_response())).into_response(),
    }
}

/// POST /api/admin/admins/{id}/block
pub async fn block_admin(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.service.block(&id).await {
        Ok(profile) => Json(profile).into_response(),
        Err(e) => (e.status_code(), Json(e.into_response())).into_response(),
    }
}

/// POST /api/admin/admins/{id}/unblock
pub async fn unblock_admin(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.service.unblock(&id).await {
        Ok(profile) => Json(profile).into_response(),
        Err(e) => (e.status_code(), Json(e.into_response())).into_response(),
    }
}
