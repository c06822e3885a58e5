//! Admin 认证相关处理器
//!
//! 提供登录、登出、邮箱验证端点

use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};

use super::{
    middleware::{AUTH_COOKIE_NAME, AdminState, CurrentAdmin},
    types::{LoginRequest, SuccessResponse, VerifyEmailRequest},
};

/// POST /api/auth/login
///
/// 校验账号密码，返回 JWT Token，同时写入 HttpOnly Cookie
pub async fn login(
    State(state): State<AdminState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    match state
        .service
        .authenticate(&payload.username, &payload.password)
        .await
    {
        Ok(response) => {
            let max_age = i64::try_from(response.expires_in).unwrap_or(i64::MAX);
            let cookie = Cookie::build((AUTH_COOKIE_NAME, response.token.clone()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Strict)
                .max_age(time::Duration::seconds(max_age));
            (jar.add(cookie), Json(response)).into_response()
        }
        Err(e) => (e.status_code(), Json(e.into_response())).into_response(),
    }
}

/// POST /api/auth/logout
///
/// 吊销当前 token 并清除 Cookie
pub async fn logout(
    State(state): State<AdminState>,
    Extension(current): Extension<CurrentAdmin>,
    jar: CookieJar,
) -> impl IntoResponse {
    match state.service.end_session(&current.token) {
        Ok(()) => {
            let jar = jar.remove(Cookie::build(AUTH_COOKIE_NAME).path("/"));
            (jar, Json(SuccessResponse::new("Logged out"))).into_response()
        }
        Err(e) => (e.status_code(), Json(e.into_response())).into_response(),
    }
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AdminState>,
    Extension(current): Extension<CurrentAdmin>,
) -> impl IntoResponse {
    match state.service.get_by_id(&current.admin_id).await {
        Ok(profile) => Json(profile).into_response(),
        Err(e) => (e.status_code(), Json(e.into_response())).into_response(),
    }
}

/// POST /api/auth/verify-email
pub async fn verify_email(
    State(state): State<AdminState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> impl IntoResponse {
    match state.service.verify_email(&payload.id, &payload.code).await {
        Ok(profile) => Json(profile).into_response(),
        Err(e) => (e.status_code(), Json(e.into_response())).into_response(),
    }
}
