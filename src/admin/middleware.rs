//! Admin API 中间件

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use axum_extra::extract::CookieJar;

use super::service::AdminService;
use super::types::AdminErrorResponse;
use crate::common::auth;

/// Cookie 名称
pub const AUTH_COOKIE_NAME: &str = "admin_auth";

/// Admin API 共享状态
#[derive(Clone)]
pub struct AdminState {
    /// Admin 服务
    pub service: Arc<AdminService>,
}

impl AdminState {
    pub fn new(service: AdminService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// 当前请求的已认证管理员（由中间件注入请求扩展）
#[derive(Debug, Clone)]
pub struct CurrentAdmin {
    pub admin_id: String,
    /// 原始 token（登出时吊销）
    pub token: String,
}

/// 从请求中提取 JWT token
fn extract_token(jar: &CookieJar, request: &Request<Body>) -> Option<String> {
    // 1. 优先从 Authorization header 获取
    if let Some(token) = auth::extract_bearer_token(request) {
        return Some(token);
    }

    // 2. 从 Cookie 获取
    jar.get(AUTH_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Admin API 认证中间件
pub async fn admin_auth_middleware(
    State(state): State<AdminState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_token(&jar, &request) else {
        let error = AdminErrorResponse::authentication_error();
        return (StatusCode::UNAUTHORIZED, Json(error)).into_response();
    };

    match state.service.validate_token(&token).await {
        Ok(session) => {
            tracing::debug!(
                admin_id = %session.admin_id,
                expires_at = session.expires_at,
                "token 校验通过"
            );
            request.extensions_mut().insert(CurrentAdmin {
                admin_id: session.admin_id,
                token,
            });
            next.run(request).await
        }
        Err(e) => (e.status_code(), Json(e.into_response())).into_response(),
    }
}
