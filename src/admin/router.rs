//! Admin API 路由配置

use axum::{
    Router, middleware,
    routing::{get, post},
};

use super::{
    auth_handlers::{login, logout, me, verify_email},
    handlers::{
        block_admin, create_admin, get_admin, list_admins, remove_admins, unblock_admin,
        update_admin,
    },
    middleware::{AdminState, admin_auth_middleware},
};

/// 创建认证路由
///
/// # 端点
/// - `POST /login` - 登录，返回 token
/// - `POST /verify-email` - 使用验证码完成邮箱验证
/// - `POST /logout` - 吊销当前 token（需认证）
/// - `GET /me` - 当前管理员信息（需认证）
pub fn create_auth_router(state: AdminState) -> Router {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ));

    Router::new()
        .route("/login", post(login))
        .route("/verify-email", post(verify_email))
        .merge(protected)
        .with_state(state)
}

/// 创建 Admin API 路由
///
/// # 端点
/// - `GET /admins` - 分页查询管理员（search、page、limit）
/// - `POST /admins` - 创建管理员
/// - `DELETE /admins` - 批量删除管理员
/// - `GET /admins/{id}` - 获取管理员
/// - `PUT /admins/{id}` - 更新管理员
/// - `POST /admins/{id}/block` - 封禁
/// - `POST /admins/{id}/unblock` - 解封
///
/// # 认证
/// 支持 `Authorization: Bearer <token>` header 或登录时写入的 Cookie
pub fn create_admin_router(state: AdminState) -> Router {
    Router::new()
        .route(
            "/admins",
            get(list_admins).post(create_admin).delete(remove_admins),
        )
        .route("/admins/{id}", get(get_admin).put(update_admin))
        .route("/admins/{id}/block", post(block_admin))
        .route("/admins/{id}/unblock", post(unblock_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}
