//! Admin 模块
//!
//! # 功能
//! - 管理员认证（登录/登出/邮箱验证）
//! - 管理员管理（CRUD、封禁/解封、分页搜索）
//! - 事件邮件通知

mod auth_handlers;
pub mod email;
mod error;
mod handlers;
pub mod jwt;
mod middleware;
mod model;
mod revocation;
mod router;
mod service;
pub mod store;
mod types;

pub use email::{EmailNotifier, LogNotifier, Notifier};
pub use jwt::JwtManager;
pub use middleware::AdminState;
pub use revocation::RevocationList;
pub use router::{create_admin_router, create_auth_router};
pub use service::{AdminService, ServiceSettings};
pub use store::SqliteAdminStore;
