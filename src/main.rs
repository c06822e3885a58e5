mod admin;
mod common;
mod model;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
};
use clap::Parser;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::EnvFilter;

use admin::{
    AdminService, AdminState, EmailNotifier, JwtManager, LogNotifier, Notifier, RevocationList,
    ServiceSettings, SqliteAdminStore, create_admin_router, create_auth_router,
};
use model::config::Config;

/// 吊销列表清理间隔
const REVOCATION_CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Parser, Debug)]
#[command(name = "admin-rs", version, about = "管理员账号后台服务")]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = Config::default_config_path())]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 不存在时忽略
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    config.apply_env_overrides()?;
    config.validate()?;
    tracing::info!(path = ?config.config_path(), "配置已加载");

    let store = SqliteAdminStore::open(&config.database_path)
        .with_context(|| format!("打开数据库失败: {}", config.database_path))?;

    let notifier: Arc<dyn Notifier> = match config.email.clone() {
        Some(email) if email.enabled => {
            tracing::info!(smtp_host = %email.smtp_host, "邮件通知已启用");
            Arc::new(EmailNotifier::new(email)?)
        }
        _ => {
            tracing::warn!("邮件通知未启用，通知邮件只记录日志");
            Arc::new(LogNotifier)
        }
    };

    let service = AdminService::new(
        Arc::new(store),
        JwtManager::new(config.jwt_secret(), config.token_expiry_secs),
        Arc::new(RevocationList::new()),
        notifier,
        ServiceSettings::from_config(&config),
    )?;

    if let Some(bootstrap) = &config.bootstrap_admin {
        service
            .ensure_bootstrap_admin(bootstrap)
            .await
            .context("创建初始管理员失败")?;
    }

    let state = AdminState::new(service);
    spawn_revocation_cleanup(state.clone());

    let app = Router::new()
        .nest("/api/auth", create_auth_router(state.clone()))
        .nest("/api/admin", create_admin_router(state))
        .layer(build_cors(&config.origins)?);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("监听地址失败: {}", addr))?;
    tracing::info!("服务已启动: http://{}", addr);

    axum::serve(listener, app).await.context("服务异常退出")?;
    Ok(())
}

/// 定期清理已过期的吊销条目
fn spawn_revocation_cleanup(state: AdminState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(REVOCATION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = state.service.cleanup_revocations();
            if removed > 0 {
                tracing::debug!(removed, "已清理过期的吊销 token");
            }
        }
    });
}

/// 构建 CORS 层，未配置来源时允许任意来源
fn build_cors(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.is_empty() {
        return Ok(cors.allow_origin(Any));
    }

    let origins = origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .with_context(|| format!("无效的 CORS 来源: {}", o))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(cors
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_cors() {
        assert!(build_cors(&[]).is_ok());
        assert!(build_cors(&["https://panel.example.com".to_string()]).is_ok());
        assert!(build_cors(&["bad\norigin".to_string()]).is_err());
    }

    #[test]
    fn test_args_default_config_path() {
        let args = Args::parse_from(["admin-rs"]);
        assert_eq!(args.config, "config.json");
        let args = Args::parse_from(["admin-rs", "--config", "/etc/admin.json"]);
        assert_eq!(args.config, "/etc/admin.json");
    }
}
