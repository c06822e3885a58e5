use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 邮件通知配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailConfig {
    /// 是否启用邮件通知
    #[serde(default)]
    pub enabled: bool,
    /// SMTP 服务器地址
    pub smtp_host: String,
    /// SMTP 端口
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP 用户名
    pub smtp_username: String,
    /// SMTP 密码（注意：以明文存储在 config.json 中，请确保文件权限安全）
    pub smtp_password: String,
    /// 是否使用 STARTTLS
    #[serde(default = "default_smtp_tls")]
    pub smtp_tls: bool,
    /// 发件人地址
    pub from_address: String,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_tls() -> bool {
    true
}

/// 站点配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteConfig {
    /// 站点名称（用于邮件标题）
    #[serde(default = "default_site_name")]
    pub name: String,
    /// 站点地址（用于拼接邮箱验证链接）
    #[serde(default = "default_site_url")]
    pub url: String,
    /// 登录前是否要求完成邮箱验证
    #[serde(default)]
    pub is_email_verification_required: bool,
}

fn default_site_name() -> String {
    "Admin Panel".to_string()
}

fn default_site_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for WebsiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            url: default_site_url(),
            is_email_verification_required: false,
        }
    }
}

/// 首个管理员账号（仅在库中没有任何管理员时创建）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapAdmin {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// SQLite 数据库文件路径
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// CORS 允许的来源（为空时允许任意来源）
    #[serde(default)]
    pub origins: Vec<String>,

    /// JWT 签名密钥
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Token 有效期（秒）
    #[serde(default = "default_token_expiry_secs")]
    pub token_expiry_secs: u64,

    #[serde(default)]
    pub website: WebsiteConfig,

    /// 邮件通知配置（可选）
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailConfig>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap_admin: Option<BootstrapAdmin>,

    /// 配置文件路径（运行时元数据，不写入 JSON）
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_database_path() -> String {
    "admin.db".to_string()
}

fn default_token_expiry_secs() -> u64 {
    7 * 24 * 60 * 60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_path: default_database_path(),
            origins: Vec::new(),
            jwt_secret: None,
            token_expiry_secs: default_token_expiry_secs(),
            website: WebsiteConfig::default(),
            email: None,
            bootstrap_admin: None,
            config_path: None,
        }
    }
}

impl Config {
    /// 获取默认配置文件路径
    pub fn default_config_path() -> &'static str {
        "config.json"
    }

    /// 从文件加载配置
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            // 配置文件不存在，返回默认配置
            let mut config = Self::default();
            config.config_path = Some(path.to_path_buf());
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let mut config: Config = serde_json::from_str(&content)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// 用环境变量覆盖配置（`.env` 由 dotenvy 预先加载）
    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup("ADMIN_JWT_SECRET") {
            self.jwt_secret = Some(secret);
        }
        if let Some(port) = lookup("ADMIN_PORT") {
            self.port = port
                .parse()
                .with_context(|| format!("ADMIN_PORT 不是合法端口: {}", port))?;
        }
        if let Some(path) = lookup("ADMIN_DATABASE_PATH") {
            self.database_path = path;
        }
        Ok(())
    }

    /// 校验必填项
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.jwt_secret.as_deref() {
            Some(secret) if !secret.trim().is_empty() => {}
            _ => anyhow::bail!("未配置 jwtSecret（或环境变量 ADMIN_JWT_SECRET）"),
        }
        if self.token_expiry_secs == 0 {
            anyhow::bail!("tokenExpirySecs 必须大于 0");
        }
        Ok(())
    }

    /// 已校验过的 JWT 密钥
    pub fn jwt_secret(&self) -> &str {
        self.jwt_secret.as_deref().unwrap_or_default()
    }

    /// 获取配置文件路径（如果有）
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
