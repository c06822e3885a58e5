//! 管理员数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 管理员角色
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdminRole {
    SuperAdmin,
    #[default]
    Admin,
    Operator,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRole::SuperAdmin => "superAdmin",
            AdminRole::Admin => "admin",
            AdminRole::Operator => "operator",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "superAdmin" => Some(AdminRole::SuperAdmin),
            "admin" => Some(AdminRole::Admin),
            "operator" => Some(AdminRole::Operator),
            _ => None,
        }
    }
}

/// 管理员记录（完整字段，仅在服务层和存储层之间流转）
#[derive(Debug, Clone)]
pub struct Admin {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: String,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub is_blocked: bool,
    pub role: AdminRole,
    pub image: Option<String>,
    /// 一次性邮箱验证码
    pub uuid_code: Option<String>,
    /// 验证码过期时间
    pub uuid_code_expire: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Admin {
    /// 对外可见的投影，不含密码哈希和验证码
    pub fn profile(&self) -> AdminProfile {
        AdminProfile {
            id: self.id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            email_verified: self.email_verified,
            phone_verified: self.phone_verified,
            is_blocked: self.is_blocked,
            role: self.role,
            image: self.image.clone(),
        }
    }
}

/// 管理员公开信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub is_blocked: bool,
    pub role: AdminRole,
    pub image: Option<String>,
}
