//! Admin 服务错误类型

use axum::http::StatusCode;
use thiserror::Error;

use super::store::StoreError;
use super::types::AdminErrorResponse;

/// Admin 服务错误
#[derive(Debug, Error)]
pub enum AdminServiceError {
    /// email 或 phone 已被占用
    #[error("Email or phone is already registered")]
    Conflict,

    /// 管理员不存在
    #[error("Admin not found")]
    NotFound,

    /// 账号或密码错误（不区分账号不存在，防止枚举）
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// 邮箱尚未验证
    #[error("Email address is not verified")]
    EmailNotVerified,

    /// 账号已被封禁
    #[error("Account is blocked")]
    AccountBlocked,

    /// 邮箱验证码错误或已过期
    #[error("Invalid or expired verification code")]
    InvalidVerificationCode,

    /// token 缺失、无效、已吊销或所属账号不可用
    #[error("Invalid or expired token")]
    Unauthorized,

    /// 请求参数不合法
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Internal(String),
}

impl AdminServiceError {
    /// 获取对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdminServiceError::Conflict => StatusCode::CONFLICT,
            AdminServiceError::NotFound => StatusCode::NOT_FOUND,
            AdminServiceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AdminServiceError::EmailNotVerified => StatusCode::FORBIDDEN,
            AdminServiceError::AccountBlocked => StatusCode::FORBIDDEN,
            AdminServiceError::InvalidVerificationCode => StatusCode::BAD_REQUEST,
            AdminServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            AdminServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            AdminServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 转换为 API 错误响应
    pub fn into_response(self) -> AdminErrorResponse {
        let error_type = match &self {
            AdminServiceError::Conflict => "conflict",
            AdminServiceError::NotFound => "not_found",
            AdminServiceError::InvalidCredentials => "invalid_credentials",
            AdminServiceError::EmailNotVerified => "email_not_verified",
            AdminServiceError::AccountBlocked => "account_blocked",
            AdminServiceError::InvalidVerificationCode => "invalid_verification_code",
            AdminServiceError::Unauthorized => "authentication_error",
            AdminServiceError::Validation(_) => "invalid_request",
            AdminServiceError::Internal(_) => "internal_error",
        };
        AdminErrorResponse::new(error_type, self.to_string())
    }
}

impl From<StoreError> for AdminServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(_) => AdminServiceError::Conflict,
            other => AdminServiceError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AdminServiceError::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(AdminServiceError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AdminServiceError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AdminServiceError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_duplicate_maps_to_conflict() {
        let err: AdminServiceError = StoreError::Duplicate("email").into();
        assert!(matches!(err, AdminServiceError::Conflict));
    }

    #[test]
    fn test_error_response_body() {
        let body = serde_json::to_value(AdminServiceError::InvalidCredentials.into_response())
            .unwrap();
        assert_eq!(body["error"]["type"], "invalid_credentials");
        assert_eq!(body["error"]["message"], "Invalid credentials");
    }
}
