//! JWT Token 管理模块
//!
//! 提供 JWT Token 的签发和验证功能，token 绑定管理员 ID

use anyhow::{Result, anyhow};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// JWT Claims 结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject（管理员 ID）
    pub sub: String,
    /// Token 唯一 ID（同一秒内签发的 token 也互不相同）
    pub jti: String,
    /// 签发时间 (Unix timestamp)
    pub iat: u64,
    /// 过期时间 (Unix timestamp)
    pub exp: u64,
}

/// 从配置的密钥派生 HMAC 密钥
///
/// 使用 SHA256 哈希原始密钥作为 JWT 签名密钥
fn derive_secret_key(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

fn now_secs() -> Result<u64> {
    Ok(std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs())
}

/// JWT 管理器
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry_secs: u64,
}

impl JwtManager {
    pub fn new(secret: &str, expiry_secs: u64) -> Self {
        let key = derive_secret_key(secret);
        // 过期即失效：吊销列表只保留到 exp，不能有宽限期
        let mut validation = Validation::default();
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(&key),
            decoding_key: DecodingKey::from_secret(&key),
            validation,
            expiry_secs,
        }
    }

    /// 为指定管理员签发 token
    ///
    /// # Returns
    /// * `Ok((token, expires_in))` - JWT Token 字符串和有效秒数
    pub fn issue_token(&self, admin_id: &str) -> Result<(String, u64)> {
        let now = now_secs()?;
        let claims = Claims {
            sub: admin_id.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.expiry_secs,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok((token, self.expiry_secs))
    }

    /// 验证 token 签名和有效期
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| anyhow!("Invalid token: {}", e))?;

        Ok(token_data.claims)
    }
}
