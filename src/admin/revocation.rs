//! Token 吊销列表
//!
//! 登出时将 token 加入吊销列表，每次校验 token 时检查。
//! 条目在 token 自然过期后失效，由后台任务定期清理。

use std::collections::HashMap;

use parking_lot::RwLock;
use sha2::{Digest, Sha256};

/// 已吊销 token 存储 (token SHA256 -> 过期时间 Unix 秒)
#[derive(Default)]
pub struct RevocationList {
    entries: RwLock<HashMap<String, u64>>,
}

/// 只保存 token 的哈希，不保存原文
fn token_key(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl RevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// 吊销 token，`expires_at` 为 token 的 exp
    ///
    /// JWT 校验在 `exp` 当秒仍然通过，条目保留到该秒结束
    pub fn revoke(&self, token: &str, expires_at: u64) {
        if expires_at < now_secs() {
            return;
        }
        self.entries.write().insert(token_key(token), expires_at);
    }

    /// token 是否已被吊销
    pub fn is_revoked(&self, token: &str) -> bool {
        let now = now_secs();
        self.entries
            .read()
            .get(&token_key(token))
            .is_some_and(|&exp| exp >= now)
    }

    /// 清理已自然过期的条目，返回清理数量
    pub fn cleanup_expired(&self) -> usize {
        let now = now_secs();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, exp| *exp >= now);
        before - entries.len()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }
}
