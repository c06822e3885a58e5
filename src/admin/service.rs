//! Admin 业务逻辑服务
//!
//! 管理员的注册、登录、邮箱验证、封禁与资料维护。服务本身无状态，
//! 持久化交给 `AdminStore`，邮件交给 `Notifier`，token 吊销记录在 `RevocationList`。

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::common::auth;
use crate::model::config::{BootstrapAdmin, Config};

use super::email::{EmailTemplate, Notification, Notifier};
use super::error::AdminServiceError;
use super::jwt::JwtManager;
use super::model::{Admin, AdminProfile, AdminRole};
use super::revocation::RevocationList;
use super::store::{AdminStore, StoreError};
use super::types::{
    AdminListResponse, LoginResponse, Pagination, RegisterAdminRequest, UpdateAdminRequest,
};

/// 邮箱验证码有效期（72 小时）
const VERIFICATION_CODE_TTL_HOURS: i64 = 72;

/// 每页最大条数
const MAX_PAGE_LIMIT: i64 = 100;

const MIN_PASSWORD_LEN: usize = 8;

/// 服务运行参数（构造时显式传入）
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// 登录前是否要求邮箱已验证
    pub email_verification_required: bool,
    pub site_name: String,
    pub site_url: String,
}

impl ServiceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            email_verification_required: config.website.is_email_verification_required,
            site_name: config.website.name.clone(),
            site_url: config.website.url.clone(),
        }
    }
}

/// 通过 token 校验后的会话信息
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub admin_id: String,
    /// token 过期时间 (Unix timestamp)
    pub expires_at: u64,
}

/// Admin 服务
pub struct AdminService {
    store: Arc<dyn AdminStore>,
    jwt: JwtManager,
    revocations: Arc<RevocationList>,
    notifier: Arc<dyn Notifier>,
    settings: ServiceSettings,
    /// 账号不存在时用于对齐耗时的哈希
    dummy_hash: String,
}

impl AdminService {
    pub fn new(
        store: Arc<dyn AdminStore>,
        jwt: JwtManager,
        revocations: Arc<RevocationList>,
        notifier: Arc<dyn Notifier>,
        settings: ServiceSettings,
    ) -> Result<Self, AdminServiceError> {
        let dummy_hash = store.hash_password(&uuid::Uuid::new_v4().to_string())?;
        Ok(Self {
            store,
            jwt,
            revocations,
            notifier,
            settings,
            dummy_hash,
        })
    }

    /// 在阻塞线程池中执行存储操作
    async fn blocking<T, F>(&self, f: F) -> Result<T, AdminServiceError>
    where
        F: FnOnce(&dyn AdminStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(&*store))
            .await
            .map_err(|e| AdminServiceError::Internal(format!("存储任务异常: {}", e)))?
            .map_err(AdminServiceError::from)
    }

    async fn find(&self, id: &str) -> Result<Admin, AdminServiceError> {
        let id = id.to_string();
        self.blocking(move |s| s.find_by_id(&id))
            .await?
            .ok_or(AdminServiceError::NotFound)
    }

    async fn persist(&self, admin: Admin) -> Result<Admin, AdminServiceError> {
        self.blocking(move |s| s.save(&admin).map(|_| admin)).await
    }

    async fn hash_password(&self, password: &str) -> Result<String, AdminServiceError> {
        validate_password(password)?;
        let password = password.to_string();
        self.blocking(move |s| s.hash_password(&password)).await
    }

    async fn verify_password(&self, hash: &str, password: &str) -> Result<bool, AdminServiceError> {
        let (hash, password) = (hash.to_string(), password.to_string());
        self.blocking(move |s| Ok(s.verify_password(&hash, &password)))
            .await
    }

    /// 创建管理员
    ///
    /// 提供邮箱时生成 72 小时有效的验证码，并发送验证邮件（要求验证时）或欢迎邮件。
    pub async fn register(
        &self,
        req: RegisterAdminRequest,
    ) -> Result<AdminProfile, AdminServiceError> {
        let admin = self.create(req, false).await?;

        if admin.email.is_some() {
            if self.settings.email_verification_required {
                self.send_verification(&admin);
            } else {
                self.send_simple(&admin, EmailTemplate::Welcome);
            }
        }

        tracing::info!(admin_id = %admin.id, role = admin.role.as_str(), "管理员已创建");
        Ok(admin.profile())
    }

    async fn create(
        &self,
        req: RegisterAdminRequest,
        pre_verified: bool,
    ) -> Result<Admin, AdminServiceError> {
        let first_name = required_field(&req.first_name, "firstName")?;
        let last_name = required_field(&req.last_name, "lastName")?;
        let email = normalize_email(req.email)?;
        let phone = normalize_optional(req.phone, "phone")?;
        if email.is_none() && phone.is_none() {
            return Err(AdminServiceError::Validation(
                "email or phone is required".to_string(),
            ));
        }

        let (e, p) = (email.clone(), phone.clone());
        let taken = self
            .blocking(move |s| s.is_email_or_phone_taken(e.as_deref(), p.as_deref(), None))
            .await?;
        if taken {
            return Err(AdminServiceError::Conflict);
        }

        let password_hash = self.hash_password(&req.password).await?;
        let now = Utc::now();
        let needs_code = email.is_some() && !pre_verified;

        let admin = Admin {
            id: uuid::Uuid::new_v4().to_string(),
            first_name,
            last_name,
            email_verified: pre_verified && email.is_some(),
            email,
            phone,
            password_hash,
            phone_verified: false,
            is_blocked: false,
            role: req.role.unwrap_or_default(),
            image: normalize_optional(req.image, "image")?,
            uuid_code: needs_code.then(|| uuid::Uuid::new_v4().to_string()),
            uuid_code_expire: needs_code
                .then(|| now + Duration::hours(VERIFICATION_CODE_TTL_HOURS)),
            created_at: now,
            updated_at: now,
        };

        // 唯一索引兜底：并发注册时预检查可能都通过
        self.persist(admin).await
    }

    /// 库中没有任何管理员时创建初始超级管理员
    ///
    /// 返回是否创建了新账号
    pub async fn ensure_bootstrap_admin(
        &self,
        bootstrap: &BootstrapAdmin,
    ) -> Result<bool, AdminServiceError> {
        let existing = self.blocking(|s| s.count("")).await?;
        if existing > 0 {
            return Ok(false);
        }

        let admin = self
            .create(
                RegisterAdminRequest {
                    first_name: bootstrap.first_name.clone(),
                    last_name: bootstrap.last_name.clone(),
                    email: Some(bootstrap.email.clone()),
                    phone: None,
                    password: bootstrap.password.clone(),
                    role: Some(AdminRole::SuperAdmin),
                    image: None,
                },
                true,
            )
            .await?;

        tracing::info!(admin_id = %admin.id, "已创建初始超级管理员");
        Ok(true)
    }

    /// 登录
    ///
    /// 账号不存在与密码错误返回同一错误，并对不存在的账号执行一次哈希校验以对齐耗时。
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, AdminServiceError> {
        let identifier = normalize_login(username);
        if identifier.is_empty() {
            return Err(AdminServiceError::InvalidCredentials);
        }

        let lookup = identifier.clone();
        let found = self.blocking(move |s| s.find_by_login(&lookup)).await?;

        let admin = match found {
            Some(admin) => admin,
            None => {
                // 结果无意义，只为与真实校验耗时一致
                self.verify_password(&self.dummy_hash, password).await.ok();
                return Err(AdminServiceError::InvalidCredentials);
            }
        };

        if !self.verify_password(&admin.password_hash, password).await? {
            tracing::debug!(admin_id = %admin.id, "密码校验失败");
            return Err(AdminServiceError::InvalidCredentials);
        }

        if self.settings.email_verification_required
            && admin.email.as_deref() == Some(identifier.as_str())
            && !admin.email_verified
        {
            return Err(AdminServiceError::EmailNotVerified);
        }

        if admin.is_blocked {
            return Err(AdminServiceError::AccountBlocked);
        }

        let (token, expires_in) = self
            .jwt
            .issue_token(&admin.id)
            .map_err(|e| AdminServiceError::Internal(format!("Failed to generate token: {}", e)))?;

        tracing::info!(admin_id = %admin.id, "管理员登录成功");
        Ok(LoginResponse {
            admin: admin.profile(),
            token,
            expires_in,
        })
    }

    /// 登出：吊销 token 直到其自然过期
    pub fn end_session(&self, token: &str) -> Result<(), AdminServiceError> {
        let claims = self
            .jwt
            .verify_token(token)
            .map_err(|_| AdminServiceError::Unauthorized)?;
        self.revocations.revoke(token, claims.exp);
        tracing::info!(admin_id = %claims.sub, "管理员已登出");
        Ok(())
    }

    /// 校验 token：签名、有效期、吊销列表、账号存在且未封禁
    pub async fn validate_token(&self, token: &str) -> Result<AuthSession, AdminServiceError> {
        let claims = self
            .jwt
            .verify_token(token)
            .map_err(|_| AdminServiceError::Unauthorized)?;

        if self.revocations.is_revoked(token) {
            return Err(AdminServiceError::Unauthorized);
        }

        let id = claims.sub.clone();
        let admin = self
            .blocking(move |s| s.find_by_id(&id))
            .await?
            .ok_or(AdminServiceError::Unauthorized)?;

        if admin.is_blocked {
            return Err(AdminServiceError::Unauthorized);
        }

        Ok(AuthSession {
            admin_id: admin.id,
            expires_at: claims.exp,
        })
    }

    /// 封禁管理员
    pub async fn block(&self, id: &str) -> Result<AdminProfile, AdminServiceError> {
        self.set_blocked(id, true).await
    }

    /// 解封管理员
    pub async fn unblock(&self, id: &str) -> Result<AdminProfile, AdminServiceError> {
        self.set_blocked(id, false).await
    }

    async fn set_blocked(&self, id: &str, blocked: bool) -> Result<AdminProfile, AdminServiceError> {
        let mut admin = self.find(id).await?;
        admin.is_blocked = blocked;
        admin.updated_at = Utc::now();
        let admin = self.persist(admin).await?;

        if blocked {
            self.send_simple(&admin, EmailTemplate::Block);
            tracing::info!(admin_id = %admin.id, "管理员已封禁");
        } else {
            self.send_simple(&admin, EmailTemplate::Unblock);
            tracing::info!(admin_id = %admin.id, "管理员已解封");
        }
        Ok(admin.profile())
    }

    /// 分页查询管理员
    ///
    /// 关键字对 firstName、lastName、email、phone 做不区分大小写的子串匹配
    pub async fn list(
        &self,
        search: &str,
        page: i64,
        limit: i64,
    ) -> Result<AdminListResponse, AdminServiceError> {
        if page < 1 {
            return Err(AdminServiceError::Validation(
                "page must be at least 1".to_string(),
            ));
        }
        if limit <= 0 || limit > MAX_PAGE_LIMIT {
            return Err(AdminServiceError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_LIMIT
            )));
        }
        let offset = (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| AdminServiceError::Validation("page is too large".to_string()))?;
        let (page, limit, offset) = (page as u64, limit as u64, offset as u64);

        let search = search.trim().to_string();
        let (admins, total) = self
            .blocking(move |s| Ok((s.list(&search, offset, limit)?, s.count(&search)?)))
            .await?;

        Ok(AdminListResponse {
            admins: admins.iter().map(Admin::profile).collect(),
            pagination: Pagination { page, limit, total },
        })
    }

    /// 获取单个管理员
    pub async fn get_by_id(&self, id: &str) -> Result<AdminProfile, AdminServiceError> {
        Ok(self.find(id).await?.profile())
    }

    /// 更新管理员资料（部分更新）
    ///
    /// 修改邮箱会重置验证状态并生成新验证码，要求验证时发送验证邮件。
    pub async fn update(
        &self,
        id: &str,
        req: UpdateAdminRequest,
    ) -> Result<AdminProfile, AdminServiceError> {
        let mut admin = self.find(id).await?;

        let email = normalize_email(req.email)?;
        let phone = normalize_optional(req.phone, "phone")?;
        let email_changed = email.is_some() && email != admin.email;
        let phone_changed = phone.is_some() && phone != admin.phone;

        if email.is_some() || phone.is_some() {
            let (e, p, own_id) = (email.clone(), phone.clone(), admin.id.clone());
            let taken = self
                .blocking(move |s| {
                    s.is_email_or_phone_taken(e.as_deref(), p.as_deref(), Some(own_id.as_str()))
                })
                .await?;
            if taken {
                return Err(AdminServiceError::Conflict);
            }
        }

        if let Some(first_name) = req.first_name {
            admin.first_name = required_field(&first_name, "firstName")?;
        }
        if let Some(last_name) = req.last_name {
            admin.last_name = required_field(&last_name, "lastName")?;
        }
        if let Some(role) = req.role {
            admin.role = role;
        }
        if let Some(image) = normalize_optional(req.image, "image")? {
            admin.image = Some(image);
        }
        if let Some(password) = req.password {
            admin.password_hash = self.hash_password(&password).await?;
        }

        let now = Utc::now();
        if email_changed {
            admin.email = email;
            admin.email_verified = false;
            admin.uuid_code = Some(uuid::Uuid::new_v4().to_string());
            admin.uuid_code_expire = Some(now + Duration::hours(VERIFICATION_CODE_TTL_HOURS));
        }
        if phone_changed {
            admin.phone = phone;
            admin.phone_verified = false;
        }
        admin.updated_at = now;

        let admin = self.persist(admin).await?;
        if email_changed && self.settings.email_verification_required {
            self.send_verification(&admin);
        }

        tracing::info!(admin_id = %admin.id, "管理员资料已更新");
        Ok(admin.profile())
    }

    /// 批量删除管理员（不存在的 ID 直接忽略）
    pub async fn remove(&self, ids: Vec<String>) -> Result<bool, AdminServiceError> {
        let requested = ids.len();
        let deleted = self.blocking(move |s| s.delete_many(&ids)).await?;
        tracing::info!(requested, deleted, "批量删除管理员");
        Ok(true)
    }

    /// 使用验证码完成邮箱验证
    pub async fn verify_email(&self, id: &str, code: &str) -> Result<AdminProfile, AdminServiceError> {
        let mut admin = self.find(id).await?;

        let valid = match (admin.uuid_code.as_deref(), admin.uuid_code_expire) {
            (Some(stored), Some(expire)) => {
                auth::constant_time_eq(stored, code.trim()) && expire > Utc::now()
            }
            _ => false,
        };
        if !valid {
            return Err(AdminServiceError::InvalidVerificationCode);
        }

        admin.email_verified = true;
        admin.uuid_code = None;
        admin.uuid_code_expire = None;
        admin.updated_at = Utc::now();
        let admin = self.persist(admin).await?;

        tracing::info!(admin_id = %admin.id, "邮箱已验证");
        Ok(admin.profile())
    }

    /// 清理吊销列表中已过期的条目
    pub fn cleanup_revocations(&self) -> usize {
        self.revocations.cleanup_expired()
    }

    fn send_verification(&self, admin: &Admin) {
        let (Some(email), Some(code)) = (admin.email.as_deref(), admin.uuid_code.as_deref()) else {
            return;
        };
        let verify_url = format!(
            "{}/verify-email?id={}&code={}",
            self.settings.site_url.trim_end_matches('/'),
            admin.id,
            code
        );
        self.notifier.send(
            Notification::new(
                email,
                EmailTemplate::Verification,
                admin.first_name.as_str(),
                self.settings.site_name.as_str(),
            )
            .with_verification(code, verify_url),
        );
    }

    fn send_simple(&self, admin: &Admin, template: EmailTemplate) {
        let Some(email) = admin.email.as_deref() else {
            return;
        };
        self.notifier.send(Notification::new(
            email,
            template,
            admin.first_name.as_str(),
            self.settings.site_name.as_str(),
        ));
    }
}

fn required_field(value: &str, field: &str) -> Result<String, AdminServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AdminServiceError::Validation(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(value.to_string())
}

/// 可选字段：未提供为 None，提供了空字符串视为非法
fn normalize_optional(
    value: Option<String>,
    field: &str,
) -> Result<Option<String>, AdminServiceError> {
    value.map(|v| required_field(&v, field)).transpose()
}

fn normalize_email(value: Option<String>) -> Result<Option<String>, AdminServiceError> {
    let Some(email) = normalize_optional(value, "email")? else {
        return Ok(None);
    };
    let email = email.to_lowercase();
    email
        .parse::<lettre::Address>()
        .map_err(|_| AdminServiceError::Validation(format!("invalid email address: {}", email)))?;
    Ok(Some(email))
}

/// 登录标识：邮箱统一小写，手机号原样
fn normalize_login(username: &str) -> String {
    let username = username.trim();
    if username.contains('@') {
        username.to_lowercase()
    } else {
        username.to_string()
    }
}

fn validate_password(password: &str) -> Result<(), AdminServiceError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AdminServiceError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::email::VerificationLink;
    use crate::admin::store::SqliteAdminStore;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<Notification>>,
    }

    impl RecordingNotifier {
        fn templates(&self) -> Vec<EmailTemplate> {
            self.sent.lock().iter().map(|n| n.template).collect()
        }

        fn last_verification(&self) -> Option<VerificationLink> {
            self.sent
                .lock()
                .last()
                .and_then(|n| n.verification.clone())
        }
    }

    impl Notifier for RecordingNotifier {
        fn send(&self, notification: Notification) {
            self.sent.lock().push(notification);
        }
    }

    struct Fixture {
        service: AdminService,
        notifier: Arc<RecordingNotifier>,
        store: Arc<SqliteAdminStore>,
    }

    fn fixture(verification_required: bool) -> Fixture {
        fixture_with_expiry(verification_required, 3600)
    }

    fn fixture_with_expiry(verification_required: bool, token_expiry_secs: u64) -> Fixture {
        let store = Arc::new(SqliteAdminStore::open_in_memory().unwrap().with_hash_cost(4));
        let notifier = Arc::new(RecordingNotifier::default());
        let service = AdminService::new(
            store.clone(),
            JwtManager::new("test-secret", token_expiry_secs),
            Arc::new(RevocationList::new()),
            notifier.clone(),
            ServiceSettings {
                email_verification_required: verification_required,
                site_name: "Panel".to_string(),
                site_url: "https://panel.example.com/".to_string(),
            },
        )
        .unwrap();
        Fixture {
            service,
            notifier,
            store,
        }
    }

    fn request(email: Option<&str>, phone: Option<&str>) -> RegisterAdminRequest {
        RegisterAdminRequest {
            first_name: "Sara".to_string(),
            last_name: "Karimi".to_string(),
            email: email.map(str::to_string),
            phone: phone.map(str::to_string),
            password: "password-123".to_string(),
            role: None,
            image: None,
        }
    }

    #[tokio::test]
    async fn test_register_returns_safe_projection() {
        let f = fixture(false);
        let profile = f
            .service
            .register(request(Some("Sara@Example.com"), Some("09120000000")))
            .await
            .unwrap();

        assert_eq!(profile.email.as_deref(), Some("sara@example.com"));
        assert!(!profile.is_blocked);
        assert!(!profile.email_verified);
        assert!(!profile.phone_verified);
        assert_eq!(profile.role, AdminRole::Admin);

        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("uuidCode").is_none());

        // 存储中带有 72 小时验证码
        let stored = f.store.find_by_id(&profile.id).unwrap().unwrap();
        assert!(stored.uuid_code.is_some());
        let ttl = stored.uuid_code_expire.unwrap() - stored.created_at;
        assert_eq!(ttl.num_hours(), VERIFICATION_CODE_TTL_HOURS);
        assert_ne!(stored.password_hash, "password-123");
    }

    #[tokio::test]
    async fn test_register_sends_welcome_or_verification() {
        let f = fixture(false);
        f.service.register(request(Some("a@example.com"), None)).await.unwrap();
        assert_eq!(f.notifier.templates(), vec![EmailTemplate::Welcome]);

        let f = fixture(true);
        let profile = f
            .service
            .register(request(Some("a@example.com"), None))
            .await
            .unwrap();
        assert_eq!(f.notifier.templates(), vec![EmailTemplate::Verification]);
        let url = f.notifier.last_verification().unwrap().url;
        assert!(url.starts_with("https://panel.example.com/verify-email?id="));
        assert!(url.contains(&profile.id));

        // 只有手机号：不发邮件，也不生成验证码
        let profile = f.service.register(request(None, Some("0912"))).await.unwrap();
        assert_eq!(f.notifier.templates().len(), 1);
        let stored = f.store.find_by_id(&profile.id).unwrap().unwrap();
        assert!(stored.uuid_code.is_none());
    }

    #[tokio::test]
    async fn test_register_conflict_on_taken_email() {
        let f = fixture(false);
        f.service
            .register(request(Some("dup@example.com"), Some("0912")))
            .await
            .unwrap();

        let err = f
            .service
            .register(request(Some("dup@example.com"), Some("0935")))
            .await
            .unwrap_err();
        assert!(matches!(err, AdminServiceError::Conflict));

        let err = f
            .service
            .register(request(Some("other@example.com"), Some("0912")))
            .await
            .unwrap_err();
        assert!(matches!(err, AdminServiceError::Conflict));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let f = fixture(false);
        let err = f.service.register(request(None, None)).await.unwrap_err();
        assert!(matches!(err, AdminServiceError::Validation(_)));

        let mut req = request(Some("a@example.com"), None);
        req.password = "short".to_string();
        let err = f.service.register(req).await.unwrap_err();
        assert!(matches!(err, AdminServiceError::Validation(_)));

        let mut req = request(Some("a@example.com"), None);
        req.first_name = "  ".to_string();
        let err = f.service.register(req).await.unwrap_err();
        assert!(matches!(err, AdminServiceError::Validation(_)));

        let err = f
            .service
            .register(request(Some("not-an-email"), None))
            .await
            .unwrap_err();
        assert!(matches!(err, AdminServiceError::Validation(_)));

        // 发信时 SMTP 会拒绝的地址在注册时就拒绝
        let err = f
            .service
            .register(request(Some("a b@example.com"), None))
            .await
            .unwrap_err();
        assert!(matches!(err, AdminServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_authenticate_success_and_failures() {
        let f = fixture(false);
        let profile = f
            .service
            .register(request(Some("a@example.com"), Some("0912")))
            .await
            .unwrap();

        let login = f
            .service
            .authenticate("A@example.com", "password-123")
            .await
            .unwrap();
        assert_eq!(login.admin.id, profile.id);
        assert!(!login.token.is_empty());
        assert_eq!(login.expires_in, 3600);

        let login = f.service.authenticate("0912", "password-123").await.unwrap();
        let session = f.service.validate_token(&login.token).await.unwrap();
        assert_eq!(session.admin_id, profile.id);

        let wrong = f
            .service
            .authenticate("a@example.com", "wrong-password")
            .await
            .unwrap_err();
        let missing = f
            .service
            .authenticate("ghost@example.com", "password-123")
            .await
            .unwrap_err();
        assert!(matches!(wrong, AdminServiceError::InvalidCredentials));
        assert!(matches!(missing, AdminServiceError::InvalidCredentials));
        assert_eq!(wrong.to_string(), missing.to_string());
    }

    #[tokio::test]
    async fn test_email_verification_gate() {
        let f = fixture(true);
        let profile = f
            .service
            .register(request(Some("a@example.com"), Some("0912")))
            .await
            .unwrap();

        let err = f
            .service
            .authenticate("a@example.com", "password-123")
            .await
            .unwrap_err();
        assert!(matches!(err, AdminServiceError::EmailNotVerified));

        // 错误密码不泄露验证状态
        let err = f
            .service
            .authenticate("a@example.com", "wrong-password")
            .await
            .unwrap_err();
        assert!(matches!(err, AdminServiceError::InvalidCredentials));

        // 使用手机号登录不受邮箱验证限制
        assert!(f.service.authenticate("0912", "password-123").await.is_ok());

        let code = f.notifier.last_verification().unwrap().code;
        let err = f.service.verify_email(&profile.id, "bad-code").await.unwrap_err();
        assert!(matches!(err, AdminServiceError::InvalidVerificationCode));

        let verified = f.service.verify_email(&profile.id, &code).await.unwrap();
        assert!(verified.email_verified);
        assert!(f
            .service
            .authenticate("a@example.com", "password-123")
            .await
            .is_ok());

        // 验证码只能使用一次
        let err = f.service.verify_email(&profile.id, &code).await.unwrap_err();
        assert!(matches!(err, AdminServiceError::InvalidVerificationCode));
        let stored = f.store.find_by_id(&profile.id).unwrap().unwrap();
        assert!(stored.uuid_code.is_none());
        assert!(stored.uuid_code_expire.is_none());
    }

    #[tokio::test]
    async fn test_verify_email_expired_code() {
        let f = fixture(true);
        let profile = f
            .service
            .register(request(Some("a@example.com"), None))
            .await
            .unwrap();
        let mut stored = f.store.find_by_id(&profile.id).unwrap().unwrap();
        let code = stored.uuid_code.clone().unwrap();
        stored.uuid_code_expire = Some(Utc::now() - Duration::minutes(1));
        f.store.save(&stored).unwrap();

        let err = f.service.verify_email(&profile.id, &code).await.unwrap_err();
        assert!(matches!(err, AdminServiceError::InvalidVerificationCode));

        let err = f.service.verify_email("ghost", &code).await.unwrap_err();
        assert!(matches!(err, AdminServiceError::NotFound));
    }

    #[tokio::test]
    async fn test_end_session_revokes_token() {
        let f = fixture(false);
        f.service.register(request(Some("a@example.com"), None)).await.unwrap();
        let login = f
            .service
            .authenticate("a@example.com", "password-123")
            .await
            .unwrap();

        assert!(f.service.validate_token(&login.token).await.is_ok());
        f.service.end_session(&login.token).unwrap();
        let err = f.service.validate_token(&login.token).await.unwrap_err();
        assert!(matches!(err, AdminServiceError::Unauthorized));

        // 新登录签发的 token 不受影响
        let again = f
            .service
            .authenticate("a@example.com", "password-123")
            .await
            .unwrap();
        assert!(f.service.validate_token(&again.token).await.is_ok());

        assert!(f.service.end_session("garbage").is_err());
        assert_eq!(f.service.cleanup_revocations(), 0);
    }

    #[tokio::test]
    async fn test_revoked_token_stays_invalid_after_expiry() {
        let f = fixture_with_expiry(false, 1);
        f.service.register(request(Some("a@example.com"), None)).await.unwrap();
        let login = f
            .service
            .authenticate("a@example.com", "password-123")
            .await
            .unwrap();
        f.service.end_session(&login.token).unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(2100)).await;
        f.service.cleanup_revocations();

        let err = f.service.validate_token(&login.token).await.unwrap_err();
        assert!(matches!(err, AdminServiceError::Unauthorized));
    }

    #[tokio::test]
    async fn test_block_and_unblock() {
        let f = fixture(false);
        let profile = f
            .service
            .register(request(Some("a@example.com"), None))
            .await
            .unwrap();
        let login = f
            .service
            .authenticate("a@example.com", "password-123")
            .await
            .unwrap();

        let blocked = f.service.block(&profile.id).await.unwrap();
        assert!(blocked.is_blocked);
        assert!(f.service.get_by_id(&profile.id).await.unwrap().is_blocked);

        let err = f
            .service
            .authenticate("a@example.com", "password-123")
            .await
            .unwrap_err();
        assert!(matches!(err, AdminServiceError::AccountBlocked));
        assert!(f.service.validate_token(&login.token).await.is_err());

        let unblocked = f.service.unblock(&profile.id).await.unwrap();
        assert!(!unblocked.is_blocked);
        assert!(f
            .service
            .authenticate("a@example.com", "password-123")
            .await
            .is_ok());

        assert_eq!(
            f.notifier.templates(),
            vec![
                EmailTemplate::Welcome,
                EmailTemplate::Block,
                EmailTemplate::Unblock
            ]
        );

        let err = f.service.block("ghost").await.unwrap_err();
        assert!(matches!(err, AdminServiceError::NotFound));
    }

    #[tokio::test]
    async fn test_block_without_email_sends_nothing() {
        let f = fixture(false);
        let profile = f.service.register(request(None, Some("0912"))).await.unwrap();
        f.service.block(&profile.id).await.unwrap();
        assert!(f.notifier.templates().is_empty());
    }

    #[tokio::test]
    async fn test_list_pagination_and_search() {
        let f = fixture(false);
        for i in 0..12 {
            let mut req = request(None, Some(&format!("0912{:04}", i)));
            req.first_name = format!("Admin{:02}", i);
            f.service.register(req).await.unwrap();
        }

        let page = f.service.list("", 1, 10).await.unwrap();
        assert_eq!(page.admins.len(), 10);
        assert_eq!(page.pagination.total, 12);
        assert_eq!(page.admins[0].first_name, "Admin11");

        let page = f.service.list("", 2, 10).await.unwrap();
        assert_eq!(page.admins.len(), 2);
        assert_eq!(page.admins[1].first_name, "Admin00");

        let hits = f.service.list("admin0", 1, 10).await.unwrap();
        assert_eq!(hits.pagination.total, 10);

        let none = f.service.list("nobody", 1, 10).await.unwrap();
        assert!(none.admins.is_empty());
        assert_eq!(none.pagination.total, 0);

        for (page, limit) in [(0, 10), (1, 0), (1, -5), (-1, 10), (1, MAX_PAGE_LIMIT + 1)] {
            let err = f.service.list("", page, limit).await.unwrap_err();
            assert!(matches!(err, AdminServiceError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn test_update_uniqueness_and_self_exclusion() {
        let f = fixture(false);
        let a = f
            .service
            .register(request(Some("a@example.com"), Some("0912")))
            .await
            .unwrap();
        f.service
            .register(request(Some("b@example.com"), Some("0935")))
            .await
            .unwrap();

        let err = f
            .service
            .update(
                &a.id,
                UpdateAdminRequest {
                    email: Some("b@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AdminServiceError::Conflict));

        let updated = f
            .service
            .update(
                &a.id,
                UpdateAdminRequest {
                    email: Some("a@example.com".to_string()),
                    first_name: Some("Leila".to_string()),
                    role: Some(AdminRole::Operator),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.first_name, "Leila");
        assert_eq!(updated.role, AdminRole::Operator);
        assert_eq!(updated.email.as_deref(), Some("a@example.com"));

        let err = f
            .service
            .update("ghost", UpdateAdminRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AdminServiceError::NotFound));
    }

    #[tokio::test]
    async fn test_update_email_resets_verification() {
        let f = fixture(true);
        let a = f
            .service
            .register(request(Some("a@example.com"), None))
            .await
            .unwrap();
        let code = f.notifier.last_verification().unwrap().code;
        f.service.verify_email(&a.id, &code).await.unwrap();

        let updated = f
            .service
            .update(
                &a.id,
                UpdateAdminRequest {
                    email: Some("new@example.com".to_string()),
                    password: Some("another-password".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!updated.email_verified);
        let new_code = f.notifier.last_verification().unwrap().code;
        assert_ne!(new_code, code);

        let err = f
            .service
            .authenticate("new@example.com", "another-password")
            .await
            .unwrap_err();
        assert!(matches!(err, AdminServiceError::EmailNotVerified));
    }

    #[tokio::test]
    async fn test_update_email_without_required_verification_sends_nothing() {
        let f = fixture(false);
        let a = f
            .service
            .register(request(Some("a@example.com"), None))
            .await
            .unwrap();

        let updated = f
            .service
            .update(
                &a.id,
                UpdateAdminRequest {
                    email: Some("new@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.email.as_deref(), Some("new@example.com"));
        assert!(!updated.email_verified);
        assert_eq!(f.notifier.templates(), vec![EmailTemplate::Welcome]);

        // 不要求验证时仍可用新邮箱登录
        f.service
            .authenticate("new@example.com", "password-123")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let f = fixture(false);
        let a = f
            .service
            .register(request(Some("a@example.com"), None))
            .await
            .unwrap();

        let removed = f
            .service
            .remove(vec![a.id.clone(), "ghost".to_string()])
            .await
            .unwrap();
        assert!(removed);
        let err = f.service.get_by_id(&a.id).await.unwrap_err();
        assert!(matches!(err, AdminServiceError::NotFound));

        assert!(f.service.remove(vec![]).await.unwrap());
    }

    #[tokio::test]
    async fn test_deleted_admin_token_rejected() {
        let f = fixture(false);
        let a = f
            .service
            .register(request(Some("a@example.com"), None))
            .await
            .unwrap();
        let login = f
            .service
            .authenticate("a@example.com", "password-123")
            .await
            .unwrap();
        f.service.remove(vec![a.id]).await.unwrap();
        assert!(f.service.validate_token(&login.token).await.is_err());
    }

    #[tokio::test]
    async fn test_bootstrap_admin_only_when_empty() {
        let f = fixture(true);
        let bootstrap = BootstrapAdmin {
            first_name: "Root".to_string(),
            last_name: "Admin".to_string(),
            email: "root@example.com".to_string(),
            password: "bootstrap-pass".to_string(),
        };

        assert!(f.service.ensure_bootstrap_admin(&bootstrap).await.unwrap());
        assert!(!f.service.ensure_bootstrap_admin(&bootstrap).await.unwrap());
        assert!(f.notifier.templates().is_empty());

        let login = f
            .service
            .authenticate("root@example.com", "bootstrap-pass")
            .await
            .unwrap();
        assert_eq!(login.admin.role, AdminRole::SuperAdmin);
        assert!(login.admin.email_verified);
    }
}
