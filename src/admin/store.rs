//! 管理员持久化存储
//!
//! `AdminStore` 是服务层依赖的存储能力接口（持久化 + 密码哈希），
//! `SqliteAdminStore` 是基于 rusqlite 的默认实现。所有方法都是同步的，
//! 服务层通过 `spawn_blocking` 调用。

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};
use thiserror::Error;

use super::model::{Admin, AdminRole};

/// 存储层错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 唯一索引冲突（email 或 phone）
    #[error("{0} already registered")]
    Duplicate(&'static str),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("password hash error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// 管理员存储能力接口
pub trait AdminStore: Send + Sync {
    /// email 或 phone 是否已被其他记录占用
    fn is_email_or_phone_taken(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
        exclude_id: Option<&str>,
    ) -> Result<bool, StoreError>;

    /// 按 email 或 phone 精确匹配查找（登录用）
    fn find_by_login(&self, identifier: &str) -> Result<Option<Admin>, StoreError>;

    fn find_by_id(&self, id: &str) -> Result<Option<Admin>, StoreError>;

    /// 插入或更新（按 id）
    fn save(&self, admin: &Admin) -> Result<(), StoreError>;

    /// 批量删除，返回实际删除条数
    fn delete_many(&self, ids: &[String]) -> Result<usize, StoreError>;

    /// 按关键字分页查询，创建时间倒序
    fn list(&self, search: &str, offset: u64, limit: u64) -> Result<Vec<Admin>, StoreError>;

    /// 与 `list` 使用同一条件的总数
    fn count(&self, search: &str) -> Result<u64, StoreError>;

    fn hash_password(&self, plain: &str) -> Result<String, StoreError>;

    fn verify_password(&self, password_hash: &str, plain: &str) -> bool;
}

const ADMIN_COLUMNS: &str = "id, first_name, last_name, email, phone, password_hash, \
     email_verified, phone_verified, is_blocked, role, image, uuid_code, uuid_code_expire, \
     created_at, updated_at";

/// SQLite 内置 lower() 只处理 ASCII，搜索使用注册的 Unicode 版本
const UNICODE_LOWER_FN: &str = "unicode_lower";

const SEARCH_CLAUSE: &str = "WHERE instr(unicode_lower(first_name), ?1) > 0 \
     OR instr(unicode_lower(last_name), ?1) > 0 \
     OR instr(unicode_lower(COALESCE(email, '')), ?1) > 0 \
     OR instr(unicode_lower(COALESCE(phone, '')), ?1) > 0";

/// 基于 SQLite 的管理员存储
pub struct SqliteAdminStore {
    conn: Mutex<Connection>,
    hash_cost: u32,
}

impl SqliteAdminStore {
    /// 打开（或创建）数据库文件
    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        Self::init(Connection::open(db_path)?)
    }

    /// 内存数据库（测试用）
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.create_scalar_function(
            UNICODE_LOWER_FN,
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let value: Option<String> = ctx.get(0)?;
                Ok(value.map(|v| v.to_lowercase()))
            },
        )?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS admins (
                id TEXT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT,
                phone TEXT,
                password_hash TEXT NOT NULL,
                email_verified INTEGER NOT NULL DEFAULT 0,
                phone_verified INTEGER NOT NULL DEFAULT 0,
                is_blocked INTEGER NOT NULL DEFAULT 0,
                role TEXT NOT NULL DEFAULT 'admin',
                image TEXT,
                uuid_code TEXT,
                uuid_code_expire TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_admins_email ON admins(email);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_admins_phone ON admins(phone);
            CREATE INDEX IF NOT EXISTS idx_admins_created_at ON admins(created_at);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            hash_cost: bcrypt::DEFAULT_COST,
        })
    }

    /// 设置 bcrypt 代价（测试中使用最低代价加速）
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }
}

impl AdminStore for SqliteAdminStore {
    fn is_email_or_phone_taken(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
        exclude_id: Option<&str>,
    ) -> Result<bool, StoreError> {
        if email.is_none() && phone.is_none() {
            return Ok(false);
        }
        let conn = self.conn.lock();
        let taken: bool = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM admins
                WHERE (email = ?1 OR phone = ?2) AND (?3 IS NULL OR id != ?3)
            )",
            rusqlite::params![email, phone, exclude_id],
            |row| row.get(0),
        )?;
        Ok(taken)
    }

    fn find_by_login(&self, identifier: &str) -> Result<Option<Admin>, StoreError> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM admins WHERE email = ?1 OR phone = ?1 LIMIT 1",
            ADMIN_COLUMNS
        );
        let admin = conn.query_row(&sql, [identifier], row_to_admin).optional()?;
        Ok(admin)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Admin>, StoreError> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM admins WHERE id = ?1", ADMIN_COLUMNS);
        let admin = conn.query_row(&sql, [id], row_to_admin).optional()?;
        Ok(admin)
    }

    fn save(&self, admin: &Admin) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let sql = format!(
            "INSERT INTO admins ({})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT(id) DO UPDATE SET
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                email = excluded.email,
                phone = excluded.phone,
                password_hash = excluded.password_hash,
                email_verified = excluded.email_verified,
                phone_verified = excluded.phone_verified,
                is_blocked = excluded.is_blocked,
                role = excluded.role,
                image = excluded.image,
                uuid_code = excluded.uuid_code,
                uuid_code_expire = excluded.uuid_code_expire,
                updated_at = excluded.updated_at",
            ADMIN_COLUMNS
        );
        conn.execute(
            &sql,
            rusqlite::params![
                admin.id,
                admin.first_name,
                admin.last_name,
                admin.email,
                admin.phone,
                admin.password_hash,
                admin.email_verified,
                admin.phone_verified,
                admin.is_blocked,
                admin.role.as_str(),
                admin.image,
                admin.uuid_code,
                admin.uuid_code_expire.map(format_timestamp),
                format_timestamp(admin.created_at),
                format_timestamp(admin.updated_at),
            ],
        )
        .map_err(classify_write_error)?;
        Ok(())
    }

    fn delete_many(&self, ids: &[String]) -> Result<usize, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let conn = self.conn.lock();
        let placeholders = (1..=ids.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("DELETE FROM admins WHERE id IN ({})", placeholders);
        let deleted = conn.execute(&sql, rusqlite::params_from_iter(ids.iter()))?;
        Ok(deleted)
    }

    fn list(&self, search: &str, offset: u64, limit: u64) -> Result<Vec<Admin>, StoreError> {
        let conn = self.conn.lock();
        let needle = search.trim().to_lowercase();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);

        let admins = if needle.is_empty() {
            let sql = format!(
                "SELECT {} FROM admins ORDER BY created_at DESC, rowid DESC LIMIT ?1 OFFSET ?2",
                ADMIN_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![limit, offset], row_to_admin)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        } else {
            let sql = format!(
                "SELECT {} FROM admins {} ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
                ADMIN_COLUMNS, SEARCH_CLAUSE
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![needle, limit, offset], row_to_admin)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        Ok(admins)
    }

    fn count(&self, search: &str) -> Result<u64, StoreError> {
        let conn = self.conn.lock();
        let needle = search.trim().to_lowercase();
        let total: i64 = if needle.is_empty() {
            conn.query_row("SELECT COUNT(*) FROM admins", [], |row| row.get(0))?
        } else {
            let sql = format!("SELECT COUNT(*) FROM admins {}", SEARCH_CLAUSE);
            conn.query_row(&sql, [needle], |row| row.get(0))?
        };
        Ok(total.max(0) as u64)
    }

    fn hash_password(&self, plain: &str) -> Result<String, StoreError> {
        Ok(bcrypt::hash(plain, self.hash_cost)?)
    }

    fn verify_password(&self, password_hash: &str, plain: &str) -> bool {
        bcrypt::verify(plain, password_hash).unwrap_or(false)
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn row_to_admin(row: &Row<'_>) -> rusqlite::Result<Admin> {
    let role: String = row.get(9)?;
    let uuid_code_expire: Option<String> = row.get(12)?;
    let created_at: String = row.get(13)?;
    let updated_at: String = row.get(14)?;

    Ok(Admin {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        password_hash: row.get(5)?,
        email_verified: row.get(6)?,
        phone_verified: row.get(7)?,
        is_blocked: row.get(8)?,
        role: AdminRole::parse(&role).unwrap_or_default(),
        image: row.get(10)?,
        uuid_code: row.get(11)?,
        uuid_code_expire: uuid_code_expire
            .as_deref()
            .map(|raw| parse_timestamp(12, raw))
            .transpose()?,
        created_at: parse_timestamp(13, &created_at)?,
        updated_at: parse_timestamp(14, &updated_at)?,
    })
}

/// 将唯一索引冲突映射为 `Duplicate`
fn classify_write_error(e: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(err, Some(msg)) = &e {
        if err.code == ErrorCode::ConstraintViolation {
            if msg.contains("admins.email") {
                return StoreError::Duplicate("email");
            }
            if msg.contains("admins.phone") {
                return StoreError::Duplicate("phone");
            }
        }
    }
    StoreError::Database(e)
}
