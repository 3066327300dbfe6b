use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// A stored user account.
///
/// `token_secret` is the opaque server-side secret refresh tokens are bound
/// to; rotating it invalidates every refresh token issued before the
/// rotation. It is read by the auth pipeline and written only by account
/// creation and logout.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub uuid: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub token_secret: String,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    uuid: String,
    email: String,
    username: String,
    password_hash: String,
    token_secret: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            email: row.email,
            username: row.username,
            password_hash: row.password_hash,
            token_secret: row.token_secret,
        }
    }
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user. Returns the user ID.
    pub async fn create(
        &self,
        uuid: &str,
        email: &str,
        username: &str,
        password_hash: &str,
        token_secret: &str,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (uuid, email, username, password_hash, token_secret) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(uuid)
        .bind(email)
        .bind(username)
        .bind(password_hash)
        .bind(token_secret)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a user by UUID.
    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, uuid, email, username, password_hash, token_secret FROM users WHERE uuid = ?",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    /// Get a user by email.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, uuid, email, username, password_hash, token_secret FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    /// Replace the user's token secret, invalidating all refresh tokens
    /// issued under the old one.
    pub async fn rotate_token_secret(
        &self,
        uuid: &str,
        token_secret: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET token_secret = ? WHERE uuid = ?")
            .bind(token_secret)
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
