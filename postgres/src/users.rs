//! `users` table.

use crate::error::{corrupt, query_error, write_error};
use crate::{limit_offset, total, PgDatabase};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rentcar_core::pagination::{Page, PageRequest};
use rentcar_core::repository::{RepositoryError, Result, UserRepository};
use rentcar_core::types::{NewUser, Role, User, UserId};

const COLUMNS: &str = "id, role_id, name, email, password_hash, address, phone_number, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    role_id: i64,
    name: String,
    email: String,
    password_hash: String,
    address: String,
    phone_number: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self> {
        let role = Role::from_id(row.role_id).ok_or_else(|| corrupt("role_id", &row.role_id.to_string()))?;
        Ok(Self {
            id: UserId::new(row.id),
            role,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            address: row.address,
            phone_number: row.phone_number,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl UserRepository for PgDatabase {
    async fn create(&self, user: NewUser) -> Result<User> {
        let row: UserRow = sqlx::query_as(&format!(
            r"
            INSERT INTO users (role_id, name, email, password_hash, address, phone_number)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COLUMNS}
            "
        ))
        .bind(user.role.id())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.address)
        .bind(&user.phone_number)
        .fetch_one(self.pool())
        .await
        .map_err(write_error)?;

        tracing::debug!(user_id = row.id, "User inserted");
        User::try_from(row)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(self.pool())
            .await
            .map_err(query_error)?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!("SELECT {COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(self.pool())
            .await
            .map_err(query_error)?;
        row.map(User::try_from).transpose()
    }

    async fn update(&self, user: &User) -> Result<User> {
        let row: UserRow = sqlx::query_as(&format!(
            r"
            UPDATE users
            SET name = $2,
                email = $3,
                password_hash = $4,
                address = $5,
                phone_number = $6,
                updated_at = now()
            WHERE id = $1
            RETURNING {COLUMNS}
            "
        ))
        .bind(user.id.get())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.address)
        .bind(&user.phone_number)
        .fetch_one(self.pool())
        .await
        .map_err(write_error)?;

        User::try_from(row)
    }

    async fn list(&self, page: PageRequest) -> Result<Page<User>> {
        let (limit, offset) = limit_offset(page);
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM users ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await
        .map_err(query_error)?;

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool())
            .await
            .map_err(query_error)?;

        let users = rows.into_iter().map(User::try_from).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(users, total(count), page))
    }
}
