use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::{
    error::AppError,
    password::{hash_password, verify_password},
    role::Role,
};

const SELECT_USERS: &str = "SELECT
        u.id,
        u.username,
        u.password_hash,
        u.first_name,
        u.last_name,
        u.email,
        u.phone,
        u.role,
        u.department_id,
        d.name AS department_name,
        u.created_at
    FROM users u
    LEFT JOIN departments d ON d.id = u.department_id";

/// A login account. Teachers are users with [`Role::Teacher`].
#[derive(Debug, Clone, Deserialize, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,

    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,

    pub role: Role,
    pub department_id: Option<Uuid>,
    pub department_name: Option<String>,

    pub created_at: NaiveDateTime,
}

/// Validated account fields. An empty password on update keeps the old one.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub department_id: Option<Uuid>,
    pub skill_ids: Vec<Uuid>,
}

impl User {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub async fn find(db: &SqlitePool, id: Uuid) -> sqlx::Result<Option<Self>> {
        sqlx::query_as(&format!("{SELECT_USERS} WHERE u.id = ?"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_teacher(db: &SqlitePool, id: Uuid) -> sqlx::Result<Option<Self>> {
        Ok(Self::find(db, id)
            .await?
            .filter(|user| user.role == Role::Teacher))
    }

    pub async fn teachers(db: &SqlitePool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!(
            "{SELECT_USERS} WHERE u.role = ? ORDER BY u.last_name, u.first_name"
        ))
        .bind(Role::Teacher)
        .fetch_all(db)
        .await
    }

    pub async fn count(db: &SqlitePool) -> sqlx::Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(db)
            .await
    }

    pub async fn username_taken(
        db: &SqlitePool,
        username: &str,
        except: Option<Uuid>,
    ) -> sqlx::Result<bool> {
        let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(db)
            .await?;

        Ok(existing.is_some_and(|id| Some(id) != except))
    }

    /// Returns the user only when the password matches.
    pub async fn authenticate(
        db: &SqlitePool,
        username: &str,
        password: &str,
    ) -> sqlx::Result<Option<Self>> {
        let user: Option<Self> = sqlx::query_as(&format!("{SELECT_USERS} WHERE u.username = ?"))
            .bind(username)
            .fetch_optional(db)
            .await?;

        Ok(user.filter(|user| verify_password(password, &user.password_hash)))
    }

    pub async fn create(db: &SqlitePool, new: &NewUser, iterations: u32) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        let password_hash = hash_password(&new.password, iterations)?;

        let mut tx = db.begin().await?;

        sqlx::query(
            "INSERT INTO users (id, username, password_hash, first_name, last_name, email, phone, role, department_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&new.username)
        .bind(password_hash)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(new.role)
        .bind(new.department_id)
        .bind(Utc::now().naive_utc())
        .execute(&mut *tx)
        .await?;

        set_skills(&mut tx, id, &new.skill_ids).await?;

        tx.commit().await?;

        tracing::info!(%id, username = %new.username, role = %new.role, "created user");

        Ok(id)
    }

    pub async fn update(
        db: &SqlitePool,
        id: Uuid,
        new: &NewUser,
        iterations: u32,
    ) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        sqlx::query(
            "UPDATE users SET username = ?, first_name = ?, last_name = ?, email = ?, phone = ?, department_id = ?
            WHERE id = ?",
        )
        .bind(&new.username)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(new.department_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if !new.password.is_empty() {
            sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
                .bind(hash_password(&new.password, iterations)?)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        set_skills(&mut tx, id, &new.skill_ids).await?;

        tx.commit().await?;

        Ok(())
    }

    /// Owned courses are kept with no teacher.
    pub async fn delete(db: &SqlitePool, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn skill_ids(db: &SqlitePool, id: Uuid) -> sqlx::Result<Vec<Uuid>> {
        sqlx::query_scalar("SELECT skill_id FROM teacher_skills WHERE teacher_id = ?")
            .bind(id)
            .fetch_all(db)
            .await
    }

    /// Creates a manager only while the user table is empty. Returns whether
    /// one was created.
    pub async fn bootstrap_manager(
        db: &SqlitePool,
        username: &str,
        password: &str,
        iterations: u32,
    ) -> Result<bool, AppError> {
        if Self::count(db).await? > 0 {
            return Ok(false);
        }

        let new = NewUser {
            username: username.to_owned(),
            password: password.to_owned(),
            first_name: username.to_owned(),
            last_name: String::new(),
            email: String::new(),
            phone: String::new(),
            role: Role::Manager,
            department_id: None,
            skill_ids: Vec::new(),
        };

        Self::create(db, &new, iterations).await?;

        Ok(true)
    }
}

async fn set_skills(
    tx: &mut Transaction<'_, Sqlite>,
    teacher_id: Uuid,
    skill_ids: &[Uuid],
) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM teacher_skills WHERE teacher_id = ?")
        .bind(teacher_id)
        .execute(&mut **tx)
        .await?;

    if skill_ids.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("INSERT INTO teacher_skills (teacher_id, skill_id) ");

    builder.push_values(skill_ids, |mut b, skill_id| {
        b.push_bind(teacher_id).push_bind(*skill_id);
    });

    builder.build().execute(&mut **tx).await?;

    Ok(())
}
