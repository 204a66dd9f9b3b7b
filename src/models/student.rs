use std::fmt;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Self; 2] = [Self::Male, Self::Female];

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Male => write!(f, "Male"),
            Self::Female => write!(f, "Female"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Student {
    pub id: Uuid,

    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub gender: Gender,

    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub gender: Gender,
    pub course_ids: Vec<Uuid>,
}

const COLUMNS: &str = "s.id, s.first_name, s.last_name, s.email, s.phone, s.gender, s.created_at";

impl Student {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub async fn all(db: &SqlitePool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM students s ORDER BY s.last_name, s.first_name"
        ))
        .fetch_all(db)
        .await
    }

    /// Students enrolled in at least one course taught by `teacher_id`.
    pub async fn for_teacher(db: &SqlitePool, teacher_id: Uuid) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!(
            "SELECT DISTINCT {COLUMNS} FROM students s
            JOIN student_courses sc ON sc.student_id = s.id
            JOIN courses c ON c.id = sc.course_id
            WHERE c.teacher_id = ?
            ORDER BY s.last_name, s.first_name"
        ))
        .bind(teacher_id)
        .fetch_all(db)
        .await
    }

    pub async fn enrolled_in(db: &SqlitePool, course_id: Uuid) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM students s
            JOIN student_courses sc ON sc.student_id = s.id
            WHERE sc.course_id = ?
            ORDER BY s.last_name, s.first_name"
        ))
        .bind(course_id)
        .fetch_all(db)
        .await
    }

    pub async fn recent(db: &SqlitePool, limit: i64) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM students s ORDER BY s.created_at DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(db)
        .await
    }

    pub async fn count(db: &SqlitePool) -> sqlx::Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM students")
            .fetch_one(db)
            .await
    }

    pub async fn find(db: &SqlitePool, id: Uuid) -> sqlx::Result<Option<Self>> {
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM students s WHERE s.id = ?"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn course_ids(db: &SqlitePool, id: Uuid) -> sqlx::Result<Vec<Uuid>> {
        sqlx::query_scalar("SELECT course_id FROM student_courses WHERE student_id = ?")
            .bind(id)
            .fetch_all(db)
            .await
    }

    pub async fn create(db: &SqlitePool, new: &NewStudent) -> sqlx::Result<Uuid> {
        let id = Uuid::new_v4();
        let mut tx = db.begin().await?;

        sqlx::query(
            "INSERT INTO students (id, first_name, last_name, email, phone, gender, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(new.gender)
        .bind(Utc::now().naive_utc())
        .execute(&mut *tx)
        .await?;

        set_courses(&mut tx, id, &new.course_ids).await?;

        tx.commit().await?;

        Ok(id)
    }

    pub async fn update(db: &SqlitePool, id: Uuid, new: &NewStudent) -> sqlx::Result<()> {
        let mut tx = db.begin().await?;

        sqlx::query(
            "UPDATE students SET first_name = ?, last_name = ?, email = ?, phone = ?, gender = ?
            WHERE id = ?",
        )
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(new.gender)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        set_courses(&mut tx, id, &new.course_ids).await?;

        tx.commit().await?;

        Ok(())
    }

    /// Attendance rows of the student go with it.
    pub async fn delete(db: &SqlitePool, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Replaces the enrolment set. Attendance already recorded for lessons of a
/// dropped course is left alone.
async fn set_courses(
    tx: &mut Transaction<'_, Sqlite>,
    student_id: Uuid,
    course_ids: &[Uuid],
) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM student_courses WHERE student_id = ?")
        .bind(student_id)
        .execute(&mut **tx)
        .await?;

    if course_ids.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("INSERT INTO student_courses (student_id, course_id) ");

    builder.push_values(course_ids, |mut b, course_id| {
        b.push_bind(student_id).push_bind(*course_id);
    });

    builder.build().execute(&mut **tx).await?;

    Ok(())
}
