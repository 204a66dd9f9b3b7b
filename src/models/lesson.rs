use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

const SELECT_LESSONS: &str = "SELECT
        l.id,
        l.course_id,
        c.course_code,
        COALESCE(d.name, c.course_code) AS course_title,
        c.teacher_id AS course_teacher_id,
        l.theme,
        l.date,
        l.created_at
    FROM lessons l
    LEFT JOIN courses c ON c.id = l.course_id
    LEFT JOIN departments d ON d.id = c.department_id";

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Lesson {
    pub id: Uuid,

    /// `None` once the course has been deleted.
    pub course_id: Option<Uuid>,
    pub course_code: Option<String>,
    pub course_title: Option<String>,
    pub course_teacher_id: Option<Uuid>,

    pub theme: String,
    pub date: NaiveDate,

    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewLesson {
    pub course_id: Uuid,
    pub theme: String,
    pub date: NaiveDate,
}

impl Lesson {
    pub async fn all(db: &SqlitePool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!("{SELECT_LESSONS} ORDER BY l.date DESC, l.created_at DESC"))
            .fetch_all(db)
            .await
    }

    pub async fn for_teacher(db: &SqlitePool, teacher_id: Uuid) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!(
            "{SELECT_LESSONS} WHERE c.teacher_id = ? ORDER BY l.date DESC, l.created_at DESC"
        ))
        .bind(teacher_id)
        .fetch_all(db)
        .await
    }

    pub async fn for_course(db: &SqlitePool, course_id: Uuid) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!(
            "{SELECT_LESSONS} WHERE l.course_id = ? ORDER BY l.date, l.created_at"
        ))
        .bind(course_id)
        .fetch_all(db)
        .await
    }

    pub async fn find(db: &SqlitePool, id: Uuid) -> sqlx::Result<Option<Self>> {
        sqlx::query_as(&format!("{SELECT_LESSONS} WHERE l.id = ?"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn create(db: &SqlitePool, new: &NewLesson) -> sqlx::Result<Uuid> {
        let id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO lessons (id, course_id, theme, date, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(new.course_id)
        .bind(&new.theme)
        .bind(new.date)
        .bind(Utc::now().naive_utc())
        .execute(db)
        .await?;

        Ok(id)
    }

    pub async fn update(db: &SqlitePool, id: Uuid, new: &NewLesson) -> sqlx::Result<()> {
        sqlx::query("UPDATE lessons SET course_id = ?, theme = ?, date = ? WHERE id = ?")
            .bind(new.course_id)
            .bind(&new.theme)
            .bind(new.date)
            .bind(id)
            .execute(db)
            .await?;

        Ok(())
    }

    /// Attendance and file rows go with the lesson; stored files are the
    /// caller's to remove.
    pub async fn delete(db: &SqlitePool, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM lessons WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
