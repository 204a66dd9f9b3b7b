use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

const SELECT_COURSES: &str = "SELECT
        c.id,
        c.department_id,
        d.name AS department_name,
        c.course_code,
        c.teacher_id,
        CASE WHEN u.id IS NULL THEN NULL ELSE u.first_name || ' ' || u.last_name END AS teacher_name,
        c.read_more_id,
        r.about_course,
        r.course_info,
        c.price,
        c.duration,
        c.capacity,
        c.created_at,
        (SELECT COUNT(*) FROM student_courses sc WHERE sc.course_id = c.id) AS student_count,
        (SELECT COUNT(*) FROM course_likes cl WHERE cl.course_id = c.id) AS likes
    FROM courses c
    LEFT JOIN departments d ON d.id = c.department_id
    LEFT JOIN users u ON u.id = c.teacher_id
    LEFT JOIN read_more r ON r.id = c.read_more_id";

/// A course offering ("group"): one teacher, a roster of students and a
/// series of lessons.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Course {
    pub id: Uuid,

    pub department_id: Option<Uuid>,
    pub department_name: Option<String>,
    pub course_code: String,

    pub teacher_id: Option<Uuid>,
    pub teacher_name: Option<String>,

    pub read_more_id: Option<Uuid>,
    pub about_course: Option<String>,
    pub course_info: Option<String>,

    pub price: i64,
    /// Months.
    pub duration: i64,
    pub capacity: i64,

    pub created_at: NaiveDateTime,

    pub student_count: i64,
    pub likes: i64,
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub department_id: Option<Uuid>,
    pub course_code: String,
    pub teacher_id: Option<Uuid>,
    pub price: i64,
    pub duration: i64,
    pub capacity: i64,
    pub about_course: String,
    pub course_info: String,
}

impl Course {
    /// Department name when set, otherwise the course code.
    #[must_use]
    pub fn title(&self) -> &str {
        self.department_name.as_deref().unwrap_or(&self.course_code)
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.student_count >= self.capacity
    }

    pub async fn all(db: &SqlitePool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!("{SELECT_COURSES} ORDER BY c.created_at DESC"))
            .fetch_all(db)
            .await
    }

    pub async fn for_teacher(db: &SqlitePool, teacher_id: Uuid) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!(
            "{SELECT_COURSES} WHERE c.teacher_id = ? ORDER BY c.created_at DESC"
        ))
        .bind(teacher_id)
        .fetch_all(db)
        .await
    }

    pub async fn for_student(db: &SqlitePool, student_id: Uuid) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!(
            "{SELECT_COURSES}
            JOIN student_courses sc ON sc.course_id = c.id
            WHERE sc.student_id = ?
            ORDER BY c.course_code"
        ))
        .bind(student_id)
        .fetch_all(db)
        .await
    }

    pub async fn others(db: &SqlitePool, except: Uuid) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!(
            "{SELECT_COURSES} WHERE c.id <> ? ORDER BY c.created_at DESC"
        ))
        .bind(except)
        .fetch_all(db)
        .await
    }

    pub async fn find(db: &SqlitePool, id: Uuid) -> sqlx::Result<Option<Self>> {
        sqlx::query_as(&format!("{SELECT_COURSES} WHERE c.id = ?"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn create(db: &SqlitePool, new: &NewCourse) -> sqlx::Result<Uuid> {
        let id = Uuid::new_v4();
        let mut tx = db.begin().await?;

        let read_more_id = upsert_read_more(&mut tx, None, new).await?;

        sqlx::query(
            "INSERT INTO courses (id, department_id, course_code, teacher_id, read_more_id, price, duration, capacity, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(new.department_id)
        .bind(&new.course_code)
        .bind(new.teacher_id)
        .bind(read_more_id)
        .bind(new.price)
        .bind(new.duration)
        .bind(new.capacity)
        .bind(Utc::now().naive_utc())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(%id, code = %new.course_code, "created course");

        Ok(id)
    }

    pub async fn update(db: &SqlitePool, id: Uuid, new: &NewCourse) -> sqlx::Result<()> {
        let mut tx = db.begin().await?;

        let current: Option<Uuid> =
            sqlx::query_scalar("SELECT read_more_id FROM courses WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .flatten();

        let read_more_id = upsert_read_more(&mut tx, current, new).await?;

        sqlx::query(
            "UPDATE courses SET department_id = ?, course_code = ?, teacher_id = ?, read_more_id = ?, price = ?, duration = ?, capacity = ?
            WHERE id = ?",
        )
        .bind(new.department_id)
        .bind(&new.course_code)
        .bind(new.teacher_id)
        .bind(read_more_id)
        .bind(new.price)
        .bind(new.duration)
        .bind(new.capacity)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Lessons of the course are kept with no course; enrolments and likes
    /// go with it.
    pub async fn delete(db: &SqlitePool, id: Uuid) -> sqlx::Result<bool> {
        let mut tx = db.begin().await?;

        let read_more_id: Option<Uuid> =
            sqlx::query_scalar("SELECT read_more_id FROM courses WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .flatten();

        let result = sqlx::query("DELETE FROM courses WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if let Some(read_more_id) = read_more_id {
            sqlx::query("DELETE FROM read_more WHERE id = ?")
                .bind(read_more_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Keeps a read-more row only while at least one of its texts is non-empty.
async fn upsert_read_more(
    tx: &mut Transaction<'_, Sqlite>,
    current: Option<Uuid>,
    new: &NewCourse,
) -> sqlx::Result<Option<Uuid>> {
    let about = Some(new.about_course.as_str()).filter(|s| !s.is_empty());
    let info = Some(new.course_info.as_str()).filter(|s| !s.is_empty());

    match (current, about.is_some() || info.is_some()) {
        (Some(id), true) => {
            sqlx::query("UPDATE read_more SET about_course = ?, course_info = ? WHERE id = ?")
                .bind(about)
                .bind(info)
                .bind(id)
                .execute(&mut **tx)
                .await?;
            Ok(Some(id))
        }
        (None, true) => {
            let id = Uuid::new_v4();
            sqlx::query("INSERT INTO read_more (id, about_course, course_info) VALUES (?, ?, ?)")
                .bind(id)
                .bind(about)
                .bind(info)
                .execute(&mut **tx)
                .await?;
            Ok(Some(id))
        }
        (Some(id), false) => {
            // the course row still references it until the caller updates it
            sqlx::query("UPDATE courses SET read_more_id = NULL WHERE read_more_id = ?")
                .bind(id)
                .execute(&mut **tx)
                .await?;
            sqlx::query("DELETE FROM read_more WHERE id = ?")
                .bind(id)
                .execute(&mut **tx)
                .await?;
            Ok(None)
        }
        (None, false) => Ok(None),
    }
}
