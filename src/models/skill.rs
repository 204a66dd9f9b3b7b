use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Skill {
    pub id: Uuid,
    pub name: String,
}

impl Skill {
    pub async fn all(db: &SqlitePool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as("SELECT id, name FROM skills ORDER BY name")
            .fetch_all(db)
            .await
    }

    pub async fn find(db: &SqlitePool, id: Uuid) -> sqlx::Result<Option<Self>> {
        sqlx::query_as("SELECT id, name FROM skills WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn for_teacher(db: &SqlitePool, teacher_id: Uuid) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(
            "SELECT s.id, s.name FROM skills s
            JOIN teacher_skills ts ON ts.skill_id = s.id
            WHERE ts.teacher_id = ?
            ORDER BY s.name",
        )
        .bind(teacher_id)
        .fetch_all(db)
        .await
    }

    /// Case-insensitive; `except` skips the record being edited.
    pub async fn name_taken(
        db: &SqlitePool,
        name: &str,
        except: Option<Uuid>,
    ) -> sqlx::Result<bool> {
        let existing: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM skills WHERE name = ? COLLATE NOCASE")
                .bind(name)
                .fetch_optional(db)
                .await?;

        Ok(existing.is_some_and(|id| Some(id) != except))
    }

    pub async fn create(db: &SqlitePool, name: &str) -> sqlx::Result<Uuid> {
        let id = Uuid::new_v4();

        sqlx::query("INSERT INTO skills (id, name) VALUES (?, ?)")
            .bind(id)
            .bind(name)
            .execute(db)
            .await?;

        Ok(id)
    }

    pub async fn rename(db: &SqlitePool, id: Uuid, name: &str) -> sqlx::Result<()> {
        sqlx::query("UPDATE skills SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(db)
            .await?;

        Ok(())
    }

    pub async fn delete(db: &SqlitePool, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM skills WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::testing::memory_pool;

    #[tokio::test]
    async fn name_taken_ignores_case_and_self() {
        let db = memory_pool().await;
        let id = Skill::create(&db, "Python").await.unwrap();

        assert!(Skill::name_taken(&db, "python", None).await.unwrap());
        assert!(!Skill::name_taken(&db, "PYTHON", Some(id)).await.unwrap());
        assert!(!Skill::name_taken(&db, "Rust", None).await.unwrap());

        assert!(Skill::delete(&db, id).await.unwrap());
        assert!(Skill::find(&db, id).await.unwrap().is_none());
    }
}
