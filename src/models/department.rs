use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

/// A named track courses belong to.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Department {
    pub id: Uuid,

    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct NewDepartment {
    pub name: String,
    pub description: String,
}

impl Department {
    pub async fn all(db: &SqlitePool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as("SELECT id, name, description FROM departments ORDER BY name")
            .fetch_all(db)
            .await
    }

    pub async fn find(db: &SqlitePool, id: Uuid) -> sqlx::Result<Option<Self>> {
        sqlx::query_as("SELECT id, name, description FROM departments WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn create(db: &SqlitePool, new: &NewDepartment) -> sqlx::Result<Uuid> {
        let id = Uuid::new_v4();

        sqlx::query("INSERT INTO departments (id, name, description) VALUES (?, ?, ?)")
            .bind(id)
            .bind(&new.name)
            .bind(&new.description)
            .execute(db)
            .await?;

        Ok(id)
    }

    pub async fn update(db: &SqlitePool, id: Uuid, new: &NewDepartment) -> sqlx::Result<()> {
        sqlx::query("UPDATE departments SET name = ?, description = ? WHERE id = ?")
            .bind(&new.name)
            .bind(&new.description)
            .bind(id)
            .execute(db)
            .await?;

        Ok(())
    }

    /// Courses and teachers pointing at the department keep existing with no department.
    pub async fn delete(db: &SqlitePool, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM departments WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
