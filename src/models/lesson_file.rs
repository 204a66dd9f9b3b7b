use std::{
    io,
    path::{Path, PathBuf},
};

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::fs;
use uuid::Uuid;

/// An upload attached to a lesson. `stored_path` is relative to the media
/// directory.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct LessonFile {
    pub id: Uuid,
    pub lesson_id: Uuid,

    pub file_name: String,
    pub stored_path: String,
    pub size: i64,

    pub uploaded_at: NaiveDateTime,
}

/// Keeps the characters that are safe in a path component.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "file".to_owned()
    } else {
        cleaned.to_owned()
    }
}

impl LessonFile {
    pub async fn for_lesson(db: &SqlitePool, lesson_id: Uuid) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(
            "SELECT id, lesson_id, file_name, stored_path, size, uploaded_at
            FROM lesson_files WHERE lesson_id = ? ORDER BY uploaded_at",
        )
        .bind(lesson_id)
        .fetch_all(db)
        .await
    }

    pub async fn find(db: &SqlitePool, id: Uuid) -> sqlx::Result<Option<Self>> {
        sqlx::query_as(
            "SELECT id, lesson_id, file_name, stored_path, size, uploaded_at
            FROM lesson_files WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Writes the bytes under `media/lessons/<lesson>/` and records them.
    pub async fn store(
        db: &SqlitePool,
        media: &Path,
        lesson_id: Uuid,
        file_name: &str,
        contents: &[u8],
    ) -> Result<Uuid, crate::error::AppError> {
        let id = Uuid::new_v4();
        let file_name = sanitize_file_name(file_name);
        let relative = PathBuf::from("lessons")
            .join(lesson_id.to_string())
            .join(format!("{id}-{file_name}"));
        let absolute = media.join(&relative);

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&absolute, contents).await?;

        let size = i64::try_from(contents.len()).unwrap_or(i64::MAX);

        let inserted = sqlx::query(
            "INSERT INTO lesson_files (id, lesson_id, file_name, stored_path, size, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(lesson_id)
        .bind(&file_name)
        .bind(relative.to_string_lossy().into_owned())
        .bind(size)
        .bind(Utc::now().naive_utc())
        .execute(db)
        .await;

        if let Err(e) = inserted {
            remove_stored(media, &relative.to_string_lossy()).await;
            return Err(e.into());
        }

        tracing::debug!(%id, %lesson_id, %file_name, size, "stored lesson file");

        Ok(id)
    }

    pub async fn read(&self, media: &Path) -> io::Result<Vec<u8>> {
        fs::read(media.join(&self.stored_path)).await
    }

    pub async fn delete(&self, db: &SqlitePool, media: &Path) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM lesson_files WHERE id = ?")
            .bind(self.id)
            .execute(db)
            .await?;

        remove_stored(media, &self.stored_path).await;

        Ok(())
    }
}

/// A file already missing from disk is not an error.
pub async fn remove_stored(media: &Path, stored_path: &str) {
    match fs::remove_file(media.join(stored_path)).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(error = %e, %stored_path, "could not remove stored file"),
    }
}
