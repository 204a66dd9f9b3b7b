//! Course likes. A `(course, user)` row existing is the whole state.

use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub liked: bool,
    pub likes: i64,
}

pub async fn state(db: &SqlitePool, course_id: Uuid, user_id: Uuid) -> sqlx::Result<LikeState> {
    let mut tx = db.begin().await?;
    let state = read_state(&mut tx, course_id, user_id).await?;
    tx.commit().await?;
    Ok(state)
}

/// Removes the like if present, otherwise adds it. Two racing first likes
/// both end in the liked state; the unique index keeps a single row.
pub async fn toggle(db: &SqlitePool, course_id: Uuid, user_id: Uuid) -> sqlx::Result<LikeState> {
    let mut tx = db.begin().await?;

    let removed = sqlx::query("DELETE FROM course_likes WHERE course_id = ? AND user_id = ?")
        .bind(course_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if removed == 0 {
        sqlx::query(
            "INSERT INTO course_likes (id, course_id, user_id) VALUES (?, ?, ?)
            ON CONFLICT (course_id, user_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    }

    let state = read_state(&mut tx, course_id, user_id).await?;

    tx.commit().await?;

    Ok(state)
}

async fn read_state(
    tx: &mut Transaction<'_, Sqlite>,
    course_id: Uuid,
    user_id: Uuid,
) -> sqlx::Result<LikeState> {
    let (likes, liked): (i64, i64) = sqlx::query_as(
        "SELECT
            COUNT(*),
            COALESCE(MAX(user_id = ?), 0)
        FROM course_likes WHERE course_id = ?",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(LikeState {
        liked: liked != 0,
        likes,
    })
}
