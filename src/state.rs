use std::{fmt, io, str::FromStr};

use axum::extract::FromRef;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tower_sessions_sqlx_store::SqliteStore;

use crate::{AcademyArgs, models::User};

#[derive(Clone)]
pub struct AcademyState {
    pub db_pool: SqlitePool,
    pub session_store: SqliteStore,
    pub config: AcademyArgs,
}

impl fmt::Debug for AcademyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcademyState")
            .field("db_pool", &self.db_pool)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AcademyState {
    /// Opens the database, applies migrations and prepares the session table.
    pub async fn connect(config: AcademyArgs) -> Result<Self, io::Error> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(io::Error::other)?
            .create_if_missing(true)
            .foreign_keys(true);

        let db_pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(io::Error::other)?;

        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .map_err(io::Error::other)?;

        let session_store = SqliteStore::new(db_pool.clone());
        session_store.migrate().await.map_err(io::Error::other)?;

        tokio::fs::create_dir_all(&config.media).await?;

        if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password)
        {
            let created = User::bootstrap_manager(
                &db_pool,
                username,
                password,
                config.password_iterations,
            )
            .await
            .map_err(io::Error::other)?;

            if created {
                tracing::info!(%username, "created bootstrap manager");
            }
        }

        Ok(Self {
            db_pool,
            session_store,
            config,
        })
    }
}

impl FromRef<AcademyState> for SqlitePool {
    fn from_ref(state: &AcademyState) -> Self {
        state.db_pool.clone()
    }
}
