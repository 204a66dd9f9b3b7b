#![deny(
    clippy::as_conversions,
    clippy::expect_used,
    clippy::future_not_send,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::pedantic,
    clippy::string_slice,
    clippy::todo,
    clippy::unwrap_used,
    unsafe_code
)]
#![allow(
    clippy::manual_non_exhaustive,
    clippy::missing_errors_doc,
    clippy::module_inception,
    clippy::module_name_repetitions,
    clippy::needless_return,
    clippy::single_match_else,
    clippy::multiple_crate_versions
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::indexing_slicing))]

use std::io;

use askama::Template;
use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    response::Html,
    routing::get,
};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;
use tower_sessions::{
    Expiry, SessionManagerLayer,
    cookie::{SameSite, time::Duration},
};

use crate::{
    error::AppResult,
    models::{Department, Student},
    templates::{HomePage, Nav},
};

pub use args::AcademyArgs;
pub use role::Role;
pub use state::AcademyState;

mod args;
mod auth;
mod error;
pub mod filters;
mod forms;
pub mod models;
mod password;
mod role;
mod routes;
mod state;
mod templates;

const RECENT_STUDENTS: i64 = 7;
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

pub async fn server(args: AcademyArgs) -> Result<Router, io::Error> {
    let state = AcademyState::connect(args).await?;
    Ok(router(state))
}

pub fn router(state: AcademyState) -> Router {
    let session_layer = SessionManagerLayer::new(state.session_store.clone())
        .with_secure(state.config.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::days(7)));

    Router::new()
        .route("/", get(index))
        .merge(routes::professors::router())
        .merge(routes::students::router())
        .merge(routes::courses::router())
        .merge(routes::lessons::router())
        .merge(routes::departments::router())
        .merge(routes::skills::router())
        .merge(routes::attendance::router())
        .merge(routes::likes::router())
        .merge(auth::auth_router())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index(auth: auth::AuthUser, State(db): State<SqlitePool>) -> AppResult<Html<String>> {
    let new_students = Student::recent(&db, RECENT_STUDENTS).await?;
    let total_students = Student::count(&db).await?;
    let departments = Department::all(&db).await?;

    Ok(Html(
        HomePage {
            nav: Nav::new(&auth),
            new_students,
            total_students,
            departments,
        }
        .render()?,
    ))
}
