use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    forms::{FormErrors, FormFields},
    models::{
        Lesson,
        attendance::{self, AttendanceRow},
    },
    role::Permission,
    state::AcademyState,
    templates::{AttendancePage, Nav, SheetRow, unprocessable},
};

pub fn router() -> Router<AcademyState> {
    Router::new().route("/attendance/{lesson_id}", get(sheet).post(submit))
}

async fn find_lesson(auth: &AuthUser, state: &AcademyState, id: Uuid) -> AppResult<Lesson> {
    auth.require(Permission::TakeAttendance)?;

    let lesson = Lesson::find(&state.db_pool, id)
        .await?
        .ok_or(AppError::NotFound("lesson"))?;
    auth.require_owner(lesson.course_teacher_id)?;

    Ok(lesson)
}

fn stored_rows(rows: &[AttendanceRow]) -> Vec<SheetRow> {
    rows.iter()
        .map(|row| SheetRow {
            student_id: row.student_id,
            student_name: row.student_name(),
            mark: row.mark.map(|m| m.to_string()).unwrap_or_default(),
            present: row.is_present.unwrap_or(false),
            error: None,
        })
        .collect()
}

/// The sheet as submitted, so a rejected batch is shown with the user's
/// input and the per-row messages.
fn submitted_rows(rows: &[AttendanceRow], fields: &FormFields, errors: &FormErrors) -> Vec<SheetRow> {
    rows.iter()
        .map(|row| {
            let mark_field = attendance::mark_field(row.student_id);
            SheetRow {
                student_id: row.student_id,
                student_name: row.student_name(),
                mark: fields.get(&mark_field).to_owned(),
                present: fields.contains(&attendance::present_field(row.student_id)),
                error: errors.first(&mark_field).map(str::to_owned),
            }
        })
        .collect()
}

/// Opening the sheet creates the missing rows for every enrolled student.
async fn sheet(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(lesson_id): Path<Uuid>,
) -> AppResult<Html<String>> {
    let lesson = find_lesson(&auth, &state, lesson_id).await?;

    attendance::ensure_for_lesson(&state.db_pool, lesson_id).await?;

    let rows = attendance::sheet(&state.db_pool, lesson_id).await?;

    Ok(Html(
        AttendancePage {
            nav: Nav::new(&auth),
            lesson,
            rows: stored_rows(&rows),
            errors: FormErrors::default(),
        }
        .render()?,
    ))
}

async fn submit(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(lesson_id): Path<Uuid>,
    Form(fields): Form<FormFields>,
) -> AppResult<Response> {
    let lesson = find_lesson(&auth, &state, lesson_id).await?;

    attendance::ensure_for_lesson(&state.db_pool, lesson_id).await?;
    let rows = attendance::sheet(&state.db_pool, lesson_id).await?;

    match attendance::parse_submission(&fields, &rows) {
        Ok(updates) => {
            attendance::save(&state.db_pool, lesson_id, &updates).await?;

            Ok(Redirect::to(&match lesson.course_id {
                Some(course_id) => format!("/courses/{course_id}/lessons"),
                None => "/lessons".to_owned(),
            })
            .into_response())
        }
        Err(errors) => {
            tracing::debug!(%lesson_id, fields = ?errors.fields().collect::<Vec<_>>(), "rejected attendance");
            unprocessable(&AttendancePage {
                nav: Nav::new(&auth),
                rows: submitted_rows(&rows, &fields, &errors),
                lesson,
                errors,
            })
        }
    }
}
