use askama::Template;
use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    forms::{self, Choice, FormErrors},
    models::{Course, Lesson, LessonFile, NewLesson, lesson_file},
    role::Permission,
    state::AcademyState,
    templates::{LessonFormPage, LessonListPage, Nav, unprocessable},
};

pub fn router() -> Router<AcademyState> {
    Router::new()
        .route("/lessons", get(list))
        .route("/lessons/add", get(add_page).post(add))
        .route("/lessons/{id}/edit", get(edit_page).post(edit))
        .route("/lessons/{id}/delete", post(delete))
        .route("/lesson-files/{id}", get(download))
        .route("/lesson-files/{id}/delete", post(delete_file))
}

#[derive(Debug, TryFromMultipart)]
pub struct LessonUpload {
    pub course: Option<String>,
    pub theme: Option<String>,
    pub date: Option<String>,
    #[form_data(limit = "25MiB")]
    pub files: Vec<FieldData<Bytes>>,
}

#[derive(Debug, Default, Clone)]
pub struct LessonForm {
    pub course: String,
    pub theme: String,
    pub date: String,
}

impl From<&LessonUpload> for LessonForm {
    fn from(upload: &LessonUpload) -> Self {
        Self {
            course: upload.course.clone().unwrap_or_default(),
            theme: upload.theme.clone().unwrap_or_default(),
            date: upload.date.clone().unwrap_or_default(),
        }
    }
}

impl From<&Lesson> for LessonForm {
    fn from(lesson: &Lesson) -> Self {
        Self {
            course: lesson
                .course_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            theme: lesson.theme.clone(),
            date: lesson.date.format("%Y-%m-%d").to_string(),
        }
    }
}

impl LessonForm {
    /// `courses` are the ones the current user may schedule lessons for.
    fn validate(&self, courses: &[Course]) -> Result<NewLesson, FormErrors> {
        let mut errors = FormErrors::default();

        let course_id = match forms::optional_id(&mut errors, "course", &self.course) {
            Some(id) if courses.iter().any(|c| c.id == id) => Some(id),
            Some(_) => {
                errors.add("course", "Select a valid choice.");
                None
            }
            None => {
                if !errors.has("course") {
                    errors.add("course", forms::REQUIRED);
                }
                None
            }
        };

        let theme = forms::required(&mut errors, "theme", &self.theme, 200);
        let date = forms::date(&mut errors, "date", &self.date);

        match (course_id, date) {
            (Some(course_id), Some(date)) if errors.is_empty() => Ok(NewLesson {
                course_id,
                theme,
                date,
            }),
            _ => Err(errors),
        }
    }
}

async fn allowed_courses(auth: &AuthUser, state: &AcademyState) -> AppResult<Vec<Course>> {
    Ok(if auth.role.is_manager() {
        Course::all(&state.db_pool).await?
    } else {
        Course::for_teacher(&state.db_pool, auth.id).await?
    })
}

async fn find_owned(auth: &AuthUser, state: &AcademyState, id: Uuid) -> AppResult<Lesson> {
    let lesson = Lesson::find(&state.db_pool, id)
        .await?
        .ok_or(AppError::NotFound("lesson"))?;
    auth.require_owner(lesson.course_teacher_id)?;
    Ok(lesson)
}

/// Empty file inputs arrive as a part with no bytes; those are skipped.
async fn store_files(
    state: &AcademyState,
    lesson_id: Uuid,
    files: Vec<FieldData<Bytes>>,
) -> AppResult<()> {
    for file in files {
        if file.contents.is_empty() {
            continue;
        }
        let name = file.metadata.file_name.as_deref().unwrap_or("file");
        LessonFile::store(
            &state.db_pool,
            &state.config.media,
            lesson_id,
            name,
            &file.contents,
        )
        .await?;
    }
    Ok(())
}

fn form_page(
    auth: &AuthUser,
    courses: &[Course],
    editing: Option<Uuid>,
    files: Vec<LessonFile>,
    form: LessonForm,
    errors: FormErrors,
) -> LessonFormPage {
    LessonFormPage {
        nav: Nav::new(auth),
        editing,
        courses: courses
            .iter()
            .map(|c| {
                let value = c.id.to_string();
                let selected = value == form.course;
                Choice::new(value, format!("{} ({})", c.title(), c.course_code), selected)
            })
            .collect(),
        files,
        form,
        errors,
    }
}

async fn list(auth: AuthUser, State(state): State<AcademyState>) -> AppResult<Html<String>> {
    let lessons = if auth.role.is_manager() {
        Lesson::all(&state.db_pool).await?
    } else {
        Lesson::for_teacher(&state.db_pool, auth.id).await?
    };

    Ok(Html(
        LessonListPage {
            nav: Nav::new(&auth),
            lessons,
        }
        .render()?,
    ))
}

async fn add_page(auth: AuthUser, State(state): State<AcademyState>) -> AppResult<Html<String>> {
    auth.require(Permission::ManageLessons)?;

    let courses = allowed_courses(&auth, &state).await?;
    let page = form_page(
        &auth,
        &courses,
        None,
        Vec::new(),
        LessonForm::default(),
        FormErrors::default(),
    );

    Ok(Html(page.render()?))
}

async fn add(
    auth: AuthUser,
    State(state): State<AcademyState>,
    TypedMultipart(upload): TypedMultipart<LessonUpload>,
) -> AppResult<Response> {
    auth.require(Permission::ManageLessons)?;

    let courses = allowed_courses(&auth, &state).await?;
    let form = LessonForm::from(&upload);

    match form.validate(&courses) {
        Ok(new) => {
            let id = Lesson::create(&state.db_pool, &new).await?;
            store_files(&state, id, upload.files).await?;
            tracing::info!(%id, course = %new.course_id, "added lesson");
            Ok(Redirect::to(&format!("/courses/{}/lessons", new.course_id)).into_response())
        }
        Err(errors) => unprocessable(&form_page(&auth, &courses, None, Vec::new(), form, errors)),
    }
}

async fn edit_page(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(id): Path<Uuid>,
) -> AppResult<Html<String>> {
    auth.require(Permission::ManageLessons)?;

    let lesson = find_owned(&auth, &state, id).await?;
    let courses = allowed_courses(&auth, &state).await?;
    let files = LessonFile::for_lesson(&state.db_pool, id).await?;

    let page = form_page(
        &auth,
        &courses,
        Some(id),
        files,
        LessonForm::from(&lesson),
        FormErrors::default(),
    );

    Ok(Html(page.render()?))
}

async fn edit(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(id): Path<Uuid>,
    TypedMultipart(upload): TypedMultipart<LessonUpload>,
) -> AppResult<Response> {
    auth.require(Permission::ManageLessons)?;

    find_owned(&auth, &state, id).await?;
    let courses = allowed_courses(&auth, &state).await?;
    let form = LessonForm::from(&upload);

    match form.validate(&courses) {
        Ok(new) => {
            Lesson::update(&state.db_pool, id, &new).await?;
            store_files(&state, id, upload.files).await?;
            Ok(Redirect::to(&format!("/courses/{}/lessons", new.course_id)).into_response())
        }
        Err(errors) => {
            let files = LessonFile::for_lesson(&state.db_pool, id).await?;
            unprocessable(&form_page(&auth, &courses, Some(id), files, form, errors))
        }
    }
}

async fn delete(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(id): Path<Uuid>,
) -> AppResult<Redirect> {
    auth.require(Permission::ManageLessons)?;

    let lesson = find_owned(&auth, &state, id).await?;
    let files = LessonFile::for_lesson(&state.db_pool, id).await?;

    Lesson::delete(&state.db_pool, id).await?;
    for file in &files {
        lesson_file::remove_stored(&state.config.media, &file.stored_path).await;
    }

    Ok(Redirect::to(&match lesson.course_id {
        Some(course_id) => format!("/courses/{course_id}/lessons"),
        None => "/lessons".to_owned(),
    }))
}

async fn download(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let file = LessonFile::find(&state.db_pool, id)
        .await?
        .ok_or(AppError::NotFound("file"))?;
    find_owned(&auth, &state, file.lesson_id).await?;

    let contents = match file.read(&state.config.media).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("file"));
        }
        Err(e) => return Err(e.into()),
    };

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.file_name),
            ),
        ],
        contents,
    )
        .into_response())
}

async fn delete_file(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(id): Path<Uuid>,
) -> AppResult<Redirect> {
    auth.require(Permission::ManageLessons)?;

    let file = LessonFile::find(&state.db_pool, id)
        .await?
        .ok_or(AppError::NotFound("file"))?;
    find_owned(&auth, &state, file.lesson_id).await?;

    file.delete(&state.db_pool, &state.config.media).await?;

    Ok(Redirect::to(&format!("/lessons/{}/edit", file.lesson_id)))
}
