use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    forms::{self, Choice, FormErrors},
    models::{Course, Department, Lesson, NewCourse, User},
    role::Permission,
    state::AcademyState,
    templates::{
        CourseAboutPage, CourseFormPage, CourseLessonsPage, CourseListPage, Nav, unprocessable,
    },
};

pub fn router() -> Router<AcademyState> {
    Router::new()
        .route("/courses", get(list))
        .route("/courses/add", get(add_page).post(add))
        .route("/courses/{id}", get(about))
        .route("/courses/{id}/lessons", get(lessons))
        .route("/courses/{id}/edit", get(edit_page).post(edit))
        .route("/courses/{id}/delete", post(delete))
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CourseForm {
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub course_code: String,
    #[serde(default)]
    pub teacher: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub capacity: String,
    #[serde(default)]
    pub about_course: String,
    #[serde(default)]
    pub course_info: String,
}

impl From<&Course> for CourseForm {
    fn from(course: &Course) -> Self {
        Self {
            department: course
                .department_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            course_code: course.course_code.clone(),
            teacher: course
                .teacher_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            price: course.price.to_string(),
            duration: course.duration.to_string(),
            capacity: course.capacity.to_string(),
            about_course: course.about_course.clone().unwrap_or_default(),
            course_info: course.course_info.clone().unwrap_or_default(),
        }
    }
}

impl CourseForm {
    /// `enrolled` is the current roster size; capacity may not drop below it.
    fn validate(
        &self,
        departments: &[Department],
        teachers: &[User],
        enrolled: i64,
    ) -> Result<NewCourse, FormErrors> {
        let mut errors = FormErrors::default();

        let department_id = forms::optional_id(&mut errors, "department", &self.department);
        if let Some(id) = department_id
            && !departments.iter().any(|d| d.id == id)
        {
            errors.add("department", "Select a valid choice.");
        }

        let teacher_id = forms::optional_id(&mut errors, "teacher", &self.teacher);
        if let Some(id) = teacher_id
            && !teachers.iter().any(|t| t.id == id)
        {
            errors.add("teacher", "Select a valid choice.");
        }

        let capacity = forms::integer(&mut errors, "capacity", &self.capacity, 1..=1000);
        if let Some(capacity) = capacity
            && capacity < enrolled
        {
            errors.add(
                "capacity",
                format!("{enrolled} students are already enrolled."),
            );
        }

        let new = NewCourse {
            department_id,
            course_code: forms::required(&mut errors, "course_code", &self.course_code, 20),
            teacher_id,
            price: forms::integer(&mut errors, "price", &self.price, 0..=i64::from(u32::MAX))
                .unwrap_or_default(),
            duration: forms::integer(&mut errors, "duration", &self.duration, 1..=120)
                .unwrap_or_default(),
            capacity: capacity.unwrap_or_default(),
            about_course: forms::optional(&mut errors, "about_course", &self.about_course, 20_000),
            course_info: forms::optional(&mut errors, "course_info", &self.course_info, 20_000),
        };

        errors.into_result(new)
    }
}

async fn form_page(
    auth: &AuthUser,
    state: &AcademyState,
    editing: Option<Uuid>,
    form: CourseForm,
    errors: FormErrors,
) -> AppResult<CourseFormPage> {
    let departments = Department::all(&state.db_pool).await?;
    let teachers = User::teachers(&state.db_pool).await?;

    Ok(CourseFormPage {
        nav: Nav::new(auth),
        editing,
        departments: departments
            .iter()
            .map(|d| {
                let value = d.id.to_string();
                let selected = value == form.department;
                Choice::new(value, d.name.clone(), selected)
            })
            .collect(),
        teachers: teachers
            .iter()
            .map(|t| {
                let value = t.id.to_string();
                let selected = value == form.teacher;
                Choice::new(value, t.full_name(), selected)
            })
            .collect(),
        form,
        errors,
    })
}

async fn list(auth: AuthUser, State(state): State<AcademyState>) -> AppResult<Html<String>> {
    let courses = if auth.role.is_manager() {
        Course::all(&state.db_pool).await?
    } else {
        Course::for_teacher(&state.db_pool, auth.id).await?
    };

    Ok(Html(
        CourseListPage {
            nav: Nav::new(&auth),
            courses,
        }
        .render()?,
    ))
}

/// Read-more page of a course, with the other courses listed beside it.
async fn about(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(id): Path<Uuid>,
) -> AppResult<Html<String>> {
    let course = Course::find(&state.db_pool, id)
        .await?
        .ok_or(AppError::NotFound("course"))?;
    let others = Course::others(&state.db_pool, id).await?;
    let liked = crate::models::like::state(&state.db_pool, id, auth.id)
        .await?
        .liked;

    Ok(Html(
        CourseAboutPage {
            nav: Nav::new(&auth),
            course,
            others,
            liked,
        }
        .render()?,
    ))
}

async fn lessons(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(id): Path<Uuid>,
) -> AppResult<Html<String>> {
    let course = Course::find(&state.db_pool, id)
        .await?
        .ok_or(AppError::NotFound("course"))?;

    if !auth.owns(&course) {
        return Err(AppError::Forbidden);
    }

    let lessons = Lesson::for_course(&state.db_pool, id).await?;

    Ok(Html(
        CourseLessonsPage {
            nav: Nav::new(&auth),
            course,
            lessons,
        }
        .render()?,
    ))
}

async fn add_page(auth: AuthUser, State(state): State<AcademyState>) -> AppResult<Html<String>> {
    auth.require(Permission::ManageCourses)?;

    let page = form_page(
        &auth,
        &state,
        None,
        CourseForm::default(),
        FormErrors::default(),
    )
    .await?;

    Ok(Html(page.render()?))
}

async fn add(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Form(form): Form<CourseForm>,
) -> AppResult<Response> {
    auth.require(Permission::ManageCourses)?;

    let departments = Department::all(&state.db_pool).await?;
    let teachers = User::teachers(&state.db_pool).await?;

    match form.validate(&departments, &teachers, 0) {
        Ok(new) => {
            let id = Course::create(&state.db_pool, &new).await?;
            Ok(Redirect::to(&format!("/courses/{id}")).into_response())
        }
        Err(errors) => unprocessable(&form_page(&auth, &state, None, form, errors).await?),
    }
}

async fn edit_page(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(id): Path<Uuid>,
) -> AppResult<Html<String>> {
    auth.require(Permission::ManageCourses)?;

    let course = Course::find(&state.db_pool, id)
        .await?
        .ok_or(AppError::NotFound("course"))?;

    let page = form_page(
        &auth,
        &state,
        Some(id),
        CourseForm::from(&course),
        FormErrors::default(),
    )
    .await?;

    Ok(Html(page.render()?))
}

async fn edit(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(id): Path<Uuid>,
    Form(form): Form<CourseForm>,
) -> AppResult<Response> {
    auth.require(Permission::ManageCourses)?;

    let course = Course::find(&state.db_pool, id)
        .await?
        .ok_or(AppError::NotFound("course"))?;
    let departments = Department::all(&state.db_pool).await?;
    let teachers = User::teachers(&state.db_pool).await?;

    match form.validate(&departments, &teachers, course.student_count) {
        Ok(new) => {
            Course::update(&state.db_pool, id, &new).await?;
            Ok(Redirect::to(&format!("/courses/{id}")).into_response())
        }
        Err(errors) => unprocessable(&form_page(&auth, &state, Some(id), form, errors).await?),
    }
}

/// Lessons of the course stay, with no course.
async fn delete(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(id): Path<Uuid>,
) -> AppResult<Redirect> {
    auth.require(Permission::ManageCourses)?;

    if !Course::delete(&state.db_pool, id).await? {
        return Err(AppError::NotFound("course"));
    }
    tracing::info!(%id, by = %auth.username, "deleted course");

    Ok(Redirect::to("/courses"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> CourseForm {
        CourseForm {
            course_code: "PY-1".to_owned(),
            price: "400000".to_owned(),
            duration: "6".to_owned(),
            capacity: "12".to_owned(),
            ..CourseForm::default()
        }
    }

    #[test]
    fn capacity_not_below_roster() {
        assert!(form().validate(&[], &[], 12).is_ok());

        let errors = form().validate(&[], &[], 13).unwrap_err();
        assert_eq!(
            errors.first("capacity"),
            Some("13 students are already enrolled.")
        );
    }

    #[test]
    fn unknown_teacher_rejected() {
        let mut with_teacher = form();
        with_teacher.teacher = Uuid::new_v4().to_string();
        let errors = with_teacher.validate(&[], &[], 0).unwrap_err();
        assert_eq!(errors.first("teacher"), Some("Select a valid choice."));
    }

    #[test]
    fn blank_numbers_required() {
        let errors = CourseForm::default().validate(&[], &[], 0).unwrap_err();
        for field in ["course_code", "price", "duration", "capacity"] {
            assert_eq!(errors.first(field), Some(forms::REQUIRED), "{field}");
        }
    }
}
