use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::{
    auth::{AuthUser, RegisterForm},
    error::AppResult,
    forms::FormErrors,
    models::{Department, Student},
};

mod catalog;
mod course;
mod people;

pub use catalog::{DepartmentFormPage, DepartmentListPage, SkillFormPage, SkillListPage};
pub use course::{
    AttendancePage, CourseAboutPage, CourseFormPage, CourseLessonsPage, CourseListPage,
    LessonFormPage, LessonListPage, SheetRow,
};
pub use people::{
    ProfessorFormPage, ProfessorListPage, ProfessorProfilePage, StudentFormPage,
    StudentListPage, StudentProfilePage,
};

/// Header data every logged-in page renders.
#[derive(Debug, Clone)]
pub struct Nav {
    pub user_name: String,
    pub is_manager: bool,
}

impl Nav {
    pub fn new(auth: &AuthUser) -> Self {
        Self {
            user_name: auth.full_name(),
            is_manager: auth.role.is_manager(),
        }
    }
}

/// Renders a form page that failed validation.
pub fn unprocessable<T: Template>(page: &T) -> AppResult<Response> {
    Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page.render()?)).into_response())
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub username: String,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterPage {
    pub form: RegisterForm,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct HomePage {
    pub nav: Nav,
    pub new_students: Vec<Student>,
    pub total_students: i64,
    pub departments: Vec<Department>,
}
