use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    forms::{self, Choice, FormErrors, FormFields},
    models::{Course, Gender, NewStudent, Student, attendance::AttendanceStats},
    role::Permission,
    state::AcademyState,
    templates::{Nav, StudentFormPage, StudentListPage, StudentProfilePage, unprocessable},
};

pub fn router() -> Router<AcademyState> {
    Router::new()
        .route("/students", get(list))
        .route("/students/add", get(add_page).post(add))
        .route("/students/{id}", get(profile))
        .route("/students/{id}/edit", get(edit_page).post(edit))
        .route("/students/{id}/delete", post(delete))
}

#[derive(Debug, Default, Clone)]
pub struct StudentForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub gender: String,
    pub course_ids: Vec<String>,
}

impl StudentForm {
    fn from_fields(fields: &FormFields) -> Self {
        Self {
            first_name: fields.get("first_name").to_owned(),
            last_name: fields.get("last_name").to_owned(),
            email: fields.get("email").to_owned(),
            phone: fields.get("phone").to_owned(),
            gender: fields.get("gender").to_owned(),
            course_ids: fields.all("courses").map(str::to_owned).collect(),
        }
    }

    fn from_student(student: &Student, course_ids: &[Uuid]) -> Self {
        Self {
            first_name: student.first_name.clone(),
            last_name: student.last_name.clone(),
            email: student.email.clone(),
            phone: student.phone.clone(),
            gender: student.gender.as_str().to_owned(),
            course_ids: course_ids.iter().map(Uuid::to_string).collect(),
        }
    }

    /// A course the student is not already in must have a free seat.
    fn validate(&self, courses: &[Course], enrolled: &[Uuid]) -> Result<NewStudent, FormErrors> {
        let mut errors = FormErrors::default();

        let gender = match self.gender.trim() {
            "" => {
                errors.add("gender", forms::REQUIRED);
                None
            }
            value => Gender::parse(value).or_else(|| {
                errors.add("gender", "Select a valid choice.");
                None
            }),
        };

        let course_ids = forms::ids(&mut errors, "courses", self.course_ids.iter().map(String::as_str));
        for id in &course_ids {
            match courses.iter().find(|c| c.id == *id) {
                None => errors.add("courses", "Select a valid choice."),
                Some(course) if course.is_full() && !enrolled.contains(id) => {
                    errors.add("courses", format!("Course {} is full.", course.title()));
                }
                Some(_) => {}
            }
        }

        let new = NewStudent {
            first_name: forms::required(&mut errors, "first_name", &self.first_name, 100),
            last_name: forms::required(&mut errors, "last_name", &self.last_name, 100),
            email: forms::email(&mut errors, "email", &self.email),
            phone: forms::optional(&mut errors, "phone", &self.phone, 20),
            gender: gender.unwrap_or(Gender::Male),
            course_ids,
        };

        errors.into_result(new)
    }
}

async fn form_page(
    auth: &AuthUser,
    state: &AcademyState,
    editing: Option<Uuid>,
    form: StudentForm,
    errors: FormErrors,
) -> AppResult<StudentFormPage> {
    let courses = Course::all(&state.db_pool).await?;

    Ok(StudentFormPage {
        nav: Nav::new(auth),
        editing,
        genders: Gender::ALL
            .iter()
            .map(|g| Choice::new(g.as_str(), g.to_string(), form.gender == g.as_str()))
            .collect(),
        courses: courses
            .iter()
            .map(|c| {
                let value = c.id.to_string();
                let selected = form.course_ids.contains(&value);
                Choice::new(value, format!("{} ({})", c.title(), c.course_code), selected)
            })
            .collect(),
        form,
        errors,
    })
}

/// Teachers see the students enrolled in their own courses.
async fn list(auth: AuthUser, State(state): State<AcademyState>) -> AppResult<Html<String>> {
    let students = if auth.role.is_manager() {
        Student::all(&state.db_pool).await?
    } else {
        Student::for_teacher(&state.db_pool, auth.id).await?
    };

    Ok(Html(
        StudentListPage {
            nav: Nav::new(&auth),
            students,
        }
        .render()?,
    ))
}

async fn profile(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(id): Path<Uuid>,
) -> AppResult<Html<String>> {
    let student = Student::find(&state.db_pool, id)
        .await?
        .ok_or(AppError::NotFound("student"))?;

    let courses = Course::for_student(&state.db_pool, id).await?;
    if !auth.role.is_manager() && !courses.iter().any(|c| auth.owns(c)) {
        return Err(AppError::Forbidden);
    }

    let stats = AttendanceStats::for_student(&state.db_pool, id).await?;

    Ok(Html(
        StudentProfilePage {
            nav: Nav::new(&auth),
            student,
            courses,
            stats,
        }
        .render()?,
    ))
}

async fn add_page(auth: AuthUser, State(state): State<AcademyState>) -> AppResult<Html<String>> {
    auth.require(Permission::ManageStudents)?;

    let page = form_page(
        &auth,
        &state,
        None,
        StudentForm::default(),
        FormErrors::default(),
    )
    .await?;

    Ok(Html(page.render()?))
}

async fn add(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Form(fields): Form<FormFields>,
) -> AppResult<Response> {
    auth.require(Permission::ManageStudents)?;

    let form = StudentForm::from_fields(&fields);
    let courses = Course::all(&state.db_pool).await?;

    match form.validate(&courses, &[]) {
        Ok(new) => {
            let id = Student::create(&state.db_pool, &new).await?;
            tracing::info!(%id, by = %auth.username, "added student");
            Ok(Redirect::to("/students").into_response())
        }
        Err(errors) => unprocessable(&form_page(&auth, &state, None, form, errors).await?),
    }
}

async fn edit_page(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(id): Path<Uuid>,
) -> AppResult<Html<String>> {
    auth.require(Permission::ManageStudents)?;

    let student = Student::find(&state.db_pool, id)
        .await?
        .ok_or(AppError::NotFound("student"))?;
    let course_ids = Student::course_ids(&state.db_pool, id).await?;

    let form = StudentForm::from_student(&student, &course_ids);
    let page = form_page(&auth, &state, Some(id), form, FormErrors::default()).await?;

    Ok(Html(page.render()?))
}

async fn edit(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(id): Path<Uuid>,
    Form(fields): Form<FormFields>,
) -> AppResult<Response> {
    auth.require(Permission::ManageStudents)?;

    Student::find(&state.db_pool, id)
        .await?
        .ok_or(AppError::NotFound("student"))?;

    let form = StudentForm::from_fields(&fields);
    let courses = Course::all(&state.db_pool).await?;
    let enrolled = Student::course_ids(&state.db_pool, id).await?;

    match form.validate(&courses, &enrolled) {
        Ok(new) => {
            Student::update(&state.db_pool, id, &new).await?;
            Ok(Redirect::to(&format!("/students/{id}")).into_response())
        }
        Err(errors) => unprocessable(&form_page(&auth, &state, Some(id), form, errors).await?),
    }
}

async fn delete(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(id): Path<Uuid>,
) -> AppResult<Redirect> {
    auth.require(Permission::ManageStudents)?;

    if !Student::delete(&state.db_pool, id).await? {
        return Err(AppError::NotFound("student"));
    }
    tracing::info!(%id, by = %auth.username, "deleted student");

    Ok(Redirect::to("/students"))
}
