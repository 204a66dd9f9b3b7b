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
    models::{Course, Department, NewUser, Skill, User},
    role::{Permission, Role},
    state::AcademyState,
    templates::{Nav, ProfessorFormPage, ProfessorListPage, ProfessorProfilePage, unprocessable},
};

pub fn router() -> Router<AcademyState> {
    Router::new()
        .route("/professors", get(list))
        .route("/professors/add", get(add_page).post(add))
        .route("/professors/{id}", get(profile))
        .route("/professors/{id}/edit", get(edit_page).post(edit))
        .route("/professors/{id}/delete", post(delete))
}

/// Submitted or prefilled values of the teacher form. Skills are a checkbox
/// group, so this is read from [`FormFields`] rather than derived.
#[derive(Debug, Default, Clone)]
pub struct ProfessorForm {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub department_id: String,
    pub skill_ids: Vec<String>,
    password: String,
}

impl ProfessorForm {
    fn from_fields(fields: &FormFields) -> Self {
        Self {
            username: fields.get("username").to_owned(),
            first_name: fields.get("first_name").to_owned(),
            last_name: fields.get("last_name").to_owned(),
            email: fields.get("email").to_owned(),
            phone: fields.get("phone").to_owned(),
            department_id: fields.get("department").to_owned(),
            skill_ids: fields.all("skills").map(str::to_owned).collect(),
            password: fields.get("password").to_owned(),
        }
    }

    fn from_user(user: &User, skill_ids: &[Uuid]) -> Self {
        Self {
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            department_id: user
                .department_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            skill_ids: skill_ids.iter().map(Uuid::to_string).collect(),
            password: String::new(),
        }
    }

    /// Password is required for a new teacher; on edit an empty one keeps the
    /// current password.
    async fn validate(
        &self,
        state: &AcademyState,
        editing: Option<Uuid>,
        departments: &[Department],
        skills: &[Skill],
    ) -> AppResult<Result<NewUser, FormErrors>> {
        let mut errors = FormErrors::default();

        let department_id = forms::optional_id(&mut errors, "department", &self.department_id);
        if let Some(id) = department_id
            && !departments.iter().any(|d| d.id == id)
        {
            errors.add("department", "Select a valid choice.");
        }

        let skill_ids = forms::ids(&mut errors, "skills", self.skill_ids.iter().map(String::as_str));
        if skill_ids.iter().any(|id| !skills.iter().any(|s| s.id == *id)) {
            errors.add("skills", "Select a valid choice.");
        }

        if self.password.is_empty() {
            if editing.is_none() {
                errors.add("password", forms::REQUIRED);
            }
        } else if self.password.chars().count() < 8 {
            errors.add(
                "password",
                "This password is too short. It must contain at least 8 characters.",
            );
        }

        let new = NewUser {
            username: forms::required(&mut errors, "username", &self.username, 150),
            password: self.password.clone(),
            first_name: forms::required(&mut errors, "first_name", &self.first_name, 100),
            last_name: forms::required(&mut errors, "last_name", &self.last_name, 100),
            email: forms::email(&mut errors, "email", &self.email),
            phone: forms::optional(&mut errors, "phone", &self.phone, 20),
            role: Role::Teacher,
            department_id,
            skill_ids,
        };

        if !errors.has("username")
            && User::username_taken(&state.db_pool, &new.username, editing).await?
        {
            errors.add("username", "A user with that username already exists.");
        }

        Ok(errors.into_result(new))
    }
}

async fn form_page(
    auth: &AuthUser,
    state: &AcademyState,
    editing: Option<Uuid>,
    form: ProfessorForm,
    errors: FormErrors,
) -> AppResult<ProfessorFormPage> {
    let departments = Department::all(&state.db_pool).await?;
    let skills = Skill::all(&state.db_pool).await?;

    Ok(ProfessorFormPage {
        nav: Nav::new(auth),
        editing,
        departments: departments
            .iter()
            .map(|d| {
                let value = d.id.to_string();
                let selected = value == form.department_id;
                Choice::new(value, d.name.clone(), selected)
            })
            .collect(),
        skills: skills
            .iter()
            .map(|s| {
                let value = s.id.to_string();
                let selected = form.skill_ids.contains(&value);
                Choice::new(value, s.name.clone(), selected)
            })
            .collect(),
        form,
        errors,
    })
}

async fn list(auth: AuthUser, State(state): State<AcademyState>) -> AppResult<Html<String>> {
    let teachers = User::teachers(&state.db_pool).await?;

    Ok(Html(
        ProfessorListPage {
            nav: Nav::new(&auth),
            teachers,
        }
        .render()?,
    ))
}

async fn profile(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(id): Path<Uuid>,
) -> AppResult<Html<String>> {
    let teacher = User::find_teacher(&state.db_pool, id)
        .await?
        .ok_or(AppError::NotFound("teacher"))?;

    let skills = Skill::for_teacher(&state.db_pool, id).await?;
    let courses = Course::for_teacher(&state.db_pool, id).await?;

    Ok(Html(
        ProfessorProfilePage {
            nav: Nav::new(&auth),
            teacher,
            skills,
            courses,
        }
        .render()?,
    ))
}

async fn add_page(auth: AuthUser, State(state): State<AcademyState>) -> AppResult<Html<String>> {
    auth.require(Permission::ManageTeachers)?;

    let page = form_page(
        &auth,
        &state,
        None,
        ProfessorForm::default(),
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
    auth.require(Permission::ManageTeachers)?;

    let form = ProfessorForm::from_fields(&fields);
    let departments = Department::all(&state.db_pool).await?;
    let skills = Skill::all(&state.db_pool).await?;

    match form.validate(&state, None, &departments, &skills).await? {
        Ok(new) => {
            let id = User::create(&state.db_pool, &new, state.config.password_iterations).await?;
            Ok(Redirect::to(&format!("/professors/{id}")).into_response())
        }
        Err(errors) => {
            let form = ProfessorForm {
                password: String::new(),
                ..form
            };
            unprocessable(&form_page(&auth, &state, None, form, errors).await?)
        }
    }
}

async fn edit_page(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(id): Path<Uuid>,
) -> AppResult<Html<String>> {
    auth.require(Permission::ManageTeachers)?;

    let teacher = User::find_teacher(&state.db_pool, id)
        .await?
        .ok_or(AppError::NotFound("teacher"))?;
    let skill_ids = User::skill_ids(&state.db_pool, id).await?;

    let form = ProfessorForm::from_user(&teacher, &skill_ids);
    let page = form_page(&auth, &state, Some(id), form, FormErrors::default()).await?;

    Ok(Html(page.render()?))
}

async fn edit(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(id): Path<Uuid>,
    Form(fields): Form<FormFields>,
) -> AppResult<Response> {
    auth.require(Permission::ManageTeachers)?;

    User::find_teacher(&state.db_pool, id)
        .await?
        .ok_or(AppError::NotFound("teacher"))?;

    let form = ProfessorForm::from_fields(&fields);
    let departments = Department::all(&state.db_pool).await?;
    let skills = Skill::all(&state.db_pool).await?;

    match form.validate(&state, Some(id), &departments, &skills).await? {
        Ok(new) => {
            User::update(&state.db_pool, id, &new, state.config.password_iterations).await?;
            Ok(Redirect::to(&format!("/professors/{id}")).into_response())
        }
        Err(errors) => {
            let form = ProfessorForm {
                password: String::new(),
                ..form
            };
            unprocessable(&form_page(&auth, &state, Some(id), form, errors).await?)
        }
    }
}

/// Courses taught by the teacher stay, without a teacher.
async fn delete(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(id): Path<Uuid>,
) -> AppResult<Redirect> {
    auth.require(Permission::ManageTeachers)?;

    User::find_teacher(&state.db_pool, id)
        .await?
        .ok_or(AppError::NotFound("teacher"))?;

    User::delete(&state.db_pool, id).await?;
    tracing::info!(%id, by = %auth.username, "deleted teacher");

    Ok(Redirect::to("/professors"))
}
