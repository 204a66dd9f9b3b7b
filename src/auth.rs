use std::ops::Deref;

use askama::Template;
use axum::{
    Form, Router,
    extract::{FromRequestParts, State},
    http::{StatusCode, request::Parts},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    forms::{self, FormErrors},
    models::{Course, NewUser, User},
    role::{Permission, Role},
    state::AcademyState,
    templates::{LoginPage, RegisterPage},
};

const USER_ID_KEY: &str = "user_id";

pub struct AuthUser(pub User);

impl Deref for AuthUser {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AuthUser {
    pub fn require(&self, permission: Permission) -> AppResult<()> {
        if self.role.can(permission) {
            Ok(())
        } else {
            tracing::debug!(user = %self.username, ?permission, "permission denied");
            Err(AppError::Forbidden)
        }
    }

    /// Managers may act on every course, teachers only on their own.
    #[must_use]
    pub fn owns(&self, course: &Course) -> bool {
        self.role.is_manager() || course.teacher_id == Some(self.id)
    }

    /// Same as [`AuthUser::owns`] for a course known only by its teacher id.
    pub fn require_owner(&self, teacher_id: Option<Uuid>) -> AppResult<()> {
        if self.role.is_manager() || teacher_id == Some(self.id) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

impl FromRequestParts<AcademyState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AcademyState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let user_id = session
            .get::<Uuid>(USER_ID_KEY)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "unreadable session"))
            .map_err(|_| Redirect::to("/login").into_response())?
            .ok_or_else(|| Redirect::to("/login").into_response())?;

        let user = User::find(&state.db_pool, user_id)
            .await
            .map_err(|e| AppError::from(e).into_response())?
            .ok_or_else(|| Redirect::to("/login").into_response())?;

        Ok(Self(user))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

async fn login_page() -> AppResult<Html<String>> {
    Ok(Html(
        LoginPage {
            username: String::new(),
            errors: FormErrors::default(),
        }
        .render()?,
    ))
}

async fn login(
    State(state): State<AcademyState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let mut errors = FormErrors::default();
    let username = forms::required(&mut errors, "username", &form.username, 150);
    if form.password.is_empty() {
        errors.add("password", forms::REQUIRED);
    }

    if errors.is_empty() {
        if let Some(user) = User::authenticate(&state.db_pool, &username, &form.password).await? {
            session.cycle_id().await?;
            session.insert(USER_ID_KEY, user.id).await?;
            tracing::info!(user = %user.username, "logged in");
            return Ok(Redirect::to("/").into_response());
        }

        tracing::info!(%username, "failed login");
        errors.add_non_field(
            "Please enter a correct username and password. Note that both fields may be case-sensitive.",
        );
    }

    let page = LoginPage { username, errors };
    Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page.render()?)).into_response())
}

async fn logout(session: Session) -> AppResult<Redirect> {
    session.flush().await?;
    Ok(Redirect::to("/login"))
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

async fn register_page(State(state): State<AcademyState>) -> AppResult<Html<String>> {
    if !state.config.allow_registration {
        return Err(AppError::NotFound("page"));
    }

    Ok(Html(
        RegisterPage {
            form: RegisterForm::default(),
            errors: FormErrors::default(),
        }
        .render()?,
    ))
}

async fn register(
    State(state): State<AcademyState>,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    if !state.config.allow_registration {
        return Err(AppError::NotFound("page"));
    }

    let mut errors = FormErrors::default();
    let new = NewUser {
        username: forms::required(&mut errors, "username", &form.username, 150),
        password: form.password.clone(),
        first_name: forms::required(&mut errors, "first_name", &form.first_name, 100),
        last_name: forms::required(&mut errors, "last_name", &form.last_name, 100),
        email: forms::email(&mut errors, "email", &form.email),
        phone: String::new(),
        role: Role::Manager,
        department_id: None,
        skill_ids: Vec::new(),
    };

    if form.password.chars().count() < 8 {
        errors.add(
            "password",
            "This password is too short. It must contain at least 8 characters.",
        );
    }
    if form.password != form.password_confirm {
        errors.add("password_confirm", "The two password fields didn't match.");
    }
    if !errors.has("username") && User::username_taken(&state.db_pool, &new.username, None).await?
    {
        errors.add("username", "A user with that username already exists.");
    }

    if errors.is_empty() {
        User::create(&state.db_pool, &new, state.config.password_iterations).await?;
        return Ok(Redirect::to("/login").into_response());
    }

    let page = RegisterPage {
        form: RegisterForm {
            password: String::new(),
            password_confirm: String::new(),
            ..form
        },
        errors,
    };
    Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page.render()?)).into_response())
}

pub fn auth_router() -> Router<AcademyState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .route("/register", get(register_page).post(register))
}
