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
    forms::{self, FormErrors},
    models::Skill,
    role::Permission,
    state::AcademyState,
    templates::{Nav, SkillFormPage, SkillListPage, unprocessable},
};

pub fn router() -> Router<AcademyState> {
    Router::new()
        .route("/skills", get(list))
        .route("/skills/add", get(add_page).post(add))
        .route("/skills/{id}/edit", get(edit_page).post(edit))
        .route("/skills/{id}/delete", post(delete))
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SkillForm {
    #[serde(default)]
    pub name: String,
}

impl SkillForm {
    async fn validate(&self, state: &AcademyState, except: Option<Uuid>) -> AppResult<Result<String, FormErrors>> {
        let mut errors = FormErrors::default();
        let name = forms::required(&mut errors, "name", &self.name, 100);

        if errors.is_empty() && Skill::name_taken(&state.db_pool, &name, except).await? {
            errors.add("name", "Skill with this name already exists.");
        }

        Ok(errors.into_result(name))
    }
}

async fn list(auth: AuthUser, State(state): State<AcademyState>) -> AppResult<Html<String>> {
    let skills = Skill::all(&state.db_pool).await?;

    Ok(Html(
        SkillListPage {
            nav: Nav::new(&auth),
            skills,
        }
        .render()?,
    ))
}

async fn add_page(auth: AuthUser) -> AppResult<Html<String>> {
    auth.require(Permission::ManageSkills)?;

    Ok(Html(
        SkillFormPage {
            nav: Nav::new(&auth),
            editing: None,
            form: SkillForm::default(),
            errors: FormErrors::default(),
        }
        .render()?,
    ))
}

async fn add(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Form(form): Form<SkillForm>,
) -> AppResult<Response> {
    auth.require(Permission::ManageSkills)?;

    match form.validate(&state, None).await? {
        Ok(name) => {
            Skill::create(&state.db_pool, &name).await?;
            Ok(Redirect::to("/skills").into_response())
        }
        Err(errors) => unprocessable(&SkillFormPage {
            nav: Nav::new(&auth),
            editing: None,
            form,
            errors,
        }),
    }
}

async fn edit_page(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(id): Path<Uuid>,
) -> AppResult<Html<String>> {
    auth.require(Permission::ManageSkills)?;

    let skill = Skill::find(&state.db_pool, id)
        .await?
        .ok_or(AppError::NotFound("skill"))?;

    Ok(Html(
        SkillFormPage {
            nav: Nav::new(&auth),
            editing: Some(id),
            form: SkillForm { name: skill.name },
            errors: FormErrors::default(),
        }
        .render()?,
    ))
}

async fn edit(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(id): Path<Uuid>,
    Form(form): Form<SkillForm>,
) -> AppResult<Response> {
    auth.require(Permission::ManageSkills)?;

    Skill::find(&state.db_pool, id)
        .await?
        .ok_or(AppError::NotFound("skill"))?;

    match form.validate(&state, Some(id)).await? {
        Ok(name) => {
            Skill::rename(&state.db_pool, id, &name).await?;
            Ok(Redirect::to("/skills").into_response())
        }
        Err(errors) => unprocessable(&SkillFormPage {
            nav: Nav::new(&auth),
            editing: Some(id),
            form,
            errors,
        }),
    }
}

async fn delete(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(id): Path<Uuid>,
) -> AppResult<Redirect> {
    auth.require(Permission::ManageSkills)?;

    if !Skill::delete(&state.db_pool, id).await? {
        return Err(AppError::NotFound("skill"));
    }

    Ok(Redirect::to("/skills"))
}
