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
    models::{Department, NewDepartment},
    role::Permission,
    state::AcademyState,
    templates::{DepartmentFormPage, DepartmentListPage, Nav, unprocessable},
};

pub fn router() -> Router<AcademyState> {
    Router::new()
        .route("/departments", get(list))
        .route("/departments/add", get(add_page).post(add))
        .route("/departments/{id}/edit", get(edit_page).post(edit))
        .route("/departments/{id}/delete", post(delete))
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct DepartmentForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl DepartmentForm {
    fn validate(&self) -> Result<NewDepartment, FormErrors> {
        let mut errors = FormErrors::default();
        let new = NewDepartment {
            name: forms::required(&mut errors, "name", &self.name, 100),
            description: forms::optional(&mut errors, "description", &self.description, 2000),
        };
        errors.into_result(new)
    }
}

impl From<&Department> for DepartmentForm {
    fn from(department: &Department) -> Self {
        Self {
            name: department.name.clone(),
            description: department.description.clone(),
        }
    }
}

async fn list(auth: AuthUser, State(state): State<AcademyState>) -> AppResult<Html<String>> {
    let departments = Department::all(&state.db_pool).await?;

    Ok(Html(
        DepartmentListPage {
            nav: Nav::new(&auth),
            departments,
        }
        .render()?,
    ))
}

async fn add_page(auth: AuthUser) -> AppResult<Html<String>> {
    auth.require(Permission::ManageDepartments)?;

    Ok(Html(
        DepartmentFormPage {
            nav: Nav::new(&auth),
            editing: None,
            form: DepartmentForm::default(),
            errors: FormErrors::default(),
        }
        .render()?,
    ))
}

async fn add(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Form(form): Form<DepartmentForm>,
) -> AppResult<Response> {
    auth.require(Permission::ManageDepartments)?;

    match form.validate() {
        Ok(new) => {
            Department::create(&state.db_pool, &new).await?;
            Ok(Redirect::to("/departments").into_response())
        }
        Err(errors) => unprocessable(&DepartmentFormPage {
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
    auth.require(Permission::ManageDepartments)?;

    let department = Department::find(&state.db_pool, id)
        .await?
        .ok_or(AppError::NotFound("department"))?;

    Ok(Html(
        DepartmentFormPage {
            nav: Nav::new(&auth),
            editing: Some(id),
            form: DepartmentForm::from(&department),
            errors: FormErrors::default(),
        }
        .render()?,
    ))
}

async fn edit(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(id): Path<Uuid>,
    Form(form): Form<DepartmentForm>,
) -> AppResult<Response> {
    auth.require(Permission::ManageDepartments)?;

    Department::find(&state.db_pool, id)
        .await?
        .ok_or(AppError::NotFound("department"))?;

    match form.validate() {
        Ok(new) => {
            Department::update(&state.db_pool, id, &new).await?;
            Ok(Redirect::to("/departments").into_response())
        }
        Err(errors) => unprocessable(&DepartmentFormPage {
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
    auth.require(Permission::ManageDepartments)?;

    if !Department::delete(&state.db_pool, id).await? {
        return Err(AppError::NotFound("department"));
    }

    Ok(Redirect::to("/departments"))
}
