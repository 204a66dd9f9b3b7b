use askama::Template;
use uuid::Uuid;

use super::Nav;
use crate::{
    forms::FormErrors,
    models::{Department, Skill},
    routes::{departments::DepartmentForm, skills::SkillForm},
};

#[derive(Template)]
#[template(path = "departments/list.html")]
pub struct DepartmentListPage {
    pub nav: Nav,
    pub departments: Vec<Department>,
}

#[derive(Template)]
#[template(path = "departments/form.html")]
pub struct DepartmentFormPage {
    pub nav: Nav,
    pub editing: Option<Uuid>,
    pub form: DepartmentForm,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "skills/list.html")]
pub struct SkillListPage {
    pub nav: Nav,
    pub skills: Vec<Skill>,
}

#[derive(Template)]
#[template(path = "skills/form.html")]
pub struct SkillFormPage {
    pub nav: Nav,
    pub editing: Option<Uuid>,
    pub form: SkillForm,
    pub errors: FormErrors,
}
