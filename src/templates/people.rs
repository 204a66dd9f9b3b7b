use askama::Template;
use uuid::Uuid;

use super::Nav;
use crate::{
    forms::{Choice, FormErrors},
    models::{Course, Skill, Student, User, attendance::AttendanceStats},
    routes::{professors::ProfessorForm, students::StudentForm},
};

#[derive(Template)]
#[template(path = "professors/list.html")]
pub struct ProfessorListPage {
    pub nav: Nav,
    pub teachers: Vec<User>,
}

#[derive(Template)]
#[template(path = "professors/profile.html")]
pub struct ProfessorProfilePage {
    pub nav: Nav,
    pub teacher: User,
    pub skills: Vec<Skill>,
    pub courses: Vec<Course>,
}

#[derive(Template)]
#[template(path = "professors/form.html")]
pub struct ProfessorFormPage {
    pub nav: Nav,
    pub editing: Option<Uuid>,
    pub form: ProfessorForm,
    pub departments: Vec<Choice>,
    pub skills: Vec<Choice>,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "students/list.html")]
pub struct StudentListPage {
    pub nav: Nav,
    pub students: Vec<Student>,
}

#[derive(Template)]
#[template(path = "students/profile.html")]
pub struct StudentProfilePage {
    pub nav: Nav,
    pub student: Student,
    pub courses: Vec<Course>,
    pub stats: AttendanceStats,
}

#[derive(Template)]
#[template(path = "students/form.html")]
pub struct StudentFormPage {
    pub nav: Nav,
    pub editing: Option<Uuid>,
    pub form: StudentForm,
    pub genders: Vec<Choice>,
    pub courses: Vec<Choice>,
    pub errors: FormErrors,
}
