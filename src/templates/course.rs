use askama::Template;
use uuid::Uuid;

use super::Nav;
use crate::{
    filters,
    forms::{Choice, FormErrors},
    models::{Course, Lesson, LessonFile, attendance},
    routes::{courses::CourseForm, lessons::LessonForm},
};

#[derive(Template)]
#[template(path = "courses/list.html")]
pub struct CourseListPage {
    pub nav: Nav,
    pub courses: Vec<Course>,
}

#[derive(Template)]
#[template(path = "courses/about.html")]
pub struct CourseAboutPage {
    pub nav: Nav,
    pub course: Course,
    pub others: Vec<Course>,
    pub liked: bool,
}

#[derive(Template)]
#[template(path = "courses/lessons.html")]
pub struct CourseLessonsPage {
    pub nav: Nav,
    pub course: Course,
    pub lessons: Vec<Lesson>,
}

#[derive(Template)]
#[template(path = "courses/form.html")]
pub struct CourseFormPage {
    pub nav: Nav,
    pub editing: Option<Uuid>,
    pub form: CourseForm,
    pub departments: Vec<Choice>,
    pub teachers: Vec<Choice>,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "lessons/list.html")]
pub struct LessonListPage {
    pub nav: Nav,
    pub lessons: Vec<Lesson>,
}

#[derive(Template)]
#[template(path = "lessons/form.html")]
pub struct LessonFormPage {
    pub nav: Nav,
    pub editing: Option<Uuid>,
    pub form: LessonForm,
    pub courses: Vec<Choice>,
    pub files: Vec<LessonFile>,
    pub errors: FormErrors,
}

/// One student's line on the attendance form.
#[derive(Debug, Clone)]
pub struct SheetRow {
    pub student_id: Uuid,
    pub student_name: String,
    pub mark: String,
    pub present: bool,
    pub error: Option<String>,
}

impl SheetRow {
    pub fn mark_field(&self) -> String {
        attendance::mark_field(self.student_id)
    }

    pub fn present_field(&self) -> String {
        attendance::present_field(self.student_id)
    }
}

#[derive(Template)]
#[template(path = "attendance.html")]
pub struct AttendancePage {
    pub nav: Nav,
    pub lesson: Lesson,
    pub rows: Vec<SheetRow>,
    pub errors: FormErrors,
}
