pub use course::{Course, NewCourse};
pub use department::{Department, NewDepartment};
pub use lesson::{Lesson, NewLesson};
pub use lesson_file::LessonFile;
pub use skill::Skill;
pub use student::{Gender, NewStudent, Student};
pub use user::{NewUser, User};

pub mod attendance;
mod course;
mod department;
mod lesson;
pub mod lesson_file;
pub mod like;
mod skill;
mod student;
mod user;
