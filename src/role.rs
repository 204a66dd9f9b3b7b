use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Role {
    Teacher,
    Manager,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Permission {
    ManageTeachers,
    ManageStudents,
    ManageCourses,
    ManageDepartments,
    ManageSkills,
    ManageLessons,
    TakeAttendance,
}

impl Role {
    /// Lesson and attendance permissions are further narrowed to a teacher's
    /// own courses by the handlers.
    #[must_use]
    pub const fn can(self, permission: Permission) -> bool {
        match self {
            Self::Manager => true,
            Self::Teacher => matches!(
                permission,
                Permission::ManageLessons | Permission::TakeAttendance
            ),
        }
    }

    #[must_use]
    pub const fn is_manager(self) -> bool {
        matches!(self, Self::Manager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Teacher => write!(f, "teacher"),
            Self::Manager => write!(f, "manager"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manager_can_everything() {
        for permission in [
            Permission::ManageTeachers,
            Permission::ManageStudents,
            Permission::ManageCourses,
            Permission::ManageDepartments,
            Permission::ManageSkills,
            Permission::ManageLessons,
            Permission::TakeAttendance,
        ] {
            assert!(Role::Manager.can(permission));
        }
    }

    #[test]
    fn teacher_limited_to_lessons() {
        assert!(Role::Teacher.can(Permission::ManageLessons));
        assert!(Role::Teacher.can(Permission::TakeAttendance));
        assert!(!Role::Teacher.can(Permission::ManageStudents));
        assert!(!Role::Teacher.can(Permission::ManageCourses));
        assert!(!Role::Teacher.can(Permission::ManageSkills));
    }
}
