//! Per-lesson attendance and marks.
//!
//! Every enrolled student of a lesson's course gets exactly one
//! `score_attendance` row, created lazily when the sheet is opened. The
//! `(lesson_id, student_id)` unique index is what keeps concurrent openings
//! from duplicating rows.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::forms::{self, FormErrors, FormFields};

pub const MARK_RANGE: std::ops::RangeInclusive<i64> = 0..=100;

/// One line of a lesson's attendance sheet.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct AttendanceRow {
    pub id: Uuid,
    pub student_id: Uuid,
    pub first_name: String,
    pub last_name: String,

    pub mark: Option<i64>,
    /// `None` until the sheet is first submitted.
    pub is_present: Option<bool>,
}

impl AttendanceRow {
    #[must_use]
    pub fn student_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A validated change to one student's row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceUpdate {
    pub student_id: Uuid,
    pub mark: Option<i64>,
    pub is_present: bool,
}

/// Creates the missing rows for `lesson_id` and returns how many were
/// inserted. Calling it again is a no-op.
///
/// Kept to one write statement: concurrent callers then wait on the busy
/// timeout for the write lock instead of failing with `SQLITE_BUSY`.
pub async fn ensure_for_lesson(db: &SqlitePool, lesson_id: Uuid) -> sqlx::Result<u64> {
    let created = sqlx::query(
        "INSERT INTO score_attendance (id, lesson_id, student_id)
        SELECT randomblob(16), l.id, sc.student_id
        FROM lessons l
        JOIN student_courses sc ON sc.course_id = l.course_id
        WHERE l.id = ?
        ON CONFLICT (lesson_id, student_id) DO NOTHING",
    )
    .bind(lesson_id)
    .execute(db)
    .await?
    .rows_affected();

    if created > 0 {
        tracing::debug!(%lesson_id, created, "initialized attendance rows");
    }

    Ok(created)
}

/// Rows of the students currently enrolled in the lesson's course, by name.
pub async fn sheet(db: &SqlitePool, lesson_id: Uuid) -> sqlx::Result<Vec<AttendanceRow>> {
    sqlx::query_as(
        "SELECT sa.id, sa.student_id, s.first_name, s.last_name, sa.mark, sa.is_present
        FROM score_attendance sa
        JOIN students s ON s.id = sa.student_id
        JOIN lessons l ON l.id = sa.lesson_id
        JOIN student_courses sc ON sc.student_id = sa.student_id AND sc.course_id = l.course_id
        WHERE sa.lesson_id = ?
        ORDER BY s.last_name, s.first_name",
    )
    .bind(lesson_id)
    .fetch_all(db)
    .await
}

/// Field name carrying a row's mark.
#[must_use]
pub fn mark_field(student_id: Uuid) -> String {
    format!("mark.{student_id}")
}

/// Checkbox name for a row's presence.
#[must_use]
pub fn present_field(student_id: Uuid) -> String {
    format!("present.{student_id}")
}

/// Reads a submitted sheet. Each `row` value names a student; that
/// student's mark and presence come from fields keyed by the same id, so the
/// order of rows in the submission is irrelevant.
///
/// The batch is rejected as a whole when any row is invalid or names a
/// student who is not on `sheet`.
pub fn parse_submission(
    fields: &FormFields,
    sheet: &[AttendanceRow],
) -> Result<Vec<AttendanceUpdate>, FormErrors> {
    let mut errors = FormErrors::default();
    let on_sheet: HashSet<Uuid> = sheet.iter().map(|row| row.student_id).collect();

    let mut rows = BTreeSet::new();
    for value in fields.all("row") {
        match Uuid::parse_str(value.trim()) {
            Ok(id) if on_sheet.contains(&id) => {
                rows.insert(id);
            }
            _ => errors.add_non_field(
                "The sheet lists a student who is not enrolled in this course. Reload the page.",
            ),
        }
    }

    for (key, _) in fields.iter() {
        let Some(id) = key
            .strip_prefix("mark.")
            .or_else(|| key.strip_prefix("present."))
        else {
            continue;
        };
        let known = Uuid::parse_str(id).is_ok_and(|id| rows.contains(&id));
        if !known {
            errors.add_non_field("The submission contains a value for an unknown row.");
        }
    }

    let updates = rows
        .iter()
        .map(|&student_id| AttendanceUpdate {
            student_id,
            mark: forms::optional_integer(
                &mut errors,
                &mark_field(student_id),
                fields.get(&mark_field(student_id)),
                MARK_RANGE,
            ),
            is_present: fields.contains(&present_field(student_id)),
        })
        .collect();

    errors.into_result(updates)
}

/// Applies every update in one transaction.
pub async fn save(
    db: &SqlitePool,
    lesson_id: Uuid,
    updates: &[AttendanceUpdate],
) -> sqlx::Result<()> {
    let mut tx = db.begin().await?;

    for update in updates {
        sqlx::query(
            "UPDATE score_attendance SET mark = ?, is_present = ?
            WHERE lesson_id = ? AND student_id = ?",
        )
        .bind(update.mark)
        .bind(update.is_present)
        .bind(lesson_id)
        .bind(update.student_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(%lesson_id, rows = updates.len(), "saved attendance");

    Ok(())
}

/// Attendance totals of one student across all recorded lessons.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AttendanceStats {
    recorded: i64,
    present: i64,
    average_mark: Option<f64>,
}

impl AttendanceStats {
    #[must_use]
    pub const fn new(recorded: i64, present: i64, average_mark: Option<f64>) -> Self {
        Self {
            recorded,
            present,
            average_mark,
        }
    }

    pub async fn for_student(db: &SqlitePool, student_id: Uuid) -> sqlx::Result<Self> {
        let (recorded, present, average_mark): (i64, i64, Option<f64>) = sqlx::query_as(
            "SELECT
                COUNT(is_present),
                COALESCE(SUM(CASE WHEN is_present THEN 1 ELSE 0 END), 0),
                AVG(mark)
            FROM score_attendance WHERE student_id = ?",
        )
        .bind(student_id)
        .fetch_one(db)
        .await?;

        Ok(Self::new(recorded, present, average_mark))
    }

    #[must_use]
    pub const fn recorded(&self) -> i64 {
        self.recorded
    }

    #[must_use]
    pub const fn present(&self) -> i64 {
        self.present
    }

    #[must_use]
    pub fn average_mark(&self) -> Option<String> {
        self.average_mark.map(|avg| format!("{avg:.1}"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{
        Course, Gender, Lesson, NewCourse, NewLesson, NewStudent, Student, testing::memory_pool,
    };

    async fn lesson_with_students(db: &SqlitePool, count: usize) -> (Uuid, Uuid) {
        let course_id = Course::create(
            db,
            &NewCourse {
                department_id: None,
                course_code: "MATH-7".to_owned(),
                teacher_id: None,
                price: 0,
                duration: 3,
                capacity: 30,
                about_course: String::new(),
                course_info: String::new(),
            },
        )
        .await
        .unwrap();

        for n in 0..count {
            Student::create(
                db,
                &NewStudent {
                    first_name: format!("Student{n}"),
                    last_name: "Rahimov".to_owned(),
                    email: String::new(),
                    phone: String::new(),
                    gender: Gender::Female,
                    course_ids: vec![course_id],
                },
            )
            .await
            .unwrap();
        }

        let lesson_id = Lesson::create(
            db,
            &NewLesson {
                course_id,
                theme: "Fractions".to_owned(),
                date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            },
        )
        .await
        .unwrap();

        (course_id, lesson_id)
    }

    async fn row_count(db: &SqlitePool, lesson_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM score_attendance WHERE lesson_id = ?")
            .bind(lesson_id)
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn initializes_one_row_per_enrolled_student() {
        let db = memory_pool().await;
        let (_, lesson_id) = lesson_with_students(&db, 3).await;

        assert_eq!(ensure_for_lesson(&db, lesson_id).await.unwrap(), 3);
        assert_eq!(ensure_for_lesson(&db, lesson_id).await.unwrap(), 0);
        assert_eq!(row_count(&db, lesson_id).await, 3);

        let rows = sheet(&db, lesson_id).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.mark.is_none() && r.is_present.is_none()));
    }

    #[tokio::test]
    async fn picks_up_late_enrolments() {
        let db = memory_pool().await;
        let (course_id, lesson_id) = lesson_with_students(&db, 2).await;
        ensure_for_lesson(&db, lesson_id).await.unwrap();

        Student::create(
            &db,
            &NewStudent {
                first_name: "Late".to_owned(),
                last_name: "Comer".to_owned(),
                email: String::new(),
                phone: String::new(),
                gender: Gender::Male,
                course_ids: vec![course_id],
            },
        )
        .await
        .unwrap();

        assert_eq!(ensure_for_lesson(&db, lesson_id).await.unwrap(), 1);
        assert_eq!(row_count(&db, lesson_id).await, 3);
    }

    #[tokio::test]
    async fn save_updates_rows_and_stats() {
        let db = memory_pool().await;
        let (_, lesson_id) = lesson_with_students(&db, 2).await;
        ensure_for_lesson(&db, lesson_id).await.unwrap();
        let rows = sheet(&db, lesson_id).await.unwrap();

        let updates: Vec<_> = rows
            .iter()
            .map(|r| AttendanceUpdate {
                student_id: r.student_id,
                mark: Some(90),
                is_present: true,
            })
            .collect();
        save(&db, lesson_id, &updates).await.unwrap();

        let saved = sheet(&db, lesson_id).await.unwrap();
        assert!(saved.iter().all(|r| r.mark == Some(90) && r.is_present == Some(true)));

        let stats = AttendanceStats::for_student(&db, rows[0].student_id)
            .await
            .unwrap();
        assert_eq!(stats.recorded(), 1);
        assert_eq!(stats.present(), 1);
        assert_eq!(stats.average_mark().as_deref(), Some("90.0"));
    }

    #[tokio::test]
    async fn lesson_without_course_has_empty_sheet() {
        let db = memory_pool().await;
        let (course_id, lesson_id) = lesson_with_students(&db, 2).await;
        Course::delete(&db, course_id).await.unwrap();

        let lesson = Lesson::find(&db, lesson_id).await.unwrap().unwrap();
        assert!(lesson.course_id.is_none());
        assert_eq!(ensure_for_lesson(&db, lesson_id).await.unwrap(), 0);
        assert!(sheet(&db, lesson_id).await.unwrap().is_empty());
    }

    fn row(first_name: &str) -> AttendanceRow {
        AttendanceRow {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            first_name: first_name.to_owned(),
            last_name: "Test".to_owned(),
            mark: None,
            is_present: None,
        }
    }

    #[test]
    fn pairs_by_student_id_not_position() {
        let sheet = vec![row("Ali"), row("Vali")];
        let (ali, vali) = (sheet[0].student_id, sheet[1].student_id);

        // submitted in the opposite order to the sheet
        let fields: FormFields = [
            ("row".to_owned(), vali.to_string()),
            (mark_field(vali), "80".to_owned()),
            (present_field(vali), "on".to_owned()),
            ("row".to_owned(), ali.to_string()),
            (mark_field(ali), String::new()),
        ]
        .into_iter()
        .collect();

        let updates = parse_submission(&fields, &sheet).unwrap();
        let get = |id| updates.iter().find(|u| u.student_id == id).copied().unwrap();

        assert_eq!(updates.len(), 2);
        assert_eq!(get(vali).mark, Some(80));
        assert!(get(vali).is_present);
        assert_eq!(get(ali).mark, None);
        assert!(!get(ali).is_present);
    }

    #[test]
    fn rejects_whole_batch_on_bad_mark() {
        let sheet = vec![row("Ali"), row("Vali")];
        let (ali, vali) = (sheet[0].student_id, sheet[1].student_id);

        let fields: FormFields = [
            ("row".to_owned(), ali.to_string()),
            (mark_field(ali), "90".to_owned()),
            ("row".to_owned(), vali.to_string()),
            (mark_field(vali), "101".to_owned()),
        ]
        .into_iter()
        .collect();

        let errors = parse_submission(&fields, &sheet).unwrap_err();
        assert!(errors.has(&mark_field(vali)));
        assert!(!errors.has(&mark_field(ali)));
    }

    #[test]
    fn rejects_students_not_on_sheet() {
        let sheet = vec![row("Ali")];
        let stranger = Uuid::new_v4();

        let fields: FormFields = [
            ("row".to_owned(), stranger.to_string()),
            (mark_field(stranger), "50".to_owned()),
        ]
        .into_iter()
        .collect();

        let errors = parse_submission(&fields, &sheet).unwrap_err();
        assert!(errors.non_field().is_some());
    }

    #[test]
    fn rejects_values_without_row() {
        let sheet = vec![row("Ali")];
        let ali = sheet[0].student_id;

        let fields: FormFields = [(mark_field(ali), "50".to_owned())].into_iter().collect();

        assert!(parse_submission(&fields, &sheet).is_err());
    }

    #[test]
    fn stats_format_average() {
        let stats = AttendanceStats::new(4, 3, Some(72.5));
        assert_eq!(stats.average_mark().as_deref(), Some("72.5"));
        assert_eq!(AttendanceStats::default().average_mark(), None);
    }
}
