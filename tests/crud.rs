mod common;

use academy::models::{Course, Lesson, LessonFile, Student};
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{TestApp, body_string, location};
use uuid::Uuid;

#[tokio::test]
async fn manager_adds_course() {
    let app = TestApp::spawn().await;
    let cookie = app.login_admin().await;

    let response = app
        .post_form(
            "/courses/add",
            &cookie,
            "course_code=PY-1&price=400000&duration=6&capacity=12&about_course=%23+Python",
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let courses = Course::all(&app.state.db_pool).await.unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(location(&response), format!("/courses/{}", courses[0].id));

    let page = body_string(app.get(location(&response), Some(&cookie)).await).await;
    assert!(page.contains("<h1>Python</h1>"));
}

#[tokio::test]
async fn student_form_reports_missing_fields() {
    let app = TestApp::spawn().await;
    let cookie = app.login_admin().await;

    let response = app
        .post_form("/students/add", &cookie, "last_name=Hopper&gender=female")
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let page = body_string(response).await;
    assert!(page.contains("This field is required."));
    assert!(page.contains("value=\"Hopper\""));

    assert_eq!(Student::count(&app.state.db_pool).await.unwrap(), 0);
}

#[tokio::test]
async fn full_course_refuses_enrolment() {
    let app = TestApp::spawn().await;
    let course = app.course("JS-1", None).await;
    sqlx::query("UPDATE courses SET capacity = 1 WHERE id = ?")
        .bind(course)
        .execute(&app.state.db_pool)
        .await
        .unwrap();
    app.student("Ada", vec![course]).await;
    let cookie = app.login_admin().await;

    let response = app
        .post_form(
            "/students/add",
            &cookie,
            &format!("first_name=Grace&last_name=Hopper&gender=female&courses={course}"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_string(response).await.contains("Course JS-1 is full."));
}

#[tokio::test]
async fn deleting_course_keeps_lessons() {
    let app = TestApp::spawn().await;
    let course = app.course("ENG-2", None).await;
    let student = app.student("Ada", vec![course]).await;
    let lesson = app.lesson(course, "Articles").await;
    let cookie = app.login_admin().await;

    let response = app
        .post_form(&format!("/courses/{course}/delete"), &cookie, "")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let kept = Lesson::find(&app.state.db_pool, lesson).await.unwrap().unwrap();
    assert_eq!(kept.course_id, None);
    assert!(Student::find(&app.state.db_pool, student).await.unwrap().is_some());

    let response = app
        .post_form(&format!("/courses/{course}/delete"), &cookie, "")
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

fn multipart_lesson(course: Uuid, cookie: &str) -> Request<Body> {
    let boundary = "XBOUNDARYX";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"course\"\r\n\r\n{course}\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"theme\"\r\n\r\nPast tense\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"date\"\r\n\r\n2025-03-04\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"files\"; filename=\"notes.txt\"\r\n\
         Content-Type: text/plain\r\n\r\nread chapter 3\r\n\
         --{boundary}--\r\n"
    );

    Request::post("/lessons/add")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn lesson_upload_download_and_delete() {
    let app = TestApp::spawn().await;
    let course = app.course("ENG-3", None).await;
    app.student("Ada", vec![course]).await;
    app.student("Grace", vec![course]).await;
    let cookie = app.login_admin().await;

    let response = app.send(multipart_lesson(course, &cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/courses/{course}/lessons"));

    let lessons = Lesson::for_course(&app.state.db_pool, course).await.unwrap();
    assert_eq!(lessons.len(), 1);
    let lesson = &lessons[0];
    assert_eq!(lesson.theme, "Past tense");

    let files = LessonFile::for_lesson(&app.state.db_pool, lesson.id).await.unwrap();
    assert_eq!(files.len(), 1);
    let stored = app.state.config.media.join(&files[0].stored_path);
    assert!(stored.exists());

    let response = app
        .get(&format!("/lesson-files/{}", files[0].id), Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "read chapter 3");

    let response = app
        .get(&format!("/attendance/{}", lesson.id), Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(count_for_lesson(&app, "score_attendance", lesson.id).await, 2);

    let response = app
        .post_form(&format!("/lessons/{}/delete", lesson.id), &cookie, "")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(!stored.exists());

    assert!(Lesson::find(&app.state.db_pool, lesson.id).await.unwrap().is_none());
    assert_eq!(count_for_lesson(&app, "score_attendance", lesson.id).await, 0);
    assert_eq!(count_for_lesson(&app, "lesson_files", lesson.id).await, 0);
}

async fn count_for_lesson(app: &TestApp, table: &str, lesson: Uuid) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE lesson_id = ?"))
        .bind(lesson)
        .fetch_one(&app.state.db_pool)
        .await
        .unwrap()
}
