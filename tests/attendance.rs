mod common;

use academy::models::attendance;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{PASSWORD, TestApp, body_string, location};
use tokio::task::JoinSet;
use tower::ServiceExt;
use uuid::Uuid;

struct Sheet {
    app: TestApp,
    cookie: String,
    course: Uuid,
    lesson: Uuid,
    students: Vec<Uuid>,
}

async fn sheet_with_three_students() -> Sheet {
    let app = TestApp::spawn().await;
    let teacher = app.teacher("tom").await;
    let course = app.course("ENG-1", Some(teacher)).await;

    let mut students = Vec::new();
    for name in ["Ada", "Grace", "Linus"] {
        students.push(app.student(name, vec![course]).await);
    }
    let lesson = app.lesson(course, "Present simple").await;
    let cookie = app.login("tom", PASSWORD).await;

    Sheet {
        app,
        cookie,
        course,
        lesson,
        students,
    }
}

async fn row_count(app: &TestApp, lesson: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM score_attendance WHERE lesson_id = ?")
        .bind(lesson)
        .fetch_one(&app.state.db_pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn opening_sheet_creates_one_row_per_student() {
    let s = sheet_with_three_students().await;
    let uri = format!("/attendance/{}", s.lesson);

    let response = s.app.get(&uri, Some(&s.cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert_eq!(body.matches("name=\"row\"").count(), 3);
    assert_eq!(row_count(&s.app, s.lesson).await, 3);

    s.app.get(&uri, Some(&s.cookie)).await;
    assert_eq!(row_count(&s.app, s.lesson).await, 3);
}

#[tokio::test]
async fn late_enrolment_gets_a_row() {
    let s = sheet_with_three_students().await;
    let uri = format!("/attendance/{}", s.lesson);
    s.app.get(&uri, Some(&s.cookie)).await;

    s.app.student("Barbara", vec![s.course]).await;
    s.app.get(&uri, Some(&s.cookie)).await;

    assert_eq!(row_count(&s.app, s.lesson).await, 4);
}

#[tokio::test]
async fn submission_is_keyed_by_student() {
    let s = sheet_with_three_students().await;
    let uri = format!("/attendance/{}", s.lesson);
    s.app.get(&uri, Some(&s.cookie)).await;

    // rows deliberately in reverse order
    let body = s
        .students
        .iter()
        .rev()
        .zip([90, 75, 60])
        .map(|(id, mark)| format!("row={id}&mark.{id}={mark}&present.{id}=on"))
        .collect::<Vec<_>>()
        .join("&");

    let response = s.app.post_form(&uri, &s.cookie, &body).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/courses/{}/lessons", s.course));

    let rows = attendance::sheet(&s.app.state.db_pool, s.lesson).await.unwrap();
    for (id, mark) in s.students.iter().rev().zip([90, 75, 60]) {
        let row = rows.iter().find(|r| r.student_id == *id).unwrap();
        assert_eq!(row.mark, Some(mark));
        assert_eq!(row.is_present, Some(true));
    }
}

#[tokio::test]
async fn invalid_row_rejects_whole_batch() {
    let s = sheet_with_three_students().await;
    let uri = format!("/attendance/{}", s.lesson);
    s.app.get(&uri, Some(&s.cookie)).await;

    let [first, second, third] = [s.students[0], s.students[1], s.students[2]];
    let body = format!(
        "row={first}&mark.{first}=80&present.{first}=on\
         &row={second}&mark.{second}=150\
         &row={third}&mark.{third}=70"
    );

    let response = s.app.post_form(&uri, &s.cookie, &body).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let page = body_string(response).await;
    assert!(page.contains("Ensure this value is between 0 and 100."));

    let rows = attendance::sheet(&s.app.state.db_pool, s.lesson).await.unwrap();
    assert!(rows.iter().all(|r| r.mark.is_none() && r.is_present.is_none()));
}

#[tokio::test]
async fn other_teachers_are_forbidden() {
    let s = sheet_with_three_students().await;
    s.app.teacher("eve").await;
    let cookie = s.app.login("eve", PASSWORD).await;

    let response = s
        .app
        .get(&format!("/attendance/{}", s.lesson), Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(row_count(&s.app, s.lesson).await, 0);
}

#[tokio::test]
async fn unknown_lesson_is_not_found() {
    let s = sheet_with_three_students().await;

    let response = s
        .app
        .get(&format!("/attendance/{}", Uuid::new_v4()), Some(&s.cookie))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_initializations_all_succeed() {
    let app = TestApp::spawn().await;
    let course = app.course("MATH-2", None).await;
    for n in 0..10 {
        app.student(&format!("Student{n}"), vec![course]).await;
    }

    let mut lessons = Vec::new();
    for n in 0..5 {
        lessons.push(app.lesson(course, &format!("Lesson {n}")).await);
    }

    let mut tasks = JoinSet::new();
    for &lesson in &lessons {
        for _ in 0..8 {
            let db = app.state.db_pool.clone();
            tasks.spawn(async move { attendance::ensure_for_lesson(&db, lesson).await });
        }
    }

    let mut created = 0;
    while let Some(result) = tasks.join_next().await {
        created += result.unwrap().unwrap();
    }

    assert_eq!(created, 50);
    for lesson in lessons {
        assert_eq!(row_count(&app, lesson).await, 10);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sheet_loads_all_succeed() {
    let s = sheet_with_three_students().await;
    let uri = format!("/attendance/{}", s.lesson);

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let router = s.app.router.clone();
        let request = Request::get(uri.as_str())
            .header(header::COOKIE, s.cookie.as_str())
            .body(Body::empty())
            .unwrap();
        tasks.spawn(async move { router.oneshot(request).await.unwrap().status() });
    }

    while let Some(status) = tasks.join_next().await {
        assert_eq!(status.unwrap(), StatusCode::OK);
    }
    assert_eq!(row_count(&s.app, s.lesson).await, 3);
}
