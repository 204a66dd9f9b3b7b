mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{TestApp, body_string};
use serde_json::{Value, json};
use uuid::Uuid;

async fn post_like(app: &TestApp, cookie: &str, course: Uuid) -> (StatusCode, Value) {
    let response = app
        .send(
            Request::post(format!("/like/{course}"))
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    let status = response.status();
    (status, serde_json::from_str(&body_string(response).await).unwrap())
}

#[tokio::test]
async fn toggling_twice_restores_state() {
    let app = TestApp::spawn().await;
    let course = app.course("PY-1", None).await;
    let cookie = app.login_admin().await;

    let (status, liked) = post_like(&app, &cookie, course).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(liked, json!({ "liked": true, "likes": 1 }));

    let (_, unliked) = post_like(&app, &cookie, course).await;
    assert_eq!(unliked, json!({ "liked": false, "likes": 0 }));

    let response = app.get(&format!("/like/{course}"), Some(&cookie)).await;
    let current: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(current, unliked);
}

#[tokio::test]
async fn unknown_course_is_json_not_found() {
    let app = TestApp::spawn().await;
    let cookie = app.login_admin().await;

    let (status, body) = post_like(&app, &cookie, Uuid::new_v4()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "course not found" }));
}
