#![allow(dead_code)]

use academy::{
    AcademyArgs, AcademyState, Role,
    models::{Course, Gender, Lesson, NewCourse, NewLesson, NewStudent, NewUser, Student, User},
};
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use chrono::NaiveDate;
use clap::Parser;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const ADMIN: &str = "admin";
pub const PASSWORD: &str = "correct horse";

pub struct TestApp {
    pub router: Router,
    pub state: AcademyState,
    pub dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let database_url = format!("sqlite:{}", dir.path().join("academy.db").display());
        let media = dir.path().join("media").to_string_lossy().into_owned();

        let args = AcademyArgs::parse_from([
            "academy",
            "--database-url",
            database_url.as_str(),
            "--media",
            media.as_str(),
            "--admin-username",
            ADMIN,
            "--admin-password",
            PASSWORD,
            "--password-iterations",
            "1000",
        ]);

        let state = AcademyState::connect(args).await.unwrap();
        let router = academy::router(state.clone());

        Self { router, state, dir }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Logs in and returns the session cookie to send back.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .send(form_post(
                "/login",
                None,
                &format!("username={username}&password={}", password.replace(' ', "+")),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "login failed");

        session_cookie(&response).unwrap()
    }

    pub async fn login_admin(&self) -> String {
        self.login(ADMIN, PASSWORD).await
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::get(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, cookie: &str, body: &str) -> Response<Body> {
        self.send(form_post(uri, Some(cookie), body)).await
    }

    pub async fn teacher(&self, username: &str) -> Uuid {
        User::create(
            &self.state.db_pool,
            &NewUser {
                username: username.to_owned(),
                password: PASSWORD.to_owned(),
                first_name: username.to_owned(),
                last_name: "Teacher".to_owned(),
                email: String::new(),
                phone: String::new(),
                role: Role::Teacher,
                department_id: None,
                skill_ids: Vec::new(),
            },
            1000,
        )
        .await
        .unwrap()
    }

    pub async fn course(&self, code: &str, teacher_id: Option<Uuid>) -> Uuid {
        Course::create(
            &self.state.db_pool,
            &NewCourse {
                department_id: None,
                course_code: code.to_owned(),
                teacher_id,
                price: 300_000,
                duration: 6,
                capacity: 10,
                about_course: String::new(),
                course_info: String::new(),
            },
        )
        .await
        .unwrap()
    }

    pub async fn student(&self, first_name: &str, course_ids: Vec<Uuid>) -> Uuid {
        Student::create(
            &self.state.db_pool,
            &NewStudent {
                first_name: first_name.to_owned(),
                last_name: "Student".to_owned(),
                email: String::new(),
                phone: String::new(),
                gender: Gender::Female,
                course_ids,
            },
        )
        .await
        .unwrap()
    }

    pub async fn lesson(&self, course_id: Uuid, theme: &str) -> Uuid {
        Lesson::create(
            &self.state.db_pool,
            &NewLesson {
                course_id,
                theme: theme.to_owned(),
                date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            },
        )
        .await
        .unwrap()
    }
}

pub fn form_post(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::post(uri).header(
        header::CONTENT_TYPE,
        "application/x-www-form-urlencoded",
    );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_owned())).unwrap()
}

/// `name=value` part of the session `Set-Cookie` header.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("id="))
        .and_then(|value| value.split(';').next())
        .map(str::to_owned)
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
