// tests/routes.rs
//! Testes do router completo (sessões em memória, dados num diretório temporário).

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use requests_portal::{
    models::{collection::Collection, school::School},
    state::AppState,
    store::JsonStore,
    web::routes::create_router,
};
use serde_json::json;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, SessionManagerLayer};

struct TestApp {
    _dir: tempfile::TempDir,
    store: JsonStore,
    router: Router,
}

fn test_app() -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonStore::new(dir.path());
    let users = json!([
        {"ps_number": "PS1724", "password": bcrypt::hash("admin-pw", 4).unwrap(), "credential": "Admin", "name": "Administrator"},
        {"ps_number": "PS20", "password": bcrypt::hash("coach-pw", 4).unwrap(), "credential": "Coach", "name": "Ana"}
    ]);
    store.save(Collection::Users, users.as_array().unwrap()).unwrap();
    let schools = json!([{"id": "1565", "nome": "Escola Norte", "city": "Porto", "coaches": ["PS20"]}]);
    store.save(Collection::Schools, schools.as_array().unwrap()).unwrap();

    let session_layer = SessionManagerLayer::new(MemoryStore::default()).with_secure(false);
    let router = create_router(AppState::new(store.clone(), None)).layer(session_layer);
    TestApp { _dir: dir, store, router }
}

fn form_post(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Faz login e devolve o cookie de sessão ("id=...").
async fn login(app: &TestApp, ps_number: &str, password: &str) -> String {
    let body = format!("username={}&password={}", ps_number, password);
    let response = app.router.clone().oneshot(form_post("/login", &body, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/home");
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn protected_pages_redirect_to_login() {
    let app = test_app();
    for uri in ["/home", "/requests", "/stock", "/admin/users"] {
        let response = app.router.clone().oneshot(get(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(location(&response), "/login");
    }
}

#[tokio::test]
async fn login_normalizes_the_ps_number_and_opens_home() {
    let app = test_app();
    let cookie = login(&app, "ps1724", "admin-pw").await;
    let response = app.router.clone().oneshot(get("/home", Some(&cookie))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Welcome, Administrator"));
    assert!(html.contains("/admin/sync"));
}

#[tokio::test]
async fn wrong_password_shows_the_login_error() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(form_post("/login", "username=PS1724&password=nope", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Invalid PS Number or password."));
}

#[tokio::test]
async fn coaches_cannot_open_admin_pages() {
    let app = test_app();
    let cookie = login(&app, "PS20", "coach-pw").await;
    let response = app.router.clone().oneshot(get("/admin/users", Some(&cookie))).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.router.clone().oneshot(get("/stock", Some(&cookie))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_downloads_the_schools_csv() {
    let app = test_app();
    let cookie = login(&app, "PS1724", "admin-pw").await;
    let response = app
        .router
        .clone()
        .oneshot(get("/admin/schools/export.csv", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/csv"));
    let csv = body_text(response).await;
    assert!(csv.starts_with("id,nome,city,coaches"));
    assert!(csv.contains("1565,Escola Norte,Porto,PS20"));
}

#[tokio::test]
async fn school_grid_save_normalizes_coaches() {
    let app = test_app();
    let cookie = login(&app, "PS1724", "admin-pw").await;
    let body = "id.0=1565&nome.0=Escola+Norte&city.0=Porto&coaches.0=ps20&id.1=&nome.1=&city.1=&coaches.1=";
    let response = app
        .router
        .clone()
        .oneshot(form_post("/admin/schools/save", body, Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/admin/schools?success="));

    let schools: Vec<School> = app.store.load(Collection::Schools).unwrap();
    assert_eq!(schools.len(), 1);
    assert_eq!(schools[0].coaches, vec!["PS20".to_string()]);
}

#[tokio::test]
async fn school_grid_rejects_rows_without_id() {
    let app = test_app();
    let cookie = login(&app, "PS1724", "admin-pw").await;
    let response = app
        .router
        .clone()
        .oneshot(form_post("/admin/schools/save", "id.0=&nome.0=Sem+ID&city.0=Braga", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/admin/schools?error="));
    let schools: Vec<School> = app.store.load(Collection::Schools).unwrap();
    assert_eq!(schools[0].id, "1565");
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = test_app();
    let cookie = login(&app, "PS20", "coach-pw").await;
    let response = app.router.clone().oneshot(get("/logout", Some(&cookie))).await.unwrap();
    assert_eq!(location(&response), "/login");
    let response = app.router.clone().oneshot(get("/home", Some(&cookie))).await.unwrap();
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn requests_page_survives_blank_legacy_ids() {
    let app = test_app();
    let legacy = json!([{"id": "", "school_id": "1565", "category": "Books", "material": "Pen", "quantity": "2", "status": null}]);
    app.store.save(Collection::Requests, legacy.as_array().unwrap()).unwrap();

    let cookie = login(&app, "PS20", "coach-pw").await;
    let response = app.router.clone().oneshot(get("/requests", Some(&cookie))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Pen"));
}
