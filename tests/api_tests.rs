use actas_backend::{
    AppConfig, AppState, MockMediaStorage, create_router,
    models::{
        ActaDetail, ActaStatus, ActaSummary, GestionResponse, LoginResponse, NewActa,
        NewCompromiso, NewUser, Role,
    },
    password::hash_password,
    repository::{InMemoryRepository, Repository, RepositoryState},
    storage::StorageState,
};
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub acta_id: i64,
    pub compromiso_id: i64,
}

async fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());

    let admin = repo
        .create_user(NewUser {
            email: "admin@test.com".to_string(),
            username: "admin".to_string(),
            first_name: "Admin".to_string(),
            last_name: "Usuario".to_string(),
            role: Role::Admin,
            password_hash: hash_password("admin123").unwrap(),
        })
        .await
        .unwrap();
    repo.create_user(NewUser {
        email: "usuario@test.com".to_string(),
        username: "usuario".to_string(),
        first_name: "Usuario".to_string(),
        last_name: "Base".to_string(),
        role: Role::BaseUser,
        password_hash: hash_password("usuario123").unwrap(),
    })
    .await
    .unwrap();

    let visible = repo
        .create_acta(NewActa {
            title: "Reunión de planificación Q1 2024".to_string(),
            status: ActaStatus::Pending,
            document: None,
            creator_id: Some(admin.id),
        })
        .await
        .unwrap();
    let compromiso = repo
        .create_compromiso(NewCompromiso {
            acta_id: visible.id,
            description: "Asignar recursos para nuevos proyectos".to_string(),
            responsible_party: "Usuario Base".to_string(),
            due_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        })
        .await
        .unwrap();
    repo.create_acta(NewActa {
        title: "Capacitación de equipo técnico".to_string(),
        status: ActaStatus::Completed,
        document: None,
        creator_id: Some(admin.id),
    })
    .await
    .unwrap();

    let state = AppState {
        repo: repo as RepositoryState,
        storage: Arc::new(MockMediaStorage::new()) as StorageState,
        config: AppConfig::default(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        acta_id: visible.id,
        compromiso_id: compromiso.id,
    }
}

async fn login(client: &reqwest::Client, app: &TestApp, email: &str, password: &str) -> reqwest::Response {
    client
        .post(format!("{}/login/", app.address))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("login request failed")
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let doc: serde_json::Value = client
        .get(format!("{}/api-docs/openapi.json", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let paths = doc["paths"].as_object().expect("paths object");
    for route in ["/login/", "/logout/", "/actas/", "/actas/{id}/", "/gestiones/", "/media/{path}"] {
        assert!(paths.contains_key(route), "{route} missing from OpenAPI");
    }
}

#[tokio::test]
async fn test_token_routes_reject_anonymous_callers() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let list = client.get(format!("{}/actas/", app.address)).send().await.unwrap();
    assert_eq!(list.status(), 401);
    let body: serde_json::Value = list.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");

    let create = client
        .post(format!("{}/gestiones/", app.address))
        .header("Authorization", "Token not-a-real-token")
        .json(&serde_json::json!({ "compromiso": app.compromiso_id, "descripcion": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(create.status(), 401);
}

#[tokio::test]
async fn test_invalid_login_bodies_match() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let wrong = login(&client, &app, "usuario@test.com", "incorrecta").await;
    let unknown = login(&client, &app, "nadie@test.com", "usuario123").await;
    let garbage = client
        .post(format!("{}/login/", app.address))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(wrong.status(), 400);
    assert_eq!(unknown.status(), 400);
    assert_eq!(garbage.status(), 400);
    let wrong = wrong.text().await.unwrap();
    assert_eq!(wrong, unknown.text().await.unwrap());
    assert_eq!(wrong, garbage.text().await.unwrap());
}

#[tokio::test]
async fn test_base_user_session_lifecycle() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // 1. Login
    let response = login(&client, &app, "usuario@test.com", "usuario123").await;
    assert_eq!(response.status(), 200);
    let session: LoginResponse = response.json().await.unwrap();
    assert!(!session.is_admin);
    let auth = format!("Token {}", session.token);

    // 2. Only the Acta naming "Usuario Base" is listed
    let list: Vec<ActaSummary> = client
        .get(format!("{}/actas/", app.address))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, app.acta_id);
    assert_eq!(list[0].compromisos_count, 1);

    // 3. Log an action, naming someone else as actor
    let response = client
        .post(format!("{}/gestiones/", app.address))
        .header("Authorization", &auth)
        .json(&serde_json::json!({
            "compromiso": app.compromiso_id,
            "descripcion": "Recursos asignados",
            "usuario": 1
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let created: GestionResponse = response.json().await.unwrap();
    assert_eq!(created.usuario_email.as_deref(), Some("usuario@test.com"));

    // 4. Detail shows it nested under its commitment
    let detail: ActaDetail = client
        .get(format!("{}/actas/{}/", app.address, app.acta_id))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail.compromisos[0].gestiones.len(), 1);
    assert_eq!(detail.compromisos[0].gestiones[0].id, created.id);

    // 5. Logout invalidates the token
    let response = client
        .post(format!("{}/logout/", app.address))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let response = client
        .get(format!("{}/actas/", app.address))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_admin_sees_everything_and_filters() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let session: LoginResponse = login(&client, &app, "admin@test.com", "admin123")
        .await
        .json()
        .await
        .unwrap();
    assert!(session.is_admin);
    let auth = format!("Bearer {}", session.token);

    let all: Vec<ActaSummary> = client
        .get(format!("{}/actas/", app.address))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let completed: Vec<ActaSummary> = client
        .get(format!("{}/actas/?estado=completed&titulo=capacitaci%C3%B3n", app.address))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].title, "Capacitación de equipo técnico");

    let bad_date = client
        .get(format!("{}/actas/?fecha=ayer", app.address))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(bad_date.status(), 400);
    let body: serde_json::Value = bad_date.json().await.unwrap();
    assert_eq!(body["details"][0]["field"], "fecha");
}

#[tokio::test]
async fn test_multipart_upload_with_disallowed_extension() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let session: LoginResponse = login(&client, &app, "usuario@test.com", "usuario123")
        .await
        .json()
        .await
        .unwrap();

    let form = reqwest::multipart::Form::new()
        .text("compromiso", app.compromiso_id.to_string())
        .text("descripcion", "Foto de la pizarra")
        .part(
            "archivo",
            reqwest::multipart::Part::bytes(vec![0u8; 128]).file_name("pizarra.png"),
        );

    let response = client
        .post(format!("{}/gestiones/", app.address))
        .header("Authorization", format!("Token {}", session.token))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "archivo");
}
