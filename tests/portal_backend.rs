use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dept_portal::config::Config;
use dept_portal::models::role::{Credentials, Role};
use dept_portal::models::student::RecipientFilter;
use dept_portal::models::topic::SubmitterType;
use dept_portal::services::api::{ApiClient, SharedTransport};
use dept_portal::session::PortalSession;
use dept_portal::tasks::topic_poller::FetchState;
use dept_portal::PortalError;

type Sent = web::Data<Mutex<Vec<(String, Value)>>>;

async fn user_role(req: HttpRequest) -> HttpResponse {
    let auth = req
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok());
    match auth {
        Some("Bearer dept-token") => {
            HttpResponse::Ok().json(json!({ "success": true, "data": { "gid": "5" } }))
        }
        Some("Bearer teacher-token") => {
            HttpResponse::Ok().json(json!({ "success": true, "data": { "gid": 70 } }))
        }
        _ => HttpResponse::Unauthorized().json(json!({ "success": false })),
    }
}

async fn students() -> HttpResponse {
    HttpResponse::Ok().json(json!([
        { "id": 1, "firstname": "Anu", "lastname": "Bat", "mail": "anu@example.edu",
          "program": "CS", "is_choosed": true },
        { "id": 2, "firstname": "Temuulen", "lastname": "Gan", "mail": "temuulen@example.edu",
          "program": "SE", "is_choosed": false }
    ]))
}

async fn templates() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "data": [
        { "id": 3, "name": "Deadline", "subject": "Deadline {{days_remaining}} days left",
          "body": "Dear {{student_name}}, the {{deadline_type}} is due." }
    ]}))
}

async fn topics(path: web::Path<String>) -> HttpResponse {
    if path.as_str() == "teacher" {
        HttpResponse::Ok().json(json!([{
            "id": 21,
            "fields": "[{\"field\":\"name_english\",\"value\":\"Compilers\",\"field2\":\"English name\"}]"
        }]))
    } else {
        HttpResponse::Ok().json(json!([]))
    }
}

async fn send_template(sent: Sent, body: web::Json<Value>) -> HttpResponse {
    sent.lock()
        .expect("sent lock")
        .push(("notifications/template".to_string(), body.into_inner()));
    HttpResponse::Ok().json(json!({ "success": true }))
}

async fn send_direct(sent: Sent, body: web::Json<Value>) -> HttpResponse {
    sent.lock()
        .expect("sent lock")
        .push(("notifications".to_string(), body.into_inner()));
    HttpResponse::Ok().json(json!({ "success": true }))
}

fn spawn_backend(sent: Sent) -> std::io::Result<(String, ServerHandle)> {
    let server = HttpServer::new(move || {
        App::new().app_data(sent.clone()).service(
            web::scope("/api")
                .route("/user/role", web::get().to(user_role))
                .route("/students/all", web::get().to(students))
                .route("/notification-templates", web::get().to(templates))
                .route("/topics/submittedby/{kind}", web::get().to(topics))
                .route("/notifications/template", web::post().to(send_template))
                .route("/notifications", web::post().to(send_direct)),
        )
    })
    .workers(1)
    .bind(("127.0.0.1", 0))?;

    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_rt::spawn(server);
    Ok((format!("http://{}/api", addr), handle))
}

fn setup(api_url: &str) -> (SharedTransport, Config) {
    let transport: SharedTransport = Arc::new(ApiClient::new(api_url));
    let config = Config {
        api_url: api_url.to_string(),
        role_url: format!("{}/user/role", api_url),
        ..Config::default()
    };
    (transport, config)
}

#[actix_web::test]
async fn test_role_resolution_over_http() {
    let sent: Sent = web::Data::new(Mutex::new(Vec::new()));
    let (api_url, handle) = spawn_backend(sent).expect("start backend");
    let (transport, config) = setup(&api_url);

    let session = PortalSession::start(
        transport.clone(),
        config.clone(),
        &Credentials::bearer("teacher-token"),
    )
    .await
    .expect("teacher session");
    assert_eq!(session.role(), Role::Teacher);
    assert!(session.composer().is_err());

    let rejected =
        PortalSession::start(transport, config, &Credentials::bearer("expired")).await;
    assert!(matches!(rejected, Err(PortalError::Http { status: 401, .. })));

    handle.stop(true).await;
}

#[actix_web::test]
async fn test_broadcast_template_notification_over_http() {
    let sent: Sent = web::Data::new(Mutex::new(Vec::new()));
    let (api_url, handle) = spawn_backend(sent.clone()).expect("start backend");
    let (transport, config) = setup(&api_url);
    let session = PortalSession::start(transport, config, &Credentials::bearer("dept-token"))
        .await
        .expect("department session");

    let mut composer = session.composer().expect("composer");
    assert!(composer.load().await.is_empty());
    assert!(composer.select_template(3));
    composer.set_data_value("deadline_type", "proposal");
    composer.set_filter(RecipientFilter::Unconfirmed);
    composer.send_to_all();

    composer.submit().await.expect("submit");

    let sent = sent.lock().expect("sent lock").clone();
    assert_eq!(sent.len(), 1);
    let (endpoint, body) = &sent[0];
    assert_eq!(endpoint, "notifications/template");
    assert_eq!(body["template_id"], 3);
    assert_eq!(body["data"]["deadline_type"], "proposal");
    assert_eq!(body["recipients"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["recipients"][0]["data"]["student_name"], "Temuulen");

    handle.stop(true).await;
}

#[actix_web::test]
async fn test_topic_view_over_http() {
    let sent: Sent = web::Data::new(Mutex::new(Vec::new()));
    let (api_url, handle) = spawn_backend(sent).expect("start backend");
    let (transport, config) = setup(&api_url);
    let session = PortalSession::start(transport, config, &Credentials::bearer("dept-token"))
        .await
        .expect("department session");

    let mut view = session.topics(SubmitterType::Teacher).expect("topic view");
    let mut updates = view.subscribe();
    tokio::time::timeout(Duration::from_secs(5), updates.wait_for(|done| *done >= 1))
        .await
        .expect("first fetch in time")
        .expect("view alive");

    let state = view.snapshot();
    assert_eq!(state.state, FetchState::Success);
    assert_eq!(state.rows[0].cell_text("name_english"), "Compilers");
    let keys: Vec<_> = state.columns.iter().map(|c| c.key.as_str()).collect();
    assert_eq!(keys, vec!["name_english", "actions"]);

    view.shutdown();
    handle.stop(true).await;
}
