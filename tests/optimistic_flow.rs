mod common;

use std::sync::Arc;

use common::{StubResponse, StubServer};
use questline::cache::keys;
use questline::domain::is_temp_id;
use questline::models::{CreateTemplateInput, QuestKind, TemplateUpdate};
use questline::{AppState, ClientConfig, LocalStore};
use serde_json::json;

fn template(id: &str, title: &str) -> serde_json::Value {
    json!({ "id": id, "title": title, "kind": "linked", "privacy": "public" })
}

async fn app_with(responses: Vec<StubResponse>) -> (StubServer, AppState) {
    let server = StubServer::start(responses).await;
    let client = server.client(Some("k"), Arc::new(LocalStore::in_memory()));
    (server, AppState::with_client(ClientConfig::default(), client))
}

fn input(title: &str) -> CreateTemplateInput {
    CreateTemplateInput {
        title: title.into(),
        kind: QuestKind::Linked,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_loaded_list_is_served_from_cache() {
    let (server, app) = app_with(vec![StubResponse::json(200, json!([template("t1", "Morning run")]))]).await;

    let first = app.load_templates().await.unwrap();
    let second = app.load_templates().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_rejected_create_leaves_list_untouched() {
    let (_server, app) = app_with(vec![
        StubResponse::json(200, json!([template("t1", "Morning run")])),
        StubResponse::json(409, json!({ "detail": "A template with this title exists" })),
    ])
    .await;
    let before = app.load_templates().await.unwrap();

    let err = app.create_template(&input("Morning run")).await.unwrap_err();

    assert_eq!(err.status(), Some(409));
    assert_eq!(app.templates.items().unwrap(), before);
    assert_eq!(
        app.templates.state().last_error.unwrap().message,
        "A template with this title exists"
    );
}

#[tokio::test]
async fn test_accepted_create_replaces_placeholder() {
    let (_server, app) = app_with(vec![
        StubResponse::json(200, json!([template("t1", "Morning run")])),
        StubResponse::json(201, template("t2", "Evening walk")),
    ])
    .await;
    app.load_templates().await.unwrap();

    let created = app.create_template(&input("Evening walk")).await.unwrap();

    let items = app.templates.items().unwrap();
    let ids: Vec<&str> = items.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(created.id, "t2");
    assert_eq!(ids, vec!["t2", "t1"]);
    assert!(!ids.iter().any(|id| is_temp_id(id)));
    assert!(app.templates.cache().get_item(&keys::quest_template("t2")).is_some());
}

#[tokio::test]
async fn test_failed_update_and_delete_roll_back() {
    let (server, app) = app_with(vec![
        StubResponse::json(200, json!([template("t1", "Morning run"), template("t2", "Read")])),
        StubResponse::json(403, json!({ "detail": "Not yours" })),
        StubResponse::json(500, json!({})),
    ])
    .await;
    let before = app.load_templates().await.unwrap();

    let patch = TemplateUpdate {
        title: Some("Jog".into()),
        ..Default::default()
    };
    let err = app.update_template("t1", patch).await.unwrap_err();
    assert!(err.is_forbidden());
    assert_eq!(app.templates.items().unwrap(), before);

    app.delete_template("t2").await.unwrap_err();
    assert_eq!(app.templates.items().unwrap(), before);

    let requests = server.requests();
    assert_eq!(requests[1].request_line(), "put /v1/quests/templates/t1 http/1.1");
    assert_eq!(requests[2].request_line(), "delete /v1/quests/templates/t2 http/1.1");
}

#[tokio::test]
async fn test_invalid_quest_never_reaches_the_cache() {
    let (server, app) = app_with(vec![StubResponse::json(200, json!([]))]).await;
    app.load_quests().await.unwrap();

    let err = app
        .create_quest(&questline::models::CreateQuestInput {
            title: "Push-ups".into(),
            kind: QuestKind::Quantitative,
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, questline::ApiError::Domain(_)));
    assert!(app.quests.items().unwrap().is_empty());
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_logout_clears_caches_when_server_is_unreachable() {
    let store = Arc::new(LocalStore::in_memory());
    store
        .set_auth_tokens(serde_json::from_value(json!({ "accessToken": "tok" })).unwrap())
        .unwrap();
    let client = questline::ApiClient::with_http_client(
        questline::ApiConfig::new("http://127.0.0.1:9/v1"),
        store.clone(),
        reqwest::Client::builder().no_proxy().build().unwrap(),
    );
    let app = AppState::with_client(ClientConfig::default(), client);
    app.goals.cache().set_list(
        keys::goals(),
        vec![serde_json::from_value(json!({ "id": "g1", "title": "Run" })).unwrap()],
    );

    let err = app.logout().await.unwrap_err();

    assert!(matches!(err, questline::ApiError::Transport(_)));
    assert_eq!(store.access_token(), None);
    assert!(app.goals.cache().get_list(&keys::goals()).is_none());
    assert!(app.goals.cache().is_empty());
}
