use imglab::{
    api::ApiClient,
    auth::{MemoryStorage, Session},
    moderation::{Category, ListingSource, ModerationAction, ModerationConsole},
    Error,
};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn signed_in_console(uri: &str) -> ModerationConsole<MemoryStorage> {
    let mut session = Session::new(MemoryStorage::new());
    session
        .save(&SecretString::from("admin-token".to_string()), 3600)
        .unwrap();
    ModerationConsole::new(ApiClient::new(uri).unwrap(), session)
}

#[tokio::test]
async fn optimistic_approve_until_forced_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/pending"))
        .and(header("authorization", "Bearer admin-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "items": [{"key": "pending/abc.jpg", "previewUrl": "https://s3/p/abc"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/admin/approve"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "approvedKey": "approved/u1/abc.jpg"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/approved"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "items": [
                {"key": "approved/u1/abc.jpg", "url": "https://s3/a/abc", "size": 4096},
                {"key": "approved/u2/old.png", "url": "https://s3/a/old"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut console = signed_in_console(&server.uri());
    console.select(Category::Pending).await.unwrap();

    let new_key = console
        .apply_moderation(ModerationAction::Approve, "pending/abc.jpg")
        .await
        .unwrap();
    assert_eq!(new_key, "approved/u1/abc.jpg");
    assert_eq!(console.cache().count(Category::Pending), 0);

    // The synthesized record is not a fetched listing, so the tab still loads.
    assert_eq!(
        console.select(Category::Approved).await.unwrap(),
        ListingSource::Server
    );
    let approved = console.visible();
    assert_eq!(approved.len(), 2);
    assert_eq!(approved[0].preview_url.as_deref(), Some("https://s3/a/abc"));

    assert_eq!(
        console.select(Category::Approved).await.unwrap(),
        ListingSource::Cache
    );
}

#[tokio::test]
async fn unauthorized_status_codes_are_distinct() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/pending"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/approved"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "Forbidden"})))
        .mount(&server)
        .await;

    let mut console = signed_in_console(&server.uri());

    assert!(matches!(
        console.select(Category::Pending).await,
        Err(Error::Http { status: 401, .. })
    ));
    assert!(!console.is_forbidden());

    assert!(matches!(
        console.select(Category::Approved).await,
        Err(Error::Forbidden)
    ));
    assert!(console.is_forbidden());
}
