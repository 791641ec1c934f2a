//! Session flow against a mock Gemini server: compose, edit, generate, and
//! key re-selection after an auth failure.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use veo_director::credential::{CredentialError, CredentialProvider};
use veo_director::gemini::{
    AspectRatio, DriverOptions, GeminiClient, JobStatus, PromptComposer, Resolution, VideoError,
    VideoJobDriver,
};
use veo_director::session::{Session, SessionError};

const TEXT_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";
const VIDEO_PATH: &str = "/v1beta/models/veo-3.1-fast-generate-preview:predictLongRunning";

/// Hands out keys from a fixed list.
struct QueuedKeys {
    keys: Vec<String>,
}

impl CredentialProvider for QueuedKeys {
    fn has_key(&self) -> bool {
        true
    }

    fn select_key(&mut self) -> Result<String, CredentialError> {
        if self.keys.is_empty() {
            return Err(CredentialError::NotFound);
        }
        Ok(self.keys.remove(0))
    }
}

fn session(
    server: &MockServer,
    keys: Vec<&str>,
) -> Session<GeminiClient, GeminiClient, QueuedKeys> {
    let client = GeminiClient::with_base_url("stale-key".to_string(), server.uri()).unwrap();
    let driver = VideoJobDriver::with_options(
        client.clone(),
        DriverOptions {
            poll_interval: Duration::from_millis(10),
            max_wait: None,
        },
    );
    Session::new(
        PromptComposer::new(client),
        driver,
        QueuedKeys {
            keys: keys.into_iter().map(String::from).collect(),
        },
    )
}

async fn mount_compose(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{
                "text": "{\"indonesian\": \"Nelayan tua di dermaga.\", \"english\": \"An old fisherman on the pier.\"}"
            }] } }]
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_compose_edit_generate() {
    let server = MockServer::start().await;
    mount_compose(&server).await;

    Mock::given(method("POST"))
        .and(path(VIDEO_PATH))
        .and(header("x-goog-api-key", "stale-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "operations/s1",
            "done": true,
            "response": { "generatedVideos": [{ "video": { "uri": "https://files/s1?alt=media" } }] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session(&server, vec![]);
    session.fields_mut().subject = "an old fisherman".to_string();
    session.compose().await.unwrap();

    session.edit_localized("Nelayan tua, subuh.").unwrap();
    let export = session.export_text().unwrap();
    assert!(export.contains("[INDONESIAN PROMPT]\nNelayan tua, subuh."));
    assert!(export.ends_with("[ENGLISH PROMPT (FINAL)]\nAn old fisherman on the pier."));

    let locator = session
        .generate(AspectRatio::Landscape, Resolution::Hd, |_| {})
        .await
        .unwrap();
    assert_eq!(locator, "https://files/s1?alt=media&key=stale-key");
    assert_eq!(session.job().unwrap().status, JobStatus::Succeeded);
}

#[tokio::test]
async fn test_missing_subject_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut session = session(&server, vec![]);
    session.fields_mut().place = "a pier".to_string();

    assert!(matches!(
        session.compose().await,
        Err(SessionError::MissingSubject)
    ));
}

#[tokio::test]
async fn test_invalid_key_then_reselected_key() {
    let server = MockServer::start().await;
    mount_compose(&server).await;

    Mock::given(method("POST"))
        .and(path(VIDEO_PATH))
        .and(header("x-goog-api-key", "stale-key"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(VIDEO_PATH))
        .and(header("x-goog-api-key", "fresh-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "operations/s2",
            "done": true,
            "response": { "generatedVideos": [{ "video": { "uri": "https://files/s2?alt=media" } }] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session(&server, vec!["fresh-key"]);
    session.fields_mut().subject = "an old fisherman".to_string();
    session.compose().await.unwrap();

    let err = session
        .generate(AspectRatio::Portrait, Resolution::Hd, |_| {})
        .await
        .unwrap_err();
    match &err {
        SessionError::Video(VideoError::Auth(message)) => {
            assert!(message.contains("Please re-select a paid GCP project key"));
        }
        other => panic!("Expected auth failure, got {:?}", other),
    }
    assert!(!session.key_ready());

    let locator = session
        .generate(AspectRatio::Portrait, Resolution::Hd, |_| {})
        .await
        .unwrap();
    assert!(session.key_ready());
    assert_eq!(locator, "https://files/s2?alt=media&key=fresh-key");
}

#[tokio::test]
async fn test_reselection_failure_surfaces_credential_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VIDEO_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "Forbidden", "status": "PERMISSION_DENIED" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session(&server, vec![]);
    session.set_prompt(veo_director::gemini::BilingualPrompt::new("x", "A pier"));

    let err = session
        .generate(AspectRatio::Landscape, Resolution::Hd, |_| {})
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Permission denied. Your API key may lack access to Veo. Ensure billing is enabled. Please reconnect your API key."
    );

    let err = session
        .generate(AspectRatio::Landscape, Resolution::Hd, |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Credential(CredentialError::NotFound)));
}
