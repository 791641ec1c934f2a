//! GeminiClient - handles communication with the Gemini REST API.
//!
//! One client serves both upstream collaborators: the text model used by the
//! prompt composer and the Veo long-running video operations used by the job
//! driver. Both are exposed through traits so the composer and the driver can
//! run against in-memory fakes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use super::error::GeminiError;
use super::types::VideoRequest;

/// Environment variable checked first for the API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Fallback environment variable for the API key.
pub const API_KEY_ENV: &str = "API_KEY";

/// Default base URL for the Gemini API.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// REST API version segment.
const API_VERSION: &str = "v1beta";

/// Default model for prompt composition.
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";

/// Default model for video generation.
pub const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";

/// Default timeout for HTTP requests (120 seconds). Covers video downloads.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// A single text generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub system_instruction: String,
    pub contents: String,
    pub temperature: f32,
    pub response_mime_type: Option<String>,
}

/// Hosted text model.
#[async_trait]
pub trait TextService: Send + Sync {
    /// Run one generation and return the concatenated response text.
    async fn generate_text(&self, request: &TextRequest) -> Result<String, GeminiError>;
}

/// Hosted long-running video model.
#[async_trait]
pub trait VideoService: Send + Sync {
    /// Start a generation job.
    async fn create_video(&self, request: &VideoRequest) -> Result<Operation, GeminiError>;

    /// Fetch the latest state of a previously started job.
    async fn poll_operation(&self, operation: &Operation) -> Result<Operation, GeminiError>;

    /// Access key appended to result URIs.
    fn api_key(&self) -> &str;

    /// Swap in a freshly selected access key.
    fn set_api_key(&mut self, api_key: String);
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: ContentBody,
    contents: Vec<ContentBody>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct ContentBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<PartBody>,
}

#[derive(Debug, Serialize)]
struct PartBody {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Request body for `predictLongRunning`.
#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct PredictInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    aspect_ratio: String,
    resolution: String,
    /// REST name for the number of videos to generate.
    sample_count: u32,
}

/// Long-running operation handle returned by the video model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<OperationResponse>,
}

/// Error object carried by a finished operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Result payload of a finished operation.
///
/// The REST API nests samples under `generateVideoResponse`; the SDK shape
/// uses a flat `generatedVideos` list. Both are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_video_response: Option<GenerateVideoResponse>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generated_videos: Vec<GeneratedVideo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoResponse {
    #[serde(default)]
    pub generated_samples: Vec<GeneratedVideo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedVideo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoFile>,
}

impl GeneratedVideo {
    fn uri(&self) -> Option<&str> {
        self.video
            .as_ref()
            .and_then(|f| f.uri.as_deref())
            .filter(|uri| !uri.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl Operation {
    /// An operation that is still running.
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A finished operation with one generated video.
    pub fn completed(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: true,
            error: None,
            response: Some(OperationResponse {
                generate_video_response: Some(GenerateVideoResponse {
                    generated_samples: vec![GeneratedVideo {
                        video: Some(VideoFile {
                            uri: Some(uri.into()),
                        }),
                    }],
                }),
                generated_videos: Vec::new(),
            }),
        }
    }

    /// A finished operation carrying an error message.
    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: true,
            error: Some(OperationError {
                code: None,
                message: Some(message.into()),
                status: None,
            }),
            response: None,
        }
    }

    /// URI of the first generated video, if any.
    pub fn video_uri(&self) -> Option<&str> {
        let response = self.response.as_ref()?;
        response
            .generate_video_response
            .as_ref()
            .and_then(|r| r.generated_samples.first())
            .and_then(GeneratedVideo::uri)
            .or_else(|| response.generated_videos.first().and_then(GeneratedVideo::uri))
    }
}

/// Standard Google API error envelope.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: OperationError,
}

/// Client for communicating with the Gemini API.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    text_model: String,
    video_model: String,
    http_client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new GeminiClient by reading the API key from the environment.
    ///
    /// Checks `GEMINI_API_KEY` first, then `API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::MissingApiKey` if neither variable is set.
    pub fn new() -> Result<Self, GeminiError> {
        let api_key = std::env::var(GEMINI_API_KEY_ENV)
            .or_else(|_| std::env::var(API_KEY_ENV))
            .map_err(|_| GeminiError::MissingApiKey)?;
        Self::with_api_key(api_key)
    }

    /// Create a new GeminiClient with an explicit API key.
    pub fn with_api_key(api_key: String) -> Result<Self, GeminiError> {
        Self::with_base_url(api_key, GEMINI_API_BASE_URL.to_string())
    }

    /// Create a new GeminiClient with a custom base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, GeminiError> {
        if api_key.is_empty() {
            return Err(GeminiError::MissingApiKey);
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            video_model: DEFAULT_VIDEO_MODEL.to_string(),
            http_client,
        })
    }

    /// Override the text and video model ids.
    pub fn with_models(mut self, text_model: String, video_model: String) -> Self {
        self.text_model = text_model;
        self.video_model = video_model;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    pub fn video_model(&self) -> &str {
        &self.video_model
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/{}/models/{}:{}",
            self.base_url, API_VERSION, model, method
        )
    }

    fn operation_url(&self, operation_name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            API_VERSION,
            operation_name.trim_start_matches('/')
        )
    }

    /// Turn a non-success response into `GeminiError::Api`.
    ///
    /// The message keeps the numeric code and status name so the video error
    /// classifier can see them.
    async fn error_from_response(response: reqwest::Response) -> GeminiError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => {
                let code = envelope
                    .error
                    .code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| status.as_u16().to_string());
                let detail = envelope.error.message.unwrap_or_default();
                match envelope.error.status {
                    Some(name) => format!("{} {}: {}", code, name, detail),
                    None => format!("{}: {}", code, detail),
                }
            }
            Err(_) => format!("API request failed with status {}: {}", status, body),
        };

        GeminiError::Api {
            status: status.as_u16(),
            message,
        }
    }

    /// Download a video file from a URL to disk.
    ///
    /// Streams the body into a `.part` sibling of `dest` and renames it into
    /// place once complete, so `dest` never holds a truncated video.
    /// Parent directories are created as needed.
    pub async fn download_video(&self, url: &str, dest: &Path) -> Result<PathBuf, GeminiError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let response = self.http_client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let partial = partial_download_path(dest);
        if let Err(e) = stream_to_file(response, &partial).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }
        tokio::fs::rename(&partial, dest).await?;

        Ok(dest.to_path_buf())
    }
}

/// Temporary path a download is written to before it is moved to `dest`.
pub fn partial_download_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

async fn stream_to_file(response: reqwest::Response, path: &Path) -> Result<(), GeminiError> {
    use futures_util::StreamExt;

    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}

#[async_trait]
impl TextService for GeminiClient {
    async fn generate_text(&self, request: &TextRequest) -> Result<String, GeminiError> {
        let url = self.model_url(&self.text_model, "generateContent");

        let body = GenerateContentRequest {
            system_instruction: ContentBody {
                role: None,
                parts: vec![PartBody {
                    text: request.system_instruction.clone(),
                }],
            },
            contents: vec![ContentBody {
                role: Some("user".to_string()),
                parts: vec![PartBody {
                    text: request.contents.clone(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                response_mime_type: request.response_mime_type.clone(),
            },
        };

        log::debug!("Requesting text generation from {}", self.text_model);

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let parsed: GenerateContentResponse = response.json().await?;
        Ok(parsed.text())
    }
}

#[async_trait]
impl VideoService for GeminiClient {
    async fn create_video(&self, request: &VideoRequest) -> Result<Operation, GeminiError> {
        let url = self.model_url(&self.video_model, "predictLongRunning");

        let body = PredictRequest {
            instances: vec![PredictInstance {
                prompt: request.prompt.clone(),
            }],
            parameters: PredictParameters {
                aspect_ratio: request.aspect_ratio.as_str().to_string(),
                resolution: request.resolution.as_str().to_string(),
                sample_count: 1,
            },
        };

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let operation: Operation = response.json().await?;
        Ok(operation)
    }

    async fn poll_operation(&self, operation: &Operation) -> Result<Operation, GeminiError> {
        if operation.name.is_empty() {
            return Err(GeminiError::InvalidResponse(
                "Operation has no name to poll".to_string(),
            ));
        }

        let url = self.operation_url(&operation.name);

        let response = self
            .http_client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let operation: Operation = response.json().await?;
        Ok(operation)
    }

    fn api_key(&self) -> &str {
        &self.api_key
    }

    fn set_api_key(&mut self, api_key: String) {
        self.api_key = api_key;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::types::{AspectRatio, Resolution};

    #[test]
    fn test_with_api_key_creates_client() {
        let client = GeminiClient::with_api_key("test-api-key".to_string()).unwrap();
        assert_eq!(VideoService::api_key(&client), "test-api-key");
        assert_eq!(client.base_url(), GEMINI_API_BASE_URL);
        assert_eq!(client.text_model(), DEFAULT_TEXT_MODEL);
        assert_eq!(client.video_model(), DEFAULT_VIDEO_MODEL);
    }

    #[test]
    fn test_with_api_key_empty_returns_error() {
        let result = GeminiClient::with_api_key("".to_string());
        assert!(matches!(result, Err(GeminiError::MissingApiKey)));
    }

    #[test]
    fn test_with_base_url_trims_trailing_slash() {
        let client =
            GeminiClient::with_base_url("k".to_string(), "http://localhost:1234/".to_string())
                .unwrap();
        assert_eq!(client.base_url(), "http://localhost:1234");
    }

    #[test]
    fn test_with_models_overrides_both() {
        let client = GeminiClient::with_api_key("k".to_string())
            .unwrap()
            .with_models("text-x".to_string(), "video-y".to_string());
        assert_eq!(client.text_model(), "text-x");
        assert_eq!(client.video_model(), "video-y");
    }

    #[test]
    fn test_model_and_operation_urls() {
        let client =
            GeminiClient::with_base_url("k".to_string(), "https://api.test".to_string()).unwrap();
        assert_eq!(
            client.model_url("veo-3.1-fast-generate-preview", "predictLongRunning"),
            "https://api.test/v1beta/models/veo-3.1-fast-generate-preview:predictLongRunning"
        );
        assert_eq!(
            client.operation_url("models/veo/operations/op1"),
            "https://api.test/v1beta/models/veo/operations/op1"
        );
    }

    #[test]
    fn test_predict_request_serialization() {
        let request = PredictRequest {
            instances: vec![PredictInstance {
                prompt: "a cat on a skateboard".to_string(),
            }],
            parameters: PredictParameters {
                aspect_ratio: AspectRatio::Portrait.as_str().to_string(),
                resolution: Resolution::FullHd.as_str().to_string(),
                sample_count: 1,
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["instances"][0]["prompt"], "a cat on a skateboard");
        assert_eq!(json["parameters"]["aspectRatio"], "9:16");
        assert_eq!(json["parameters"]["resolution"], "1080p");
        assert_eq!(json["parameters"]["sampleCount"], 1);
    }

    #[test]
    fn test_generate_content_request_omits_missing_mime_type() {
        let request = GenerateContentRequest {
            system_instruction: ContentBody {
                role: None,
                parts: vec![PartBody {
                    text: "sys".to_string(),
                }],
            },
            contents: vec![],
            generation_config: GenerationConfig {
                temperature: 0.5,
                response_mime_type: None,
            },
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"systemInstruction\""));
        assert!(!json.contains("responseMimeType"));
        assert!(!json.contains("\"role\""));
    }

    #[test]
    fn test_generate_content_response_joins_parts() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "{\"english\":"}, {"text": "\"hi\"}"}]}}
            ]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), "{\"english\":\"hi\"}");
    }

    #[test]
    fn test_generate_content_response_without_candidates_is_empty() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.text(), "");
    }

    #[test]
    fn test_operation_pending_deserialization() {
        let json = r#"{"name": "models/veo/operations/abc"}"#;
        let op: Operation = serde_json::from_str(json).unwrap();
        assert_eq!(op.name, "models/veo/operations/abc");
        assert!(!op.done);
        assert!(op.video_uri().is_none());
    }

    #[test]
    fn test_operation_rest_shape_video_uri() {
        let json = r#"{
            "name": "op",
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "generatedSamples": [{"video": {"uri": "https://files/v1?alt=media"}}]
                }
            }
        }"#;
        let op: Operation = serde_json::from_str(json).unwrap();
        assert_eq!(op.video_uri(), Some("https://files/v1?alt=media"));
    }

    #[test]
    fn test_operation_sdk_shape_video_uri() {
        let json = r#"{
            "name": "op",
            "done": true,
            "response": {"generatedVideos": [{"video": {"uri": "https://files/v2"}}]}
        }"#;
        let op: Operation = serde_json::from_str(json).unwrap();
        assert_eq!(op.video_uri(), Some("https://files/v2"));
    }

    #[test]
    fn test_operation_sample_without_video_falls_back() {
        let json = r#"{
            "name": "op",
            "done": true,
            "response": {
                "generateVideoResponse": {"generatedSamples": [{}]},
                "generatedVideos": [{"video": {"uri": "https://files/v3"}}]
            }
        }"#;
        let op: Operation = serde_json::from_str(json).unwrap();
        assert_eq!(op.video_uri(), Some("https://files/v3"));
    }

    #[test]
    fn test_partial_download_path_is_sibling() {
        let dest = Path::new("/tmp/videos/abc.mp4");
        assert_eq!(
            partial_download_path(dest),
            PathBuf::from("/tmp/videos/abc.mp4.part")
        );
    }

    #[test]
    fn test_operation_empty_uri_is_none() {
        let op = Operation::completed("op", "");
        assert!(op.video_uri().is_none());
    }

    #[test]
    fn test_operation_error_deserialization() {
        let json = r#"{
            "name": "op",
            "done": true,
            "error": {"code": 3, "message": "Prompt blocked"}
        }"#;
        let op: Operation = serde_json::from_str(json).unwrap();
        let error = op.error.unwrap();
        assert_eq!(error.code, Some(3));
        assert_eq!(error.message.as_deref(), Some("Prompt blocked"));
    }

    #[test]
    fn test_operation_helpers() {
        assert!(!Operation::pending("a").done);
        assert_eq!(Operation::completed("a", "u").video_uri(), Some("u"));
        let failed = Operation::failed("a", "boom");
        assert!(failed.done);
        assert_eq!(failed.error.unwrap().message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_poll_operation_without_name_is_rejected() {
        let client = GeminiClient::with_api_key("k".to_string()).unwrap();
        let result = client.poll_operation(&Operation::default()).await;
        assert!(matches!(result, Err(GeminiError::InvalidResponse(_))));
    }
}
