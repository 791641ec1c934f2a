//! Gemini and Veo integration.
//!
//! The prompt composer turns twelve cinematic fields into a bilingual prompt
//! through Gemini's text model. The job driver submits the English prompt to
//! Veo and polls the long-running operation until a video URI is available.
//! Downloaded videos can be kept in the on-disk library.

mod client;
mod compose;
mod driver;
mod error;
mod library;
mod types;

pub use client::{
    GenerateVideoResponse, GeminiClient, GeneratedVideo, Operation, OperationError,
    OperationResponse, TextRequest, TextService, VideoFile, VideoService, API_KEY_ENV,
    DEFAULT_TEXT_MODEL, DEFAULT_VIDEO_MODEL, GEMINI_API_BASE_URL, GEMINI_API_KEY_ENV,
    partial_download_path,
};
pub use compose::{
    BilingualPrompt, PromptComposer, PromptFields, DEFAULT_LANGUAGE, DEFAULT_TEMPERATURE,
};
pub use driver::{
    DriverOptions, JobStatus, VideoJob, VideoJobDriver, DEFAULT_POLL_INTERVAL, MSG_DREAMING,
    MSG_READY, MSG_RENDERING, MSG_SUBMITTING,
};
pub use error::{classify, ComposeError, ErrorKind, GeminiError, VideoError};
pub use library::{LibraryEntry, LibraryMetadata, VideoLibrary};
pub use types::{AspectRatio, Resolution, VideoRequest};
