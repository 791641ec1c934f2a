//! Caller-side state for one directing session.
//!
//! A `Session` owns the form fields, the composed prompt, the current video
//! job and whether a usable API key has been selected. It enforces the
//! rules the form used to enforce: a subject is required before composing,
//! only one video job runs at a time, and an auth failure forces a fresh key
//! selection before the next attempt.

use thiserror::Error;

use crate::credential::{CredentialError, CredentialProvider};
use crate::gemini::{
    AspectRatio, BilingualPrompt, ComposeError, PromptComposer, PromptFields, Resolution,
    TextService, VideoError, VideoJob, VideoJobDriver, VideoRequest, VideoService,
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Subject is required before composing a prompt")]
    MissingSubject,

    #[error("No prompt has been composed yet")]
    NoPrompt,

    #[error("A video is already being generated")]
    JobInFlight,

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("{}", .0.user_message())]
    Video(VideoError),
}

pub struct Session<T, V, C>
where
    T: TextService,
    V: VideoService,
    C: CredentialProvider,
{
    composer: PromptComposer<T>,
    driver: VideoJobDriver<V>,
    credentials: C,
    fields: PromptFields,
    prompt: Option<BilingualPrompt>,
    job: Option<VideoJob>,
    key_ready: bool,
}

impl<T, V, C> Session<T, V, C>
where
    T: TextService,
    V: VideoService,
    C: CredentialProvider,
{
    pub fn new(composer: PromptComposer<T>, driver: VideoJobDriver<V>, credentials: C) -> Self {
        let key_ready = credentials.has_key();
        Self {
            composer,
            driver,
            credentials,
            fields: PromptFields::default(),
            prompt: None,
            job: None,
            key_ready,
        }
    }

    pub fn fields(&self) -> &PromptFields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut PromptFields {
        &mut self.fields
    }

    pub fn set_fields(&mut self, fields: PromptFields) {
        self.fields = fields;
    }

    pub fn prompt(&self) -> Option<&BilingualPrompt> {
        self.prompt.as_ref()
    }

    /// Use an existing prompt pair instead of composing one.
    pub fn set_prompt(&mut self, prompt: BilingualPrompt) {
        self.prompt = Some(prompt);
    }

    pub fn job(&self) -> Option<&VideoJob> {
        self.job.as_ref()
    }

    pub fn key_ready(&self) -> bool {
        self.key_ready
    }

    pub fn composer(&self) -> &PromptComposer<T> {
        &self.composer
    }

    pub fn driver(&self) -> &VideoJobDriver<V> {
        &self.driver
    }

    /// Compose a new prompt pair from the current fields.
    ///
    /// On failure the previous prompt, if any, is kept.
    pub async fn compose(&mut self) -> Result<&BilingualPrompt, SessionError> {
        if !self.fields.has_subject() {
            return Err(SessionError::MissingSubject);
        }

        let prompt = self.composer.compose(&self.fields).await?;
        Ok(self.prompt.insert(prompt))
    }

    /// Replace the localized prompt text. The English text is untouched.
    pub fn edit_localized(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        let prompt = self.prompt.as_mut().ok_or(SessionError::NoPrompt)?;
        prompt.set_localized(text);
        Ok(())
    }

    /// Text export of the current prompt pair.
    pub fn export_text(&self) -> Option<String> {
        self.prompt
            .as_ref()
            .map(|p| p.export_text(self.composer.language()))
    }

    /// Forget a job that never reached a terminal state.
    pub fn discard_job(&mut self) {
        if let Some(job) = self.job.take() {
            log::info!("Discarding video job in state {:?}", job.status);
        }
    }

    /// Generate a video from the English prompt.
    ///
    /// Replaces any previous job. `on_progress` sees every job snapshot.
    pub async fn generate(
        &mut self,
        aspect_ratio: AspectRatio,
        resolution: Resolution,
        mut on_progress: impl FnMut(&VideoJob),
    ) -> Result<String, SessionError> {
        let english = self
            .prompt
            .as_ref()
            .ok_or(SessionError::NoPrompt)?
            .english()
            .to_string();

        if self.job.as_ref().is_some_and(|job| !job.is_terminal()) {
            return Err(SessionError::JobInFlight);
        }

        if !self.key_ready {
            let key = self.credentials.select_key()?;
            self.driver.service_mut().set_api_key(key);
            self.key_ready = true;
        }

        let request = VideoRequest::new(english, aspect_ratio, resolution);
        self.job = Some(VideoJob::new(&request));

        let Self { driver, job, .. } = self;
        let result = driver
            .generate(&request, |snapshot| {
                *job = Some(snapshot.clone());
                on_progress(snapshot);
            })
            .await;

        result.map_err(|err| {
            if err.is_auth() {
                log::warn!("Auth failure, key must be re-selected");
                self.key_ready = false;
            }
            SessionError::Video(err)
        })
    }
}
