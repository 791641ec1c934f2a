//! VideoJobDriver - submits a Veo job and polls it to a terminal state.
//!
//! The driver keeps no state between calls. Each `generate` call builds a
//! fresh [`VideoJob`] and hands a snapshot of it to the caller's progress
//! sink on every phase transition and poll tick.

use std::time::Duration;

use tokio::time::Instant;

use super::client::VideoService;
use super::error::{classify, VideoError};
use super::types::{AspectRatio, Resolution, VideoRequest};

/// Default interval between status polls (5 seconds).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub const MSG_SUBMITTING: &str = "Initializing generation request...";
pub const MSG_DREAMING: &str = "Veo 3 is dreaming up your video...";
pub const MSG_RENDERING: &str = "Rendering frames...";
pub const MSG_READY: &str = "Video ready.";

const MSG_GENERATION_FAILED: &str = "Video generation failed.";
const MSG_NO_RESULT: &str = "No video URI returned from API.";

/// Lifecycle state of a video job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Creation call in flight.
    Pending,
    /// Job accepted, waiting on the upstream render.
    Polling,
    Succeeded,
    Failed,
}

/// Snapshot of one generation attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoJob {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    pub status: JobStatus,
    /// Latest human-readable status line.
    pub progress_message: String,
    /// Only set once the job succeeded.
    pub result_uri: Option<String>,
    /// Only set once the job failed.
    pub error: Option<VideoError>,
    /// Completed poll ticks so far.
    pub polls: u32,
}

impl VideoJob {
    pub fn new(request: &VideoRequest) -> Self {
        Self {
            prompt: request.prompt.clone(),
            aspect_ratio: request.aspect_ratio,
            resolution: request.resolution,
            status: JobStatus::Pending,
            progress_message: String::new(),
            result_uri: None,
            error: None,
            polls: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// Tuning knobs for the poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOptions {
    pub poll_interval: Duration,
    /// Give up after this long. `None` polls until the upstream finishes.
    pub max_wait: Option<Duration>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: None,
        }
    }
}

/// Drives a single video generation job from submission to result.
pub struct VideoJobDriver<V: VideoService> {
    service: V,
    options: DriverOptions,
}

impl<V: VideoService> VideoJobDriver<V> {
    pub fn new(service: V) -> Self {
        Self::with_options(service, DriverOptions::default())
    }

    pub fn with_options(service: V, options: DriverOptions) -> Self {
        Self { service, options }
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    pub fn service(&self) -> &V {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut V {
        &mut self.service
    }

    /// Generate a video and return its authenticated download URI.
    ///
    /// `on_progress` sees every state change, including the terminal one.
    /// Polling is unbounded unless `max_wait` is set. There is no retry.
    ///
    /// # Errors
    ///
    /// Returns a classified `VideoError` for transport failures, upstream
    /// job errors, and jobs that finish without a video.
    pub async fn generate(
        &self,
        request: &VideoRequest,
        mut on_progress: impl FnMut(&VideoJob),
    ) -> Result<String, VideoError> {
        let mut job = VideoJob::new(request);

        match self.run(request, &mut job, &mut on_progress).await {
            Ok(uri) => {
                log::info!("Video generation complete after {} polls", job.polls);
                job.status = JobStatus::Succeeded;
                job.result_uri = Some(uri.clone());
                job.progress_message = MSG_READY.to_string();
                on_progress(&job);
                Ok(uri)
            }
            Err(err) => {
                log::error!("Veo generation error: {}", err);
                job.status = JobStatus::Failed;
                job.progress_message = err.user_message();
                job.error = Some(err.clone());
                on_progress(&job);
                Err(err)
            }
        }
    }

    /// Like [`generate`](Self::generate), reporting progress as plain messages.
    pub async fn generate_with(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        resolution: Resolution,
        mut on_progress: impl FnMut(&str),
    ) -> Result<String, VideoError> {
        let request = VideoRequest::new(prompt, aspect_ratio, resolution);
        self.generate(&request, |job| on_progress(job.progress_message.as_str()))
            .await
    }

    async fn run(
        &self,
        request: &VideoRequest,
        job: &mut VideoJob,
        on_progress: &mut dyn FnMut(&VideoJob),
    ) -> Result<String, VideoError> {
        if request.prompt.trim().is_empty() {
            return Err(VideoError::Validation(
                "Prompt must not be empty.".to_string(),
            ));
        }

        job.progress_message = MSG_SUBMITTING.to_string();
        on_progress(job);

        log::info!(
            "Submitting video generation ({}, {})",
            request.aspect_ratio,
            request.resolution
        );
        let mut operation = self.service.create_video(request).await?;
        log::info!("Generation submitted, operation: {}", operation.name);

        job.status = JobStatus::Polling;
        job.progress_message = MSG_DREAMING.to_string();
        on_progress(job);

        let started = Instant::now();
        while !operation.done {
            if let Some(max_wait) = self.options.max_wait {
                if started.elapsed() >= max_wait {
                    return Err(VideoError::Unknown(format!(
                        "Video generation timed out after {} seconds.",
                        max_wait.as_secs()
                    )));
                }
            }

            tokio::time::sleep(self.options.poll_interval).await;

            job.polls += 1;
            job.progress_message = MSG_RENDERING.to_string();
            on_progress(job);

            log::debug!("Polling operation {} (tick {})", operation.name, job.polls);
            operation = self.service.poll_operation(&operation).await?;
        }

        if let Some(error) = operation.error.as_ref() {
            let message = error
                .message
                .as_deref()
                .filter(|m| !m.is_empty())
                .unwrap_or(MSG_GENERATION_FAILED);
            return Err(classify(message));
        }

        let uri = operation.video_uri().ok_or_else(|| classify(MSG_NO_RESULT))?;

        Ok(format!("{}&key={}", uri, self.service.api_key()))
    }
}
