//! Prompt composition: twelve cinematic fields in, bilingual prompt out.

use serde::{Deserialize, Serialize};

use super::client::{TextRequest, TextService};
use super::error::{ComposeError, GeminiError};

/// Default source language of the narrative prompt.
pub const DEFAULT_LANGUAGE: &str = "Indonesian";

/// Default sampling temperature for composition.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Fixed user turn sent alongside the system instruction.
const USER_TURN: &str = "Generate the dual-language prompts now based on the instructions.";

const JSON_MIME_TYPE: &str = "application/json";

const EXPORT_HEADER: &str = "--- VEO 3 PROMPT GENERATOR ---";
const EXPORT_ENGLISH_MARKER: &str = "\n\n[ENGLISH PROMPT (FINAL)]\n";

/// The twelve cinematic description fields.
///
/// Everything except `subject` may be left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptFields {
    pub subject: String,
    pub action: String,
    pub expression: String,
    pub place: String,
    pub time: String,
    pub camera: String,
    pub lighting: String,
    pub style: String,
    pub mood: String,
    pub sound: String,
    pub spoken_words: String,
    pub details: String,
}

impl PromptFields {
    /// Presence check that gates composition.
    pub fn has_subject(&self) -> bool {
        !self.subject.trim().is_empty()
    }

    /// Fields in form order, paired with their display labels.
    pub fn labeled(&self) -> [(&'static str, &str); 12] {
        [
            ("Subject", self.subject.as_str()),
            ("Action", self.action.as_str()),
            ("Expression", self.expression.as_str()),
            ("Place", self.place.as_str()),
            ("Time", self.time.as_str()),
            ("Camera", self.camera.as_str()),
            ("Lighting", self.lighting.as_str()),
            ("Style", self.style.as_str()),
            ("Mood", self.mood.as_str()),
            ("Sound/Music", self.sound.as_str()),
            ("Spoken Words", self.spoken_words.as_str()),
            ("Additional Details", self.details.as_str()),
        ]
    }
}

/// Localized narrative prompt plus its English counterpart.
///
/// The localized text may be edited in place. The English text only changes
/// through a fresh composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilingualPrompt {
    localized: String,
    english: String,
}

impl BilingualPrompt {
    pub fn new(localized: impl Into<String>, english: impl Into<String>) -> Self {
        Self {
            localized: localized.into(),
            english: english.into(),
        }
    }

    pub fn localized(&self) -> &str {
        &self.localized
    }

    pub fn english(&self) -> &str {
        &self.english
    }

    /// Replace the localized text. The English text is left alone.
    pub fn set_localized(&mut self, text: impl Into<String>) {
        self.localized = text.into();
    }

    /// Plain-text export of both prompts.
    pub fn export_text(&self, language: &str) -> String {
        format!(
            "{}\n\n[{} PROMPT]\n{}{}{}",
            EXPORT_HEADER,
            language.to_uppercase(),
            self.localized,
            EXPORT_ENGLISH_MARKER,
            self.english
        )
    }

    /// Read back a pair written by [`export_text`](Self::export_text).
    pub fn from_export(text: &str) -> Option<Self> {
        let body = text.trim_start().strip_prefix(EXPORT_HEADER)?;
        let (localized_part, english) = body.split_once(EXPORT_ENGLISH_MARKER)?;
        let (label, localized) = localized_part.trim_start_matches('\n').split_once('\n')?;
        if !(label.starts_with('[') && label.ends_with(" PROMPT]")) {
            return None;
        }
        Some(Self::new(localized, english.trim_end_matches('\n')))
    }
}

/// Builds bilingual prompts through a hosted text model.
pub struct PromptComposer<T: TextService> {
    service: T,
    language: String,
    temperature: f32,
}

impl<T: TextService> PromptComposer<T> {
    pub fn new(service: T) -> Self {
        Self {
            service,
            language: DEFAULT_LANGUAGE.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Set the source language of the narrative prompt.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn service(&self) -> &T {
        &self.service
    }

    /// JSON key the model must use for the localized text.
    fn language_key(&self) -> String {
        self.language.to_lowercase()
    }

    /// Build the system instruction with every field embedded verbatim.
    pub fn build_instruction(&self, fields: &PromptFields) -> String {
        let language = &self.language;
        let key = self.language_key();

        let mut inputs = String::new();
        for (i, (label, value)) in fields.labeled().iter().enumerate() {
            inputs.push_str(&format!("  {}. {}: {}\n", i + 1, label, value));
        }

        format!(
            "You are a specialized prompt engineer for Google Veo 3 video generation.

  Your task is to take 12 user inputs and generate TWO versions of a high-quality video generation prompt:
  1. **{language} Version**: A creative, detailed, and expanded paragraph in {language}.
  2. **English Version**: A translation of the detailed {language} prompt into English, optimized for the Veo 3 model.

  ### Critical Rules for English Version:
  - Translate all descriptions (Subject, Action, Place, etc.) into descriptive English.
  - **EXCEPTION**: The content of the \"Spoken Words\" input MUST remain in its ORIGINAL language. Do not translate the spoken text in either version.
  - Structure: \"[Camera Movement] of [Subject] [Action] with [Expression] in [Place] at [Time]. [Lighting], [Style], [Mood]. [Details]. Sound: [Sound]. Character says: '[Spoken Words]'.\"

  ### User Inputs:
{inputs}
  Output strictly in JSON format: {{ \"{key}\": \"string\", \"english\": \"string\" }}"
        )
    }

    /// Turn the raw model text into a prompt pair.
    ///
    /// Unparseable text is used verbatim for both languages so the user
    /// always has something to edit.
    pub fn parse_response(&self, text: &str) -> BilingualPrompt {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Composer response was not valid JSON ({}), using raw text", e);
                return BilingualPrompt::new(text, text);
            }
        };

        let pick = |key: &str| {
            value
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        if !value.is_object() {
            log::warn!("Composer response was JSON but not an object, using raw text");
            return BilingualPrompt::new(text, text);
        }

        BilingualPrompt::new(
            pick(&self.language_key())
                .unwrap_or_else(|| format!("Failed to generate {} prompt.", self.language)),
            pick("english").unwrap_or_else(|| "Failed to generate English prompt.".to_string()),
        )
    }

    /// Compose a bilingual prompt from the form fields.
    ///
    /// One outbound call, no retries.
    pub async fn compose(&self, fields: &PromptFields) -> Result<BilingualPrompt, ComposeError> {
        let request = TextRequest {
            system_instruction: self.build_instruction(fields),
            contents: USER_TURN.to_string(),
            temperature: self.temperature,
            response_mime_type: Some(JSON_MIME_TYPE.to_string()),
        };

        let text = self.service.generate_text(&request).await.map_err(|e| {
            log::error!("Error optimizing prompt: {}", e);
            ComposeError::from(e)
        })?;

        if text.trim().is_empty() {
            log::error!("Error optimizing prompt: empty response");
            return Err(GeminiError::InvalidResponse("No response from AI".to_string()).into());
        }

        Ok(self.parse_response(&text))
    }
}
