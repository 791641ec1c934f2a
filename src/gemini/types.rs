//! Shared request settings for Veo video generation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output frame shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    /// Wire value sent to the video model.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "16:9" | "landscape" => Ok(AspectRatio::Landscape),
            "9:16" | "portrait" => Ok(AspectRatio::Portrait),
            other => Err(format!(
                "Unknown aspect ratio '{}'. Expected 16:9 or 9:16",
                other
            )),
        }
    }
}

/// Output resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "720p")]
    Hd,
    #[serde(rename = "1080p")]
    FullHd,
}

impl Resolution {
    /// Wire value sent to the video model.
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Hd => "720p",
            Resolution::FullHd => "1080p",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "720p" | "hd" => Ok(Resolution::Hd),
            "1080p" | "fhd" | "full-hd" => Ok(Resolution::FullHd),
            other => Err(format!(
                "Unknown resolution '{}'. Expected 720p or 1080p",
                other
            )),
        }
    }
}

/// A single video generation request: the English prompt plus its settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
}

impl VideoRequest {
    pub fn new(prompt: impl Into<String>, aspect_ratio: AspectRatio, resolution: Resolution) -> Self {
        Self {
            prompt: prompt.into(),
            aspect_ratio,
            resolution,
        }
    }
}
