//! CLI enum types for aspect ratio, resolution and preset category options.

use clap::ValueEnum;

use crate::gemini::{AspectRatio, Resolution};
use crate::presets::PresetCategory;

/// Output frame shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AspectArg {
    /// 16:9
    #[default]
    #[value(alias = "16:9")]
    Landscape,
    /// 9:16
    #[value(alias = "9:16")]
    Portrait,
}

impl From<AspectArg> for AspectRatio {
    fn from(a: AspectArg) -> Self {
        match a {
            AspectArg::Landscape => AspectRatio::Landscape,
            AspectArg::Portrait => AspectRatio::Portrait,
        }
    }
}

/// Output resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ResolutionArg {
    #[default]
    #[value(name = "720p", alias = "hd")]
    Hd,
    #[value(name = "1080p", alias = "fhd")]
    FullHd,
}

impl From<ResolutionArg> for Resolution {
    fn from(r: ResolutionArg) -> Self {
        match r {
            ResolutionArg::Hd => Resolution::Hd,
            ResolutionArg::FullHd => Resolution::FullHd,
        }
    }
}

/// Field with a preset list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresetArg {
    Time,
    Camera,
    Lighting,
    Style,
    Mood,
}

impl From<PresetArg> for PresetCategory {
    fn from(p: PresetArg) -> Self {
        match p {
            PresetArg::Time => PresetCategory::Time,
            PresetArg::Camera => PresetCategory::Camera,
            PresetArg::Lighting => PresetCategory::Lighting,
            PresetArg::Style => PresetCategory::Style,
            PresetArg::Mood => PresetCategory::Mood,
        }
    }
}
