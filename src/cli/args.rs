//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::enums::{AspectArg, PresetArg, ResolutionArg};

/// Compose bilingual Veo 3 prompts and generate videos from them
#[derive(Parser, Debug)]
#[command(name = "veo-director")]
#[command(version, about = "Cinematic prompt composer and Veo video generator")]
#[command(long_about = "Turn twelve cinematic description fields into a bilingual \
    (Indonesian + English) Veo 3 prompt with Gemini, then render it with Veo \
    and download the result.")]
#[command(after_help = "EXAMPLES:
    # Compose a prompt from a few fields
    veo-director compose -s \"an old fisherman\" --place \"a misty harbor\" --camera 15

    # Generate a video from an English prompt
    veo-director generate \"A lighthouse at dusk, slow dolly in\" -o lighthouse.mp4

    # Compose and render in one go, portrait 1080p
    veo-director direct -s \"a street dancer\" --aspect 9:16 -r 1080p --save

    # Show the camera movement presets
    veo-director presets camera

The API key is read from GEMINI_API_KEY or API_KEY (a .env file works too).")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
}

/// The twelve prompt fields. Time, camera, lighting, style and mood accept a
/// preset number or name as well as free text.
#[derive(clap::Args, Debug, Clone, Default, PartialEq)]
pub struct FieldArgs {
    /// Main subject (required)
    #[arg(long, short)]
    pub subject: Option<String>,

    /// What the subject is doing
    #[arg(long)]
    pub action: Option<String>,

    /// Facial expression or emotion
    #[arg(long)]
    pub expression: Option<String>,

    /// Location
    #[arg(long)]
    pub place: Option<String>,

    /// Time of day
    #[arg(long)]
    pub time: Option<String>,

    /// Camera movement
    #[arg(long)]
    pub camera: Option<String>,

    #[arg(long)]
    pub lighting: Option<String>,

    /// Visual style
    #[arg(long)]
    pub style: Option<String>,

    #[arg(long)]
    pub mood: Option<String>,

    /// Sound or music
    #[arg(long)]
    pub sound: Option<String>,

    /// Spoken line, kept in its original language
    #[arg(long)]
    pub spoken: Option<String>,

    /// Additional details
    #[arg(long)]
    pub details: Option<String>,

    /// Load fields from a TOML or JSON file (flags override it)
    #[arg(long, value_name = "FILE")]
    pub fields: Option<PathBuf>,

    /// Source language of the narrative prompt (default from config)
    #[arg(long)]
    pub language: Option<String>,
}

/// Video output options shared by generate and direct.
#[derive(clap::Args, Debug, Clone, Default, PartialEq)]
pub struct VideoArgs {
    /// Aspect ratio (landscape/16:9, portrait/9:16)
    #[arg(long)]
    pub aspect: Option<AspectArg>,

    /// Resolution
    #[arg(long, short)]
    pub resolution: Option<ResolutionArg>,

    /// Download the finished video to this path
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Keep the finished video in the local library
    #[arg(long)]
    pub save: bool,

    /// Use a library video for the same prompt and settings if present
    #[arg(long)]
    pub reuse: bool,

    /// Seconds between status polls
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Give up after this many seconds (default: wait indefinitely)
    #[arg(long, value_name = "SECS")]
    pub max_wait: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compose a bilingual prompt from the prompt fields
    #[command(after_help = "EXAMPLES:
    veo-director compose -s \"a red fox\" --time 1 --style \"Anime (Anime)\"
    veo-director compose --fields scene.toml --export prompt.txt
    veo-director compose -s \"a red fox\" --json")]
    Compose {
        #[command(flatten)]
        fields: FieldArgs,

        /// Write the text export to this file
        #[arg(long, short, value_name = "FILE")]
        export: Option<PathBuf>,

        /// Print the prompts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a video from an English prompt
    #[command(after_help = "EXAMPLES:
    veo-director generate \"A koi pond in the rain, macro shot\"
    veo-director generate --prompt-file prompt.txt --aspect portrait -o koi.mp4")]
    Generate {
        /// English prompt text
        #[arg(required_unless_present = "prompt_file", conflicts_with = "prompt_file")]
        prompt: Option<String>,

        /// Read the prompt from a file (plain text or a compose export)
        #[arg(long, value_name = "FILE")]
        prompt_file: Option<PathBuf>,

        #[command(flatten)]
        video: VideoArgs,
    },

    /// Compose a prompt and generate its video
    Direct {
        #[command(flatten)]
        fields: FieldArgs,

        #[command(flatten)]
        video: VideoArgs,

        /// Write the text export to this file
        #[arg(long, short, value_name = "FILE")]
        export: Option<PathBuf>,
    },

    /// List preset values for the constrained fields
    Presets {
        /// Only this field (all fields if omitted)
        category: Option<PresetArg>,
    },

    /// Manage locally stored videos
    Library {
        #[command(subcommand)]
        action: LibraryAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum LibraryAction {
    /// List stored videos with prompts and sizes
    List,
    /// Remove stored videos (all or by hash)
    Clear {
        /// Specific video hash to remove (removes all if not provided)
        hash: Option<String>,
    },
    /// Print the library directory
    Path,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}
