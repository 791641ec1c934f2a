//! Subcommand handlers.
//!
//! Every handler returns `Result<(), String>`; `main` prints the error and
//! exits with status 1.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::args::{ConfigAction, FieldArgs, LibraryAction, VideoArgs};
use super::enums::PresetArg;
use crate::config::{default_path, Config};
use crate::credential::EnvCredentials;
use crate::gemini::{
    partial_download_path, AspectRatio, BilingualPrompt, GeminiClient, PromptComposer,
    PromptFields, Resolution, VideoJob, VideoJobDriver, VideoLibrary, VideoRequest,
    GEMINI_API_KEY_ENV, MSG_RENDERING,
};
use crate::presets::PresetCategory;
use crate::session::{Session, SessionError};

type GeminiSession = Session<GeminiClient, GeminiClient, EnvCredentials>;

/// Set by the Ctrl+C handler while a video is generating or downloading.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

const PROMPT_DISPLAY_CHARS: usize = 50;

/// Install the Ctrl+C handler that abandons an in-flight generation or download.
pub fn setup_ctrlc_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        INTERRUPTED.store(true, Ordering::SeqCst);
        eprintln!("\nReceived Ctrl+C, cancelling...");
    })
}

async fn wait_for_interrupt() {
    while !INTERRUPTED.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

/// Download `url` to `dest` unless `cancel` resolves first. A cancelled
/// download leaves nothing behind.
async fn download_until(
    client: &GeminiClient,
    url: &str,
    dest: &Path,
    cancel: impl std::future::Future<Output = ()>,
) -> Result<(), String> {
    tokio::select! {
        result = client.download_video(url, dest) => result
            .map(|_| ())
            .map_err(|e| format!("Failed to download video: {}", e)),
        _ = cancel => {
            let _ = tokio::fs::remove_file(partial_download_path(dest)).await;
            Err("Download cancelled".to_string())
        }
    }
}

/// Load config. An explicit path must exist; the default path falls back
/// to built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, String> {
    match path {
        Some(path) => Config::load_from_explicit(path.to_path_buf()).map_err(|e| e.to_string()),
        None => Ok(Config::load(None).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config file: {}", e);
            eprintln!("Using default settings.\n");
            Config::default()
        })),
    }
}

fn missing_key_message() -> String {
    format!(
        "{key} environment variable is not set.\n\n\
        Add your API key to a .env file:\n    \
            echo '{key}=your-api-key-here' >> .env\n\n\
        Or set it as an environment variable:\n    \
            export {key}=\"your-api-key-here\"\n\n\
        Veo requires a key from a GCP project with billing enabled.",
        key = GEMINI_API_KEY_ENV
    )
}

fn build_session(
    cfg: &Config,
    language: Option<&str>,
    video: &VideoArgs,
) -> Result<GeminiSession, String> {
    let credentials = EnvCredentials::with_fallback(cfg.api.api_key.clone());
    let key = credentials.current().ok_or_else(missing_key_message)?;

    let client = GeminiClient::with_base_url(key, cfg.api.base_url.clone())
        .map_err(|e| format!("Failed to create Gemini client: {}", e))?
        .with_models(cfg.compose.model.clone(), cfg.video.model.clone());

    let composer = PromptComposer::new(client.clone())
        .with_language(language.unwrap_or(cfg.compose.language.as_str()))
        .with_temperature(cfg.compose.temperature);

    let mut options = cfg.video.driver_options();
    if let Some(secs) = video.poll_interval {
        options.poll_interval = Duration::from_secs(secs.max(1));
    }
    if let Some(secs) = video.max_wait {
        options.max_wait = Some(Duration::from_secs(secs));
    }
    let driver = VideoJobDriver::with_options(client, options);

    Ok(Session::new(composer, driver, credentials))
}

fn read_fields_file(path: &Path) -> Result<PromptFields, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read fields file '{}': {}", path.display(), e))?;

    let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
    if is_json {
        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse fields file '{}': {}", path.display(), e))
    } else {
        toml::from_str(&content)
            .map_err(|e| format!("Failed to parse fields file '{}': {}", path.display(), e))
    }
}

/// Merge the fields file (if any) with flag values and resolve presets.
pub fn build_fields(args: &FieldArgs) -> Result<PromptFields, String> {
    let mut fields = match &args.fields {
        Some(path) => read_fields_file(path)?,
        None => PromptFields::default(),
    };

    let overrides = [
        (&mut fields.subject, &args.subject),
        (&mut fields.action, &args.action),
        (&mut fields.expression, &args.expression),
        (&mut fields.place, &args.place),
        (&mut fields.time, &args.time),
        (&mut fields.camera, &args.camera),
        (&mut fields.lighting, &args.lighting),
        (&mut fields.style, &args.style),
        (&mut fields.mood, &args.mood),
        (&mut fields.sound, &args.sound),
        (&mut fields.spoken_words, &args.spoken),
        (&mut fields.details, &args.details),
    ];
    for (slot, value) in overrides {
        if let Some(value) = value {
            *slot = value.clone();
        }
    }

    let presets = [
        (PresetCategory::Time, &mut fields.time),
        (PresetCategory::Camera, &mut fields.camera),
        (PresetCategory::Lighting, &mut fields.lighting),
        (PresetCategory::Style, &mut fields.style),
        (PresetCategory::Mood, &mut fields.mood),
    ];
    for (category, slot) in presets {
        let resolved = category.resolve(slot);
        *slot = resolved;
    }

    Ok(fields)
}

/// Read a prompt file: a compose export, or plain English text.
pub fn read_prompt_file(path: &Path) -> Result<BilingualPrompt, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read prompt file '{}': {}", path.display(), e))?;

    Ok(BilingualPrompt::from_export(&content).unwrap_or_else(|| {
        let text = content.trim();
        BilingualPrompt::new(text, text)
    }))
}

fn prompt_json(prompt: &BilingualPrompt, language: &str) -> Result<String, String> {
    let mut map = serde_json::Map::new();
    map.insert(
        language.to_lowercase(),
        serde_json::Value::String(prompt.localized().to_string()),
    );
    map.insert(
        "english".to_string(),
        serde_json::Value::String(prompt.english().to_string()),
    );
    serde_json::to_string_pretty(&serde_json::Value::Object(map))
        .map_err(|e| format!("Failed to render JSON: {}", e))
}

fn write_export(session: &GeminiSession, path: &Path) -> Result<(), String> {
    let text = session
        .export_text()
        .ok_or_else(|| SessionError::NoPrompt.to_string())?;
    std::fs::write(path, text)
        .map_err(|e| format!("Failed to write export '{}': {}", path.display(), e))?;
    eprintln!("Saved prompt text: {}", path.display());
    Ok(())
}

fn new_runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Runtime::new().map_err(|e| format!("Failed to create async runtime: {}", e))
}

fn compose_into(rt: &tokio::runtime::Runtime, session: &mut GeminiSession) -> Result<(), String> {
    eprint!("Optimizing prompt... ");
    std::io::stderr().flush().ok();
    rt.block_on(session.compose()).map_err(|e| {
        eprintln!("failed");
        e.to_string()
    })?;
    eprintln!("done");
    Ok(())
}

/// Run the compose command.
pub fn run_compose(
    config_path: Option<&Path>,
    fields: &FieldArgs,
    export: Option<&Path>,
    json: bool,
) -> Result<(), String> {
    let cfg = load_config(config_path)?;
    let prompt_fields = build_fields(fields)?;
    if !prompt_fields.has_subject() {
        return Err(format!(
            "{}. Pass --subject or a --fields file with a subject.",
            SessionError::MissingSubject
        ));
    }

    let mut session = build_session(&cfg, fields.language.as_deref(), &VideoArgs::default())?;
    session.set_fields(prompt_fields);

    let rt = new_runtime()?;
    compose_into(&rt, &mut session)?;

    let prompt = session
        .prompt()
        .ok_or_else(|| SessionError::NoPrompt.to_string())?;
    if json {
        println!("{}", prompt_json(prompt, session.composer().language())?);
    } else {
        println!("{}", prompt.export_text(session.composer().language()));
    }

    if let Some(path) = export {
        write_export(&session, path)?;
    }
    Ok(())
}

/// Run the generate command for a ready-made English prompt.
pub fn run_generate(
    config_path: Option<&Path>,
    prompt: Option<String>,
    prompt_file: Option<&Path>,
    video: &VideoArgs,
) -> Result<(), String> {
    let cfg = load_config(config_path)?;
    let prompt = match (prompt, prompt_file) {
        (Some(text), _) => BilingualPrompt::new(text.clone(), text),
        (None, Some(path)) => read_prompt_file(path)?,
        (None, None) => return Err("Either a prompt or --prompt-file must be provided".to_string()),
    };

    let mut session = build_session(&cfg, None, video)?;
    session.set_prompt(prompt);

    let rt = new_runtime()?;
    render(&rt, &cfg, &mut session, video)
}

/// Run the direct command: compose, then render.
pub fn run_direct(
    config_path: Option<&Path>,
    fields: &FieldArgs,
    video: &VideoArgs,
    export: Option<&Path>,
) -> Result<(), String> {
    let cfg = load_config(config_path)?;
    let prompt_fields = build_fields(fields)?;
    if !prompt_fields.has_subject() {
        return Err(format!(
            "{}. Pass --subject or a --fields file with a subject.",
            SessionError::MissingSubject
        ));
    }

    let mut session = build_session(&cfg, fields.language.as_deref(), video)?;
    session.set_fields(prompt_fields);

    let rt = new_runtime()?;
    compose_into(&rt, &mut session)?;

    if let Some(text) = session.export_text() {
        println!("{}", text);
        println!();
    }
    if let Some(path) = export {
        write_export(&session, path)?;
    }

    render(&rt, &cfg, &mut session, video)
}

/// Prints phase changes on their own line and a dot per poll tick.
fn progress_printer() -> impl FnMut(&VideoJob) {
    let mut last = String::new();
    move |job: &VideoJob| {
        let ticking = last == MSG_RENDERING;
        if job.is_terminal() {
            if ticking {
                println!();
            }
            return;
        }

        if job.progress_message == last {
            print!(".");
        } else {
            if ticking {
                println!();
            }
            if job.progress_message == MSG_RENDERING {
                print!("{}", job.progress_message);
            } else {
                println!("{}", job.progress_message);
            }
            last = job.progress_message.clone();
        }
        std::io::stdout().flush().ok();
    }
}

fn library_for(cfg: &Config) -> VideoLibrary {
    VideoLibrary::new(
        cfg.library
            .dir
            .clone()
            .unwrap_or_else(VideoLibrary::default_dir),
    )
}

fn copy_to(src: &Path, dest: &Path) -> Result<(), String> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create '{}': {}", parent.display(), e))?;
    }
    std::fs::copy(src, dest)
        .map_err(|e| format!("Failed to copy video to '{}': {}", dest.display(), e))?;
    Ok(())
}

/// Generate the session's English prompt and deliver the result.
fn render(
    rt: &tokio::runtime::Runtime,
    cfg: &Config,
    session: &mut GeminiSession,
    video: &VideoArgs,
) -> Result<(), String> {
    let aspect_ratio = video
        .aspect
        .map(AspectRatio::from)
        .unwrap_or(cfg.video.aspect_ratio);
    let resolution = video
        .resolution
        .map(Resolution::from)
        .unwrap_or(cfg.video.resolution);

    let english = session
        .prompt()
        .map(|p| p.english().to_string())
        .ok_or_else(|| SessionError::NoPrompt.to_string())?;
    let request = VideoRequest::new(english, aspect_ratio, resolution);
    let library = library_for(cfg);

    if video.reuse {
        if let Some(path) = library.get(&request) {
            println!("Found in library: {}", path.display());
            println!("Hash: {}", VideoLibrary::hash_request(&request));
            if let Some(output) = &video.output {
                copy_to(&path, output)?;
                println!("Copied to: {}", output.display());
            }
            return Ok(());
        }
    }

    setup_ctrlc_handler().map_err(|e| format!("Failed to set Ctrl+C handler: {}", e))?;

    println!("Generating {} {} video", aspect_ratio, resolution);

    rt.block_on(async {
        let outcome = tokio::select! {
            result = session.generate(aspect_ratio, resolution, progress_printer()) => Some(result),
            _ = wait_for_interrupt() => None,
        };

        let locator = match outcome {
            Some(result) => result.map_err(|e| e.to_string())?,
            None => {
                session.discard_job();
                return Err("Generation cancelled".to_string());
            }
        };

        println!();
        println!("Video ready!");
        println!("  URI: {}", locator);

        let client = session.driver().service();
        if video.save {
            let path = library.path_for(&request);
            print!("Downloading video... ");
            std::io::stdout().flush().ok();
            download_until(client, &locator, &path, wait_for_interrupt()).await?;
            library
                .store(&request, &path)
                .map_err(|e| format!("Failed to save video: {}", e))?;
            println!("done");

            if let Err(e) = library.cleanup_if_needed(cfg.library.max_size_mb) {
                log::warn!("Library cleanup failed: {}", e);
            }

            println!("  Saved: {}", path.display());
            println!("  Hash: {}", VideoLibrary::hash_request(&request));
            if let Some(output) = &video.output {
                copy_to(&path, output)?;
                println!("  Path: {}", output.display());
            }
        } else if let Some(output) = &video.output {
            print!("Downloading video... ");
            std::io::stdout().flush().ok();
            download_until(client, &locator, output, wait_for_interrupt()).await?;
            println!("done");
            println!("  Path: {}", output.display());
        }

        Ok(())
    })
}

/// List presets for one field or all of them.
pub fn run_presets(category: Option<PresetArg>) {
    let categories: Vec<PresetCategory> = match category {
        Some(c) => vec![c.into()],
        None => PresetCategory::ALL.to_vec(),
    };

    for (i, category) in categories.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{} (--{} <number or name>):", category, category);
        for (n, preset) in category.options().iter().enumerate() {
            println!("  {:>2}. {}", n + 1, preset.label);
        }
    }
}

/// Format bytes as human-readable string (KB, MB, GB)
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn truncate_prompt(prompt: &str) -> String {
    if prompt.chars().count() > PROMPT_DISPLAY_CHARS {
        let head: String = prompt.chars().take(PROMPT_DISPLAY_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        prompt.to_string()
    }
}

/// Run the library subcommand.
pub fn run_library(config_path: Option<&Path>, action: LibraryAction) -> Result<(), String> {
    let cfg = load_config(config_path)?;
    let library = library_for(&cfg);

    match action {
        LibraryAction::List => {
            let entries = library
                .list_entries()
                .map_err(|e| format!("Failed to list library: {}", e))?;

            if entries.is_empty() {
                println!("Library is empty.");
                return Ok(());
            }

            println!("Stored videos:\n");
            for entry in &entries {
                let (settings, prompt) = match &entry.metadata {
                    Some(meta) => (
                        format!("{} {}", meta.aspect_ratio, meta.resolution),
                        truncate_prompt(&meta.prompt),
                    ),
                    None => ("?".to_string(), "(no prompt data)".to_string()),
                };
                println!(
                    "  {} {} {} \"{}\"",
                    entry.hash,
                    format_size(entry.size_bytes),
                    settings,
                    prompt
                );
            }

            let total_size = library
                .total_size_bytes()
                .map_err(|e| format!("Failed to calculate total size: {}", e))?;
            println!("\nTotal: {} videos, {}", entries.len(), format_size(total_size));
        }
        LibraryAction::Clear { hash } => match hash {
            Some(h) => {
                let removed = library
                    .remove(&h)
                    .map_err(|e| format!("Failed to remove video: {}", e))?;
                if removed {
                    println!("Removed video: {}", h);
                } else {
                    println!("No video found with hash: {}", h);
                }
            }
            None => {
                let count = library
                    .clear_all()
                    .map_err(|e| format!("Failed to clear library: {}", e))?;
                if count == 0 {
                    println!("Library is already empty.");
                } else {
                    println!(
                        "Removed {} video{}.",
                        count,
                        if count == 1 { "" } else { "s" }
                    );
                }
            }
        },
        LibraryAction::Path => {
            println!("{}", library.dir().display());
        }
    }
    Ok(())
}

/// Handle config subcommand actions.
pub fn handle_config_action(config_path: Option<&Path>, action: ConfigAction) -> Result<(), String> {
    let path: PathBuf = config_path.map(Path::to_path_buf).unwrap_or_else(default_path);

    match action {
        ConfigAction::Show => {
            let cfg = load_config(config_path)?;
            println!("Current configuration:\n");
            println!("{}", cfg.to_toml().map_err(|e| e.to_string())?);

            let key_state = if EnvCredentials::with_fallback(cfg.api.api_key.clone())
                .current()
                .is_some()
            {
                "found"
            } else {
                "not found"
            };
            println!("API key: {}", key_state);

            if path.exists() {
                println!("Config file: {} (exists)", path.display());
            } else {
                println!("Config file: {} (not found)", path.display());
            }
        }
        ConfigAction::Init => {
            Config::write_default(&path).map_err(|e| {
                format!(
                    "{}\nUse 'veo-director config show' to view current settings.",
                    e
                )
            })?;
            println!("Created config file: {}", path.display());
        }
    }
    Ok(())
}
