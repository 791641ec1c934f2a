use clap::Parser;
use veo_director::cli::{self, Args, Command};

/// Load .env file before reading the API key.
///
/// Does not override existing environment variables.
fn load_env() {
    // dotenv::dotenv() returns Err if .env doesn't exist, which is fine
    let _ = dotenv::dotenv();
}

fn main() {
    load_env();
    env_logger::init();

    let args = Args::parse();
    let config = args.config.as_deref();

    let result = match args.command {
        Command::Compose {
            fields,
            export,
            json,
        } => cli::run_compose(config, &fields, export.as_deref(), json),
        Command::Generate {
            prompt,
            prompt_file,
            video,
        } => cli::run_generate(config, prompt, prompt_file.as_deref(), &video),
        Command::Direct {
            fields,
            video,
            export,
        } => cli::run_direct(config, &fields, &video, export.as_deref()),
        Command::Presets { category } => {
            cli::run_presets(category);
            Ok(())
        }
        Command::Library { action } => cli::run_library(config, action),
        Command::Config { action } => cli::handle_config_action(config, action),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
