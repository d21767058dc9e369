//! `birdscribe` - CLI for uploading and annotating bird photos.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;

use birdscribe::annotation::RandomAnnotations;
use birdscribe::capture::{
    CaptureSource, FileSource, RasterSurface, ScreenshotSource, SelectionOrigin, TriggerHandle,
};
use birdscribe::cli::output::{
    format_annotation, format_seed_report, format_state, format_status, format_upload,
    format_uploads,
};
use birdscribe::cli::{Cli, Command, ConfigCommand, OutputFormat, StatusPrinter, StderrAlerter};
use birdscribe::session::{Phase, SessionState};
use birdscribe::{init_logging, Backend, Config};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config_path = cli.config;
    match cli.command {
        Command::Upload(cmd) => {
            let origin = if cmd.drop {
                SelectionOrigin::Drop
            } else {
                SelectionOrigin::Picker
            };
            let source = FileSource::new(vec![cmd.file], origin);
            let backend = open_backend(config_path).await?;
            run_capture(&backend, &source, cmd.format, cli.quiet).await
        }
        Command::Capture(cmd) => {
            let source = ScreenshotSource::new(
                Arc::new(RasterSurface::new(cmd.surface)),
                Arc::new(TriggerHandle::new()),
            );
            let backend = open_backend(config_path).await?;
            run_capture(&backend, &source, cmd.format, cli.quiet).await
        }
        Command::List(cmd) => {
            let backend = open_backend(config_path).await?;
            let mut records = backend.uploads().list_uploads().await?;
            if let Some(limit) = cmd.limit {
                records.truncate(limit);
            }
            print!("{}", format_uploads(&records, cmd.format)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Show(cmd) => {
            let backend = open_backend(config_path).await?;
            match backend.uploads().get_upload(cmd.id).await? {
                Some(record) => {
                    print!("{}", ensure_newline(format_upload(&record, cmd.format)?));
                    Ok(ExitCode::SUCCESS)
                }
                None => bail!("no upload with id {}", cmd.id),
            }
        }
        Command::Seed => {
            let backend = open_backend(config_path).await?;
            let report = RandomAnnotations::new(backend.annotation_store())
                .ensure_seeded()
                .await?;
            print!("{}", format_seed_report(&report));
            Ok(ExitCode::SUCCESS)
        }
        Command::Annotate(cmd) => {
            let backend = open_backend(config_path).await?;
            let annotation = backend.annotation_provider().annotation().await;
            print!("{}", ensure_newline(format_annotation(&annotation, cmd.format)?));
            Ok(ExitCode::SUCCESS)
        }
        Command::Status(cmd) => {
            let backend = open_backend(config_path).await?;
            let status = backend.status().await?;
            print!("{}", ensure_newline(format_status(&status, cmd.json)?));
            Ok(ExitCode::SUCCESS)
        }
        // Works without a valid configuration.
        Command::Config(cmd) => handle_config(config_path, cmd),
    }
}

async fn open_backend(config_path: Option<PathBuf>) -> anyhow::Result<Backend> {
    let config = Config::load_from(config_path).context("loading configuration")?;
    Backend::from_config(&config)
        .await
        .context("opening backend")
}

async fn run_capture(
    backend: &Backend,
    source: &dyn CaptureSource,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<ExitCode> {
    let mut session = backend.session(Arc::new(StderrAlerter));
    if !quiet {
        session = session.with_listener(Arc::new(StatusPrinter));
    }

    let state = session.run(SessionState::default(), source).await;
    print!("{}", ensure_newline(format_state(&state, format)?));

    Ok(if state.phase == Phase::Settled {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn handle_config(path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<ExitCode> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(path)?.redacted();
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Backend]");
                println!("  Kind:               {:?}", config.backend.kind);
                println!();
                println!("[Local]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Bucket dir:         {}", config.bucket_dir().display());
                println!(
                    "  Public base URL:    {}",
                    config.local.public_base_url.as_deref().unwrap_or("(file://)")
                );
                println!();
                println!("[Hosted]");
                println!(
                    "  URL:                {}",
                    config.hosted.url.as_deref().unwrap_or("(unset)")
                );
                println!(
                    "  API key:            {}",
                    config.hosted.api_key.as_deref().unwrap_or("(unset)")
                );
                println!();
                println!("[Storage]");
                println!("  Bucket:             {}", config.storage.bucket);
                println!("  Cache-Control:      max-age={}", config.storage.cache_control_secs);
                println!();
                println!("[Annotations]");
                println!("  Strategy:           {}", config.annotations.strategy);
            }
        }
        ConfigCommand::Path => {
            println!(
                "{}",
                path.unwrap_or_else(Config::default_config_path).display()
            );
        }
        ConfigCommand::Validate { file } => {
            let path = file.or(path).unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => {
                    println!("Configuration error: {e}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn ensure_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
