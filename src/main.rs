use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use yt_transcripts::captions::youtube::YoutubeCaptions;
use yt_transcripts::cli::{Cli, Commands};
use yt_transcripts::config::{self, Config};
use yt_transcripts::playlist::youtube::YoutubeDataApi;
use yt_transcripts::{output, utils, FetcherError, PlaceholderDocsSink, PlaylistProcessor};

type Processor = PlaylistProcessor<YoutubeDataApi, YoutubeCaptions, PlaceholderDocsSink>;

/// Rotated log files kept next to the current one
const KEPT_LOG_FILES: usize = 3;

/// Returns the guard of the file writer, which must live until exit so
/// buffered lines get flushed.
fn init_tracing(cli: &Cli, config: &Config) -> Result<Option<WorkerGuard>> {
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.app.log_level.trim().to_lowercase()
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("yt_transcripts={level}").into());

    let (file_writer, guard) = match &config.app.log_file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(log_file_appender(path)?);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter);
    if config.app.log_format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(file_writer.map(|writer| fmt::layer().json().with_writer(writer)))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(file_writer.map(|writer| fmt::layer().with_ansi(false).with_writer(writer)))
            .init();
    }

    Ok(guard)
}

fn log_file_appender(path: &Path) -> Result<RollingFileAppender> {
    let name = path
        .file_name()
        .with_context(|| format!("Log file has no file name: {}", path.display()))?;
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs_err::create_dir_all(dir)?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(name.to_string_lossy().into_owned())
        .max_log_files(KEPT_LOG_FILES)
        .build(dir)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

fn build_processor(config: &Config, quiet: bool) -> Result<Processor> {
    if !config.has_api_key() {
        return Err(FetcherError::MissingApiKey.into());
    }

    Ok(PlaylistProcessor::new(
        YoutubeDataApi::new(&config.youtube),
        YoutubeCaptions::new(&config.youtube),
        PlaceholderDocsSink::new(&config.app),
        config,
    )
    .with_progress(!quiet))
}

fn init_config(explicit: Option<&Path>) -> Result<()> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => Config::default_config_path()?,
    };
    if path.exists() {
        anyhow::bail!("Config file already exists: {}", path.display());
    }

    Config::default().save(&path)?;
    println!("Default configuration written to: {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Runs before loading since the file usually does not exist yet
    if let Commands::Config { init: true, .. } = cli.command {
        return init_config(cli.config.as_deref());
    }

    let dotenv_loaded = config::load_dotenv(Path::new(".env"))?;
    let config = Config::load(cli.config.as_deref())?;
    let _log_guard = init_tracing(&cli, &config)?;

    if dotenv_loaded {
        tracing::debug!("Loaded environment from .env");
    }
    match &config.source {
        Some(path) => tracing::debug!("Configuration loaded from {}", path.display()),
        None => tracing::debug!("No config file found, using defaults"),
    }

    match cli.command {
        Commands::Run {
            ref playlists,
            limit,
            ref format,
            output: ref output_path,
        } => {
            let inputs = if playlists.is_empty() {
                config.app.playlists.clone()
            } else {
                playlists.clone()
            };
            if inputs.is_empty() {
                return Err(FetcherError::NoPlaylists.into());
            }

            let playlist_ids = inputs
                .iter()
                .map(|input| utils::extract_playlist_id(input))
                .collect::<Result<Vec<_>, _>>()?;

            let mut processor = build_processor(&config, cli.quiet)?;
            if limit.is_some() {
                processor = processor.with_max_videos(limit);
            }

            tracing::info!(
                "Starting transcript collection for {} playlists",
                playlist_ids.len()
            );
            let run = processor.process_playlists(&playlist_ids).await;

            let content = output::format_run(&run, format)?;
            match output_path {
                Some(path) => {
                    output::save_to_file(&content, path).await?;
                    println!("Report saved to: {}", path.display());
                }
                None => output::print_to_console(&content),
            }

            if run.has_failures() {
                anyhow::bail!(
                    "{} of {} playlists could not be listed",
                    run.failures.len(),
                    playlist_ids.len()
                );
            }
        }
        Commands::List { ref playlist } => {
            let playlist_id = utils::extract_playlist_id(playlist)?;
            let processor = build_processor(&config, cli.quiet)?;

            let video_ids = processor
                .enumerator()
                .list_members(&playlist_id)
                .await
                .with_context(|| format!("Failed to list playlist {}", playlist_id))?;

            for video_id in video_ids {
                println!("{}", video_id);
            }
        }
        Commands::Transcript { ref video, ref format } => {
            let video_id = utils::extract_video_id(video)?;
            let resolver = yt_transcripts::TranscriptResolver::new(
                YoutubeCaptions::new(&config.youtube),
                &config.youtube,
            );

            let transcript = resolver.resolve(&video_id).await;
            let content = output::format_transcript(&video_id, &transcript, format)?;
            output::print_to_console(&content);
        }
        Commands::Config { show, .. } => {
            if show {
                config.display();
            } else {
                println!(
                    "Configuration file: {}",
                    Config::default_config_path()?.display()
                );
                println!("Run with --show to print the effective settings or --init to create it.");
            }
        }
    }

    Ok(())
}
