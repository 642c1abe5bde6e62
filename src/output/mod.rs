use anyhow::Result;
use console::style;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

use crate::captions::{ResolvedTranscript, TranscriptStatus};
use crate::cli::OutputFormat;
use crate::pipeline::{PlaylistReport, RunReport};
use crate::utils;

#[derive(Serialize)]
struct TranscriptRecord<'a> {
    video_id: &'a str,
    #[serde(flatten)]
    transcript: &'a ResolvedTranscript,
}

/// Render the outcome of a run, failed playlists included
pub fn format_run(run: &RunReport, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(run)?),
        OutputFormat::Text => Ok(format_run_as_text(run)),
    }
}

fn format_run_as_text(run: &RunReport) -> String {
    let mut out = String::new();

    for report in &run.playlists {
        write_playlist(&mut out, report);
    }

    if run.has_failures() {
        let _ = writeln!(out, "{}", style("Failed playlists:").red().bold());
        for failure in &run.failures {
            let _ = writeln!(
                out,
                "  {} {} {}",
                style("✗").red(),
                failure.playlist_id,
                failure.error
            );
        }
    }

    out.trim_end().to_string()
}

fn write_playlist(out: &mut String, report: &PlaylistReport) {
    let elapsed = (report.finished_at - report.started_at).num_milliseconds() as f64 / 1000.0;
    let _ = writeln!(
        out,
        "Playlist {} ({} videos, {} processed in {})",
        style(&report.playlist_id).bold(),
        report.total_videos,
        report.videos.len(),
        utils::format_duration(elapsed)
    );

    for video in &report.videos {
        let mark = match video.status {
            TranscriptStatus::Available => style("✓").green(),
            TranscriptStatus::Unavailable => style("✗").yellow(),
            TranscriptStatus::Error => style("✗").red(),
        };
        let detail = match (&video.language, &video.document) {
            (Some(lang), Some(doc)) => {
                format!("{} chars, {} -> {}", video.characters, lang, doc)
            }
            (Some(lang), None) => {
                format!("{} chars, {} (not stored)", video.characters, lang)
            }
            _ => video.status.to_string(),
        };
        let _ = writeln!(out, "  {} {} {}", mark, video.video_id, detail);
    }

    let _ = writeln!(
        out,
        "  available: {}, unavailable: {}, error: {}, stored: {}",
        report.count(TranscriptStatus::Available),
        report.count(TranscriptStatus::Unavailable),
        report.count(TranscriptStatus::Error),
        report.stored()
    );
}

/// Render a single resolved transcript
pub fn format_transcript(
    video_id: &str,
    transcript: &ResolvedTranscript,
    format: &OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&TranscriptRecord {
            video_id,
            transcript,
        })?),
        OutputFormat::Text if transcript.is_available() => Ok(transcript.text().to_string()),
        OutputFormat::Text => Ok(format!("{}: transcript {}", video_id, transcript.status())),
    }
}

/// Save rendered output to a file, without terminal styling
pub async fn save_to_file(content: &str, path: &Path) -> Result<()> {
    fs_err::write(path, console::strip_ansi_codes(content).as_bytes())?;
    Ok(())
}

/// Print rendered output to console
pub fn print_to_console(content: &str) {
    println!("{}", content);
}
