use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::error::{Result, VietsubError};
use crate::transcribe::Transcript;

/// Cue styling injected after the WEBVTT header
const VTT_STYLE: &str = "STYLE\n::cue {\n  background-color: rgba(0, 0, 0, 0.75);\n  color: #ffffff;\n}\n";

/// Render transcript segments as SRT text
pub fn render_srt(transcript: &Transcript) -> String {
    let mut srt_content = String::new();

    for (index, segment) in transcript.segments.iter().enumerate() {
        let start_time = format_srt_time(segment.start);
        let end_time = format_srt_time(segment.end);

        srt_content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            start_time,
            end_time,
            segment.text.trim()
        ));
    }

    srt_content
}

/// Render transcript segments as WebVTT text
pub fn render_vtt(transcript: &Transcript) -> String {
    let mut vtt_content = String::from("WEBVTT\n\n");
    vtt_content.push_str(VTT_STYLE);
    vtt_content.push('\n');

    for segment in &transcript.segments {
        let start_time = format_vtt_time(segment.start);
        let end_time = format_vtt_time(segment.end);

        vtt_content.push_str(&format!(
            "{} --> {}\n{}\n\n",
            start_time,
            end_time,
            segment.text.trim()
        ));
    }

    vtt_content
}

/// Generate SRT subtitle file from a transcript
pub async fn write_srt<P: AsRef<Path>>(transcript: &Transcript, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Generating SRT file: {}", output_path.display());

    fs::write(output_path, render_srt(transcript))
        .await
        .map_err(VietsubError::Io)?;

    info!("SRT file generated successfully");
    Ok(())
}

/// Generate VTT subtitle file from a transcript
pub async fn write_vtt<P: AsRef<Path>>(transcript: &Transcript, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Generating VTT file: {}", output_path.display());

    fs::write(output_path, render_vtt(transcript))
        .await
        .map_err(VietsubError::Io)?;

    info!("VTT file generated successfully");
    Ok(())
}

/// Format time in seconds to SRT time format (HH:MM:SS,mmm)
fn format_srt_time(seconds: f64) -> String {
    let (hours, minutes, secs, millis) = split_timestamp(seconds);
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Format time in seconds to VTT time format (HH:MM:SS.mmm)
fn format_vtt_time(seconds: f64) -> String {
    let (hours, minutes, secs, millis) = split_timestamp(seconds);
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

/// Hours are not capped at 24; hour fields wider than two digits are allowed.
fn split_timestamp(seconds: f64) -> (u64, u64, u64, u64) {
    let total_milliseconds = (seconds * 1000.0) as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    (hours, minutes, secs, millis)
}
