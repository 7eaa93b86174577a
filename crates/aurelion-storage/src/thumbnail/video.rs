//! Video frame thumbnails via ffprobe/ffmpeg.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use super::{ThumbnailSpec, TranscodeError};

/// Longest stderr excerpt kept in errors.
const STDERR_LIMIT: usize = 500;

/// Grab one frame at `spec.frame_position` of the duration, scaled to
/// `spec.size` wide, and write it as JPEG to `dest`.
///
/// Child processes are killed if this future is dropped or times out.
pub async fn render(source: &Path, dest: &Path, spec: &ThumbnailSpec) -> Result<(), TranscodeError> {
    let offset = match probe_duration(source, spec).await {
        Ok(duration) => duration * spec.frame_position,
        Err(e) => {
            warn!(source = %source.display(), error = %e, "Duration probe failed, using first frame");
            0.0
        }
    };

    let mut cmd = Command::new(&spec.ffmpeg_path);
    cmd.args(["-hide_banner", "-loglevel", "error", "-y", "-ss"])
        .arg(format!("{offset:.3}"))
        .arg("-i")
        .arg(source)
        .args(["-frames:v", "1", "-vf"])
        .arg(format!("scale={}:-2", spec.size))
        .args(["-q:v", &mjpeg_qscale(spec.quality).to_string(), "-f", "image2"])
        .arg(dest);

    run(cmd, &spec.ffmpeg_path, spec).await?;
    debug!(source = %source.display(), offset, "Extracted video frame");
    Ok(())
}

/// Duration of the media in seconds.
async fn probe_duration(source: &Path, spec: &ThumbnailSpec) -> Result<f64, TranscodeError> {
    let mut cmd = Command::new(&spec.ffprobe_path);
    cmd.args([
        "-v",
        "error",
        "-show_entries",
        "format=duration",
        "-of",
        "default=noprint_wrappers=1:nokey=1",
    ])
    .arg(source);

    let stdout = run(cmd, &spec.ffprobe_path, spec).await?;
    parse_duration(&stdout).ok_or(TranscodeError::OutputMissing)
}

async fn run(
    mut cmd: Command,
    program: &str,
    spec: &ThumbnailSpec,
) -> Result<String, TranscodeError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|source| TranscodeError::Spawn {
        program: program.to_string(),
        source,
    })?;

    let output = tokio::time::timeout(spec.timeout, child.wait_with_output())
        .await
        .map_err(|_| TranscodeError::Timeout(spec.timeout.as_secs()))??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TranscodeError::ProcessFailed {
            program: program.to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr: stderr.chars().take(STDERR_LIMIT).collect(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn parse_duration(raw: &str) -> Option<f64> {
    raw.lines()
        .find_map(|line| line.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// Map a 1-100 JPEG quality onto ffmpeg's 2-31 mjpeg scale (lower is better).
fn mjpeg_qscale(quality: u8) -> u8 {
    let quality = u32::from(quality.clamp(1, 100));
    (2 + (100 - quality) * 29 / 99) as u8
}
