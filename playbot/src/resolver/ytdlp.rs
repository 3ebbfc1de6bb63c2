//! yt-dlp backed resolver
//!
//! Runs the `yt-dlp` command-line tool and reads its single-JSON dump.
//! Playlist links are not expanded: the first entry stands for the whole
//! collection.

use super::TrackResolver;
use crate::config::ResolverConfig;
use crate::error::ResolutionError;
use async_trait::async_trait;
use playbot_common::TrackInfo;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Subset of the yt-dlp info dict we care about
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    webpage_url: Option<String>,
    url: Option<String>,
    #[serde(default)]
    entries: Option<Vec<YtDlpInfo>>,
}

pub struct YtDlpResolver {
    program: PathBuf,
    format: String,
}

impl YtDlpResolver {
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            program: config.program.clone(),
            format: config.format.clone(),
        }
    }
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve(&self, reference: &str) -> Result<TrackInfo, ResolutionError> {
        debug!(reference, "Resolving with yt-dlp");

        // kill_on_drop: a timed-out resolution must not leave the process running
        let output = Command::new(&self.program)
            .args([
                "--dump-single-json",
                "--no-warnings",
                "--no-playlist",
                "--default-search",
                "auto",
                "-f",
                &self.format,
            ])
            .arg(reference)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ResolutionError::Backend(format!(
                    "failed to run {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("yt-dlp exited with an error")
                .trim()
                .to_string();
            return Err(ResolutionError::Unavailable(reason));
        }

        parse_info(reference, &output.stdout)
    }
}

/// Convert a yt-dlp JSON dump into a [`TrackInfo`]
fn parse_info(reference: &str, json: &[u8]) -> Result<TrackInfo, ResolutionError> {
    let mut info: YtDlpInfo =
        serde_json::from_slice(json).map_err(|e| ResolutionError::Parse(e.to_string()))?;

    // Collections: descend into the first entry
    while let Some(entries) = info.entries.take() {
        info = entries
            .into_iter()
            .next()
            .ok_or_else(|| ResolutionError::Unavailable(format!("{} is an empty collection", reference)))?;
    }

    let stream_locator = info
        .url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ResolutionError::NoStream(reference.to_string()))?;

    Ok(TrackInfo {
        title: info.title.unwrap_or_else(|| "Unknown".to_string()),
        canonical_reference: info.webpage_url.unwrap_or_else(|| reference.to_string()),
        stream_locator,
    })
}
