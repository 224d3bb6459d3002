use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Make sure `path` exists, downloading it from `url` when it is missing.
///
/// An empty `url` means the model must already be on disk.
pub fn ensure_model_available(path: &Path, url: &str) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if url.is_empty() {
        return Err(anyhow!(
            "model {} is missing and no download URL is configured; place the file there or set the matching models.*_url in the config",
            path.display()
        ));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    info!("Downloading {} -> {}", url, path.display());
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()?;
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("failed to fetch {}", url))?
        .error_for_status()
        .with_context(|| format!("bad response from {}", url))?;
    let bytes = response.bytes().context("failed to read model body")?;

    // Write to a sibling file first so a broken download never looks complete.
    let partial = path.with_extension("part");
    {
        let mut file = fs::File::create(&partial).with_context(|| format!("failed to create {}", partial.display()))?;
        file.write_all(&bytes)?;
    }
    fs::rename(&partial, path).with_context(|| format!("failed to move model into {}", path.display()))?;

    info!("Downloaded {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
