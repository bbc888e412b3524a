use anyhow::{Context, Result, bail};
use std::fs;
use std::io::copy;
use std::path::Path;

/// Fetch `url` and write the response body to `dst`, creating parent
/// directories as needed. Any transport error or non-success status is
/// fatal; there are no retries.
pub fn fetch_url(url: &str, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let agent = ureq::agent();
    let response = agent
        .get(url)
        .call()
        .with_context(|| format!("could not fetch {}", url))?;
    if response.status() != 200 {
        bail!("could not fetch {} (HTTP {})", url, response.status());
    }

    let mut file =
        fs::File::create(dst).with_context(|| format!("Failed to create {}", dst.display()))?;
    let body = response.into_body();
    let mut reader = body.into_reader();
    copy(&mut reader, &mut file).with_context(|| format!("Failed to write {}", dst.display()))?;

    Ok(())
}
