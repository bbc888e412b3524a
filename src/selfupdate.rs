//! `self-update`: fetch the bootstrap infrastructure files a generated
//! setup script relies on.

use crate::fetch::fetch_url;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub const AUTOCMAKE_GITHUB_URL: &str = "https://github.com/scisoft/autocmake";

/// Fetch or update the infrastructure files under `work_dir`: an example
/// `autocmake.yml` and a `.gitignore` (only when absent), plus the
/// `lib/config.py` and `lib/docopt/docopt.py` modules the generated setup
/// script imports.
pub fn self_update(work_dir: &Path) -> Result<()> {
    if !work_dir.join("autocmake.yml").exists() {
        println!("- fetching example autocmake.yml");
        fetch_url(
            &format!("{}/raw/master/example/autocmake.yml", AUTOCMAKE_GITHUB_URL),
            &work_dir.join("autocmake.yml"),
        )?;
    }

    if !work_dir.join(".gitignore").exists() {
        println!("- creating .gitignore");
        fs::write(work_dir.join(".gitignore"), "*.pyc\n").context("Failed to write .gitignore")?;
    }

    println!("- fetching lib/config.py");
    fetch_url(
        &format!("{}/raw/master/lib/config.py", AUTOCMAKE_GITHUB_URL),
        &work_dir.join("lib").join("config.py"),
    )?;

    println!("- fetching lib/docopt/docopt.py");
    fetch_url(
        &format!("{}/raw/master/lib/docopt/docopt.py", AUTOCMAKE_GITHUB_URL),
        &work_dir.join("lib").join("docopt").join("docopt.py"),
    )?;

    Ok(())
}
