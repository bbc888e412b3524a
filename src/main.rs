//! # autocmake CLI Entry Point
//!
//! Parses CLI arguments using clap and routes to the two operations:
//!
//! - `update <PROJECT_ROOT>` - (re)generate `CMakeLists.txt` and the setup
//!   script for the host project
//! - `self-update` - fetch the bootstrap infrastructure files into the
//!   current directory

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};

use autocmake::assemble;
use autocmake::config::Config;
use autocmake::generate;
use autocmake::selfupdate;

#[derive(Parser)]
#[command(name = "autocmake")]
#[command(about = "Generate CMakeLists.txt and a setup script from autocmake.yml", version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// (Re)generate CMakeLists.txt and the setup script under PROJECT_ROOT
    Update {
        /// Root directory of the host project (e.g. "..")
        project_root: PathBuf,
    },
    /// Fetch or update the bootstrap infrastructure files under the current directory
    SelfUpdate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Update { project_root } => update_project(project_root),
        Commands::SelfUpdate => {
            let work_dir = std::env::current_dir()?;
            selfupdate::self_update(&work_dir)
        }
    }
}

fn update_project(project_root: &Path) -> Result<()> {
    // nothing may be written under a bogus project root
    if !project_root.is_dir() {
        bail!("{} is not a directory", project_root.display());
    }
    let project_root = project_root
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", project_root.display()))?;
    let work_dir = std::env::current_dir()?
        .canonicalize()
        .context("Failed to resolve the current directory")?;

    println!("- parsing autocmake.yml");
    let mut config = Config::load(&work_dir.join("autocmake.yml"))?;

    // path from the generated files back to this directory
    let relative_path = generate::relative_path(&work_dir, &project_root);

    let assembly = assemble::assemble_modules(&mut config, &work_dir)?;
    if !assembly.warnings.is_empty() {
        println!("- {}", assembly.warnings.join("\n- ").yellow());
    }

    println!("- generating CMakeLists.txt");
    let cmakelists = generate::gen_cmakelists(
        &config.name,
        &config.min_cmake_version,
        &relative_path,
        &assembly.modules,
    );
    let cmakelists_path = project_root.join("CMakeLists.txt");
    fs::write(&cmakelists_path, cmakelists)
        .with_context(|| format!("Failed to write {}", cmakelists_path.display()))?;

    println!("- generating setup script");
    let setup = generate::gen_setup(&config, &relative_path, &config.setup_script);
    let setup_path = project_root.join(&config.setup_script);
    fs::write(&setup_path, setup)
        .with_context(|| format!("Failed to write {}", setup_path.display()))?;
    generate::make_executable(&setup_path)?;

    println!("{} Project files are up to date.", "✓".green());
    Ok(())
}
