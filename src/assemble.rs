//! Module assembly.
//!
//! Walks the configuration sections in order, resolves every declared
//! module source (local path or URL), reads the configuration embedded in
//! each module's documentation and merges it back into its section. All
//! fetches are blocking and run in declaration order; the first failure
//! aborts the run.

use crate::config::{Config, scalar_to_string};
use crate::fetch::fetch_url;
use crate::moduledoc::parse_cmake_module;
use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use indicatif::{ProgressBar, ProgressStyle};
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory under the working directory receiving every remote fetch.
pub const DOWNLOAD_DIR: &str = "downloaded";

/// Where an assembled module file resides: a directory (relative to the
/// working directory) and the file name inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub path: PathBuf,
    pub name: String,
}

/// Result of module assembly. Warnings declared by modules are collected
/// here and reported by the caller once, after assembly completes; a
/// module carrying a warning does not stop assembly of the others.
#[derive(Debug, Default)]
pub struct Assembly {
    pub modules: Vec<Module>,
    pub warnings: Vec<String>,
}

// Per-section work, snapshotted before assembly starts so the merge step
// can mutate the configuration while we iterate.
struct SectionPlan {
    name: String,
    sources: Vec<String>,
    defaults: IndexMap<String, String>,
    fetches: Vec<String>,
}

// A resolved source entry. `path` and `fetch_dir` stay relative to the
// working directory; `file` is the on-disk location to read.
struct ResolvedSource {
    path: PathBuf,
    name: String,
    file: PathBuf,
    fetch_dir: PathBuf,
}

pub fn assemble_modules(config: &mut Config, work_dir: &Path) -> Result<Assembly> {
    let download_dir = work_dir.join(DOWNLOAD_DIR);
    fs::create_dir_all(&download_dir)
        .with_context(|| format!("Failed to create {}", download_dir.display()))?;

    let plans: Vec<SectionPlan> = config
        .sections
        .iter()
        .map(|(name, section)| {
            Ok(SectionPlan {
                name: name.clone(),
                sources: split_entries(section.get("source")),
                defaults: parse_override(name, section.get("override"))?,
                fetches: split_entries(section.get("fetch")),
            })
        })
        .collect::<Result<_>>()?;

    let total = plans.iter().filter(|plan| !plan.sources.is_empty()).count();
    let bar = progress_bar(total);

    let mut assembly = Assembly::default();

    for plan in &plans {
        if !plan.sources.is_empty() {
            for src in &plan.sources {
                let resolved = resolve_source(src, work_dir, &download_dir)?;

                let text = fs::read_to_string(&resolved.file)
                    .with_context(|| format!("Failed to read module {}", resolved.file.display()))?;
                let parsed = parse_cmake_module(&text, &plan.defaults)
                    .with_context(|| format!("Failed to parse module {}", resolved.name))?;

                if let Some(warning) = &parsed.warning {
                    assembly
                        .warnings
                        .push(format!("WARNING from {}: {}", resolved.name, warning));
                }

                config.prepend_or_set(&plan.name, "docopt", parsed.docopt.as_deref(), &plan.defaults)?;
                config.prepend_or_set(&plan.name, "define", parsed.define.as_deref(), &plan.defaults)?;
                config.prepend_or_set(&plan.name, "export", parsed.export.as_deref(), &plan.defaults)?;

                // modules may declare extra files of their own to retrieve
                if let Some(fetch_list) = &parsed.fetch {
                    for url in fetch_list.split('\n').filter(|l| !l.is_empty()) {
                        let dst = work_dir.join(&resolved.fetch_dir).join(basename(url));
                        fetch_url(url, &dst)?;
                    }
                }

                assembly.modules.push(Module {
                    path: resolved.path,
                    name: resolved.name,
                });
            }

            if let Some(bar) = &bar {
                bar.inc(1);
            }
        }

        // resources the configuration wants without a module file
        for url in &plan.fetches {
            fetch_url(url, &download_dir.join(basename(url)))?;
        }
    }

    if let Some(bar) = &bar {
        bar.finish();
    }

    Ok(assembly)
}

fn resolve_source(src: &str, work_dir: &Path, download_dir: &Path) -> Result<ResolvedSource> {
    let module_name = basename(src);

    if src.contains("http") {
        let name = format!("autocmake_{}", module_name);
        let dst = download_dir.join(&name);
        fetch_url(src, &dst)?;
        Ok(ResolvedSource {
            path: PathBuf::from(DOWNLOAD_DIR),
            name,
            file: dst,
            fetch_dir: PathBuf::from(DOWNLOAD_DIR),
        })
    } else {
        let file = work_dir.join(src);
        if !file.exists() {
            bail!("{} does not exist", src);
        }
        let dir = Path::new(src)
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .to_path_buf();
        Ok(ResolvedSource {
            path: dir.clone(),
            name: module_name,
            file,
            fetch_dir: dir,
        })
    }
}

/// Split a newline-separated option value into its non-empty entries.
fn split_entries(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split('\n')
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Parse a section's `override` option: a literal flow-mapping expression
/// mapping placeholder names to scalar values.
fn parse_override(section: &str, raw: Option<&str>) -> Result<IndexMap<String, String>> {
    let Some(raw) = raw else {
        return Ok(IndexMap::new());
    };

    let value: Value = serde_yaml::from_str(raw)
        .with_context(|| format!("invalid override mapping in section '{}'", section))?;
    let Value::Mapping(map) = value else {
        bail!("override in section '{}' must be a mapping", section);
    };

    let mut defaults = IndexMap::new();
    for (key, value) in map {
        let (Value::String(key), Some(value)) = (&key, scalar_to_string(&value)) else {
            bail!("override in section '{}' must map names to scalar values", section);
        };
        defaults.insert(key.clone(), value);
    }
    Ok(defaults)
}

fn basename(src: &str) -> String {
    Path::new(src)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| src.to_string())
}

// no bar when there is nothing to assemble
fn progress_bar(total: usize) -> Option<ProgressBar> {
    if total == 0 {
        return None;
    }
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:30}] ({pos}/{len})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("## "),
    );
    bar.set_message("- assembling modules:");
    Some(bar)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basename() {
        assert_eq!(basename("https://example.org/cmake/fc.cmake"), "fc.cmake");
        assert_eq!(basename("cmake/fc.cmake"), "fc.cmake");
        assert_eq!(basename("fc.cmake"), "fc.cmake");
    }

    #[test]
    fn test_split_entries() {
        assert_eq!(split_entries(None), Vec::<String>::new());
        assert_eq!(split_entries(Some("a\nb\n")), ["a", "b"]);
    }

    #[test]
    fn test_parse_override_flow_mapping() {
        let defaults = parse_override("boost", Some("{'major': 1, 'minor': '59'}")).unwrap();
        assert_eq!(defaults["major"], "1");
        assert_eq!(defaults["minor"], "59");
    }

    #[test]
    fn test_parse_override_absent() {
        assert!(parse_override("boost", None).unwrap().is_empty());
    }

    #[test]
    fn test_parse_override_rejects_non_mapping() {
        assert!(parse_override("boost", Some("[1, 2]")).is_err());
    }
}
