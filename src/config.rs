//! Configuration file parsing (`autocmake.yml`) and merging.
//!
//! The configuration is an ordered mapping: project metadata at the top
//! level, plus one section per feature or module. Section option values are
//! opaque strings until interpolated. The configuration is mutated in place
//! during module assembly and never written back.

use crate::interpolate;
use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

#[derive(Debug)]
pub struct Config {
    pub name: String,
    pub min_cmake_version: String,
    pub setup_script: String,
    pub sections: IndexMap<String, Section>,
}

#[derive(Debug, Default)]
pub struct Section {
    pub options: IndexMap<String, String>,
}

impl Section {
    pub fn get(&self, option: &str) -> Option<&str> {
        self.options.get(option).map(String::as_str)
    }

    fn from_mapping(name: &str, map: Mapping) -> Result<Section> {
        let mut options = IndexMap::new();
        for (key, value) in map {
            let Value::String(key) = key else {
                bail!("option names in section '{}' must be strings", name);
            };
            let value = scalar_to_string(&value)
                .with_context(|| format!("option '{}' in section '{}' must be a scalar", key, name))?;
            options.insert(key, value);
        }
        Ok(Section { options })
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Config::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Config> {
        let mut doc: Value =
            serde_yaml::from_str(text).context("Failed to parse autocmake.yml")?;

        let vars = toplevel_scalars(&doc);
        interpolate::interpolate(&mut doc, &vars)?;

        let map = match doc {
            Value::Mapping(map) => map,
            _ => bail!("autocmake.yml must be a top-level mapping"),
        };

        let mut name = None;
        let mut min_cmake_version = None;
        let mut setup_script = None;
        let mut sections = IndexMap::new();

        for (key, value) in map {
            let Value::String(key) = key else {
                bail!("configuration keys must be strings");
            };
            if key == "name" {
                name = Some(require_scalar("name", &value)?);
            } else if key == "min_cmake_version" {
                min_cmake_version = Some(require_scalar("min_cmake_version", &value)?);
            } else if key == "setup_script" {
                setup_script = Some(require_scalar("setup_script", &value)?);
            } else if let Value::Mapping(map) = value {
                let section = Section::from_mapping(&key, map)?;
                sections.insert(key, section);
            }
            // other scalar top-level entries only serve as interpolation
            // variables
        }

        let name = name.context("you have to specify the project name in autocmake.yml")?;
        if name.trim_end().contains(char::is_whitespace) {
            bail!("project name contains a space");
        }
        let min_cmake_version =
            min_cmake_version.context("you have to specify min_cmake_version in autocmake.yml")?;

        Ok(Config {
            name,
            min_cmake_version,
            setup_script: setup_script.unwrap_or_else(|| "setup".to_string()),
            sections,
        })
    }

    /// Merge a module-derived value into a section option.
    ///
    /// An unset option is set to `value`; an already-set option becomes
    /// `value`, a newline, then the previous content. New content first:
    /// this ordering decides generated option order and default-flag
    /// precedence. The previous value is read through the override-defaults
    /// mapping. Absent or empty candidates are a no-op.
    pub fn prepend_or_set(
        &mut self,
        section: &str,
        option: &str,
        value: Option<&str>,
        defaults: &IndexMap<String, String>,
    ) -> Result<()> {
        let Some(value) = value else {
            return Ok(());
        };
        if value.is_empty() {
            return Ok(());
        }

        let section = self.sections.entry(section.to_string()).or_default();
        let merged = match section.options.get(option) {
            Some(previous) => format!("{}\n{}", value, interpolate::replace(previous, defaults)?),
            None => value.to_string(),
        };
        section.options.insert(option.to_string(), merged);
        Ok(())
    }
}

/// Render a scalar YAML value to its string form. `None` for mappings,
/// sequences and null.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn require_scalar(key: &str, value: &Value) -> Result<String> {
    scalar_to_string(value).with_context(|| format!("'{}' must be a scalar value", key))
}

/// The flat interpolation map: every top-level entry with a scalar value.
fn toplevel_scalars(doc: &Value) -> IndexMap<String, String> {
    let mut vars = IndexMap::new();
    if let Value::Mapping(map) = doc {
        for (key, value) in map {
            if let (Value::String(key), Some(value)) = (key, scalar_to_string(value)) {
                vars.insert(key.clone(), value);
            }
        }
    }
    vars
}
