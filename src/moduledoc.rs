//! Parser for the configuration embedded in a CMake module's documentation.
//!
//! Modules document themselves in `#.rst:` comment blocks. A block may carry
//! an `autocmake.yml configuration::` payload declaring command-line options
//! (`docopt`), compile definitions (`define`), environment exports
//! (`export`), extra files to retrieve (`fetch`) and a `warning`. The
//! payload is a narrow one-implicit-section key/value format, parsed here
//! with an explicit mini parser so the dedent and split semantics stay
//! exact.

use crate::interpolate;
use anyhow::{Result, bail};
use indexmap::IndexMap;

const CONFIG_MARKER: &str = "autocmake.yml configuration::";
const DOC_MARKER: &str = "#.rst:";

/// Configuration fragment recovered from one module file.
///
/// Each field is either absent (the payload never mentioned it) or a
/// newline-joined block of entries. An explicitly empty field is
/// `Some("")`, distinguishable from `None`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedModule {
    pub docopt: Option<String>,
    pub define: Option<String>,
    pub export: Option<String>,
    pub fetch: Option<String>,
    pub warning: Option<String>,
}

/// Extract the configuration fragment from a module's source text.
///
/// A module without the configuration marker yields an all-absent record;
/// most modules carry no embedded configuration and that is not an error.
/// `defaults` is applied to each field value as it is read.
pub fn parse_cmake_module(
    text: &str,
    defaults: &IndexMap<String, String>,
) -> Result<ParsedModule> {
    if !text.contains(CONFIG_MARKER) {
        return Ok(ParsedModule::default());
    }

    // collect documentation-block lines with the two-character comment
    // prefix stripped
    let mut doc_lines: Vec<&str> = Vec::new();
    let mut in_doc = false;
    for line in text.split('\n') {
        if in_doc && (line.is_empty() || !line.starts_with('#')) {
            in_doc = false;
        }
        if in_doc {
            doc_lines.push(line.get(2..).unwrap_or(""));
        }
        if line.contains(DOC_MARKER) {
            in_doc = true;
        }
    }

    let doc = doc_lines.join("\n");
    let Some((_, payload)) = doc.split_once(CONFIG_MARKER) else {
        bail!("module declares '{}' outside its documentation block", CONFIG_MARKER);
    };
    let payload = payload.replace("\n  ", "\n");

    let mut parsed = ParsedModule::default();
    for (key, raw) in parse_fields(&payload)? {
        let value = interpolate::replace(&raw, defaults)?;
        match key.as_str() {
            "docopt" => parsed.docopt = Some(value),
            "define" => parsed.define = Some(value),
            "export" => parsed.export = Some(value),
            "fetch" => parsed.fetch = Some(value),
            "warning" => parsed.warning = Some(value),
            // unknown fields are tolerated, same as the original reader
            _ => {}
        }
    }
    Ok(parsed)
}

/// Parse the dedented payload as `name: value` fields with indented
/// continuation lines joined by newlines. Field names are lowercased,
/// values trimmed. Anything else is a fatal parse error.
fn parse_fields(payload: &str) -> Result<IndexMap<String, String>> {
    let mut fields: IndexMap<String, String> = IndexMap::new();
    let mut current: Option<String> = None;

    for line in payload.lines() {
        if line.trim().is_empty() {
            continue;
        }

        if line.starts_with(char::is_whitespace) {
            match current.as_ref().and_then(|key| fields.get_mut(key)) {
                Some(entry) => {
                    entry.push('\n');
                    entry.push_str(line.trim());
                }
                None => bail!("malformed module configuration: continuation without a field: {:?}", line),
            }
            continue;
        }

        match line.split_once(':') {
            Some((name, rest)) if is_field_name(name.trim_end()) => {
                let key = name.trim_end().to_ascii_lowercase();
                fields.insert(key.clone(), rest.trim().to_string());
                current = Some(key);
            }
            _ => bail!("malformed module configuration line: {:?}", line),
        }
    }

    Ok(fields)
}

fn is_field_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_defaults() -> IndexMap<String, String> {
        IndexMap::new()
    }

    #[test]
    fn test_parse_cmake_module() {
        let s = r#"#.rst:
#
# Foo ...
#
# autocmake.yml configuration::
#
#   docopt: --cxx=<CXX> C++ compiler [default: g++].
#           --extra-cxx-flags=<EXTRA_CXXFLAGS> Extra C++ compiler flags [default: ''].
#   export: 'CXX={}'.format(arguments['--cxx'])
#   define: '-DEXTRA_CXXFLAGS="{}"'.format(arguments['--extra-cxx-flags'])

enable_language(CXX)

if(NOT DEFINED CMAKE_C_COMPILER_ID)
    message(FATAL_ERROR "CMAKE_C_COMPILER_ID variable is not defined!")
endif()"#;

        let parsed = parse_cmake_module(s, &no_defaults()).unwrap();
        assert_eq!(
            parsed.docopt.as_deref(),
            Some(
                "--cxx=<CXX> C++ compiler [default: g++].\n--extra-cxx-flags=<EXTRA_CXXFLAGS> Extra C++ compiler flags [default: '']."
            )
        );
        assert_eq!(
            parsed.export.as_deref(),
            Some("'CXX={}'.format(arguments['--cxx'])")
        );
        assert_eq!(
            parsed.define.as_deref(),
            Some(r#"'-DEXTRA_CXXFLAGS="{}"'.format(arguments['--extra-cxx-flags'])"#)
        );
        // never mentioned in the payload: absent, not empty
        assert_eq!(parsed.fetch, None);
        assert_eq!(parsed.warning, None);
    }

    #[test]
    fn test_module_without_marker() {
        let s = r#"#.rst:
#
# Foo ...
#
# Bar ...

enable_language(CXX)"#;

        let parsed = parse_cmake_module(s, &no_defaults()).unwrap();
        assert_eq!(parsed, ParsedModule::default());
        assert_eq!(parsed.docopt, None);
    }

    #[test]
    fn test_defaults_applied_at_read_time() {
        let s = "\
#.rst:
#
# autocmake.yml configuration::
#
#   docopt: --boost=<VERSION> Boost version [default: %(major).%(minor)].
";
        let defaults: IndexMap<String, String> = [
            ("major".to_string(), "1".to_string()),
            ("minor".to_string(), "59".to_string()),
        ]
        .into_iter()
        .collect();

        let parsed = parse_cmake_module(s, &defaults).unwrap();
        assert_eq!(
            parsed.docopt.as_deref(),
            Some("--boost=<VERSION> Boost version [default: 1.59].")
        );
    }

    #[test]
    fn test_warning_and_fetch_fields() {
        let s = "\
#.rst:
#
# autocmake.yml configuration::
#
#   fetch: https://example.org/one.cmake
#          https://example.org/two.cmake
#   warning: this module is deprecated
";
        let parsed = parse_cmake_module(s, &no_defaults()).unwrap();
        assert_eq!(
            parsed.fetch.as_deref(),
            Some("https://example.org/one.cmake\nhttps://example.org/two.cmake")
        );
        assert_eq!(parsed.warning.as_deref(), Some("this module is deprecated"));
    }

    #[test]
    fn test_explicitly_empty_field() {
        let s = "\
#.rst:
#
# autocmake.yml configuration::
#
#   define:
#   export: ENV=1
";
        let parsed = parse_cmake_module(s, &no_defaults()).unwrap();
        assert_eq!(parsed.define.as_deref(), Some(""));
        assert_eq!(parsed.export.as_deref(), Some("ENV=1"));
    }

    #[test]
    fn test_marker_outside_doc_block_fails() {
        let s = "autocmake.yml configuration::\n";
        assert!(parse_cmake_module(s, &no_defaults()).is_err());
    }

    #[test]
    fn test_malformed_payload_fails() {
        let s = "\
#.rst:
#
# autocmake.yml configuration::
#
#   not a key value line
";
        assert!(parse_cmake_module(s, &no_defaults()).is_err());
    }

    #[test]
    fn test_doc_block_ends_at_uncommented_line() {
        // a second configuration marker outside the block is not parsed
        let s = "\
#.rst:
#
# autocmake.yml configuration::
#
#   define: -DFIRST
set(FOO 1)
#   define: -DSECOND
";
        let parsed = parse_cmake_module(s, &no_defaults()).unwrap();
        assert_eq!(parsed.define.as_deref(), Some("-DFIRST"));
    }
}
