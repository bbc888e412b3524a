//! `%(name)` placeholder interpolation.
//!
//! Values in `autocmake.yml` may reference the document's own top-level
//! entries with `%(name)` placeholders. Substitution is a single pass: a
//! replacement value that itself contains a placeholder is left verbatim,
//! never re-expanded.

use anyhow::{Result, bail};
use indexmap::IndexMap;
use regex::Regex;
use serde_yaml::Value;

/// Substitute every `%(name)` occurrence in `s` with `vars[name]`.
///
/// A placeholder with no mapped value is an error. Strings without
/// placeholders come back unchanged.
pub fn replace(s: &str, vars: &IndexMap<String, String>) -> Result<String> {
    let re = Regex::new(r"%\(([A-Za-z0-9_]*)\)").unwrap();

    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for caps in re.captures_iter(s) {
        let whole = caps.get(0).unwrap();
        let name = &caps[1];
        let Some(value) = vars.get(name) else {
            bail!("no value for placeholder %({})", name);
        };
        out.push_str(&s[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }
    out.push_str(&s[last..]);
    Ok(out)
}

/// Interpolate every string leaf of a YAML value tree in place.
///
/// Recurses into mappings; all non-string leaves (numbers, bools,
/// sequences, null) pass through untouched.
pub fn interpolate(value: &mut Value, vars: &IndexMap<String, String>) -> Result<()> {
    match value {
        Value::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                interpolate(v, vars)?;
            }
        }
        Value::String(s) => *s = replace(s, vars)?,
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_replace() {
        let d = vars(&[("foo", "hey"), ("bar", "ho")]);
        assert_eq!(replace("hey %(foo) ho %(bar)", &d).unwrap(), "hey hey ho ho");
    }

    #[test]
    fn test_replace_without_placeholders() {
        let d = vars(&[("foo", "hey")]);
        assert_eq!(replace("plain text", &d).unwrap(), "plain text");
    }

    #[test]
    fn test_replace_unknown_placeholder_fails() {
        let d = vars(&[("foo", "hey")]);
        assert!(replace("%(bar)", &d).is_err());
    }

    #[test]
    fn test_replace_is_single_pass() {
        // a replacement containing a placeholder is not re-expanded
        let d = vars(&[("a", "%(b)"), ("b", "x")]);
        assert_eq!(replace("%(a)", &d).unwrap(), "%(b)");
    }

    #[test]
    fn test_interpolate_nested_mapping() {
        let yaml = "\
foo: hey
bar: ho
one: hey %(foo) ho %(bar)
two:
  one: hey %(foo) ho %(bar)
  two: raboof
";
        let mut doc: Value = serde_yaml::from_str(yaml).unwrap();
        let d = vars(&[("foo", "hey"), ("bar", "ho")]);
        interpolate(&mut doc, &d).unwrap();

        let expected: Value = serde_yaml::from_str(
            "\
foo: hey
bar: ho
one: hey hey ho ho
two:
  one: hey hey ho ho
  two: raboof
",
        )
        .unwrap();
        assert_eq!(doc, expected);
    }

    #[test]
    fn test_interpolate_leaves_non_strings_alone() {
        let mut doc: Value = serde_yaml::from_str("version: 2.8\nflag: true").unwrap();
        interpolate(&mut doc, &vars(&[])).unwrap();
        assert_eq!(doc["version"], Value::from(2.8));
        assert_eq!(doc["flag"], Value::from(true));
    }
}
