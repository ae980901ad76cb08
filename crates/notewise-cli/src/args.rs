//! Minimal argument splitting: positionals, `--name value` options and
//! boolean switches.

use std::collections::HashMap;

use notewise_core::{Error, Result};

#[derive(Debug, Default)]
pub struct Args {
    positional: Vec<String>,
    options: HashMap<String, String>,
    switches: Vec<String>,
}

impl Args {
    /// `switches` lists the flags that take no value.
    pub fn parse(raw: &[String], switches: &[&str]) -> Result<Self> {
        let mut args = Args::default();
        let mut iter = raw.iter();
        while let Some(arg) = iter.next() {
            let Some(name) = arg.strip_prefix("--") else {
                args.positional.push(arg.clone());
                continue;
            };
            if switches.contains(&name) {
                args.switches.push(name.to_string());
                continue;
            }
            let value = iter
                .next()
                .ok_or_else(|| Error::Input(format!("--{} needs a value", name)))?;
            args.options.insert(name.to_string(), value.clone());
        }
        Ok(args)
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    pub fn required(&self, index: usize, what: &str) -> Result<&str> {
        self.positional
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| Error::Input(format!("missing {}", what)))
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    pub fn has(&self, name: &str) -> bool {
        self.switches.iter().any(|s| s == name)
    }

    pub fn count(&self, name: &str) -> Result<Option<usize>> {
        self.value(name)
            .map(|v| {
                v.parse()
                    .map_err(|_| Error::Input(format!("--{} expects a number, got {}", name, v)))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_mixed_arguments() {
        let args = Args::parse(
            &raw(&["a.json", "--owner", "u1", "b.json", "--apply", "--mc", "3"]),
            &["apply"],
        )
        .unwrap();
        assert_eq!(args.positional(), &["a.json".to_string(), "b.json".to_string()]);
        assert_eq!(args.value("owner"), Some("u1"));
        assert!(args.has("apply"));
        assert_eq!(args.count("mc").unwrap(), Some(3));
        assert_eq!(args.count("tf").unwrap(), None);
        assert_eq!(args.required(1, "file").unwrap(), "b.json");
        assert!(args.required(2, "file").is_err());
    }

    #[test]
    fn test_bad_values() {
        assert!(Args::parse(&raw(&["--owner"]), &[]).is_err());
        let args = Args::parse(&raw(&["--mc", "three"]), &[]).unwrap();
        assert!(matches!(args.count("mc"), Err(Error::Input(_))));
    }
}
