//! SQLite URI connection strings and option merging.

use std::fmt;

/// A connection string split into its base (`file:...`) and ordered `key[=value]` options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    base: String,
    options: Vec<String>,
}

impl ConnectionString {
    /// Default connection string for a private in-memory database.
    pub const MEMORY: &'static str = "file::memory:";

    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('?') {
            Some((base, query)) => Self {
                base: base.to_owned(),
                options: query
                    .split('&')
                    .filter(|opt| !opt.is_empty())
                    .map(str::to_owned)
                    .collect(),
            },
            None => Self {
                base: raw.to_owned(),
                options: Vec::new(),
            },
        }
    }

    #[must_use]
    pub fn for_path(path: &str) -> Self {
        Self::parse(&format!("file:{path}"))
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        self.options.iter().any(|opt| option_key(opt) == key)
    }

    /// Append `extra` options in order, skipping any whose key is already present.
    ///
    /// Keys already in the string win over later ones, including duplicates within `extra`.
    pub fn merge<I, S>(&mut self, extra: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for opt in extra {
            let opt = opt.as_ref();
            if opt.is_empty() || self.has_key(option_key(opt)) {
                continue;
            }
            self.options.push(opt.to_owned());
        }
    }

    /// Value of `key`, if present with one.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|opt| option_key(opt) == key)
            .and_then(|opt| opt.split_once('=').map(|(_, v)| v))
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)?;
        if !self.options.is_empty() {
            write!(f, "?{}", self.options.join("&"))?;
        }
        Ok(())
    }
}

fn option_key(opt: &str) -> &str {
    opt.split_once('=').map_or(opt, |(k, _)| k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_existing_keys_and_order() {
        let mut cs = ConnectionString::parse("file:test.db?cache=shared&mode=rwc");
        cs.merge(["mode=ro", "_fk=1", "_fk=0", "vfs=unix"]);
        assert_eq!(
            cs.to_string(),
            "file:test.db?cache=shared&mode=rwc&_fk=1&vfs=unix"
        );
        assert_eq!(cs.get("mode"), Some("rwc"));
    }

    #[test]
    fn merge_into_bare_base_adds_question_mark() {
        let mut cs = ConnectionString::parse(ConnectionString::MEMORY);
        assert_eq!(cs.to_string(), "file::memory:");
        cs.merge(["cache=shared"]);
        assert_eq!(cs.to_string(), "file::memory:?cache=shared");
    }

    #[test]
    fn keys_without_values_are_tracked() {
        let mut cs = ConnectionString::for_path("/tmp/a.db");
        cs.merge(["immutable", "immutable=1"]);
        assert_eq!(cs.to_string(), "file:/tmp/a.db?immutable");
        assert_eq!(cs.get("immutable"), None);
        assert!(cs.has_key("immutable"));
    }
}
