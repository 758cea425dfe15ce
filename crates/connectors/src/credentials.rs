use crate::{error::ConnectorError, file::error::FileError};
use std::{collections::HashMap, fmt, fs, path::Path};

/// Connection settings for an index cluster, loaded from a properties file.
///
/// Keys may carry a dotted prefix (`memex.cdr.username` is read as `username`).
/// `url` and `cluster` are interchangeable.
#[derive(Clone, Default)]
pub struct Credentials {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub index: Option<String>,
    extra: HashMap<String, String>,
}

impl Credentials {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConnectorError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| FileError::from_io(path, err))?;
        Self::parse(&content).map_err(|reason| ConnectorError::InvalidProperties {
            path: path.display().to_string(),
            reason,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        let mut creds = Credentials::default();

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            let Some(sep) = line.find(&['=', ':'][..]) else {
                return Err(format!(
                    "malformed line {} (expected KEY=VALUE)",
                    line_num + 1
                ));
            };
            let key = line[..sep].trim();
            if key.is_empty() {
                return Err(format!("empty key at line {}", line_num + 1));
            }
            let value = unquote_value(&line[sep + 1..]);

            let short = key.rsplit('.').next().unwrap_or(key);
            match short {
                "url" | "cluster" => creds.url = Some(value),
                "username" | "user" => creds.username = Some(value),
                "password" => creds.password = Some(value),
                "index" => creds.index = Some(value),
                _ => {
                    creds.extra.insert(key.to_string(), value);
                }
            }
        }

        Ok(creds)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }

    /// Username and password, when both are present.
    pub fn basic_auth(&self) -> Option<(&str, &str)> {
        Some((self.username.as_deref()?, self.password.as_deref()?))
    }

    pub fn require_url(&self) -> Result<&str, ConnectorError> {
        self.url
            .as_deref()
            .ok_or_else(|| ConnectorError::MissingProperty("url".into()))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("index", &self.index)
            .finish()
    }
}

fn unquote_value(value: &str) -> String {
    let value = value.trim();

    if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        return value[1..value.len() - 1].to_string();
    }

    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prefixed_keys() {
        let content = r#"
# CDR cluster
memex.cdr.cluster=https://es.example.org:9200
memex.cdr.username=reader
memex.cdr.password="s3cret pass"
memex.cdr.index=crawl
memex.cdr.type=doc
        "#;

        let creds = Credentials::parse(content).unwrap();
        assert_eq!(creds.url.as_deref(), Some("https://es.example.org:9200"));
        assert_eq!(creds.basic_auth(), Some(("reader", "s3cret pass")));
        assert_eq!(creds.index.as_deref(), Some("crawl"));
        assert_eq!(creds.get("memex.cdr.type"), Some("doc"));
    }

    #[test]
    fn test_colon_separator_and_single_quotes() {
        let creds = Credentials::parse("url: 'http://localhost:9200'\n").unwrap();
        assert_eq!(creds.url.as_deref(), Some("http://localhost:9200"));
        assert!(creds.basic_auth().is_none());
    }

    #[test]
    fn test_invalid_line() {
        assert!(Credentials::parse("INVALID LINE WITHOUT SEPARATOR").is_err());
        assert!(Credentials::parse("=value").is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::parse("password=hunter2").unwrap();
        assert!(!format!("{creds:?}").contains("hunter2"));
    }

    #[test]
    fn test_missing_url() {
        let creds = Credentials::default();
        assert!(matches!(
            creds.require_url(),
            Err(ConnectorError::MissingProperty(_))
        ));
    }
}
