//! `.netrc` credential discovery.

use std::path::{Path, PathBuf};

use tracing::trace;

use super::{Credential, CredentialError, CredentialsProvider};

/// Reads credentials from a `.netrc` file.
///
/// Entries may span several lines or sit on one
/// (`machine host login user password token`). A `default` entry matches any
/// host not listed before it.
#[derive(Debug, Clone)]
pub struct NetrcProvider {
  path: Option<PathBuf>,
}

impl Default for NetrcProvider {
  fn default() -> Self {
    Self::new()
  }
}

impl NetrcProvider {
  /// Provider for `$HOME/.netrc`.
  pub fn new() -> Self {
    Self { path: None }
  }

  /// Provider for an explicit file.
  pub fn at(path: impl Into<PathBuf>) -> Self {
    Self {
      path: Some(path.into()),
    }
  }

  fn resolve_path(&self) -> Result<PathBuf, CredentialError> {
    if let Some(path) = &self.path {
      return Ok(path.clone());
    }
    let home = std::env::var_os("HOME").ok_or(CredentialError::HomeNotSet)?;
    Ok(Path::new(&home).join(".netrc"))
  }
}

impl CredentialsProvider for NetrcProvider {
  fn get_credentials(&self, host: &str) -> Result<Option<Credential>, CredentialError> {
    let path = self.resolve_path()?;
    if !path.exists() {
      trace!(path = %path.display(), "No .netrc file");
      return Ok(None);
    }

    let content = std::fs::read_to_string(&path).map_err(|source| CredentialError::Io {
      path: path.clone(),
      source,
    })?;

    parse_netrc(&content, host).map_err(|message| CredentialError::Parse { path, message })
  }
}

#[derive(Default)]
struct Entry {
  machine: Option<String>,
  login: Option<String>,
  password: Option<String>,
}

impl Entry {
  fn matches(&self, host: &str) -> bool {
    match &self.machine {
      Some(machine) => machine == host,
      None => true,
    }
  }

  fn into_credential(self) -> Option<Credential> {
    Some(Credential {
      username: self.login?,
      password: self.password?,
    })
  }
}

/// Find the first entry for `host` in `.netrc` content.
///
/// Comments run from `#` to end of line. `macdef` bodies are skipped.
fn parse_netrc(content: &str, host: &str) -> Result<Option<Credential>, String> {
  let mut tokens = Vec::new();
  let mut lines = content.lines();
  while let Some(line) = lines.next() {
    let line = line.split('#').next().unwrap_or_default();
    for word in line.split_whitespace() {
      if word == "macdef" {
        // The macro body runs until the next blank line.
        for body in lines.by_ref() {
          if body.trim().is_empty() {
            break;
          }
        }
        break;
      }
      tokens.push(word);
    }
  }

  let mut current: Option<Entry> = None;
  let mut iter = tokens.into_iter();
  while let Some(token) = iter.next() {
    match token {
      "machine" | "default" => {
        if let Some(entry) = current.take()
          && entry.matches(host)
        {
          return Ok(entry.into_credential());
        }
        let machine = if token == "machine" {
          Some(iter.next().ok_or("`machine` without a host name")?.to_string())
        } else {
          None
        };
        current = Some(Entry {
          machine,
          ..Entry::default()
        });
      }
      "login" | "password" | "account" => {
        let value = iter.next().ok_or_else(|| format!("`{token}` without a value"))?;
        if let Some(entry) = current.as_mut() {
          match token {
            "login" => entry.login = Some(value.to_string()),
            "password" => entry.password = Some(value.to_string()),
            _ => {}
          }
        }
      }
      _ => {}
    }
  }

  Ok(current.filter(|entry| entry.matches(host)).and_then(Entry::into_credential))
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  #[test]
  fn test_parse_multiline_entry() {
    let content = r#"
machine example.atlassian.net
  login me@example.com
  password token-1
"#;

    let cred = parse_netrc(content, "example.atlassian.net").unwrap().unwrap();
    assert_eq!(cred.username, "me@example.com");
    assert_eq!(cred.password, "token-1");
  }

  #[test]
  fn test_parse_single_line_entries() {
    let content = "machine a.net login u1 password p1\nmachine b.net login u2 password p2\n";

    let cred = parse_netrc(content, "b.net").unwrap().unwrap();
    assert_eq!(cred.username, "u2");
    assert_eq!(cred.password, "p2");
  }

  #[test]
  fn test_parse_unknown_host() {
    let content = "machine a.net login u1 password p1\n";
    assert!(parse_netrc(content, "other.net").unwrap().is_none());
  }

  #[test]
  fn test_parse_default_entry_is_fallback() {
    let content = "machine a.net login u1 password p1\ndefault login anon password guest\n";

    let cred = parse_netrc(content, "b.net").unwrap().unwrap();
    assert_eq!(cred.username, "anon");

    let cred = parse_netrc(content, "a.net").unwrap().unwrap();
    assert_eq!(cred.username, "u1");
  }

  #[test]
  fn test_parse_strips_comments_and_macdef() {
    let content = r#"
# personal site
machine a.net login u1 password p1 # trailing
macdef init
cd /tmp
machine evil.net

machine b.net login u2 password p2
"#;

    let cred = parse_netrc(content, "a.net").unwrap().unwrap();
    assert_eq!(cred.password, "p1");
    assert!(parse_netrc(content, "evil.net").unwrap().is_none());
    assert_eq!(parse_netrc(content, "b.net").unwrap().unwrap().username, "u2");
  }

  #[test]
  fn test_parse_incomplete_entry() {
    assert!(parse_netrc("machine a.net login u1", "a.net").unwrap().is_none());
    assert!(parse_netrc("machine a.net login", "a.net").is_err());
  }

  #[test]
  fn test_provider_reads_explicit_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "machine x.atlassian.net login u password t").unwrap();

    let provider = NetrcProvider::at(file.path());
    let cred = provider.get_credentials("x.atlassian.net").unwrap().unwrap();
    assert_eq!(cred, Credential {
      username: "u".to_string(),
      password: "t".to_string(),
    });
  }

  #[test]
  fn test_provider_missing_file_is_none() {
    let provider = NetrcProvider::at("/no/such/netrc");
    assert!(provider.get_credentials("x.atlassian.net").unwrap().is_none());
  }
}
