// Configuration: which server and course to talk to, plus the session
// (CSRF token and session cookie) that authorises uploads.

use crate::page::{CourseUrl, CsrfToken};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

const SESSION_FILE: &str = ".notebook_builder_session.json";

#[derive(Clone, Debug)]
pub struct Config {
    pub base_url: String,
    pub term: String,
    pub course: String,
    pub csrf_token: Option<String>,
    pub session_cookie: Option<String>,
}

impl Config {
    /// Read configuration from the environment (and a `.env` file if one
    /// exists). `SUBMITTY_TERM` and `SUBMITTY_COURSE` are required.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            base_url: env::var("SUBMITTY_URL").unwrap_or_else(|_| "http://localhost:1511".into()),
            term: env::var("SUBMITTY_TERM").context("SUBMITTY_TERM must be set")?,
            course: env::var("SUBMITTY_COURSE").context("SUBMITTY_COURSE must be set")?,
            csrf_token: env::var("SUBMITTY_CSRF_TOKEN").ok(),
            session_cookie: env::var("SUBMITTY_SESSION").ok(),
        })
    }

    pub fn course_url(&self) -> CourseUrl {
        CourseUrl::new(&self.base_url, &self.term, &self.course)
    }

    /// Session from the environment, if both halves were given.
    pub fn session(&self) -> Option<Session> {
        match (&self.csrf_token, &self.session_cookie) {
            (Some(csrf_token), Some(session_cookie)) => Some(Session {
                csrf_token: csrf_token.clone(),
                session_cookie: session_cookie.clone(),
            }),
            _ => None,
        }
    }
}

/// Credentials copied from a logged-in browser session.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub csrf_token: String,
    pub session_cookie: String,
}

impl Session {
    pub fn csrf_token(&self) -> CsrfToken {
        CsrfToken::new(self.csrf_token.clone())
    }

    /// Default location: a file in the user's home directory.
    pub fn default_path() -> PathBuf {
        let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        dir.join(SESSION_FILE)
    }

    /// Write the session as JSON. On Unix the file is readable by the
    /// owner only.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        write_private(path, data.as_bytes()).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&data).context("Parsing saved session")
    }
}

#[cfg(unix)]
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use std::fs::{OpenOptions, Permissions};
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; tighten files left by older runs too.
    file.set_permissions(Permissions::from_mode(0o600))?;
    file.write_all(data)
}

#[cfg(not(unix))]
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, data)
}
