// API client module: a small blocking HTTP client that talks to the
// course server's notebook builder endpoint. Uploads are sent one at a
// time, so a synchronous client is all we need.

use crate::config::{Config, Session};
use crate::page::CourseUrl;
use crate::upload::{UploadError, UploadRequest, UploadResponse, UploadTransport, UPLOAD_ENDPOINT};
use anyhow::{Context, Result};
use reqwest::blocking::{multipart, Client};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use tracing::{debug, warn};

/// Name of the cookie that carries the server-side session.
pub const SESSION_COOKIE: &str = "submitty_session";

/// Blocking client holding the reqwest client, the course URL builder and
/// an optional session cookie for authenticated calls.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    course_url: CourseUrl,
    session: Option<String>,
}

impl ApiClient {
    pub fn new(course_url: CourseUrl) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient {
            client,
            course_url,
            session: None,
        })
    }

    /// Create a client for the course named in `config`, authenticated
    /// with `session` when one is known.
    pub fn from_config(config: &Config, session: Option<&Session>) -> Result<Self> {
        let mut api = ApiClient::new(config.course_url())?;
        if let Some(session) = session {
            api.set_session(&session.session_cookie);
        }
        Ok(api)
    }

    /// Store the session cookie sent with subsequent requests.
    pub fn set_session(&mut self, session: &str) {
        self.session = Some(session.to_string());
    }

    pub fn upload_url(&self) -> String {
        self.course_url.build(&UPLOAD_ENDPOINT)
    }

    /// Cookie header for the session, if one is set and representable.
    fn session_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(session) = &self.session {
            match HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE, session)) {
                Ok(value) => {
                    headers.insert(COOKIE, value);
                }
                Err(_) => warn!("session cookie contains invalid characters, sending request without it"),
            }
        }
        headers
    }
}

/// Multipart form for `request`: the text fields followed by the file.
fn build_form(request: &UploadRequest) -> Result<multipart::Form, UploadError> {
    let mut form = multipart::Form::new();
    for (name, value) in request.text_fields() {
        form = form.text(name, value.to_string());
    }
    let part = multipart::Part::bytes(request.file.content.clone())
        .file_name(request.file.name.clone())
        .mime_str(&request.file.mime_type())?;
    Ok(form.part("file", part))
}

impl UploadTransport for ApiClient {
    /// POST the form and decode the JSON verdict. The body is decoded
    /// whatever the HTTP status, since the server reports failures there.
    fn submit(&self, request: &UploadRequest) -> Result<UploadResponse, UploadError> {
        let url = self.upload_url();
        let form = build_form(request)?;

        let res = self
            .client
            .post(&url)
            .headers(self.session_headers())
            .multipart(form)
            .send()?;

        let status = res.status();
        let body = res.bytes()?;
        debug!(%url, status = status.as_u16(), bytes = body.len(), "upload response received");

        serde_json::from_slice(&body).map_err(|source| UploadError::InvalidResponse {
            status: status.as_u16(),
            source,
        })
    }
}
