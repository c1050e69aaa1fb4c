// Page-level collaborators: the pieces a browser page would normally keep
// in globals (course URL builder, CSRF token, error banner). Here they are
// plain values passed to whoever needs them.

use std::fmt;

/// Builds course-scoped URLs of the form
/// `{base_url}/courses/{term}/{course}/{part}/...`.
#[derive(Clone, Debug)]
pub struct CourseUrl {
    base_url: String,
    term: String,
    course: String,
}

impl CourseUrl {
    pub fn new(base_url: &str, term: &str, course: &str) -> Self {
        CourseUrl {
            base_url: base_url.trim_end_matches('/').to_string(),
            term: term.to_string(),
            course: course.to_string(),
        }
    }

    /// Join `parts` below the course root.
    pub fn build(&self, parts: &[&str]) -> String {
        let mut url = format!("{}/courses/{}/{}", self.base_url, self.term, self.course);
        for part in parts {
            url.push('/');
            url.push_str(part);
        }
        url
    }
}

/// Anti-forgery token sent with every state-changing request.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    pub fn new(token: impl Into<String>) -> Self {
        CsrfToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep the secret out of logs.
impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CsrfToken(***)")
    }
}

/// User-visible error reporting.
pub trait ErrorDisplay {
    fn display_error_message(&self, message: &str);
}

impl<D: ErrorDisplay + ?Sized> ErrorDisplay for &D {
    fn display_error_message(&self, message: &str) {
        (**self).display_error_message(message)
    }
}

/// Prints errors straight to the terminal.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalErrorDisplay;

impl ErrorDisplay for TerminalErrorDisplay {
    fn display_error_message(&self, message: &str) {
        println!("Error: {}", message);
    }
}
