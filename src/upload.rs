// Upload flow for notebook builder dependency files.
//
// `NotebookUploader::upload_file` sends one file and reports the outcome,
// `NotebookUploader::upload_files` walks a list of file inputs in order and
// uploads each selected file, one at a time.

use crate::page::{CsrfToken, ErrorDisplay};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, error, info};

/// Value of the `operation` form field for uploads.
pub const UPLOAD_OPERATION: &str = "upload";

/// Path segments of the upload endpoint below the course root.
pub const UPLOAD_ENDPOINT: [&str; 2] = ["notebook_builder", "file"];

/// Errors that stop an upload before the server's verdict is known.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("failed to send upload request")]
    Transport(#[from] reqwest::Error),
    #[error("server returned an unreadable response (HTTP {status})")]
    InvalidResponse {
        status: u16,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A file picked by the user: its name and raw content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRef {
    pub name: String,
    pub content: Vec<u8>,
}

impl FileRef {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        FileRef {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Read a file from disk, naming it after the last path component.
    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        let content = std::fs::read(path).map_err(|source| UploadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(FileRef { name, content })
    }

    /// MIME type guessed from the file name.
    pub fn mime_type(&self) -> String {
        mime_guess::from_path(&self.name)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}

/// A file selector that may or may not currently hold a file.
#[derive(Clone, Debug, Default)]
pub struct FileInput {
    selected: Option<FileRef>,
}

impl FileInput {
    pub fn empty() -> Self {
        FileInput { selected: None }
    }

    pub fn with_file(file: FileRef) -> Self {
        FileInput {
            selected: Some(file),
        }
    }

    pub fn selected(&self) -> Option<&FileRef> {
        self.selected.as_ref()
    }
}

/// Payload of a single upload request.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    pub csrf_token: CsrfToken,
    pub g_id: String,
    pub directory: String,
    pub file: FileRef,
}

impl UploadRequest {
    pub fn new(csrf_token: CsrfToken, file: FileRef, g_id: &str, directory: &str) -> Self {
        UploadRequest {
            csrf_token,
            g_id: g_id.to_string(),
            directory: directory.to_string(),
            file,
        }
    }

    /// Text fields of the form, in submission order. The file goes last
    /// under the `file` field.
    pub fn text_fields(&self) -> [(&'static str, &str); 4] {
        [
            ("csrf_token", self.csrf_token.as_str()),
            ("g_id", &self.g_id),
            ("directory", &self.directory),
            ("operation", UPLOAD_OPERATION),
        ]
    }
}

/// JSON body returned by the upload endpoint.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl UploadResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Sends an upload request and returns the decoded server response.
pub trait UploadTransport {
    fn submit(&self, request: &UploadRequest) -> Result<UploadResponse, UploadError>;
}

/// Uploads files for a gradeable, reporting each outcome through the log
/// and an `ErrorDisplay`.
pub struct NotebookUploader<T, D> {
    transport: T,
    display: D,
    csrf_token: CsrfToken,
}

impl<T: UploadTransport, D: ErrorDisplay> NotebookUploader<T, D> {
    pub fn new(transport: T, display: D, csrf_token: CsrfToken) -> Self {
        NotebookUploader {
            transport,
            display,
            csrf_token,
        }
    }

    /// Upload one file into `directory` of gradeable `g_id`.
    ///
    /// A server-reported failure is shown to the user and logged; it is not
    /// an `Err`. Only transport and decoding problems are returned.
    pub fn upload_file(&self, file: &FileRef, g_id: &str, directory: &str) -> Result<(), UploadError> {
        let request = UploadRequest::new(self.csrf_token.clone(), file.clone(), g_id, directory);
        debug!(file = %file.name, g_id, directory, "submitting upload");
        let response = self.transport.submit(&request)?;

        if response.is_success() {
            info!("Successfully uploaded {}.", file.name);
        } else {
            self.display
                .display_error_message(&format!("An error occurred uploading {}.", file.name));
            error!("{}", response.message.as_deref().unwrap_or_default());
        }
        Ok(())
    }

    /// Upload the selected file of every input, in order. Inputs without a
    /// file are skipped. Stops at the first error.
    pub fn upload_files(&self, inputs: &[FileInput], g_id: &str, directory: &str) -> Result<(), UploadError> {
        for file in inputs.iter().filter_map(FileInput::selected) {
            self.upload_file(file, g_id, directory)?;
        }
        Ok(())
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    enum Reply {
        Ok(UploadResponse),
        Unreadable,
    }

    struct FakeTransport {
        log: Log,
        replies: RefCell<VecDeque<Reply>>,
        requests: RefCell<Vec<UploadRequest>>,
    }

    impl FakeTransport {
        fn new(log: &Log, replies: Vec<Reply>) -> Self {
            FakeTransport {
                log: log.clone(),
                replies: RefCell::new(replies.into()),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl UploadTransport for FakeTransport {
        fn submit(&self, request: &UploadRequest) -> Result<UploadResponse, UploadError> {
            self.log.borrow_mut().push(format!("start {}", request.file.name));
            self.requests.borrow_mut().push(request.clone());
            let reply = self.replies.borrow_mut().pop_front().expect("unexpected request");
            self.log.borrow_mut().push(format!("end {}", request.file.name));
            match reply {
                Reply::Ok(response) => Ok(response),
                Reply::Unreadable => Err(UploadError::InvalidResponse {
                    status: 502,
                    source: serde_json::from_str::<UploadResponse>("<html>").unwrap_err(),
                }),
            }
        }
    }

    struct RecordingDisplay {
        log: Log,
    }

    impl ErrorDisplay for RecordingDisplay {
        fn display_error_message(&self, message: &str) {
            self.log.borrow_mut().push(format!("error {}", message));
        }
    }

    fn success() -> Reply {
        Reply::Ok(UploadResponse {
            status: "success".into(),
            message: None,
        })
    }

    fn failure(message: &str) -> Reply {
        Reply::Ok(UploadResponse {
            status: "fail".into(),
            message: Some(message.into()),
        })
    }

    fn uploader(log: &Log, replies: Vec<Reply>) -> NotebookUploader<FakeTransport, RecordingDisplay> {
        NotebookUploader::new(
            FakeTransport::new(log, replies),
            RecordingDisplay { log: log.clone() },
            CsrfToken::new("token-123"),
        )
    }

    fn input(name: &str) -> FileInput {
        FileInput::with_file(FileRef::new(name, name.as_bytes().to_vec()))
    }

    #[test]
    fn success_shows_no_error() {
        let log = Log::default();
        let uploader = uploader(&log, vec![success()]);

        uploader
            .upload_file(&FileRef::new("input.txt", "1 2 3"), "hw1", "test_input")
            .unwrap();

        assert_eq!(*log.borrow(), vec!["start input.txt", "end input.txt"]);
    }

    #[test]
    fn failure_shows_error_naming_the_file() {
        let log = Log::default();
        let uploader = uploader(&log, vec![failure("Invalid directory")]);

        uploader
            .upload_file(&FileRef::new("output.txt", "ok"), "hw1", "elsewhere")
            .unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                "start output.txt",
                "end output.txt",
                "error An error occurred uploading output.txt.",
            ]
        );
    }

    /// Writer that appends formatted log lines to a shared buffer.
    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    fn captured_logs(f: impl FnOnce()) -> Vec<String> {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .without_time()
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        buffer.lines()
    }

    #[test]
    fn success_is_logged_with_the_file_name() {
        let log = Log::default();
        let uploader = uploader(&log, vec![success()]);

        let lines = captured_logs(|| {
            uploader
                .upload_file(&FileRef::new("input.txt", "1 2 3"), "hw1", "test_input")
                .unwrap();
        });

        assert!(
            lines
                .iter()
                .any(|l| l.contains("INFO") && l.contains("Successfully uploaded input.txt.")),
            "{:?}",
            lines
        );
        assert!(!lines.iter().any(|l| l.contains("ERROR")), "{:?}", lines);
    }

    #[test]
    fn failure_logs_the_server_message() {
        let log = Log::default();
        let uploader = uploader(&log, vec![failure("Gradeable config is locked")]);

        let lines = captured_logs(|| {
            uploader
                .upload_file(&FileRef::new("output.txt", "ok"), "hw1", "test_output")
                .unwrap();
        });

        assert!(
            lines
                .iter()
                .any(|l| l.contains("ERROR") && l.contains("Gradeable config is locked")),
            "{:?}",
            lines
        );
        assert!(!lines.iter().any(|l| l.contains("Successfully uploaded")), "{:?}", lines);
    }

    #[test]
    fn request_carries_token_target_and_operation() {
        let log = Log::default();
        let uploader = uploader(&log, vec![success()]);
        let file = FileRef::new("expected.out", "42\n");

        uploader.upload_file(&file, "notebook_hw", "test_output").unwrap();

        let requests = uploader.transport().requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].text_fields(),
            [
                ("csrf_token", "token-123"),
                ("g_id", "notebook_hw"),
                ("directory", "test_output"),
                ("operation", "upload"),
            ]
        );
        assert_eq!(requests[0].file, file);
    }

    #[test]
    fn empty_inputs_are_skipped() {
        let log = Log::default();
        let uploader = uploader(&log, vec![success(), success()]);
        let inputs = [input("a.txt"), FileInput::empty(), input("c.txt")];

        uploader.upload_files(&inputs, "hw1", "test_input").unwrap();

        let names: Vec<String> = uploader
            .transport()
            .requests
            .borrow()
            .iter()
            .map(|r| r.file.name.clone())
            .collect();
        assert_eq!(names, vec!["a.txt", "c.txt"]);
    }

    #[test]
    fn batch_uploads_one_at_a_time() {
        let log = Log::default();
        let uploader = uploader(&log, vec![failure("disk full"), success(), failure("nope")]);
        let inputs = [input("a.txt"), input("b.txt"), input("c.txt")];

        uploader.upload_files(&inputs, "hw1", "test_input").unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                "start a.txt",
                "end a.txt",
                "error An error occurred uploading a.txt.",
                "start b.txt",
                "end b.txt",
                "start c.txt",
                "end c.txt",
                "error An error occurred uploading c.txt.",
            ]
        );
    }

    #[test]
    fn batch_stops_at_first_error() {
        let log = Log::default();
        let uploader = uploader(&log, vec![Reply::Unreadable, success(), success()]);
        let inputs = [input("a.txt"), input("b.txt"), input("c.txt")];

        let err = uploader.upload_files(&inputs, "hw1", "test_input").unwrap_err();

        assert!(matches!(err, UploadError::InvalidResponse { status: 502, .. }));
        assert_eq!(uploader.transport().requests.borrow().len(), 1);
    }

    #[test]
    fn batch_without_selected_files_sends_nothing() {
        let log = Log::default();
        let uploader = uploader(&log, vec![]);

        uploader
            .upload_files(&[FileInput::empty(), FileInput::default()], "hw1", "test_input")
            .unwrap();

        assert!(log.borrow().is_empty());
    }

    #[test]
    fn response_status_decides_success() {
        let ok: UploadResponse = serde_json::from_str(r#"{"status":"success","data":null}"#).unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.message, None);

        let bad: UploadResponse =
            serde_json::from_str(r#"{"status":"fail","message":"Gradeable not found"}"#).unwrap();
        assert!(!bad.is_success());
        assert_eq!(bad.message.as_deref(), Some("Gradeable not found"));
    }

    #[test]
    fn file_ref_reads_name_and_content_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input_1.txt");
        std::fs::write(&path, b"5 7\n").unwrap();

        let file = FileRef::from_path(&path).unwrap();

        assert_eq!(file.name, "input_1.txt");
        assert_eq!(file.content, b"5 7\n");
        assert_eq!(file.mime_type(), "text/plain");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileRef::from_path(&dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, UploadError::Io { .. }));
    }

    #[test]
    fn unknown_extension_falls_back_to_octet_stream() {
        assert_eq!(FileRef::new("data.zzunknown", "").mime_type(), "application/octet-stream");
    }
}
