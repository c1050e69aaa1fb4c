// Library root
// ------------
// This crate exposes a small library surface for the CLI. The binary
// (`main.rs`) uses these modules to run the interactive uploader.
//
// Module responsibilities:
// - `page`: course URL builder, CSRF token and error display, passed in
//   explicitly instead of living in globals.
// - `upload`: single-file and batch upload flow over an `UploadTransport`.
// - `api`: the HTTP transport that posts multipart forms to the server.
// - `config`: environment configuration and saved session handling.
// - `ui`: terminal prompts that collect files and start a batch.
pub mod api;
pub mod config;
pub mod page;
pub mod ui;
pub mod upload;
