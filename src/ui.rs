// UI layer: a simple interactive menu using `dialoguer`. The user picks a
// gradeable, a target directory and a set of files, then the batch is
// handed to `NotebookUploader`.

use crate::api::ApiClient;
use crate::config::Session;
use crate::page::TerminalErrorDisplay;
use crate::upload::{FileInput, FileRef, NotebookUploader};
use anyhow::Result;
use dialoguer::{Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

const DIRECTORIES: [&str; 2] = ["test_input", "test_output"];

/// Upper bound on file selectors asked for in one batch.
const MAX_SELECTORS: usize = 100;

/// Main interactive menu. Runs until the user chooses "Exit".
pub fn main_menu(mut api: ApiClient, mut session: Option<Session>) -> Result<()> {
    loop {
        let items = vec!["Set session", "Upload files", "Exit"];
        let selection = Select::new().items(&items).default(1).interact()?;
        match selection {
            0 => {
                let new_session = prompt_session()?;
                api.set_session(&new_session.session_cookie);
                if let Err(e) = new_session.save(&Session::default_path()) {
                    warn!("could not persist session: {:#}", e);
                }
                session = Some(new_session);
            }
            1 => {
                let Some(current) = &session else {
                    println!("You should set a session first to upload files.");
                    continue;
                };
                handle_upload(&api, current)?;
            }
            2 => break,
            _ => {}
        }
    }
    Ok(())
}

/// Ask for the CSRF token and session cookie of a logged-in browser.
fn prompt_session() -> Result<Session> {
    let csrf_token: String = Password::new().with_prompt("CSRF token").interact()?;
    let session_cookie: String = Password::new().with_prompt("Session cookie").interact()?;
    Ok(Session {
        csrf_token,
        session_cookie,
    })
}

/// Collect the upload target and file selectors, then upload the batch.
fn handle_upload(api: &ApiClient, session: &Session) -> Result<()> {
    let g_id: String = Input::new().with_prompt("Gradeable id").interact_text()?;
    let directory = prompt_directory()?;

    let count: usize = Input::new()
        .with_prompt("Number of file selectors")
        .default(1)
        .validate_with(check_selector_count)
        .interact_text()?;
    let mut inputs = Vec::new();
    for i in 1..=count {
        let path: String = Input::new()
            .with_prompt(format!("File for selector #{} (blank for none)", i))
            .allow_empty(true)
            .interact_text()?;
        inputs.push(select_file(&path));
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message("Uploading...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let uploader = NotebookUploader::new(api.clone(), TerminalErrorDisplay, session.csrf_token());
    let result = uploader.upload_files(&inputs, &g_id, &directory);
    spinner.finish_and_clear();

    match result {
        Ok(()) => println!("Upload finished"),
        Err(e) => println!("Upload failed: {:#}", anyhow::Error::from(e)),
    }
    Ok(())
}

fn check_selector_count(count: &usize) -> Result<(), String> {
    if *count > MAX_SELECTORS {
        return Err(format!("at most {} file selectors per batch", MAX_SELECTORS));
    }
    Ok(())
}

fn prompt_directory() -> Result<String> {
    let mut items: Vec<&str> = DIRECTORIES.to_vec();
    items.push("Other...");
    let selection = Select::new()
        .with_prompt("Directory")
        .items(&items)
        .default(0)
        .interact()?;
    if selection < DIRECTORIES.len() {
        return Ok(DIRECTORIES[selection].to_string());
    }
    let directory: String = Input::new().with_prompt("Directory name").interact_text()?;
    Ok(directory)
}

/// Turn a typed path into a file selector. Blank or unreadable paths leave
/// the selector empty.
fn select_file(path: &str) -> FileInput {
    let path = path.trim();
    if path.is_empty() {
        return FileInput::empty();
    }
    match FileRef::from_path(Path::new(path)) {
        Ok(file) => FileInput::with_file(file),
        Err(e) => {
            println!("Skipping selector: {:#}", anyhow::Error::from(e));
            FileInput::empty()
        }
    }
}
