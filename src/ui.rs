// UI layer: console setup, coloured output and the per-operation flows used
// by the binary. Every flow takes a `&dyn FileClient` so it works with any
// session, and reports success as a plain `bool` for the exit code.

use crate::error::SessionError;
use crate::fsutil;
use crate::session::FileClient;
use crate::types::{Credentials, DirectoryListing, ErrorInfo, FileBlob};
use anyhow::Result;
use crossterm::style::Stylize;
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Explicit console initialization, called once by `main` before any
/// output. Installs the tracing subscriber on stderr; `RUST_LOG` wins over
/// the verbosity flag when set.
pub fn init_console(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second initialization (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Spinner shown while a blocking call is in flight.
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

pub fn section(title: &str) {
    println!("\n{}", format!("--- {} ---", title).cyan());
}

pub fn success(message: &str) {
    println!("{}", message.green());
}

pub fn failure(message: &str) {
    println!("{}", message.red());
}

fn report_error(action: &str, err: &SessionError) {
    failure(&format!("{} failed: {} - {}", action, err.code(), err));
}

/// Format a modification time as UTC, falling back to the raw value when
/// it is outside chrono's range.
pub fn format_mtime(mtime: i64) -> String {
    chrono::DateTime::from_timestamp(mtime, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| mtime.to_string())
}

/// Render a listing as a table, in server order.
pub fn format_listing(listing: &DirectoryListing) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "| {:<30} | {:<12} | {:<20} | {:<5} |\n",
        "Name", "Size(bytes)", "Modified Time", "Type"
    ));
    out.push_str("|--------------------------------|--------------|----------------------|-------|\n");
    for entry in &listing.entries {
        out.push_str(&format!(
            "| {:<30} | {:<12} | {:<20} | {:<5} |\n",
            entry.name,
            entry.size,
            format_mtime(entry.mtime),
            if entry.is_dir { "Dir" } else { "File" }
        ));
    }
    out
}

/// Read a local file and upload it under `remote_path`.
pub fn upload_file(client: &dyn FileClient, local_path: &str, remote_path: &str, compress: i8) -> bool {
    section("Upload File");

    let data = match fsutil::read_file(local_path) {
        Ok(data) => data,
        Err(e) => {
            failure(&format!("Exception during file upload: {:#}", e));
            return false;
        }
    };
    println!("Reading local file: {} ({} bytes)", local_path, data.len());

    let blob = FileBlob::new(remote_path, data).with_compress(compress);
    let pb = spinner("Uploading...");
    let result = client.upload_file(&blob);
    pb.finish_and_clear();

    match result {
        Ok(()) => {
            success("File uploaded successfully!");
            true
        }
        Err(e) => {
            report_error("Upload", &e);
            false
        }
    }
}

/// Download `remote_path` and store it at `local_path`, or inside it when
/// `local_path` is a directory.
pub fn download_file(client: &dyn FileClient, remote_path: &str, local_path: &str) -> bool {
    section("Download File");

    let pb = spinner("Downloading...");
    let result = client.download_file(remote_path);
    pb.finish_and_clear();

    let data = match result {
        Ok(data) => data,
        Err(e) => {
            report_error("Download", &e);
            return false;
        }
    };

    let target = fsutil::download_target(local_path, remote_path);
    match fsutil::write_file(&target, &data) {
        Ok(()) => {
            success(&format!(
                "File downloaded successfully: {} -> {} ({} bytes)",
                remote_path,
                target,
                data.len()
            ));
            true
        }
        Err(e) => {
            failure(&format!("Exception during file download: {:#}", e));
            false
        }
    }
}

pub fn delete_file(client: &dyn FileClient, remote_path: &str) -> bool {
    section("Delete File");

    match client.delete_file(remote_path) {
        Ok(()) => {
            success(&format!("File deleted successfully: {}", remote_path));
            true
        }
        Err(e) => {
            report_error("Deletion", &e);
            false
        }
    }
}

pub fn rename_file(client: &dyn FileClient, old_path: &str, new_path: &str) -> bool {
    section("Rename File");

    match client.rename_file(old_path, new_path) {
        Ok(()) => {
            success(&format!("File renamed successfully: {} -> {}", old_path, new_path));
            true
        }
        Err(e) => {
            report_error("Rename", &e);
            false
        }
    }
}

/// List a remote directory as a table, or as JSON when `json` is set.
pub fn list_directory(client: &dyn FileClient, remote_path: &str, json: bool) -> bool {
    let listing = match client.list_directory(remote_path) {
        Ok(listing) => listing,
        Err(e) => {
            report_error("Directory listing", &e);
            return false;
        }
    };

    if json {
        match serde_json::to_string_pretty(&listing) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                failure(&format!("Cannot encode listing: {}", e));
                return false;
            }
        }
    } else {
        section("List Directory");
        success(&format!("Directory listing ({}):", remote_path));
        print!("{}", format_listing(&listing));
    }
    true
}

pub fn ping_server(client: &dyn FileClient) -> bool {
    section("Test Connection");

    let response = client.ping();
    match describe_ping(response, &client.last_error()) {
        Ok(message) => {
            success(&message);
            true
        }
        Err(message) => {
            failure(&message);
            false
        }
    }
}

/// A negative echo is reported as a failure, but the round trip itself
/// succeeded and left no error behind.
fn describe_ping(response: i8, last: &ErrorInfo) -> Result<String, String> {
    if response >= 0 {
        Ok(format!("Server responded to ping: {}", response))
    } else if last.is_set() {
        Err(format!("Ping failed: {} - {}", last.code, last.message))
    } else {
        Err(format!("Ping failed: server answered {}", response))
    }
}

/// Interactive menu. Runs a select loop until the user picks "Exit".
///
/// `credentials` are replayed after a reconnect, since reconnecting drops
/// authentication.
pub fn main_menu(client: &dyn FileClient, credentials: &Credentials) -> Result<()> {
    loop {
        let items = vec![
            "Upload", "Download", "Delete", "Rename", "List", "Ping", "Reconnect", "Exit",
        ];
        let selection = Select::new().items(&items).default(0).interact()?;
        match selection {
            0 => {
                let local: String = Input::new().with_prompt("Local file path").interact_text()?;
                let remote: String = Input::new()
                    .with_prompt("Remote file path")
                    .default(fsutil::file_name(&local).to_string())
                    .interact_text()?;
                upload_file(client, &local, &remote, 0);
            }
            1 => {
                let remote: String = Input::new().with_prompt("Remote file path").interact_text()?;
                let local: String = Input::new()
                    .with_prompt("Local file path")
                    .default(fsutil::file_name(&remote).to_string())
                    .interact_text()?;
                download_file(client, &remote, &local);
            }
            2 => {
                let remote: String = Input::new().with_prompt("Remote file path").interact_text()?;
                delete_file(client, &remote);
            }
            3 => {
                let old: String = Input::new().with_prompt("Current path").interact_text()?;
                let new: String = Input::new().with_prompt("New path").interact_text()?;
                rename_file(client, &old, &new);
            }
            4 => {
                let remote: String = Input::new()
                    .with_prompt("Remote directory")
                    .default("/".to_string())
                    .interact_text()?;
                list_directory(client, &remote, false);
            }
            5 => {
                ping_server(client);
            }
            6 => {
                let pb = spinner("Reconnecting...");
                let result = client
                    .reconnect()
                    .and_then(|()| client.authenticate(credentials.clone()));
                pb.finish_and_clear();
                match result {
                    Ok(()) => success("Reconnected and authenticated"),
                    Err(e) => report_error("Reconnect", &e),
                }
            }
            7 => break,
            _ => {}
        }
    }
    Ok(())
}
