// Entrypoint for the CLI application.
// - Parses arguments, connects and authenticates, then runs one operation
//   (or the interactive shell).
// - Returns `anyhow::Result` for setup failures; operation failures only
//   change the exit code.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::Password;
use std::process::ExitCode;
use std::time::Duration;
use wfs_client::http::HttpConnector;
use wfs_client::{create_client, ui, ConnectionParams, Credentials, FileClient};

#[derive(Parser, Debug)]
#[command(name = "wfs-client", version, about = "Client for the WFS file service")]
struct Cli {
    /// Server host name or IP address
    host: String,

    /// Server port
    port: u16,

    /// User name
    username: String,

    /// URL scheme of the gateway
    #[arg(long, default_value = "http")]
    scheme: String,

    /// Password; prompted for when absent
    #[arg(long, env = "WFS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(long, default_value_t = 10_000)]
    connect_timeout_ms: u64,

    #[arg(long, default_value_t = 30_000)]
    recv_timeout_ms: u64,

    #[arg(long, default_value_t = 30_000)]
    send_timeout_ms: u64,

    /// Authentication attempts before giving up
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Wait between authentication attempts
    #[arg(long, default_value_t = 3_000)]
    retry_backoff_ms: u64,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a local file
    Upload {
        local: String,
        remote: String,
        /// Compression flag passed to the server as is
        #[arg(long, default_value_t = 0)]
        compress: i8,
    },
    /// Download a remote file
    Download { remote: String, local: String },
    /// Delete a remote file
    Delete { remote: String },
    /// Rename a remote file
    Rename { old: String, new: String },
    /// List a remote directory
    List {
        remote: String,
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
    /// Test the connection
    Ping,
    /// Interactive menu
    Shell,
}

impl Cli {
    fn connection_params(&self) -> ConnectionParams {
        ConnectionParams::new(self.host.clone(), self.port)
            .with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .with_receive_timeout(Duration::from_millis(self.recv_timeout_ms))
            .with_send_timeout(Duration::from_millis(self.send_timeout_ms))
            .with_max_retries(self.max_retries)
            .with_retry_backoff(Duration::from_millis(self.retry_backoff_ms))
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    ui::init_console(cli.verbose);

    let password = match cli.password.clone() {
        Some(password) => password,
        None => Password::new()
            .with_prompt("Password")
            .interact()
            .context("Failed to read password")?,
    };
    let credentials = Credentials::new(cli.username.clone(), password);

    println!("Server: {}:{}", cli.host, cli.port);
    println!("Username: {}", cli.username);

    let pb = ui::spinner("Connecting...");
    let created = create_client(
        HttpConnector::new().with_scheme(cli.scheme.clone()),
        cli.connection_params(),
        credentials.clone(),
    );
    pb.finish_and_clear();

    let client = match created {
        Ok(client) => client,
        Err(e) => {
            ui::failure(&format!("Failed to create client: {} - {}", e.code(), e));
            return Ok(ExitCode::FAILURE);
        }
    };
    ui::success("Client created successfully");

    let ok = match &cli.command {
        Command::Upload {
            local,
            remote,
            compress,
        } => ui::upload_file(&client, local, remote, *compress),
        Command::Download { remote, local } => ui::download_file(&client, remote, local),
        Command::Delete { remote } => ui::delete_file(&client, remote),
        Command::Rename { old, new } => ui::rename_file(&client, old, new),
        Command::List { remote, json } => ui::list_directory(&client, remote, *json),
        Command::Ping => ui::ping_server(&client),
        Command::Shell => {
            ui::main_menu(&client, &credentials)?;
            true
        }
    };

    client.disconnect();
    println!(
        "\n{}",
        if ok {
            "Operation completed successfully"
        } else {
            "Operation failed"
        }
    );
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
