// Copyright 2026 The Chatstream Project
// SPDX-License-Identifier: Apache-2.0

use std::io::Write as _;
use std::sync::Arc;

use clap::Parser;
use chatstream::config::{self, Config, ConfigError, ConfigSource, FileSource};
use chatstream::notify::{Notification, Notifier};
use chatstream::{ChatClient, ChatSession, ReqwestHttpSender};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chatstream", about = "Streaming chat client")]
struct Cli {
    /// Path to the chatstream.yaml config file
    #[arg(long, default_value = "chatstream.yaml", env = "CHATSTREAM_CONFIG")]
    config: String,

    /// Chat endpoint URL, overrides endpoint.url from the config file
    #[arg(long, env = "CHATSTREAM_URL")]
    url: Option<String>,
}

/// Prints notifications on stderr, one line each.
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notification: Notification) {
        eprintln!("[{}] {}", notification.title, notification.description);
    }
}

fn load(cli: &Cli, source: &impl ConfigSource) -> Result<Config, ConfigError> {
    match (config::load_config(source), cli.url.as_deref()) {
        (Ok(config), Some(url)) => config.with_url(url),
        (Ok(config), None) => Ok(config),
        // No config file is fine when the endpoint comes from the command line.
        (Err(e), Some(url)) if e.is_not_found() => Config::for_url(url),
        (Err(e), _) => Err(e),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let source = FileSource {
        path: std::path::PathBuf::from(&cli.config),
    };
    let config = match load(&cli, &source) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(source = %source.describe(), "failed to load config: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        source = %source.describe(),
        version = %config.version,
        url = %config.endpoint.url,
        timeout_ms = ?config.endpoint.timeout_ms,
        max_pending_bytes = config.stream.max_pending_bytes,
        "config loaded"
    );

    let http = Arc::new(ReqwestHttpSender::default());
    let client = ChatClient::from_config(http, &config.endpoint);
    let mut session = ChatSession::new(client, Arc::new(StderrNotifier))
        .with_max_pending_bytes(config.stream.max_pending_bytes);

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());

    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let line = tokio::select! {
            line = lines.next() => line,
            _ = tokio::signal::ctrl_c() => None,
        };
        let input = match line {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                tracing::error!("failed to read stdin: {e}");
                break;
            }
            None => break,
        };
        if input.trim().is_empty() {
            continue;
        }

        // The callback sees the whole reply so far; print only what is new.
        let mut printed = 0;
        let send = session.send(input, |reply| {
            let mut out = std::io::stdout();
            let _ = out.write_all(reply.content[printed..].as_bytes());
            let _ = out.flush();
            printed = reply.content.len();
        });

        tokio::select! {
            result = send => {
                // Failures were already reported by the notifier.
                if result.is_ok() {
                    println!();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                eprintln!("[cancelled]");
            }
        }
    }

    println!();
    tracing::info!(messages = session.conversation().len(), "chatstream exiting");
}
