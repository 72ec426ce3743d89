//! CLI interface for Switchboard
//!
//! This module provides the command-line interface using clap's derive API,
//! along with the handlers the binary dispatches to.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use api_server::ApiServer;
use sdk::service::{IntegrationStatus, ServiceHandle};

/// Switchboard query router
///
/// Routes prompts to a task-management agent, an internal document search
/// agent or a plain LLM, and serves the result over HTTP.
#[derive(Parser, Debug)]
#[command(name = "switchboard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API server
    Serve {
        /// Address to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Answer a single prompt and exit
    Ask {
        /// The prompt to answer
        prompt: String,
    },

    /// Show which backend a prompt would be routed to, without calling it
    Route {
        /// The prompt to classify
        prompt: String,
    },

    /// Show which integrations are configured and connected
    Status,
}

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Start the API server and run until Ctrl-C
pub async fn handle_serve(
    config: &Config,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

    let dispatcher = Arc::new(Dispatcher::from_config(config).await?);
    let service = ServiceHandle::new(Arc::clone(&dispatcher) as Arc<dyn sdk::QueryService>);

    let server = ApiServer::bind(addr, service).await?;
    println!("Switchboard listening on http://{}", server.local_addr()?);

    server
        .serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    dispatcher.shutdown().await;
    Ok(())
}

/// Answer one prompt
pub async fn handle_ask(prompt: &str, config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let dispatcher = Dispatcher::from_config(config).await?;
    let result = dispatcher.dispatch(prompt).await;
    dispatcher.shutdown().await;
    let response = result?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        OutputFormat::Text => println!("{}", response.text),
    }
    Ok(())
}

/// Classify a prompt without building any backend
pub fn handle_route(prompt: &str, config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let router = crate::intent::QueryRouter::build(&config.routing)
        .context("Invalid routing pattern in config")?;
    let classification = router.classify(prompt);
    let domain = classification.tag();

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "domain": domain,
                "task_match": classification.task,
                "document_match": classification.document,
            }))?
        ),
        OutputFormat::Text => {
            println!("{}", domain);
            if let Some(hit) = router.task_matcher().find(prompt) {
                println!("  task keyword:     {}", hit);
            }
            if let Some(hit) = router.document_matcher().find(prompt) {
                println!("  document keyword: {}", hit);
            }
        }
    }
    Ok(())
}

/// Build the backends and report what came up
pub async fn handle_status(config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let dispatcher = Dispatcher::from_config(config).await?;
    let status = dispatcher.status();
    let providers = dispatcher.provider_health().await;
    dispatcher.shutdown().await;

    match format {
        OutputFormat::Json => {
            let providers: serde_json::Map<String, serde_json::Value> = providers
                .into_iter()
                .map(|(name, healthy)| (name, json!(healthy)))
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "integrations": status,
                    "providers": providers,
                }))?
            );
        }
        OutputFormat::Text => {
            println!("Integrations:");
            println!("  Asana:          {}", describe(status.tasks));
            println!("  Knowledge Base: {}", describe(status.knowledge_base));
            println!("LLM providers:");
            for (name, healthy) in providers {
                println!(
                    "  {:<15} {}",
                    format!("{}:", name),
                    if healthy { "healthy" } else { "unreachable" }
                );
            }
        }
    }
    Ok(())
}

fn describe(status: IntegrationStatus) -> &'static str {
    match (status.enabled, status.connected) {
        (true, true) => "enabled (connected)",
        (true, false) => "enabled (disconnected)",
        _ => "disabled",
    }
}
