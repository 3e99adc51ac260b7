// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tfagent: crawling agent process.

use std::sync::Arc;

use anyhow::{Context, Result};
use tf_agent::{startup, Config, Listener};
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("failed to create {}", config.log_dir.display()))?;
    let (log_writer, _log_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&config.log_dir, "agent.log"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(log_writer))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let started = startup(&config).await.context("agent startup failed")?;
    let listener = Listener::new(started.listener, Arc::clone(&started.state.agent), config.ipc_timeout);
    let listen = tokio::spawn(listener.run());
    info!(socket = %config.socket_path.display(), "agent ready");

    wait_for_signal().await?;
    info!("signal received");
    listen.abort();
    started.state.shutdown().await;
    Ok(())
}

async fn wait_for_signal() -> Result<()> {
    let mut terminate = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("failed to listen for ctrl-c")?,
        _ = terminate.recv() => {}
    }
    Ok(())
}
