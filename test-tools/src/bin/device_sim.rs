/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Irrigation device firmware simulator.
//!
//! Listens on TCP and speaks the device's line protocol, so the controller
//! can be exercised end to end with `device.kind: tcp`:
//!
//! ```text
//!   controller ── "3,977,0\n" ──────────────▶ device-sim
//!              ◀─ "Zona 0 regando 977\n" ───
//!              ◀─ "Zona 1 sin riego\n" ─────
//!              ◀─ "Día 3 completado\n" ─────   (or "PARADA" on --stop-at)
//!              ◀─ "CLICK\n" ────────────────   (--click only)
//! ```
//!
//! Example:
//!   device-sim --port 7000 --delay-ms 1500 --stop-at 4

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use aquasmart_ctl::resolver::DayCommand;

// ── CLI argument definition ───────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "device-sim",
    about = "AquaSmart device simulator – answers day commands over TCP",
    long_about = None,
)]
struct Cli {
    /// Address to bind.
    #[arg(long = "host", default_value = "127.0.0.1")]
    host: String,

    /// TCP port to listen on.
    #[arg(short = 'p', long = "port", default_value_t = 7000)]
    port: u16,

    /// Delay before acknowledging a day, in milliseconds.
    #[arg(short = 'd', long = "delay-ms", default_value_t = 1500)]
    delay_ms: u64,

    /// Answer PARADA instead of acknowledging this 1-indexed day.
    #[arg(long = "stop-at")]
    stop_at: Option<usize>,

    /// Send CLICK before every day (manual-advance deployments).
    #[arg(long = "click", default_value_t = false)]
    click: bool,

    /// Delay before each CLICK, in milliseconds.
    #[arg(long = "click-delay-ms", default_value_t = 2000)]
    click_delay_ms: u64,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    let cli = Cli::parse();
    info!(
        host     = %cli.host,
        port     = cli.port,
        delay_ms = cli.delay_ms,
        stop_at  = ?cli.stop_at,
        click    = cli.click,
        "Configuration"
    );

    if let Err(e) = serve(&cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn serve(cli: &Cli) -> Result<()> {
    let address = format!("{}:{}", cli.host, cli.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Cannot listen on {address}"))?;
    info!("device-sim listening on {address}");

    // One controller at a time, like a real board on a serial cable.
    loop {
        let (stream, peer) = listener.accept().await.context("accept failed")?;
        info!(%peer, "controller connected");
        match session(stream, cli).await {
            Ok(days) => info!(%peer, days, "controller disconnected"),
            Err(e) => warn!(%peer, "session ended with error: {:#}", e),
        }
    }
}

/// Serve one controller until it disconnects or the stop day is reached.
/// Returns the number of commands answered.
async fn session(stream: TcpStream, cli: &Cli) -> Result<usize> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let delay = Duration::from_millis(cli.delay_ms);
    let click_delay = Duration::from_millis(cli.click_delay_ms);
    let mut answered = 0;

    if cli.click {
        tokio::time::sleep(click_delay).await;
        send(&mut writer, "CLICK").await?;
    }

    while let Some(line) = lines.next_line().await.context("read failed")? {
        let command: DayCommand = match line.parse() {
            Ok(command) => command,
            Err(e) => {
                warn!("{e}");
                send(&mut writer, &format!("[SIM] {e}")).await?;
                continue;
            }
        };
        answered += 1;
        info!(day = command.day, volumes = ?command.volumes, "command received");

        for (zone, volume) in command.volumes.iter().enumerate() {
            let status = if *volume == 0 {
                format!("Zona {zone} sin riego")
            } else {
                format!("Zona {zone} regando {volume}")
            };
            send(&mut writer, &status).await?;
        }

        tokio::time::sleep(delay).await;

        if cli.stop_at == Some(command.day) {
            send(&mut writer, "PARADA").await?;
            info!(day = command.day, "stop day reached, closing session");
            break;
        }
        send(&mut writer, &format!("Día {} completado", command.day)).await?;

        if cli.click {
            tokio::time::sleep(click_delay).await;
            send(&mut writer, "CLICK").await?;
        }
    }
    Ok(answered)
}

async fn send(writer: &mut tokio::net::tcp::OwnedWriteHalf, line: &str) -> Result<()> {
    debug!(line, "-> controller");
    writer
        .write_all(format!("{line}\n").as_bytes())
        .await
        .context("write failed")
}
