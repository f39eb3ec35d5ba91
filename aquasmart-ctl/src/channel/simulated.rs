/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! In-process stand-in for the irrigation device.
//!
//! Every command is answered with `Día N completado` after `ack_delay`, or
//! with `PARADA` on `stop_at_day`.  With `click_delay` set the device also
//! emits a `CLICK` before every day, mimicking an operator pressing the
//! joystick on a manually advanced installation.
//!
//! Responses are queued with an absolute release time, so dropping a
//! `receive_line` future halfway through its delay loses nothing.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use super::DeviceChannel;
use crate::resolver::DayCommand;

/// Behaviour of a [`SimulatedDevice`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulatedSettings {
    /// Time between receiving a command and acknowledging it.
    pub ack_delay: Duration,
    /// `Some` → emit `CLICK` at start and this long after each acknowledgement.
    pub click_delay: Option<Duration>,
    /// Answer `PARADA` instead of acknowledging this 1-indexed day.
    pub stop_at_day: Option<usize>,
}

struct Scripted {
    ready_at: Instant,
    line: String,
}

pub struct SimulatedDevice {
    settings: SimulatedSettings,
    queue: VecDeque<Scripted>,
    last_ready: Instant,
    received: Vec<String>,
}

impl SimulatedDevice {
    pub fn new(settings: SimulatedSettings) -> Self {
        let mut device = Self {
            settings,
            queue: VecDeque::new(),
            last_ready: Instant::now(),
            received: Vec::new(),
        };
        if let Some(delay) = device.settings.click_delay {
            device.enqueue(delay, "CLICK");
        }
        device
    }

    /// Command lines received so far, without terminators.
    pub fn received(&self) -> &[String] {
        &self.received
    }

    fn enqueue(&mut self, delay: Duration, line: impl Into<String>) {
        let ready_at = self.last_ready.max(Instant::now()) + delay;
        self.last_ready = ready_at;
        self.queue.push_back(Scripted {
            ready_at,
            line: line.into(),
        });
    }

    fn respond(&mut self, line: &str) {
        let command = match line.parse::<DayCommand>() {
            Ok(command) => command,
            Err(e) => {
                self.enqueue(Duration::ZERO, format!("[SIMULADO] {e}"));
                return;
            }
        };

        self.enqueue(Duration::ZERO, format!("[SIMULADO] Recibido → {command}"));
        if self.settings.stop_at_day == Some(command.day) {
            self.enqueue(self.settings.ack_delay, "PARADA");
            return;
        }

        self.enqueue(
            self.settings.ack_delay,
            format!("Día {} completado", command.day),
        );
        if let Some(delay) = self.settings.click_delay {
            self.enqueue(delay, "CLICK");
        }
    }
}

impl DeviceChannel for SimulatedDevice {
    async fn send(&mut self, line: &str) -> io::Result<()> {
        let line = line.trim_end();
        debug!(line, "simulated device received command");
        self.received.push(line.to_string());
        self.respond(line);
        Ok(())
    }

    async fn receive_line(&mut self) -> io::Result<Option<String>> {
        let Some(ready_at) = self.queue.front().map(|s| s.ready_at) else {
            // nothing left to say: the device went quiet for good
            return Ok(None);
        };
        tokio::time::sleep_until(ready_at).await;
        Ok(self.queue.pop_front().map(|s| s.line))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
