/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Observation hooks for a delivery run.
//!
//! The protocol reports every transition and every device line as a
//! [`ProtocolEvent`] through an [`EventSink`].  Nothing in the protocol
//! depends on who listens:
//!
//! * [`TracingSink`] – structured `tracing` logs (the default for the CLI).
//! * [`RelaySink`] – JSON lines in the relay format consumed by the web
//!   front-end (`{"type": "log" | "evento" | "fin" | "error", ...}`).
//! * [`CallbackSink`] – any closure, e.g. to collect events in tests.
//!
//! Sinks compose: `(TracingSink, Some(relay))` feeds both.

use std::fmt;
use std::io::Write;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use super::{InterruptCause, RunOutcome};

/// One observable step of a delivery run.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolEvent {
    /// Manual advance: waiting for the device's `CLICK` before `day`.
    AwaitingTrigger { day: usize },
    DayStarted { day: usize },
    /// Resolved volume for one zone of the day being started.
    ZoneVolume {
        day: usize,
        zone: usize,
        volume: u64,
        rationed: bool,
    },
    CommandSent { day: usize, command: String },
    /// Non-empty line received from the device.  `day` is the day in
    /// progress when it arrived.
    DeviceLine { day: usize, line: String },
    /// The acknowledgement timeout elapsed; the protocol keeps waiting.
    StillWaiting { day: usize, waited: Duration },
    DayAcknowledged { day: usize },
    /// The run is being cut short.  `day` is the last day sent, if any.
    Interrupted {
        day: Option<usize>,
        cause: InterruptCause,
    },
    /// Terminal event, always the last one of a run.
    Finished { outcome: RunOutcome },
}

impl fmt::Display for ProtocolEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingTrigger { day } => write!(f, "waiting for CLICK to start day {day}"),
            Self::DayStarted { day } => write!(f, "=== Day {day} ==="),
            Self::ZoneVolume {
                zone,
                rationed: true,
                ..
            } => write!(f, "zone {zone} -> RATIONED (no water)"),
            Self::ZoneVolume { zone, volume, .. } => {
                write!(f, "zone {zone} -> delivering {volume}")
            }
            Self::CommandSent { command, .. } => write!(f, "sent -> {command}"),
            Self::DeviceLine { line, .. } => write!(f, "[DEVICE] {line}"),
            Self::StillWaiting { day, waited } => write!(
                f,
                "still waiting for day {day} after {:.1}s",
                waited.as_secs_f64()
            ),
            Self::DayAcknowledged { day } => write!(f, "confirmed: day {day} completed"),
            Self::Interrupted { day: Some(day), cause } => {
                write!(f, "interrupted at day {day} ({cause})")
            }
            Self::Interrupted { day: None, cause } => {
                write!(f, "interrupted before any day was sent ({cause})")
            }
            Self::Finished { outcome } => write!(f, "run finished: {outcome}"),
        }
    }
}

// ── EventSink ─────────────────────────────────────────────────────────────────

/// Receiver of [`ProtocolEvent`]s.  Must not block for long: it runs inline
/// with the protocol.
pub trait EventSink {
    fn emit(&mut self, event: &ProtocolEvent);
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: &ProtocolEvent) {
        (**self).emit(event);
    }
}

impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &ProtocolEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

impl<S: EventSink> EventSink for Option<S> {
    fn emit(&mut self, event: &ProtocolEvent) {
        if let Some(sink) = self {
            sink.emit(event);
        }
    }
}

/// Adapts a closure.
pub struct CallbackSink<F>(pub F);

impl<F: FnMut(&ProtocolEvent)> EventSink for CallbackSink<F> {
    fn emit(&mut self, event: &ProtocolEvent) {
        (self.0)(event);
    }
}

// ── TracingSink ───────────────────────────────────────────────────────────────

/// Logs events through `tracing`.  Device lines use the `device` target so
/// they can be filtered separately (`RUST_LOG=device=info`).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: &ProtocolEvent) {
        match event {
            ProtocolEvent::DeviceLine { day, line } => {
                info!(target: "device", day = *day, "{line}");
            }
            ProtocolEvent::ZoneVolume {
                day,
                zone,
                volume,
                rationed,
            } => info!(day = *day, zone = *zone, volume = *volume, rationed = *rationed, "{event}"),
            ProtocolEvent::StillWaiting { day, .. } => warn!(day = *day, "{event}"),
            ProtocolEvent::Interrupted { .. } => warn!("{event}"),
            _ => info!("{event}"),
        }
    }
}

// ── RelaySink ─────────────────────────────────────────────────────────────────

/// Wire shape of a relay event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelayEvent {
    Log {
        message: String,
    },
    Evento {
        dia: usize,
        zona: Option<usize>,
        estado: &'static str,
    },
    Fin {
        resultado: &'static str,
        dia_interrupcion: Option<usize>,
    },
    Error {
        message: String,
    },
}

impl RelayEvent {
    /// Relay events for one protocol event: always a `log`, plus an `evento`
    /// or `fin` where the front-end tracks progress.
    pub fn from_protocol(event: &ProtocolEvent) -> Vec<RelayEvent> {
        let mut out = vec![RelayEvent::Log {
            message: event.to_string(),
        }];
        match event {
            ProtocolEvent::DayStarted { day } => out.push(RelayEvent::Evento {
                dia: *day,
                zona: None,
                estado: "en_progreso",
            }),
            ProtocolEvent::ZoneVolume {
                day,
                zone,
                rationed,
                ..
            } => out.push(RelayEvent::Evento {
                dia: *day,
                zona: Some(*zone),
                estado: if *rationed {
                    "racionamiento"
                } else {
                    "en_progreso"
                },
            }),
            ProtocolEvent::DayAcknowledged { day } => out.push(RelayEvent::Evento {
                dia: *day,
                zona: None,
                estado: "completado",
            }),
            ProtocolEvent::Interrupted { day: Some(day), .. } => out.push(RelayEvent::Evento {
                dia: *day,
                zona: None,
                estado: "interrumpido",
            }),
            ProtocolEvent::Finished { outcome } => out.push(RelayEvent::Fin {
                resultado: outcome.label(),
                dia_interrupcion: outcome.interrupted_at(),
            }),
            _ => {}
        }
        out
    }
}

/// Writes relay events as JSON lines to any writer (stdout, a file, a pipe
/// read by the web relay).
pub struct RelaySink<W: Write> {
    writer: W,
}

impl<W: Write> RelaySink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Report a run-level failure (`{"type": "error"}`).
    pub fn report_error(&mut self, message: impl Into<String>) {
        self.write(&RelayEvent::Error {
            message: message.into(),
        });
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write(&mut self, event: &RelayEvent) {
        let result = serde_json::to_writer(&mut self.writer, event)
            .map_err(std::io::Error::from)
            .and_then(|()| self.writer.write_all(b"\n"))
            .and_then(|()| self.writer.flush());
        if let Err(e) = result {
            warn!(error = %e, "failed to write relay event");
        }
    }
}

impl<W: Write> EventSink for RelaySink<W> {
    fn emit(&mut self, event: &ProtocolEvent) {
        for relay in RelayEvent::from_protocol(event) {
            self.write(&relay);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
