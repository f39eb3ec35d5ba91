/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Day-sequenced delivery protocol.
//!
//! [`DeliveryProtocol`] sends one [`DayCommand`] at a time and waits for the
//! device to confirm the day before moving on:
//!
//! ```text
//!   AwaitingDayStart ──send──▶ DaySent ──"Día N completado"──▶ DayAcknowledged
//!          ▲                      │                                │
//!          └──────── next day ────┼────────────────────────────────┤
//!                                 │ "PARADA" / link closed         │ last day
//!                                 ▼                                ▼
//!                            Interrupted ──────────────────────▶ Finished
//! ```
//!
//! In [`AdvanceMode::Manual`] a `CLICK` line from the device must arrive
//! before each command is sent.
//!
//! An interruption is always recorded at the last day that was actually
//! sent.  If the link fails before the first command went out the outcome is
//! [`RunOutcome::NotStarted`].  No day is ever retried.

pub mod events;
pub mod signal;

pub use events::{CallbackSink, EventSink, ProtocolEvent, RelayEvent, RelaySink, TracingSink};
pub use signal::{classify, DeviceSignal};

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::channel::DeviceChannel;
use crate::error::ChannelError;
use crate::resolver::DayCommand;

// ── Public types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    AwaitingDayStart,
    DaySent,
    DayAcknowledged,
    Interrupted,
    Finished,
}

/// How the next day is started once the previous one is acknowledged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvanceMode {
    /// Send the next command right away.
    #[default]
    Automatic,
    /// Wait for a `CLICK` line from the device first.
    Manual,
}

/// Why a run ended before its last day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptCause {
    /// The device sent `PARADA`.
    StopSignal,
    /// The device closed the link.
    ChannelClosed,
    /// Reading from or writing to the link failed.
    ChannelFailure,
}

impl fmt::Display for InterruptCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StopSignal => "stop signal from device",
            Self::ChannelClosed => "device closed the link",
            Self::ChannelFailure => "device link failure",
        })
    }
}

/// Terminal result of a delivery run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every day was acknowledged.
    Finished { days: usize },
    /// Cut short; `day` is the last day sent.
    Interrupted { day: usize, cause: InterruptCause },
    /// Cut short before the first command was sent.
    NotStarted { cause: InterruptCause },
}

impl RunOutcome {
    /// Day at which the run was interrupted, if it was and a day had been sent.
    pub fn interrupted_at(&self) -> Option<usize> {
        match self {
            Self::Interrupted { day, .. } => Some(*day),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Finished { .. } => "finished",
            Self::Interrupted { .. } => "interrupted",
            Self::NotStarted { .. } => "not_started",
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finished { days } => write!(f, "all {days} day(s) delivered"),
            Self::Interrupted { day, cause } => write!(f, "interrupted at day {day}: {cause}"),
            Self::NotStarted { cause } => write!(f, "no day delivered: {cause}"),
        }
    }
}

/// Everything a caller needs after [`DeliveryProtocol::run`].
#[derive(Debug)]
pub struct DeliveryReport {
    pub outcome: RunOutcome,
    /// Days whose command reached the link, in order.
    pub days_sent: Vec<usize>,
    /// The link failure that ended the run, if any.
    pub error: Option<ChannelError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolOptions {
    pub advance: AdvanceMode,
    /// Log a "still waiting" event every time this elapses without a line.
    /// The protocol never gives up on its own.
    pub ack_timeout: Option<Duration>,
}

// ── DeliveryProtocol ──────────────────────────────────────────────────────────

pub struct DeliveryProtocol<C> {
    channel: C,
    commands: Vec<DayCommand>,
    options: ProtocolOptions,
    state: ProtocolState,
    /// Index into `commands` of the day in progress.
    cursor: usize,
    days_sent: Vec<usize>,
    outcome: Option<RunOutcome>,
}

impl<C: DeviceChannel + Send> DeliveryProtocol<C> {
    /// `commands` must be the resolved days in order, starting at day 1.
    pub fn new(channel: C, commands: Vec<DayCommand>, options: ProtocolOptions) -> Self {
        Self {
            channel,
            commands,
            options,
            state: ProtocolState::AwaitingDayStart,
            cursor: 0,
            days_sent: Vec::new(),
            outcome: None,
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// 1-indexed day in progress, or `None` once past the last day.
    pub fn day(&self) -> Option<usize> {
        self.commands.get(self.cursor).map(|c| c.day)
    }

    pub fn days_sent(&self) -> &[usize] {
        &self.days_sent
    }

    /// Set once the run is over.
    pub fn outcome(&self) -> Option<RunOutcome> {
        self.outcome
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn into_channel(self) -> C {
        self.channel
    }

    /// Drive the protocol until it reaches [`ProtocolState::Finished`].
    ///
    /// Link failures do not abort early: the run moves to `Interrupted` at
    /// the last day sent, finishes, and the error is handed back in the
    /// report so artifacts can still be written.
    pub async fn run<S: EventSink + Send>(&mut self, mut sink: S) -> DeliveryReport {
        let mut error = None;
        loop {
            match self.step(&mut sink).await {
                Ok(ProtocolState::Finished) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "device link failed");
                    error = Some(e);
                }
            }
        }

        DeliveryReport {
            outcome: self.outcome.unwrap_or(RunOutcome::Finished {
                days: self.days_sent.len(),
            }),
            days_sent: self.days_sent.clone(),
            error,
        }
    }

    /// Perform one state transition and return the new state.
    ///
    /// # Errors
    /// A [`ChannelError`] when the link fails.  The protocol is already in
    /// [`ProtocolState::Interrupted`] when this is returned; keep stepping
    /// to reach `Finished`.
    pub async fn step<S>(&mut self, sink: &mut S) -> Result<ProtocolState, ChannelError>
    where
        S: EventSink + Send + ?Sized,
    {
        match self.state {
            ProtocolState::AwaitingDayStart => self.start_day(sink).await?,
            ProtocolState::DaySent => self.await_acknowledgement(sink).await?,
            ProtocolState::DayAcknowledged => {
                self.cursor += 1;
                if self.cursor >= self.commands.len() {
                    self.finish(
                        RunOutcome::Finished {
                            days: self.days_sent.len(),
                        },
                        sink,
                    );
                } else {
                    self.state = ProtocolState::AwaitingDayStart;
                }
            }
            ProtocolState::Interrupted => {
                if let Some(outcome) = self.outcome {
                    self.finish(outcome, sink);
                }
            }
            ProtocolState::Finished => {}
        }
        Ok(self.state)
    }

    async fn start_day<S>(&mut self, sink: &mut S) -> Result<(), ChannelError>
    where
        S: EventSink + Send + ?Sized,
    {
        let Some(command) = self.commands.get(self.cursor).cloned() else {
            self.finish(
                RunOutcome::Finished {
                    days: self.days_sent.len(),
                },
                sink,
            );
            return Ok(());
        };
        let day = command.day;

        if self.options.advance == AdvanceMode::Manual && !self.await_trigger(day, sink).await? {
            return Ok(());
        }

        sink.emit(&ProtocolEvent::DayStarted { day });
        for (zone, &volume) in command.volumes.iter().enumerate() {
            sink.emit(&ProtocolEvent::ZoneVolume {
                day,
                zone,
                volume,
                rationed: command.rationed.contains(&zone),
            });
        }

        let line = command.to_line();
        if let Err(source) = self.channel.send(&line).await {
            self.interrupt(InterruptCause::ChannelFailure, sink);
            return Err(ChannelError::Write { day, source });
        }
        self.days_sent.push(day);
        sink.emit(&ProtocolEvent::CommandSent {
            day,
            command: command.to_string(),
        });
        self.state = ProtocolState::DaySent;
        Ok(())
    }

    /// Wait for `CLICK`.  Returns `false` if the run was interrupted instead.
    async fn await_trigger<S>(&mut self, day: usize, sink: &mut S) -> Result<bool, ChannelError>
    where
        S: EventSink + Send + ?Sized,
    {
        sink.emit(&ProtocolEvent::AwaitingTrigger { day });
        loop {
            let Some(line) = self.next_line(day, sink).await? else {
                self.interrupt(InterruptCause::ChannelClosed, sink);
                return Ok(false);
            };
            match classify(&line) {
                DeviceSignal::Empty => {}
                DeviceSignal::Click => {
                    debug!(day, "trigger received");
                    return Ok(true);
                }
                DeviceSignal::Stop => {
                    sink.emit(&ProtocolEvent::DeviceLine { day, line });
                    self.interrupt(InterruptCause::StopSignal, sink);
                    return Ok(false);
                }
                DeviceSignal::DayComplete | DeviceSignal::Log => {
                    sink.emit(&ProtocolEvent::DeviceLine { day, line });
                }
            }
        }
    }

    async fn await_acknowledgement<S>(&mut self, sink: &mut S) -> Result<(), ChannelError>
    where
        S: EventSink + Send + ?Sized,
    {
        let day = self.day().unwrap_or_default();
        loop {
            let Some(line) = self.next_line(day, sink).await? else {
                self.interrupt(InterruptCause::ChannelClosed, sink);
                return Ok(());
            };
            let signal = classify(&line);
            if signal == DeviceSignal::Empty {
                continue;
            }
            sink.emit(&ProtocolEvent::DeviceLine { day, line });
            match signal {
                DeviceSignal::Stop => {
                    self.interrupt(InterruptCause::StopSignal, sink);
                    return Ok(());
                }
                DeviceSignal::DayComplete => {
                    sink.emit(&ProtocolEvent::DayAcknowledged { day });
                    self.state = ProtocolState::DayAcknowledged;
                    return Ok(());
                }
                _ => {}
            }
        }
    }

    /// Next line from the link, emitting `StillWaiting` on every timeout.
    async fn next_line<S>(&mut self, day: usize, sink: &mut S) -> Result<Option<String>, ChannelError>
    where
        S: EventSink + Send + ?Sized,
    {
        let started = Instant::now();
        let received = loop {
            let Some(limit) = self.options.ack_timeout else {
                break self.channel.receive_line().await;
            };
            match tokio::time::timeout(limit, self.channel.receive_line()).await {
                Ok(received) => break received,
                Err(_) => sink.emit(&ProtocolEvent::StillWaiting {
                    day,
                    waited: started.elapsed(),
                }),
            }
        };

        match received {
            Ok(line) => Ok(line),
            Err(source) => {
                self.interrupt(InterruptCause::ChannelFailure, sink);
                Err(ChannelError::Read { day, source })
            }
        }
    }

    fn interrupt<S>(&mut self, cause: InterruptCause, sink: &mut S)
    where
        S: EventSink + Send + ?Sized,
    {
        let day = self.days_sent.last().copied();
        self.outcome = Some(match day {
            Some(day) => RunOutcome::Interrupted { day, cause },
            None => RunOutcome::NotStarted { cause },
        });
        sink.emit(&ProtocolEvent::Interrupted { day, cause });
        self.state = ProtocolState::Interrupted;
    }

    fn finish<S>(&mut self, outcome: RunOutcome, sink: &mut S)
    where
        S: EventSink + Send + ?Sized,
    {
        self.outcome = Some(outcome);
        self.state = ProtocolState::Finished;
        sink.emit(&ProtocolEvent::Finished { outcome });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
