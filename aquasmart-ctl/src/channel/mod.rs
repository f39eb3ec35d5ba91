/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Line-oriented links to the irrigation device.
//!
//! The delivery protocol only needs two capabilities, captured by
//! [`DeviceChannel`]: send a command line and receive the next line.  Two
//! adapters implement it:
//!
//! * [`StreamChannel`] – any byte stream: a serial device node
//!   (`/dev/ttyACM0`, baud rate set with `stty` beforehand) or a TCP socket
//!   (e.g. the `device-sim` tool or a serial-to-network bridge).
//! * [`SimulatedDevice`] – an in-process stand-in that acknowledges every
//!   day after a configurable delay.
//!
//! [`DeviceLink`] picks one of them from the [`DeviceConfig`]; the choice is
//! made by configuration, never by falling back after an open failure.

mod simulated;
mod stream;

pub use simulated::{SimulatedDevice, SimulatedSettings};
pub use stream::StreamChannel;

use std::future::Future;
use std::io;

use tracing::info;

use crate::config::DeviceConfig;
use crate::error::ChannelError;

/// Capability set the delivery protocol needs from a device.
///
/// # Cancellation
/// `receive_line` must be cancel-safe: if its future is dropped before it
/// completes (e.g. by a timeout), no received data may be lost and the next
/// call must return the same line.
pub trait DeviceChannel {
    /// Write one command line (including its trailing `\n`).
    fn send(&mut self, line: &str) -> impl Future<Output = io::Result<()>> + Send;

    /// Next line from the device without its line terminator.
    /// `Ok(None)` means the device closed the link.
    fn receive_line(&mut self) -> impl Future<Output = io::Result<Option<String>>> + Send;
}

/// The configured device link.
pub enum DeviceLink {
    Stream(StreamChannel),
    Simulated(SimulatedDevice),
}

impl DeviceLink {
    /// Open the link described by `config`.
    ///
    /// # Errors
    /// Returns [`ChannelError::Open`] if the serial node or TCP endpoint
    /// cannot be opened.  A failure is reported, not replaced by the
    /// simulated device.
    pub async fn open(config: &DeviceConfig) -> Result<Self, ChannelError> {
        let link = match config {
            DeviceConfig::Serial { path, settle } => {
                Self::Stream(StreamChannel::open_serial(path, *settle).await?)
            }
            DeviceConfig::Tcp { address, settle } => {
                Self::Stream(StreamChannel::connect_tcp(address, *settle).await?)
            }
            DeviceConfig::Simulated(settings) => {
                Self::Simulated(SimulatedDevice::new(settings.clone()))
            }
        };
        info!(link = %link.describe(), "device link ready");
        Ok(link)
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Stream(channel) => channel.label().to_string(),
            Self::Simulated(_) => "simulated device".to_string(),
        }
    }
}

impl DeviceChannel for DeviceLink {
    async fn send(&mut self, line: &str) -> io::Result<()> {
        match self {
            Self::Stream(channel) => channel.send(line).await,
            Self::Simulated(device) => device.send(line).await,
        }
    }

    async fn receive_line(&mut self) -> io::Result<Option<String>> {
        match self {
            Self::Stream(channel) => channel.receive_line().await,
            Self::Simulated(device) => device.receive_line().await,
        }
    }
}
