/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! AquaSmart irrigation controller
//!
//! Turns a water-rationing parameter file into day-by-day delivery commands,
//! feeds them to the irrigation device one day at a time, and writes the
//! schedule back out when the run ends.
//!
//! ```text
//! lib.rs
//! ├── params      – ParameterSet / Schedule / ModelParams
//! ├── codec/      – parameter file decode + encode (logos lexer, RD parser)
//! ├── resolver    – per-zone daily volumes, rationing, DayCommand
//! ├── channel/    – DeviceChannel: serial node / TCP / simulated device
//! ├── protocol/   – day-sequenced delivery state machine + event sinks
//! ├── export      – truncated / full artifacts after a run
//! ├── config/     – YAML deployment configuration
//! └── error       – typed errors for every layer
//! ```

pub mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod export;
pub mod params;
pub mod protocol;
pub mod resolver;
