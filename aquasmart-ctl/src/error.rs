/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the AquaSmart controller.
//!
//! The taxonomy follows the stages of a run:
//!
//! * [`FormatError`] – the parameter file is missing declarations or is
//!   malformed.  Wraps [`DimensionError`] for shape violations.
//! * [`RangeError`] – a caller broke a contract (day limit, day 0, scale).
//! * [`DataError`] – the schedule holds a value that cannot be delivered.
//! * [`ChannelError`] – the device link failed to open, write or read.
//! * [`ExportError`] – an artifact could not be written.
//!
//! Every variant carries the declaration name, day, zone or path involved so
//! an operator can act on the message without re-running with debug logs.

use std::path::PathBuf;

use thiserror::Error;

// ── Shape of a parameter set ──────────────────────────────────────────────────

/// Why a consumption matrix and its companion vectors do not line up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DimensionError {
    /// `c` has no zones.
    #[error("consumption matrix 'c' has no zones")]
    NoZones,

    /// A zone has no days.
    #[error("zone {zone} of 'c' has no days")]
    NoDays { zone: usize },

    /// A day has no categories.
    #[error("zone {zone}, day {day} of 'c' has no categories")]
    NoCategories { zone: usize, day: usize },

    /// Zones disagree on the number of days.
    #[error("zone {zone} of 'c' has {found} days, expected {expected}")]
    RaggedDays {
        zone: usize,
        found: usize,
        expected: usize,
    },

    /// Days disagree on the number of categories.
    #[error("zone {zone}, day {day} of 'c' has {found} categories, expected {expected}")]
    RaggedCategories {
        zone: usize,
        day: usize,
        found: usize,
        expected: usize,
    },

    /// `r` must hold one value per day.
    #[error("'r' has {found} values but 'c' covers {expected} days")]
    ReservoirLength { found: usize, expected: usize },

    /// `h` must hold one value per zone.
    #[error("'h' has {found} values but 'c' covers {expected} zones")]
    HabitantsLength { found: usize, expected: usize },
}

// ── Parameter file ────────────────────────────────────────────────────────────

/// The parameter file could not be decoded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    /// A required declaration (`c`, `p`, `n_0`, `e`, `m`, `r`, `h`) is absent.
    #[error("declaration '{name}' not found")]
    MissingDeclaration { name: &'static str },

    /// A known declaration was given twice.
    #[error("declaration '{name}' is declared twice (second time at line {line})")]
    DuplicateDeclaration { name: &'static str, line: usize },

    /// Tokenizer or grammar failure.  `declaration` is the name of the
    /// declaration being parsed, or `"<document>"` between declarations.
    #[error("syntax error in '{declaration}' at line {line}, column {column}: {message}")]
    Syntax {
        declaration: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// A declaration parsed but has the wrong nesting (e.g. `p = [1];`).
    #[error("declaration '{name}' must be {expected}")]
    Shape {
        name: &'static str,
        expected: &'static str,
    },

    /// The declarations are individually valid but do not agree in size.
    #[error(transparent)]
    Dimensions(#[from] DimensionError),
}

// ── Caller contract ───────────────────────────────────────────────────────────

/// A caller passed a value outside the range an operation accepts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RangeError {
    /// `encode` was asked for more days than the schedule has, or for none.
    #[error("day limit {limit} is outside 1..={num_days}")]
    DayLimit { limit: usize, num_days: usize },

    /// Days are 1-indexed.
    #[error("day 0 is not a valid day (days start at 1)")]
    DayZero,

    /// The volume scale must be a positive, finite factor.
    #[error("volume scale must be a positive finite number, got {0}")]
    VolumeScale(f64),
}

// ── Schedule contents ─────────────────────────────────────────────────────────

/// The schedule holds a value that cannot be turned into a delivery volume.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("zone {zone}, day {day}, category {category}: consumption {value} is negative")]
    NegativeConsumption {
        zone: usize,
        day: usize,
        category: usize,
        value: f64,
    },

    #[error("zone {zone}, day {day}, category {category}: consumption is not a finite number")]
    NonFiniteConsumption {
        zone: usize,
        day: usize,
        category: usize,
    },

    /// The schedule has no entry for this zone/day pair.
    #[error("no consumption recorded for zone {zone} on day {day}")]
    MissingConsumption { zone: usize, day: usize },
}

/// Failure while resolving a delivery volume.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Data(#[from] DataError),
}

// ── Device link ───────────────────────────────────────────────────────────────

/// Communication failure on the device link.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("cannot open device link {target}: {source}")]
    Open {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to send the command for day {day}: {source}")]
    Write {
        day: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read from the device while on day {day}: {source}")]
    Read {
        day: usize,
        #[source]
        source: std::io::Error,
    },
}

// ── Artifacts ─────────────────────────────────────────────────────────────────

/// An export artifact could not be produced.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot write schedule artifact {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Range(#[from] RangeError),
}
