/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Parameter file codec.
//!
//! The file is a flat document of `name = value;` declarations:
//!
//! ```text
//! // Parámetros simulados para modelo de racionamiento de agua
//!
//! c = [
//!   [
//!     [0.00, 4016825.89, 93721755.85],
//!     [0.00, 2295153.41, 81068113.39],
//!   ],
//! ];
//!
//! p = 1300000000.00;
//! n_0 = 120000000000.00;
//! e = 0.85;
//! m = 300000000000.00;
//!
//! r = [512345678.12, 498765432.10];
//! h = [245311.00];
//! ```
//!
//! * [`decode`] accepts the declarations in any order, any numeric precision
//!   and arbitrary whitespace / `//` comments.  `n0` is accepted as an alias
//!   of `n_0`.  Unknown declarations are skipped with a warning.
//! * [`encode`] always writes the layout above with two fixed decimals, so
//!   the output is diffable and re-readable by [`decode`].

mod lexer;
mod parser;

use std::fmt;

use tracing::{debug, warn};

use crate::error::{FormatError, RangeError};
use crate::params::{ModelParams, ParameterSet, Schedule};
use parser::{parse_document, Declaration, Value};

/// Header comment written at the top of every encoded file.
pub const HEADER: &str = "// Parámetros simulados para modelo de racionamiento de agua";

// ── Decode ────────────────────────────────────────────────────────────────────

/// Declarations collected from a document before shape checking.
#[derive(Default)]
struct Collected {
    c: Option<Value>,
    p: Option<f64>,
    n0: Option<f64>,
    e: Option<f64>,
    m: Option<f64>,
    r: Option<Value>,
    h: Option<Value>,
}

/// Decode a parameter file.
///
/// # Errors
/// * [`FormatError::Syntax`] – the text does not follow the grammar.
/// * [`FormatError::MissingDeclaration`] – `c`, a scalar, `r` or `h` is absent.
/// * [`FormatError::DuplicateDeclaration`] – a known name appears twice.
/// * [`FormatError::Shape`] – a declaration has the wrong nesting.
/// * [`FormatError::Dimensions`] – the matrix is empty/ragged or `r`/`h` do not
///   match its day/zone counts.
pub fn decode(text: &str) -> Result<ParameterSet, FormatError> {
    let mut collected = Collected::default();

    for decl in parse_document(text)? {
        collect(&mut collected, decl)?;
    }

    let c = collected
        .c
        .ok_or(FormatError::MissingDeclaration { name: "c" })?;
    let model = ModelParams {
        p: collected
            .p
            .ok_or(FormatError::MissingDeclaration { name: "p" })?,
        n0: collected
            .n0
            .ok_or(FormatError::MissingDeclaration { name: "n_0" })?,
        e: collected
            .e
            .ok_or(FormatError::MissingDeclaration { name: "e" })?,
        m: collected
            .m
            .ok_or(FormatError::MissingDeclaration { name: "m" })?,
    };
    let r = collected
        .r
        .ok_or(FormatError::MissingDeclaration { name: "r" })?;
    let h = collected
        .h
        .ok_or(FormatError::MissingDeclaration { name: "h" })?;

    let schedule = Schedule::new(matrix3("c", c)?)?;
    let set = ParameterSet::new(schedule, vector("r", r)?, vector("h", h)?, model)?;

    debug!(
        zones = set.num_zones(),
        days = set.num_days(),
        categories = set.schedule().num_categories(),
        "parameter file decoded"
    );
    Ok(set)
}

fn collect(collected: &mut Collected, decl: Declaration) -> Result<(), FormatError> {
    let Declaration { name, value, line } = decl;

    fn once<T>(
        slot: &mut Option<T>,
        name: &'static str,
        line: usize,
        value: T,
    ) -> Result<(), FormatError> {
        if slot.is_some() {
            return Err(FormatError::DuplicateDeclaration { name, line });
        }
        *slot = Some(value);
        Ok(())
    }

    match name.as_str() {
        "c" => once(&mut collected.c, "c", line, value),
        "r" => once(&mut collected.r, "r", line, value),
        "h" => once(&mut collected.h, "h", line, value),
        "p" => once(&mut collected.p, "p", line, scalar("p", value)?),
        "n_0" | "n0" => once(&mut collected.n0, "n_0", line, scalar("n_0", value)?),
        "e" => once(&mut collected.e, "e", line, scalar("e", value)?),
        "m" => once(&mut collected.m, "m", line, scalar("m", value)?),
        other => {
            warn!(declaration = other, line, "ignoring unknown declaration");
            Ok(())
        }
    }
}

fn scalar(name: &'static str, value: Value) -> Result<f64, FormatError> {
    match value {
        Value::Number(n) => Ok(n),
        Value::List(_) => Err(FormatError::Shape {
            name,
            expected: "a number",
        }),
    }
}

fn vector(name: &'static str, value: Value) -> Result<Vec<f64>, FormatError> {
    let shape_error = || FormatError::Shape {
        name,
        expected: "a list of numbers",
    };
    let Value::List(items) = value else {
        return Err(shape_error());
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Number(n) => Ok(n),
            Value::List(_) => Err(shape_error()),
        })
        .collect()
}

fn matrix3(name: &'static str, value: Value) -> Result<Vec<Vec<Vec<f64>>>, FormatError> {
    let shape_error = || FormatError::Shape {
        name,
        expected: "a list (zones) of lists (days) of lists of numbers (categories)",
    };
    let Value::List(zones) = value else {
        return Err(shape_error());
    };
    zones
        .into_iter()
        .map(|zone| {
            let Value::List(days) = zone else {
                return Err(shape_error());
            };
            days.into_iter()
                .map(|day| vector(name, day).map_err(|_| shape_error()))
                .collect()
        })
        .collect()
}

// ── Encode ────────────────────────────────────────────────────────────────────

/// Encode `set` with its day axis limited to days `1..=day_limit`.
///
/// `c` and `r` are truncated; `h` and the scalars are written in full.
///
/// # Errors
/// Returns [`RangeError::DayLimit`] unless `1 <= day_limit <= num_days`.
pub fn encode(set: &ParameterSet, day_limit: usize) -> Result<String, RangeError> {
    if day_limit == 0 || day_limit > set.num_days() {
        return Err(RangeError::DayLimit {
            limit: day_limit,
            num_days: set.num_days(),
        });
    }
    Ok(Encoded { set, day_limit }.to_string())
}

/// Display adapter that renders the file layout.
struct Encoded<'a> {
    set: &'a ParameterSet,
    day_limit: usize,
}

impl fmt::Display for Encoded<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{HEADER}")?;
        writeln!(f)?;

        writeln!(f, "c = [")?;
        for zone in self.set.schedule().zones() {
            writeln!(f, "  [")?;
            for day in &zone[..self.day_limit] {
                writeln!(f, "    [{}],", Fixed2(day))?;
            }
            writeln!(f, "  ],")?;
        }
        writeln!(f, "];")?;
        writeln!(f)?;

        let model = self.set.model();
        writeln!(f, "p = {:.2};", model.p)?;
        writeln!(f, "n_0 = {:.2};", model.n0)?;
        writeln!(f, "e = {:.2};", model.e)?;
        writeln!(f, "m = {:.2};", model.m)?;
        writeln!(f)?;

        writeln!(f, "r = [{}];", Fixed2(&self.set.reservoir()[..self.day_limit]))?;
        writeln!(f, "h = [{}];", Fixed2(self.set.habitants()))
    }
}

/// Comma-separated values with two fixed decimals.
struct Fixed2<'a>(&'a [f64]);

impl fmt::Display for Fixed2<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value:.2}")?;
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
