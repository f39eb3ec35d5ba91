/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-day delivery volumes.
//!
//! For each zone and 1-indexed day the resolver sums the consumption
//! categories, converts the total into the device's delivery unit with the
//! deployment's [`VolumeScale`], and truncates toward zero.  Zones listed in
//! the [`RationingTable`] for that day get `0` regardless of consumption.
//!
//! ```text
//! volume(zone, day) = rationed(zone, day) ? 0
//!                   : trunc( Σ_k c[zone][day-1][k] × scale )
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{DataError, RangeError, ResolveError};
use crate::params::{ParameterSet, Schedule};

// ── VolumeScale ───────────────────────────────────────────────────────────────

/// Multiplicative factor from raw consumption units to delivery units.
///
/// No default exists.  Each deployment configures the factor that matches the
/// pipeline producing its parameter files (`0.000001` and `0.00001` are both
/// in use).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeScale(f64);

impl VolumeScale {
    /// # Errors
    /// Returns [`RangeError::VolumeScale`] unless `factor` is finite and > 0.
    pub fn new(factor: f64) -> Result<Self, RangeError> {
        if factor.is_finite() && factor > 0.0 {
            Ok(Self(factor))
        } else {
            Err(RangeError::VolumeScale(factor))
        }
    }

    pub fn factor(self) -> f64 {
        self.0
    }
}

// ── RationingTable ────────────────────────────────────────────────────────────

/// Zones that receive no water on given days: zone → set of 1-indexed days.
///
/// Deserializes from a YAML map such as `{0: [3, 9], 1: [2]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "BTreeMap<usize, Vec<usize>>")]
pub struct RationingTable {
    zones: BTreeMap<usize, BTreeSet<usize>>,
}

impl From<BTreeMap<usize, Vec<usize>>> for RationingTable {
    fn from(raw: BTreeMap<usize, Vec<usize>>) -> Self {
        Self {
            zones: raw
                .into_iter()
                .map(|(zone, days)| (zone, days.into_iter().collect()))
                .collect(),
        }
    }
}

impl FromIterator<(usize, usize)> for RationingTable {
    fn from_iter<I: IntoIterator<Item = (usize, usize)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (zone, day) in iter {
            table.insert(zone, day);
        }
        table
    }
}

impl RationingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, zone: usize, day: usize) {
        self.zones.entry(zone).or_default().insert(day);
    }

    pub fn is_rationed(&self, zone: usize, day: usize) -> bool {
        self.zones.get(&zone).is_some_and(|days| days.contains(&day))
    }

    pub fn is_empty(&self) -> bool {
        self.zones.values().all(BTreeSet::is_empty)
    }

    /// `(zone, day)` pairs in zone, then day order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.zones
            .iter()
            .flat_map(|(&zone, days)| days.iter().map(move |&day| (zone, day)))
    }

    /// Entries that can never apply to a schedule of the given size
    /// (day 0, a day past the end, or an unknown zone).
    pub fn out_of_range(&self, num_zones: usize, num_days: usize) -> Vec<(usize, usize)> {
        self.entries()
            .filter(|&(zone, day)| zone >= num_zones || day == 0 || day > num_days)
            .collect()
    }
}

// ── DayCommand ────────────────────────────────────────────────────────────────

/// One day's delivery order: `<day>,<v0>,<v1>,...` on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCommand {
    /// 1-indexed day.
    pub day: usize,
    /// Delivery volume per zone, in zone order.
    pub volumes: Vec<u64>,
    /// Zones forced to zero by rationing on this day.
    pub rationed: Vec<usize>,
}

impl DayCommand {
    /// Wire form including the terminating newline.
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for DayCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.day)?;
        for volume in &self.volumes {
            write!(f, ",{volume}")?;
        }
        Ok(())
    }
}

/// Error returned when a line is not a valid `<day>,<v0>,...` command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed day command '{0}'")]
pub struct ParseCommandError(pub String);

impl FromStr for DayCommand {
    type Err = ParseCommandError;

    /// Parse the wire form.  The rationed-zone list is not carried on the
    /// wire and comes back empty.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseCommandError(line.trim().to_string());
        let mut fields = line.trim().split(',').map(str::trim);

        let day: usize = fields
            .next()
            .and_then(|d| d.parse().ok())
            .filter(|&d| d >= 1)
            .ok_or_else(malformed)?;
        let volumes = fields
            .map(|v| v.parse::<u64>().map_err(|_| malformed()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            day,
            volumes,
            rationed: Vec::new(),
        })
    }
}

// ── Resolution ────────────────────────────────────────────────────────────────

/// Delivery volume for one zone on one 1-indexed day.
///
/// # Errors
/// * [`RangeError::DayZero`] – `day` is 0.
/// * [`DataError::MissingConsumption`] – the zone/day pair is not in `schedule`.
/// * [`DataError::NegativeConsumption`] / [`DataError::NonFiniteConsumption`]
///   – a category value cannot be delivered.  Not checked on rationed days,
///   which always resolve to `0`.
pub fn resolve_day(
    schedule: &Schedule,
    rationing: &RationingTable,
    scale: VolumeScale,
    zone: usize,
    day: usize,
) -> Result<u64, ResolveError> {
    if day == 0 {
        return Err(RangeError::DayZero.into());
    }
    let categories = schedule
        .day(zone, day)
        .ok_or(DataError::MissingConsumption { zone, day })?;

    if rationing.is_rationed(zone, day) {
        return Ok(0);
    }

    let mut total = 0.0;
    for (category, &value) in categories.iter().enumerate() {
        if !value.is_finite() {
            return Err(DataError::NonFiniteConsumption {
                zone,
                day,
                category,
            }
            .into());
        }
        if value < 0.0 {
            return Err(DataError::NegativeConsumption {
                zone,
                day,
                category,
                value,
            }
            .into());
        }
        total += value;
    }

    // `as` saturates, so an absurdly large total cannot wrap.
    Ok((total * scale.factor()).trunc() as u64)
}

/// Resolves whole days against a shared, read-only [`ParameterSet`].
#[derive(Debug, Clone)]
pub struct ScheduleResolver {
    params: Arc<ParameterSet>,
    rationing: RationingTable,
    scale: VolumeScale,
}

impl ScheduleResolver {
    pub fn new(params: Arc<ParameterSet>, rationing: RationingTable, scale: VolumeScale) -> Self {
        Self {
            params,
            rationing,
            scale,
        }
    }

    pub fn params(&self) -> &Arc<ParameterSet> {
        &self.params
    }

    pub fn num_days(&self) -> usize {
        self.params.num_days()
    }

    /// See [`resolve_day`].
    pub fn resolve_day(&self, zone: usize, day: usize) -> Result<u64, ResolveError> {
        resolve_day(
            self.params.schedule(),
            &self.rationing,
            self.scale,
            zone,
            day,
        )
    }

    /// Volumes for every zone on `day`, in zone order.
    pub fn resolve_command(&self, day: usize) -> Result<DayCommand, ResolveError> {
        let mut volumes = Vec::with_capacity(self.params.num_zones());
        let mut rationed = Vec::new();

        for zone in 0..self.params.num_zones() {
            volumes.push(self.resolve_day(zone, day)?);
            if self.rationing.is_rationed(zone, day) {
                rationed.push(zone);
            }
        }

        debug!(day, volumes = ?volumes, rationed = ?rationed, "day resolved");
        Ok(DayCommand {
            day,
            volumes,
            rationed,
        })
    }

    /// Resolve every day up front, so a bad value aborts the run before the
    /// device sees any command.
    pub fn resolve_all(&self) -> Result<Vec<DayCommand>, ResolveError> {
        let commands = (1..=self.num_days())
            .map(|day| self.resolve_command(day))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            days = commands.len(),
            zones = self.params.num_zones(),
            scale = self.scale.factor(),
            rationed_entries = self.rationing.entries().count(),
            "schedule resolved"
        );
        Ok(commands)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
