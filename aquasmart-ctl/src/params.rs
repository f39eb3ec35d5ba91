/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! In-memory model of a parameter file.
//!
//! ```text
//! parameter file ──(codec::decode)──►  ParameterSet  ──(resolver)──►  DayCommand
//!                                       ↑ read-only for the whole run
//! ```
//!
//! # Ownership model
//! A [`ParameterSet`] is built once at start-up and never mutated.  The run
//! shares it behind an `Arc` between the resolver, the exporter and any
//! logging sidecar; no synchronisation is needed because nothing writes to it.
//!
//! Construction goes through [`ParameterSet::new`], which enforces the shape
//! invariants (`|r| = num_days`, `|h| = num_zones = |c|`, rectangular `c`), so
//! every accessor can index without re-checking.

use crate::error::DimensionError;

// ── Model scalars ─────────────────────────────────────────────────────────────

/// The four scalar model parameters.
///
/// They are opaque to the controller: decoded, carried and re-emitted
/// unchanged.  In the file the second one is spelled `n_0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModelParams {
    pub p: f64,
    pub n0: f64,
    pub e: f64,
    pub m: f64,
}

// ── Schedule ──────────────────────────────────────────────────────────────────

/// Consumption matrix `c[zone][day][category]`, rectangular and non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    zones: Vec<Vec<Vec<f64>>>,
}

impl Schedule {
    /// Validate and wrap a raw `zone × day × category` matrix.
    ///
    /// # Errors
    /// Returns a [`DimensionError`] if any axis is empty or the matrix is
    /// ragged.
    pub fn new(zones: Vec<Vec<Vec<f64>>>) -> Result<Self, DimensionError> {
        let first_zone = zones.first().ok_or(DimensionError::NoZones)?;
        let num_days = first_zone.len();
        let num_categories = first_zone.first().map(Vec::len).unwrap_or(0);

        for (zone, days) in zones.iter().enumerate() {
            if days.is_empty() {
                return Err(DimensionError::NoDays { zone });
            }
            if days.len() != num_days {
                return Err(DimensionError::RaggedDays {
                    zone,
                    found: days.len(),
                    expected: num_days,
                });
            }
            for (day_index, categories) in days.iter().enumerate() {
                let day = day_index + 1;
                if categories.is_empty() {
                    return Err(DimensionError::NoCategories { zone, day });
                }
                if categories.len() != num_categories {
                    return Err(DimensionError::RaggedCategories {
                        zone,
                        day,
                        found: categories.len(),
                        expected: num_categories,
                    });
                }
            }
        }

        Ok(Self { zones })
    }

    pub fn num_zones(&self) -> usize {
        self.zones.len()
    }

    pub fn num_days(&self) -> usize {
        self.zones[0].len()
    }

    pub fn num_categories(&self) -> usize {
        self.zones[0][0].len()
    }

    /// Category values for `zone` on the 1-indexed `day`, or `None` when the
    /// pair is outside the matrix.
    pub fn day(&self, zone: usize, day: usize) -> Option<&[f64]> {
        let index = day.checked_sub(1)?;
        self.zones
            .get(zone)
            .and_then(|days| days.get(index))
            .map(Vec::as_slice)
    }

    /// All days of one zone, in day order.
    pub fn zone(&self, zone: usize) -> Option<&[Vec<f64>]> {
        self.zones.get(zone).map(Vec::as_slice)
    }

    /// Iterate zones in index order.
    pub fn zones(&self) -> impl Iterator<Item = &[Vec<f64>]> {
        self.zones.iter().map(Vec::as_slice)
    }
}

// ── ParameterSet ──────────────────────────────────────────────────────────────

/// Everything a parameter file declares: `c`, `r`, `h` and the model scalars.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    schedule: Schedule,
    /// `r[day]`, one reservoir level per day.
    reservoir: Vec<f64>,
    /// `h[zone]`, one population figure per zone.
    habitants: Vec<f64>,
    model: ModelParams,
}

impl ParameterSet {
    /// # Errors
    /// Returns a [`DimensionError`] if `reservoir` does not have one entry per
    /// day or `habitants` one entry per zone.
    pub fn new(
        schedule: Schedule,
        reservoir: Vec<f64>,
        habitants: Vec<f64>,
        model: ModelParams,
    ) -> Result<Self, DimensionError> {
        if reservoir.len() != schedule.num_days() {
            return Err(DimensionError::ReservoirLength {
                found: reservoir.len(),
                expected: schedule.num_days(),
            });
        }
        if habitants.len() != schedule.num_zones() {
            return Err(DimensionError::HabitantsLength {
                found: habitants.len(),
                expected: schedule.num_zones(),
            });
        }

        Ok(Self {
            schedule,
            reservoir,
            habitants,
            model,
        })
    }

    /// Convenience constructor from raw vectors.
    pub fn from_parts(
        consumption: Vec<Vec<Vec<f64>>>,
        reservoir: Vec<f64>,
        habitants: Vec<f64>,
        model: ModelParams,
    ) -> Result<Self, DimensionError> {
        Self::new(Schedule::new(consumption)?, reservoir, habitants, model)
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn reservoir(&self) -> &[f64] {
        &self.reservoir
    }

    pub fn habitants(&self) -> &[f64] {
        &self.habitants
    }

    pub fn model(&self) -> ModelParams {
        self.model
    }

    pub fn num_zones(&self) -> usize {
        self.schedule.num_zones()
    }

    pub fn num_days(&self) -> usize {
        self.schedule.num_days()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_three() -> Vec<Vec<Vec<f64>>> {
        vec![
            vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
            vec![vec![7.0, 8.0], vec![9.0, 10.0], vec![11.0, 12.0]],
        ]
    }

    #[test]
    fn schedule_reports_dimensions() {
        let s = Schedule::new(two_by_three()).unwrap();
        assert_eq!(s.num_zones(), 2);
        assert_eq!(s.num_days(), 3);
        assert_eq!(s.num_categories(), 2);
    }

    #[test]
    fn day_lookup_is_one_indexed() {
        let s = Schedule::new(two_by_three()).unwrap();
        assert_eq!(s.day(0, 1), Some(&[1.0, 2.0][..]));
        assert_eq!(s.day(1, 3), Some(&[11.0, 12.0][..]));
        assert_eq!(s.day(0, 0), None);
        assert_eq!(s.day(0, 4), None);
        assert_eq!(s.day(2, 1), None);
    }

    #[test]
    fn empty_schedule_is_rejected() {
        assert_eq!(Schedule::new(vec![]), Err(DimensionError::NoZones));
        assert_eq!(
            Schedule::new(vec![vec![]]),
            Err(DimensionError::NoDays { zone: 0 })
        );
        assert_eq!(
            Schedule::new(vec![vec![vec![]]]),
            Err(DimensionError::NoCategories { zone: 0, day: 1 })
        );
    }

    #[test]
    fn ragged_days_are_rejected() {
        let raw = vec![vec![vec![1.0], vec![2.0]], vec![vec![3.0]]];
        assert_eq!(
            Schedule::new(raw),
            Err(DimensionError::RaggedDays {
                zone: 1,
                found: 1,
                expected: 2
            })
        );
    }

    #[test]
    fn ragged_categories_are_rejected() {
        let raw = vec![vec![vec![1.0, 2.0], vec![3.0]]];
        assert_eq!(
            Schedule::new(raw),
            Err(DimensionError::RaggedCategories {
                zone: 0,
                day: 2,
                found: 1,
                expected: 2
            })
        );
    }

    #[test]
    fn reservoir_must_match_day_count() {
        let err = ParameterSet::from_parts(
            two_by_three(),
            vec![0.5, 0.6],
            vec![100.0, 200.0],
            ModelParams::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DimensionError::ReservoirLength {
                found: 2,
                expected: 3
            }
        );
    }

    #[test]
    fn habitants_must_match_zone_count() {
        let err = ParameterSet::from_parts(
            two_by_three(),
            vec![0.5, 0.6, 0.7],
            vec![100.0],
            ModelParams::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DimensionError::HabitantsLength {
                found: 1,
                expected: 2
            }
        );
    }
}
