/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Classification of lines received from the device.

/// What a received line means to the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSignal {
    /// Blank line; ignored entirely.
    Empty,
    /// `CLICK` – operator trigger for the next day (manual advance).
    Click,
    /// Contains `PARADA` – abort the day sequence.
    Stop,
    /// Contains a day marker and `completado` – current day delivered.
    DayComplete,
    /// Anything else; logged only.
    Log,
}

/// Classify one line (without terminator).
///
/// Matching is case-insensitive.  `PARADA` is checked before the
/// acknowledgement so a line carrying both stops the run.
pub fn classify(line: &str) -> DeviceSignal {
    let line = line.trim();
    if line.is_empty() {
        return DeviceSignal::Empty;
    }
    if line == "CLICK" {
        return DeviceSignal::Click;
    }

    let lower = line.to_lowercase();
    if lower.contains("parada") {
        DeviceSignal::Stop
    } else if lower.contains("completado") && (lower.contains("día") || lower.contains("dia")) {
        DeviceSignal::DayComplete
    } else {
        DeviceSignal::Log
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acknowledgement_variants() {
        for line in [
            "Día 1 completado",
            "Día completado",
            "DÍA 3 COMPLETADO",
            "Dia 2 completado",
            "  >> dia 7 completado <<  ",
        ] {
            assert_eq!(classify(line), DeviceSignal::DayComplete, "{line}");
        }
    }

    #[test]
    fn completado_without_day_marker_is_only_logged() {
        assert_eq!(classify("Riego completado"), DeviceSignal::Log);
    }

    #[test]
    fn stop_variants() {
        assert_eq!(classify("PARADA"), DeviceSignal::Stop);
        assert_eq!(classify("parada de emergencia"), DeviceSignal::Stop);
        assert_eq!(classify("Día 2 completado - PARADA"), DeviceSignal::Stop);
    }

    #[test]
    fn click_must_match_exactly() {
        assert_eq!(classify("CLICK"), DeviceSignal::Click);
        assert_eq!(classify("CLICK\r"), DeviceSignal::Click);
        assert_eq!(classify("CLICK recibido"), DeviceSignal::Log);
    }

    #[test]
    fn other_lines() {
        assert_eq!(classify(""), DeviceSignal::Empty);
        assert_eq!(classify("   "), DeviceSignal::Empty);
        assert_eq!(classify("Zona 0 regando 977 ml"), DeviceSignal::Log);
    }
}
