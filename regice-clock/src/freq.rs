//! Frequency overrides given on the command line, e.g. `osc24m=24M`.

use core::str::FromStr;

use crate::Error;

/// A `NAME=VALUE` request to change the frequency of a fixed clock.
///
/// `VALUE` is a decimal number of Hz, optionally suffixed by `k`/`K` (kHz) or
/// `m`/`M` (MHz).
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyOverride {
    name: String,
    freq: f64,
}

impl FrequencyOverride {
    pub fn new(name: &str, freq: f64) -> Self {
        Self {
            name: name.to_string(),
            freq,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The requested frequency, in Hz.
    pub fn freq(&self) -> f64 {
        self.freq
    }
}

impl FromStr for FrequencyOverride {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = s.split_once('=').ok_or_else(|| {
            Error::InvalidFrequency(format!("expected NAME=VALUE, found '{s}'"))
        })?;

        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidFrequency(format!(
                "missing clock name in '{s}'"
            )));
        }

        let value = value.trim();
        let (number, multiplier) = match value.as_bytes().last() {
            Some(b'k' | b'K') => (&value[..value.len() - 1], 1_000.0),
            Some(b'm' | b'M') => (&value[..value.len() - 1], 1_000_000.0),
            _ => (value, 1.0),
        };

        let freq = number
            .parse::<f64>()
            .ok()
            .filter(|freq| freq.is_finite() && *freq >= 0.0)
            .ok_or_else(|| {
                Error::InvalidFrequency(format!("invalid frequency '{value}' for '{name}'"))
            })?;

        Ok(Self::new(name, freq * multiplier))
    }
}

/// Scales a frequency in Hz to the largest unit keeping it at or above 1.
pub fn human_readable_frequency(mut freq: f64) -> (f64, &'static str) {
    let units = ["Hz", "kHz", "MHz", "GHz"];

    let mut index = 0;
    while freq >= 1000.0 && index < units.len() - 1 {
        freq /= 1000.0;
        index += 1;
    }

    (freq, units[index])
}
