use crate::{ClockNode, ClockTree, Error};

/// A root oscillator running at a known frequency.
///
/// The frequency can be range-checked with [`FixedClock::with_min`] and
/// [`FixedClock::with_max`]; this matters when the frequency is set at runtime,
/// e.g. from the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixedClock {
    name: Option<String>,
    parent: Option<String>,
    freq: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
}

impl FixedClock {
    /// Creates an unnamed oscillator running at `freq` Hz.
    pub fn new(freq: f64) -> Self {
        Self {
            freq: Some(freq),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn with_freq(mut self, freq: f64) -> Self {
        self.freq = Some(freq);
        self
    }

    /// Lowest acceptable frequency, inclusive.
    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Highest acceptable frequency, inclusive.
    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn freq(&self) -> Option<f64> {
        self.freq
    }

    pub fn set_freq(&mut self, freq: f64) {
        self.freq = Some(freq);
    }
}

impl ClockNode for FixedClock {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    fn validate(&self, _tree: Option<&ClockTree>) -> Result<(), Error> {
        match self.freq {
            Some(_) => Ok(()),
            None => Err(Error::Misconfigured(format!(
                "fixed clock '{}' has no frequency",
                self.label()
            ))),
        }
    }

    fn get_freq(&self, _tree: &ClockTree) -> Result<f64, Error> {
        let Some(freq) = self.freq else {
            return Err(Error::InvalidFrequency(format!(
                "fixed clock '{}' has no frequency",
                self.label()
            )));
        };

        if let Some(min) = self.min.filter(|min| freq < *min) {
            return Err(Error::InvalidFrequency(format!(
                "'{}' runs at {freq} Hz, below its minimum of {min} Hz",
                self.label()
            )));
        }
        if let Some(max) = self.max.filter(|max| freq > *max) {
            return Err(Error::InvalidFrequency(format!(
                "'{}' runs at {freq} Hz, above its maximum of {max} Hz",
                self.label()
            )));
        }

        Ok(freq)
    }
}
