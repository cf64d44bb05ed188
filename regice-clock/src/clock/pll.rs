use core::fmt;
use std::rc::Rc;

use super::{FrequencyFn, is_set};
use crate::{ClockNode, ClockTree, Error, FieldRef};

/// A phase-locked loop.
///
/// The output of a PLL depends on chip-specific multiplier/divider encodings,
/// so its frequency is always computed by a user-supplied function. The
/// function typically reads its own fields and scales
/// [`Pll::parent_freq`].
#[derive(Clone, Default)]
pub struct Pll {
    name: Option<String>,
    parent: Option<String>,
    en_field: Option<FieldRef>,
    get_freq: Option<FrequencyFn>,
}

impl Pll {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    /// The enable bit. Without one, the PLL is considered always running.
    pub fn with_en_field(mut self, field: FieldRef) -> Self {
        self.en_field = Some(field);
        self
    }

    /// The function computing the output frequency. Required.
    pub fn with_get_freq<F>(self, get_freq: F) -> Self
    where
        F: Fn(&Pll, &ClockTree) -> Result<f64, Error> + 'static,
    {
        self.with_get_freq_fn(Rc::new(get_freq))
    }

    pub fn with_get_freq_fn(mut self, get_freq: FrequencyFn) -> Self {
        self.get_freq = Some(get_freq);
        self
    }

    /// Frequency of the reference clock feeding the PLL, 0 if it has none.
    pub fn parent_freq(&self, tree: &ClockTree) -> Result<f64, Error> {
        tree.get_freq(self.parent())
    }
}

impl fmt::Debug for Pll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pll")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("en_field", &self.en_field)
            .field("get_freq", &self.get_freq.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl ClockNode for Pll {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    fn validate(&self, _tree: Option<&ClockTree>) -> Result<(), Error> {
        match self.get_freq {
            Some(_) => Ok(()),
            None => Err(Error::Misconfigured(format!(
                "PLL '{}' has no way to compute its frequency",
                self.label()
            ))),
        }
    }

    fn enabled(&self, _tree: &ClockTree) -> Result<bool, Error> {
        match &self.en_field {
            Some(en_field) => is_set(en_field),
            None => Ok(true),
        }
    }

    fn get_freq(&self, tree: &ClockTree) -> Result<f64, Error> {
        match &self.get_freq {
            Some(get_freq) => get_freq(self, tree),
            None => Err(Error::InvalidFrequency(format!(
                "PLL '{}' has no way to compute its frequency",
                self.label()
            ))),
        }
    }
}
