use super::is_set;
use crate::{ClockNode, ClockTree, Error, FieldRef};

/// Turns its parent clock on or off without changing its frequency.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    name: Option<String>,
    parent: Option<String>,
    en_field: Option<FieldRef>,
    rdy_field: Option<FieldRef>,
}

impl Gate {
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

    /// The enable bit. Required.
    pub fn with_en_field(mut self, field: FieldRef) -> Self {
        self.en_field = Some(field);
        self
    }

    /// A ready bit, which must also be set for the gate to be enabled.
    pub fn with_rdy_field(mut self, field: FieldRef) -> Self {
        self.rdy_field = Some(field);
        self
    }
}

impl ClockNode for Gate {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    fn validate(&self, _tree: Option<&ClockTree>) -> Result<(), Error> {
        match self.en_field {
            Some(_) => Ok(()),
            None => Err(Error::Misconfigured(format!(
                "gate '{}' has no enable field",
                self.label()
            ))),
        }
    }

    fn enabled(&self, _tree: &ClockTree) -> Result<bool, Error> {
        let Some(en_field) = &self.en_field else {
            return Err(Error::Misconfigured(format!(
                "gate '{}' has no enable field",
                self.label()
            )));
        };

        if !is_set(en_field)? {
            return Ok(false);
        }

        match &self.rdy_field {
            Some(rdy_field) => is_set(rdy_field),
            None => Ok(true),
        }
    }

    fn get_freq(&self, tree: &ClockTree) -> Result<f64, Error> {
        tree.get_freq(self.parent())
    }
}
