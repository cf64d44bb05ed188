use core::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::SelectorFn;
use crate::{ClockNode, ClockTree, Error, FieldRef};

/// Selects one of several input clocks.
///
/// Inputs are keyed by the raw selector value. An input may be declared as
/// "no clock", in which case selecting it stops the multiplexer's output.
#[derive(Clone, Default)]
pub struct Mux {
    name: Option<String>,
    parents: IndexMap<u64, Option<String>>,
    mux_field: Option<FieldRef>,
    get_mux: Option<SelectorFn>,
}

impl Mux {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Declares the clock selected when the selector reads `selector`.
    pub fn with_input(mut self, selector: u64, parent: &str) -> Self {
        self.parents.insert(selector, Some(parent.to_string()));
        self
    }

    /// Declares that `selector` selects no clock at all.
    pub fn with_no_clock(mut self, selector: u64) -> Self {
        self.parents.insert(selector, None);
        self
    }

    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = (u64, Option<S>)>,
        S: Into<String>,
    {
        self.parents.extend(
            parents
                .into_iter()
                .map(|(selector, parent)| (selector, parent.map(Into::into))),
        );
        self
    }

    /// The selector field.
    pub fn with_mux_field(mut self, field: FieldRef) -> Self {
        self.mux_field = Some(field);
        self
    }

    /// Replaces the selector field read with a function.
    pub fn with_get_mux<F>(self, get_mux: F) -> Self
    where
        F: Fn(&Mux, &ClockTree) -> Result<u64, Error> + 'static,
    {
        self.with_get_mux_fn(Rc::new(get_mux))
    }

    pub fn with_get_mux_fn(mut self, get_mux: SelectorFn) -> Self {
        self.get_mux = Some(get_mux);
        self
    }

    pub fn parents(&self) -> &IndexMap<u64, Option<String>> {
        &self.parents
    }

    /// The current raw selector value.
    pub fn selector(&self, tree: &ClockTree) -> Result<u64, Error> {
        if let Some(get_mux) = &self.get_mux {
            return get_mux(self, tree);
        }

        match &self.mux_field {
            Some(field) => field.read(),
            None => Err(Error::Misconfigured(format!(
                "multiplexer '{}' has no selector",
                self.label()
            ))),
        }
    }
}

impl fmt::Debug for Mux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mux")
            .field("name", &self.name)
            .field("parents", &self.parents)
            .field("mux_field", &self.mux_field)
            .field("get_mux", &self.get_mux.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl ClockNode for Mux {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn inputs(&self) -> Vec<&str> {
        let mut inputs = Vec::new();
        for parent in self.parents.values().flatten() {
            if !inputs.contains(&parent.as_str()) {
                inputs.push(parent.as_str());
            }
        }
        inputs
    }

    fn current_parent(&self, tree: &ClockTree) -> Result<Option<&str>, Error> {
        let selector = self.selector(tree)?;
        match self.parents.get(&selector) {
            Some(parent) => Ok(parent.as_deref()),
            None => Err(Error::InvalidSelector {
                clock: self.label().to_string(),
                selector,
            }),
        }
    }

    fn validate(&self, tree: Option<&ClockTree>) -> Result<(), Error> {
        let Some(tree) = tree else {
            return Err(Error::Detached);
        };

        if self.parents.is_empty() {
            return Err(Error::Misconfigured(format!(
                "multiplexer '{}' has no inputs",
                self.label()
            )));
        }

        if self.mux_field.is_none() && self.get_mux.is_none() {
            return Err(Error::Misconfigured(format!(
                "multiplexer '{}' has no selector",
                self.label()
            )));
        }

        if let Some(parent) = self.inputs().into_iter().find(|p| !tree.contains(p)) {
            return Err(Error::UnknownClock(parent.to_string()));
        }

        Ok(())
    }

    fn enabled(&self, tree: &ClockTree) -> Result<bool, Error> {
        Ok(self.get_parent(tree)?.is_some())
    }

    fn get_freq(&self, tree: &ClockTree) -> Result<f64, Error> {
        tree.get_freq(self.current_parent(tree)?)
    }
}
