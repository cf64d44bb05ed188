//! # Clock tree
//!
//! [`ClockTree`] is the registry of every clock node of a device. It answers
//! the two questions an operator asks about a clock, "how fast does it run"
//! and "is it gated", by walking parent links up to the roots on every query.
//! Nothing is cached, the registers backing the tree may change at any time.

use core::cell::Cell;

use indexmap::{IndexMap, IndexSet};

use crate::{Clock, ClockForest, ClockNode, Error, FrequencyOverride};

/// A registry of named clock nodes.
#[derive(Debug, Clone, Default)]
pub struct ClockTree {
    clocks: IndexMap<String, Clock>,
    /// Nesting of in-flight `get_freq` calls, bounded by the number of clocks.
    depth: Cell<usize>,
}

impl ClockTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `clock` to the tree.
    ///
    /// A clock without a name is not registered. A clock whose name is already
    /// taken replaces the previous one, which is returned.
    pub fn register(&mut self, clock: impl Into<Clock>) -> Option<Clock> {
        let clock = clock.into();

        if let Err(err) = clock.check(Some(&*self)) {
            log::debug!("Not registering {} clock: {err}", clock.kind());
            return None;
        }

        let name = clock.label().to_string();
        let previous = self.clocks.insert(name.clone(), clock);
        if previous.is_some() {
            log::warn!("Clock '{name}' registered twice, replacing the previous one");
        }

        previous
    }

    /// Removes a clock, e.g. one that failed validation.
    pub fn remove(&mut self, name: &str) -> Option<Clock> {
        self.clocks.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clocks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.clocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clocks.is_empty()
    }

    /// Iterates over the registered clocks in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Clock)> {
        self.clocks.iter().map(|(name, clock)| (name.as_str(), clock))
    }

    /// Looks a clock up. `None` as a name resolves to no clock.
    pub fn get<'n>(&self, name: impl Into<Option<&'n str>>) -> Result<Option<&Clock>, Error> {
        match name.into() {
            Some(name) => self.clock(name).map(Some),
            None => Ok(None),
        }
    }

    /// Looks a registered clock up by name.
    pub fn clock(&self, name: &str) -> Result<&Clock, Error> {
        self.clocks
            .get(name)
            .ok_or_else(|| Error::UnknownClock(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Clock, Error> {
        self.clocks
            .get_mut(name)
            .ok_or_else(|| Error::UnknownClock(name.to_string()))
    }

    /// The current frequency of a clock, in Hz. No clock runs at 0 Hz.
    pub fn get_freq<'n>(&self, name: impl Into<Option<&'n str>>) -> Result<f64, Error> {
        let Some(clock) = self.get(name)? else {
            return Ok(0.0);
        };

        let depth = self.depth.get();
        if depth > self.clocks.len() {
            return Err(loop_error(clock));
        }

        self.depth.set(depth + 1);
        let freq = clock.get_freq(self);
        self.depth.set(depth);

        let freq = freq?;
        log::trace!("Clock '{}' runs at {freq} Hz", clock.label());
        Ok(freq)
    }

    /// Whether a clock is stopped, either by itself or by one of its
    /// ancestors. No clock is always gated.
    pub fn is_gated<'n>(&self, name: impl Into<Option<&'n str>>) -> Result<bool, Error> {
        let mut clock = match self.get(name)? {
            Some(clock) => clock,
            None => return Ok(true),
        };

        for _ in 0..self.clocks.len() {
            if !clock.enabled(self)? {
                log::trace!("Clock '{}' is disabled", clock.label());
                return Ok(true);
            }

            match clock.get_parent(self)? {
                Some(parent) => clock = parent,
                None => return Ok(false),
            }
        }

        Err(loop_error(clock))
    }

    /// Validates every clock. A single invalid clock fails the whole tree.
    ///
    /// The tree is left untouched: invalid clocks have to be removed, or
    /// replaced, by the caller.
    pub fn build(&self) -> bool {
        let nodes = self
            .clocks
            .values()
            .fold(true, |valid, clock| clock.build(Some(self)) && valid);

        let loops = self.loops();
        for name in loops.iter() {
            log::debug!("Clock '{name}' failed to build: it is part of a loop");
        }

        nodes && loops.is_empty()
    }

    /// Validates every clock, reporting each failure.
    pub fn validate(&self) -> Result<(), Vec<(String, Error)>> {
        let loops = self.loops();
        let errors = self
            .clocks
            .iter()
            .filter_map(|(name, clock)| match clock.validate(Some(self)) {
                Err(err) => Some((name.clone(), err)),
                Ok(()) if loops.contains(name.as_str()) => {
                    Some((name.clone(), loop_error(clock)))
                }
                Ok(()) => None,
            })
            .collect::<Vec<_>>();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Names of the clocks that can reach themselves through their declared
    /// inputs.
    fn loops(&self) -> IndexSet<&str> {
        self.clocks
            .iter()
            .filter(|(name, clock)| {
                let mut seen = IndexSet::new();
                let mut pending = clock.inputs();
                while let Some(input) = pending.pop() {
                    if input == name.as_str() {
                        return true;
                    }
                    if !seen.insert(input) {
                        continue;
                    }
                    if let Some(clock) = self.clocks.get(input) {
                        pending.extend(clock.inputs());
                    }
                }
                false
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Names of the clocks that declare no input at all.
    pub fn get_orphans(&self) -> IndexSet<&str> {
        self.clocks
            .iter()
            .filter(|(_, clock)| clock.inputs().is_empty())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Names of the clocks that declare `name` as one of their inputs.
    pub fn get_children(&self, name: &str) -> IndexSet<&str> {
        self.clocks
            .iter()
            .filter(|(_, clock)| clock.inputs().contains(&name))
            .map(|(child, _)| child.as_str())
            .collect()
    }

    /// Builds the nested view of the tree, each clock placed under the clock
    /// currently feeding it.
    ///
    /// A multiplexer appears under its selected input only, or as a root if
    /// it selects no clock. Clocks whose parent is not registered, or cannot
    /// be read, are left out.
    pub fn make_tree(&self) -> ClockForest {
        let mut parents = IndexMap::new();
        for (name, clock) in self.clocks.iter() {
            let parent = match clock.current_parent(self) {
                Ok(parent) => parent,
                Err(err) => {
                    log::warn!("Clock '{name}' has no readable parent, leaving it out: {err}");
                    continue;
                }
            };
            if let Some(parent) = parent.filter(|parent| !self.contains(parent)) {
                log::warn!("Clock '{name}' has unknown parent '{parent}', leaving it out");
                continue;
            }
            parents.insert(name.as_str(), parent);
        }

        ClockForest::from_parents(&parents, None)
    }

    /// Sets the frequency of a fixed clock from a parsed override.
    ///
    /// Unknown clocks are ignored. Returns whether a clock was updated.
    pub fn apply_override(&mut self, freq: &FrequencyOverride) -> bool {
        let Ok(clock) = self.get_mut(freq.name()) else {
            log::debug!("Ignoring frequency of unknown clock '{}'", freq.name());
            return false;
        };

        let kind = clock.kind();
        match clock.as_fixed_mut() {
            Some(fixed) => {
                fixed.set_freq(freq.freq());
                true
            }
            None => {
                log::warn!(
                    "Clock '{}' is a {kind} clock, its frequency cannot be set",
                    freq.name()
                );
                false
            }
        }
    }
}

fn loop_error(clock: &Clock) -> Error {
    Error::Misconfigured(format!("clock '{}' is part of a loop", clock.label()))
}
