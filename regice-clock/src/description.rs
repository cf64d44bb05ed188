//! # Clock tree descriptions
//!
//! A clock tree can be described in TOML instead of being built in code. Each
//! `[[clock]]` entry is one node, tagged by its `type`. Register fields are
//! referred to by path and resolved through a [`RegisterMap`]; functions (PLL
//! frequency, selector or divisor overrides) are referred to by name and
//! resolved through [`Hooks`].
//!
//! ```toml
//! [registers]
//! "CLK.SEL" = 1
//!
//! [[clock]]
//! type = "fixed"
//! name = "xtal"
//! freq = 40_000_000
//!
//! [[clock]]
//! type = "mux"
//! name = "sys"
//! mux_field = "CLK.SEL"
//! inputs = [{ selector = 0, clock = "rc" }, { selector = 1, clock = "xtal" }, { selector = 2 }]
//! ```
//!
//! Missing optional settings are not an error at load time: the resulting
//! nodes simply fail [`ClockTree::build`], as they would when built in code.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::{
    ClockTree,
    DivType,
    Divider,
    DivisorFn,
    Error,
    FieldRef,
    FixedClock,
    FrequencyFn,
    Gate,
    MemoryMap,
    Mux,
    Pll,
    RegisterMap,
    SelectorFn,
};

/// A whole clock tree description.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Description {
    /// Initial register values, used to back the tree with a [`MemoryMap`].
    #[serde(default)]
    registers: IndexMap<String, u64>,

    #[serde(default, rename = "clock")]
    clocks: Vec<ClockDescription>,
}

/// One clock tree node.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", deny_unknown_fields)]
pub enum ClockDescription {
    Fixed {
        name: String,
        #[serde(default)]
        parent: Option<String>,
        #[serde(default)]
        freq: Option<f64>,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    Gate {
        name: String,
        #[serde(default)]
        parent: Option<String>,
        #[serde(default)]
        en_field: Option<String>,
        #[serde(default)]
        rdy_field: Option<String>,
    },
    Mux {
        name: String,
        #[serde(default)]
        mux_field: Option<String>,
        /// Name of a selector hook.
        #[serde(default)]
        get_mux: Option<String>,
        #[serde(default)]
        inputs: Vec<MuxInput>,
    },
    Divider {
        name: String,
        #[serde(default)]
        parent: Option<String>,
        #[serde(default)]
        div: Option<u64>,
        #[serde(default)]
        div_field: Option<String>,
        #[serde(default)]
        table: Option<Vec<TableEntry>>,
        /// One of `linear`, `power_of_two` or `zero_to_gate`.
        #[serde(default)]
        div_type: Option<String>,
        /// Name of a divisor hook.
        #[serde(default)]
        get_div: Option<String>,
    },
    Pll {
        name: String,
        #[serde(default)]
        parent: Option<String>,
        #[serde(default)]
        en_field: Option<String>,
        /// Name of a frequency hook.
        #[serde(default)]
        get_freq: Option<String>,
    },
}

/// A multiplexer input. Without `clock`, the selector value selects no clock.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MuxInput {
    selector: u64,
    #[serde(default)]
    clock: Option<String>,
}

/// A divider lookup table entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableEntry {
    raw: u64,
    div: u64,
}

/// Named functions a description may refer to.
#[derive(Default)]
pub struct Hooks {
    selectors: IndexMap<String, SelectorFn>,
    divisors: IndexMap<String, DivisorFn>,
    frequencies: IndexMap<String, FrequencyFn>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selector(mut self, name: &str, get_mux: SelectorFn) -> Self {
        self.selectors.insert(name.to_string(), get_mux);
        self
    }

    pub fn with_divisor(mut self, name: &str, get_div: DivisorFn) -> Self {
        self.divisors.insert(name.to_string(), get_div);
        self
    }

    pub fn with_frequency(mut self, name: &str, get_freq: FrequencyFn) -> Self {
        self.frequencies.insert(name.to_string(), get_freq);
        self
    }
}

fn hook<T: Clone>(hooks: &IndexMap<String, T>, name: &str, clock: &str) -> Result<T, Error> {
    hooks
        .get(name)
        .cloned()
        .ok_or_else(|| Error::description(format!("clock '{clock}' uses unknown hook '{name}'")))
}

fn field(map: &dyn RegisterMap, path: &str, clock: &str) -> Result<FieldRef, Error> {
    map.field(path)
        .ok_or_else(|| Error::description(format!("clock '{clock}' uses unknown field '{path}'")))
}

impl Description {
    pub fn from_toml(input: &str) -> Result<Self, Error> {
        basic_toml::from_str(input).map_err(|err| Error::description(err.to_string()))
    }

    pub fn clocks(&self) -> &[ClockDescription] {
        &self.clocks
    }

    /// A register map holding the description's initial register values.
    pub fn registers(&self) -> MemoryMap {
        let mut map = MemoryMap::new();
        for (path, value) in self.registers.iter() {
            map.insert(path, *value);
        }
        map
    }

    /// Builds a clock tree, with fields taken from `map`.
    pub fn instantiate(&self, map: &dyn RegisterMap, hooks: &Hooks) -> Result<ClockTree, Error> {
        let mut tree = ClockTree::new();
        for clock in self.clocks.iter() {
            clock.register(&mut tree, map, hooks)?;
        }

        log::debug!("Instantiated {} clocks", tree.len());
        Ok(tree)
    }
}

impl ClockDescription {
    pub fn name(&self) -> &str {
        match self {
            ClockDescription::Fixed { name, .. }
            | ClockDescription::Gate { name, .. }
            | ClockDescription::Mux { name, .. }
            | ClockDescription::Divider { name, .. }
            | ClockDescription::Pll { name, .. } => name.as_str(),
        }
    }

    fn register(
        &self,
        tree: &mut ClockTree,
        map: &dyn RegisterMap,
        hooks: &Hooks,
    ) -> Result<(), Error> {
        match self {
            ClockDescription::Fixed {
                name,
                parent,
                freq,
                min,
                max,
            } => {
                let mut clock = FixedClock::default().with_name(name);
                if let Some(parent) = parent {
                    clock = clock.with_parent(parent);
                }
                if let Some(freq) = freq {
                    clock = clock.with_freq(*freq);
                }
                if let Some(min) = min {
                    clock = clock.with_min(*min);
                }
                if let Some(max) = max {
                    clock = clock.with_max(*max);
                }
                tree.register(clock);
            }
            ClockDescription::Gate {
                name,
                parent,
                en_field,
                rdy_field,
            } => {
                let mut clock = Gate::new().with_name(name);
                if let Some(parent) = parent {
                    clock = clock.with_parent(parent);
                }
                if let Some(path) = en_field {
                    clock = clock.with_en_field(field(map, path, name)?);
                }
                if let Some(path) = rdy_field {
                    clock = clock.with_rdy_field(field(map, path, name)?);
                }
                tree.register(clock);
            }
            ClockDescription::Mux {
                name,
                mux_field,
                get_mux,
                inputs,
            } => {
                let mut clock = Mux::new().with_name(name).with_parents(
                    inputs
                        .iter()
                        .map(|input| (input.selector, input.clock.clone())),
                );
                if let Some(path) = mux_field {
                    clock = clock.with_mux_field(field(map, path, name)?);
                }
                if let Some(hook_name) = get_mux {
                    clock = clock.with_get_mux_fn(hook(&hooks.selectors, hook_name, name)?);
                }
                tree.register(clock);
            }
            ClockDescription::Divider {
                name,
                parent,
                div,
                div_field,
                table,
                div_type,
                get_div,
            } => {
                let mut clock = Divider::new().with_name(name);
                if let Some(parent) = parent {
                    clock = clock.with_parent(parent);
                }
                if let Some(div) = div {
                    clock = clock.with_div(*div);
                }
                if let Some(path) = div_field {
                    clock = clock.with_div_field(field(map, path, name)?);
                }
                if let Some(table) = table {
                    clock = clock.with_table(table.iter().map(|entry| (entry.raw, entry.div)));
                }
                if let Some(div_type) = div_type {
                    clock = clock.with_div_type(DivType::from_name(div_type)?);
                }
                if let Some(hook_name) = get_div {
                    clock = clock.with_get_div_fn(hook(&hooks.divisors, hook_name, name)?);
                }
                tree.register(clock);
            }
            ClockDescription::Pll {
                name,
                parent,
                en_field,
                get_freq,
            } => {
                let mut clock = Pll::new().with_name(name);
                if let Some(parent) = parent {
                    clock = clock.with_parent(parent);
                }
                if let Some(path) = en_field {
                    clock = clock.with_en_field(field(map, path, name)?);
                }
                if let Some(hook_name) = get_freq {
                    clock = clock.with_get_freq_fn(hook(&hooks.frequencies, hook_name, name)?);
                }
                tree.register(clock);
            }
        }

        Ok(())
    }
}
