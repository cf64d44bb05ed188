//! # Clock nodes
//!
//! A clock tree is made of five kinds of nodes:
//! - [`FixedClock`]: a root oscillator with a known frequency.
//! - [`Gate`]: an enable switch, passes its parent's frequency through.
//! - [`Mux`]: selects one of several inputs through a selector field.
//! - [`Divider`]: divides its parent's frequency by a static, register-derived
//!   or computed divisor.
//! - [`Pll`]: a multiplier whose output frequency is computed by a
//!   user-supplied function.
//!
//! Nodes refer to their parent by name. The name is resolved through the
//! [`ClockTree`] every time a query walks up the tree, so nodes may be
//! registered in any order and a dangling name is only reported when it is
//! actually dereferenced.
//!
//! Every node reports only its *local* enablement through
//! [`ClockNode::enabled`]. Whether a branch is gated by one of its ancestors is
//! answered by [`ClockTree::is_gated`].

use std::rc::Rc;

use crate::{ClockTree, Error, FieldRef};

mod divider;
mod fixed;
mod gate;
mod mux;
mod pll;

pub use divider::{DivType, Divider};
pub use fixed::FixedClock;
pub use gate::Gate;
pub use mux::Mux;
pub use pll::Pll;

/// Replaces a multiplexer's selector field read.
pub type SelectorFn = Rc<dyn Fn(&Mux, &ClockTree) -> Result<u64, Error>>;

/// Replaces a divider's divisor resolution. `None` means the divisor is
/// unknown.
pub type DivisorFn = Rc<dyn Fn(&Divider, &ClockTree) -> Result<Option<u64>, Error>>;

/// Computes the output frequency of a PLL, in Hz.
pub type FrequencyFn = Rc<dyn Fn(&Pll, &ClockTree) -> Result<f64, Error>>;

/// The common contract of every clock node.
///
/// The provided methods are the behaviour of a node without any clock
/// semantics: it cannot be validated and it has no frequency.
pub trait ClockNode {
    /// The unique name of the node, required for registration.
    fn name(&self) -> Option<&str>;

    /// The declared parent name. `None` for a root.
    fn parent(&self) -> Option<&str> {
        None
    }

    /// Every clock this node may take its input from.
    fn inputs(&self) -> Vec<&str> {
        self.parent().into_iter().collect()
    }

    /// The name of the clock currently feeding this node.
    ///
    /// Only differs from [`ClockNode::parent`] for nodes whose input is
    /// selected at runtime.
    fn current_parent(&self, _tree: &ClockTree) -> Result<Option<&str>, Error> {
        Ok(self.parent())
    }

    /// Resolves the clock currently feeding this node.
    fn get_parent<'t>(&self, tree: &'t ClockTree) -> Result<Option<&'t Clock>, Error> {
        tree.get(self.current_parent(tree)?)
    }

    /// Fails unless the node has a name and a tree to live in.
    fn check(&self, tree: Option<&ClockTree>) -> Result<(), Error> {
        match (tree, self.name()) {
            (Some(_), Some(name)) if !name.is_empty() => Ok(()),
            _ => Err(Error::Detached),
        }
    }

    /// Checks that the node is configured well enough to be queried.
    fn validate(&self, _tree: Option<&ClockTree>) -> Result<(), Error> {
        Err(Error::Misconfigured(format!(
            "'{}' has no clock semantics",
            self.label()
        )))
    }

    /// Validation as a boolean. The reason of a failure is logged.
    fn build(&self, tree: Option<&ClockTree>) -> bool {
        match self.validate(tree) {
            Ok(()) => true,
            Err(err) => {
                log::debug!("Clock '{}' failed to build: {err}", self.label());
                false
            }
        }
    }

    /// Whether the node itself lets the clock through. Ancestors are not
    /// consulted.
    fn enabled(&self, _tree: &ClockTree) -> Result<bool, Error> {
        Ok(true)
    }

    /// The current output frequency, in Hz.
    fn get_freq(&self, _tree: &ClockTree) -> Result<f64, Error> {
        Err(Error::InvalidFrequency(format!(
            "'{}' has no frequency",
            self.label()
        )))
    }

    /// Name used in diagnostics.
    fn label(&self) -> &str {
        self.name().unwrap_or("<unnamed>")
    }
}

/// The kind of a [`Clock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ClockKind {
    Fixed,
    Gate,
    Mux,
    Divider,
    Pll,
}

/// A node of the clock tree.
#[derive(Debug, Clone)]
pub enum Clock {
    Fixed(FixedClock),
    Gate(Gate),
    Mux(Mux),
    Divider(Divider),
    Pll(Pll),
}

impl Clock {
    pub fn kind(&self) -> ClockKind {
        match self {
            Clock::Fixed(_) => ClockKind::Fixed,
            Clock::Gate(_) => ClockKind::Gate,
            Clock::Mux(_) => ClockKind::Mux,
            Clock::Divider(_) => ClockKind::Divider,
            Clock::Pll(_) => ClockKind::Pll,
        }
    }

    pub fn as_dyn_ref(&self) -> &dyn ClockNode {
        match self {
            Clock::Fixed(clk) => clk,
            Clock::Gate(clk) => clk,
            Clock::Mux(clk) => clk,
            Clock::Divider(clk) => clk,
            Clock::Pll(clk) => clk,
        }
    }

    pub fn as_fixed_mut(&mut self) -> Option<&mut FixedClock> {
        match self {
            Clock::Fixed(clk) => Some(clk),
            _ => None,
        }
    }
}

impl ClockNode for Clock {
    fn name(&self) -> Option<&str> {
        self.as_dyn_ref().name()
    }

    fn parent(&self) -> Option<&str> {
        self.as_dyn_ref().parent()
    }

    fn inputs(&self) -> Vec<&str> {
        self.as_dyn_ref().inputs()
    }

    fn current_parent(&self, tree: &ClockTree) -> Result<Option<&str>, Error> {
        self.as_dyn_ref().current_parent(tree)
    }

    fn get_parent<'t>(&self, tree: &'t ClockTree) -> Result<Option<&'t Clock>, Error> {
        self.as_dyn_ref().get_parent(tree)
    }

    fn check(&self, tree: Option<&ClockTree>) -> Result<(), Error> {
        self.as_dyn_ref().check(tree)
    }

    fn validate(&self, tree: Option<&ClockTree>) -> Result<(), Error> {
        self.as_dyn_ref().validate(tree)
    }

    fn build(&self, tree: Option<&ClockTree>) -> bool {
        self.as_dyn_ref().build(tree)
    }

    fn enabled(&self, tree: &ClockTree) -> Result<bool, Error> {
        self.as_dyn_ref().enabled(tree)
    }

    fn get_freq(&self, tree: &ClockTree) -> Result<f64, Error> {
        self.as_dyn_ref().get_freq(tree)
    }
}

macro_rules! impl_from_variant {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Clock {
                fn from(clk: $ty) -> Self {
                    Clock::$variant(clk)
                }
            }
        )*
    };
}

impl_from_variant! {
    Fixed(FixedClock),
    Gate(Gate),
    Mux(Mux),
    Divider(Divider),
    Pll(Pll),
}

/// `true` if the field reads non-zero.
pub(crate) fn is_set(field: &FieldRef) -> Result<bool, Error> {
    Ok(field.read()? != 0)
}
