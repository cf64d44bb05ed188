//! # Clock tree introspection
//!
//! Models the clock generation network of a system-on-chip: oscillators,
//! multiplexers, dividers, gates and PLLs composed into a tree, backed by the
//! live register fields that configure them.
//!
//! The tree answers two questions about any clock, recomputed from the
//! registers on every call:
//! - [`ClockTree::get_freq`]: the frequency it currently runs at.
//! - [`ClockTree::is_gated`]: whether it, or one of its ancestors, is stopped.
//!
//! ## Examples
//!
//! ```rust
//! use regice_clock::{ClockTree, Divider, FixedClock, Gate, MemoryField};
//!
//! let en = MemoryField::new("CLK.EN", 1);
//!
//! let mut tree = ClockTree::new();
//! tree.register(FixedClock::new(1234.0).with_name("osc1"));
//! tree.register(Divider::new().with_name("div1").with_parent("osc1").with_div(2));
//! tree.register(
//!     Gate::new()
//!         .with_name("gate1")
//!         .with_parent("div1")
//!         .with_en_field(en.to_ref()),
//! );
//! assert!(tree.build());
//!
//! assert_eq!(tree.get_freq("gate1")?, 617.0);
//! assert!(!tree.is_gated("gate1")?);
//!
//! en.set(0);
//! assert!(tree.is_gated("gate1")?);
//! # Ok::<(), regice_clock::Error>(())
//! ```

mod clock;
mod description;
mod error;
mod field;
mod forest;
mod freq;
mod tree;

pub use self::{
    clock::{
        Clock,
        ClockKind,
        ClockNode,
        DivType,
        Divider,
        DivisorFn,
        FixedClock,
        FrequencyFn,
        Gate,
        Mux,
        Pll,
        SelectorFn,
    },
    description::{ClockDescription, Description, Hooks, MuxInput, TableEntry},
    error::Error,
    field::{FieldRef, MemoryField, MemoryMap, RegisterField, RegisterMap, Snapshot},
    forest::ClockForest,
    freq::{FrequencyOverride, human_readable_frequency},
    tree::ClockTree,
};
