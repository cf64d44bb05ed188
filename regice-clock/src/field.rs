//! # Register fields
//!
//! Clock nodes never talk to hardware directly. Every enable bit, ready bit,
//! multiplexer selector and divider encoding is reached through a
//! [`RegisterField`], a single readable/writable bit-field of a device's
//! memory-mapped registers. The device side hands fields out by path through a
//! [`RegisterMap`].
//!
//! [`MemoryMap`] is an in-memory register map, used by the command line tool
//! when no device is attached and by the tests.

use core::{cell::Cell, fmt};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::Error;

/// A single bit-field of a memory-mapped register.
///
/// Reads are not cached anywhere in the clock tree: hardware may change
/// between two queries.
pub trait RegisterField: fmt::Debug {
    /// Read the current raw value of the field.
    fn read(&self) -> Result<u64, Error>;

    /// Write a raw value to the field.
    fn write(&self, value: u64) -> Result<(), Error>;
}

/// Shared handle to a register field.
pub type FieldRef = Rc<dyn RegisterField>;

/// Resolves register fields of a device by path, e.g. `"CLKCTRL.SEL.MUX0"`.
pub trait RegisterMap {
    /// Returns the field at `path`, if the device has one.
    fn field(&self, path: &str) -> Option<FieldRef>;
}

/// A register field backed by memory.
///
/// Clones share the same storage, so a test can keep a handle to a field it
/// gave to a clock and flip it later.
#[derive(Clone, Default)]
pub struct MemoryField {
    path: Rc<str>,
    value: Rc<Cell<u64>>,
}

impl MemoryField {
    /// Creates a standalone field holding `value`.
    pub fn new(path: &str, value: u64) -> Self {
        Self {
            path: Rc::from(path),
            value: Rc::new(Cell::new(value)),
        }
    }

    /// The path this field was created with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current value, without going through the [`RegisterField`] interface.
    pub fn get(&self) -> u64 {
        self.value.get()
    }

    /// Sets the value, without going through the [`RegisterField`] interface.
    pub fn set(&self, value: u64) {
        self.value.set(value);
    }

    /// Returns a shareable handle for use by clock nodes.
    pub fn to_ref(&self) -> FieldRef {
        Rc::new(self.clone())
    }
}

impl fmt::Debug for MemoryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:#x}", self.path, self.value.get())
    }
}

impl RegisterField for MemoryField {
    fn read(&self) -> Result<u64, Error> {
        Ok(self.value.get())
    }

    fn write(&self, value: u64) -> Result<(), Error> {
        self.value.set(value);
        Ok(())
    }
}

/// Saved contents of a [`MemoryMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(Vec<(String, u64)>);

/// A register map whose fields live in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryMap {
    fields: IndexMap<String, MemoryField>,
}

impl MemoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field holding `value`, replacing any field with the same path.
    pub fn insert(&mut self, path: &str, value: u64) -> MemoryField {
        let field = MemoryField::new(path, value);
        self.fields.insert(path.to_string(), field.clone());
        field
    }

    /// Builder flavour of [`MemoryMap::insert`].
    pub fn with_field(mut self, path: &str, value: u64) -> Self {
        self.insert(path, value);
        self
    }

    /// Returns the concrete field at `path`.
    pub fn get(&self, path: &str) -> Option<&MemoryField> {
        self.fields.get(path)
    }

    /// Writes `value` to the field at `path`.
    pub fn write(&self, path: &str, value: u64) -> Result<(), Error> {
        let field = self
            .fields
            .get(path)
            .ok_or_else(|| Error::register(format!("no field at '{path}'")))?;
        field.write(value)
    }

    /// Captures the value of every field.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot(
            self.fields
                .iter()
                .map(|(path, field)| (path.clone(), field.get()))
                .collect(),
        )
    }

    /// Puts back the values captured by [`MemoryMap::snapshot`]. Fields added
    /// after the snapshot was taken keep their current value.
    pub fn restore(&self, snapshot: &Snapshot) {
        for (path, value) in snapshot.0.iter() {
            if let Some(field) = self.fields.get(path) {
                field.set(*value);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MemoryField)> {
        self.fields.iter().map(|(path, field)| (path.as_str(), field))
    }
}

impl RegisterMap for MemoryMap {
    fn field(&self, path: &str) -> Option<FieldRef> {
        self.fields.get(path).map(MemoryField::to_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_storage() {
        let field = MemoryField::new("TEST1.TESTA.A1", 0);
        let handle = field.to_ref();

        handle.write(1).unwrap();
        assert_eq!(field.get(), 1);

        field.set(0);
        assert_eq!(handle.read().unwrap(), 0);
    }

    #[test]
    fn snapshot_and_restore() {
        let mut map = MemoryMap::new().with_field("A", 3);
        map.insert("B", 1);

        let snapshot = map.snapshot();
        map.write("A", 7).unwrap();
        map.write("B", 0).unwrap();
        map.restore(&snapshot);

        assert_eq!(map.get("A").unwrap().get(), 3);
        assert_eq!(map.get("B").unwrap().get(), 1);
    }

    #[test]
    fn iterates_in_insertion_order() {
        let map = MemoryMap::new()
            .with_field("CLK.SEL", 1)
            .with_field("CLK.DIV", 4);

        let fields = map
            .iter()
            .map(|(path, field)| (path, field.path(), field.get()))
            .collect::<Vec<_>>();
        assert_eq!(
            fields,
            [("CLK.SEL", "CLK.SEL", 1), ("CLK.DIV", "CLK.DIV", 4)]
        );
    }

    #[test]
    fn unknown_path() {
        let map = MemoryMap::new();
        assert!(map.field("NOPE").is_none());
        assert!(matches!(map.write("NOPE", 1), Err(Error::Register(_))));
    }
}
