use core::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::DivisorFn;
use crate::{ClockNode, ClockTree, Error, FieldRef};

/// How the raw value of a divider field encodes the divisor.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum DivType {
    /// The raw value, or its entry in the lookup table, is the divisor.
    #[default]
    Linear,
    /// The divisor is `2^raw`.
    PowerOfTwo,
    /// Like [`DivType::Linear`], but a divisor of 0 means the output is gated.
    ZeroToGate,
}

impl DivType {
    /// Looks an encoding up by name, e.g. `"power_of_two"`.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        name.parse::<Self>()
            .map_err(|_| Error::InvalidDivider(format!("unknown divider type '{name}'")))
    }
}

impl TryFrom<u32> for DivType {
    type Error = Error;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(DivType::Linear),
            1 => Ok(DivType::PowerOfTwo),
            2 => Ok(DivType::ZeroToGate),
            _ => Err(Error::InvalidDivider(format!("unknown divider type {code}"))),
        }
    }
}

/// Divides its parent's frequency.
///
/// The divisor comes from, in order of precedence: a divisor function, a
/// static divisor, or the `div_field` register decoded according to the
/// [`DivType`] and the optional lookup table.
#[derive(Clone, Default)]
pub struct Divider {
    name: Option<String>,
    parent: Option<String>,
    div: Option<u64>,
    div_field: Option<FieldRef>,
    table: Option<IndexMap<u64, u64>>,
    div_type: DivType,
    get_div: Option<DivisorFn>,
}

impl Divider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// The divided clock. Required.
    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    /// A divisor that never changes.
    pub fn with_div(mut self, div: u64) -> Self {
        self.div = Some(div);
        self
    }

    pub fn with_div_field(mut self, field: FieldRef) -> Self {
        self.div_field = Some(field);
        self
    }

    /// Maps raw field values to divisors. Only used with `div_field`.
    pub fn with_table<I>(mut self, table: I) -> Self
    where
        I: IntoIterator<Item = (u64, u64)>,
    {
        self.table = Some(table.into_iter().collect());
        self
    }

    pub fn with_div_type(mut self, div_type: DivType) -> Self {
        self.div_type = div_type;
        self
    }

    /// Replaces divisor resolution with a function.
    pub fn with_get_div<F>(self, get_div: F) -> Self
    where
        F: Fn(&Divider, &ClockTree) -> Result<Option<u64>, Error> + 'static,
    {
        self.with_get_div_fn(Rc::new(get_div))
    }

    pub fn with_get_div_fn(mut self, get_div: DivisorFn) -> Self {
        self.get_div = Some(get_div);
        self
    }

    pub fn div_type(&self) -> DivType {
        self.div_type
    }

    /// The current divisor. `None` if it cannot be determined.
    pub fn get_div(&self, tree: &ClockTree) -> Result<Option<u64>, Error> {
        if let Some(get_div) = &self.get_div {
            return get_div(self, tree);
        }

        if let Some(div) = self.div {
            return Ok(Some(div));
        }

        let Some(div_field) = &self.div_field else {
            return Ok(None);
        };

        let raw = div_field.read()?;
        let div = match self.div_type {
            DivType::Linear | DivType::ZeroToGate => self.lookup(raw)?,
            DivType::PowerOfTwo => u32::try_from(raw)
                .ok()
                .and_then(|shift| 1u64.checked_shl(shift))
                .ok_or_else(|| {
                    Error::InvalidDivider(format!(
                        "'{}' cannot divide by 2^{raw}",
                        self.label()
                    ))
                })?,
        };

        Ok(Some(div))
    }

    fn lookup(&self, raw: u64) -> Result<u64, Error> {
        let Some(table) = &self.table else {
            return Ok(raw);
        };

        table.get(&raw).copied().ok_or_else(|| {
            Error::InvalidDivider(format!(
                "'{}' has no divisor for raw value {raw}",
                self.label()
            ))
        })
    }

    fn gates_on_zero(&self) -> bool {
        self.div_type == DivType::ZeroToGate
    }
}

impl fmt::Debug for Divider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Divider")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("div", &self.div)
            .field("div_field", &self.div_field)
            .field("table", &self.table)
            .field("div_type", &self.div_type)
            .field("get_div", &self.get_div.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl ClockNode for Divider {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    fn validate(&self, _tree: Option<&ClockTree>) -> Result<(), Error> {
        if self.parent.is_none() {
            return Err(Error::Misconfigured(format!(
                "divider '{}' has no parent",
                self.label()
            )));
        }

        if self.div.is_none() && self.div_field.is_none() && self.get_div.is_none() {
            return Err(Error::Misconfigured(format!(
                "divider '{}' has no divisor source",
                self.label()
            )));
        }

        Ok(())
    }

    fn enabled(&self, tree: &ClockTree) -> Result<bool, Error> {
        Ok(match self.get_div(tree)? {
            None => false,
            Some(0) => !self.gates_on_zero(),
            Some(_) => true,
        })
    }

    fn get_freq(&self, tree: &ClockTree) -> Result<f64, Error> {
        let div = match self.get_div(tree)? {
            None => return Ok(0.0),
            Some(0) if self.gates_on_zero() => return Ok(0.0),
            Some(0) => return Err(Error::DivideByZero(self.label().to_string())),
            Some(div) => div,
        };

        Ok(tree.get_freq(self.parent())? / div as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedClock, MemoryField};

    fn ext_get_div(_div: &Divider, _tree: &ClockTree) -> Result<Option<u64>, Error> {
        Ok(Some(3))
    }

    fn ext_get_div_none(_div: &Divider, _tree: &ClockTree) -> Result<Option<u64>, Error> {
        Ok(None)
    }

    fn ext_get_div_zero(_div: &Divider, _tree: &ClockTree) -> Result<Option<u64>, Error> {
        Ok(Some(0))
    }

    fn tree_with_parent(freq: f64) -> ClockTree {
        let mut tree = ClockTree::new();
        tree.register(FixedClock::new(freq).with_name("test"));
        tree
    }

    #[test]
    fn build() {
        let field = MemoryField::new("TEST1.TESTA.A3", 3);
        let table = [(0, 1), (1, 4), (2, 16)];

        assert!(!Divider::new().build(None));
        assert!(!Divider::new().with_parent("test").build(None));
        assert!(Divider::new().with_parent("test").with_div(2).build(None));

        let div = Divider::new().with_parent("test").with_table(table);
        assert!(!div.build(None));

        let div = div.with_div_field(field.to_ref());
        assert!(div.build(None));

        let div = Divider::new()
            .with_parent("test")
            .with_div_field(field.to_ref());
        assert!(div.build(None));

        let div = Divider::new()
            .with_parent("test")
            .with_get_div(ext_get_div);
        assert!(div.build(None));
    }

    #[test]
    fn get_div() {
        let tree = tree_with_parent(123456.0);
        let field = MemoryField::new("TEST1.TESTA.A3", 3);

        let div = Divider::new().with_name("div").with_parent("test").with_div(2);
        assert_eq!(div.get_div(&tree).unwrap(), Some(2));

        let div = Divider::new()
            .with_name("div")
            .with_parent("test")
            .with_div_field(field.to_ref());
        assert_eq!(div.get_div(&tree).unwrap(), Some(3));

        let div = div.with_div_type(DivType::PowerOfTwo);
        assert_eq!(div.get_div(&tree).unwrap(), Some(8));

        let div = Divider::new()
            .with_name("div")
            .with_parent("test")
            .with_div_field(field.to_ref())
            .with_table([(3, 12), (4, 16)]);
        assert_eq!(div.get_div(&tree).unwrap(), Some(12));

        field.set(2);
        assert!(matches!(div.get_div(&tree), Err(Error::InvalidDivider(_))));

        let div = Divider::new()
            .with_name("div")
            .with_parent("test")
            .with_get_div(ext_get_div);
        assert_eq!(div.get_div(&tree).unwrap(), Some(3));
    }

    #[test]
    fn get_div_precedence() {
        let tree = tree_with_parent(100.0);
        let field = MemoryField::new("DIV", 5);

        let div = Divider::new()
            .with_parent("test")
            .with_div_field(field.to_ref())
            .with_div(4);
        assert_eq!(div.get_div(&tree).unwrap(), Some(4));

        let div = div.with_get_div(ext_get_div);
        assert_eq!(div.get_div(&tree).unwrap(), Some(3));
    }

    #[test]
    fn zero_to_gate_uses_table() {
        let tree = tree_with_parent(100.0);
        let field = MemoryField::new("DIV", 1);

        let div = Divider::new()
            .with_name("div")
            .with_parent("test")
            .with_div_field(field.to_ref())
            .with_table([(0, 0), (1, 4)])
            .with_div_type(DivType::ZeroToGate);
        assert_eq!(div.get_freq(&tree).unwrap(), 25.0);
        assert!(div.enabled(&tree).unwrap());

        field.set(0);
        assert_eq!(div.get_freq(&tree).unwrap(), 0.0);
        assert!(!div.enabled(&tree).unwrap());
    }

    #[test]
    fn power_of_two_overflow() {
        let tree = tree_with_parent(100.0);
        let field = MemoryField::new("DIV", 64);

        let div = Divider::new()
            .with_parent("test")
            .with_div_field(field.to_ref())
            .with_div_type(DivType::PowerOfTwo);
        assert!(matches!(div.get_div(&tree), Err(Error::InvalidDivider(_))));
    }

    #[test]
    fn unknown_div_type() {
        assert!(matches!(
            DivType::try_from(9999),
            Err(Error::InvalidDivider(_))
        ));
        assert!(matches!(
            DivType::from_name("bogus"),
            Err(Error::InvalidDivider(_))
        ));
        assert_eq!(DivType::try_from(1).unwrap(), DivType::PowerOfTwo);
        assert_eq!(DivType::from_name("zero_to_gate").unwrap(), DivType::ZeroToGate);
        assert_eq!(DivType::PowerOfTwo.to_string(), "power_of_two");
    }

    #[test]
    fn get_freq() {
        let freq = 123456.0;
        let tree = tree_with_parent(freq);

        let div = Divider::new().with_name("div").with_parent("test").with_div(2);
        assert_eq!(div.get_freq(&tree).unwrap(), freq / 2.0);

        let div = Divider::new()
            .with_name("div")
            .with_parent("test")
            .with_get_div(ext_get_div_none);
        assert_eq!(div.get_freq(&tree).unwrap(), 0.0);

        let div = Divider::new()
            .with_name("div")
            .with_parent("test")
            .with_get_div(ext_get_div_zero);
        assert_eq!(
            div.get_freq(&tree).unwrap_err(),
            Error::DivideByZero("div".into())
        );

        let div = div.with_div_type(DivType::ZeroToGate);
        assert_eq!(div.get_freq(&tree).unwrap(), 0.0);
    }

    #[test]
    fn enabled() {
        let tree = tree_with_parent(123456.0);

        let div = Divider::new().with_name("div").with_parent("test").with_div(2);
        assert!(div.enabled(&tree).unwrap());

        let div = Divider::new()
            .with_name("div")
            .with_parent("test")
            .with_get_div(ext_get_div_zero)
            .with_div_type(DivType::ZeroToGate);
        assert!(!div.enabled(&tree).unwrap());

        let div = Divider::new()
            .with_name("div")
            .with_parent("test")
            .with_get_div(ext_get_div_none);
        assert!(!div.enabled(&tree).unwrap());
    }

    #[test]
    fn dangling_parent_is_reported_on_query() {
        let tree = ClockTree::new();
        let div = Divider::new().with_name("div").with_parent("nope").with_div(2);

        assert!(div.build(Some(&tree)));
        assert_eq!(
            div.get_freq(&tree).unwrap_err(),
            Error::UnknownClock("nope".into())
        );
    }
}
