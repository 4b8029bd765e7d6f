//! Attribute entries: named bundles of base attribute values.

use serde::{Deserialize, Serialize};

use crate::attribute::AttributeKind;
use crate::math::{decimal_serde, Fixed};

/// One attribute value inside an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    /// Attribute slot.
    pub kind: AttributeKind,
    /// Value added to the slot.
    #[serde(with = "decimal_serde")]
    pub value: Fixed,
}

impl AttributeValue {
    /// Create a new attribute value.
    #[must_use]
    pub const fn new(kind: AttributeKind, value: Fixed) -> Self {
        Self { kind, value }
    }
}

/// Static base values referenced by units, items and level growth.
///
/// # Example RON
///
/// ```ron
/// AttributeEntry(
///     id: 1001,
///     values: [
///         (kind: Attack, value: 100),
///         (kind: MaxHp, value: 500),
///         (kind: Crit, value: 0.1),
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeEntry {
    /// Unique identifier.
    pub id: u32,
    /// Values loaded into the base array.
    #[serde(default)]
    pub values: Vec<AttributeValue>,
}

impl AttributeEntry {
    /// Value declared for `kind`, summed if listed more than once.
    #[must_use]
    pub fn value_of(&self, kind: AttributeKind) -> Fixed {
        self.values
            .iter()
            .filter(|v| v.kind == kind)
            .map(|v| v.value)
            .sum()
    }
}
