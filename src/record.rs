use std::collections::HashMap;

use crate::table::canonical;
use crate::value::Value;

/// Stable identity of a record inside its table. Unique indexes point at
/// records through this id, never through a position in the record list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(pub(crate) u64);

/// One instance of a type: a value for every declared field, keyed by the
/// canonical (trimmed, lowercase) field name.
///
/// Records are only created and mutated by their owning [crate::Table].
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    values: HashMap<String, Value>,
}

impl Record {
    pub(crate) fn new(id: RecordId, values: HashMap<String, Value>) -> Self {
        Self { id, values }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Retrieves the value of a field. The name is matched case-insensitively.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(&canonical(field))
    }

    /// Lookup by an already canonical key.
    pub(crate) fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub(crate) fn set(&mut self, key: String, value: Value) {
        self.values.insert(key, value);
    }
}
