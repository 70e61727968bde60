use std::collections::{HashMap, HashSet};

use bitvec::prelude::*;
use tracing::debug;

use crate::data_type::DataType;
use crate::error::{DbError, Result};
use crate::record::{Record, RecordId};
use crate::value::Value;

/// Minimum width of a rendered table column.
pub const MIN_COLUMN_WIDTH: usize = 10;

/// Canonical form of a type or field name: trimmed and lowercased.
pub fn canonical(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Field definition in the schema
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub data_type: DataType,
    pub required: bool,
    pub unique: bool,
}

impl FieldDef {
    /// Creates an optional, non-unique field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            required: false,
            unique: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// The canonical name records and indexes are keyed by.
    pub fn key(&self) -> String {
        canonical(&self.name)
    }
}

/// Ordered field definitions of a type. Order is kept for display.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub fields: Vec<FieldDef>,
}

impl Schema {
    /// Finds a field by name, case-insensitively.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        let key = canonical(name);
        self.fields.iter().find(|f| f.key() == key)
    }
}

/// A named record type: its schema, its records and one unique index per
/// unique field.
///
/// The unique indexes are derived state. They are only touched by
/// [Table::insert], [Table::update_where] and [Table::delete_where], and after
/// each of them every index holds exactly one entry per value currently
/// stored in its field.
#[derive(Debug)]
pub struct Table {
    pub name: String,
    schema: Schema,
    records: Vec<Record>,
    unique_index: HashMap<String, HashMap<Value, RecordId>>,
    next_id: u64,
}

impl Table {
    pub fn new(name: String) -> Self {
        Self {
            name,
            schema: Schema::default(),
            records: Vec::new(),
            unique_index: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.schema.field(name)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Adds a field definition to the schema.
    ///
    /// # Errors
    /// - the name is blank,
    /// - a field with the same canonical name exists,
    /// - the type already holds records (schemas do not evolve online).
    pub fn add_field(&mut self, def: FieldDef) -> Result<()> {
        let key = def.key();
        if key.is_empty() {
            return Err(DbError::InvalidFieldDefinition(def.name));
        }
        if self.schema.field(&key).is_some() {
            return Err(DbError::DuplicateField(def.name));
        }
        if !self.records.is_empty() {
            return Err(DbError::InvalidFieldDefinition(format!(
                "{} (type {} already holds records)",
                def.name, self.name
            )));
        }
        if def.unique {
            self.unique_index.insert(key, HashMap::new());
        }
        self.schema.fields.push(def);
        Ok(())
    }

    /// Inserts a new record.
    ///
    /// Fields absent from `provided` receive their kind's default. A required
    /// field must be present in `provided`: a default never satisfies it.
    /// Nothing is stored unless every check passes.
    ///
    /// # Errors
    /// Returns an error for an unknown field, a value of the wrong kind, a
    /// missing required field or a duplicate value on a unique field.
    pub fn insert(&mut self, provided: HashMap<String, Value>) -> Result<RecordId> {
        let mut provided: HashMap<String, Value> = provided
            .into_iter()
            .map(|(name, value)| (canonical(&name), value))
            .collect();

        for (key, value) in &provided {
            let field = self
                .schema
                .field(key)
                .ok_or_else(|| DbError::FieldNotFound(key.clone()))?;
            check_kind(field, value)?;
        }

        for field in &self.schema.fields {
            if field.required && !provided.contains_key(&field.key()) {
                return Err(DbError::MissingRequiredField(field.name.clone()));
            }
        }

        let values: HashMap<String, Value> = self
            .schema
            .fields
            .iter()
            .map(|field| {
                let key = field.key();
                let value = provided
                    .remove(&key)
                    .unwrap_or_else(|| field.data_type.default_value());
                (key, value)
            })
            .collect();

        for field in self.schema.fields.iter().filter(|f| f.unique) {
            let key = field.key();
            let taken = self
                .unique_index
                .get(&key)
                .is_some_and(|index| values.get(&key).is_some_and(|v| index.contains_key(v)));
            if taken {
                return Err(DbError::UniqueViolation(field.name.clone()));
            }
        }

        // commit: record + indexes
        let id = RecordId(self.next_id);
        self.next_id += 1;
        let record = Record::new(id, values);
        index_add(&mut self.unique_index, &record);
        self.records.push(record);
        debug!(table = %self.name, ?id, "record inserted");
        Ok(id)
    }

    /// Evaluates `predicate` against every record and returns the match mask.
    ///
    /// A failing predicate aborts the scan before anything is modified.
    pub fn matching<P>(&self, mut predicate: P) -> Result<BitVec>
    where
        P: FnMut(&Schema, &Record) -> Result<bool>,
    {
        let mut mask = BitVec::with_capacity(self.records.len());
        for record in &self.records {
            mask.push(predicate(&self.schema, record)?);
        }
        Ok(mask)
    }

    /// Returns the records matching `predicate`, in insertion order.
    pub fn find<P>(&self, predicate: P) -> Result<Vec<&Record>>
    where
        P: FnMut(&Schema, &Record) -> Result<bool>,
    {
        let mask = self.matching(predicate)?;
        Ok(mask.iter_ones().map(|i| &self.records[i]).collect())
    }

    /// Deletes every record matching `predicate` and returns how many were removed.
    pub fn delete_where<P>(&mut self, predicate: P) -> Result<usize>
    where
        P: FnMut(&Schema, &Record) -> Result<bool>,
    {
        let mask = self.matching(predicate)?;

        for i in mask.iter_ones() {
            index_remove(&mut self.unique_index, &self.records[i]);
        }

        let mut row = 0;
        self.records.retain(|_| {
            let keep = !mask[row];
            row += 1;
            keep
        });

        let deleted = mask.count_ones();
        debug!(table = %self.name, deleted, "records deleted");
        Ok(deleted)
    }

    /// Applies `assignments` to every record matching `predicate` and returns
    /// how many were updated.
    ///
    /// An assignment of `None` resets the field to its kind's default and
    /// counts as absent for a required field.
    ///
    /// The whole change set is validated before any record or index is
    /// touched: unknown fields, kind mismatches, required fields left absent,
    /// and unique values that would collide with another record or that would
    /// be written to more than one record. A failed update leaves the table
    /// unchanged.
    pub fn update_where<P>(
        &mut self,
        predicate: P,
        assignments: Vec<(String, Option<Value>)>,
    ) -> Result<usize>
    where
        P: FnMut(&Schema, &Record) -> Result<bool>,
    {
        // 1. field names and kinds
        let mut changes: Vec<(&FieldDef, Option<Value>)> = Vec::with_capacity(assignments.len());
        for (name, value) in assignments {
            let field = self
                .schema
                .field(&name)
                .ok_or_else(|| DbError::FieldNotFound(name.clone()))?;
            if let Some(value) = &value {
                check_kind(field, value)?;
            }
            match changes.iter_mut().find(|(f, _)| f.key() == field.key()) {
                Some(change) => change.1 = value,
                None => changes.push((field, value)),
            }
        }

        let mask = self.matching(predicate)?;
        let matched = mask.count_ones();
        if matched == 0 {
            return Ok(0);
        }

        // 2. constraints, against the final state of the matching records
        let mut writes: Vec<(String, Value)> = Vec::with_capacity(changes.len());
        for (field, value) in changes {
            if field.required && value.is_none() {
                return Err(DbError::MissingRequiredField(field.name.clone()));
            }
            let value = value.unwrap_or_else(|| field.data_type.default_value());
            if field.unique {
                let targets: HashSet<RecordId> =
                    mask.iter_ones().map(|i| self.records[i].id()).collect();
                let held_elsewhere = self
                    .unique_index
                    .get(&field.key())
                    .and_then(|index| index.get(&value))
                    .is_some_and(|owner| !targets.contains(owner));
                if matched > 1 || held_elsewhere {
                    return Err(DbError::UniqueViolation(field.name.clone()));
                }
            }
            writes.push((field.key(), value));
        }

        // 3. apply: cannot fail past this point
        for i in mask.iter_ones() {
            let record = &mut self.records[i];
            index_remove(&mut self.unique_index, record);
            for (key, value) in &writes {
                record.set(key.clone(), value.clone());
            }
            index_add(&mut self.unique_index, record);
        }

        debug!(table = %self.name, updated = matched, "records updated");
        Ok(matched)
    }

    /// Checks that every unique index holds exactly one entry per value
    /// currently stored in its field, pointing at the record that holds it.
    pub fn indexes_consistent(&self) -> bool {
        self.unique_index.iter().all(|(key, index)| {
            let mut seen = HashMap::new();
            for record in &self.records {
                let Some(value) = record.value(key) else {
                    return false;
                };
                if seen.insert(value, record.id()).is_some() {
                    return false;
                }
            }
            seen.len() == index.len()
                && seen
                    .iter()
                    .all(|(value, id)| index.get(*value) == Some(id))
        })
    }

    /// Renders `records` as a fixed-width grid: a header of field names, a
    /// separator, then one row per record. Every column is as wide as the
    /// longest field name (at least [MIN_COLUMN_WIDTH]); longer values are
    /// truncated.
    pub fn format_table(&self, records: &[&Record]) -> String {
        let width = self
            .schema
            .fields
            .iter()
            .map(|f| f.name.chars().count())
            .max()
            .unwrap_or(0)
            .max(MIN_COLUMN_WIDTH);

        let mut out = String::from("| ");
        for field in &self.schema.fields {
            out.push_str(&pad(&field.name, width));
            out.push_str(" | ");
        }
        out.push_str("\n|");
        for _ in &self.schema.fields {
            out.push_str(&"-".repeat(width + 2));
            out.push('|');
        }
        out.push('\n');

        for record in records {
            out.push_str("| ");
            for field in &self.schema.fields {
                let text = record
                    .value(&field.key())
                    .map(Value::to_string)
                    .unwrap_or_default();
                out.push_str(&pad(&text, width));
                out.push_str(" | ");
            }
            out.push('\n');
        }
        out
    }
}

fn check_kind(field: &FieldDef, value: &Value) -> Result<()> {
    if value.data_type() != field.data_type {
        return Err(DbError::invalid_value(
            &field.name,
            format!(
                "value of kind {} does not match field kind {}",
                value.data_type(),
                field.data_type
            ),
        ));
    }
    Ok(())
}

fn pad(text: &str, width: usize) -> String {
    let mut out: String = text.chars().take(width).collect();
    let len = out.chars().count();
    out.extend(std::iter::repeat_n(' ', width - len));
    out
}

/// Removes the record's entries from every unique index, but only where the
/// entry still points at this record.
fn index_remove(indexes: &mut HashMap<String, HashMap<Value, RecordId>>, record: &Record) {
    for (key, index) in indexes.iter_mut() {
        if let Some(value) = record.value(key) {
            if index.get(value) == Some(&record.id()) {
                index.remove(value);
            }
        }
    }
}

fn index_add(indexes: &mut HashMap<String, HashMap<Value, RecordId>>, record: &Record) {
    for (key, index) in indexes.iter_mut() {
        if let Some(value) = record.value(key) {
            index.insert(value.clone(), record.id());
        }
    }
}
