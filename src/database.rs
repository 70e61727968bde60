use std::collections::HashMap;

use tracing::{debug, info};

use crate::{
    FieldDef, Value,
    ast::{CreateType, Delete, Expr, Insert, Search, Statement, Update},
    command,
    error::{DbError, Result},
    json::JsonValue,
    record::Record,
    table::{Schema, Table, canonical},
};

/// The main entry point of the store.
/// It owns every record type and applies parsed commands to them.
#[derive(Default)]
pub struct Database {
    /// Types keyed by their canonical (trimmed, lowercase) name.
    tables: HashMap<String, Table>,
}

/// Records selected by a `search`, as plain values.
#[derive(Debug)]
pub struct QueryResult {
    /// Field names of the type, in declaration order.
    pub columns: Vec<String>,
    /// One row per matching record, values in the order of `columns`.
    pub rows: Vec<Vec<Value>>,
}

impl Database {
    pub fn new() -> Self {
        Self {
            tables: HashMap::default(),
        }
    }

    /// Creates a new type with the given fields.
    ///
    /// Either every field is added or the type is not created at all.
    ///
    /// # Errors
    /// Returns an error if a type with the same (case-insensitive) name
    /// exists, if `fields` is empty, or if a field is rejected by
    /// [Table::add_field].
    pub fn create_table(&mut self, name: &str, fields: Vec<FieldDef>) -> Result<&Table> {
        let key = canonical(name);
        if self.tables.contains_key(&key) {
            return Err(DbError::TypeAlreadyExists(name.to_string()));
        }
        if fields.is_empty() {
            return Err(DbError::EmptyFields);
        }

        let mut table = Table::new(name.trim().to_string());
        for field in fields {
            table.add_field(field)?;
        }

        info!(table = %table.name, fields = table.schema().fields.len(), "type created");
        Ok(&*self.tables.entry(key).or_insert(table))
    }

    /// Retrieves a type by name, case-insensitively.
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(&canonical(name))
    }

    /// Retrieves a mutable reference to a type by name, case-insensitively.
    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(&canonical(name))
    }

    /// Returns the names of every type, as they were written at creation.
    pub fn list_tables(&self) -> Vec<&str> {
        self.tables.values().map(|t| t.name.as_str()).collect()
    }

    fn table(&self, name: &str) -> Result<&Table> {
        self.get_table(name)
            .ok_or_else(|| DbError::TypeNotFound(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.get_table_mut(name)
            .ok_or_else(|| DbError::TypeNotFound(name.to_string()))
    }

    /// Parses and runs one command line, returning the text to show the user.
    ///
    /// # Errors
    /// Returns the first error met while parsing or applying the command. A
    /// failed command leaves the store unchanged.
    ///
    /// # Example
    /// ```
    /// use schemadb::Database;
    /// let mut db = Database::new();
    /// db.execute(r#"create User { "id": { "type": "int", "required": true, "unique": true } }"#).unwrap();
    /// db.execute(r#"insert user { "ID": 1 }"#).unwrap();
    ///
    /// assert_eq!(db.execute("delete User (id = 1)").unwrap(), "1 instances deleted.");
    /// assert_eq!(db.execute("delete User (id = 1)").unwrap(), "0 instances deleted.");
    /// assert!(db.execute(r#"insert User {}"#).is_err());
    /// ```
    pub fn execute(&mut self, line: &str) -> Result<String> {
        let statement = command::parse(line)?;
        debug!(?statement, "executing");

        match statement {
            Statement::CreateType(create) => self.create(create),
            Statement::Insert(insert) => self.insert(insert),
            Statement::Update(update) => self.update(update),
            Statement::Delete(delete) => self.delete(delete),
            Statement::Search(search) => self.search(search),
        }
    }

    fn create(&mut self, create: CreateType) -> Result<String> {
        let table = self.create_table(&create.name, create.fields)?;
        Ok(format!(
            "Type '{}' created ({} fields).",
            table.name,
            table.schema().fields.len()
        ))
    }

    fn insert(&mut self, insert: Insert) -> Result<String> {
        let table = self.table_mut(&insert.table)?;
        let provided = coerce_payload(table.schema(), insert.values)?
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect::<HashMap<_, _>>();

        table.insert(provided)?;
        info!(table = %table.name, "instance inserted");
        Ok(format!("Instance inserted into '{}'.", table.name))
    }

    fn update(&mut self, update: Update) -> Result<String> {
        let table = self.table_mut(&update.table)?;
        let assignments = coerce_payload(table.schema(), update.assignments)?;
        validate(table.schema(), update.filter.as_ref())?;

        let updated = table.update_where(predicate(update.filter.as_ref()), assignments)?;
        info!(table = %table.name, updated, "instances updated");
        Ok(format!("{updated} instances updated."))
    }

    fn delete(&mut self, delete: Delete) -> Result<String> {
        let table = self.table_mut(&delete.table)?;
        validate(table.schema(), delete.filter.as_ref())?;

        let deleted = table.delete_where(predicate(delete.filter.as_ref()))?;
        info!(table = %table.name, deleted, "instances deleted");
        Ok(format!("{deleted} instances deleted."))
    }

    fn search(&self, search: Search) -> Result<String> {
        let table = self.table(&search.table)?;
        validate(table.schema(), search.filter.as_ref())?;
        let found = table.find(predicate(search.filter.as_ref()))?;

        if found.is_empty() {
            return Ok("No results found.".to_string());
        }
        Ok(format!(
            "Search results ({}):\n{}",
            found.len(),
            table.format_table(&found).trim_end()
        ))
    }

    /// Runs a `search` command and returns the matching records as values
    /// instead of rendered text.
    ///
    /// # Example
    /// ```
    /// use schemadb::{Database, Value};
    ///
    /// let mut db = Database::new();
    /// db.execute(r#"create Product { name: {}, price: { type: "int" } }"#).unwrap();
    /// db.execute(r#"insert Product { "name": "Laptop", "price": 1200 }"#).unwrap();
    /// db.execute(r#"insert Product { "name": "Mouse", "price": 25 }"#).unwrap();
    ///
    /// let result = db.query("search product (price < 100)").unwrap();
    /// assert_eq!(result.columns, vec!["name", "price"]);
    /// assert_eq!(result.rows, vec![vec![Value::Text("Mouse".into()), Value::Int(25)]]);
    /// ```
    ///
    /// # Errors
    /// Returns an error if the line is not a valid `search` command, if the
    /// type does not exist or if the filter fails to evaluate.
    pub fn query(&self, line: &str) -> Result<QueryResult> {
        let Statement::Search(search) = command::parse(line)? else {
            return Err(DbError::InvalidSyntax {
                command: "search",
                details: "only search commands return rows".into(),
            });
        };

        let table = self.table(&search.table)?;
        validate(table.schema(), search.filter.as_ref())?;
        let found = table.find(predicate(search.filter.as_ref()))?;

        let fields = &table.schema().fields;
        let rows = found
            .into_iter()
            .map(|record| {
                fields
                    .iter()
                    .map(|f| {
                        record
                            .get(&f.name)
                            .cloned()
                            .unwrap_or_else(|| f.data_type.default_value())
                    })
                    .collect()
            })
            .collect();

        Ok(QueryResult {
            columns: fields.iter().map(|f| f.name.clone()).collect(),
            rows,
        })
    }
}

/// Rejects a filter naming an undeclared field before any record is scanned.
fn validate(schema: &Schema, filter: Option<&Expr>) -> Result<()> {
    filter.map_or(Ok(()), |expr| expr.validate(schema))
}

/// Builds the record predicate for an optional filter. No filter matches
/// every record.
fn predicate(filter: Option<&Expr>) -> impl FnMut(&Schema, &Record) -> Result<bool> + '_ {
    move |schema, record| match filter {
        Some(expr) => expr.evaluate(schema, record),
        None => Ok(true),
    }
}

/// Converts a JSON payload into typed values against `schema`.
///
/// A `null` becomes `None`: on insert the field is treated as not supplied,
/// on update it is reset to its default.
fn coerce_payload(
    schema: &Schema,
    entries: Vec<(String, JsonValue)>,
) -> Result<Vec<(String, Option<Value>)>> {
    entries
        .into_iter()
        .map(|(name, json)| {
            let field = schema
                .field(&name)
                .ok_or_else(|| DbError::FieldNotFound(name.clone()))?;
            if json == JsonValue::Null {
                return Ok((field.key(), None));
            }
            let value = field
                .data_type
                .from_json(&json)
                .map_err(|details| DbError::invalid_value(&field.name, details))?;
            Ok((field.key(), Some(value)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;

    fn simple_fields() -> Vec<FieldDef> {
        vec![
            FieldDef::new("id", DataType::Int).required().unique(),
            FieldDef::new("name", DataType::Text),
        ]
    }

    fn users() -> Database {
        let mut db = Database::new();
        db.execute(
            r#"create User { "id": { "type": "int", "required": true, "unique": true },
                             "name": { "type": "string" },
                             "age": { "type": "int" } }"#,
        )
        .unwrap();
        db.execute(r#"insert User { "id": 1, "name": "Alice", "age": 30 }"#)
            .unwrap();
        db.execute(r#"insert User { "id": 2, "name": "Bob", "age": 17 }"#)
            .unwrap();
        db.execute(r#"insert User { "id": 3, "name": "Carol", "age": 45 }"#)
            .unwrap();
        db
    }

    fn ids(db: &Database, line: &str) -> Vec<i64> {
        db.query(line)
            .unwrap()
            .rows
            .iter()
            .map(|row| row[0].as_int().unwrap())
            .collect()
    }

    #[test]
    fn test_create_and_get_table() {
        let mut db = Database::new();

        assert!(db.create_table("Users", simple_fields()).is_ok());
        assert!(db.get_table("users").is_some());
        assert!(db.get_table(" USERS ").is_some());
        assert_eq!(db.get_table("users").unwrap().name, "Users");
    }

    #[test]
    fn test_duplicate_table_error() {
        let mut db = Database::new();

        db.create_table("users", simple_fields()).unwrap();
        let err = db.create_table("Users", simple_fields()).unwrap_err();

        assert_eq!(err, DbError::TypeAlreadyExists("Users".into()));
    }

    #[test]
    fn test_failed_create_leaves_nothing() {
        let mut db = Database::new();
        let err = db
            .execute(r#"create T { "a": { "type": "int" }, "A": { "type": "bool" } }"#)
            .unwrap_err();

        assert_eq!(err, DbError::DuplicateField("A".into()));
        assert!(db.get_table("t").is_none());
        assert!(db.create_table("T", Vec::new()).is_err());
        assert!(db.list_tables().is_empty());
    }

    #[test]
    fn test_list_tables() {
        let mut db = Database::new();

        db.create_table("users", simple_fields()).unwrap();
        db.create_table("Posts", simple_fields()).unwrap();

        let mut tables = db.list_tables();
        tables.sort();

        assert_eq!(tables, vec!["Posts", "users"]);
    }

    #[test]
    fn test_get_table_mut() {
        let mut db = Database::new();
        db.create_table("users", simple_fields()).unwrap();

        {
            let table = db.get_table_mut("USERS").unwrap();
            let mut values = HashMap::new();
            values.insert("id".to_string(), Value::Int(1));
            table.insert(values).unwrap();
        }

        let table = db.get_table("users").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records()[0].get("name"), Some(&Value::Text("".into())));
    }

    #[test]
    fn test_result_messages() {
        let mut db = Database::new();
        assert_eq!(
            db.execute(r#"create Item { sku: { type: "string", unique: true } }"#)
                .unwrap(),
            "Type 'Item' created (1 fields)."
        );
        assert_eq!(
            db.execute(r#"insert item { "sku": "a-1" }"#).unwrap(),
            "Instance inserted into 'Item'."
        );
        assert_eq!(
            db.execute(r#"update Item { "sku": "b-2" }"#).unwrap(),
            "1 instances updated."
        );
        assert_eq!(db.execute("search Item (sku = \"zzz\")").unwrap(), "No results found.");

        let out = db.execute("search Item").unwrap();
        assert_eq!(
            out,
            "Search results (1):\n| sku        | \n|------------|\n| b-2        |"
        );
    }

    #[test]
    fn test_query_with_filter() {
        let db = users();

        assert_eq!(ids(&db, "search User"), vec![1, 2, 3]);
        assert_eq!(ids(&db, "search User (age >= 18)"), vec![1, 3]);
        assert_eq!(ids(&db, "search User (age > 18 AND name != \"Alice\")"), vec![3]);
        assert_eq!(ids(&db, "search user (18 > AGE)"), vec![2]);
        assert!(ids(&db, "search User (id = 9)").is_empty());
    }

    #[test]
    fn test_query_rejects_other_commands() {
        let db = users();
        assert!(matches!(
            db.query("delete User"),
            Err(DbError::InvalidSyntax { .. })
        ));
        assert_eq!(
            db.query("search Nope").unwrap_err(),
            DbError::TypeNotFound("Nope".into())
        );
    }

    #[test]
    fn test_insert_errors_leave_store_unchanged() {
        let mut db = users();

        assert_eq!(
            db.execute(r#"insert User { "id": 1 }"#).unwrap_err(),
            DbError::UniqueViolation("id".into())
        );
        assert_eq!(
            db.execute(r#"insert User { "name": "X" }"#).unwrap_err(),
            DbError::MissingRequiredField("id".into())
        );
        assert_eq!(
            db.execute(r#"insert User { "id": null }"#).unwrap_err(),
            DbError::MissingRequiredField("id".into())
        );
        assert_eq!(
            db.execute(r#"insert User { "id": 9, "email": "x" }"#)
                .unwrap_err(),
            DbError::FieldNotFound("email".into())
        );
        assert!(matches!(
            db.execute(r#"insert User { "id": "9" }"#),
            Err(DbError::InvalidValue { .. })
        ));
        assert!(matches!(
            db.execute(r#"insert User { "id": 1.5 }"#),
            Err(DbError::InvalidValue { .. })
        ));

        assert_eq!(db.get_table("user").unwrap().len(), 3);
    }

    #[test]
    fn test_insert_defaults_and_null() {
        let mut db = users();
        db.execute(r#"insert User { "id": 4, "name": null }"#).unwrap();

        let result = db.query("search User (id = 4)").unwrap();
        assert_eq!(
            result.rows,
            vec![vec![Value::Int(4), Value::Text("".into()), Value::Int(0)]]
        );
    }

    #[test]
    fn test_update_with_filter() {
        let mut db = users();

        assert_eq!(
            db.execute(r#"update User (age < 18) { "age": 18, "name": "Robert" }"#)
                .unwrap(),
            "1 instances updated."
        );
        let result = db.query("search User (id = 2)").unwrap();
        assert_eq!(
            result.rows[0],
            vec![Value::Int(2), Value::Text("Robert".into()), Value::Int(18)]
        );
    }

    #[test]
    fn test_update_no_rows_matched() {
        let mut db = users();
        assert_eq!(
            db.execute(r#"update User (id = 42) { "age": 1 }"#).unwrap(),
            "0 instances updated."
        );
    }

    #[test]
    fn test_update_errors() {
        let mut db = users();

        assert_eq!(
            db.execute(r#"update User (id = 1) { "id": 2 }"#).unwrap_err(),
            DbError::UniqueViolation("id".into())
        );
        assert_eq!(
            db.execute(r#"update User { "id": 7 }"#).unwrap_err(),
            DbError::UniqueViolation("id".into())
        );
        assert_eq!(
            db.execute(r#"update User (id = 1) { "id": null }"#)
                .unwrap_err(),
            DbError::MissingRequiredField("id".into())
        );
        assert_eq!(
            db.execute(r#"update User (id = 1) { "nope": 1 }"#)
                .unwrap_err(),
            DbError::FieldNotFound("nope".into())
        );
        assert!(matches!(
            db.execute(r#"update User (id = 1) { "age": "old" }"#),
            Err(DbError::InvalidValue { .. })
        ));
        assert!(matches!(
            db.execute(r#"update User (nope = 1) { "age": 1 }"#),
            Err(DbError::InvalidFilter(_))
        ));

        assert_eq!(ids(&db, "search User"), vec![1, 2, 3]);
        assert_eq!(ids(&db, "search User (age = 30)"), vec![1]);
    }

    #[test]
    fn test_update_same_unique_value_in_place() {
        let mut db = users();
        assert_eq!(
            db.execute(r#"update User (id = 1) { "id": 1, "age": 31 }"#)
                .unwrap(),
            "1 instances updated."
        );
        assert_eq!(ids(&db, "search User (age = 31)"), vec![1]);
        assert!(db.get_table("User").unwrap().indexes_consistent());
    }

    #[test]
    fn test_delete_specific_and_all() {
        let mut db = users();

        assert_eq!(
            db.execute("delete User (name = \"Bob\")").unwrap(),
            "1 instances deleted."
        );
        assert_eq!(ids(&db, "search User"), vec![1, 3]);

        // freed unique value can be reused
        db.execute(r#"insert User { "id": 2 }"#).unwrap();

        assert_eq!(db.execute("delete User").unwrap(), "3 instances deleted.");
        assert_eq!(db.execute("search User").unwrap(), "No results found.");
    }

    #[test]
    fn test_unknown_filter_field_on_empty_type() {
        let mut db = Database::new();
        db.execute(r#"create E { id: { type: "int" } }"#).unwrap();

        let unknown = DbError::InvalidFilter("unknown field in filter: ghost".into());
        assert_eq!(db.execute("search E (ghost = 1)").unwrap_err(), unknown);
        assert_eq!(db.execute("delete E (ghost = 1)").unwrap_err(), unknown);
        assert_eq!(
            db.execute(r#"update E (ghost = 1) { "id": 1 }"#).unwrap_err(),
            unknown
        );
        assert_eq!(db.query("search E (id = 1 OR ghost = 1)").unwrap_err(), unknown);
        assert_eq!(db.execute("search E (id = 1)").unwrap(), "No results found.");
    }

    #[test]
    fn test_unknown_type() {
        let mut db = Database::new();
        for line in [
            "insert Ghost {\"a\": 1}",
            "update Ghost {\"a\": 1}",
            "delete Ghost",
            "search Ghost",
        ] {
            assert_eq!(
                db.execute(line).unwrap_err(),
                DbError::TypeNotFound("Ghost".into()),
                "line: {line}"
            );
        }
    }
}
