use std::collections::HashMap;

use schemadb::*;

fn main() -> Result<()> {
    println!("Schema Store Demo\n");

    // Create DB
    let mut db = Database::new();

    // Define type "Person" through the library API
    db.create_table(
        "Person",
        vec![
            FieldDef::new("id", DataType::Int).required().unique(),
            FieldDef::new("name", DataType::Text).required(),
            FieldDef::new("age", DataType::Int),
            FieldDef::new("skills", DataType::TextList),
        ],
    )?;
    println!("Created type 'Person'");

    // Insert data
    println!("Inserting data...");
    {
        let table = db
            .get_table_mut("person")
            .ok_or_else(|| DbError::TypeNotFound("person".into()))?;

        let mut alice = HashMap::new();
        alice.insert("id".to_string(), Value::Int(1));
        alice.insert("name".to_string(), Value::Text("Alice".into()));
        alice.insert("age".to_string(), Value::Int(30));
        alice.insert(
            "skills".to_string(),
            Value::TextList(vec!["Rust".into(), "SQL".into()]),
        );
        table.insert(alice)?;

        // Bob's age is left to its default
        let mut bob = HashMap::new();
        bob.insert("id".to_string(), Value::Int(2));
        bob.insert("name".to_string(), Value::Text("Bob".into()));
        table.insert(bob)?;
    }

    // The same through the command language
    println!("{}", db.execute(r#"insert Person { "id": 3, "name": "Charlie", "age": 25, "skills": ["Java"] }"#)?);
    println!("{}", db.execute(r#"update Person (name = "Bob") { "age": 41 }"#)?);

    // A duplicate id is rejected and nothing changes
    if let Err(e) = db.execute(r#"insert Person { "id": 1, "name": "Mallory" }"#) {
        println!("Rejected: {e} ({:?})", e.kind());
    }
    println!();

    // Read and print data
    println!("{}\n", db.execute("search person")?);
    println!("{}\n", db.execute(r#"search Person (skills include "Rust" OR age < 30)"#)?);

    let result = db.query("search Person (age >= 30)")?;
    println!("{:<5} {:<10} {:<5}", "ID", "NAME", "AGE");
    println!("{}", "-".repeat(25));
    for row in &result.rows {
        let cells: Vec<String> = row.iter().map(Value::to_string).collect();
        println!("{:<5} {:<10} {:<5}", cells[0], cells[1], cells[2]);
    }
    println!();

    println!("{}", db.execute("delete Person (id > 1)")?);

    // List types
    println!("Types in database:");
    for table_name in db.list_tables() {
        println!("  - {}", table_name);
    }

    Ok(())
}
