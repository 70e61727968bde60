pub mod ast;
pub mod command;
pub mod data_type;
pub mod database;
pub mod error;
pub mod filter;
pub mod json;
pub mod parser;
pub mod record;
pub mod table;
pub mod tokenizer;
pub mod value;

pub use data_type::DataType;
pub use database::{Database, QueryResult};
pub use error::{DbError, ErrorKind, Result};
pub use record::{Record, RecordId};
pub use table::{FieldDef, Schema, Table};
pub use value::Value;
