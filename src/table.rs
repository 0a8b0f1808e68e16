//! A small column-typed table, laid out like Commons tabular data (`.tab`) pages.

use std::io::Write;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub r#type: String,
}

impl Field {
    pub fn number(name: &str) -> Self {
        Self {
            name: name.to_string(),
            r#type: "number".to_string(),
        }
    }

    pub fn string(name: &str) -> Self {
        Self {
            name: name.to_string(),
            r#type: "string".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl From<Vec<Field>> for Schema {
    fn from(fields: Vec<Field>) -> Self {
        Schema { fields }
    }
}

impl Schema {
    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub schema: Schema,
    pub data: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            schema: Schema::from(fields),
            data: vec![],
        }
    }

    pub fn columns(&self) -> Vec<&str> {
        self.schema.fields.iter().map(|f| &*f.name).collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        let expected = self.schema.fields.len();
        if row.len() != expected {
            return Err(Error::RowArity {
                expected,
                actual: row.len(),
            });
        }
        self.data.push(row);
        Ok(())
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.schema.fields.iter().position(|f| f.name == name)?;
        Some(self.data.iter().map(|row| &row[idx]).collect())
    }

    /// Stacks tables with identical schemas, rows renumbered from zero.
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Result<Option<Table>> {
        let mut out: Option<Table> = None;
        for table in tables {
            match &mut out {
                None => out = Some(table),
                Some(acc) => {
                    if acc.schema != table.schema {
                        return Err(Error::SchemaMismatch {
                            left: acc.schema.names(),
                            right: table.schema.names(),
                        });
                    }
                    acc.data.extend(table.data);
                }
            }
        }
        Ok(out)
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(self.columns())?;
        for row in &self.data {
            wtr.write_record(row.iter().map(cell_text))?;
        }
        wtr.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
