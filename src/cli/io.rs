//! JSON I/O handling for CLI
//!
//! - Input: JSON arguments, inline or `-` for stdin
//! - Output: one pretty-printed JSON value on stdout
//! - UTF-8 only

use std::io::{self, Read, Write};

use serde::Serialize;
use serde_json::Value;

use crate::document::Document;

use super::errors::{CliError, CliResult};

const STDIN_ARG: &str = "-";

/// Resolve an argument, reading stdin for `-`
pub fn read_arg(raw: &str) -> CliResult<String> {
    if raw != STDIN_ARG {
        return Ok(raw.to_string());
    }
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    if input.trim().is_empty() {
        return Err(CliError::invalid_argument("empty input on stdin"));
    }
    Ok(input)
}

/// Parse a JSON object argument
pub fn parse_document(raw: &str) -> CliResult<Document> {
    match serde_json::from_str::<Value>(&read_arg(raw)?)? {
        Value::Object(document) => Ok(document),
        other => Err(CliError::invalid_argument(format!(
            "expected a JSON object, got {}",
            kind(&other)
        ))),
    }
}

/// Parse an optional JSON object argument
pub fn parse_optional(raw: Option<&str>) -> CliResult<Option<Document>> {
    raw.map(parse_document).transpose()
}

/// Parse a JSON array of objects (documents or pipeline stages)
pub fn parse_documents(raw: &str) -> CliResult<Vec<Document>> {
    let Value::Array(items) = serde_json::from_str::<Value>(&read_arg(raw)?)? else {
        return Err(CliError::invalid_argument("expected a JSON array"));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(document) => Ok(document),
            other => Err(CliError::invalid_argument(format!(
                "element {} is {}, expected an object",
                index,
                kind(&other)
            ))),
        })
        .collect()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Write a result to stdout
pub fn write_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
