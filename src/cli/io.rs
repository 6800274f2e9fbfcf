//! JSON I/O handling for CLI
//!
//! - Input: a single JSON object via stdin
//! - Output: a single JSON object via stdout
//! - UTF-8 only

use std::io::{self, Read, Write};

use serde_json::Value;

use crate::item::Item;

use super::errors::{CliError, CliResult};

/// Parses request text into an item. Blank input is an empty item.
pub fn parse_item(input: &str) -> CliResult<Item> {
    if input.trim().is_empty() {
        return Ok(Item::new());
    }

    match serde_json::from_str(input)? {
        Value::Object(map) => Ok(map),
        other => Err(CliError::invalid_request(format!(
            "Expected a JSON object, got {}",
            crate::schema::json_type_name(&other)
        ))),
    }
}

/// Read a JSON object from stdin
pub fn read_item() -> CliResult<Item> {
    let mut input = String::new();
    io::stdin().lock().read_to_string(&mut input)?;
    parse_item(&input)
}

fn write_line(out: &mut impl Write, response: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, response)
        .map_err(|e| CliError::io_error(format!("JSON error: {}", e)))?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Success envelope
pub fn ok_response(data: Value) -> Value {
    serde_json::json!({
        "status": "ok",
        "data": data
    })
}

/// Error envelope
pub fn error_response(code: &str, message: &str) -> Value {
    serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    })
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_line(&mut io::stdout().lock(), &ok_response(data))
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    write_line(&mut io::stdout().lock(), &error_response(code, message))
}
