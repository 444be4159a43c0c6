//! SQL text for the Postgres table service
//!
//! Identifiers are validated and quoted here; values always travel as bind parameters.
//! Rows come back as `to_jsonb(rec)` so every backend returns the same JSON shape.

use crate::store::{error::Result, query::Filter, validate_identifier};

/// Quote a validated identifier
pub fn quote(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name))
}

/// Build `WHERE rec."a"::text = $n AND ...`, numbering parameters from `first_param`
fn where_clause(filters: &[Filter], first_param: usize) -> Result<String> {
    if filters.is_empty() {
        return Ok(String::new());
    }

    let predicates = filters
        .iter()
        .enumerate()
        .map(|(i, f)| Ok(format!("rec.{}::text = ${}", quote(&f.column)?, first_param + i)))
        .collect::<Result<Vec<_>>>()?;

    Ok(format!(" WHERE {}", predicates.join(" AND ")))
}

pub fn select(table: &str, filters: &[Filter], order_by: Option<&str>) -> Result<String> {
    let mut sql = format!(
        "SELECT to_jsonb(rec) FROM {} AS rec{}",
        quote(table)?,
        where_clause(filters, 1)?
    );
    if let Some(column) = order_by {
        sql.push_str(&format!(" ORDER BY rec.{} ASC", quote(column)?));
    }
    Ok(sql)
}

/// Insert only the supplied columns so column defaults still apply to the rest
pub fn insert(table: &str, columns: &[&str]) -> Result<String> {
    let table = quote(table)?;
    if columns.is_empty() {
        return Ok(format!(
            "INSERT INTO {} AS rec DEFAULT VALUES RETURNING to_jsonb(rec)",
            table
        ));
    }

    let quoted = columns.iter().map(|c| quote(c)).collect::<Result<Vec<_>>>()?;
    let picked = quoted
        .iter()
        .map(|c| format!("src.{}", c))
        .collect::<Vec<_>>();

    Ok(format!(
        "INSERT INTO {table} AS rec ({cols}) SELECT {picked} FROM jsonb_populate_record(NULL::{table}, $1) AS src RETURNING to_jsonb(rec)",
        table = table,
        cols = quoted.join(", "),
        picked = picked.join(", "),
    ))
}

/// `$1` carries the changes as jsonb; filters start at `$2`
pub fn update(table: &str, columns: &[&str], filters: &[Filter]) -> Result<String> {
    let table = quote(table)?;
    let assignments = columns
        .iter()
        .map(|c| {
            let q = quote(c)?;
            Ok(format!("{} = src.{}", q, q))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(format!(
        "UPDATE {table} AS rec SET {set} FROM jsonb_populate_record(NULL::{table}, $1) AS src{filter} RETURNING to_jsonb(rec)",
        table = table,
        set = assignments.join(", "),
        filter = where_clause(filters, 2)?,
    ))
}

pub fn delete(table: &str, filters: &[Filter]) -> Result<String> {
    Ok(format!(
        "DELETE FROM {} AS rec{}",
        quote(table)?,
        where_clause(filters, 1)?
    ))
}
