use std::io::{self, Write};

use thiserror::Error;

use crate::error::Error;
use crate::row::{Row, RowError};
use crate::table::Table;
use crate::{EMAIL_SIZE, USERNAME_SIZE};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PrepareError {
    #[error("Syntax error. Could not parse statement.")]
    SyntaxError,

    #[error("String is too long.")]
    StringTooLong,

    #[error("ID must be positive.")]
    NegativeId,

    #[error("ID is too large.")]
    IdTooLarge,

    #[error("Unrecognized keyword at start of '{0}'.")]
    Unrecognized(String),
}

impl From<RowError> for PrepareError {
    fn from(e: RowError) -> Self {
        match e {
            RowError::StringTooLong { .. } => PrepareError::StringTooLong,
            RowError::IdTooLarge(_) => PrepareError::IdTooLarge,
        }
    }
}

#[derive(Error, Debug)]
pub enum ExecuteError {
    #[error("Table full.")]
    TableFull,

    #[error("Failed to read row: {0}")]
    ReadFailure(#[source] Error),

    #[error("{0}")]
    Storage(#[source] Error),

    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl From<Error> for ExecuteError {
    fn from(e: Error) -> Self {
        match e {
            Error::TableFull => ExecuteError::TableFull,
            e => ExecuteError::Storage(e),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Statement {
    Insert(Row),
    Select,
}

impl Statement {
    /// Parses one input line. Validation happens here, before storage is touched.
    pub fn prepare(input: &str) -> Result<Statement, PrepareError> {
        let mut tokens = input.split_whitespace();
        match tokens.next() {
            Some("insert") => prepare_insert(tokens.collect()),
            Some("select") => match tokens.next() {
                None => Ok(Statement::Select),
                Some(_) => Err(PrepareError::SyntaxError),
            },
            _ => Err(PrepareError::Unrecognized(input.to_string())),
        }
    }

    /// Runs the statement. Rows selected are written to `out`, one per line.
    pub fn execute<W: Write>(&self, table: &mut Table, out: &mut W) -> Result<(), ExecuteError> {
        match self {
            Statement::Insert(row) => execute_insert(table, row),
            Statement::Select => execute_select(table, out),
        }
    }
}

fn prepare_insert(args: Vec<&str>) -> Result<Statement, PrepareError> {
    let [id, username, email] = args.as_slice() else {
        return Err(PrepareError::SyntaxError);
    };

    let id: i64 = id.parse().map_err(|_| PrepareError::SyntaxError)?;
    if username.len() > USERNAME_SIZE || email.len() > EMAIL_SIZE {
        return Err(PrepareError::StringTooLong);
    }
    if id < 0 {
        return Err(PrepareError::NegativeId);
    }
    let id = u32::try_from(id).map_err(|_| PrepareError::IdTooLarge)?;

    Ok(Statement::Insert(Row::new(id, username, email)?))
}

pub fn execute_insert(table: &mut Table, row: &Row) -> Result<(), ExecuteError> {
    table.insert(row)?;
    Ok(())
}

/// Emits every row in insertion order. Rows written before a read failure stay written.
pub fn execute_select<W: Write>(table: &mut Table, out: &mut W) -> Result<(), ExecuteError> {
    let mut cursor = table.cursor_at_start();
    while !cursor.end_of_table() {
        let slot = cursor.value().map_err(ExecuteError::ReadFailure)?;
        writeln!(out, "{}", Row::deserialize(slot))?;
        cursor.advance();
    }
    Ok(())
}
