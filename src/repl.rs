use std::io::{self, BufRead, Write};

use log::debug;

use crate::command::MetaCommand;
use crate::statement::{ExecuteError, Statement};
use crate::table::Table;

pub const PROMPT: &str = "db > ";

fn print_prompt<W: Write>(output: &mut W) -> io::Result<()> {
    write!(output, "{PROMPT}")?;
    output.flush()
}

/// Reads commands from `input` until `.exit` or end of input, writing the
/// transcript to `output`. Only I/O failures on the two streams end it early;
/// the caller still owns `table` and is responsible for closing it.
pub fn run<R, W>(table: &mut Table, input: R, mut output: W) -> io::Result<()>
where
    R: BufRead,
    W: Write,
{
    let mut lines = input.lines();

    loop {
        print_prompt(&mut output)?;
        let Some(line) = lines.next() else {
            debug!("end of input");
            break;
        };
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(meta) = MetaCommand::parse(line) {
            match meta {
                MetaCommand::Exit => break,
                MetaCommand::Unrecognized => {
                    writeln!(output, "Unrecognized command '{line}'.")?;
                }
            }
            continue;
        }

        let statement = match Statement::prepare(line) {
            Ok(statement) => statement,
            Err(e) => {
                writeln!(output, "{e}")?;
                continue;
            }
        };

        match statement.execute(table, &mut output) {
            Ok(()) => writeln!(output, "Executed.")?,
            Err(ExecuteError::Output(e)) => return Err(e),
            Err(e) => writeln!(output, "Error: {e}")?,
        }
    }

    Ok(())
}
