// Non-SQL statements like .exit are called “meta-commands”.
#[derive(Debug, PartialEq, Eq)]
pub enum MetaCommand {
    Exit,
    Unrecognized,
}

impl MetaCommand {
    /// Returns `None` when the input is not a meta-command at all.
    pub fn parse(input: &str) -> Option<MetaCommand> {
        match input {
            ".exit" => Some(MetaCommand::Exit),
            _ if input.starts_with('.') => Some(MetaCommand::Unrecognized),
            _ => None,
        }
    }
}
