//! Chat command parsing.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// `/add <url>`; `None` when the argument is missing.
    Add(Option<String>),
    List,
    /// `/remove <url>`; `None` when the argument is missing.
    Remove(Option<String>),
    Unknown(String),
}

impl Command {
    /// Parse a message text. Returns `None` for text that is not a command.
    /// A `@botname` suffix on the command word is ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;

        let mut parts = rest.split_whitespace();
        let word = parts.next().unwrap_or_default();
        let name = word.split('@').next().unwrap_or_default().to_lowercase();
        let arg = parts.next().map(str::to_string);

        Some(match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "add" => Command::Add(arg),
            "list" => Command::List,
            "remove" => Command::Remove(arg),
            _ => Command::Unknown(name),
        })
    }
}
