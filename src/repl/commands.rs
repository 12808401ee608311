//! Slash command parsing for the REPL.

/// Help text displayed for the /help command.
pub const HELP_TEXT: &str = r#"Ask a question about your database in plain language, or use a command:
  /schema                         - Show the database schema
  /history                        - Reprint the conversation
  /connect <connection-string>    - Connect to another database
                                    (mysql://..., postgres://..., sqlite:path)
  /key <api-key>                  - Set the LLM API key for this session
  /help                           - Show this help message
  /quit, /exit                    - Exit"#;

/// A parsed slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Schema,
    History,
    Connect(String),
    Key(String),
    Quit,
    /// A known command used wrongly, with a usage message.
    Usage(&'static str),
    /// Anything else starting with a slash.
    Unknown(String),
}

/// Parses `input` as a slash command. Returns `None` for chat messages.
pub fn parse_command(input: &str) -> Option<Command> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    let command = match name.to_lowercase().as_str() {
        "help" | "?" => Command::Help,
        "schema" => Command::Schema,
        "history" => Command::History,
        "quit" | "exit" | "q" => Command::Quit,
        "connect" if args.is_empty() => Command::Usage("Usage: /connect <connection-string>"),
        "connect" => Command::Connect(args.to_string()),
        "key" if args.is_empty() => Command::Usage("Usage: /key <api-key>"),
        "key" => Command::Key(args.to_string()),
        _ => Command::Unknown(name.to_string()),
    };
    Some(command)
}
