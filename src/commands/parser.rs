//! Query parsing.
//!
//! Recognizes `install [<fragment>]`, `remove [<fragment>]` and `list`
//! anywhere a keyword starts the query or follows whitespace. Anything else
//! parses as [`Command::Help`].

use std::sync::OnceLock;

use regex::Regex;

/// The command a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Browse or search installable packages.
    Install,
    /// Pick an installed package to remove.
    Remove,
    /// Show installed packages.
    List,
    /// Unrecognized query; suggest commands instead.
    Help,
}

impl Command {
    /// The keyword users type for this command.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Command::Install => Some("install"),
            Command::Remove => Some("remove"),
            Command::List => Some("list"),
            Command::Help => None,
        }
    }

    fn from_keyword(keyword: &str) -> Self {
        match keyword.to_ascii_lowercase().as_str() {
            "install" => Command::Install,
            "remove" => Command::Remove,
            "list" => Command::List,
            _ => Command::Help,
        }
    }
}

/// A parsed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// The requested command.
    pub command: Command,
    /// The first token after the keyword, if any.
    pub argument: Option<String>,
}

impl ParsedCommand {
    fn help() -> Self {
        Self {
            command: Command::Help,
            argument: None,
        }
    }
}

fn command_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:^|\s)(install|remove|list)\b(?:\s+(\S+))?")
            .expect("command pattern is valid")
    })
}

/// Parse a raw query.
///
/// Matching is case-insensitive. Malformed queries are not errors; they
/// parse as [`Command::Help`].
pub fn parse(query: &str) -> ParsedCommand {
    let Some(captures) = command_regex().captures(query) else {
        return ParsedCommand::help();
    };

    let command = captures
        .get(1)
        .map(|m| Command::from_keyword(m.as_str()))
        .unwrap_or(Command::Help);
    let argument = captures.get(2).map(|m| m.as_str().to_string());

    ParsedCommand { command, argument }
}
