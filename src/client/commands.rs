//! Line grammar of the interactive client.

/// Help text, one line per command.
pub const HELP: &[(&str, &str)] = &[
    ("/debug", "Toggle debug mode"),
    ("/refresh", "Refresh server capabilities"),
    ("/resources", "List available resources"),
    ("/resource <uri>", "Read a specific resource"),
    ("/prompts", "List available prompts"),
    (
        "/prompt <name> <text>",
        "Use a specific prompt with a string as the argument",
    ),
    ("/tools", "List available tools"),
    ("/help", "Show this help"),
    ("/quit", "Exit the client"),
];

/// One parsed input line.
///
/// The command word is the first whitespace-separated token, compared
/// case-insensitively. Arguments keep their case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/quit`
    Quit,
    /// `/debug`
    Debug,
    /// `/refresh`
    Refresh,
    /// `/resources`
    Resources,
    /// `/resource <uri>`
    Resource(String),
    /// `/prompts`
    Prompts,
    /// `/prompt <name> [text]`
    Prompt {
        /// Prompt name.
        name: String,
        /// Free text bound to the prompt's first argument.
        text: Option<String>,
    },
    /// `/tools`
    Tools,
    /// `/help`
    Help,
    /// Anything that is not a command.
    Query(String),
    /// A blank line.
    Empty,
    /// A command missing its required argument.
    Invalid(&'static str),
}

impl Command {
    /// Parses one input line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_lowercase().as_str() {
            "/quit" => Self::Quit,
            "/debug" => Self::Debug,
            "/refresh" => Self::Refresh,
            "/resources" => Self::Resources,
            "/resource" if rest.is_empty() => Self::Invalid("Usage: /resource <uri>"),
            "/resource" => Self::Resource(rest.to_string()),
            "/prompts" => Self::Prompts,
            "/prompt" if rest.is_empty() => Self::Invalid("Error: Prompt name required"),
            "/prompt" => {
                let (name, text) = match rest.split_once(char::is_whitespace) {
                    Some((name, text)) => (name, Some(text.trim().to_string())),
                    None => (rest, None),
                };
                Self::Prompt {
                    name: name.to_string(),
                    text,
                }
            }
            "/tools" => Self::Tools,
            "/help" => Self::Help,
            _ => Self::Query(line.to_string()),
        }
    }
}
