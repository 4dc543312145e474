use std::path::PathBuf;

pub const HELP: &str = "\
Commands:
  /files           list active documents
  /add <path>      upload another document
  /remove <name>   drop a document from the session
  /reset           clear the session and start over
  /help            show this help
  /quit            leave
Anything else is sent as a question.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Ask(String),
    Files,
    Add(PathBuf),
    Remove(String),
    Reset,
    Help,
    Quit,
    Empty,
    /// Slash command that was not recognised or is missing its argument
    Invalid(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        if !line.starts_with('/') {
            return Self::Ask(line.to_string());
        }

        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (line, ""),
        };

        match (name, arg.is_empty()) {
            ("/files", _) => Self::Files,
            ("/reset", _) => Self::Reset,
            ("/help", _) => Self::Help,
            ("/quit" | "/exit", _) => Self::Quit,
            ("/add", false) => Self::Add(PathBuf::from(arg)),
            ("/remove", false) => Self::Remove(arg.to_string()),
            ("/add" | "/remove", true) => Self::Invalid(format!("{} needs an argument", name)),
            _ => Self::Invalid(format!("Unknown command {}", name)),
        }
    }
}
