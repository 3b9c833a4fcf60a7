//! Line commands of the interactive session.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Select(PathBuf),
    Sample(String),
    Enhance,
    Download,
    Cancel,
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  select <path>   choose an audio file
  sample <name>   choose a bundled sample
  enhance         start enhancing the selection
  download        save the enhanced audio
  cancel          abandon the running job
  status          show the current state
  quit            leave";

pub fn parse_line(line: &str) -> Result<Option<ReplCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "select" | "open" => ReplCommand::Select(PathBuf::from(argument(word, rest)?)),
        "sample" => ReplCommand::Sample(argument(word, rest)?.to_string()),
        "enhance" | "start" => ReplCommand::Enhance,
        "download" | "save" => ReplCommand::Download,
        "cancel" => ReplCommand::Cancel,
        "status" => ReplCommand::Status,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        other => return Err(format!("unknown command {other:?}; type help")),
    };
    Ok(Some(command))
}

/// The rest of the line, with one layer of matching quotes removed so
/// paths with spaces can be given either way.
fn argument<'a>(word: &str, rest: &'a str) -> Result<&'a str, String> {
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|q| rest.strip_prefix(*q)?.strip_suffix(*q))
        .unwrap_or(rest);
    if unquoted.is_empty() {
        Err(format!("{word} needs an argument"))
    } else {
        Ok(unquoted)
    }
}
