//! Line commands accepted on stdin while monitoring.

use trickle_core::ControllerEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Label(String),
    Notes(String),
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Unknown command: {0} (expected start, stop, label, notes or quit)")]
    Unknown(String),

    #[error("`{0}` needs some text, e.g. `{0} USB-C 30W`")]
    MissingText(&'static str),
}

impl Command {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, InputError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_lowercase().as_str() {
            "start" => Command::Start,
            "stop" => Command::Stop,
            "quit" | "exit" | "q" => Command::Quit,
            "label" if rest.is_empty() => return Err(InputError::MissingText("label")),
            "label" => Command::Label(rest.to_string()),
            "notes" | "note" if rest.is_empty() => return Err(InputError::MissingText("notes")),
            "notes" | "note" => Command::Notes(rest.to_string()),
            _ => return Err(InputError::Unknown(word.to_string())),
        };

        Ok(Some(command))
    }

    /// The controller event for this command, `None` for `Quit`.
    pub fn into_event(self) -> Option<ControllerEvent> {
        match self {
            Command::Start => Some(ControllerEvent::StartSession),
            Command::Stop => Some(ControllerEvent::StopSession),
            Command::Label(text) => Some(ControllerEvent::SetChargerLabel(text)),
            Command::Notes(text) => Some(ControllerEvent::SetNotes(text)),
            Command::Quit => None,
        }
    }
}
