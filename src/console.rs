//! Line commands read from stdin by the binary

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Toggle,
    Pause,
    Resume,
    Stop,
    Preset(String),
    Regions,
    Quit,
    Help,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("'preset' needs a preset name")]
    MissingPreset,
    #[error("unknown command '{0}', type 'help'")]
    Unknown(String),
}

pub const HELP: &str = "commands: toggle | pause | resume | stop | preset <name> | regions | quit";

impl ControlCommand {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "toggle" | "t" => Ok(ControlCommand::Toggle),
            "pause" | "p" => Ok(ControlCommand::Pause),
            "resume" | "r" => Ok(ControlCommand::Resume),
            "stop" => Ok(ControlCommand::Stop),
            "preset" if rest.is_empty() => Err(CommandError::MissingPreset),
            // preset names may contain spaces
            "preset" => Ok(ControlCommand::Preset(rest.to_string())),
            "regions" => Ok(ControlCommand::Regions),
            "quit" | "exit" | "q" => Ok(ControlCommand::Quit),
            "help" | "?" => Ok(ControlCommand::Help),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(ControlCommand::parse("toggle"), Ok(ControlCommand::Toggle));
        assert_eq!(ControlCommand::parse("  PAUSE \n"), Ok(ControlCommand::Pause));
        assert_eq!(ControlCommand::parse("r"), Ok(ControlCommand::Resume));
        assert_eq!(ControlCommand::parse("quit"), Ok(ControlCommand::Quit));
        assert_eq!(ControlCommand::parse("regions"), Ok(ControlCommand::Regions));
    }

    #[test]
    fn test_parse_preset() {
        assert_eq!(
            ControlCommand::parse("preset 冰钓重杆"),
            Ok(ControlCommand::Preset("冰钓重杆".into()))
        );
        assert_eq!(
            ControlCommand::parse("preset   my rod  "),
            Ok(ControlCommand::Preset("my rod".into()))
        );
        assert_eq!(ControlCommand::parse("preset"), Err(CommandError::MissingPreset));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(ControlCommand::parse("   "), Err(CommandError::Empty));
        assert_eq!(
            ControlCommand::parse("cast now"),
            Err(CommandError::Unknown("cast".into()))
        );
    }
}
