use thiserror::Error;
use titrasim::core::models::apparatus::{ApparatusItem, UnknownItemError};
use titrasim::engine::titration::IncrementSize;

/// One line of input at the interactive bench prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchCommand {
    Start,
    Place(ApparatusItem),
    Add(IncrementSize),
    Stop,
    Reset,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown command '{0}'. Type 'help' for the list of commands.")]
    UnknownCommand(String),

    #[error("'{command}' needs an argument, e.g. '{example}'.")]
    MissingArgument {
        command: &'static str,
        example: &'static str,
    },

    #[error("'{command}' takes no arguments (got '{argument}').")]
    UnexpectedArgument {
        command: &'static str,
        argument: String,
    },

    #[error(transparent)]
    UnknownItem(#[from] UnknownItemError),

    #[error("Unknown increment '{0}'. Expected 'coarse' or 'fine'.")]
    UnknownIncrement(String),
}

pub const HELP_TEXT: &str = "\
Commands:
  start                  begin the experiment
  place <item>           put an item on the bench (stand, burette, beaker,
                         ph_meter, glycine, naoh)
  add [coarse|fine]      add titrant (aliases: c, f); default coarse
  stop                   end the titration, or clear the bench when idle
  reset                  clear the bench
  status                 show the current step and readings
  help                   show this text
  quit                   leave the bench";

/// Parses a prompt line. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<BenchCommand>, ParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "start" => no_argument("start", rest, BenchCommand::Start)?,
        "place" | "put" => {
            if rest.is_empty() {
                return Err(ParseError::MissingArgument {
                    command: "place",
                    example: "place stand",
                });
            }
            BenchCommand::Place(rest.parse()?)
        }
        "add" | "a" => BenchCommand::Add(parse_increment(rest)?),
        "stop" => no_argument("stop", rest, BenchCommand::Stop)?,
        "reset" => no_argument("reset", rest, BenchCommand::Reset)?,
        "status" | "s" => no_argument("status", rest, BenchCommand::Status)?,
        "help" | "h" | "?" => BenchCommand::Help,
        "quit" | "exit" | "q" => BenchCommand::Quit,
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}

fn no_argument(
    command: &'static str,
    rest: &str,
    parsed: BenchCommand,
) -> Result<BenchCommand, ParseError> {
    if rest.is_empty() {
        Ok(parsed)
    } else {
        Err(ParseError::UnexpectedArgument {
            command,
            argument: rest.to_string(),
        })
    }
}

fn parse_increment(arg: &str) -> Result<IncrementSize, ParseError> {
    match arg.to_ascii_lowercase().as_str() {
        "" | "coarse" | "c" => Ok(IncrementSize::Coarse),
        "fine" | "f" => Ok(IncrementSize::Fine),
        other => Err(ParseError::UnknownIncrement(other.to_string())),
    }
}
