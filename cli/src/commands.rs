//! Terminal command parsing.

use thiserror::Error;

use gostream_engine::Profile;
use gostream_ipc::{DashboardSection, EngineCommand, UnknownSection};

/// Help text for the dashboard prompt.
pub const DASHBOARD_HELP: &str = "\
Commands:
  live                  toggle the live session
  go | end              go live / end the session
  toggle <platform>     flip a destination (links it if disconnected)
  link <platform>       link a destination
  unlink <platform>     drop a destination's link
  title <text>          set the stream title
  suggest               ask for title and tag suggestions
  use <1-3>             apply a suggested title
  mood                  analyze the chat mood
  show <section>        dashboard | analytics | chat | settings
  status [json]         print the dashboard
  quit                  end the session and exit";

/// Help text for the sign-in prompt.
pub const SIGN_IN_HELP: &str = "\
Sign in:
  login <email> <password>
  register <name> <email> <password>
  demo                  use the demo account";

/// Parse failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error(transparent)]
    Section(#[from] UnknownSection),
}

/// One dashboard prompt line.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Forward to the engine.
    Command(EngineCommand),
    /// Print the latest snapshot, optionally as JSON.
    Status { json: bool },
    Help,
    Quit,
    Empty,
}

/// One sign-in prompt line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignIn {
    Login { email: String, password: String },
    Register(Profile),
    Demo,
    Help,
    Empty,
}

/// Parse a dashboard prompt line.
pub fn parse(line: &str) -> Result<Input, ParseError> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match word.to_ascii_lowercase().as_str() {
        "" => return Ok(Input::Empty),
        "help" | "?" => return Ok(Input::Help),
        "quit" | "exit" => return Ok(Input::Quit),
        "status" => {
            return Ok(Input::Status {
                json: rest.eq_ignore_ascii_case("json"),
            })
        }
        "snapshot" => EngineCommand::GetSnapshot,
        "live" => EngineCommand::ToggleLive,
        "go" => EngineCommand::GoLive,
        "end" => EngineCommand::EndLive,
        "toggle" => EngineCommand::ToggleDestination {
            id: platform(rest, "toggle <platform>")?,
        },
        "link" => EngineCommand::LinkDestination {
            id: platform(rest, "link <platform>")?,
        },
        "unlink" => EngineCommand::UnlinkDestination {
            id: platform(rest, "unlink <platform>")?,
        },
        "title" if !rest.is_empty() => EngineCommand::SetTitle(rest.to_string()),
        "title" => return Err(ParseError::Usage("title <text>")),
        "suggest" => EngineCommand::RequestSuggestions,
        "use" => match rest.parse::<usize>() {
            Ok(n) if n >= 1 => EngineCommand::ApplySuggestedTitle(n - 1),
            _ => return Err(ParseError::Usage("use <1-3>")),
        },
        "mood" => EngineCommand::AnalyzeMood,
        "show" => EngineCommand::SelectSection(rest.parse::<DashboardSection>()?),
        _ => return Err(ParseError::Unknown(word.to_string())),
    };

    Ok(Input::Command(command))
}

/// Parse a sign-in prompt line.
pub fn parse_sign_in(line: &str) -> Result<SignIn, ParseError> {
    let words: Vec<&str> = line.split_whitespace().collect();

    match words.as_slice() {
        [] => Ok(SignIn::Empty),
        ["help" | "?"] => Ok(SignIn::Help),
        ["demo"] => Ok(SignIn::Demo),
        ["login", email, password] => Ok(SignIn::Login {
            email: email.to_string(),
            password: password.to_string(),
        }),
        ["login", ..] => Err(ParseError::Usage("login <email> <password>")),
        ["register", name, email, password] => Ok(SignIn::Register(Profile {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        })),
        ["register", ..] => Err(ParseError::Usage("register <name> <email> <password>")),
        [word, ..] => Err(ParseError::Unknown(word.to_string())),
    }
}

fn platform(rest: &str, usage: &'static str) -> Result<String, ParseError> {
    match rest.split_whitespace().next() {
        Some(id) => Ok(id.to_ascii_lowercase()),
        None => Err(ParseError::Usage(usage)),
    }
}
