//! Line commands of the terminal front-end.

use crate::models::{Persona, Provider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    Upload(String),
    Hint,
    Practice(Option<u32>),
    Problem(usize),
    ListProblems,
    NewQuestion,
    ClearHistory,
    SetProvider(Provider),
    SetApiKey(String),
    StartSession(Persona),
    Metrics,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command: /{0} (try /help)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

impl Command {
    /// Anything not starting with `/` is a question for the tutor.
    pub fn parse(line: &str) -> Result<Command, CommandError> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Command::Ask(line.to_string()));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        match name.to_ascii_lowercase().as_str() {
            "upload" if !arg.is_empty() => Ok(Command::Upload(arg.to_string())),
            "upload" => Err(CommandError::Usage("/upload <path>")),
            "hint" => Ok(Command::Hint),
            "practice" if arg.is_empty() => Ok(Command::Practice(None)),
            "practice" => arg
                .parse()
                .map(|count| Command::Practice(Some(count)))
                .map_err(|_| CommandError::Usage("/practice [count]")),
            // Problems are numbered from 1 for the user.
            "problem" => match arg.parse::<usize>() {
                Ok(number) if number >= 1 => Ok(Command::Problem(number - 1)),
                _ => Err(CommandError::Usage("/problem <number>")),
            },
            "problems" => Ok(Command::ListProblems),
            "new" => Ok(Command::NewQuestion),
            "clear" => Ok(Command::ClearHistory),
            "provider" => Provider::parse(arg)
                .map(Command::SetProvider)
                .ok_or(CommandError::Usage("/provider <gemini|openai>")),
            "key" => Ok(Command::SetApiKey(arg.to_string())),
            "persona" => Persona::parse(arg)
                .map(Command::StartSession)
                .ok_or(CommandError::Usage(
                    "/persona <eli5|elementary|highschool|college|masters|phd>",
                )),
            "metrics" => Ok(Command::Metrics),
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

pub const HELP: &str = "\
Type a homework question to get guidance, or use a command:
  /upload <path>       submit an image or PDF
  /hint                reveal the next hint
  /practice [count]    generate practice problems
  /problem <number>    switch to another problem of the submission
  /problems            list the problems found in the submission
  /new                 start a new question (keeps history and settings)
  /clear               clear the chat history
  /provider <name>     gemini or openai
  /key <credential>    set the provider API key (empty to clear)
  /persona <level>     start a learning session at a learner level
  /metrics             print client metrics
  /quit                exit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_question() {
        assert_eq!(
            Command::parse("  Solve 2x+5=13 "),
            Ok(Command::Ask("Solve 2x+5=13".to_string()))
        );
        assert_eq!(Command::parse(""), Ok(Command::Ask(String::new())));
    }

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(
            Command::parse("/upload ~/hw/page 1.png"),
            Ok(Command::Upload("~/hw/page 1.png".to_string()))
        );
        assert_eq!(Command::parse("/practice"), Ok(Command::Practice(None)));
        assert_eq!(Command::parse("/practice 3"), Ok(Command::Practice(Some(3))));
        assert_eq!(Command::parse("/problem 2"), Ok(Command::Problem(1)));
        assert_eq!(Command::parse("/problems"), Ok(Command::ListProblems));
        assert_eq!(
            Command::parse("/provider OpenAI"),
            Ok(Command::SetProvider(Provider::OpenAi))
        );
        assert_eq!(Command::parse("/key"), Ok(Command::SetApiKey(String::new())));
        assert_eq!(
            Command::parse("/persona phd"),
            Ok(Command::StartSession(Persona::Phd))
        );
        assert_eq!(Command::parse("/HINT"), Ok(Command::Hint));
    }

    #[test]
    fn reports_usage_errors() {
        assert_eq!(
            Command::parse("/upload"),
            Err(CommandError::Usage("/upload <path>"))
        );
        assert!(matches!(Command::parse("/problem 0"), Err(CommandError::Usage(_))));
        assert!(matches!(Command::parse("/practice lots"), Err(CommandError::Usage(_))));
        assert_eq!(
            Command::parse("/dance"),
            Err(CommandError::Unknown("dance".to_string()))
        );
    }
}
