use std::fmt;

/// One line typed at the lab prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabCommand {
    Predict(String),
    Acid,
    Indicator,
    Fast,
    Drop,
    Quiz,
    Answer(String),
    Reset,
    Show,
    Chart,
    Curve,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CommandError {
    MissingArgument { command: &'static str },
    Unknown(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::MissingArgument { command } => {
                write!(f, "{command} needs a value (try `help`)")
            }
            CommandError::Unknown(word) => write!(f, "unknown command: {word} (try `help`)"),
        }
    }
}

impl std::error::Error for CommandError {}

impl LabCommand {
    /// Parse a prompt line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(word, rest)| (word, rest.trim()));

        let command = match word.to_ascii_lowercase().as_str() {
            "predict" => Self::Predict(required(rest, "predict")?),
            "acid" => Self::Acid,
            "indicator" => Self::Indicator,
            "fast" => Self::Fast,
            "drop" => Self::Drop,
            "quiz" | "finish" => Self::Quiz,
            "answer" => Self::Answer(required(rest, "answer")?),
            "reset" => Self::Reset,
            "show" => Self::Show,
            "chart" => Self::Chart,
            "curve" | "history" => Self::Curve,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => return Err(CommandError::Unknown(word.to_owned())),
        };
        Ok(Some(command))
    }
}

fn required(rest: &str, command: &'static str) -> Result<String, CommandError> {
    if rest.is_empty() {
        Err(CommandError::MissingArgument { command })
    } else {
        Ok(rest.to_owned())
    }
}

pub fn print_help() {
    println!("Commands:");
    println!("  predict <mL>    guess the alkali volume needed to neutralize the acid");
    println!("  acid            pour 10 mL of acid into the beaker");
    println!("  indicator       add universal indicator");
    println!("  fast            add 1.0 mL of alkali (disabled from 8 to 12 mL)");
    println!("  drop            add 0.1 mL of alkali");
    println!("  quiz            finish titrating once the solution is neutral");
    println!("  answer <text>   answer the current quiz question");
    println!("  show            print the lab state");
    println!("  chart           print the indicator reference chart");
    println!("  curve           plot the recorded pH readings");
    println!("  reset           start over");
    println!("  quit            leave the lab");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_words_and_arguments() {
        assert_eq!(
            LabCommand::parse("predict 10.5").unwrap(),
            Some(LabCommand::Predict("10.5".into()))
        );
        assert_eq!(
            LabCommand::parse("  answer   they are equal ").unwrap(),
            Some(LabCommand::Answer("they are equal".into()))
        );
        assert_eq!(LabCommand::parse("DROP").unwrap(), Some(LabCommand::Drop));
        assert_eq!(LabCommand::parse("curve").unwrap(), Some(LabCommand::Curve));
        assert_eq!(LabCommand::parse("   ").unwrap(), None);
    }

    #[test]
    fn missing_argument_and_unknown_words_fail() {
        assert_eq!(
            LabCommand::parse("answer"),
            Err(CommandError::MissingArgument { command: "answer" })
        );
        assert_eq!(
            LabCommand::parse("stir"),
            Err(CommandError::Unknown("stir".into()))
        );
    }
}
