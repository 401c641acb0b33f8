use rust_decimal::Decimal;
use std::str::FromStr;

/// A line typed on the runner's stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Start,
    Stop,
    Reset,
    Update(Option<Decimal>),
    Show,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default().to_ascii_lowercase();
        let argument = words.next();
        if words.next().is_some() {
            anyhow::bail!("Too many arguments in '{}'", line.trim());
        }

        let command = match (verb.as_str(), argument) {
            ("start", None) => ConsoleCommand::Start,
            ("stop", None) => ConsoleCommand::Stop,
            ("reset", None) => ConsoleCommand::Reset,
            ("show", None) => ConsoleCommand::Show,
            ("quit" | "exit", None) => ConsoleCommand::Quit,
            ("update", None) => ConsoleCommand::Update(None),
            ("update", Some(value)) => ConsoleCommand::Update(Some(
                Decimal::from_str(value)
                    .map_err(|e| anyhow::anyhow!("'{}' is not a decimal: {}", value, e))?,
            )),
            ("", _) => anyhow::bail!("Empty command"),
            _ => anyhow::bail!("Unknown command '{}'", line.trim()),
        };
        Ok(command)
    }
}
