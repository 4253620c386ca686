//! Command parsing.
//!
//! A message is a command when it starts with the configured prefix followed
//! by a known command name. Unknown names are ordinary chat.

use regex::Regex;
use ulid::Ulid;

use crate::error::CommandError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Balance,
    TrickOrTreat,
    AddCandy,
    RemoveCandy,
    ForceLeaderboard,
}

impl CommandKind {
    const ALL: [Self; 5] = [
        Self::Balance,
        Self::TrickOrTreat,
        Self::AddCandy,
        Self::RemoveCandy,
        Self::ForceLeaderboard,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Balance => "candy",
            Self::TrickOrTreat => "trickortreat",
            Self::AddCandy => "addcandy",
            Self::RemoveCandy => "removecandy",
            Self::ForceLeaderboard => "forceleaderboard",
        }
    }

    /// Argument synopsis shown after the command name in usage replies.
    pub const fn arguments(self) -> &'static str {
        match self {
            Self::AddCandy | Self::RemoveCandy => " <@user> <amount>",
            _ => "",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Balance,
    TrickOrTreat,
    AddCandy { target: String, amount: i64 },
    RemoveCandy { target: String, amount: i64 },
    ForceLeaderboard,
}

/// A recognised command, possibly with arguments that failed to parse. The
/// kind is kept either way so callers can gate before complaining.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
    pub kind: CommandKind,
    pub command: Result<Command, CommandError>,
}

#[derive(Debug, Clone)]
pub struct CommandParser {
    prefix: String,
    mention: Regex,
}

impl CommandParser {
    pub fn new(prefix: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            prefix: prefix.into(),
            mention: Regex::new(r"^<@([0-9A-Za-z]+)>$")?,
        })
    }

    /// `!addcandy <@user> <amount>` style usage line.
    pub fn usage(&self, kind: CommandKind) -> String {
        format!("{}{}{}", self.prefix, kind.name(), kind.arguments())
    }

    pub fn parse(&self, text: &str) -> Option<Parsed> {
        let rest = text.trim_start().strip_prefix(self.prefix.as_str())?;
        let mut args = rest.split_whitespace();
        let kind = CommandKind::from_name(args.next()?)?;

        let command = match kind {
            CommandKind::Balance => no_more(args).map(|()| Command::Balance),
            CommandKind::TrickOrTreat => no_more(args).map(|()| Command::TrickOrTreat),
            CommandKind::ForceLeaderboard => no_more(args).map(|()| Command::ForceLeaderboard),
            CommandKind::AddCandy => self
                .target_and_amount(args)
                .map(|(target, amount)| Command::AddCandy { target, amount }),
            CommandKind::RemoveCandy => self
                .target_and_amount(args)
                .map(|(target, amount)| Command::RemoveCandy { target, amount }),
        };
        Some(Parsed { kind, command })
    }

    fn target_and_amount<'a>(
        &self,
        mut args: impl Iterator<Item = &'a str>,
    ) -> Result<(String, i64), CommandError> {
        let target = args.next().ok_or(CommandError::MissingArgument("user"))?;
        let target = self.user_id(target)?;
        let amount = args.next().ok_or(CommandError::MissingArgument("amount"))?;
        let amount = amount
            .parse::<i64>()
            .map_err(|_| CommandError::BadAmount(amount.to_string()))?;
        no_more(args)?;
        Ok((target, amount))
    }

    /// Accepts `<@ULID>` or a bare ULID, returned in canonical form.
    fn user_id(&self, raw: &str) -> Result<String, CommandError> {
        let id = self
            .mention
            .captures(raw)
            .and_then(|c| c.get(1))
            .map_or(raw, |m| m.as_str());
        Ulid::from_string(id)
            .map(|ulid| ulid.to_string())
            .map_err(|_| CommandError::BadTarget(raw.to_string()))
    }
}

fn no_more<'a>(mut args: impl Iterator<Item = &'a str>) -> Result<(), CommandError> {
    match args.next() {
        Some(extra) => Err(CommandError::ExtraArgument(extra.to_string())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = "01J9Z3XK6W1TQ4D5E8R2M7N0PA";

    fn parser() -> CommandParser {
        CommandParser::new("!").unwrap()
    }

    fn command(text: &str) -> Result<Command, CommandError> {
        parser().parse(text).unwrap().command
    }

    #[test]
    fn plain_chat_is_not_a_command() {
        let p = parser();
        assert_eq!(p.parse("hello there"), None);
        assert_eq!(p.parse("!"), None);
        assert_eq!(p.parse("!dance"), None);
        assert_eq!(p.parse("candy"), None);
    }

    #[test]
    fn simple_commands() {
        assert_eq!(command("!candy"), Ok(Command::Balance));
        assert_eq!(command("  !TrickOrTreat"), Ok(Command::TrickOrTreat));
        assert_eq!(command("!forceleaderboard"), Ok(Command::ForceLeaderboard));
        assert_eq!(
            command("!candy please"),
            Err(CommandError::ExtraArgument("please".into()))
        );
    }

    #[test]
    fn moderator_commands_take_mentions_or_ids() {
        assert_eq!(
            command(&format!("!addcandy <@{USER}> 5")),
            Ok(Command::AddCandy {
                target: USER.into(),
                amount: 5
            })
        );
        assert_eq!(
            command(&format!("!removecandy {} 3", USER.to_lowercase())),
            Ok(Command::RemoveCandy {
                target: USER.into(),
                amount: 3
            })
        );
    }

    #[test]
    fn malformed_moderator_arguments() {
        assert_eq!(
            command("!addcandy"),
            Err(CommandError::MissingArgument("user"))
        );
        assert_eq!(
            command(&format!("!addcandy <@{USER}>")),
            Err(CommandError::MissingArgument("amount"))
        );
        assert_eq!(
            command("!addcandy @bob 5"),
            Err(CommandError::BadTarget("@bob".into()))
        );
        assert_eq!(
            command(&format!("!addcandy <@{USER}> lots")),
            Err(CommandError::BadAmount("lots".into()))
        );
        assert_eq!(
            command(&format!("!addcandy <@{USER}> 2.5")),
            Err(CommandError::BadAmount("2.5".into()))
        );
        let parsed = parser().parse("!removecandy nope").unwrap();
        assert_eq!(parsed.kind, CommandKind::RemoveCandy);
        assert!(parsed.command.is_err());
    }

    #[test]
    fn custom_prefix_and_usage() {
        let p = CommandParser::new("?").unwrap();
        assert_eq!(p.parse("!candy"), None);
        assert_eq!(p.parse("?candy").unwrap().command, Ok(Command::Balance));
        assert_eq!(p.usage(CommandKind::AddCandy), "?addcandy <@user> <amount>");
    }
}
