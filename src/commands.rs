use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::input::MouseButton;

pub const HELP: &str = "\
commands:
  region add NAME X0 Y0 X1 Y1 | region rm NAME | region use NAME | region ls
  region save | region load
  start | pause | resume | stop | reset
  filter | filter on | filter off | filter allow NAME...
  timer start [DURATION] | timer pause | timer resume | timer cancel | timer status
  timer default MINUTES
  stats | last-session | click X Y [left|right|middle] | help | quit";

/// One line of console input, parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddRegion {
        name: String,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
    },
    RemoveRegion(String),
    UseRegion(String),
    ListRegions,
    SaveRegions,
    LoadRegions,
    Start,
    Pause,
    Resume,
    Stop,
    Reset,
    ShowFilter,
    FilterEnabled(bool),
    FilterAllow(Vec<String>),
    TimerStart(Option<Duration>),
    TimerPause,
    TimerResume,
    TimerCancel,
    TimerStatus,
    TimerDefault(u64),
    Stats,
    LastSession,
    Click {
        x: i32,
        y: i32,
        button: MouseButton,
    },
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),
    #[error("'{value}' is not a valid {what}")]
    InvalidNumber { what: &'static str, value: String },
    #[error("'{0}' is not a valid duration (examples: 25, 90s, 5m, 1h)")]
    InvalidDuration(String),
    #[error("'{0}' is not a mouse button (left, right, middle)")]
    InvalidButton(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut args = Args(line.split_whitespace());
        let head = args.0.next().ok_or(CommandError::Empty)?.to_lowercase();

        let command = match head.as_str() {
            "region" => {
                let sub = args.required("region subcommand")?.to_lowercase();
                match sub.as_str() {
                    "add" => Command::AddRegion {
                        name: args.required("region name")?.to_string(),
                        x0: args.number("x0")?,
                        y0: args.number("y0")?,
                        x1: args.number("x1")?,
                        y1: args.number("y1")?,
                    },
                    "rm" | "remove" => Command::RemoveRegion(args.required("region name")?.into()),
                    "use" => Command::UseRegion(args.required("region name")?.into()),
                    "ls" | "list" => Command::ListRegions,
                    "save" => Command::SaveRegions,
                    "load" => Command::LoadRegions,
                    _ => return Err(CommandError::Unknown(format!("region {}", sub))),
                }
            }
            "start" => Command::Start,
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "stop" => Command::Stop,
            "reset" => Command::Reset,
            "filter" => match args.0.next().map(str::to_lowercase).as_deref() {
                None => Command::ShowFilter,
                Some("on") => Command::FilterEnabled(true),
                Some("off") => Command::FilterEnabled(false),
                Some("allow") => {
                    let names: Vec<String> = args.0.by_ref().map(str::to_string).collect();
                    if names.is_empty() {
                        return Err(CommandError::MissingArgument("process name"));
                    }
                    Command::FilterAllow(names)
                }
                Some(other) => return Err(CommandError::Unknown(format!("filter {}", other))),
            },
            "timer" => {
                let sub = args.required("timer subcommand")?.to_lowercase();
                match sub.as_str() {
                    "start" => Command::TimerStart(args.0.next().map(parse_duration).transpose()?),
                    "pause" => Command::TimerPause,
                    "resume" => Command::TimerResume,
                    "cancel" => Command::TimerCancel,
                    "status" => Command::TimerStatus,
                    "default" => Command::TimerDefault(args.number("minutes")?),
                    _ => return Err(CommandError::Unknown(format!("timer {}", sub))),
                }
            }
            "stats" => Command::Stats,
            "last-session" | "last" => Command::LastSession,
            "click" => Command::Click {
                x: args.number("x")?,
                y: args.number("y")?,
                button: args.0.next().map(parse_button).transpose()?.unwrap_or(MouseButton::Left),
            },
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => return Err(CommandError::Unknown(head)),
        };

        args.finish()?;
        Ok(command)
    }
}

struct Args<'a>(std::str::SplitWhitespace<'a>);

impl<'a> Args<'a> {
    fn required(&mut self, what: &'static str) -> Result<&'a str, CommandError> {
        self.0.next().ok_or(CommandError::MissingArgument(what))
    }

    fn number<T: FromStr>(&mut self, what: &'static str) -> Result<T, CommandError> {
        let raw = self.required(what)?;
        raw.parse().map_err(|_| CommandError::InvalidNumber {
            what,
            value: raw.to_string(),
        })
    }

    fn finish(mut self) -> Result<(), CommandError> {
        match self.0.next() {
            Some(extra) => Err(CommandError::UnexpectedArgument(extra.to_string())),
            None => Ok(()),
        }
    }
}

/// Parses `90s`, `5m`, `1h`; a bare number is minutes.
pub fn parse_duration(raw: &str) -> Result<Duration, CommandError> {
    let invalid = || CommandError::InvalidDuration(raw.to_string());
    let lowered = raw.to_lowercase();
    let (digits, unit_secs) = match lowered.char_indices().last() {
        Some((idx, 's')) => (&lowered[..idx], 1),
        Some((idx, 'm')) => (&lowered[..idx], 60),
        Some((idx, 'h')) => (&lowered[..idx], 3600),
        Some(_) => (lowered.as_str(), 60),
        None => return Err(invalid()),
    };
    let value: u64 = digits.parse().map_err(|_| invalid())?;
    if value == 0 {
        return Err(invalid());
    }
    value
        .checked_mul(unit_secs)
        .map(Duration::from_secs)
        .ok_or_else(invalid)
}

fn parse_button(raw: &str) -> Result<MouseButton, CommandError> {
    match raw.to_lowercase().as_str() {
        "left" | "l" => Ok(MouseButton::Left),
        "right" | "r" => Ok(MouseButton::Right),
        "middle" | "m" => Ok(MouseButton::Middle),
        _ => Err(CommandError::InvalidButton(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Command, CommandError> {
        line.parse()
    }

    #[test]
    fn parses_region_commands() {
        assert_eq!(
            parse("region add tabs 0 0 1920 80"),
            Ok(Command::AddRegion {
                name: "tabs".into(),
                x0: 0,
                y0: 0,
                x1: 1920,
                y1: 80
            })
        );
        assert_eq!(parse("region use tabs"), Ok(Command::UseRegion("tabs".into())));
        assert_eq!(parse("REGION rm tabs"), Ok(Command::RemoveRegion("tabs".into())));
        assert_eq!(parse("region ls"), Ok(Command::ListRegions));
        assert_eq!(
            parse("region add tabs 0 0 x 80"),
            Err(CommandError::InvalidNumber {
                what: "x1",
                value: "x".into()
            })
        );
        assert_eq!(
            parse("region add tabs 0 0"),
            Err(CommandError::MissingArgument("x1"))
        );
    }

    #[test]
    fn parses_session_and_filter_commands() {
        assert_eq!(parse("  start "), Ok(Command::Start));
        assert_eq!(parse("reset"), Ok(Command::Reset));
        assert_eq!(parse("filter"), Ok(Command::ShowFilter));
        assert_eq!(parse("filter off"), Ok(Command::FilterEnabled(false)));
        assert_eq!(
            parse("filter allow firefox.exe brave.exe"),
            Ok(Command::FilterAllow(vec!["firefox.exe".into(), "brave.exe".into()]))
        );
        assert_eq!(
            parse("filter allow"),
            Err(CommandError::MissingArgument("process name"))
        );
    }

    #[test]
    fn parses_timer_durations() {
        assert_eq!(parse("timer start"), Ok(Command::TimerStart(None)));
        assert_eq!(
            parse("timer start 25"),
            Ok(Command::TimerStart(Some(Duration::from_secs(25 * 60))))
        );
        assert_eq!(parse_duration("90s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("1H"), Ok(Duration::from_secs(3600)));
        assert!(parse_duration("0m").is_err());
        assert!(parse_duration("m").is_err());
        assert!(parse_duration("ten").is_err());
        assert_eq!(parse("timer default 15"), Ok(Command::TimerDefault(15)));
        assert_eq!(
            parse("timer default"),
            Err(CommandError::MissingArgument("minutes"))
        );
    }

    #[test]
    fn parses_click_with_optional_button() {
        assert_eq!(
            parse("click 50 50"),
            Ok(Command::Click {
                x: 50,
                y: 50,
                button: MouseButton::Left
            })
        );
        assert_eq!(
            parse("click -5 7 right"),
            Ok(Command::Click {
                x: -5,
                y: 7,
                button: MouseButton::Right
            })
        );
        assert_eq!(
            parse("click 1 1 thumb"),
            Err(CommandError::InvalidButton("thumb".into()))
        );
    }

    #[test]
    fn rejects_unknown_empty_and_trailing_input() {
        assert_eq!(parse(""), Err(CommandError::Empty));
        assert_eq!(parse("dance"), Err(CommandError::Unknown("dance".into())));
        assert_eq!(
            parse("stop now"),
            Err(CommandError::UnexpectedArgument("now".into()))
        );
    }
}
