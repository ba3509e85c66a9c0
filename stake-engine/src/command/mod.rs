//! Typed commands and their parser.
//!
//! Parsing is the only place raw text is inspected. A `Command` that exists is
//! well formed; every mutation downstream can assume valid arguments.

pub mod processor;
pub mod server;

pub use processor::CommandProcessor;
pub use server::CommandServer;

use crate::error::{EngineError, Result};
use subnet::{Inbound, NetUid};

pub const USAGE: &str = "Commands:\n\
/pause, /start\n\
/info <netuid>, /boost <netuid>, /slash <netuid>, /exclude <netuid>\n\
/buy <netuid> <amount>, /sell <netuid> <amount>\n\
/amount <value>, /balance, /history";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Pause,
    Start,
    Info(NetUid),
    Boost(NetUid),
    Slash(NetUid),
    Exclude(NetUid),
    Sell { netuid: NetUid, amount: f64 },
    Buy { netuid: NetUid, amount: f64 },
    Amount(f64),
    Balance,
    History,
}

impl Command {
    /// Parses a command name (with or without the leading `/`) and its arguments.
    ///
    /// Names are case-insensitive and a `@botname` suffix is dropped, so
    /// `/Boost@stake_bot 4` is `/boost 4`.
    pub fn parse(name: &str, args: &[String]) -> Result<Self> {
        let lowered = name.split('@').next().unwrap_or_default().to_ascii_lowercase();
        let name = lowered.strip_prefix('/').unwrap_or(&lowered);

        let command = match name {
            "pause" => {
                expect_args(name, args, 0)?;
                Command::Pause
            }
            "start" => {
                expect_args(name, args, 0)?;
                Command::Start
            }
            "info" => Command::Info(netuid_only(name, args)?),
            "boost" => Command::Boost(netuid_only(name, args)?),
            "slash" => Command::Slash(netuid_only(name, args)?),
            "exclude" => Command::Exclude(netuid_only(name, args)?),
            "sell" | "unstake" => {
                let (netuid, amount) = netuid_and_amount(name, args)?;
                Command::Sell { netuid, amount }
            }
            "buy" | "stake" => {
                let (netuid, amount) = netuid_and_amount(name, args)?;
                Command::Buy { netuid, amount }
            }
            "amount" => {
                expect_args(name, args, 1)?;
                Command::Amount(parse_amount(&args[0])?)
            }
            "balance" => {
                expect_args(name, args, 0)?;
                Command::Balance
            }
            "history" => {
                expect_args(name, args, 0)?;
                Command::History
            }
            "" => return Err(EngineError::invalid("empty command")),
            other => return Err(EngineError::invalid(format!("unknown command /{}", other))),
        };
        Ok(command)
    }

    /// Commands that need the book lock and may wait on an in-flight cycle.
    pub fn touches_ledger(&self) -> bool {
        matches!(
            self,
            Command::Info(_)
                | Command::Sell { .. }
                | Command::Buy { .. }
                | Command::Balance
                | Command::History
        )
    }
}

impl TryFrom<&Inbound> for Command {
    type Error = EngineError;

    fn try_from(inbound: &Inbound) -> Result<Self> {
        Command::parse(&inbound.name, &inbound.args)
    }
}

fn expect_args(name: &str, args: &[String], count: usize) -> Result<()> {
    if args.len() != count {
        return Err(EngineError::invalid(format!(
            "/{} takes {} argument(s), got {}",
            name,
            count,
            args.len()
        )));
    }
    Ok(())
}

fn parse_netuid(raw: &str) -> Result<NetUid> {
    raw.trim()
        .parse::<NetUid>()
        .map_err(|_| EngineError::invalid(format!("'{}' is not a subnet id", raw)))
}

fn parse_amount(raw: &str) -> Result<f64> {
    match raw.trim().parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount > 0.0 => Ok(amount),
        Ok(_) => Err(EngineError::invalid(format!(
            "amount must be a positive number, got {}",
            raw
        ))),
        Err(_) => Err(EngineError::invalid(format!("'{}' is not a number", raw))),
    }
}

fn netuid_only(name: &str, args: &[String]) -> Result<NetUid> {
    expect_args(name, args, 1)?;
    parse_netuid(&args[0])
}

fn netuid_and_amount(name: &str, args: &[String]) -> Result<(NetUid, f64)> {
    expect_args(name, args, 2)?;
    Ok((parse_netuid(&args[0])?, parse_amount(&args[1])?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parses_every_command() {
        assert_eq!(Command::parse("/pause", &[]).unwrap(), Command::Pause);
        assert_eq!(Command::parse("/start", &[]).unwrap(), Command::Start);
        assert_eq!(Command::parse("/info", &args(&["7"])).unwrap(), Command::Info(7));
        assert_eq!(Command::parse("/boost", &args(&["4"])).unwrap(), Command::Boost(4));
        assert_eq!(Command::parse("/slash", &args(&["4"])).unwrap(), Command::Slash(4));
        assert_eq!(Command::parse("/exclude", &args(&["3"])).unwrap(), Command::Exclude(3));
        assert_eq!(
            Command::parse("/sell", &args(&["12", "0.5"])).unwrap(),
            Command::Sell { netuid: 12, amount: 0.5 }
        );
        assert_eq!(
            Command::parse("/buy", &args(&["12", "2"])).unwrap(),
            Command::Buy { netuid: 12, amount: 2.0 }
        );
        assert_eq!(Command::parse("/amount", &args(&["0.25"])).unwrap(), Command::Amount(0.25));
        assert_eq!(Command::parse("/balance", &[]).unwrap(), Command::Balance);
        assert_eq!(Command::parse("/history", &[]).unwrap(), Command::History);
    }

    #[test]
    fn test_aliases_case_and_bot_suffix() {
        assert_eq!(
            Command::parse("/STAKE@my_bot", &args(&["1", "1"])).unwrap(),
            Command::Buy { netuid: 1, amount: 1.0 }
        );
        assert_eq!(
            Command::parse("/unstake", &args(&["1", "1"])).unwrap(),
            Command::Sell { netuid: 1, amount: 1.0 }
        );
        assert_eq!(Command::parse("Pause", &[]).unwrap(), Command::Pause);
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let cases: Vec<(&str, Vec<String>)> = vec![
            ("/boost", args(&[])),
            ("/boost", args(&["x"])),
            ("/boost", args(&["70000"])),
            ("/boost", args(&["-1"])),
            ("/sell", args(&["1"])),
            ("/sell", args(&["1", "0"])),
            ("/buy", args(&["1", "-2"])),
            ("/buy", args(&["1", "NaN"])),
            ("/buy", args(&["1", "inf"])),
            ("/amount", args(&["abc"])),
            ("/amount", args(&["0"])),
            ("/pause", args(&["now"])),
            ("/dance", args(&[])),
        ];
        for (name, args) in cases {
            assert!(
                matches!(Command::parse(name, &args), Err(EngineError::InvalidCommand(_))),
                "{} {:?} should be rejected",
                name,
                args
            );
        }
    }

    #[test]
    fn test_ledger_commands() {
        assert!(Command::Balance.touches_ledger());
        assert!(Command::Buy { netuid: 1, amount: 1.0 }.touches_ledger());
        assert!(!Command::Boost(1).touches_ledger());
        assert!(!Command::Pause.touches_ledger());
    }

    #[test]
    fn test_from_inbound() {
        let inbound = Inbound::from_text("/exclude 9", Some(1)).unwrap();
        assert_eq!(Command::try_from(&inbound).unwrap(), Command::Exclude(9));
    }
}
