//! Command-line parsing for the `branchcast` binary.

use std::str::FromStr;

use chrono::NaiveDate;
use thiserror::Error;

use branchcast_core::BranchId;

pub const USAGE: &str = "\
usage: branchcast <command> [options]

commands:
  run       forecast every branch and the all-branches total, append one run
              --horizon <days>        override BRANCHCAST_HORIZON_DAYS
              --min-history <days>    override BRANCHCAST_MIN_HISTORY_DAYS
  latest    print the rows of the most recent run
              --branch <id>           only this branch (0 = all-branches total)
  seed      insert synthetic branches and sales
              --branches <n>          established branches (default 1)
              --days <n>              days of history (default 14)
              --sales-per-day <n>     sales per branch per day (default 20)
              --seed <n>              random seed (default 42)
              --young-branch <days>   add a branch with a short history
              --end-date <yyyy-mm-dd> last day of history (default today)
  schema    create tables if missing
  help      print this message

environment: DATABASE_URL (required), RUST_LOG, LOG_FORMAT=json|pretty";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(RunArgs),
    Latest(LatestArgs),
    Seed(SeedArgs),
    Schema,
    Help,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArgs {
    pub horizon_days: Option<usize>,
    pub min_history_days: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatestArgs {
    pub branch: Option<BranchId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedArgs {
    pub branches: Option<u32>,
    pub days: Option<u32>,
    pub sales_per_day: Option<u32>,
    pub seed: Option<u64>,
    pub young_branch_days: Option<u32>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("no command given")]
    MissingCommand,

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("unknown option `{flag}` for `{command}`")]
    UnknownFlag { command: &'static str, flag: String },

    #[error("option `{0}` needs a value")]
    MissingValue(String),

    #[error("invalid value `{value}` for `{flag}`")]
    InvalidValue { flag: String, value: String },
}

/// Parse arguments after the program name.
pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Command, CliError> {
    let mut args = args.iter().map(AsRef::as_ref);
    let command = args.next().ok_or(CliError::MissingCommand)?;
    let options = split_options(args)?;

    match command {
        "run" => {
            let mut run = RunArgs::default();
            for (flag, value) in options {
                match flag.as_str() {
                    "--horizon" => run.horizon_days = Some(parse_value(&flag, &value)?),
                    "--min-history" => run.min_history_days = Some(parse_value(&flag, &value)?),
                    _ => return Err(CliError::UnknownFlag { command: "run", flag }),
                }
            }
            Ok(Command::Run(run))
        }
        "seed" => {
            let mut seed = SeedArgs::default();
            for (flag, value) in options {
                match flag.as_str() {
                    "--branches" => seed.branches = Some(parse_value(&flag, &value)?),
                    "--days" => seed.days = Some(parse_value(&flag, &value)?),
                    "--sales-per-day" => seed.sales_per_day = Some(parse_value(&flag, &value)?),
                    "--seed" => seed.seed = Some(parse_value(&flag, &value)?),
                    "--young-branch" => seed.young_branch_days = Some(parse_value(&flag, &value)?),
                    "--end-date" => seed.end_date = Some(parse_value(&flag, &value)?),
                    _ => return Err(CliError::UnknownFlag { command: "seed", flag }),
                }
            }
            Ok(Command::Seed(seed))
        }
        "latest" => {
            let mut latest = LatestArgs::default();
            for (flag, value) in options {
                match flag.as_str() {
                    "--branch" => latest.branch = Some(parse_value(&flag, &value)?),
                    _ => return Err(CliError::UnknownFlag { command: "latest", flag }),
                }
            }
            Ok(Command::Latest(latest))
        }
        "schema" => no_options("schema", options).map(|_| Command::Schema),
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => Err(CliError::UnknownCommand(other.to_string())),
    }
}

/// `--flag value` and `--flag=value` pairs, in order.
fn split_options<'a>(
    mut args: impl Iterator<Item = &'a str>,
) -> Result<Vec<(String, String)>, CliError> {
    let mut options = Vec::new();
    while let Some(arg) = args.next() {
        if let Some((flag, value)) = arg.split_once('=') {
            options.push((flag.to_string(), value.to_string()));
            continue;
        }
        if !arg.starts_with("--") {
            return Err(CliError::UnknownFlag {
                command: "branchcast",
                flag: arg.to_string(),
            });
        }
        let value = args
            .next()
            .ok_or_else(|| CliError::MissingValue(arg.to_string()))?;
        options.push((arg.to_string(), value.to_string()));
    }
    Ok(options)
}

fn no_options(command: &'static str, options: Vec<(String, String)>) -> Result<(), CliError> {
    match options.into_iter().next() {
        None => Ok(()),
        Some((flag, _)) => Err(CliError::UnknownFlag { command, flag }),
    }
}

fn parse_value<T: FromStr>(flag: &str, value: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::InvalidValue {
        flag: flag.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_with_overrides() {
        let cmd = parse(&["run", "--horizon", "14", "--min-history=45"]).unwrap();
        assert_eq!(
            cmd,
            Command::Run(RunArgs {
                horizon_days: Some(14),
                min_history_days: Some(45),
            })
        );
    }

    #[test]
    fn bare_commands() {
        assert_eq!(parse(&["run"]).unwrap(), Command::Run(RunArgs::default()));
        assert_eq!(parse(&["latest"]).unwrap(), Command::Latest(LatestArgs::default()));
        assert_eq!(parse(&["schema"]).unwrap(), Command::Schema);
        assert_eq!(parse(&["--help"]).unwrap(), Command::Help);
    }

    #[test]
    fn latest_branch_selection() {
        assert_eq!(
            parse(&["latest", "--branch", "3"]).unwrap(),
            Command::Latest(LatestArgs {
                branch: Some(BranchId::from_raw(3)),
            })
        );
        assert_eq!(
            parse(&["latest", "--branch=0"]).unwrap(),
            Command::Latest(LatestArgs {
                branch: Some(BranchId::AGGREGATE),
            })
        );
        for bad in ["-1", "one", "3 OR 1=1"] {
            assert!(matches!(
                parse(&["latest", "--branch", bad]).unwrap_err(),
                CliError::InvalidValue { .. }
            ));
        }
    }

    #[test]
    fn seed_options() {
        let cmd = parse(&[
            "seed",
            "--branches",
            "3",
            "--days",
            "400",
            "--young-branch",
            "10",
            "--end-date",
            "2024-06-30",
        ])
        .unwrap();
        let Command::Seed(seed) = cmd else {
            panic!("expected seed command");
        };
        assert_eq!(seed.branches, Some(3));
        assert_eq!(seed.days, Some(400));
        assert_eq!(seed.young_branch_days, Some(10));
        assert_eq!(seed.end_date, NaiveDate::from_ymd_opt(2024, 6, 30));
        assert_eq!(seed.seed, None);
    }

    #[test]
    fn errors() {
        let empty: [&str; 0] = [];
        assert_eq!(parse(&empty).unwrap_err(), CliError::MissingCommand);
        assert_eq!(
            parse(&["forecast"]).unwrap_err(),
            CliError::UnknownCommand("forecast".into())
        );
        assert_eq!(
            parse(&["run", "--horizon"]).unwrap_err(),
            CliError::MissingValue("--horizon".into())
        );
        assert!(matches!(
            parse(&["run", "--horizon", "week"]).unwrap_err(),
            CliError::InvalidValue { .. }
        ));
        assert!(matches!(
            parse(&["latest", "--run", "1"]).unwrap_err(),
            CliError::UnknownFlag { command: "latest", .. }
        ));
    }
}
