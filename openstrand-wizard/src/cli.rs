// Command-line arguments for the headless wizard.
//
// Parsed by hand; `--flag value` and `--flag=value` are both accepted.

use std::path::PathBuf;
use thiserror::Error;

use crate::models::state::{PlanTier, Visibility};

pub const USAGE: &str = "\
Usage:
  openstrand-wizard --smoke
  openstrand-wizard --file <path> [--name <name>] [--description <text>]
                    [--tag <tag>]... [--visibility public|unlisted|private]
                    [--plan free|basic|pro|team|enterprise] [--license <spdx>]
                    [--no-strand-usage] [--acknowledge] [--force-clone]
                    [--config <path>]";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("Missing value for {0}")]
    MissingValue(String),

    #[error("Invalid value '{value}' for {flag}")]
    InvalidValue { flag: String, value: String },

    #[error("Unknown argument '{0}'")]
    Unknown(String),

    #[error("--file is required unless --smoke is given")]
    MissingFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitArgs {
    pub file: PathBuf,
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub visibility: Option<Visibility>,
    pub plan: Option<PlanTier>,
    pub license: Option<String>,
    pub allow_strand_usage: bool,
    pub acknowledge: bool,
    pub force_clone: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Smoke,
    Submit(SubmitArgs),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub command: Command,
    pub config: Option<PathBuf>,
}

/// Parse arguments, excluding the program name.
pub fn parse_args<I, S>(args: I) -> Result<CliArgs, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut it = args.into_iter().map(Into::into);

    let mut help = false;
    let mut smoke = false;
    let mut config = None;
    let mut file = None;
    let mut name = None;
    let mut description = None;
    let mut tags = Vec::new();
    let mut visibility = None;
    let mut plan = None;
    let mut license = None;
    let mut allow_strand_usage = true;
    let mut acknowledge = false;
    let mut force_clone = false;

    while let Some(arg) = it.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((f, v)) if f.starts_with("--") => (f.to_string(), Some(v.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = |flag: &str| -> Result<String, CliError> {
            inline
                .clone()
                .or_else(|| it.next())
                .ok_or_else(|| CliError::MissingValue(flag.to_string()))
        };

        match flag.as_str() {
            "-h" | "--help" => help = true,
            "--smoke" => smoke = true,
            "--no-strand-usage" => allow_strand_usage = false,
            "--acknowledge" => acknowledge = true,
            "--force-clone" => force_clone = true,
            "--config" => config = Some(PathBuf::from(value("--config")?)),
            "--file" => file = Some(PathBuf::from(value("--file")?)),
            "--name" => name = Some(value("--name")?),
            "--description" => description = Some(value("--description")?),
            "--tag" => tags.push(value("--tag")?),
            "--license" => license = Some(value("--license")?),
            "--visibility" => {
                let v = value("--visibility")?;
                visibility = Some(Visibility::parse(&v).ok_or_else(|| CliError::InvalidValue {
                    flag: "--visibility".to_string(),
                    value: v.clone(),
                })?);
            }
            "--plan" => {
                let v = value("--plan")?;
                plan = Some(PlanTier::parse(&v).ok_or_else(|| CliError::InvalidValue {
                    flag: "--plan".to_string(),
                    value: v.clone(),
                })?);
            }
            _ => return Err(CliError::Unknown(arg)),
        }
    }

    let command = if help {
        Command::Help
    } else if smoke {
        Command::Smoke
    } else {
        Command::Submit(SubmitArgs {
            file: file.ok_or(CliError::MissingFile)?,
            name,
            description,
            tags,
            visibility,
            plan,
            license,
            allow_strand_usage,
            acknowledge,
            force_clone,
        })
    };

    Ok(CliArgs { command, config })
}
