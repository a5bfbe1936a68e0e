use std::path::PathBuf;
use thiserror::Error;

use crate::config::SourceKind;
use crate::error::SyncError;

#[derive(Debug, Error, PartialEq)]
pub enum CliError {
    #[error("help requested")]
    Help,
    #[error("Unknown argument: {0}")]
    UnknownArgument(String),
}

#[derive(Debug, Default, PartialEq)]
pub struct Args {
    pub debug: bool,
    pub no_graphs: bool,
    pub file: Option<PathBuf>,
    /// No arguments were given at all
    pub bare: bool,
}

/// Where device records come from for this run
#[derive(Debug, PartialEq)]
pub enum Source {
    Netdot,
    File(PathBuf),
}

pub fn usage() -> &'static str {
    "netdot-cacti-sync\n\
\n\
USAGE:\n\
  netdot-cacti-sync [-d|--debug] [--no-graphs] [--file=<path>]\n\
\n\
OPTIONS:\n\
  -h, --help        Show this help\n\
  -d, --debug       Debug logging\n\
      --no-graphs   Sync hosts and tree only, do not create graphs\n\
      --file=<path> Read devices from a flat file instead of Netdot\n\
\n\
FILE FORMAT:\n\
  externalId;description;address;templateId;group;disable;snmpVersion;community\n\
  One device per line. Blank lines and lines starting with '#' are ignored.\n\
"
}

pub fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args { bare: argv.len() <= 1, ..Default::default() };

    for a in argv.iter().skip(1) {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Help),
            "--debug" | "-d" => args.debug = true,
            "--no-graphs" => args.no_graphs = true,
            other => match other.strip_prefix("--file=") {
                Some(path) if !path.is_empty() => args.file = Some(PathBuf::from(path)),
                _ => return Err(CliError::UnknownArgument(other.to_string())),
            },
        }
    }
    Ok(args)
}

impl Args {
    /// Pick the record source. `Ok(None)` means show the usage and stop.
    pub fn source(&self, configured: SourceKind) -> Result<Option<Source>, SyncError> {
        if let Some(path) = &self.file {
            return Ok(Some(Source::File(path.clone())));
        }
        match configured {
            SourceKind::Netdot => Ok(Some(Source::Netdot)),
            SourceKind::File if self.bare => Ok(None),
            SourceKind::File => Err(SyncError::MissingFileArgument),
        }
    }
}
