//! Command execution.
//!
//! Commands:
//! - `list DIR` - Print the children of a directory, one per line
//! - `read KEY [--raw]` - Print a value as JSON, or as GVariant text
//! - `dump DIR` - Print every value below a directory as one JSON object

use std::io::Write;

use clap::Subcommand;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tinydconf::{Backend, Client, KeyfileError, Path, PathError, Value};

/// Exit status for values with no host representation.
pub const EXIT_TYPE_ERROR: i32 = 3;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the keys and sub-directories of a directory
    List {
        /// Directory path, ending in '/'
        dir: String,
    },

    /// Read one key; prints nothing if the key is unset
    Read {
        /// Key path
        key: String,

        /// Print the stored GVariant text instead of JSON
        #[arg(long)]
        raw: bool,
    },

    /// Read every key below a directory
    Dump {
        /// Directory path, ending in '/'
        dir: String,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Client(#[from] tinydconf::Error),

    #[error("{0}")]
    Keyfile(#[from] KeyfileError),

    #[error("invalid --base: {0}")]
    Base(#[from] PathError),

    #[error("cannot serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("no configuration directory found; pass --keyfile")]
    NoConfigDir,
}

impl CliError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Client(e) if e.is_type_error() => EXIT_TYPE_ERROR,
            _ => 1,
        }
    }
}

/// Dump entries as a JSON object, in walk order.
struct Dump<'a>(&'a [(Path, Value)]);

impl Serialize for Dump<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Run one command against `client`, writing its output to `out`.
pub fn execute<B: Backend, W: Write>(
    command: &Command,
    client: &mut Client<B>,
    out: &mut W,
) -> Result<(), CliError> {
    match command {
        Command::List { dir } => {
            for name in client.list(dir)? {
                writeln!(out, "{}", name)?;
            }
        }
        Command::Read { key, raw: true } => {
            if let Some(variant) = client.read_variant(key)? {
                writeln!(out, "{}", variant)?;
            }
        }
        Command::Read { key, raw: false } => {
            if let Some(value) = client.read(key)? {
                serde_json::to_writer(&mut *out, &value)?;
                writeln!(out)?;
            }
        }
        Command::Dump { dir } => {
            let entries = client.dump(dir)?;
            serde_json::to_writer_pretty(&mut *out, &Dump(&entries))?;
            writeln!(out)?;
        }
    }
    Ok(())
}
