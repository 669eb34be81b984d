use std::path::PathBuf;

use clap::Parser;
use tinydconf::{Client, KeyfileBackend, Path};

mod commands;

use commands::{CliError, Command};

/// tinydconf - read dconf settings from a keyfile database
#[derive(Parser, Debug)]
#[command(name = "tinydconf")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Keyfile to read [default: <config dir>/tinydconf/user.ini]
    #[arg(long, global = true)]
    keyfile: Option<PathBuf>,

    /// Directory the keyfile's groups live under
    #[arg(long, global = true, default_value = "/")]
    base: String,

    #[command(subcommand)]
    command: Command,
}

fn default_keyfile() -> Result<PathBuf, CliError> {
    let dir = dirs::config_dir().ok_or(CliError::NoConfigDir)?;
    Ok(dir.join("tinydconf").join("user.ini"))
}

fn run(args: Args) -> Result<(), CliError> {
    let keyfile = match args.keyfile {
        Some(file) => file,
        None => default_keyfile()?,
    };
    let base = Path::dir(&args.base)?;
    log::debug!("Using keyfile {} below {}", keyfile.display(), base);

    let mut client = Client::new(KeyfileBackend::open(keyfile, base)?);
    let stdout = std::io::stdout();
    commands::execute(&args.command, &mut client, &mut stdout.lock())
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}
