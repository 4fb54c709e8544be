//! `fuelwatch config` - inspect and edit the INI settings file.

use std::io::{self, Write};
use std::path::Path;

use clap::Subcommand;
use fuelwatch::config::{config_file_path, display_value, ConfigFile, ConfigKey};

use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print one value, addressed as section.key (e.g. report.format)
    Get { key: String },

    /// Validate and store one value; an empty value clears optional keys
    Set { key: String, value: String },

    /// Print every setting, marking values that differ from the defaults
    List,

    /// Print where the settings file lives
    Path,
}

impl ConfigCommands {
    /// Execute against the settings file at `path`, printing to `out`.
    pub fn execute(self, path: &Path, out: &mut impl Write) -> Result<(), CliError> {
        match self {
            ConfigCommands::Get { key } => {
                let key: ConfigKey = key.parse()?;
                let config = ConfigFile::load_from(path)?;
                writeln!(out, "{}", display_value(key.get(&config)))?;
            }
            ConfigCommands::Set { key, value } => {
                let key: ConfigKey = key.parse()?;
                let mut config = ConfigFile::load_from(path)?;
                key.set(&mut config, &value)?;
                config.save_to(path)?;

                let stored = display_value(key.get(&config));
                if key.is_default(&config) {
                    writeln!(out, "{} = {} (default)", key, stored)?;
                } else {
                    writeln!(out, "{} = {}", key, stored)?;
                }
            }
            ConfigCommands::List => {
                let config = ConfigFile::load_from(path)?;
                if !path.exists() {
                    writeln!(out, "# {} (not created, showing defaults)", path.display())?;
                } else {
                    writeln!(out, "# {}", path.display())?;
                }
                write!(out, "{}", config.listing())?;
            }
            ConfigCommands::Path => writeln!(out, "{}", path.display())?,
        }
        Ok(())
    }
}

/// Run a config subcommand against the user's settings file.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    command.execute(&config_file_path(), &mut io::stdout().lock())
}
