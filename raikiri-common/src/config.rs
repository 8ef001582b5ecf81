//! Configuration file location and layered value resolution

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory name used under the platform config dir
pub const CONFIG_DIR_NAME: &str = "raikiri";

/// Value resolution following the priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. Compiled default (fallback)
pub fn resolve_value<T: std::str::FromStr>(
    cli_arg: Option<T>,
    env_var_name: &str,
    file_value: Option<T>,
    default: T,
) -> T {
    // Priority 1: Command-line argument
    if let Some(value) = cli_arg {
        return value;
    }

    // Priority 2: Environment variable
    if let Ok(raw) = std::env::var(env_var_name) {
        match raw.parse::<T>() {
            Ok(value) => return value,
            Err(_) => warn!("Ignoring unparseable {}={:?}", env_var_name, raw),
        }
    }

    // Priority 3: TOML config file
    if let Some(value) = file_value {
        return value;
    }

    // Priority 4: Compiled default
    default
}

/// Find the config file for the platform
///
/// On Linux `~/.config/raikiri/<file_name>` is tried first, then
/// `/etc/raikiri/<file_name>`. Other platforms use the user config dir only.
pub fn locate_config_file(file_name: &str) -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(file_name));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(CONFIG_DIR_NAME).join(file_name);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Parse a TOML file into `T`
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    let value = toml::from_str(&content)?;
    debug!("Loaded config file {}", path.display());
    Ok(value)
}

/// Load `T` from an explicit path, the platform location, or defaults
///
/// A missing file is not an error; a file that exists but fails to parse is.
pub fn load_or_default<T: DeserializeOwned + Default>(
    explicit: Option<&Path>,
    file_name: &str,
) -> Result<T> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return load_toml(path);
    }

    match locate_config_file(file_name) {
        Some(path) => load_toml(&path),
        None => {
            debug!("No {} found, using compiled defaults", file_name);
            Ok(T::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serial_test::serial;
    use std::io::Write;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Sample {
        #[serde(default)]
        name: String,
        #[serde(default)]
        port: u16,
    }

    #[test]
    #[serial]
    fn test_cli_beats_env_beats_file() {
        std::env::set_var("RAIKIRI_TEST_PORT", "7000");
        assert_eq!(resolve_value(Some(8000u16), "RAIKIRI_TEST_PORT", Some(9000), 1), 8000);
        assert_eq!(resolve_value(None, "RAIKIRI_TEST_PORT", Some(9000u16), 1), 7000);
        std::env::remove_var("RAIKIRI_TEST_PORT");
        assert_eq!(resolve_value(None, "RAIKIRI_TEST_PORT", Some(9000u16), 1), 9000);
        assert_eq!(resolve_value::<u16>(None, "RAIKIRI_TEST_PORT", None, 1), 1);
    }

    #[test]
    #[serial]
    fn test_unparseable_env_falls_through() {
        std::env::set_var("RAIKIRI_TEST_BAD", "not-a-number");
        assert_eq!(resolve_value(None, "RAIKIRI_TEST_BAD", Some(42u16), 1), 42);
        std::env::remove_var("RAIKIRI_TEST_BAD");
    }

    #[test]
    fn test_load_toml_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name = \"living-room\"\nport = 5050").unwrap();

        let sample: Sample = load_or_default(Some(file.path()), "unused.toml").unwrap();
        assert_eq!(sample.name, "living-room");
        assert_eq!(sample.port, 5050);
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let result: Result<Sample> =
            load_or_default(Some(Path::new("/nonexistent/raikiri.toml")), "unused.toml");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_toml_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();

        let result: Result<Sample> = load_toml(file.path());
        assert!(matches!(result, Err(Error::Toml(_))));
    }
}
