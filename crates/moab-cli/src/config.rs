//! Operator settings – `~/.moab/config.toml` plus `MOAB_*` overrides.
//!
//! Layers, lowest to highest priority:
//!
//! 1. Built-in defaults ([`Settings::default`]).
//! 2. The config file.
//! 3. `MOAB_*` environment variables ([`apply_env_overrides`]).
//! 4. Command-line flags (applied by `main`).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use moab_controllers::PidGains;
use moab_runtime::RunConfig;
use moab_types::MoabError;
use tracing::warn;

/// Persisted run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Controller to run when `--controller` is not given.
    #[serde(default = "default_controller")]
    pub controller: String,

    /// Control frequency in Hz.
    #[serde(default = "default_frequency")]
    pub frequency: u32,

    /// Largest plate tilt a controller may request, in degrees.
    #[serde(default = "default_max_angle")]
    pub max_angle: f32,

    /// Local port of the inference service used by `brain`.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on one inference round-trip.  Unset means half the
    /// control period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_timeout_ms: Option<u64>,

    #[serde(default)]
    pub pid: PidGains,
}

fn default_controller() -> String {
    "pid".to_string()
}
fn default_frequency() -> u32 {
    30
}
fn default_max_angle() -> f32 {
    16.0
}
fn default_port() -> u16 {
    5000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            controller: default_controller(),
            frequency: default_frequency(),
            max_angle: default_max_angle(),
            port: default_port(),
            inference_timeout_ms: None,
            pid: PidGains::default(),
        }
    }
}

impl Settings {
    /// Runtime configuration for these settings.
    pub fn to_run_config(&self, debug: bool) -> RunConfig {
        let mut run = RunConfig::new(
            &self.controller,
            self.frequency,
            self.max_angle,
            RunConfig::endpoint_for_port(self.port),
        );
        run.debug = debug;
        run.pid_gains = self.pid;
        run.inference_timeout = self.inference_timeout_ms.map(Duration::from_millis);
        run
    }
}

/// Return the path to `~/.moab/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".moab").join("config.toml")
}

/// Load settings from `path`.  Returns `None` if the file does not exist.
///
/// # Errors
///
/// [`MoabError::InvalidConfig`] when the file cannot be read or parsed.
pub fn load_from(path: &Path) -> Result<Option<Settings>, MoabError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        MoabError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
    })?;
    let settings = toml::from_str(&raw).map_err(|e| {
        MoabError::InvalidConfig(format!("failed to parse {}: {e}", path.display()))
    })?;
    Ok(Some(settings))
}

/// Apply `MOAB_*` environment variable overrides to `settings`.
///
/// | Variable | Setting |
/// |---|---|
/// | `MOAB_CONTROLLER` | `controller` |
/// | `MOAB_FREQUENCY` | `frequency` |
/// | `MOAB_MAX_ANGLE` | `max_angle` |
/// | `MOAB_PORT` | `port` |
///
/// Values that do not parse are ignored with a warning.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides(settings, |key| std::env::var(key).ok());
}

pub(crate) fn apply_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("MOAB_CONTROLLER") {
        settings.controller = v;
    }
    if let Some(v) = lookup("MOAB_FREQUENCY") {
        match v.parse() {
            Ok(hz) => settings.frequency = hz,
            Err(_) => warn!(value = %v, "ignoring MOAB_FREQUENCY: not a whole number of Hz"),
        }
    }
    if let Some(v) = lookup("MOAB_MAX_ANGLE") {
        match v.parse() {
            Ok(deg) => settings.max_angle = deg,
            Err(_) => warn!(value = %v, "ignoring MOAB_MAX_ANGLE: not a number of degrees"),
        }
    }
    if let Some(v) = lookup("MOAB_PORT") {
        match v.parse() {
            Ok(port) => settings.port = port,
            Err(_) => warn!(value = %v, "ignoring MOAB_PORT: not a valid port"),
        }
    }
}

/// Save settings to `path`, creating the parent directory if necessary.
///
/// # Errors
///
/// [`MoabError::InvalidConfig`] when the directory or file cannot be
/// written.
pub fn save_to(settings: &Settings, path: &Path) -> Result<(), MoabError> {
    let io_err =
        |what: &str, e: std::io::Error| MoabError::InvalidConfig(format!("{what}: {e}"));

    if let Some(parent) = path.parent() {
        ensure_parent(parent)?;
    }
    let raw = toml::to_string_pretty(settings)
        .map_err(|e| MoabError::InvalidConfig(format!("failed to serialize settings: {e}")))?;

    // Owner read/write (rw-------) on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| io_err(&format!("failed to write {}", path.display()), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(|e| io_err(&format!("failed to write {}", path.display()), e))?;
    Ok(())
}

/// Create `parent` if it is missing.  Only a directory created here is
/// restricted to the owner; existing directories and the empty parent of a
/// bare file name are left alone.
fn ensure_parent(parent: &Path) -> Result<(), MoabError> {
    if parent.as_os_str().is_empty() || parent.exists() {
        return Ok(());
    }
    fs::create_dir_all(parent).map_err(|e| {
        MoabError::InvalidConfig(format!("failed to create config directory: {e}"))
    })?;
    // Owner only (rwx------) on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
            MoabError::InvalidConfig(format!("failed to set config directory permissions: {e}"))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_documented_values() {
        let s = Settings::default();
        assert_eq!(s.controller, "pid");
        assert_eq!(s.frequency, 30);
        assert_eq!(s.max_angle, 16.0);
        assert_eq!(s.port, 5000);
        assert_eq!(s.inference_timeout_ms, None);
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Settings::default(), &path).expect("save");

        let file_mode = std::fs::metadata(&path).expect("file").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = std::fs::metadata(path.parent().unwrap())
            .expect("dir")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[cfg(unix)]
    #[test]
    fn existing_directory_keeps_its_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o755)).unwrap();

        save_to(&Settings::default(), &dir.path().join("moab.toml")).expect("save");

        let dir_mode = std::fs::metadata(dir.path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o755);
        assert!(load_from(&dir.path().join("moab.toml")).unwrap().is_some());
    }

    #[test]
    fn bare_file_name_needs_no_parent_directory() {
        let path = Path::new("moab.toml");
        let parent = path.parent().expect("bare names have an empty parent");
        assert!(parent.as_os_str().is_empty());
        assert!(ensure_parent(parent).is_ok());
    }

    #[test]
    fn roundtrip_custom_settings() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let mut settings = Settings::default();
        settings.controller = "brain".to_string();
        settings.port = 6001;
        settings.inference_timeout_ms = Some(12);
        settings.pid.kp = 60.0;
        save_to(&settings, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, settings);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "frequency = 60\n\n[pid]\nkd = 30.0\n").unwrap();

        let loaded = load_from(&path).unwrap().unwrap();
        assert_eq!(loaded.frequency, 60);
        assert_eq!(loaded.controller, "pid");
        assert_eq!(loaded.pid.kd, 30.0);
        assert_eq!(loaded.pid.kp, PidGains::default().kp);
    }

    #[test]
    fn malformed_file_is_invalid_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "frequency = \"fast\"\n").unwrap();

        let err = load_from(&path).unwrap_err();
        assert!(matches!(err, MoabError::InvalidConfig(_)));
        assert!(err.is_usage_error());
    }

    #[test]
    fn config_path_points_to_moab_dir() {
        let p = config_path_for_home("/home/operator");
        assert_eq!(p, PathBuf::from("/home/operator/.moab/config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut s = Settings::default();
        apply_overrides(
            &mut s,
            lookup(&[
                ("MOAB_CONTROLLER", "manual"),
                ("MOAB_FREQUENCY", "50"),
                ("MOAB_MAX_ANGLE", "10.5"),
                ("MOAB_PORT", "7000"),
            ]),
        );
        assert_eq!(s.controller, "manual");
        assert_eq!(s.frequency, 50);
        assert_eq!(s.max_angle, 10.5);
        assert_eq!(s.port, 7000);
    }

    #[test]
    fn env_overrides_ignore_unparsable_values() {
        let mut s = Settings::default();
        apply_overrides(
            &mut s,
            lookup(&[("MOAB_FREQUENCY", "fast"), ("MOAB_PORT", "99999")]),
        );
        assert_eq!(s.frequency, 30);
        assert_eq!(s.port, 5000);
    }

    #[test]
    fn run_config_carries_every_setting() {
        let mut s = Settings::default();
        s.controller = "brain".to_string();
        s.port = 6000;
        s.inference_timeout_ms = Some(8);
        let run = s.to_run_config(true);
        assert_eq!(run.controller, "brain");
        assert_eq!(run.endpoint, "http://localhost:6000");
        assert_eq!(run.inference_timeout, Some(Duration::from_millis(8)));
        assert!(run.debug);
    }
}
