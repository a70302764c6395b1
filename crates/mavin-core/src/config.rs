use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_LOCAL_MAVIN_ROOT: &str = r"C:\VisionPC\Bin\MAVIN";
pub const DEFAULT_REMOTE_ROOT_TEMPLATE: &str = r"\\{host}\C$\VisionPC\Bin\MAVIN";
pub const DEFAULT_FINDER_DRIVE: &str = "E";
pub const DEFAULT_FINDER_SUB_PATH: &str = r"Files\Image\JF2";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub local_mavin_root: String,
    /// `{host}` is replaced with the host's ip.
    pub remote_root_template: String,
    pub finder: FinderConfig,
    pub hosts: Vec<HostConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            local_mavin_root: DEFAULT_LOCAL_MAVIN_ROOT.to_string(),
            remote_root_template: DEFAULT_REMOTE_ROOT_TEMPLATE.to_string(),
            finder: FinderConfig::default(),
            hosts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FinderConfig {
    pub drive: String,
    pub sub_path: String,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            drive: DEFAULT_FINDER_DRIVE.to_string(),
            sub_path: DEFAULT_FINDER_SUB_PATH.to_string(),
        }
    }
}

/// A vision PC reachable over an administrative share.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HostConfig {
    pub key: String,
    #[serde(default)]
    pub line: String,
    #[serde(default)]
    pub polarity: String,
    pub ip: String,
}

impl HostConfig {
    pub fn mavin_root(&self, template: &str) -> PathBuf {
        PathBuf::from(template.replace("{host}", &self.ip))
    }

    pub fn model_folder(&self, template: &str, model: &str) -> PathBuf {
        self.mavin_root(template).join(model)
    }
}

impl AppConfig {
    pub fn local_mavin_root(&self) -> PathBuf {
        PathBuf::from(&self.local_mavin_root)
    }

    pub fn host(&self, key: &str) -> Option<&HostConfig> {
        self.hosts.iter().find(|h| h.key.eq_ignore_ascii_case(key))
    }

    fn normalize(mut self) -> Self {
        self.hosts.sort_by(|a, b| {
            (&a.line, &a.polarity, &a.key).cmp(&(&b.line, &b.polarity, &b.key))
        });
        self
    }
}

/// Load `Config.*` from the working directory, overridden by `MAVIN_*` env vars.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(env_source())
        .build()?;
    builder.try_deserialize::<AppConfig>().map(AppConfig::normalize)
}

/// Load an explicit configuration file, overridden by `MAVIN_*` env vars.
pub fn load_configuration_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::from(path).required(true))
        .add_source(env_source())
        .build()?;
    builder.try_deserialize::<AppConfig>().map(AppConfig::normalize)
}

fn env_source() -> Environment {
    Environment::with_prefix("MAVIN")
        .prefix_separator("_")
        .separator("__")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_file() {
        let config = AppConfig::default();
        assert_eq!(config.local_mavin_root, DEFAULT_LOCAL_MAVIN_ROOT);
        assert_eq!(config.finder.drive, "E");
        assert!(config.hosts.is_empty());
    }

    #[test]
    fn test_hosts_sorted_by_line_polarity_key() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("hosts.toml");
        fs::write(
            &path,
            r#"
[[hosts]]
key = "PC03"
line = "3-2"
polarity = "+"
ip = "10.0.0.3"

[[hosts]]
key = "PC02"
line = "3-1"
polarity = "-"
ip = "10.0.0.2"

[[hosts]]
key = "PC01"
line = "3-1"
polarity = "+"
ip = "10.0.0.1"
"#,
        )
        .unwrap();

        let config = load_configuration_from(&path).unwrap();
        let keys: Vec<&str> = config.hosts.iter().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["PC01", "PC02", "PC03"]);
        assert_eq!(config.remote_root_template, DEFAULT_REMOTE_ROOT_TEMPLATE);
        assert_eq!(config.host("pc02").map(|h| h.ip.as_str()), Some("10.0.0.2"));
    }

    #[test]
    fn test_remote_root_from_template() {
        let host = HostConfig {
            key: "PC01".to_string(),
            line: String::new(),
            polarity: String::new(),
            ip: "192.168.0.7".to_string(),
        };
        assert_eq!(
            host.mavin_root(DEFAULT_REMOTE_ROOT_TEMPLATE),
            PathBuf::from(r"\\192.168.0.7\C$\VisionPC\Bin\MAVIN")
        );
        assert_eq!(
            host.model_folder("/mnt/{host}/MAVIN", "Model_A"),
            PathBuf::from("/mnt/192.168.0.7/MAVIN/Model_A")
        );
    }
}
