//! Server configuration, read from a TOML file

use anyhow::Context;
use dropshot::ConfigDropshot;
use dropshot::ConfigLogging;
use dropshot::ConfigLoggingIfExists;
use dropshot::ConfigLoggingLevel;
use serde::Deserialize;
use serde::Deserializer;
use std::net::SocketAddr;
use std::path::Path;

pub const DEFAULT_DATABASE_URL: &str =
    "postgresql://root@127.0.0.1:12345/defaultdb?sslmode=disable";

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(
        default = "default_dropshot",
        deserialize_with = "deserialize_dropshot"
    )]
    pub dropshot: ConfigDropshot,
    #[serde(default = "default_logging")]
    pub log: ConfigLogging,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Where the counter lives
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    Postgres {
        url: String,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
    /// Kept in process; lost when the server exits.
    Memory,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Postgres {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_dropshot() -> ConfigDropshot {
    ConfigDropshot {
        bind_address: SocketAddr::from(([127, 0, 0, 1], 12344)),
        ..Default::default()
    }
}

/// The `[dropshot]` section.  Fields left out keep the values from
/// `default_dropshot()`, not Dropshot's own defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DropshotSection {
    bind_address: Option<SocketAddr>,
    request_body_max_bytes: Option<usize>,
}

fn deserialize_dropshot<'de, D>(
    deserializer: D,
) -> Result<ConfigDropshot, D::Error>
where
    D: Deserializer<'de>,
{
    let section = DropshotSection::deserialize(deserializer)?;
    let mut config = default_dropshot();
    if let Some(bind_address) = section.bind_address {
        config.bind_address = bind_address;
    }
    if let Some(request_body_max_bytes) = section.request_body_max_bytes {
        config.request_body_max_bytes = request_body_max_bytes;
    }
    Ok(config)
}

fn default_logging() -> ConfigLogging {
    ConfigLogging::File {
        level: ConfigLoggingLevel::Debug,
        path: "/dev/stdout".into(),
        if_exists: ConfigLoggingIfExists::Append,
    }
}

fn default_max_connections() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dropshot: default_dropshot(),
            log: default_logging(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Config::from_toml(&contents)
            .with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Config> {
        toml::from_str(contents).context("invalid configuration")
    }
}

#[cfg(test)]
mod test {
    use super::Config;
    use super::StorageConfig;
    use dropshot::ConfigLogging;
    use dropshot::ConfigLoggingLevel;
    use std::net::SocketAddr;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(
            config.dropshot.bind_address,
            "127.0.0.1:12344".parse::<SocketAddr>().unwrap()
        );
        assert!(matches!(config.log, ConfigLogging::File { .. }));
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml(
            r#"
            [dropshot]
            bind_address = "0.0.0.0:8080"
            request_body_max_bytes = 1024

            [log]
            mode = "stderr-terminal"
            level = "info"

            [storage]
            backend = "postgres"
            url = "postgresql://counter@db:5432/counter"
            max_connections = 4
            "#,
        )
        .unwrap();
        assert_eq!(
            config.dropshot.bind_address,
            "0.0.0.0:8080".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(config.dropshot.request_body_max_bytes, 1024);
        assert!(matches!(
            config.log,
            ConfigLogging::StderrTerminal { level: ConfigLoggingLevel::Info }
        ));
        assert_eq!(
            config.storage,
            StorageConfig::Postgres {
                url: String::from("postgresql://counter@db:5432/counter"),
                max_connections: 4,
            }
        );
    }

    #[test]
    fn test_memory_storage() {
        let config = Config::from_toml(
            r#"
            [storage]
            backend = "memory"
            "#,
        )
        .unwrap();
        assert_eq!(config.storage, StorageConfig::Memory);
    }

    #[test]
    fn test_bad_config() {
        let error = Config::from_toml(
            r#"
            [storage]
            backend = "sqlite"
            "#,
        )
        .unwrap_err();
        assert!(format!("{:#}", error).starts_with("invalid configuration"));
    }

    #[test]
    fn test_partial_dropshot_section() {
        let config = Config::from_toml(
            r#"
            [dropshot]
            request_body_max_bytes = 4096
            "#,
        )
        .unwrap();
        assert_eq!(
            config.dropshot.bind_address,
            "127.0.0.1:12344".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(config.dropshot.request_body_max_bytes, 4096);

        let default_max = super::default_dropshot().request_body_max_bytes;
        let config = Config::from_toml(
            r#"
            [dropshot]
            bind_address = "0.0.0.0:9000"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.dropshot.bind_address,
            "0.0.0.0:9000".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(config.dropshot.request_body_max_bytes, default_max);
    }

    #[test]
    fn test_unknown_dropshot_field() {
        assert!(Config::from_toml(
            r#"
            [dropshot]
            bind_addr = "0.0.0.0:9000"
            "#,
        )
        .is_err());
    }

    #[test]
    fn test_example_config() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("counter.example.toml");
        let config = Config::from_file(&path).unwrap();
        assert_eq!(
            config.dropshot.bind_address,
            "127.0.0.1:12344".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(config.dropshot.request_body_max_bytes, 1024);
        assert!(matches!(
            config.log,
            ConfigLogging::File { level: ConfigLoggingLevel::Debug, .. }
        ));
        assert_eq!(config.storage, StorageConfig::default());
    }
}
