use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "joinfutbol", about = "Soccer match booking and social server")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Create the demo accounts, venue and match on start
    #[arg(long)]
    pub seed_demo: bool,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
    /// Insert demo accounts and a sample match on start. The demo
    /// password is public, so this stays off unless asked for.
    pub seed_demo: bool,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub session_hours: u64,
    pub bcrypt_cost: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            seed_demo: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "joinfutbol_session".to_string(),
            session_hours: 168,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if cli.seed_demo {
            config.database.seed_demo = true;
        }

        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("joinfutbol.db"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".joinfutbol")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("joinfutbol.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_for(data_dir: PathBuf) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(data_dir),
            seed_demo: false,
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.cookie_name, "joinfutbol_session");
        assert_eq!(config.auth.session_hours, 7 * 24);
        assert_eq!(config.auth.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert!(!config.database.seed_demo);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli_for(PathBuf::from("/tmp/test-joinfutbol"));
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-joinfutbol"));
    }

    #[test]
    fn data_dir_defaults_to_home_dot_joinfutbol() {
        let cli = Cli {
            config: None,
            host: None,
            port: None,
            data_dir: None,
            seed_demo: false,
        };
        assert!(Config::data_dir(&cli).ends_with(".joinfutbol"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli_for(tmp.path().to_path_buf())).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.db_path(), tmp.path().join("joinfutbol.db"));
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
port = 9000

[database]
seed_demo = true

[auth]
cookie_name = "my_cookie"
session_hours = 24
bcrypt_cost = 4
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            ..cli_for(tmp.path().to_path_buf())
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert!(config.database.seed_demo);
        assert_eq!(config.auth.cookie_name, "my_cookie");
        assert_eq!(config.auth.session_hours, 24);
        assert_eq!(config.auth.bcrypt_cost, 4);
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: Some("10.0.0.1".to_string()),
            port: Some(4000),
            data_dir: Some(tmp.path().to_path_buf()),
            seed_demo: false,
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn demo_seed_is_opt_in() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli_for(tmp.path().to_path_buf())).unwrap();
        assert!(!config.database.seed_demo);

        let cli = Cli::parse_from([
            "joinfutbol",
            "--seed-demo",
            "--data-dir",
            tmp.path().to_str().unwrap(),
        ]);
        assert!(cli.seed_demo);
        assert!(Config::load(&cli).unwrap().database.seed_demo);
    }
}
