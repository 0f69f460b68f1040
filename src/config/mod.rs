pub mod run_options;

use crate::{error::AppError, mqtt::session::ReconnectPolicy};
use run_options::Args;
use serde::Deserialize;
use std::{
    env, fmt, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

pub const CONFIG_FILE: &str = "./bomba.toml";

pub const DB_HOST: &str = "DB_HOST";
pub const DB_USER: &str = "DB_USUARIO";
pub const DB_PASSWORD: &str = "DB_CONTRASENA";
pub const DB_NAME: &str = "DB_NOMBRE";
pub const MQTT_BROKER: &str = "MQTT_BROKER";
pub const MQTT_PORT: &str = "MQTT_PUERTO";

/// Store location and credentials. Only ever filled from the environment.
pub struct Database {
    pub host: String,
    pub user: String,
    pub password: String,
    pub name: String,
}

impl Database {
    /// SQLite file backing the store: `<DB_HOST>/<DB_NOMBRE>.db`.
    pub fn path(&self) -> PathBuf {
        Path::new(&self.host).join(format!("{}.db", self.name))
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("name", &self.name)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Mqtt {
    pub broker: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive_secs: u64,
    pub reconnect_initial_ms: u64,
    pub reconnect_max_secs: u64,
    /// 0 keeps retrying forever
    pub reconnect_give_up_secs: u64,
}

impl Default for Mqtt {
    fn default() -> Self {
        Self {
            broker: "localhost".to_owned(),
            port: 1883,
            client_id: "bomba_agua_cliente".to_owned(),
            keep_alive_secs: 60,
            reconnect_initial_ms: 500,
            reconnect_max_secs: 30,
            reconnect_give_up_secs: 300,
        }
    }
}

impl Mqtt {
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            initial: Duration::from_millis(self.reconnect_initial_ms),
            max_interval: Duration::from_secs(self.reconnect_max_secs),
            give_up_after: (self.reconnect_give_up_secs > 0).then(|| Duration::from_secs(self.reconnect_give_up_secs)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebServer {
    pub address: String,
}

impl Default for WebServer {
    fn default() -> Self {
        Self { address: "0.0.0.0:5000".to_owned() }
    }
}

impl WebServer {
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        self.address
            .parse()
            .map_err(|e| AppError::ConfigError(format!("invalid web server address '{}': {}", self.address, e)))
    }
}

/// Tunables that may come from the optional TOML file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub mqtt: Mqtt,
    pub web_server: WebServer,
}

impl FileConfig {
    pub fn load_from_str(config_str: &str) -> Result<Self, AppError> {
        toml::from_str(config_str).map_err(|e| AppError::ConfigError(format!("unable to parse config: {}", e)))
    }
}

#[derive(Debug)]
pub struct Config {
    pub database: Database,
    pub mqtt: Mqtt,
    pub web_server: WebServer,
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, AppError> {
        let file = match &args.cfg_file {
            Some(path) => FileConfig::load_from_str(&fs::read_to_string(path)?)?,
            None => FileConfig::default(),
        };
        Self::from_env(file, |key| env::var(key).ok())
    }

    /// Overlays environment values on `file`. Empty values count as missing; every
    /// missing required key is reported at once.
    pub fn from_env<F>(file: FileConfig, var: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let required = [DB_HOST, DB_USER, DB_PASSWORD, DB_NAME];
        let missing: Vec<&str> = required.iter().copied().filter(|key| lookup(*key).is_none()).collect();
        if !missing.is_empty() {
            return Err(AppError::ConfigError(format!(
                "missing database environment variables: {}",
                missing.join(", ")
            )));
        }

        let database = Database {
            host: lookup(DB_HOST).unwrap_or_default(),
            user: lookup(DB_USER).unwrap_or_default(),
            password: lookup(DB_PASSWORD).unwrap_or_default(),
            name: lookup(DB_NAME).unwrap_or_default(),
        };

        let mut mqtt = file.mqtt;
        if let Some(broker) = lookup(MQTT_BROKER) {
            mqtt.broker = broker;
        }
        if let Some(port) = lookup(MQTT_PORT) {
            mqtt.port = port
                .trim()
                .parse()
                .map_err(|_| AppError::ConfigError(format!("{} is not a valid port: '{}'", MQTT_PORT, port)))?;
        }

        Ok(Config { database, mqtt, web_server: file.web_server })
    }
}
