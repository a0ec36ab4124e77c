use std::sync::Arc;
use std::time::Duration;
use std::{env, fs};

use anyhow::Context;
use scylla::client::caching_session::CachingSession;
use serde::Deserialize;

use crate::constants::CONNECTION_TIMEOUT_SECS;
use crate::context::RequestContext;
use crate::db::Resource;
use crate::repositories::{Repositories, RepositoryConfig};

fn default_connection_timeout_secs() -> u64 {
    CONNECTION_TIMEOUT_SECS
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ScyllaConfig {
    pub hosts: Vec<String>,
    pub keyspace: String,

    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,
}

/// Contents of `config.{ENV}.toml`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub scylla: ScyllaConfig,

    #[serde(default)]
    pub repositories: RepositoryConfig,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let env = env::var("ENV").context("ENV must be set")?;
        let config_file = format!("config.{}.toml", env);
        let contents = fs::read_to_string(&config_file).with_context(|| format!("Unable to read {}", config_file))?;

        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).context("Unable to parse TOML")
    }
}

pub struct App<S = CachingSession> {
    pub config: Config,
    pub db_session: Arc<S>,
    pub repositories: Arc<Repositories<S>>,
}

impl<S> Clone for App<S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            db_session: self.db_session.clone(),
            repositories: self.repositories.clone(),
        }
    }
}

impl App {
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::load()?;
        let db_session = CachingSession::init_resource(&config.scylla)
            .await
            .context("Unable to initialize scylla session")?;

        Ok(Self::from_session(config, Arc::new(db_session)))
    }
}

impl<S> App<S> {
    pub fn from_session(config: Config, db_session: Arc<S>) -> Self {
        let repositories = Repositories::new(db_session.clone(), &config.repositories);

        Self {
            config,
            db_session,
            repositories: Arc::new(repositories),
        }
    }

    pub fn init_logger() {
        let env = env_logger::Env::new().default_filter_or("info");

        if env_logger::try_init_from_env(env).is_err() {
            log::debug!("logger already initialized");
        }
    }

    /// Fresh context for one request, bounded by `statement_timeout_ms` when configured.
    pub fn request_context(&self) -> RequestContext {
        match self.config.repositories.statement_timeout_ms {
            Some(ms) => RequestContext::with_timeout(Duration::from_millis(ms)),
            None => RequestContext::new(),
        }
    }
}
