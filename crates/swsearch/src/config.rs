//! Configuration loading.
//!
//! Defaults live in code and match the upstream service's documented search
//! parameters; an optional `config/settings.*` file and `SWSEARCH__`-prefixed
//! environment variables override them. Loaded once at startup and read-only
//! thereafter.

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use crate::client::SearchConfig;

const CONFIG_FILE: &str = "config/settings";

pub const DEFAULT_BASE_URL: &str = "https://sw.docking.org";

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error(transparent)]
    Build(#[from] config::ConfigError),
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub search: SearchConfig,
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    pub workers: usize,
    pub channel_capacity: usize,
}

pub fn load() -> Result<AppConfig, AppConfigError> {
    let search = SearchConfig::default();
    let builder = Config::builder()
        .set_default("api.base_url", DEFAULT_BASE_URL)?
        .set_default("search.db", search.db)?
        .set_default("search.dist", i64::from(search.dist))?
        .set_default("search.sdist", i64::from(search.sdist))?
        .set_default("search.tdn", i64::from(search.tdn))?
        .set_default("search.tup", i64::from(search.tup))?
        .set_default("search.rdn", i64::from(search.rdn))?
        .set_default("search.rup", i64::from(search.rup))?
        .set_default("search.ldn", i64::from(search.ldn))?
        .set_default("search.lup", i64::from(search.lup))?
        .set_default("search.maj", i64::from(search.maj))?
        .set_default("search.min", i64::from(search.min))?
        .set_default("search.sub", i64::from(search.sub))?
        .set_default("search.scores", search.scores)?
        .set_default("runtime.workers", 10_i64)?
        .set_default("runtime.channel_capacity", 64_i64)?
        .add_source(File::with_name(CONFIG_FILE).required(false))
        .add_source(Environment::with_prefix("SWSEARCH").separator("__"));

    let cfg = builder.build()?.try_deserialize()?;
    Ok(cfg)
}
