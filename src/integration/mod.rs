use std::env;
use std::fs::File;
use std::str::FromStr;
use std::time::Duration;

use dotenv::dotenv;
use log::{LevelFilter, warn};
use simplelog::{ColorChoice, CombinedLogger, SharedLogger, TermLogger, TerminalMode, WriteLogger};

pub mod idp;
pub mod memory;
pub mod store;
pub mod upload;

pub type Result<T> = std::result::Result<T, Error>;

const DEFAULT_FEED_LIMIT: usize = 50;

#[derive(Clone)]
pub struct Config {
    pub log_level: LevelFilter,
    pub log_file: Option<String>,
    pub feed_limit: usize,

    pub upload: upload::Config,
}

impl Default for Config {
    fn default() -> Self {
        dotenv().ok();

        let rust_log = env::var("RUST_LOG").unwrap_or("info".into());
        let log_level = LevelFilter::from_str(&rust_log).unwrap_or(LevelFilter::Info);

        let feed_limit = env::var("FEED_LIMIT")
            .ok()
            .and_then(|l| l.parse().ok())
            .unwrap_or(DEFAULT_FEED_LIMIT);

        Self {
            log_level,
            log_file: env::var("LOG_FILE").ok(),
            feed_limit,
            upload: upload::Config::env().unwrap_or_default(),
        }
    }
}

impl Config {
    pub fn init_logger(&self) -> Result<()> {
        let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
            self.log_level,
            simplelog::Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        )];

        if let Some(path) = &self.log_file {
            match File::create(path) {
                Ok(file) => loggers.push(WriteLogger::new(
                    self.log_level,
                    simplelog::Config::default(),
                    file,
                )),
                Err(e) => warn!("could not create log file {path}: {e}"),
            }
        }

        CombinedLogger::init(loggers).map_err(|_| Error::LoggerAlreadySet)
    }
}

pub fn init_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(2))
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(Error::from)
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("document not found: {0}/{1}")]
    NotFound(String, String),
    #[error("could not decode {collection}/{id}: {source}")]
    Decode {
        collection: String,
        id: String,
        source: serde_json::Error,
    },
    #[error("could not encode document: {0}")]
    Encode(serde_json::Error),
    #[error("query on '{0}' requires a composite index on {1:?}")]
    IndexRequired(String, Vec<String>),
    #[error("field '{0}' is not of type {1}")]
    FieldType(String, &'static str),
    #[error("image upload failed")]
    UploadFailed,
    #[error("logger is already initialized")]
    LoggerAlreadySet,

    #[error(transparent)]
    _Env(#[from] env::VarError),
    #[error(transparent)]
    _Url(#[from] url::ParseError),
    #[error(transparent)]
    _Reqwest(#[from] reqwest::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_name_expected_field_type() {
        let err = Error::FieldType("<root>".into(), "object");

        assert_eq!(err.to_string(), "field '<root>' is not of type object");
    }
}
