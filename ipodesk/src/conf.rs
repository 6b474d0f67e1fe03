use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SiteConf {
    pub host: String,

    pub port: u16,

    /// `memory://` or a `postgres://` url. `?max=` and `?min=` size the pool.
    pub database: String,

    /// Touching this file shuts the server down so a supervisor can restart it.
    pub touch_reload: Option<String>,

    pub log_format: LogFormat,

    pub log_init: bool,
}

impl Default for SiteConf {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            database: "memory://".to_string(),
            touch_reload: None,
            log_format: LogFormat::Text,
            log_init: true,
        }
    }
}

impl SiteConf {
    /// Site backed by the in-memory store, without touching the environment.
    pub fn memory() -> Self {
        Self {
            log_init: false,
            ..Default::default()
        }
    }

    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        #[cfg(test)]
        {
            dotenvy::from_filename_override(".env.test").ok();
        }

        #[cfg(all(debug_assertions, not(test)))]
        {
            dotenvy::from_filename_override(".env.dev").ok();
        }

        #[cfg(not(any(debug_assertions, test)))]
        {
            dotenvy::from_filename_override(".env.prod").ok();
        }

        let defaults = Self::default();
        let database = std::env::var("DATABASE_URL").unwrap_or(defaults.database);
        let host = std::env::var("HOST").unwrap_or(defaults.host);
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        let touch_reload = std::env::var("TOUCH_RELOAD").ok().filter(|p| !p.is_empty());
        let log_format = std::env::var("LOG_FORMAT")
            .ok()
            .and_then(|f| f.parse().ok())
            .unwrap_or_default();

        Self {
            host,
            port,
            database,
            touch_reload,
            log_format,
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().ok(), Some(LogFormat::Json));
        assert_eq!("text".parse::<LogFormat>().ok(), Some(LogFormat::Text));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn memory_conf_skips_logging_init() {
        let conf = SiteConf::memory();
        assert_eq!(conf.database, "memory://");
        assert!(!conf.log_init);
    }
}
