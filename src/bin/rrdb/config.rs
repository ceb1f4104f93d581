// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Implements the configuration file.

use std::fmt;
use std::fs;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::Level::Debug;
use log::{debug, log_enabled, LevelFilter};
use paste::paste;
use serde::{de, Deserialize};

////////////////////////////////////////////////////////////////////////
// CONFIGURATION LOADING                                              //
////////////////////////////////////////////////////////////////////////

/// Loads the configuration from the file given by `path`, or returns
/// the default configuration if there is none.
pub fn load(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            let raw_config = fs::read(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_slice(&raw_config).context("failed to parse the configuration file")
        }
        None => Ok(Config::default()),
    }
}

/// Summarizes the configuration in the log, if the debug log level is
/// enabled.
pub fn log_summary(config: &Config, database: &Path) {
    if !log_enabled!(Debug) {
        // Don't compute the message if it will never be printed.
        return;
    }

    debug!(
        "Configuration loaded:\n\
         Database:         {}\n\
         Busy timeout:     {} ms\n\
         Bind address:     {}\n\
         Workers:          {}\n\
         Request timeout:  {} ms\n\
         Idle timeout:     {} ms",
        database.display(),
        config.busy_timeout_ms,
        config.serve.bind,
        config.serve.workers,
        config.serve.request_timeout_ms,
        config.serve.idle_timeout_ms,
    );
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION FILE STRUCTURE                                       //
////////////////////////////////////////////////////////////////////////

/// The complete configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_database")]
    pub database: PathBuf,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    pub log_level: Option<ConfigLevelFilter>,
    #[serde(default)]
    pub serve: ServeConfig,
}

impl Config {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            busy_timeout_ms: default_busy_timeout_ms(),
            log_level: None,
            serve: ServeConfig::default(),
        }
    }
}

fn default_database() -> PathBuf {
    PathBuf::from("rrdb.sqlite3")
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION SECTION: SERVE                                       //
////////////////////////////////////////////////////////////////////////

/// The configuration of the `serve` command.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServeConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            workers: default_workers(),
            request_timeout_ms: default_request_timeout_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
        }
    }
}

const DEFAULT_BIND_IP: IpAddr = IpAddr::V6(Ipv6Addr::LOCALHOST);
const DEFAULT_BIND_PORT: u16 = 6969;

fn default_bind() -> SocketAddr {
    SocketAddr::new(DEFAULT_BIND_IP, DEFAULT_BIND_PORT)
}

fn default_workers() -> usize {
    4
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_idle_timeout_ms() -> u64 {
    30000
}

////////////////////////////////////////////////////////////////////////
// WRAPPERS FOR SERDE                                                 //
////////////////////////////////////////////////////////////////////////

/// Generates a deserializable `ConfigX` structure wrapping an `X` type,
/// using its [`FromStr`](std::str::FromStr) implementation.
macro_rules! make_serde_wrapper {
    ($wrapper:ident, $over:ty, $description:literal) => {
        /// A macro-generated deserializable wrapper.
        #[derive(Clone, Copy, Debug)]
        pub struct $wrapper(pub $over);

        impl<'de> Deserialize<'de> for $wrapper {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: de::Deserializer<'de>,
            {
                deserializer.deserialize_str(paste! { [<$wrapper Visitor>] })
            }
        }

        paste! {
            /// A macro-generated [`Visitor`](de::Visitor).
            #[derive(Debug)]
            struct [<$wrapper Visitor>];
        }

        impl<'de> de::Visitor<'de> for paste! { [<$wrapper Visitor>] } {
            type Value = $wrapper;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str($description)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                value
                    .parse()
                    .map($wrapper)
                    .map_err(|e| E::custom(format!("invalid {}: {}", $description, e)))
            }
        }
    };
}

make_serde_wrapper!(ConfigLevelFilter, LevelFilter, "log level");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_configuration_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.database, PathBuf::from("rrdb.sqlite3"));
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
        assert!(config.log_level.is_none());
        assert_eq!(config.serve.bind, "[::1]:6969".parse().unwrap());
        assert_eq!(config.serve.workers, 4);
        assert_eq!(config.serve.request_timeout_ms, 5000);
        assert_eq!(config.serve.idle_timeout_ms, 30000);
    }

    #[test]
    fn configuration_fields_are_read() {
        let config: Config = toml::from_str(
            r#"
            database = "/var/lib/rrdb/records.sqlite3"
            log_level = "debug"

            [serve]
            bind = "127.0.0.1:5300"
            workers = 16
            "#,
        )
        .unwrap();
        assert_eq!(config.database, PathBuf::from("/var/lib/rrdb/records.sqlite3"));
        assert_eq!(config.log_level.map(|l| l.0), Some(LevelFilter::Debug));
        assert_eq!(config.serve.bind, "127.0.0.1:5300".parse().unwrap());
        assert_eq!(config.serve.workers, 16);
        assert_eq!(config.serve.idle_timeout_ms, 30000);
    }

    #[test]
    fn unknown_fields_and_bad_levels_are_rejected() {
        assert!(toml::from_str::<Config>("databse = \"x\"").is_err());
        assert!(toml::from_str::<Config>("log_level = \"chatty\"").is_err());
    }
}
