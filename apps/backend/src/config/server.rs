use std::env;
use std::str::FromStr;

use crate::error::AppError;
use crate::services::{DispatcherConfig, WriteMode};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_ROOM_ID: &str = "room1";
const DEFAULT_EVENTS_CHANNEL: &str = "game-events";
const DEFAULT_HAND_SIZE: usize = 5;
const DEFAULT_PORT_FALLBACK_ATTEMPTS: u16 = 10;

/// Runtime settings for one server process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub redis_url: String,
    pub room_id: String,
    pub events_channel: String,
    pub initial_hand_size: usize,
    pub write_mode: WriteMode,
    /// How many successive ports to try after `port` when it is taken.
    pub port_fallback_attempts: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            room_id: DEFAULT_ROOM_ID.to_string(),
            events_channel: DEFAULT_EVENTS_CHANNEL.to_string(),
            initial_hand_size: DEFAULT_HAND_SIZE,
            write_mode: WriteMode::LastWriteWins,
            port_fallback_attempts: DEFAULT_PORT_FALLBACK_ATTEMPTS,
        }
    }
}

impl ServerConfig {
    /// Read settings from the process environment and command-line arguments.
    ///
    /// The port comes from `--port=N`, overridden by `PORT` when set.
    pub fn from_env_and_args<I, S>(args: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_lookup(args, |name| env::var(name).ok())
    }

    pub fn from_lookup<I, S, F>(args: I, lookup: F) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let mut port = defaults.port;
        for arg in args {
            if let Some(value) = arg.as_ref().strip_prefix("--port=") {
                port = parse_value("--port", value)?;
            }
        }
        if let Some(value) = lookup("PORT") {
            port = parse_value("PORT", &value)?;
        }

        let initial_hand_size = match lookup("INITIAL_HAND_SIZE") {
            Some(value) => parse_value("INITIAL_HAND_SIZE", &value)?,
            None => defaults.initial_hand_size,
        };
        let write_mode = match lookup("ROOM_WRITE_MODE") {
            Some(value) => value.parse()?,
            None => defaults.write_mode,
        };
        let port_fallback_attempts = match lookup("PORT_FALLBACK_ATTEMPTS") {
            Some(value) => parse_value("PORT_FALLBACK_ATTEMPTS", &value)?,
            None => defaults.port_fallback_attempts,
        };

        let room_id = lookup("ROOM_ID").unwrap_or(defaults.room_id);
        if room_id.trim().is_empty() {
            return Err(AppError::config("ROOM_ID must not be empty"));
        }

        Ok(Self {
            host: lookup("BACKEND_HOST").unwrap_or(defaults.host),
            port,
            redis_url: lookup("REDIS_URL").unwrap_or(defaults.redis_url),
            room_id,
            events_channel: lookup("EVENTS_CHANNEL").unwrap_or(defaults.events_channel),
            initial_hand_size,
            write_mode,
            port_fallback_attempts,
        })
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            room_id: self.room_id.clone(),
            initial_hand_size: self.initial_hand_size,
            write_mode: self.write_mode,
        }
    }

    /// Ports to try when binding, in order.
    pub fn candidate_ports(&self) -> impl Iterator<Item = u16> {
        let first = self.port;
        (0..=self.port_fallback_attempts).map_while(move |offset| first.checked_add(offset))
    }
}

impl FromStr for WriteMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last_write_wins" | "lww" => Ok(WriteMode::LastWriteWins),
            "compare_and_swap" | "cas" => Ok(WriteMode::CompareAndSwap),
            other => Err(AppError::config(format!(
                "ROOM_WRITE_MODE must be 'last_write_wins' or 'compare_and_swap', got '{other}'"
            ))),
        }
    }
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> Result<T, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::config(format!("{name} has an invalid value: '{value}'")))
}
