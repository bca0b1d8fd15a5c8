// src/config.rs
use crate::drivers::StreamError;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

// Line colours accepted on the command line and in config files
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineColor {
    #[serde(rename = "b")]
    Blue,
    #[serde(rename = "r")]
    Red,
    #[serde(rename = "g")]
    Green,
    #[serde(rename = "c")]
    Cyan,
    #[serde(rename = "m")]
    Magenta,
    #[serde(rename = "y")]
    Yellow,
    #[serde(rename = "k")]
    Black,
    #[default]
    #[serde(rename = "w")]
    White,
}

impl LineColor {
    pub fn code(self) -> char {
        match self {
            LineColor::Blue => 'b',
            LineColor::Red => 'r',
            LineColor::Green => 'g',
            LineColor::Cyan => 'c',
            LineColor::Magenta => 'm',
            LineColor::Yellow => 'y',
            LineColor::Black => 'k',
            LineColor::White => 'w',
        }
    }
}

impl FromStr for LineColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "b" => Ok(LineColor::Blue),
            "r" => Ok(LineColor::Red),
            "g" => Ok(LineColor::Green),
            "c" => Ok(LineColor::Cyan),
            "m" => Ok(LineColor::Magenta),
            "y" => Ok(LineColor::Yellow),
            "k" => Ok(LineColor::Black),
            "w" => Ok(LineColor::White),
            other => Err(format!("unknown colour {other:?}, expected one of b,r,g,c,m,y,k,w")),
        }
    }
}

impl fmt::Display for LineColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub color: LineColor,
    /// Light background with dark foreground.
    pub invert: bool,
}

/// Everything a front end may tune. Unset fields fall back to defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub stream_name: Option<String>,
    pub buffer_len: usize,
    pub channel_names: Option<Vec<String>>,
    pub theme: Theme,
    pub discovery_timeout_ms: u64,
    pub tick_interval_ms: u64,
    /// `None` keeps prefilling until stopped.
    pub prefill_timeout_ms: Option<u64>,
    pub prefill_poll_interval_ms: u64,
    pub max_samples_per_drain: Option<usize>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            stream_name: None,
            buffer_len: 512,
            channel_names: None,
            theme: Theme::default(),
            discovery_timeout_ms: 5_000,
            tick_interval_ms: 15,
            prefill_timeout_ms: Some(10_000),
            prefill_poll_interval_ms: 1,
            max_samples_per_drain: Some(1 << 16),
        }
    }
}

impl GraphConfig {
    pub fn from_json_str(text: &str) -> Result<Self, StreamError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        if self.buffer_len == 0 {
            return Err(StreamError::InvalidBufferLength);
        }
        if self.tick_interval_ms == 0 {
            return Err(StreamError::Config("tick_interval_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn prefill_timeout(&self) -> Option<Duration> {
        self.prefill_timeout_ms.map(Duration::from_millis)
    }

    pub fn prefill_poll_interval(&self) -> Duration {
        Duration::from_millis(self.prefill_poll_interval_ms)
    }
}

/// Names must cover every channel exactly.
pub fn check_channel_names(names: &[String], channel_count: usize) -> Result<(), StreamError> {
    if names.len() != channel_count {
        return Err(StreamError::ChannelNameMismatch {
            expected: channel_count,
            actual: names.len(),
        });
    }
    Ok(())
}

/// Configured names when they fit the stream, `ch0..chN` otherwise.
pub fn resolve_channel_names(names: Option<&[String]>, channel_count: usize) -> Vec<String> {
    if let Some(names) = names {
        match check_channel_names(names, channel_count) {
            Ok(()) => return names.to_vec(),
            Err(err) => warn!("{err}; falling back to default channel names"),
        }
    }
    (0..channel_count).map(|k| format!("ch{k}")).collect()
}
