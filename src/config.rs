//! Configuration for the overlay pipeline and query backend

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::markers::DEFAULT_MARKER_OFFSET;
use crate::trend::{LONG_WINDOW, SHORT_WINDOW};

/// Default API base URL for the Gemini generative language API
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Text-query backend settings. No API key means the capability is disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }
}

impl QueryConfig {
    /// API key, if one is set and non-blank
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// CSV file with the bar data
    pub data_path: PathBuf,

    /// Short trend window in bars
    pub short_window: usize,

    /// Long trend window in bars
    pub long_window: usize,

    /// Distance between an entry marker and the bar's low/high
    pub marker_offset: f64,

    pub query: QueryConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("tsla_data.csv"),
            short_window: SHORT_WINDOW,
            long_window: LONG_WINDOW,
            marker_offset: DEFAULT_MARKER_OFFSET,
            query: QueryConfig::default(),
        }
    }
}

impl DashboardConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.short_window > 0, "short window must be at least one bar");
        ensure!(self.long_window > 0, "long window must be at least one bar");
        ensure!(
            self.marker_offset.is_finite(),
            "marker offset must be finite, got {}",
            self.marker_offset
        );
        Ok(())
    }

    /// Trend windows in layer order
    pub fn trend_windows(&self) -> [usize; 2] {
        [self.short_window, self.long_window]
    }
}
