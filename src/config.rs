//! Run configuration: an optional TOML file overlaid with command-line flags.
//!
//! ```toml
//! input = "sales.xlsx"
//! category = "Drama"
//! months = ["January", "February"]
//! output_dir = "reports"
//!
//! [costs]
//! BBC1 = 400.0
//!
//! [[slots]]
//! channel = "TV Channel 1"
//! revenue = "TV Channel 1 £"
//! ```
use crate::error::ConfigError;
use crate::loader::LoadOptions;
use crate::types::{CostInput, SlotColumns, DEFAULT_SLOTS};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_DIR: &str = "reports";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub input: Option<PathBuf>,
    pub sheet: Option<String>,
    pub day_first: bool,
    pub category: Option<String>,
    /// `None` selects every month in the file.
    pub months: Option<Vec<String>>,
    pub output_dir: Option<PathBuf>,
    pub costs: BTreeMap<String, f64>,
    pub slots: Option<Vec<SlotColumns>>,
}

/// Values given on the command line; each one wins over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub input: Option<PathBuf>,
    pub sheet: Option<String>,
    pub day_first: bool,
    pub category: Option<String>,
    pub months: Vec<String>,
    pub costs: Vec<String>,
    pub output_dir: Option<PathBuf>,
}

impl ReportConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply(&mut self, o: Overrides) -> Result<(), ConfigError> {
        if o.input.is_some() {
            self.input = o.input;
        }
        if o.sheet.is_some() {
            self.sheet = o.sheet;
        }
        self.day_first |= o.day_first;
        if o.category.is_some() {
            self.category = o.category;
        }
        if !o.months.is_empty() {
            self.months = Some(o.months);
        }
        if o.output_dir.is_some() {
            self.output_dir = o.output_dir;
        }
        for arg in &o.costs {
            let (channel, cost) = parse_cost_arg(arg)?;
            self.costs.insert(channel, cost);
        }
        Ok(())
    }

    pub fn load_options(&self) -> Result<LoadOptions, ConfigError> {
        let slots = match &self.slots {
            Some(slots) if slots.is_empty() => return Err(ConfigError::NoSlots),
            Some(slots) => slots.clone(),
            None => DEFAULT_SLOTS.clone(),
        };
        Ok(LoadOptions {
            sheet: self.sheet.clone(),
            day_first: self.day_first,
            slots,
        })
    }

    pub fn cost_input(&self) -> Result<CostInput, ConfigError> {
        let mut costs = CostInput::new();
        for (channel, cost) in &self.costs {
            costs.set(channel.clone(), *cost)?;
        }
        Ok(costs)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }
}

/// Parse `CHANNEL=AMOUNT`. The last `=` splits, so channel names may
/// contain one.
pub fn parse_cost_arg(arg: &str) -> Result<(String, f64), ConfigError> {
    let (channel, amount) = arg
        .rsplit_once('=')
        .ok_or_else(|| ConfigError::CostArgument(arg.to_string()))?;
    let channel = channel.trim();
    let amount: f64 = amount
        .trim()
        .parse()
        .map_err(|_| ConfigError::CostArgument(arg.to_string()))?;
    if channel.is_empty() {
        return Err(ConfigError::CostArgument(arg.to_string()));
    }
    Ok((channel.to_string(), amount))
}
