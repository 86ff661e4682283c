//! Display options for the temperature chart.

use crate::config::check_num;
use crate::spec::MAX_Y_TICKS;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fully resolved chart display options.
///
/// Every field has a default (see [`ChartOptions::default`]). Partial settings
/// from a config file are applied with [`ChartOptions::merge`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartOptions {
    /// Display label per source key. Keys without an entry are labelled with the key itself.
    pub names: BTreeMap<String, String>,
    /// Color per source key. Keys without an entry take a palette color.
    pub colors: BTreeMap<String, String>,
    /// Fallback colors, assigned by source insertion index and cycled.
    pub palette: Vec<String>,

    /// Label of the multi-source average series.
    pub average_name: String,
    /// Color of the multi-source average series.
    pub average_color: String,

    /// Horizontal reference line.
    pub threshold: Threshold,

    pub y_axis: AxisRange,

    /// Note shown under the year in tooltips.
    pub baseline_note: String,

    /// Duration of the initial chart animation in milliseconds.
    pub animation_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub value: f64,
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub interval: f64,
}

/// Partial chart options, as written in the `[chart]` table of a config file.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChartOverrides {
    pub names: BTreeMap<String, String>,
    pub colors: BTreeMap<String, String>,
    pub palette: Option<Vec<String>>,
    pub average_name: Option<String>,
    pub average_color: Option<String>,
    pub threshold_value: Option<f64>,
    pub threshold_label: Option<String>,
    pub threshold_color: Option<String>,
    pub y_axis_name: Option<String>,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
    pub y_interval: Option<f64>,
    pub baseline_note: Option<String>,
    pub animation_ms: Option<u32>,
}

pub const DEFAULT_PALETTE: [&str; 6] = [
    "#e74c3c", "#3498db", "#27ae60", "#9b59b6", "#f39c12", "#1abc9c",
];

const WMO_NAMES: [(&str, &str); 6] = [
    ("berkeleyEarth", "Berkeley Earth"),
    ("era5", "ERA5"),
    ("gistemp", "GISTEMP"),
    ("hadcrut5", "HadCRUT5"),
    ("jra3q", "JRA-3Q"),
    ("noaa", "NOAAGlobalTemp"),
];

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            names: WMO_NAMES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            colors: BTreeMap::new(),
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            average_name: "Multi-source average".to_string(),
            average_color: "#2c3e50".to_string(),
            threshold: Threshold {
                value: 1.5,
                label: "Paris Agreement 1.5°C target".to_string(),
                color: "#e74c3c".to_string(),
            },
            y_axis: AxisRange {
                name: "Deviation from\n1850-1900 average (°C)".to_string(),
                min: -0.5,
                max: 2.0,
                interval: 0.5,
            },
            baseline_note: "Deviation from the 1850-1900 average".to_string(),
            animation_ms: 1500,
        }
    }
}

impl ChartOptions {
    /// Apply partial settings field by field.
    ///
    /// Scalar fields are replaced when set. The `names` and `colors` maps are
    /// merged per key, so overriding one label keeps every other default label.
    pub fn merge(mut self, over: &ChartOverrides) -> Self {
        for (key, name) in &over.names {
            self.names.insert(key.clone(), name.clone());
        }
        for (key, color) in &over.colors {
            self.colors.insert(key.clone(), color.clone());
        }
        if let Some(palette) = &over.palette {
            self.palette = palette.clone();
        }
        if let Some(name) = &over.average_name {
            self.average_name = name.clone();
        }
        if let Some(color) = &over.average_color {
            self.average_color = color.clone();
        }
        if let Some(value) = over.threshold_value {
            self.threshold.value = value;
        }
        if let Some(label) = &over.threshold_label {
            self.threshold.label = label.clone();
        }
        if let Some(color) = &over.threshold_color {
            self.threshold.color = color.clone();
        }
        if let Some(name) = &over.y_axis_name {
            self.y_axis.name = name.clone();
        }
        if let Some(min) = over.y_min {
            self.y_axis.min = min;
        }
        if let Some(max) = over.y_max {
            self.y_axis.max = max;
        }
        if let Some(interval) = over.y_interval {
            self.y_axis.interval = interval;
        }
        if let Some(note) = &over.baseline_note {
            self.baseline_note = note.clone();
        }
        if let Some(ms) = over.animation_ms {
            self.animation_ms = ms;
        }
        self
    }

    /// Label of a source: the configured name, or the key itself.
    pub fn name_of(&self, key: &str) -> String {
        self.names
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// Color of the source at insertion index `idx`: the configured color, or a palette color.
    pub fn color_of(&self, key: &str, idx: usize) -> String {
        if let Some(color) = self.colors.get(key) {
            return color.clone();
        }
        // An empty palette is rejected by `validate`; fall back to the average color anyway.
        match self.palette.len() {
            0 => self.average_color.clone(),
            len => self.palette[idx % len].clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.palette.is_empty() {
            bail!("palette must not be empty");
        }
        if !self.threshold.value.is_finite() {
            bail!("threshold value must be finite");
        }
        if !(self.y_axis.min.is_finite() && self.y_axis.max.is_finite()) {
            bail!("y axis bounds must be finite");
        }
        if self.y_axis.min >= self.y_axis.max {
            bail!(
                "y axis minimum must be below the maximum, but is {} >= {}",
                self.y_axis.min,
                self.y_axis.max
            );
        }
        let span = self.y_axis.max - self.y_axis.min;
        check_num(self.y_axis.interval, f64::MIN_POSITIVE..=span)
            .context("invalid y axis interval")?;
        check_num(span / self.y_axis.interval, 1.0..MAX_Y_TICKS as f64)
            .context("too many y axis ticks")?;
        check_num(self.animation_ms, 0..=60_000).context("invalid animation duration")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_untouched_defaults() {
        let over = ChartOverrides {
            names: BTreeMap::from([("era5".to_string(), "ERA5 reanalysis".to_string())]),
            threshold_value: Some(2.0),
            ..Default::default()
        };
        let opts = ChartOptions::default().merge(&over);
        assert_eq!(opts.name_of("era5"), "ERA5 reanalysis");
        assert_eq!(opts.name_of("noaa"), "NOAAGlobalTemp");
        assert_eq!(opts.threshold.value, 2.0);
        assert_eq!(opts.threshold.label, ChartOptions::default().threshold.label);
    }

    #[test]
    fn fallbacks_cycle_through_palette() {
        let opts = ChartOptions::default();
        assert_eq!(opts.name_of("custom"), "custom");
        assert_eq!(opts.color_of("custom", 1), DEFAULT_PALETTE[1]);
        assert_eq!(opts.color_of("custom", 7), DEFAULT_PALETTE[1]);
    }

    #[test]
    fn explicit_color_wins_over_palette() {
        let over = ChartOverrides {
            colors: BTreeMap::from([("a".to_string(), "#123456".to_string())]),
            ..Default::default()
        };
        let opts = ChartOptions::default().merge(&over);
        assert_eq!(opts.color_of("a", 0), "#123456");
    }

    #[test]
    fn validate_rejects_bad_axis() {
        let mut opts = ChartOptions::default();
        assert!(opts.validate().is_ok());
        opts.y_axis.min = 3.0;
        assert!(opts.validate().is_err());

        let mut opts = ChartOptions::default();
        opts.y_axis.interval = 0.0;
        assert!(opts.validate().is_err());

        let mut opts = ChartOptions::default();
        opts.y_axis.interval = 1e-300;
        assert!(opts.validate().is_err());

        let mut opts = ChartOptions::default();
        opts.palette.clear();
        assert!(opts.validate().is_err());
    }
}
