use crate::options::{ChartOptions, ChartOverrides};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Site configuration.
///
/// Loaded from a TOML file and validated before use. Every table and field is
/// optional and falls back to its default. See [`Config::from_file`] for loading.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Overrides of the temperature chart display options.
    pub chart: ChartOverrides,
    /// Decorative background parameters.
    pub background: BackgroundConfig,
    /// Timings and thresholds of the page behavior.
    pub page: PageSettings,
}

/// Decorative background parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackgroundConfig {
    /// Number of particles.
    pub n_particles: usize,
    /// Particle size range in pixels.
    pub min_size: f64,
    pub max_size: f64,
    /// Maximum absolute particle speed per frame, per axis.
    pub max_speed: f64,
    /// Particle opacity range.
    pub min_opacity: f64,
    pub max_opacity: f64,

    /// Distance between wave grid dots in pixels.
    pub grid_spacing: f64,
    /// Vertical amplitude of the wave in pixels.
    pub wave_amplitude: f64,
    /// Wave phase advance per frame.
    pub time_step: f64,

    /// Random seed. OS entropy is used when absent.
    pub seed: Option<u64>,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            n_particles: 50,
            min_size: 2.0,
            max_size: 6.0,
            max_speed: 0.5,
            min_opacity: 0.3,
            max_opacity: 0.8,
            grid_spacing: 50.0,
            wave_amplitude: 20.0,
            time_step: 0.01,
            seed: None,
        }
    }
}

/// Timings (milliseconds) and thresholds of the page behavior.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageSettings {
    /// Delay before a new toast slides in.
    pub toast_enter_ms: u64,
    /// Time from creation until a toast starts sliding out.
    pub toast_visible_ms: u64,
    /// Duration of the slide-out before the toast is removed.
    pub toast_exit_ms: u64,
    /// Simulated form submission latency.
    pub submit_delay_ms: u64,

    /// Scroll offset beyond which the navigation bar gets a shadow.
    pub nav_shadow_offset: f64,
    /// Visible fraction of an element that triggers its reveal.
    pub reveal_threshold: f64,
    /// Height cut from the bottom of the viewport for reveal checks.
    pub reveal_bottom_margin: f64,
    /// Animation delay step between staggered cards, in seconds.
    pub stagger_step_s: f64,
    /// Delay before stagger delays are applied.
    pub stagger_delay_ms: u64,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            toast_enter_ms: 100,
            toast_visible_ms: 3000,
            toast_exit_ms: 300,
            submit_delay_ms: 2000,
            nav_shadow_offset: 100.0,
            reveal_threshold: 0.1,
            reveal_bottom_margin: 50.0,
            stagger_step_s: 0.2,
            stagger_delay_ms: 100,
        }
    }
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Chart options with this configuration's overrides applied.
    pub fn chart_options(&self) -> ChartOptions {
        ChartOptions::default().merge(&self.chart)
    }

    pub fn validate(&self) -> Result<()> {
        self.chart_options()
            .validate()
            .context("invalid chart options")?;

        let bg = &self.background;
        check_num(bg.n_particles, 0..10_000).context("invalid number of particles")?;
        check_range(bg.min_size, bg.max_size, 0.0..1_000.0).context("invalid particle sizes")?;
        check_num(bg.max_speed, f64::MIN_POSITIVE..100.0).context("invalid particle speed")?;
        check_range(bg.min_opacity, bg.max_opacity, 0.0..=1.0)
            .context("invalid particle opacities")?;
        check_num(bg.grid_spacing, 1.0..1_000.0).context("invalid grid spacing")?;
        check_num(bg.wave_amplitude, f64::MIN_POSITIVE..1_000.0)
            .context("invalid wave amplitude")?;
        check_num(bg.time_step, 0.0..1.0).context("invalid time step")?;

        let page = &self.page;
        check_num(page.toast_enter_ms, 0..page.toast_visible_ms)
            .context("invalid toast enter delay")?;
        check_num(page.toast_visible_ms, 1..600_000).context("invalid toast visible time")?;
        check_num(page.toast_exit_ms, 0..60_000).context("invalid toast exit time")?;
        check_num(page.submit_delay_ms, 0..600_000).context("invalid submit delay")?;
        check_num(page.nav_shadow_offset, 0.0..100_000.0).context("invalid nav shadow offset")?;
        check_num(page.reveal_threshold, 0.0..=1.0).context("invalid reveal threshold")?;
        check_num(page.reveal_bottom_margin, 0.0..10_000.0)
            .context("invalid reveal bottom margin")?;
        check_num(page.stagger_step_s, 0.0..10.0).context("invalid stagger step")?;
        check_num(page.stagger_delay_ms, 0..60_000).context("invalid stagger delay")?;

        Ok(())
    }
}

pub fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_range<R>(low: f64, high: f64, range: R) -> Result<()>
where
    R: RangeBounds<f64> + Debug + Clone,
{
    check_num(low, range.clone()).context("invalid lower bound")?;
    check_num(high, range).context("invalid upper bound")?;
    if low >= high {
        bail!("lower bound must be below the upper bound, but {low} >= {high}");
    }
    Ok(())
}
