use crate::background::{Field, Resize};
use crate::builder::build_chart_spec;
use crate::comparison::ComparisonChart;
use crate::config::Config;
use crate::dataset::Dataset;
use crate::glue::{ChartMount, SiteContent};
use crate::options::ChartOptions;
use crate::script::PageScript;
use crate::share::ShareContent;
use crate::spec::ChartSpec;
use anyhow::{Context, Result};
use glob::glob;
use serde::Serialize;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

pub const GLOBAL_CHART_ID: &str = "global-temperature-chart";
pub const COMPARISON_CHART_ID: &str = "temperature-chart";

/// Site directory with an optional `config.toml` and `dataset.toml`,
/// and generated files under `out/`.
pub struct Manager {
    site_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(site_dir: P) -> Result<Self> {
        let site_dir = site_dir.as_ref().to_path_buf();

        let config_file = site_dir.join("config.toml");
        let cfg = if config_file.exists() {
            Config::from_file(&config_file).context("failed to construct cfg")?
        } else {
            log::info!("no {config_file:?}, using defaults");
            Config::default()
        };
        log::info!("{cfg:#?}");

        Ok(Self { site_dir, cfg })
    }

    pub fn render_charts(&self) -> Result<()> {
        let spec = self.global_chart().context("failed to build global chart")?;
        self.write_json(GLOBAL_CHART_ID, &spec.to_echarts())?;
        if let Some(average) = spec.aggregate() {
            let latest = spec.years.iter().zip(&average.values).rev().find_map(|(year, val)| {
                val.map(|val| (year, val))
            });
            if let Some((year, val)) = latest {
                log::info!("latest multi-source average: {val:+.2} °C in {year}");
            }
        }

        let comparison = ComparisonChart::default();
        if let Some((hour, gap)) = comparison.peak_gap() {
            log::info!("largest surface-forecast gap: {gap} °C at {hour}");
        }
        self.write_json(COMPARISON_CHART_ID, &comparison.to_echarts())?;

        Ok(())
    }

    pub fn render_background(
        &self,
        n_frames: usize,
        width: f64,
        height: f64,
        resizes: &[Resize],
    ) -> Result<()> {
        let mut field = Field::new(self.cfg.background.clone(), width, height)
            .context("failed to construct field")?;
        log::info!(
            "field of {} particles on a {width}x{height} canvas",
            field.particles().len()
        );

        let file = self.out_dir()?.join("background.msgpack");
        field
            .render_frames(n_frames, resizes, &file)
            .context("failed to render frames")?;
        log::info!("wrote {file:?}");

        Ok(())
    }

    pub fn simulate_page<P: AsRef<Path>>(&self, script_file: P) -> Result<()> {
        let script = PageScript::from_file(script_file).context("failed to load page script")?;

        let mut charts = vec![ChartMount {
            container: COMPARISON_CHART_ID.to_string(),
            name: "comparison".to_string(),
        }];
        // A broken dataset leaves its chart out instead of failing the page.
        match self.global_chart() {
            Ok(_) => charts.push(ChartMount {
                container: GLOBAL_CHART_ID.to_string(),
                name: "global".to_string(),
            }),
            Err(error) => log::warn!("skipping global chart: {error:#}"),
        }
        let content = SiteContent {
            charts,
            share: Some(ShareContent::default()),
        };

        let trace = script
            .run(self.cfg.page.clone(), &content)
            .context("failed to run page script")?;
        log::info!(
            "page ran for {} ms with {} mutations",
            trace.end_ms,
            trace.mutations.len()
        );

        self.write_json("page-trace", &trace)
    }

    pub fn clean_site(&self) -> Result<()> {
        let out_dir = self.site_dir.join("out");
        for pattern in ["*.json", "*.msgpack"] {
            let pattern = out_dir.join(pattern);
            let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
            for file in glob(pattern).context("failed to glob output files")? {
                let file = file.context("failed to read glob entry")?;
                fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
                log::info!("removed {file:?}");
            }
        }
        Ok(())
    }

    fn global_chart(&self) -> Result<ChartSpec> {
        let dataset_file = self.site_dir.join("dataset.toml");
        let dataset = if dataset_file.exists() {
            Dataset::from_file(&dataset_file)?
        } else {
            Dataset::wmo_global_mean()
        };

        let opts = self.chart_options(&dataset);
        let table = &dataset.table;
        let spec = build_chart_spec(table.years(), table, &opts)?;
        Ok(spec)
    }

    /// Config overrides win over the labels and colors a dataset file declares.
    fn chart_options(&self, dataset: &Dataset) -> ChartOptions {
        let mut opts = ChartOptions::default();
        opts.names.extend(dataset.names.clone());
        opts.colors.extend(dataset.colors.clone());
        opts.merge(&self.cfg.chart)
    }

    fn out_dir(&self) -> Result<PathBuf> {
        let out_dir = self.site_dir.join("out");
        fs::create_dir_all(&out_dir).with_context(|| format!("failed to create {out_dir:?}"))?;
        Ok(out_dir)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let file = self.out_dir()?.join(format!("{name}.json"));
        let writer = File::create(&file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(writer);
        serde_json::to_writer_pretty(&mut writer, value)
            .with_context(|| format!("failed to serialize {name}"))?;
        writer.flush().context("failed to flush writer stream")?;
        log::info!("wrote {file:?}");
        Ok(())
    }
}
