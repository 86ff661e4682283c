//! Temperature deviation datasets.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};

/// One value per year; `None` marks a missing data point.
pub type Series = Vec<Option<f64>>;

/// Table of named deviation series sharing one year index.
///
/// Sources keep their insertion order, which is the order they are charted in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesTable {
    years: Vec<i32>,
    sources: Vec<(String, Series)>,
}

impl SeriesTable {
    pub fn new(years: Vec<i32>) -> Self {
        Self {
            years,
            sources: Vec::new(),
        }
    }

    /// Add a source, or replace the values of an existing one in place.
    pub fn insert<K: Into<String>>(&mut self, key: K, values: Series) {
        let key = key.into();
        match self.sources.iter_mut().find(|(k, _)| *k == key) {
            Some((_, old)) => *old = values,
            None => self.sources.push((key, values)),
        }
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn sources(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.sources.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn get(&self, key: &str) -> Option<&[Option<f64>]> {
        self.sources
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    pub fn n_sources(&self) -> usize {
        self.sources.len()
    }

    /// Global mean near-surface temperature relative to 1850-1900, as compiled by the WMO.
    pub fn wmo_global_mean() -> Self {
        let mut table = Self::new(WMO_YEARS.to_vec());
        for (key, values) in WMO_SOURCES {
            table.insert(*key, values.to_vec());
        }
        table
    }
}

const WMO_YEARS: [i32; 27] = [
    1850, 1860, 1870, 1880, 1890, 1900, 1910, 1920, 1930, 1940, 1950, 1960, 1970, 1980, 1990, 2000,
    2010, 2015, 2016, 2017, 2018, 2019, 2020, 2021, 2022, 2023, 2024,
];

const N: Option<f64> = None;

const WMO_SOURCES: &[(&str, [Option<f64>; 27])] = &[
    (
        "berkeleyEarth",
        [
            Some(-0.18), Some(-0.15), Some(-0.06), Some(-0.07), Some(-0.22), Some(0.12),
            Some(-0.23), Some(-0.01), Some(0.10), Some(0.31), Some(0.06), Some(0.21),
            Some(0.25), Some(0.54), Some(0.69), Some(0.68), Some(1.00), Some(1.15),
            Some(1.29), Some(1.19), Some(1.11), Some(1.25), Some(1.28), Some(1.12),
            Some(1.16), Some(1.45), Some(1.54),
        ],
    ),
    (
        "era5",
        [
            N, N, N, N, N, N, N, N, N, Some(0.20), Some(0.12), Some(0.27), Some(0.31), Some(0.59),
            Some(0.75), Some(0.63), Some(1.01), Some(1.14), Some(1.32), Some(1.23), Some(1.15),
            Some(1.28), Some(1.32), Some(1.16), Some(1.18), Some(1.48), Some(1.60),
        ],
    ),
    (
        "gistemp",
        [
            N, N, N, Some(0.10), Some(-0.09), Some(0.18), Some(-0.17), Some(0.00), Some(0.12),
            Some(0.39), Some(0.10), Some(0.24), Some(0.29), Some(0.52), Some(0.72), Some(0.66),
            Some(0.99), Some(1.16), Some(1.28), Some(1.19), Some(1.12), Some(1.24), Some(1.27),
            Some(1.11), Some(1.16), Some(1.44), Some(1.55),
        ],
    ),
    (
        "hadcrut5",
        [
            Some(-0.08), Some(-0.05), Some(0.01), Some(0.02), Some(-0.17), Some(0.11),
            Some(-0.19), Some(0.04), Some(0.16), Some(0.42), Some(0.11), Some(0.22),
            Some(0.26), Some(0.54), Some(0.70), Some(0.67), Some(1.02), Some(1.17),
            Some(1.27), Some(1.19), Some(1.10), Some(1.23), Some(1.26), Some(1.10),
            Some(1.14), Some(1.44), Some(1.53),
        ],
    ),
    (
        "jra3q",
        [
            N, N, N, N, N, N, N, N, N, N, Some(0.10), Some(0.28), Some(0.27), Some(0.53),
            Some(0.74), Some(0.68), Some(0.99), Some(1.15), Some(1.32), Some(1.20), Some(1.11),
            Some(1.25), Some(1.27), Some(1.08), Some(1.15), Some(1.47), Some(1.57),
        ],
    ),
    (
        "noaa",
        [
            Some(0.05), Some(0.02), Some(0.07), Some(0.07), Some(-0.09), Some(0.19),
            Some(-0.13), Some(0.02), Some(0.13), Some(0.40), Some(0.12), Some(0.25),
            Some(0.30), Some(0.56), Some(0.70), Some(0.66), Some(0.98), Some(1.16),
            Some(1.28), Some(1.19), Some(1.12), Some(1.23), Some(1.26), Some(1.11),
            Some(1.14), Some(1.43), Some(1.53),
        ],
    ),
];

/// Dataset as stored in a TOML file.
///
/// Missing values are written as `nan`, which TOML supports natively.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetFile {
    pub years: Vec<i32>,
    #[serde(default)]
    pub source: Vec<SourceEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceEntry {
    pub key: String,
    pub values: Vec<f64>,
    pub name: Option<String>,
    pub color: Option<String>,
}

/// A dataset loaded from file, with the display labels and colors it declares.
#[derive(Debug)]
pub struct Dataset {
    pub table: SeriesTable,
    pub names: BTreeMap<String, String>,
    pub colors: BTreeMap<String, String>,
}

impl Dataset {
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents).with_context(|| format!("failed to load {file:?}"))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: DatasetFile = toml::from_str(contents).context("failed to deserialize dataset")?;

        let mut table = SeriesTable::new(file.years);
        let mut names = BTreeMap::new();
        let mut colors = BTreeMap::new();
        for entry in file.source {
            if table.get(&entry.key).is_some() {
                bail!("source {:?} is declared more than once", entry.key);
            }
            // Non-finite values stay as they are; the builder drops them.
            let values = entry.values.into_iter().map(Some).collect();
            table.insert(entry.key.clone(), values);
            if let Some(name) = entry.name {
                names.insert(entry.key.clone(), name);
            }
            if let Some(color) = entry.color {
                colors.insert(entry.key, color);
            }
        }

        Ok(Self {
            table,
            names,
            colors,
        })
    }

    pub fn wmo_global_mean() -> Self {
        Self {
            table: SeriesTable::wmo_global_mean(),
            names: BTreeMap::new(),
            colors: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wmo_series_match_years() {
        let table = SeriesTable::wmo_global_mean();
        assert_eq!(table.n_sources(), 6);
        for (key, values) in table.sources() {
            assert_eq!(values.len(), table.years().len(), "{key}");
        }
        assert_eq!(table.get("era5").unwrap()[0], None);
        assert_eq!(table.get("gistemp").unwrap()[7], Some(0.0));
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut table = SeriesTable::new(vec![2000]);
        table.insert("a", vec![Some(1.0)]);
        table.insert("b", vec![Some(2.0)]);
        table.insert("a", vec![Some(3.0)]);
        let keys: Vec<_> = table.sources().map(|(k, _)| k).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(table.get("a"), Some(&[Some(3.0)][..]));
    }

    #[test]
    fn toml_dataset_keeps_order_and_labels() {
        let dataset = Dataset::from_toml(
            r##"
years = [2000, 2010]

[[source]]
key = "zeta"
values = [1.0, nan]
name = "Zeta"

[[source]]
key = "alpha"
values = [2.0, 4.0]
color = "#000000"
"##,
        )
        .unwrap();

        let keys: Vec<_> = dataset.table.sources().map(|(k, _)| k).collect();
        assert_eq!(keys, ["zeta", "alpha"]);
        assert!(dataset.table.get("zeta").unwrap()[1].unwrap().is_nan());
        assert_eq!(dataset.names["zeta"], "Zeta");
        assert_eq!(dataset.colors["alpha"], "#000000");
    }

    #[test]
    fn toml_dataset_rejects_duplicate_keys() {
        let result = Dataset::from_toml(
            r#"
years = [2000]
[[source]]
key = "a"
values = [1.0]
[[source]]
key = "a"
values = [2.0]
"#,
        );
        assert!(result.is_err());
    }
}
