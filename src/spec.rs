//! Chart specification produced by the builder.
//!
//! A [`ChartSpec`] is plain data. [`ChartSpec::to_echarts`] renders it into the
//! option object the ECharts `setOption` entry point expects.

use serde::Serialize;
use serde_json::{Value, json};
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub years: Vec<i32>,
    pub y_axis: ValueAxis,
    /// Source series in table order, followed by the aggregate series.
    pub series: Vec<DisplaySeries>,
    pub annotations: Vec<ReferenceLine>,
    pub baseline_note: String,
    pub animation_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueAxis {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub interval: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Source,
    Aggregate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplaySeries {
    pub key: String,
    pub name: String,
    pub color: String,
    pub kind: SeriesKind,
    pub values: Vec<Option<f64>>,
}

/// Horizontal line at a fixed value of the y axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceLine {
    pub value: f64,
    pub label: String,
    pub color: String,
}

/// Most y axis ticks a chart may carry.
pub const MAX_Y_TICKS: usize = 1_000;

const POSITIVE_COLOR: &str = "#e74c3c";
const NEGATIVE_COLOR: &str = "#3498db";

impl ChartSpec {
    pub fn aggregate(&self) -> Option<&DisplaySeries> {
        self.series
            .iter()
            .find(|series| series.kind == SeriesKind::Aggregate)
    }

    pub fn legend(&self) -> Vec<&str> {
        self.series.iter().map(|series| series.name.as_str()).collect()
    }

    /// Tooltip body for the year at `idx`. Series without a value at `idx` are left out.
    pub fn tooltip_html(&self, idx: usize) -> String {
        let Some(year) = self.years.get(idx) else {
            return String::new();
        };

        let mut html = format!(
            "<div style=\"font-weight:600;margin-bottom:8px;color:#1e3a8a\">{year}</div>\
             <div style=\"font-size:12px;color:#666;margin-bottom:6px\">{}</div>",
            escape_html(&self.baseline_note)
        );
        for series in &self.series {
            let Some(val) = series.values.get(idx).copied().flatten() else {
                continue;
            };
            let val_color = if val >= 0.0 {
                POSITIVE_COLOR
            } else {
                NEGATIVE_COLOR
            };
            // Writing into a String cannot fail.
            let _ = write!(
                html,
                "<div style=\"display:flex;align-items:center;margin:4px 0\">\
                 <span style=\"display:inline-block;width:10px;height:10px;border-radius:50%;\
                 background:{};margin-right:8px\"></span>\
                 <span style=\"flex:1\">{}</span>\
                 <span style=\"font-weight:600;color:{val_color}\">{}°C</span></div>",
                escape_html(&series.color),
                escape_html(&series.name),
                signed(val, 2),
            );
        }
        html
    }

    /// Labels of the y axis ticks, bottom to top.
    ///
    /// Empty when the axis would need more than [`MAX_Y_TICKS`] ticks.
    pub fn y_tick_labels(&self) -> Vec<String> {
        let axis = &self.y_axis;
        let n_steps = ((axis.max - axis.min) / axis.interval + 1e-9).floor();
        if !(0.0..MAX_Y_TICKS as f64).contains(&n_steps) {
            log::warn!("no y tick labels for axis {axis:?}");
            return Vec::new();
        }
        let n_ticks = n_steps as usize + 1;
        (0..n_ticks)
            .map(|i| signed(axis.min + i as f64 * axis.interval, 1))
            .collect()
    }

    pub fn to_echarts(&self) -> Value {
        let series: Vec<_> = self
            .series
            .iter()
            .map(|series| self.series_option(series))
            .collect();
        let tooltip_html: Vec<_> = (0..self.years.len())
            .map(|idx| self.tooltip_html(idx))
            .collect();

        json!({
            "backgroundColor": "#fff",
            "tooltip": {
                "trigger": "axis",
                "backgroundColor": "rgba(255,255,255,0.95)",
                "borderColor": "#e0e0e0",
                "borderWidth": 1,
                "padding": [12, 16],
                "textStyle": { "color": "#333", "fontSize": 13 }
            },
            "legend": {
                "type": "scroll",
                "bottom": 10,
                "left": "center",
                "itemGap": 20,
                "itemWidth": 20,
                "itemHeight": 10,
                "textStyle": { "fontSize": 12, "color": "#666" },
                "pageTextStyle": { "color": "#666" },
                "data": self.legend()
            },
            "grid": { "left": 60, "right": 40, "top": 40, "bottom": 80, "containLabel": false },
            "xAxis": {
                "type": "category",
                "data": self.years,
                "axisLine": { "lineStyle": { "color": "#ccc" } },
                "axisTick": { "alignWithLabel": true, "lineStyle": { "color": "#ccc" } },
                "axisLabel": { "color": "#666", "fontSize": 11, "rotate": 45 },
                "splitLine": { "show": false }
            },
            "yAxis": {
                "type": "value",
                "name": self.y_axis.name,
                "nameLocation": "middle",
                "nameGap": 45,
                "nameTextStyle": { "color": "#666", "fontSize": 12, "fontWeight": "normal" },
                "min": self.y_axis.min,
                "max": self.y_axis.max,
                "interval": self.y_axis.interval,
                "axisLine": { "show": true, "lineStyle": { "color": "#ccc" } },
                "axisTick": { "show": true, "lineStyle": { "color": "#ccc" } },
                "axisLabel": { "color": "#666", "fontSize": 11 },
                "splitLine": { "lineStyle": { "color": "#f0f0f0", "type": "dashed" } }
            },
            "series": series,
            "animation": true,
            "animationDuration": self.animation_ms,
            "animationEasing": "cubicOut",
            "tooltipHtml": tooltip_html,
            "yTickLabels": self.y_tick_labels()
        })
    }

    fn series_option(&self, series: &DisplaySeries) -> Value {
        let mut option = match series.kind {
            SeriesKind::Source => json!({
                "name": series.name,
                "type": "line",
                "data": series.values,
                "smooth": true,
                "symbol": "circle",
                "symbolSize": 6,
                "lineStyle": { "width": 2, "color": series.color },
                "itemStyle": { "color": series.color },
                "emphasis": { "focus": "series", "lineStyle": { "width": 3 } },
                "connectNulls": true
            }),
            SeriesKind::Aggregate => json!({
                "name": series.name,
                "type": "line",
                "data": series.values,
                "smooth": true,
                "symbol": "diamond",
                "symbolSize": 8,
                "lineStyle": { "width": 4, "color": series.color, "type": "solid" },
                "itemStyle": { "color": series.color },
                "emphasis": { "focus": "series", "lineStyle": { "width": 5 } },
                "connectNulls": true,
                "z": 10
            }),
        };

        if series.kind == SeriesKind::Aggregate && !self.annotations.is_empty() {
            let lines: Vec<_> = self
                .annotations
                .iter()
                .map(|line| {
                    json!({
                        "yAxis": line.value,
                        "label": {
                            "formatter": line.label,
                            "position": "insideStartTop",
                            "color": line.color,
                            "fontSize": 11,
                            "fontWeight": 500
                        },
                        "lineStyle": { "color": line.color, "type": [5, 3], "width": 1.5 }
                    })
                })
                .collect();
            option["markLine"] = json!({ "silent": true, "symbol": "none", "data": lines });
        }
        option
    }
}

/// Format with an explicit sign for non-negative values.
pub fn signed(val: f64, decimals: usize) -> String {
    // Keep "-0.0" from showing up for values that round to zero.
    let text = format!("{val:.decimals$}");
    match text.strip_prefix('-') {
        Some(rest) if rest.chars().all(|c| c == '0' || c == '.') => format!("+{rest}"),
        Some(_) => text,
        None => format!("+{text}"),
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ChartSpec {
        ChartSpec {
            years: vec![2000, 2010],
            y_axis: ValueAxis {
                name: "dev".to_string(),
                min: -0.5,
                max: 1.0,
                interval: 0.5,
            },
            series: vec![
                DisplaySeries {
                    key: "a".to_string(),
                    name: "A <1>".to_string(),
                    color: "#111111".to_string(),
                    kind: SeriesKind::Source,
                    values: vec![Some(-0.25), None],
                },
                DisplaySeries {
                    key: "average".to_string(),
                    name: "Avg".to_string(),
                    color: "#222222".to_string(),
                    kind: SeriesKind::Aggregate,
                    values: vec![Some(-0.25), Some(0.0)],
                },
            ],
            annotations: vec![ReferenceLine {
                value: 1.5,
                label: "target".to_string(),
                color: "#e74c3c".to_string(),
            }],
            baseline_note: "note".to_string(),
            animation_ms: 1500,
        }
    }

    #[test]
    fn signed_formatting() {
        assert_eq!(signed(1.5, 2), "+1.50");
        assert_eq!(signed(-0.2, 1), "-0.2");
        assert_eq!(signed(0.0, 1), "+0.0");
        assert_eq!(signed(-0.001, 2), "+0.00");
    }

    #[test]
    fn tooltip_skips_missing_values() {
        let spec = sample();
        let first = spec.tooltip_html(0);
        assert!(first.contains(">2000<"));
        assert!(first.contains("A &lt;1&gt;"));
        assert!(first.contains("color:#3498db\">-0.25°C"));

        let second = spec.tooltip_html(1);
        assert!(!second.contains("A &lt;1&gt;"));
        assert!(second.contains("color:#e74c3c\">+0.00°C"));

        assert_eq!(spec.tooltip_html(5), "");
    }

    #[test]
    fn tick_labels_cover_range() {
        assert_eq!(sample().y_tick_labels(), ["-0.5", "+0.0", "+0.5", "+1.0"]);
    }

    #[test]
    fn dense_axis_has_no_tick_labels() {
        let mut spec = sample();
        spec.y_axis.interval = 1e-300;
        assert!(spec.y_tick_labels().is_empty());
        assert_eq!(spec.to_echarts()["yTickLabels"], json!([]));

        spec.y_axis.interval = 1.5 / 500.0;
        assert_eq!(spec.y_tick_labels().len(), 501);
    }

    #[test]
    fn echarts_option_shape() {
        let option = sample().to_echarts();
        assert_eq!(option["series"].as_array().unwrap().len(), 2);
        assert_eq!(option["series"][0]["data"][1], Value::Null);
        assert_eq!(option["series"][1]["symbol"], "diamond");
        assert_eq!(option["series"][1]["markLine"]["data"][0]["yAxis"], 1.5);
        assert!(option["series"][0].get("markLine").is_none());
        assert_eq!(option["legend"]["data"], json!(["A <1>", "Avg"]));
        assert_eq!(option["xAxis"]["data"], json!([2000, 2010]));
        assert_eq!(option["tooltipHtml"].as_array().unwrap().len(), 2);
    }
}
