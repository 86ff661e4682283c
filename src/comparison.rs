//! Hourly comparison of forecast, land surface and apparent temperature on a hot day.

use crate::spec::escape_html;
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonSeries {
    pub name: String,
    pub color: String,
    /// RGB components used for the area gradient, if the series is filled.
    pub area_rgb: Option<(u8, u8, u8)>,
    pub dashed: bool,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonChart {
    pub title: String,
    pub hours: Vec<String>,
    pub series: Vec<ComparisonSeries>,
}

impl Default for ComparisonChart {
    fn default() -> Self {
        let hours = ["6:00", "8:00", "10:00", "12:00", "14:00", "16:00", "18:00", "20:00"];
        Self {
            title: "Temperature comparison".to_string(),
            hours: hours.iter().map(|h| h.to_string()).collect(),
            series: vec![
                ComparisonSeries {
                    name: "Forecast temperature".to_string(),
                    color: "#3b82f6".to_string(),
                    area_rgb: Some((59, 130, 246)),
                    dashed: false,
                    values: vec![22.0, 24.0, 28.0, 32.0, 34.0, 33.0, 30.0, 27.0],
                },
                ComparisonSeries {
                    name: "Land surface temperature".to_string(),
                    color: "#f97316".to_string(),
                    area_rgb: Some((249, 115, 22)),
                    dashed: false,
                    values: vec![20.0, 26.0, 35.0, 45.0, 52.0, 48.0, 40.0, 32.0],
                },
                ComparisonSeries {
                    name: "Apparent temperature".to_string(),
                    color: "#059669".to_string(),
                    area_rgb: None,
                    dashed: true,
                    values: vec![24.0, 28.0, 33.0, 39.0, 43.0, 41.0, 36.0, 31.0],
                },
            ],
        }
    }
}

impl ComparisonChart {
    pub fn tooltip_html(&self, idx: usize) -> String {
        let Some(hour) = self.hours.get(idx) else {
            return String::new();
        };
        let mut html = format!("<strong>{}</strong><br/>", escape_html(hour));
        for series in &self.series {
            if let Some(val) = series.values.get(idx) {
                html += &format!("{}: {val}°C<br/>", escape_html(&series.name));
            }
        }
        html
    }

    /// Hour of the largest gap between land surface and forecast temperature.
    pub fn peak_gap(&self) -> Option<(&str, f64)> {
        let forecast = &self.series.first()?.values;
        let surface = &self.series.get(1)?.values;
        forecast
            .iter()
            .zip(surface)
            .map(|(f, s)| s - f)
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (idx, gap)| match best {
                Some((_, best_gap)) if best_gap >= gap => best,
                _ => Some((idx, gap)),
            })
            .and_then(|(idx, gap)| Some((self.hours.get(idx)?.as_str(), gap)))
    }

    pub fn to_echarts(&self) -> Value {
        let series: Vec<_> = self
            .series
            .iter()
            .map(|series| {
                let mut line_style = json!({ "color": series.color, "width": 3 });
                if series.dashed {
                    line_style["type"] = json!("dashed");
                }
                let mut option = json!({
                    "name": series.name,
                    "type": "line",
                    "data": series.values,
                    "smooth": true,
                    "lineStyle": line_style,
                    "itemStyle": { "color": series.color }
                });
                if let Some((r, g, b)) = series.area_rgb {
                    option["areaStyle"] = json!({
                        "color": {
                            "type": "linear",
                            "x": 0, "y": 0, "x2": 0, "y2": 1,
                            "colorStops": [
                                { "offset": 0, "color": format!("rgba({r}, {g}, {b}, 0.3)") },
                                { "offset": 1, "color": format!("rgba({r}, {g}, {b}, 0.05)") }
                            ]
                        }
                    });
                }
                option
            })
            .collect();
        let legend: Vec<_> = self.series.iter().map(|s| s.name.as_str()).collect();
        let tooltip_html: Vec<_> = (0..self.hours.len())
            .map(|idx| self.tooltip_html(idx))
            .collect();

        json!({
            "title": {
                "text": self.title,
                "left": "center",
                "textStyle": { "color": "#1e293b", "fontSize": 16, "fontWeight": "bold" }
            },
            "tooltip": { "trigger": "axis", "axisPointer": { "type": "cross" } },
            "legend": { "data": legend, "bottom": 10, "textStyle": { "color": "#64748b" } },
            "grid": { "left": "3%", "right": "4%", "bottom": "15%", "containLabel": true },
            "xAxis": {
                "type": "category",
                "data": self.hours,
                "axisLine": { "lineStyle": { "color": "#cbd5e1" } },
                "axisLabel": { "color": "#64748b" }
            },
            "yAxis": {
                "type": "value",
                "name": "Temperature (°C)",
                "nameTextStyle": { "color": "#64748b" },
                "axisLine": { "lineStyle": { "color": "#cbd5e1" } },
                "axisLabel": { "color": "#64748b" },
                "splitLine": { "lineStyle": { "color": "#f1f5f9" } }
            },
            "series": series,
            "animation": true,
            "animationDuration": 2000,
            "animationEasing": "cubicOut",
            "tooltipHtml": tooltip_html
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_series_align_with_hours() {
        let chart = ComparisonChart::default();
        for series in &chart.series {
            assert_eq!(series.values.len(), chart.hours.len());
        }
    }

    #[test]
    fn peak_gap_at_early_afternoon() {
        assert_eq!(ComparisonChart::default().peak_gap(), Some(("14:00", 18.0)));
    }

    #[test]
    fn tooltip_lists_every_series() {
        let html = ComparisonChart::default().tooltip_html(3);
        assert_eq!(
            html,
            "<strong>12:00</strong><br/>Forecast temperature: 32°C<br/>\
             Land surface temperature: 45°C<br/>Apparent temperature: 39°C<br/>"
        );
    }

    #[test]
    fn only_dashed_series_has_line_type() {
        let option = ComparisonChart::default().to_echarts();
        assert!(option["series"][0]["lineStyle"].get("type").is_none());
        assert_eq!(option["series"][2]["lineStyle"]["type"], "dashed");
        assert!(option["series"][2].get("areaStyle").is_none());
        assert_eq!(
            option["series"][1]["areaStyle"]["color"]["colorStops"][0]["color"],
            "rgba(249, 115, 22, 0.3)"
        );
    }
}
