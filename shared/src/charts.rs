//! Chart series for the dashboard.
//!
//! Renderers only draw; these functions decide labels, order and colors.

use crate::{Summary, PARAMETERS};

/// Category palette, cycled for the distribution chart
pub const PALETTE: [(u8, u8, u8); 6] = [
    (0x3b, 0x82, 0xf6),
    (0x10, 0xb9, 0x81),
    (0xf5, 0x9e, 0x0b),
    (0xef, 0x44, 0x44),
    (0x8b, 0x5c, 0xf6),
    (0xec, 0x48, 0x99),
];

/// One labelled bar/slice
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    /// `None` when the server reported no value (rendered as "-")
    pub value: Option<f64>,
    pub color: (u8, u8, u8),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub title: &'static str,
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    /// Largest present value, used to scale bars
    pub fn max_value(&self) -> f64 {
        self.points
            .iter()
            .filter_map(|p| p.value)
            .fold(0.0, f64::max)
    }

    pub fn is_empty(&self) -> bool {
        self.points.iter().all(|p| p.value.is_none())
    }
}

/// Equipment type distribution, largest category first
pub fn distribution_series(summary: &Summary) -> ChartSeries {
    let mut counts: Vec<(&String, &u64)> = summary.equipment_type_distribution.iter().collect();
    counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let points = counts
        .into_iter()
        .enumerate()
        .map(|(i, (label, count))| ChartPoint {
            label: label.clone(),
            value: Some(*count as f64),
            color: PALETTE[i % PALETTE.len()],
        })
        .collect();

    ChartSeries {
        title: "Equipment Type Distribution",
        points,
    }
}

/// Parameter averages in fixed Flowrate/Pressure/Temperature order
pub fn averages_series(summary: &Summary) -> ChartSeries {
    let points = PARAMETERS
        .iter()
        .map(|param| ChartPoint {
            label: (*param).to_string(),
            value: summary.average(param),
            color: PALETTE[0],
        })
        .collect();

    ChartSeries {
        title: "Parameter Averages",
        points,
    }
}
