use crate::domain::model::ZipRecord;
use serde::Serialize;

/// Descriptive statistics of one numeric column.
///
/// `count` is the number of non-missing values; the other figures are
/// computed over those only and are `None` when there are none. `std` is
/// the sample standard deviation and needs at least two values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub metric: &'static str,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Statistics over every zip code of a municipal area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaSummary {
    pub city: String,
    pub state: String,
    pub zip_count: usize,
    pub metrics: Vec<MetricSummary>,
}

type Extractor = fn(&ZipRecord) -> Option<f64>;

const METRICS: [(&str, Extractor); 9] = [
    ("lat", |r: &ZipRecord| r.lat),
    ("lng", |r: &ZipRecord| r.lng),
    ("radius_in_miles", |r: &ZipRecord| r.radius_in_miles),
    ("population", |r: &ZipRecord| r.population.map(|v| v as f64)),
    ("population_density", |r: &ZipRecord| r.population_density),
    ("housing_units", |r: &ZipRecord| r.housing_units.map(|v| v as f64)),
    ("occupied_housing_units", |r: &ZipRecord| r.occupied_housing_units.map(|v| v as f64)),
    ("median_home_value", |r: &ZipRecord| r.median_home_value.map(|v| v as f64)),
    ("median_household_income", |r: &ZipRecord| r.median_household_income.map(|v| v as f64)),
];

fn describe(metric: &'static str, values: &[f64]) -> MetricSummary {
    let count = values.len();
    if count == 0 {
        return MetricSummary {
            metric,
            count,
            mean: None,
            std: None,
            min: None,
            max: None,
        };
    }

    let mean = values.iter().sum::<f64>() / count as f64;
    let std = (count > 1).then(|| {
        let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (sum_sq / (count - 1) as f64).sqrt()
    });

    MetricSummary {
        metric,
        count,
        mean: Some(mean),
        std,
        min: values.iter().copied().reduce(f64::min),
        max: values.iter().copied().reduce(f64::max),
    }
}

pub fn summarize(records: &[ZipRecord]) -> Vec<MetricSummary> {
    METRICS
        .iter()
        .map(|(metric, extract)| {
            let values: Vec<f64> = records.iter().filter_map(|r| extract(r)).collect();
            describe(*metric, &values)
        })
        .collect()
}

impl AreaSummary {
    pub fn new(city: impl Into<String>, state: impl Into<String>, records: &[ZipRecord]) -> Self {
        Self {
            city: city.into(),
            state: state.into(),
            zip_count: records.len(),
            metrics: summarize(records),
        }
    }

    pub fn metric(&self, name: &str) -> Option<&MetricSummary> {
        self.metrics.iter().find(|m| m.metric == name)
    }
}
