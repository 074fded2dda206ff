use std::collections::{BTreeMap, HashMap};

use crate::error::{PromfanError, Result};

use super::snapshot::{AggregationMode, LabelValue, MergedSnapshot, MetricFamily, MetricType, Sample, Snapshot};

/// Merges an ordered sequence of worker snapshots into one report.
pub trait Aggregator: Send + Sync {
    fn merge(&self, snapshots: &[Snapshot]) -> Result<MergedSnapshot>;
}

/// prom-client compatible aggregation.
///
/// Families are matched by name and kept in first-seen order. Within a family,
/// samples are matched by series name + label set and reduced with the
/// family's [`AggregationMode`]; the mode of the first occurrence wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromAggregator;

type SeriesKey = (String, BTreeMap<String, LabelValue>);

struct FamilyAcc {
    name: String,
    help: String,
    metric_type: MetricType,
    mode: AggregationMode,
    order: Vec<SeriesKey>,
    series: HashMap<SeriesKey, Vec<f64>>,
}

impl FamilyAcc {
    fn new(fam: &MetricFamily) -> Self {
        Self {
            name: fam.name.clone(),
            help: fam.help.clone(),
            metric_type: fam.metric_type,
            mode: fam.aggregator,
            order: Vec::new(),
            series: HashMap::new(),
        }
    }

    fn push(&mut self, s: &Sample) {
        let series = s.metric_name.clone().unwrap_or_else(|| self.name.clone());
        let key = (series, s.labels.clone());
        match self.series.get_mut(&key) {
            Some(vals) => vals.push(s.value),
            None => {
                self.order.push(key.clone());
                self.series.insert(key, vec![s.value]);
            }
        }
    }

    fn finish(mut self) -> MetricFamily {
        let mut values = Vec::with_capacity(self.order.len());
        for key in self.order {
            let Some(vals) = self.series.remove(&key) else { continue };
            let (series, labels) = key;
            let metric_name = if series == self.name { None } else { Some(series) };
            values.push(Sample {
                metric_name,
                labels,
                value: reduce(self.mode, &vals),
            });
        }
        MetricFamily {
            name: self.name,
            help: self.help,
            metric_type: self.metric_type,
            values,
            aggregator: self.mode,
        }
    }
}

fn reduce(mode: AggregationMode, vals: &[f64]) -> f64 {
    match mode {
        AggregationMode::Sum | AggregationMode::Omit => vals.iter().sum(),
        AggregationMode::First => vals.first().copied().unwrap_or(0.0),
        AggregationMode::Min => vals.iter().copied().fold(f64::INFINITY, f64::min),
        AggregationMode::Max => vals.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        AggregationMode::Average => {
            if vals.is_empty() {
                0.0
            } else {
                vals.iter().sum::<f64>() / vals.len() as f64
            }
        }
    }
}

impl Aggregator for PromAggregator {
    fn merge(&self, snapshots: &[Snapshot]) -> Result<MergedSnapshot> {
        let mut order: Vec<String> = Vec::new();
        let mut acc: HashMap<String, FamilyAcc> = HashMap::new();

        for snap in snapshots {
            for fam in &snap.families {
                let entry = acc.entry(fam.name.clone()).or_insert_with(|| {
                    order.push(fam.name.clone());
                    FamilyAcc::new(fam)
                });
                if entry.metric_type != fam.metric_type {
                    return Err(PromfanError::Aggregation(format!(
                        "metric {} reported as both {} and {}",
                        fam.name,
                        entry.metric_type.as_str(),
                        fam.metric_type.as_str()
                    )));
                }
                for s in &fam.values {
                    entry.push(s);
                }
            }
        }

        let mut families = Vec::with_capacity(order.len());
        for name in order {
            let Some(fam) = acc.remove(&name) else { continue };
            if fam.mode == AggregationMode::Omit {
                continue;
            }
            families.push(fam.finish());
        }
        Ok(MergedSnapshot { families })
    }
}
