use std::collections::BTreeMap;
use std::fmt::{self, Write};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Metric kind as reported by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
    Summary,
    Untyped,
}

impl MetricType {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Histogram => "histogram",
            MetricType::Summary => "summary",
            MetricType::Untyped => "untyped",
        }
    }
}

/// How samples sharing a series are combined across workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    #[default]
    Sum,
    First,
    Min,
    Max,
    Average,
    /// Drop the family from the merged output.
    Omit,
}

/// Label value. Workers may send numbers (e.g. histogram `le`) or booleans;
/// they are normalised to their textual form on decode.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelValue(pub String);

impl LabelValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LabelValue {
    fn from(s: &str) -> Self {
        LabelValue(s.to_string())
    }
}

impl fmt::Display for LabelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLabel {
    Str(String),
    Num(serde_json::Number),
    Bool(bool),
}

impl<'de> Deserialize<'de> for LabelValue {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        Ok(match RawLabel::deserialize(d)? {
            RawLabel::Str(s) => LabelValue(s),
            RawLabel::Num(n) => LabelValue(n.to_string()),
            RawLabel::Bool(b) => LabelValue(b.to_string()),
        })
    }
}

impl Serialize for LabelValue {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

/// One series value inside a family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    /// Series name when it differs from the family (`_bucket`, `_sum`, `_count`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_name: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, LabelValue>,
    pub value: f64,
}

/// A named metric with its samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFamily {
    pub name: String,
    #[serde(default)]
    pub help: String,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    #[serde(default)]
    pub values: Vec<Sample>,
    #[serde(default)]
    pub aggregator: AggregationMode,
}

/// One worker's metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    pub families: Vec<MetricFamily>,
}

impl Snapshot {
    pub fn new(families: Vec<MetricFamily>) -> Self {
        Self { families }
    }
}

/// Combined report over all collected snapshots.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergedSnapshot {
    pub families: Vec<MetricFamily>,
}

impl MergedSnapshot {
    /// Result of an operation that targeted no workers.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    pub fn family(&self, name: &str) -> Option<&MetricFamily> {
        self.families.iter().find(|f| f.name == name)
    }

    /// Render in Prometheus text exposition format (0.0.4).
    /// An empty snapshot renders as an empty string.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for fam in &self.families {
            let _ = writeln!(out, "# HELP {} {}", fam.name, escape_help(&fam.help));
            let _ = writeln!(out, "# TYPE {} {}", fam.name, fam.metric_type.as_str());
            for s in &fam.values {
                let name = s.metric_name.as_deref().unwrap_or(&fam.name);
                if s.labels.is_empty() {
                    let _ = writeln!(out, "{} {}", name, format_value(s.value));
                } else {
                    let label_str = s
                        .labels
                        .iter()
                        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v.as_str())))
                        .collect::<Vec<_>>()
                        .join(",");
                    let _ = writeln!(out, "{}{{{}}} {}", name, label_str, format_value(s.value));
                }
            }
        }
        out
    }
}

fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".into()
    } else if v == f64::INFINITY {
        "+Inf".into()
    } else if v == f64::NEG_INFINITY {
        "-Inf".into()
    } else {
        v.to_string()
    }
}
