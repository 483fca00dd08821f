use std::collections::HashMap;

use crate::tournaments::rounds::draws::DebateRecord;

pub mod points;
pub mod tss;

/// A per-team standings metric, computed over the debates which count
/// towards the standings.
pub trait Metric<V> {
    fn compute(&self, debates: &[&DebateRecord]) -> HashMap<String, V>;
}

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub enum MetricValue {
    Integer(i64),
    Float(f64),
}

impl MetricValue {
    pub fn as_f64(self) -> f64 {
        match self {
            MetricValue::Integer(integer) => integer as f64,
            MetricValue::Float(float) => float,
        }
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Integer(integer) => write!(f, "{integer}"),
            MetricValue::Float(float) => write!(f, "{float:.2}"),
        }
    }
}
