use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::model::{Field, Record};
use crate::tokenizer::Vocabulary;

/// Scalar overview of a record set. All zeros for an empty set.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Summary {
    pub total_records: usize,
    pub total_hectares: f64,
    pub mean_hectares: f64,
    pub max_hectares: f64,
    pub min_hectares: f64,
    pub distinct_crops: usize,
    pub distinct_pests: usize,
    pub distinct_pesticides: usize,
    pub distinct_cities: usize,
}

pub fn summarize(records: &[Record]) -> Summary {
    if records.is_empty() {
        return Summary::default();
    }

    let areas = records.iter().map(|r| OrderedFloat(r.area_hectares));
    let total_hectares: f64 = records.iter().map(|r| r.area_hectares).sum();
    let distinct = |field| Vocabulary::of_field(records, field).len();

    Summary {
        total_records: records.len(),
        total_hectares,
        mean_hectares: total_hectares / records.len() as f64,
        max_hectares: areas.clone().max().map(|v| v.0).unwrap_or_default(),
        min_hectares: areas.min().map(|v| v.0).unwrap_or_default(),
        distinct_crops: distinct(Field::Crop),
        distinct_pests: distinct(Field::Pests),
        distinct_pesticides: distinct(Field::Pesticides),
        distinct_cities: distinct(Field::Cities),
    }
}
