use std::collections::HashMap;

use crate::error::ValidationError;
use crate::model::{Field, Record};
use crate::tokenizer::{fold, tokenize};

/// AND of per-field substring predicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    predicates: Vec<(Field, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a predicate. Blank needles match everything and are dropped.
    pub fn with(mut self, field: Field, needle: impl Into<String>) -> Self {
        let needle = needle.into().trim().to_string();
        if !needle.is_empty() {
            self.predicates.push((field, needle));
        }
        self
    }

    /// Builds a query from `field -> needle` request parameters.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ValidationError> {
        let mut pairs = params
            .iter()
            .map(|(k, v)| Ok((k.parse::<Field>()?, v.clone())))
            .collect::<Result<Vec<_>, ValidationError>>()?;
        // HashMap order is arbitrary; keep the query reproducible.
        pairs.sort_by_key(|(field, _)| *field);
        Ok(pairs.into_iter().fold(Self::new(), |q, (f, n)| q.with(f, n)))
    }

    pub fn predicates(&self) -> &[(Field, String)] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.predicates
            .iter()
            .all(|(field, needle)| field_matches(field.raw(record), needle))
    }

    /// Matching records, in their original order.
    pub fn apply(&self, records: &[Record]) -> Vec<Record> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

/// Case-insensitive substring match against any single token of `raw`.
fn field_matches(raw: &str, needle: &str) -> bool {
    let needle = fold(needle);
    tokenize(raw).into_iter().any(|token| fold(token).contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: u64, crop: &str, pests: &str, cities: &str) -> Record {
        Record {
            id,
            crop: crop.into(),
            pests: pests.into(),
            pesticides: String::new(),
            area_hectares: 1.0,
            cities: cities.into(),
            created_at: Utc::now(),
        }
    }

    fn sample() -> Vec<Record> {
        vec![
            record(1, "Soja", "Mosca-Branca, Lagarta", "Sorriso"),
            record(2, "Milho", "Lagarta", "Sinop"),
            record(3, "Algodão", "", "Sorriso, Lucas do Rio Verde"),
        ]
    }

    #[test]
    fn no_predicates_returns_everything_in_order() {
        let records = sample();
        assert_eq!(Query::new().apply(&records), records);
        assert_eq!(Query::new().with(Field::Crop, "   ").apply(&records), records);
    }

    #[test]
    fn case_insensitive_token_substring() {
        let hits = Query::new().with(Field::Pests, "branca").apply(&sample());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
    }

    #[test]
    fn needle_does_not_span_tokens() {
        // "Branca, Lagarta" only exists across the comma
        assert!(Query::new().with(Field::Pests, "branca, lag").apply(&sample()).is_empty());
    }

    #[test]
    fn predicates_are_anded() {
        let q = Query::new().with(Field::Cities, "sorriso").with(Field::Pests, "lagarta");
        let ids: Vec<u64> = q.apply(&sample()).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn params_reject_unknown_fields() {
        let mut params = HashMap::new();
        params.insert("cidade".to_string(), "sinop".to_string());
        let q = Query::from_params(&params).unwrap();
        assert_eq!(q.apply(&sample()).len(), 1);

        params.insert("hectares".to_string(), "10".to_string());
        assert!(Query::from_params(&params).is_err());
    }
}
