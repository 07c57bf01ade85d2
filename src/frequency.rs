use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Field, Record};
use crate::tokenizer::{fold, tokenize, Vocabulary};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TokenFrequency {
    pub token: String,
    /// Occurrences across the flattened multiset, not records containing it
    pub count: u64,
    /// count / total_records * 100, rounded to 2 places
    pub percentage: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FrequencyTable {
    pub field: Field,
    /// Descending by count, ties by first occurrence
    pub entries: Vec<TokenFrequency>,
    pub total_records: usize,
    pub total_distinct_tokens: usize,
    pub total_token_occurrences: u64,
    pub mean_occurrences_per_record: f64,
}

impl FrequencyTable {
    fn empty(field: Field) -> Self {
        Self {
            field,
            entries: Vec::new(),
            total_records: 0,
            total_distinct_tokens: 0,
            total_token_occurrences: 0,
            mean_occurrences_per_record: 0.0,
        }
    }

    /// Case-insensitive lookup.
    pub fn get(&self, token: &str) -> Option<&TokenFrequency> {
        let key = fold(token);
        self.entries.iter().find(|e| fold(&e.token) == key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Two decimal places, ties to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Token frequencies of `field` over `records`.
pub fn aggregate(records: &[Record], field: Field) -> FrequencyTable {
    let total_records = records.len();
    if total_records == 0 {
        return FrequencyTable::empty(field);
    }

    let mut vocab = Vocabulary::new();
    let mut counts: Vec<u64> = Vec::new();

    for record in records {
        for token in tokenize(field.raw(record)) {
            let slot = vocab.intern(token);
            if slot == counts.len() {
                counts.push(0);
            }
            if let Some(c) = counts.get_mut(slot) {
                *c += 1;
            }
        }
    }

    // Slots are in first-seen order; a stable sort keeps that for ties.
    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|a, b| counts[*b].cmp(&counts[*a]));

    let entries: Vec<TokenFrequency> = order
        .into_iter()
        .map(|slot| {
            let count = counts[slot];
            TokenFrequency {
                token: vocab.form(slot).to_string(),
                count,
                percentage: round2(count as f64 / total_records as f64 * 100.0),
            }
        })
        .collect();

    let total_token_occurrences: u64 = counts.iter().sum();
    debug!(%field, distinct = entries.len(), occurrences = total_token_occurrences, "aggregated");

    FrequencyTable {
        field,
        total_distinct_tokens: entries.len(),
        entries,
        total_records,
        total_token_occurrences,
        mean_occurrences_per_record: total_token_occurrences as f64 / total_records as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: u64, crop: &str, pests: &str) -> Record {
        Record {
            id,
            crop: crop.into(),
            pests: pests.into(),
            pesticides: String::new(),
            area_hectares: 1.0,
            cities: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_input_is_empty_table() {
        let table = aggregate(&[], Field::Pests);
        assert!(table.is_empty());
        assert_eq!(table.total_records, 0);
        assert_eq!(table.mean_occurrences_per_record, 0.0);
    }

    #[test]
    fn counts_occurrences_not_records() {
        let records = vec![record(1, "Soja", "Aphid, Aphid, Mite"), record(2, "Milho", "Mite")];
        let table = aggregate(&records, Field::Pests);
        assert_eq!(table.get("aphid").unwrap().count, 2);
        assert_eq!(table.get("Aphid").unwrap().percentage, 100.0);
        assert_eq!(table.get("Mite").unwrap().count, 2);
        assert_eq!(table.total_token_occurrences, 4);
        assert_eq!(table.mean_occurrences_per_record, 2.0);
    }

    #[test]
    fn ties_keep_first_occurrence_order() {
        let records = vec![
            record(1, "Soja", "Mite, Aphid"),
            record(2, "Soja", "Thrips"),
            record(3, "Soja", "aphid"),
        ];
        let table = aggregate(&records, Field::Pests);
        let tokens: Vec<&str> = table.entries.iter().map(|e| e.token.as_str()).collect();
        assert_eq!(tokens, vec!["Aphid", "Mite", "Thrips"]);
    }

    #[test]
    fn percentage_is_over_record_count() {
        let records = vec![
            record(1, "Soja", "A, B"),
            record(2, "Soja", "A"),
            record(3, "Soja", ""),
        ];
        let table = aggregate(&records, Field::Pests);
        let sum: u64 = table.entries.iter().map(|e| e.count).sum();
        assert_eq!(sum, table.total_token_occurrences);
        for entry in &table.entries {
            assert_eq!(entry.percentage, round2(entry.count as f64 / 3.0 * 100.0));
        }
        assert_eq!(table.get("A").unwrap().percentage, 66.67);
        assert_eq!(table.get("B").unwrap().percentage, 33.33);
    }

    #[test]
    fn percentage_ties_round_to_even() {
        let mut records: Vec<Record> = (1..=32).map(|id| record(id, "Soja", "")).collect();
        records[0].pests = "Lagarta".into();
        for id in [2, 3, 4, 5] {
            records[id as usize - 1].pests = "Percevejo".into();
        }
        let table = aggregate(&records, Field::Pests);
        assert_eq!(table.get("Lagarta").unwrap().percentage, 3.12);
        assert_eq!(table.get("Percevejo").unwrap().percentage, 12.5);

        assert_eq!(round2(5.0 / 32.0 * 100.0), 15.62);
        assert_eq!(round2(9.0 / 32.0 * 100.0), 28.12);
        assert_eq!(round2(3.0 / 32.0 * 100.0), 9.38);
    }

    #[test]
    fn case_variants_share_one_entry() {
        let records = vec![record(1, "Soja", "Lagarta"), record(2, "soja", "LAGARTA")];
        let table = aggregate(&records, Field::Crop);
        assert_eq!(table.entries.len(), 1);
        assert_eq!(table.entries[0].token, "Soja");
        assert_eq!(table.entries[0].count, 2);
    }
}
