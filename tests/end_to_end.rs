use natureseek::crosstab::CrossTab;
use natureseek::filter::Query;
use natureseek::frequency::{aggregate, round2};
use natureseek::model::{Field, RecordDraft};
use natureseek::storage::{JsonFileStore, RecordStore};
use natureseek::summary::summarize;
use natureseek::{DeleteOutcome, NatureDb};
use tempfile::tempdir;

fn draft(crop: &str, pests: &str, pesticides: &str, area: &str, cities: &str) -> RecordDraft {
    RecordDraft {
        crop: crop.into(),
        pests: pests.into(),
        pesticides: pesticides.into(),
        area_hectares: area.into(),
        cities: cities.into(),
    }
}

#[test]
fn soja_and_milho_scenario() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.json");
    let db = NatureDb::new(JsonFileStore::new(&path));
    assert!(db.records().is_empty());

    db.register(&draft("Soja", "Lagarta, Percevejo", "Imidacloprido", "10.5", "Sorriso")).unwrap();
    db.register(&draft("Milho", "Lagarta", "", "5.0", "Sorriso")).unwrap();
    assert!(path.exists());

    let records = db.records();
    let pests = aggregate(&records, Field::Pests);
    assert_eq!(pests.entries.len(), 2);
    assert_eq!(pests.entries[0].token, "Lagarta");
    assert_eq!(pests.entries[0].count, 2);
    assert_eq!(pests.entries[0].percentage, 100.0);
    assert_eq!(pests.entries[1].token, "Percevejo");
    assert_eq!(pests.entries[1].count, 1);
    assert_eq!(pests.entries[1].percentage, 50.0);

    assert_eq!(summarize(&records).total_hectares, 15.5);

    let hits = Query::new().with(Field::Cities, "sorriso").apply(&records);
    assert_eq!(hits, records);
}

#[test]
fn store_survives_reopen_and_delete() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.json");

    {
        let db = NatureDb::new(JsonFileStore::new(&path));
        db.register(&draft("Soja", "Lagarta", "", "1", "Sinop")).unwrap();
        db.register(&draft("Milho", "", "", "2", "Sinop")).unwrap();
    }

    let db = NatureDb::new(JsonFileStore::new(&path));
    assert_eq!(db.records().len(), 2);

    assert_eq!(db.delete(99).unwrap(), DeleteOutcome::NotFound);
    assert_eq!(db.records().len(), 2);

    assert_eq!(db.delete(1).unwrap(), DeleteOutcome::Deleted);
    let left = JsonFileStore::new(&path).load().unwrap();
    assert_eq!(left.records.len(), 1);
    assert_eq!(left.records[0].crop, "Milho");
}

#[test]
fn rejected_registration_does_not_touch_the_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.json");
    let db = NatureDb::new(JsonFileStore::new(&path));

    assert!(db.register(&draft("Soja", "", "", "0", "")).is_err());
    assert!(db.register(&draft("Soja", "", "", "-4", "")).is_err());
    assert!(!path.exists());

    db.register(&draft("Soja", "", "", "4", "")).unwrap();
    let before = std::fs::read_to_string(&path).unwrap();
    assert!(db.register(&draft("Soja", "", "", "zero", "")).is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn engine_properties_over_a_mixed_table() {
    let dir = tempdir().unwrap();
    let db = NatureDb::new(JsonFileStore::new(dir.path().join("records.json")));
    let rows = [
        ("Soja", "Lagarta, Percevejo, Lagarta", "Imidacloprido, Tiametoxam", "12", "Sorriso, Sinop"),
        ("Milho", "Cigarrinha", "Imidacloprido", "8.25", "Sorriso"),
        ("Algodão", "Bicudo, Mosca-Branca", "", "30", "Campo Verde"),
        ("Soja", "", "Glifosato", "3", ""),
        ("soja", "lagarta", "imidacloprido", "1.5", "sorriso"),
    ];
    for (crop, pests, pesticides, area, cities) in rows {
        db.register(&draft(crop, pests, pesticides, area, cities)).unwrap();
    }
    let records = db.records();
    let n = records.len() as f64;

    for field in Field::ALL {
        let table = aggregate(&records, field);
        let sum: u64 = table.entries.iter().map(|e| e.count).sum();
        assert_eq!(sum, table.total_token_occurrences);
        for e in &table.entries {
            assert_eq!(e.percentage, round2(e.count as f64 / n * 100.0));
        }
        assert!(table.entries.windows(2).all(|w| w[0].count >= w[1].count));
    }

    for a in Field::ALL {
        for b in Field::ALL {
            let direct = CrossTab::compute(&records, a, b);
            let reverse = CrossTab::compute(&records, b, a);
            for (ta, tb, count) in direct.pairs() {
                assert_eq!(reverse.get(tb, ta), count, "{a} x {b}: {ta}/{tb}");
            }
            assert_eq!(direct.pairs().count(), reverse.pairs().count());
        }
    }

    let summary = db.summary();
    assert_eq!(summary.distinct_crops, 3);
    assert_eq!(summary.distinct_pests, 5);
    assert_eq!(summary.distinct_pesticides, 3);
    assert_eq!(summary.distinct_cities, 3);
    assert_eq!(summary.max_hectares, 30.0);
    assert_eq!(summary.min_hectares, 1.5);

    let dashboard = db.dashboard();
    assert_eq!(dashboard.pesticides_per_pest.row("Lagarta").map(|r| r.total), Some(5));
}
