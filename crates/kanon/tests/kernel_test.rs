//! End-to-end tests for the anonymization kernel.

use indexmap::{indexmap, IndexMap};

use kanon::{coerce_table, Config, Kanon, Parser, RecordTable, TermIndex, Value};

const CONFIG: &str = r#"{
    "parameters": { "k": 2, "strategy": "mondrian", "relational_weight": 1.0 },
    "attributes": {
        "name": { "anonymization_type": "direct_identifier" },
        "age": { "type": "numerical", "anonymization_type": "quasi_identifier" },
        "zip": {
            "type": "nominal",
            "anonymization_type": "quasi_identifier",
            "recoding_strategy": "string_reduction"
        },
        "admitted": { "type": "date", "anonymization_type": "quasi_identifier" }
    }
}"#;

const DATA: &str = "\
name,age,zip,admitted
Alice,25,NE9 5YE,27/09/2020
Bob,29,NE9 5YD,28/09/2020
Carol,47,HP2 7PW,03/01/2021
Dave,52,HP2 7PF,17/02/2021
Erin,31,NE9 5YF,30/09/2020
Frank,49,HP2 7PG,21/03/2021
";

fn load() -> (Kanon, RecordTable) {
    let config = Config::from_json(CONFIG).unwrap();
    let raw = Parser::new().parse_bytes(DATA.as_bytes(), b',').unwrap();
    let table = coerce_table(&raw, &config.schema).unwrap();
    (Kanon::new(config), table)
}

fn assert_covers_exactly(partitions: &[Vec<usize>], rows: usize) {
    let mut seen: Vec<usize> = partitions.iter().flatten().copied().collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..rows).collect::<Vec<_>>());
}

#[test]
fn test_mondrian_end_to_end() {
    let (mut engine, mut table) = load();
    engine.remove_direct_identifiers(&mut table);
    assert!(!table.has_column("name"));

    let outcome = engine.anonymize(&table).unwrap();

    assert_covers_exactly(&outcome.partitions, 6);
    assert!(outcome.partitions.iter().all(|p| p.len() >= 2));
    assert_eq!(outcome.table.row_count(), 6);

    // Every record of a partition carries the same generalized values.
    for partition in &outcome.partitions {
        for attribute in ["age", "zip", "admitted"] {
            let first = outcome.table.get(attribute, partition[0]).unwrap();
            for &index in partition {
                assert_eq!(outcome.table.get(attribute, index).unwrap(), first);
            }
        }
    }

    let statistics = outcome.split_statistics.expect("mondrian reports splits");
    let total_splits: usize = statistics.values().sum();
    assert_eq!(total_splits + 1, outcome.partitions.len());
}

#[test]
fn test_anonymization_is_deterministic() {
    let (mut first_engine, table) = load();
    let (mut second_engine, _) = load();

    let first = first_engine.anonymize(&table).unwrap();
    let second = second_engine.anonymize(&table).unwrap();

    assert_eq!(first.partitions, second.partitions);
    assert_eq!(first.split_statistics, second.split_statistics);
    for name in ["age", "zip", "admitted"] {
        assert_eq!(first.table.column(name), second.table.column(name));
    }
}

#[test]
fn test_loss_is_bounded() {
    let (mut engine, mut table) = load();
    engine.remove_direct_identifiers(&mut table);
    let outcome = engine.anonymize(&table).unwrap();
    let report = engine.score(&table, &outcome.table).unwrap();

    assert!(report.relational >= 0.0 && report.relational <= 1.0);
    assert!(report.total >= 0.0 && report.total <= 1.0);
    assert_eq!(report.total, report.relational);
    assert!(report.textual.is_none());
}

#[test]
fn test_homogeneous_partition_keeps_values() {
    let config = Config::from_json(
        r#"{
            "parameters": { "k": 2 },
            "attributes": {
                "age": { "type": "numerical", "anonymization_type": "quasi_identifier" }
            }
        }"#,
    )
    .unwrap();
    let table = RecordTable::from_columns(indexmap! {
        "age".to_string() => vec![Value::Number(30.0), Value::Number(30.0), Value::Number(30.0)],
    })
    .unwrap();

    let mut engine = Kanon::new(config);
    let outcome = engine.anonymize(&table).unwrap();
    for index in 0..3 {
        assert_eq!(outcome.table.get("age", index), Some(&Value::Number(30.0)));
    }

    let report = engine.score(&table, &outcome.table).unwrap();
    assert_eq!(report.total, 0.0);
}

fn gdf_setup() -> (Config, RecordTable, TermIndex) {
    let config = Config::from_json(
        r#"{
            "parameters": { "k": 2, "strategy": "gdf" },
            "attributes": {
                "notes": { "type": "text", "anonymization_type": "text" }
            },
            "entities": { "notes": ["notes_person"] }
        }"#,
    )
    .unwrap();

    let spans = |names: &[&str]| {
        Value::Tokens(
            names
                .iter()
                .map(|n| kanon::EntitySpan::from_text(*n))
                .collect(),
        )
    };
    let table = RecordTable::from_columns(indexmap! {
        "notes".to_string() => (0..6).map(|i| Value::Text(format!("note {}", i))).collect(),
        "notes_person".to_string() => vec![
            spans(&["alice"]),
            spans(&["alice", "bob"]),
            spans(&["alice"]),
            spans(&["carol"]),
            spans(&["carol", "dave"]),
            spans(&["erin"]),
        ],
    })
    .unwrap();

    let mut terms = TermIndex::new();
    terms.insert("notes_person", "alice", vec![0, 1, 2]);
    terms.insert("notes_person", "carol", vec![3, 4]);
    (config, table, terms)
}

#[test]
fn test_gdf_end_to_end() {
    let (config, table, terms) = gdf_setup();
    let mut engine = Kanon::with_terms(config, terms);
    let outcome = engine.anonymize(&table).unwrap();

    assert_covers_exactly(&outcome.partitions, 6);
    assert!(outcome.split_statistics.is_none());
    assert!(outcome.partitions.contains(&vec![0, 1, 2]));

    // The "alice" partition retains the shared span; its remainder column
    // values stay broadcast per partition.
    match outcome.table.get("notes_person", 0).unwrap() {
        Value::Tokens(spans) => assert!(spans.iter().all(|s| s.lemma == "alice")),
        other => panic!("expected tokens, got {:?}", other),
    }

    let report = engine.score(&table, &outcome.table).unwrap();
    let textual = report.textual.expect("textual mapping configured");
    assert!(textual.total >= 0.0 && textual.total <= 1.0);
    assert!(textual.attributes.contains_key("notes"));
}

#[test]
fn test_score_with_textual_mapping_averages() {
    let (config, table, terms) = gdf_setup();
    let mut engine = Kanon::with_terms(config, terms);
    let outcome = engine.anonymize(&table).unwrap();
    let report = engine.score(&table, &outcome.table).unwrap();

    let textual = report.textual.as_ref().expect("textual detail");
    let expected: f64 = (report.relational + textual.total) / 2.0;
    assert!((report.total - expected).abs() < 1e-12);
}

#[test]
fn test_term_index_round_trips_from_json() {
    let json = r#"{ "notes_person": { "alice": [0, 1, 2], "bob": [3] } }"#;
    let index: TermIndex = serde_json::from_str(json).unwrap();
    assert_eq!(index.attributes(), vec!["notes_person".to_string()]);
    let terms: &IndexMap<String, Vec<usize>> = index.terms("notes_person").unwrap();
    assert_eq!(terms["alice"], vec![0, 1, 2]);
}
