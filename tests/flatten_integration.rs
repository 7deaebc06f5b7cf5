//! Integration tests for quick-mode row flattening.
//!
//! These tests drive the flattener through the public API, from raw
//! join-shaped rows to the JSON a client receives.

use chrono::{NaiveDate, NaiveDateTime};
use pretty_assertions::assert_eq;
use serde_json::json;

use quickview::flatten::{DateTimeRender, RelationNames, flatten};
use quickview::memory::MemorySource;
use quickview::value::records_to_json;
use quickview::{EntitySchema, LookupTables, Query, QuickConfig, Record, Value, format_query_data, record};

const FORMAT: &str = "%Y/%m/%d";

fn served_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 2, 29)
        .and_then(|d| d.and_hms_opt(18, 45, 0))
        .expect("valid date")
}

fn tables() -> LookupTables {
    LookupTables::new()
        .with_rows(
            "rel",
            vec![
                record! { "id" => 1, "label" => "one" },
                record! { "id" => 2, "label" => "two" },
                record! { "id" => 11, "label" => "eleven", "added" => served_at() },
            ],
        )
        .expect("rows have ids")
}

fn render() -> DateTimeRender {
    DateTimeRender::from_config(&QuickConfig::default()).expect("default format is valid")
}

/// Test the merge example: duplicated ids collapse and accumulate relations
#[test]
fn test_merge_example() {
    let rows = vec![
        record! { "id" => 1, "rel" => 1 },
        record! { "id" => 1, "rel" => 2 },
        record! { "id" => 2, "rel" => 11 },
    ];

    let formatted = flatten(&rows, &["rel"], &RelationNames::new(["rel"]), &tables(), &render()).unwrap();

    assert_eq!(
        records_to_json(&formatted),
        json!([
            {"id": 1, "rel": [{"id": 1, "label": "one"}, {"id": 2, "label": "two"}]},
            {"id": 2, "rel": [{"id": 11, "label": "eleven", "added": "2024/02/29"}]},
        ])
    );
}

/// Test empty-value policy for relation and scalar fields
#[test]
fn test_empty_value_policy() {
    let rows = vec![record! { "id" => 5, "rel" => Value::Null }];
    let formatted = flatten(
        &rows,
        &["rel", "note"],
        &RelationNames::new(["rel"]),
        &tables(),
        &render(),
    )
    .unwrap();

    assert_eq!(formatted[0]["rel"], Value::List(Vec::new()));
    assert_eq!(formatted[0]["note"], Value::Null);
    assert_eq!(records_to_json(&formatted), json!([{"id": 5, "rel": [], "note": null}]));
}

/// Test that present relation values always become sequences of objects
#[test]
fn test_relations_are_always_sequences() {
    let rows = vec![record! { "id" => 1, "rel" => 2 }, record! { "id" => 2, "rel" => 1 }];
    let formatted = flatten(&rows, &["rel"], &RelationNames::new(["rel"]), &tables(), &render()).unwrap();

    for row in &formatted {
        let items = row["rel"].as_list().expect("relation output is a list");
        assert!(!items.is_empty());
        assert!(items.iter().all(|item| item.as_map().is_some()));
    }
}

/// Test that scalars pass through unchanged when ids are unique
#[test]
fn test_scalar_passthrough() {
    let row: Record = record! {
        "id" => 3,
        "title" => "Soup",
        "servings" => 4,
        "vegan" => true,
        "rating" => 4.5,
        "meta" => Value::Json(json!({"origin": {"country": "PT"}, "tags": ["warm"]})),
        "steps" => vec!["chop", "boil"],
    };
    let fields = ["title", "servings", "vegan", "rating", "meta", "steps"];

    let formatted = flatten(
        std::slice::from_ref(&row),
        &fields,
        &RelationNames::default(),
        &LookupTables::new(),
        &render(),
    )
    .unwrap();

    assert_eq!(formatted, vec![row]);
}

/// Test datetime rendering at the top level and inside related objects
#[test]
fn test_datetime_rendering_round_trips() {
    let rows = vec![record! { "id" => 1, "served" => served_at(), "rel" => 11 }];
    let formatted = flatten(
        &rows,
        &["served", "rel"],
        &RelationNames::new(["rel"]),
        &tables(),
        &render(),
    )
    .unwrap();

    let served = formatted[0]["served"].as_str().expect("rendered to a string");
    assert_eq!(served, "2024/02/29");
    assert_eq!(
        NaiveDate::parse_from_str(served, FORMAT).unwrap(),
        served_at().date()
    );

    let related = formatted[0]["rel"].as_list().unwrap()[0].as_map().unwrap();
    assert_eq!(related["added"], Value::from("2024/02/29"));
}

/// Test first-seen order across interleaved duplicates
#[test]
fn test_order_preservation() {
    let rows = vec![
        record! { "id" => 9, "rel" => 1 },
        record! { "id" => 4, "rel" => 1 },
        record! { "id" => 9, "rel" => 2 },
        record! { "id" => 7 },
        record! { "id" => 4, "rel" => 11 },
    ];
    let formatted = flatten(&rows, &["rel"], &RelationNames::new(["rel"]), &tables(), &render()).unwrap();

    let ids: Vec<_> = formatted.iter().map(|r| r["id"].clone()).collect();
    assert_eq!(ids, vec![Value::Int(9), Value::Int(4), Value::Int(7)]);
    assert_eq!(formatted[1]["rel"].as_list().unwrap().len(), 2);
}

/// Test text primary keys through a data source
#[tokio::test]
async fn test_format_query_data_with_text_ids() {
    let schema = EntitySchema::new("post")
        .scalar("title")
        .many_to_many("rel", "tag")
        .many_to_one("author", "user");
    let source = MemorySource::new()
        .with_schema(schema.clone())
        .with_schema(EntitySchema::new("tag").scalar("label"));
    source.insert("tag", record! { "id" => "rust", "label" => "Rust" }).unwrap();
    source
        .insert("post", record! { "id" => "hello-world", "title" => "Hello", "rel" => vec!["rust"], "author" => 8 })
        .unwrap();

    let tables = LookupTables::new()
        .with_rows("rel", vec![record! { "id" => "rust", "label" => "Rust" }])
        .unwrap();

    let formatted = format_query_data(&source, &schema, &Query::all("post"), &tables, &render())
        .await
        .unwrap();

    // to-one relations keep their raw key
    assert_eq!(
        records_to_json(&formatted),
        json!([{"id": "hello-world", "title": "Hello", "rel": [{"id": "rust", "label": "Rust"}], "author": 8}])
    );
    assert_eq!(source.fetch_count(), 1);
}
