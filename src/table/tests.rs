//! Unit tests for typed tables

use super::*;
use serde::Serialize;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Line {
    season: i64,
    name: String,
    ba: f64,
    bats: Option<String>,
}

impl Record for Line {
    fn schema() -> Schema {
        Schema::of(&[
            ("season", ColumnType::Int),
            ("name", ColumnType::Text),
            ("ba", ColumnType::Float),
            ("bats", ColumnType::Text),
        ])
    }
}

#[derive(Serialize)]
struct MissingColumn {
    season: i64,
}

impl Record for MissingColumn {
    fn schema() -> Schema {
        Schema::of(&[("season", ColumnType::Int), ("name", ColumnType::Text)])
    }
}

fn lines() -> Vec<Line> {
    vec![
        Line {
            season: 2024,
            name: "Mookie Betts".to_string(),
            ba: 0.289,
            bats: Some("Right".to_string()),
        },
        Line {
            season: 2023,
            name: "Freddie Freeman".to_string(),
            ba: 0.331,
            bats: None,
        },
    ]
}

#[test]
fn test_from_records_follows_schema_order() {
    let table = Table::from_records(&lines()).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(
        table.schema().names().collect::<Vec<_>>(),
        vec!["season", "name", "ba", "bats"]
    );
    assert_eq!(table.get(0, "season"), Some(&Value::Int(2024)));
    assert_eq!(table.get(1, "bats"), Some(&Value::Null));
}

#[test]
fn test_from_records_rejects_missing_column() {
    let result = Table::from_records(&[MissingColumn { season: 2024 }]);
    assert!(matches!(result, Err(DataError::Schema { .. })));
}

#[test]
fn test_to_records_round_trip() {
    let table = Table::from_records(&lines()).unwrap();
    let back: Vec<Line> = table.to_records().unwrap();
    assert_eq!(back, lines());
}

#[test]
fn test_cast_rules() {
    assert_eq!(Value::from("2,024").cast(ColumnType::Int), Some(Value::Int(2024)));
    assert_eq!(Value::from(".250").cast(ColumnType::Float), Some(Value::Float(0.25)));
    assert_eq!(Value::Float(3.0).cast(ColumnType::Int), Some(Value::Int(3)));
    assert_eq!(Value::Float(3.5).cast(ColumnType::Int), None);
    assert_eq!(Value::Int(7).cast(ColumnType::Float), Some(Value::Float(7.0)));
    assert_eq!(Value::from("").cast(ColumnType::Int), Some(Value::Null));
    assert_eq!(Value::from("True").cast(ColumnType::Bool), Some(Value::Bool(true)));
    assert_eq!(Value::from("abc").cast(ColumnType::Int), None);
    assert_eq!(Value::Bool(true).cast(ColumnType::Text), Some(Value::from("true")));
}

#[test]
fn test_conform_fills_missing_and_drops_extra_columns() {
    let source = Table::from_rows(
        Schema::of(&[
            ("name", ColumnType::Text),
            ("season", ColumnType::Text),
            ("legacy", ColumnType::Int),
        ]),
        vec![vec![Value::from("Clayton Kershaw"), Value::from("2014"), Value::Int(1)]],
    )
    .unwrap();

    let conformed = source.conform(&Line::schema());
    assert_eq!(conformed.schema(), &Line::schema());
    assert_eq!(conformed.get(0, "season"), Some(&Value::Int(2014)));
    assert_eq!(conformed.get(0, "ba"), Some(&Value::Null));
    assert!(conformed.schema().index_of("legacy").is_none());
}

#[test]
fn test_conform_nulls_uncastable_values() {
    let source = Table::from_rows(
        Schema::of(&[("season", ColumnType::Text)]),
        vec![vec![Value::from("unknown")]],
    )
    .unwrap();
    let conformed = source.conform(&Schema::of(&[("season", ColumnType::Int)]));
    assert_eq!(conformed.get(0, "season"), Some(&Value::Null));
}

#[test]
fn test_sort_by_puts_nulls_last_in_both_directions() {
    let schema = Schema::of(&[("season", ColumnType::Int)]);
    let rows = vec![
        vec![Value::Int(2022)],
        vec![Value::Null],
        vec![Value::Int(2024)],
        vec![Value::Int(2023)],
    ];

    let mut asc = Table::from_rows(schema.clone(), rows.clone()).unwrap();
    asc.sort_by("season", false).unwrap();
    assert_eq!(
        asc.column_values("season").unwrap(),
        vec![&Value::Int(2022), &Value::Int(2023), &Value::Int(2024), &Value::Null]
    );

    let mut desc = Table::from_rows(schema, rows).unwrap();
    desc.sort_by("season", true).unwrap();
    assert_eq!(
        desc.column_values("season").unwrap(),
        vec![&Value::Int(2024), &Value::Int(2023), &Value::Int(2022), &Value::Null]
    );
}

#[test]
fn test_sort_by_columns_is_lexicographic() {
    let schema = Schema::of(&[("inning", ColumnType::Int), ("pitch", ColumnType::Int)]);
    let mut table = Table::from_rows(
        schema,
        vec![
            vec![Value::Int(2), Value::Int(1)],
            vec![Value::Int(1), Value::Int(3)],
            vec![Value::Int(1), Value::Int(1)],
        ],
    )
    .unwrap();
    table.sort_by_columns(&["inning", "pitch"], false).unwrap();
    let pairs: Vec<(i64, i64)> = table
        .rows()
        .iter()
        .map(|r| (r[0].as_i64().unwrap(), r[1].as_i64().unwrap()))
        .collect();
    assert_eq!(pairs, vec![(1, 1), (1, 3), (2, 1)]);
}

#[test]
fn test_filter_and_push_row_validation() {
    let mut table = Table::from_records(&lines()).unwrap();
    assert!(table.push_row(vec![Value::Int(1)]).is_err());

    let recent = table
        .filter("season", |v| v.as_i64() == Some(2024))
        .unwrap();
    assert_eq!(recent.len(), 1);
}

#[test]
fn test_json_serialization_of_non_finite_floats() {
    assert_eq!(Value::Float(f64::NAN).to_json(), serde_json::Value::Null);
    assert_eq!(Value::Float(1.5).to_json(), serde_json::json!(1.5));
}
