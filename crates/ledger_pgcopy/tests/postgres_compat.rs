//! Wire compatibility with the PostgreSQL client library.
//!
//! Every field payload written by the encoders is decoded here with
//! `postgres-types`' own `FromSql` implementations, which are the same
//! routines a client uses to read binary COPY output.

use chrono::NaiveDate;
use ledger_pgcopy::schema::{Column, Table};
use ledger_pgcopy::{read_copy, write_header, write_trailer, FieldValue, RawRow, TableEncoder};
use postgres_types::{FromSql, Type};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

static SAMPLE_TABLE: Table = Table {
    name: "sample",
    columns: &[
        Column::uuid("id"),
        Column::varchar("name", true),
        Column::numeric("amount"),
        Column::date("day", false),
        Column::boolean("merge"),
        Column::jsonb("meta"),
        Column::varchar_array("tags", false),
    ],
};

fn encode_one(values: Vec<FieldValue>) -> RawRow {
    let encoder = TableEncoder::compile(&SAMPLE_TABLE).unwrap();
    let mut data = Vec::new();
    write_header(&mut data).unwrap();
    data.extend(encoder.encode_row(&values).unwrap());
    write_trailer(&mut data).unwrap();
    read_copy(&data).unwrap().rows.remove(0)
}

fn sample_row(amount: Decimal, day: NaiveDate, tags: &[&str]) -> (Uuid, RawRow) {
    let id = Uuid::new_v4();
    let row = encode_one(vec![
        FieldValue::Uuid(id),
        FieldValue::text("Assets:Cash"),
        FieldValue::Decimal(amount),
        FieldValue::Date(day),
        FieldValue::Bool(true),
        FieldValue::Json(br#"{"filename":"main.bean","lineno":7}"#.to_vec()),
        FieldValue::text_array(tags.iter().copied()),
    ]);
    (id, row)
}

#[test]
fn test_scalars_decode_with_from_sql() {
    let day = NaiveDate::from_ymd_opt(2022, 4, 1).unwrap();
    let (id, row) = sample_row(Decimal::from_str("123.45").unwrap(), day, &["USD", "TWD"]);

    let decoded_id = Uuid::from_sql(&Type::UUID, row.field(0).unwrap()).unwrap();
    assert_eq!(decoded_id, id);

    let name = String::from_sql(&Type::VARCHAR, row.field(1).unwrap()).unwrap();
    assert_eq!(name, "Assets:Cash");

    let decoded_day = NaiveDate::from_sql(&Type::DATE, row.field(3).unwrap()).unwrap();
    assert_eq!(decoded_day, day);

    let merge = bool::from_sql(&Type::BOOL, row.field(4).unwrap()).unwrap();
    assert!(merge);

    let meta = serde_json::Value::from_sql(&Type::JSONB, row.field(5).unwrap()).unwrap();
    assert_eq!(meta, serde_json::json!({"filename": "main.bean", "lineno": 7}));

    let tags = Vec::<String>::from_sql(&Type::VARCHAR_ARRAY, row.field(6).unwrap()).unwrap();
    assert_eq!(tags, ["USD", "TWD"]);
}

#[test]
fn test_numeric_decodes_with_from_sql() {
    let day = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    for text in [
        "0",
        "1",
        "-1.0",
        "0.05",
        "623.44",
        "10000",
        "-0.00012",
        "123456789.987654321",
        "79228162514264337593543950335",
    ] {
        let expected = Decimal::from_str(text).unwrap();
        let (_, row) = sample_row(expected, day, &[]);
        let decoded = Decimal::from_sql(&Type::NUMERIC, row.field(2).unwrap()).unwrap();
        assert_eq!(decoded, expected, "{}", text);
        assert_eq!(decoded.scale(), expected.scale(), "{}", text);
    }
}

#[test]
fn test_dates_around_epoch() {
    for (y, m, d) in [(1970, 1, 1), (1999, 12, 31), (2000, 1, 1), (2024, 2, 29)] {
        let day = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        let (_, row) = sample_row(Decimal::ONE, day, &[]);
        let decoded = NaiveDate::from_sql(&Type::DATE, row.field(3).unwrap()).unwrap();
        assert_eq!(decoded, day);
    }
}

#[test]
fn test_empty_array_decodes_as_empty() {
    let day = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    let (_, row) = sample_row(Decimal::ONE, day, &[]);
    let tags = Vec::<String>::from_sql(&Type::VARCHAR_ARRAY, row.field(6).unwrap()).unwrap();
    assert!(tags.is_empty());
}

#[test]
fn test_null_fields_are_absent_not_empty() {
    let row = encode_one(vec![
        FieldValue::Uuid(Uuid::new_v4()),
        FieldValue::text(""),
        FieldValue::Null,
        FieldValue::Null,
        FieldValue::Null,
        FieldValue::Json(b"{}".to_vec()),
        FieldValue::Null,
    ]);
    assert_eq!(row.field(1), Some(&b""[..]));
    for index in [2, 3, 4, 6] {
        assert!(row.is_null(index), "field {}", index);
        assert_eq!(row.field(index), None);
    }
}
