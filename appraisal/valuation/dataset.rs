use std::{fs, path::Path};

use rand::{rngs::SmallRng, Rng, SeedableRng};
use thiserror::Error;

use crate::records::PropertyRecord;

/// Loads property records from a JSON array or a JSON-lines file.
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<PropertyRecord>, DatasetError> {
    let contents = fs::read_to_string(path.as_ref())?;
    let trimmed = contents.trim_start();
    let records: Vec<PropertyRecord> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)?
    } else {
        contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str(line).map_err(|source| DatasetError::Line {
                    line: idx + 1,
                    source,
                })
            })
            .collect::<Result<_, _>>()?
    };
    if records.is_empty() {
        return Err(DatasetError::Empty);
    }
    Ok(records)
}

/// Deterministic residential dataset with a linear price structure.
///
/// Attributes: `squareFeet`, `bedrooms`, `bathrooms`, `yearBuilt`, `lotSize`;
/// target `assessedValue` with up to $15k of noise.
#[must_use]
pub fn synthetic_records(count: usize, seed: u64) -> Vec<PropertyRecord> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..count)
        .map(|idx| {
            let square_feet: f64 = rng.gen_range(900.0..3_600.0_f64).round();
            let bedrooms = f64::from(rng.gen_range(1_u32..=5));
            let bathrooms = f64::from(rng.gen_range(1_u32..=4));
            let year_built = f64::from(rng.gen_range(1950_u32..=2022));
            let lot_size: f64 = rng.gen_range(2_500.0..15_000.0_f64).round();
            let noise: f64 = rng.gen_range(-15_000.0..15_000.0);
            let value = 40_000.0
                + 120.0 * square_feet
                + 8_000.0 * bedrooms
                + 12_000.0 * bathrooms
                + 900.0 * (year_built - 1950.0)
                + 2.5 * lot_size
                + noise;
            PropertyRecord::new()
                .with_id(format!("synthetic-{idx:04}"))
                .with("squareFeet", square_feet)
                .with("bedrooms", bedrooms)
                .with("bathrooms", bathrooms)
                .with("yearBuilt", year_built)
                .with("lotSize", lot_size)
                .with_target(value.round())
        })
        .collect()
}

/// Errors raised while loading records.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// File holds no records.
    #[error("dataset contains no records")]
    Empty,
    /// I/O error (filesystem).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON array.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// Malformed JSON line.
    #[error("json error on line {line}: {source}")]
    Line {
        /// One-based line number.
        line: usize,
        /// Parser error.
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn loads_json_array() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("records.json");
        let body = json!([
            { "id": "a", "squareFeet": 1500, "assessedValue": 250000 },
            { "id": "b", "squareFeet": null, "assessedValue": "310000" }
        ]);
        fs::write(&path, body.to_string()).unwrap();
        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert!(!records[1].is_present("squareFeet"));
        assert_eq!(records[1].usable_target(), Some(310_000.0));
    }

    #[test]
    fn loads_records_with_numeric_ids_and_nested_attributes() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("county.jsonl");
        let lines = [
            json!({ "id": 17, "squareFeet": 1850, "assessedValue": 300000 }),
            json!({ "id": "p-18", "address": { "street": "1 Main St" }, "tags": ["corner"] }),
        ];
        let body: Vec<String> = lines.iter().map(ToString::to_string).collect();
        fs::write(&path, body.join("\n")).unwrap();
        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id.as_deref(), Some("17"));
        assert!(records[1].is_present("address"));
    }

    #[test]
    fn loads_json_lines_and_reports_bad_line() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("records.jsonl");
        fs::write(
            &path,
            "{\"bedrooms\": 3, \"assessedValue\": 1}\n\n{\"bedrooms\": 2}\n",
        )
        .unwrap();
        assert_eq!(load_records(&path).unwrap().len(), 2);

        fs::write(&path, "{\"bedrooms\": 3}\n{oops}\n").unwrap();
        match load_records(&path) {
            Err(DatasetError::Line { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn empty_file_is_an_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("empty.json");
        fs::write(&path, "[]").unwrap();
        assert!(matches!(load_records(&path), Err(DatasetError::Empty)));
    }

    #[test]
    fn synthetic_data_is_reproducible() {
        let first = synthetic_records(20, 7);
        let second = synthetic_records(20, 7);
        assert_eq!(first, second);
        assert!(first.iter().all(|record| record.usable_target().is_some()));
        assert_eq!(first[3].id.as_deref(), Some("synthetic-0003"));
    }
}
