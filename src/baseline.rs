//! Loader for the static baseline dataset: one CSV row per original wizard, a `token_id`
//! column plus one column per recognized trait.

use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use crate::{
    error::SoulburnError,
    properties::{trait_name, BaselineRow, TokenId},
};

pub const TOKEN_ID_COLUMN: &str = "token_id";

/// Where a refresh cycle gets its baseline rows. Loaded fresh on every cycle.
pub trait BaselineSource: Send + Sync {
    fn load(&self) -> Result<Vec<BaselineRow>, SoulburnError>;
}

/// Baseline read from a CSV file on each load.
#[derive(Debug, Clone)]
pub struct CsvBaseline {
    path: PathBuf,
}

impl CsvBaseline {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        CsvBaseline { path: path.into() }
    }
}

impl BaselineSource for CsvBaseline {
    fn load(&self) -> Result<Vec<BaselineRow>, SoulburnError> {
        load_csv(&self.path)
    }
}

/// Fixed in-memory rows.
impl BaselineSource for Vec<BaselineRow> {
    fn load(&self) -> Result<Vec<BaselineRow>, SoulburnError> {
        Ok(self.clone())
    }
}

pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Vec<BaselineRow>, SoulburnError> {
    tracing::debug!("Reading baseline dataset {:?}", path.as_ref());
    let file = File::open(path.as_ref())?;
    read_csv(file)
}

/// Parses baseline rows from CSV text. Columns outside the trait vocabulary are ignored;
/// rows whose token id does not normalize are skipped.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<BaselineRow>, SoulburnError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let token_col = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(TOKEN_ID_COLUMN))
        .ok_or_else(|| {
            SoulburnError::Baseline(format!("missing '{TOKEN_ID_COLUMN}' column"))
        })?;
    let trait_cols: Vec<(usize, &'static str)> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| trait_name(h).map(|name| (i, name)))
        .collect();

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let raw_id = record.get(token_col).unwrap_or_default();
        let Some(token_id) = TokenId::parse(raw_id) else {
            tracing::warn!("Skipping baseline row {}: bad token id '{raw_id}'", line + 2);
            continue;
        };
        let mut row = BaselineRow::new(token_id);
        for (col, name) in trait_cols.iter() {
            if let Some(value) = record.get(*col) {
                row.traits.insert(name.to_string(), value.to_string());
            }
        }
        rows.push(row);
    }
    tracing::info!("Loaded {} baseline wizards", rows.len());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use test_log::test;

    const SAMPLE: &str = "\
token_id,name,Head,body,prop,familiar,rune,background,serial
0,Wizard Zero,Wizard Hat,Robe,Staff,Cat,Sun,Blue,0
1,Wizard One,Hood,Robe,,Owl,Moon,Red,1

2,Wizard Two,Wizard Hat,Cloak,Wand,,Sun,Blue,2
";

    #[test]
    fn test_reads_trait_columns() {
        let rows = read_csv(SAMPLE.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].token_id.as_str(), "0");
        assert_eq!(rows[0].traits.get("head").map(String::as_str), Some("Wizard Hat"));
        assert!(!rows[0].traits.contains_key("name"));
        assert!(!rows[0].traits.contains_key("serial"));
        assert_eq!(rows[1].traits.get("prop").map(String::as_str), Some(""));
        assert_eq!(rows[2].traits.get("body").map(String::as_str), Some("Cloak"));
    }

    #[test]
    fn test_missing_token_column() {
        let err = read_csv("id,head\n1,Hood\n".as_bytes()).unwrap_err();
        assert!(matches!(err, SoulburnError::Baseline(_)));
    }

    #[test]
    fn test_bad_token_ids_are_skipped() {
        let rows = read_csv("token_id,head\nabc,Hood\n0x10,Hat\n".as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].token_id.as_str(), "16");
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let rows = load_csv(file.path()).unwrap();
        assert_eq!(rows.len(), 3);

        let source = CsvBaseline::new(file.path());
        assert_eq!(source.load().unwrap(), rows);

        let missing = CsvBaseline::new(file.path().with_extension("missing"))
            .load()
            .unwrap_err();
        assert!(matches!(missing, SoulburnError::NotFound(_)));
    }
}
