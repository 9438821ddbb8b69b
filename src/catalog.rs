// Catalog schema, CSV column mapper, and the replace-all import pipeline.
//
// Column binding is by header name, never by position. Required columns
// fail the whole parse; optional columns fall back to defaults. Nothing is
// written to the store until every row has parsed.

use serde::{Deserialize, Serialize};
use std::io::Read;
use std::sync::{Arc, Mutex};

use crate::error::ImportError;
use crate::store::CatalogStore;

/// Placeholder image shown when the CSV carries no ImageUrl column/cell.
pub const DEFAULT_IMAGE_URL: &str = "/images/default.png";

/// Placeholder link shown when the CSV carries no LearnMoreUrl column/cell.
pub const DEFAULT_LEARN_MORE_URL: &str = "#";

/// Columns that must be present in the header and non-empty in every row.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "Name",
    "ShortDescription",
    "DetailedDescription",
    "Benefits",
    "HowToGetStarted",
    "TimelinePosition",
    "IsPriority",
];

/// One financial-product row of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Surrogate id assigned by the store on insert; 0 before insertion.
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub short_description: String,
    pub detailed_description: String,
    pub benefits: String,
    pub how_to_get_started: String,
    pub image_url: String,
    pub learn_more_url: String,
    /// Display sort key. Duplicates and gaps are allowed.
    pub timeline_position: i64,
    pub is_priority: bool,
}

/// Header-name to column-index binding for one CSV file.
struct ColumnMap {
    headers: csv::StringRecord,
}

impl ColumnMap {
    fn new(headers: csv::StringRecord) -> Self {
        Self { headers }
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Cell under a required column. Missing or empty fails the parse.
    fn required<'r>(
        &self,
        row: &'r csv::StringRecord,
        line: usize,
        name: &str,
    ) -> Result<&'r str, ImportError> {
        let idx = self
            .find(name)
            .ok_or_else(|| ImportError::Parse(format!("missing required column '{name}'")))?;
        match row.get(idx).map(str::trim) {
            Some(cell) if !cell.is_empty() => Ok(cell),
            _ => Err(ImportError::Parse(format!(
                "row {line}: empty value for required column '{name}'"
            ))),
        }
    }

    /// Cell under an optional column, defaulted when the column or cell is
    /// absent. "Optional" tolerates absence, not arbitrary content.
    fn optional(&self, row: &csv::StringRecord, name: &str, default: &str) -> String {
        match self.find(name).and_then(|idx| row.get(idx)).map(str::trim) {
            Some(cell) if !cell.is_empty() => cell.to_string(),
            _ => default.to_string(),
        }
    }
}

fn parse_bool(cell: &str, line: usize, name: &str) -> Result<bool, ImportError> {
    match cell.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ImportError::Parse(format!(
            "row {line}: column '{name}' expects true/false, got '{cell}'"
        ))),
    }
}

fn parse_i64(cell: &str, line: usize, name: &str) -> Result<i64, ImportError> {
    cell.parse::<i64>().map_err(|_| {
        ImportError::Parse(format!(
            "row {line}: column '{name}' expects an integer, got '{cell}'"
        ))
    })
}

/// Parse an entire catalog CSV into entries, fail-fast.
///
/// A single malformed required field aborts the whole parse so the caller
/// never writes a partial import.
pub fn parse_catalog_csv<R: Read>(input: R) -> Result<Vec<CatalogEntry>, ImportError> {
    let mut rdr = csv::Reader::from_reader(input);
    let headers = rdr
        .headers()
        .map_err(|e| ImportError::Parse(e.to_string()))?
        .clone();
    let columns = ColumnMap::new(headers);

    for name in REQUIRED_COLUMNS {
        if columns.find(name).is_none() {
            return Err(ImportError::Parse(format!(
                "missing required column '{name}'"
            )));
        }
    }

    let mut entries = Vec::new();

    for (i, row) in rdr.records().enumerate() {
        // Header is line 1, first data row is line 2.
        let line = i + 2;
        let row = row.map_err(|e| ImportError::Parse(format!("row {line}: {e}")))?;

        let timeline_cell = columns.required(&row, line, "TimelinePosition")?;
        let priority_cell = columns.required(&row, line, "IsPriority")?;

        entries.push(CatalogEntry {
            id: 0,
            name: columns.required(&row, line, "Name")?.to_string(),
            short_description: columns.required(&row, line, "ShortDescription")?.to_string(),
            detailed_description: columns
                .required(&row, line, "DetailedDescription")?
                .to_string(),
            benefits: columns.required(&row, line, "Benefits")?.to_string(),
            how_to_get_started: columns.required(&row, line, "HowToGetStarted")?.to_string(),
            image_url: columns.optional(&row, "ImageUrl", DEFAULT_IMAGE_URL),
            learn_more_url: columns.optional(&row, "LearnMoreUrl", DEFAULT_LEARN_MORE_URL),
            timeline_position: parse_i64(timeline_cell, line, "TimelinePosition")?,
            is_priority: parse_bool(priority_cell, line, "IsPriority")?,
        });
    }

    Ok(entries)
}

/// Outcome of a successful import.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ImportReport {
    pub inserted: usize,
}

/// Replace-all import pipeline.
///
/// The store is injected at construction; there is no ambient database
/// handle. `import` parses the whole upload before touching the store, then
/// performs the delete + insert as one store transaction.
pub struct ImportPipeline {
    store: Arc<Mutex<CatalogStore>>,
}

impl ImportPipeline {
    pub fn new(store: Arc<Mutex<CatalogStore>>) -> Self {
        Self { store }
    }

    pub fn import(&self, data: &[u8]) -> Result<ImportReport, ImportError> {
        if data.is_empty() {
            return Err(ImportError::NoFileSupplied);
        }

        let entries = parse_catalog_csv(data)?;

        let mut store = self.store.lock().unwrap();
        let inserted = store.replace_all(&entries)?;
        tracing::info!(inserted, "catalog import complete");

        Ok(ImportReport { inserted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CatalogStore;

    const FULL_CSV: &str = "\
Name,ShortDescription,DetailedDescription,Benefits,HowToGetStarted,ImageUrl,LearnMoreUrl,TimelinePosition,IsPriority
Student Credit Card,Build credit,Learn responsible usage,Establish history,Check your score,/images/cc.png,https://example.com/cc,1,true
Savings Account,Park your cash,Emergency fund basics,Earn interest,Open an account,,,2,false
";

    #[test]
    fn test_parse_full_csv() {
        let entries = parse_catalog_csv(FULL_CSV.as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].name, "Student Credit Card");
        assert_eq!(entries[0].image_url, "/images/cc.png");
        assert_eq!(entries[0].learn_more_url, "https://example.com/cc");
        assert_eq!(entries[0].timeline_position, 1);
        assert!(entries[0].is_priority);

        // Empty optional cells fall back to defaults
        assert_eq!(entries[1].image_url, DEFAULT_IMAGE_URL);
        assert_eq!(entries[1].learn_more_url, DEFAULT_LEARN_MORE_URL);
        assert!(!entries[1].is_priority);
    }

    #[test]
    fn test_parse_without_optional_columns() {
        let csv = "\
Name,ShortDescription,DetailedDescription,Benefits,HowToGetStarted,TimelinePosition,IsPriority
Roth IRA,Retirement savings,Tax-free growth,Compound early,Open with a broker,3,false
";
        let entries = parse_catalog_csv(csv.as_bytes()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].image_url, DEFAULT_IMAGE_URL);
        assert_eq!(entries[0].learn_more_url, DEFAULT_LEARN_MORE_URL);
    }

    #[test]
    fn test_missing_required_column_fails() {
        let csv = "\
Name,ShortDescription,Benefits,HowToGetStarted,TimelinePosition,IsPriority
X,Y,B,H,1,true
";
        let err = parse_catalog_csv(csv.as_bytes()).unwrap_err();
        match err {
            ImportError::Parse(msg) => assert!(msg.contains("DetailedDescription"), "{msg}"),
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_required_cell_fails_whole_parse() {
        let csv = "\
Name,ShortDescription,DetailedDescription,Benefits,HowToGetStarted,TimelinePosition,IsPriority
Good Row,S,D,B,H,1,true
,S,D,B,H,2,false
";
        let err = parse_catalog_csv(csv.as_bytes()).unwrap_err();
        match err {
            ImportError::Parse(msg) => {
                assert!(msg.contains("row 3"), "{msg}");
                assert!(msg.contains("Name"), "{msg}");
            }
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn test_bool_parsing_is_lenient() {
        let csv = "\
Name,ShortDescription,DetailedDescription,Benefits,HowToGetStarted,TimelinePosition,IsPriority
A,S,D,B,H,1,TRUE
B,S,D,B,H,2,0
";
        let entries = parse_catalog_csv(csv.as_bytes()).unwrap();
        assert!(entries[0].is_priority);
        assert!(!entries[1].is_priority);
    }

    #[test]
    fn test_bad_timeline_position_fails() {
        let csv = "\
Name,ShortDescription,DetailedDescription,Benefits,HowToGetStarted,TimelinePosition,IsPriority
A,S,D,B,H,soon,true
";
        let err = parse_catalog_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::Parse(_)));
    }

    fn pipeline_with_store() -> (ImportPipeline, Arc<Mutex<CatalogStore>>) {
        let store = Arc::new(Mutex::new(CatalogStore::open_in_memory().unwrap()));
        (ImportPipeline::new(store.clone()), store)
    }

    #[test]
    fn test_import_empty_upload_is_rejected() {
        let (pipeline, store) = pipeline_with_store();
        let err = pipeline.import(&[]).unwrap_err();
        assert!(matches!(err, ImportError::NoFileSupplied));
        assert_eq!(store.lock().unwrap().count().unwrap(), 0);
    }

    #[test]
    fn test_import_replaces_prior_catalog() {
        let (pipeline, store) = pipeline_with_store();
        store.lock().unwrap().seed_if_empty().unwrap();
        let before = store.lock().unwrap().count().unwrap();
        assert!(before > 0);

        let report = pipeline.import(FULL_CSV.as_bytes()).unwrap();
        assert_eq!(report.inserted, 2);

        let entries = store.lock().unwrap().all_by_timeline().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Student Credit Card");
    }

    #[test]
    fn test_parse_failure_leaves_store_untouched() {
        let (pipeline, store) = pipeline_with_store();
        store.lock().unwrap().seed_if_empty().unwrap();
        let before = store.lock().unwrap().all_by_timeline().unwrap();

        let bad = "\
Name,ShortDescription,DetailedDescription,Benefits,HowToGetStarted,TimelinePosition,IsPriority
A,S,D,B,H,not-a-number,true
";
        let err = pipeline.import(bad.as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::Parse(_)));

        let after = store.lock().unwrap().all_by_timeline().unwrap();
        assert_eq!(before, after);
    }
}
