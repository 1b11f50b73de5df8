use chrono::{DateTime, NaiveDate};
use csv::StringRecord;
use serde::Serialize;

/// One parsed roster row, in spreadsheet order. Transient input to the
/// pipeline; it only outlives the batch as part of the session's row ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterRow {
    pub row_number: u32,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub applied_on: Option<NaiveDate>,
}

/// Spreadsheet parsing seam so the pipeline can be exercised without real
/// uploads.
pub trait RosterReader: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<RosterRow>, RosterParseError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RosterParseError {
    #[error("roster is not valid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("roster is missing a '{0}' column")]
    MissingColumn(&'static str),
}

/// Header synonyms accepted by [`CsvRosterReader`], compared
/// case-insensitively against the header row.
#[derive(Debug, Clone)]
pub struct HeaderSynonyms {
    pub full_name: Vec<&'static str>,
    pub email: Vec<&'static str>,
    pub phone: Vec<&'static str>,
    pub location: Vec<&'static str>,
    pub applied_on: Vec<&'static str>,
}

impl Default for HeaderSynonyms {
    fn default() -> Self {
        Self {
            full_name: vec!["full name", "name", "candidate name", "candidate"],
            email: vec!["email", "e-mail", "email address"],
            phone: vec!["phone", "phone number", "mobile", "telephone"],
            location: vec!["location", "city", "current location"],
            applied_on: vec!["applied on", "date applied", "applied", "application date"],
        }
    }
}

/// CSV implementation of [`RosterReader`]. Full name and email are required
/// columns; phone, location, and applied-on are optional. Rows blank in both
/// required fields are skipped entirely.
#[derive(Debug, Clone, Default)]
pub struct CsvRosterReader {
    synonyms: HeaderSynonyms,
}

impl CsvRosterReader {
    pub fn new(synonyms: HeaderSynonyms) -> Self {
        Self { synonyms }
    }
}

struct ColumnMap {
    full_name: usize,
    email: usize,
    phone: Option<usize>,
    location: Option<usize>,
    applied_on: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &StringRecord, synonyms: &HeaderSynonyms) -> Result<Self, RosterParseError> {
        let locate = |names: &[&'static str]| {
            headers.iter().position(|header| {
                let header = header.trim();
                names.iter().any(|name| header.eq_ignore_ascii_case(name))
            })
        };

        let full_name = locate(&synonyms.full_name)
            .ok_or(RosterParseError::MissingColumn("full name"))?;
        let email = locate(&synonyms.email).ok_or(RosterParseError::MissingColumn("email"))?;

        Ok(Self {
            full_name,
            email,
            phone: locate(&synonyms.phone),
            location: locate(&synonyms.location),
            applied_on: locate(&synonyms.applied_on),
        })
    }
}

impl RosterReader for CsvRosterReader {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<RosterRow>, RosterParseError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(bytes);
        let headers = reader.headers()?.clone();
        let columns = ColumnMap::resolve(&headers, &self.synonyms)?;

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            let full_name = field(&record, Some(columns.full_name));
            let email = field(&record, Some(columns.email));

            // The header occupies spreadsheet row 1.
            let row_number = index as u32 + 2;
            if full_name.is_empty() && email.is_empty() {
                continue;
            }

            rows.push(RosterRow {
                row_number,
                full_name: full_name.to_string(),
                email: email.to_string(),
                phone: optional(&record, columns.phone),
                location: optional(&record, columns.location),
                applied_on: parse_date(field(&record, columns.applied_on)),
            });
        }

        Ok(rows)
    }
}

fn field<'a>(record: &'a StringRecord, column: Option<usize>) -> &'a str {
    column
        .and_then(|index| record.get(index))
        .map(str::trim)
        .unwrap_or("")
}

fn optional(record: &StringRecord, column: Option<usize>) -> Option<String> {
    let value = field(record, column);
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }

    None
}
