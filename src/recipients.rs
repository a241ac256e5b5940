use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{
    error::ApiError,
    filter::FilterCriteria,
    http::ApiClient,
    phone::{format_number, is_landline, split_manual_input},
    registry::{RegistryRecord, fetch_all_filtered},
};

/// Row-derived numbers shorter than this are treated as junk.
const MIN_ROW_DIGITS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npi: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Duplicate,
    Landline,
    Invalid,
}

/// Tally of one collection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectReport {
    pub added: usize,
    pub duplicates: usize,
    pub landlines: usize,
    pub invalid: usize,
}

impl CollectReport {
    fn record(&mut self, outcome: AddOutcome) {
        match outcome {
            AddOutcome::Added => self.added += 1,
            AddOutcome::Duplicate => self.duplicates += 1,
            AddOutcome::Landline => self.landlines += 1,
            AddOutcome::Invalid => self.invalid += 1,
        }
    }

    pub fn merged(self, other: CollectReport) -> CollectReport {
        CollectReport {
            added: self.added + other.added,
            duplicates: self.duplicates + other.duplicates,
            landlines: self.landlines + other.landlines,
            invalid: self.invalid + other.invalid,
        }
    }

    pub fn skipped(&self) -> usize {
        self.duplicates + self.landlines + self.invalid
    }
}

/// Picks a row out of the current view for explicit selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowSelector {
    Index(usize),
    Npi(String),
}

/// Deduplicated, landline-free phone numbers in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Recipient>", into = "Vec<Recipient>")]
pub struct RecipientSet {
    entries: Vec<Recipient>,
    seen: HashSet<String>,
}

impl RecipientSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, raw: &str) -> bool {
        self.seen.contains(&format_number(raw))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recipient> {
        self.entries.iter()
    }

    pub fn phones(&self) -> Vec<String> {
        self.entries.iter().map(|r| r.phone.clone()).collect()
    }

    /// Normalizes `raw` and adds it unless it is empty, a landline, or
    /// already present.
    pub fn add(&mut self, raw: &str, npi: Option<&str>) -> AddOutcome {
        let phone = format_number(raw);
        if phone.is_empty() {
            return AddOutcome::Invalid;
        }
        self.insert(phone, npi)
    }

    /// Like [`add`](Self::add), but also rejects numbers too short to dial.
    pub fn add_from_row(&mut self, raw: &str, npi: Option<&str>) -> AddOutcome {
        let phone = format_number(raw);
        if phone.len() < MIN_ROW_DIGITS {
            return AddOutcome::Invalid;
        }
        self.insert(phone, npi)
    }

    fn insert(&mut self, phone: String, npi: Option<&str>) -> AddOutcome {
        if is_landline(&phone) {
            return AddOutcome::Landline;
        }
        if !self.seen.insert(phone.clone()) {
            return AddOutcome::Duplicate;
        }
        self.entries.push(Recipient {
            phone,
            npi: npi.map(ToOwned::to_owned),
        });
        AddOutcome::Added
    }

    pub fn remove(&mut self, raw: &str) -> bool {
        let phone = format_number(raw);
        if !self.seen.remove(&phone) {
            return false;
        }
        self.entries.retain(|r| r.phone != phone);
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.seen.clear();
    }

    pub fn add_manual(&mut self, text: &str) -> CollectReport {
        let mut report = CollectReport::default();
        for part in split_manual_input(text) {
            report.record(self.add(part, None));
        }
        report
    }

    /// Adds the phone of every row given, e.g. all rows on the current page.
    pub fn add_rows<'a, I>(&mut self, rows: I) -> CollectReport
    where
        I: IntoIterator<Item = &'a RegistryRecord>,
    {
        let mut report = CollectReport::default();
        for row in rows {
            match row.phone.as_deref() {
                Some(phone) => report.record(self.add_from_row(phone, Some(&row.npi))),
                None => report.record(AddOutcome::Invalid),
            }
        }
        report
    }

    /// Adds only the rows picked by `selection`; unknown selectors count as
    /// invalid.
    pub fn select_rows(&mut self, rows: &[&RegistryRecord], selection: &[RowSelector]) -> CollectReport {
        let mut report = CollectReport::default();
        for selector in selection {
            let row = match selector {
                RowSelector::Index(i) => rows.get(*i).copied(),
                RowSelector::Npi(npi) => rows.iter().find(|r| &r.npi == npi).copied(),
            };
            match row {
                Some(row) => report = report.merged(self.add_rows([row])),
                None => report.record(AddOutcome::Invalid),
            }
        }
        report
    }

    /// Pulls every row matching `criteria` from the backend and adds those
    /// not yet messaged.
    pub async fn collect_all_filtered(
        &mut self,
        client: &ApiClient,
        criteria: &FilterCriteria,
    ) -> Result<CollectReport, ApiError> {
        let rows = fetch_all_filtered(client, &criteria.to_filter_query()).await?;
        tracing::info!("Filter matched {} registry rows", rows.len());
        let pending = rows
            .iter()
            .filter(|row| row.message_sent != Some(true) && row.phone.is_some());
        Ok(self.add_rows(pending))
    }
}

impl From<Vec<Recipient>> for RecipientSet {
    fn from(entries: Vec<Recipient>) -> Self {
        let mut set = RecipientSet::new();
        for entry in entries {
            set.add(&entry.phone, entry.npi.as_deref());
        }
        set
    }
}

impl From<RecipientSet> for Vec<Recipient> {
    fn from(set: RecipientSet) -> Self {
        set.entries
    }
}
