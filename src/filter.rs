use chrono::{DateTime, Datelike, Duration, NaiveDate};

use crate::{
    error::ValidationError,
    registry::{FilterQuery, RegistryRecord},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub search_term: String,
    pub state: String,
    pub city: String,
    pub organization: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Which query shape a load uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Ask the backend for one page.
    BackendPage,
    /// Pull every match once, then search and paginate locally.
    LocalFiltered,
}

impl FilterCriteria {
    /// Empty filters over the week containing `today`.
    pub fn for_week_of(today: NaiveDate) -> Self {
        let (start, end) = week_bounds(today);
        Self {
            start_date: Some(start),
            end_date: Some(end),
            ..Self::default()
        }
    }

    pub fn has_location_filters(&self) -> bool {
        !self.state.is_empty() || !self.city.is_empty() || !self.organization.is_empty()
    }

    pub fn load_mode(&self) -> LoadMode {
        if self.has_location_filters() {
            LoadMode::LocalFiltered
        } else {
            LoadMode::BackendPage
        }
    }

    /// Applying filters needs at least one date bound, and the range may not
    /// run backwards.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match (self.start_date, self.end_date) {
            (None, None) => Err(ValidationError::MissingDateRange),
            (Some(start), Some(end)) if end < start => Err(ValidationError::InvertedDateRange {
                start: start.to_string(),
                end: end.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Sets the start day; an end day now before it is dropped.
    pub fn set_start_date(&mut self, start: Option<NaiveDate>) {
        self.start_date = start;
        if let (Some(start), Some(end)) = (start, self.end_date) {
            if end < start {
                self.end_date = None;
            }
        }
    }

    pub fn to_filter_query(&self) -> FilterQuery {
        FilterQuery {
            start_date: self.start_date,
            end_date: self.end_date,
            state: self.state.clone(),
            city: self.city.clone(),
            organization: self.organization.clone(),
        }
    }

    pub fn matches(&self, row: &RegistryRecord) -> bool {
        let query = self.search_term.trim().to_lowercase();
        let lower = |v: &Option<String>| v.as_deref().unwrap_or("").to_lowercase();
        let name_match = query.is_empty()
            || lower(&row.first_name).contains(&query)
            || lower(&row.last_name).contains(&query)
            || lower(&row.org_name).contains(&query)
            || row.npi.contains(&query);

        let exact = |filter: &str, value: &Option<String>| {
            filter.is_empty() || value.as_deref() == Some(filter)
        };
        let state_match = exact(&self.state, &row.state);
        let city_match = exact(&self.city, &row.city);
        let org_match = exact(&self.organization, &row.org_name);

        let date_match = match row.updated_at.as_deref().and_then(record_day) {
            Some(day) => {
                self.start_date.is_none_or(|start| day >= start)
                    && self.end_date.is_none_or(|end| day <= end)
            }
            None => true,
        };

        name_match && state_match && city_match && org_match && date_match
    }

    pub fn apply<'a>(&self, rows: &'a [RegistryRecord]) -> Vec<&'a RegistryRecord> {
        rows.iter().filter(|row| self.matches(row)).collect()
    }
}

/// Monday through Sunday of the ISO week containing `today`.
pub fn week_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let offset = i64::from(today.weekday().num_days_from_monday());
    let monday = today - Duration::days(offset);
    (monday, monday + Duration::days(6))
}

/// Calendar day of a backend timestamp. Accepts RFC 3339 or a leading
/// `YYYY-MM-DD`.
pub fn record_day(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.date_naive());
    }
    value
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Rows of zero-based `page`.
pub fn paginate<T>(rows: &[T], page: usize, rows_per_page: usize) -> &[T] {
    let start = page.saturating_mul(rows_per_page).min(rows.len());
    let end = start.saturating_add(rows_per_page).min(rows.len());
    &rows[start..end]
}

pub fn page_count(total: usize, rows_per_page: usize) -> usize {
    if rows_per_page == 0 {
        return 0;
    }
    total.div_ceil(rows_per_page)
}

/// Zero-based UI page to the 1-based page the backend expects.
pub fn api_page(ui_page: usize) -> usize {
    ui_page + 1
}

/// Distinct values offered in the state, city and organization pickers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub states: Vec<String>,
    pub cities: Vec<String>,
    pub organizations: Vec<String>,
}

pub fn filter_options(rows: &[RegistryRecord]) -> FilterOptions {
    fn push_unique(out: &mut Vec<String>, value: &Option<String>) {
        if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
            if !out.iter().any(|existing| existing == v) {
                out.push(v.to_string());
            }
        }
    }

    let mut options = FilterOptions::default();
    for row in rows {
        push_unique(&mut options.states, &row.state);
        push_unique(&mut options.cities, &row.city);
        push_unique(&mut options.organizations, &row.org_name);
    }
    options
}
