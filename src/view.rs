//! Client-held registry table state.
//!
//! Every load is stamped with a generation. Only the result of the most
//! recently started load is applied, so a slow response to an older query
//! can never overwrite a newer one.

use chrono::NaiveDate;

use crate::{
    constants::{DEFAULT_ROWS_PER_PAGE, ROWS_PER_PAGE_OPTIONS},
    error::{ApiError, ValidationError},
    filter::{FilterCriteria, LoadMode, api_page, page_count, paginate},
    http::ApiClient,
    registry::{PageQuery, RegistryRecord, fetch_all_filtered, fetch_page},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

/// Everything needed to run one load without borrowing the view.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    pub criteria: FilterCriteria,
    pub page: usize,
    pub rows_per_page: usize,
}

#[derive(Debug, Clone)]
pub struct LoadedPage {
    pub ticket: LoadTicket,
    pub rows: Vec<RegistryRecord>,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct RegistryView {
    criteria: FilterCriteria,
    page: usize,
    rows_per_page: usize,
    rows: Vec<RegistryRecord>,
    total: usize,
    generation: u64,
}

impl RegistryView {
    pub fn new(criteria: FilterCriteria) -> Self {
        Self {
            criteria,
            page: 0,
            rows_per_page: DEFAULT_ROWS_PER_PAGE,
            rows: Vec::new(),
            total: 0,
            generation: 0,
        }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn rows_per_page(&self) -> usize {
        self.rows_per_page
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn rows(&self) -> &[RegistryRecord] {
        &self.rows
    }

    pub fn page_count(&self) -> usize {
        page_count(self.total, self.rows_per_page)
    }

    /// Loaded rows narrowed by the current criteria. In backend-page mode this
    /// is where the search term takes effect.
    pub fn visible_rows(&self) -> Vec<&RegistryRecord> {
        self.criteria.apply(&self.rows)
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.page = 0;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    pub fn set_rows_per_page(&mut self, rows_per_page: usize) -> Result<(), ValidationError> {
        if !ROWS_PER_PAGE_OPTIONS.contains(&rows_per_page) {
            return Err(ValidationError::PageSize(rows_per_page));
        }
        self.rows_per_page = rows_per_page;
        self.page = 0;
        Ok(())
    }

    /// Drops every filter and returns to the week containing `today`.
    pub fn clear_filters(&mut self, today: NaiveDate) {
        self.criteria = FilterCriteria::for_week_of(today);
        self.rows.clear();
        self.total = 0;
        self.page = 0;
    }

    pub fn begin_load(&mut self) -> LoadRequest {
        self.generation += 1;
        LoadRequest {
            ticket: LoadTicket(self.generation),
            criteria: self.criteria.clone(),
            page: self.page,
            rows_per_page: self.rows_per_page,
        }
    }

    /// Applies `loaded` if it answers the newest request. Returns whether it
    /// was applied.
    pub fn apply(&mut self, loaded: LoadedPage) -> bool {
        if loaded.ticket != LoadTicket(self.generation) {
            tracing::debug!(
                stale = loaded.ticket.0,
                current = self.generation,
                "discarding superseded registry response"
            );
            return false;
        }
        self.rows = loaded.rows;
        self.total = loaded.total;
        true
    }

    pub async fn load(&mut self, client: &ApiClient) -> Result<(), ApiError> {
        let request = self.begin_load();
        let loaded = fetch(client, &request).await?;
        self.apply(loaded);
        Ok(())
    }
}

pub async fn fetch(client: &ApiClient, request: &LoadRequest) -> Result<LoadedPage, ApiError> {
    let criteria = &request.criteria;
    match criteria.load_mode() {
        LoadMode::BackendPage => {
            let query = PageQuery {
                start_date: criteria.start_date,
                end_date: criteria.end_date,
                page: api_page(request.page),
                limit: request.rows_per_page,
                zip: None,
                enumeration_type: None,
            };
            let page = fetch_page(client, &query).await?;
            Ok(LoadedPage {
                ticket: request.ticket,
                rows: page.data,
                total: page.total,
            })
        }
        LoadMode::LocalFiltered => {
            let all = fetch_all_filtered(client, &criteria.to_filter_query()).await?;
            let filtered: Vec<RegistryRecord> = criteria.apply(&all).into_iter().cloned().collect();
            let total = filtered.len();
            let rows = paginate(&filtered, request.page, request.rows_per_page).to_vec();
            Ok(LoadedPage {
                ticket: request.ticket,
                rows,
                total,
            })
        }
    }
}
