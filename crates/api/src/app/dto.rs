//! Query-string DTOs and their mapping to store queries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use tillstack_cash::RegisterSummary;
use tillstack_core::{Page, PageRequest, Search};
use tillstack_infra::ListQuery;
use tillstack_sales::SaleFilter;

/// `?page=&per_page=&search=` accepted by every list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
}

impl ListParams {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }

    pub fn query(&self) -> ListQuery {
        ListQuery::new(self.page(), Search::parse(self.search.as_deref()))
    }
}

/// `?term=` of the product quick search.
#[derive(Debug, Default, Deserialize)]
pub struct QuickSearchParams {
    pub term: Option<String>,
}

/// Sales list: paging plus an optional `start_date`/`end_date` pair.
#[derive(Debug, Default, Deserialize)]
pub struct SalesParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl SalesParams {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }

    pub fn filter(&self) -> SaleFilter {
        SaleFilter {
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

/// `GET /cash-registers`: the open register (if any) and closed history.
#[derive(Debug, Serialize)]
pub struct RegisterOverview {
    pub current: Option<RegisterSummary>,
    pub history: Page<RegisterSummary>,
}
