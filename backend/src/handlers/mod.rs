//! HTTP request handlers

pub mod dashboard;
pub mod export;
pub mod health;
pub mod recommendation;
pub mod selection;

pub use dashboard::*;
pub use export::*;
pub use health::*;
pub use recommendation::*;
pub use selection::*;

use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::services::{Dataset, Selection};

/// Company / farm / stand / date picked in the dashboard
#[derive(Debug, Deserialize, Validate)]
pub struct SelectionQuery {
    #[validate(length(min = 1, max = 100))]
    pub company: String,
    #[validate(length(min = 1, max = 100))]
    pub farm: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub stand: Option<String>,
    /// Defaults to the company's latest observation date
    pub date: Option<NaiveDate>,
}

impl SelectionQuery {
    pub fn resolve(&self, dataset: &Dataset) -> AppResult<Selection> {
        self.validate()?;
        dataset.resolve(
            &self.company,
            self.farm.as_deref(),
            self.stand.as_deref(),
            self.date,
        )
    }
}
