// Query parameters for listing discount rules

use serde::Deserialize;
use utoipa::IntoParams;

use crate::discounts::{
    error::{DiscountError, DiscountResult},
    models::DiscountRule,
    types::DiscountRuleType,
};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Query parameters extracted from the HTTP request
/// All fields are optional to support flexible querying
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RuleListParams {
    /// Page number (1-indexed, defaults to 1)
    pub page: Option<u32>,
    /// Rules per page (defaults to 20, at most 100)
    pub limit: Option<u32>,
    pub is_active: Option<bool>,
    pub is_automatic: Option<bool>,
    pub rule_type: Option<DiscountRuleType>,
    /// Case-insensitive name substring
    pub search: Option<String>,
}

/// Validated and normalized list query
#[derive(Debug, Clone, PartialEq)]
pub struct RuleListQuery {
    pub page: u32,
    pub limit: u32,
    pub is_active: Option<bool>,
    pub is_automatic: Option<bool>,
    pub rule_type: Option<DiscountRuleType>,
    /// Trimmed; None if empty
    pub search: Option<String>,
}

impl Default for RuleListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            is_active: None,
            is_automatic: None,
            rule_type: None,
            search: None,
        }
    }
}

impl RuleListQuery {
    /// Validates and normalizes list parameters
    pub fn validate(params: RuleListParams) -> DiscountResult<Self> {
        let page = params.page.unwrap_or(1);
        if page == 0 {
            return Err(DiscountError::InvalidQuery(
                "page must be a positive integer".to_string(),
            ));
        }

        let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(DiscountError::InvalidQuery(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let search = params
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            page,
            limit,
            is_active: params.is_active,
            is_automatic: params.is_automatic,
            rule_type: params.rule_type,
            search,
        })
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    /// Whether `rule` passes the filters (pagination aside)
    pub fn matches(&self, rule: &DiscountRule) -> bool {
        self.is_active.map_or(true, |active| rule.is_active == active)
            && self
                .is_automatic
                .map_or(true, |automatic| rule.is_automatic == automatic)
            && self.rule_type.map_or(true, |rule_type| rule.rule_type == rule_type)
            && self.search.as_ref().map_or(true, |search| {
                rule.name.to_lowercase().contains(&search.to_lowercase())
            })
    }
}
