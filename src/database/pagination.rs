use serde::{Deserialize, Serialize};

use crate::{constants::MAX_PAGE_SIZE, error::ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Result<Self, ValidationError> {
        let page = page.unwrap_or(1);
        if page < 1 {
            return Err(ValidationError::new("page", "Invalid page."));
        }

        let limit = limit.unwrap_or(default_limit);
        if limit < 1 {
            return Err(ValidationError::new("limit", "Invalid limit."));
        }

        let limit = limit.min(MAX_PAGE_SIZE);
        if (page - 1).checked_mul(limit).is_none() {
            return Err(ValidationError::new("page", "Invalid page."));
        }

        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// `path` is the request path the next/previous links are built on.
    pub fn from_rows(rows: Vec<T>, count: i64, request: PageRequest, path: &str) -> Self {
        let link = |page: i64| format!("{path}?page={page}&limit={}", request.limit);

        let next = if request.offset().saturating_add(rows.len() as i64) < count {
            Some(link(request.page + 1))
        } else {
            None
        };
        let previous = if request.page > 1 {
            Some(link(request.page - 1))
        } else {
            None
        };

        Self {
            count,
            next,
            previous,
            results: rows,
        }
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}
