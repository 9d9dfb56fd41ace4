use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use std::cmp::Ordering;
use std::str::FromStr;

use crate::domain::order::Order;

// ============================================================================
// Paging & Sorting
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PageRequestError {
    #[error("Unknown sort property: {0}")]
    UnknownSortField(String),

    #[error("Unknown sort direction: {0}")]
    UnknownSortDirection(String),

    #[error("Page size must be between 1 and {max}, got {size}")]
    InvalidPageSize { size: u32, max: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    OwnerId,
    ServiceId,
    Status,
    CreatedAt,
    LastModifiedAt,
}

impl SortField {
    fn column(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::OwnerId => "owner_id",
            SortField::ServiceId => "service_id",
            SortField::Status => "status",
            SortField::CreatedAt => "created_at",
            SortField::LastModifiedAt => "last_modified_at",
        }
    }

    fn compare(&self, a: &Order, b: &Order) -> Ordering {
        match self {
            SortField::Id => a.id.cmp(&b.id),
            SortField::OwnerId => a.owner_id.cmp(&b.owner_id),
            SortField::ServiceId => a.service_id.cmp(&b.service_id),
            SortField::Status => a.status.as_str().cmp(b.status.as_str()),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::LastModifiedAt => a.last_modified_at.cmp(&b.last_modified_at),
        }
    }
}

impl FromStr for SortField {
    type Err = PageRequestError;

    fn from_str(property: &str) -> Result<Self, Self::Err> {
        match property {
            "id" => Ok(SortField::Id),
            "ownerId" => Ok(SortField::OwnerId),
            "serviceId" => Ok(SortField::ServiceId),
            "status" => Ok(SortField::Status),
            "createdAt" => Ok(SortField::CreatedAt),
            "lastModifiedAt" => Ok(SortField::LastModifiedAt),
            other => Err(PageRequestError::UnknownSortField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Sort order. Parsed from the `property[,asc|desc]` query form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            field: SortField::Id,
            direction: SortDirection::Asc,
        }
    }
}

impl FromStr for Sort {
    type Err = PageRequestError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parts = raw.split(',').map(str::trim);
        let field = parts.next().unwrap_or_default().parse()?;
        let direction = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => SortDirection::Asc,
            Some("desc") => SortDirection::Desc,
            Some(other) => return Err(PageRequestError::UnknownSortDirection(other.to_string())),
        };
        Ok(Self { field, direction })
    }
}

impl Sort {
    /// Total order: the sort field, then id ascending as a tiebreaker
    pub fn compare(&self, a: &Order, b: &Order) -> Ordering {
        let primary = match self.direction {
            SortDirection::Asc => self.field.compare(a, b),
            SortDirection::Desc => self.field.compare(b, a),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }

    pub fn push_order_by(&self, query: &mut QueryBuilder<'_, Postgres>) {
        query.push(" ORDER BY ").push(self.field.column());
        query.push(match self.direction {
            SortDirection::Asc => " ASC",
            SortDirection::Desc => " DESC",
        });
        if self.field != SortField::Id {
            query.push(", id ASC");
        }
    }
}

/// Zero-based page request. Bounds are checked by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_number: u32,
    pub page_size: u32,
    pub sort: Sort,
}

impl PageRequest {
    pub fn new(page_number: u32, page_size: u32) -> Self {
        Self {
            page_number,
            page_size,
            sort: Sort::default(),
        }
    }

    #[cfg(test)]
    pub fn of_size(page_size: u32) -> Self {
        Self::new(0, page_size)
    }

    /// Checked constructor for caller-supplied sizes: 1..=max_page_size
    pub fn bounded(page_number: u32, page_size: u32, max_page_size: u32) -> Result<Self, PageRequestError> {
        if page_size == 0 || page_size > max_page_size {
            return Err(PageRequestError::InvalidPageSize {
                size: page_size,
                max: max_page_size,
            });
        }
        Ok(Self::new(page_number, page_size))
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page_number) * u64::from(self.page_size)
    }

    pub fn push_limit_offset(&self, query: &mut QueryBuilder<'_, Postgres>) {
        query.push(" LIMIT ").push_bind(i64::from(self.page_size));
        query.push(" OFFSET ").push_bind(self.offset() as i64);
    }
}

/// One page of results plus total-count metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    #[serde(default)]
    pub page_number: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        let total_pages = if request.page_size == 0 {
            0
        } else {
            total_elements.div_ceil(u64::from(request.page_size))
        };
        Self {
            content,
            page_number: request.page_number,
            page_size: request.page_size,
            total_elements,
            total_pages,
        }
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }

    /// Replace the content, keeping the paging metadata
    pub fn with_content<U>(&self, content: Vec<U>) -> Page<U> {
        Page {
            content,
            page_number: self.page_number,
            page_size: self.page_size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}
