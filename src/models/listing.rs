//! Paging, filtering and sorting vocabulary shared by every listing.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

/// An item that can live in a feature container.
pub trait Listable: Clone + Send + Sync + 'static {
    /// Opaque, server-assigned, unique id.
    fn id(&self) -> &str;

    /// Timestamp used by the date sorts.
    fn timestamp(&self) -> Option<DateTime<Utc>>;

    /// Label used by the name sorts.
    fn name(&self) -> &str;
}

/// A filter or sort selector that travels as a query parameter.
pub trait QueryParam: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    fn as_str(&self) -> &'static str;
}

/// One page of a listing as returned by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, has_more: bool) -> Self {
        Self { items, has_more }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, false)
    }
}

/// Parameters of one listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery<F> {
    pub page: u32,
    pub page_size: u32,
    pub filter: F,
    pub sort: SortOrder,
}

impl<F: QueryParam> ListQuery<F> {
    /// Query-string pairs understood by the listing endpoints.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let (sort_by, sort_order) = self.sort.split();
        vec![
            ("page", self.page.to_string()),
            ("pageSize", self.page_size.to_string()),
            ("filter", self.filter.as_str().to_string()),
            ("sortBy", sort_by.to_string()),
            ("sortOrder", sort_order.to_string()),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    #[default]
    DateDesc,
    DateAsc,
    NameAsc,
    NameDesc,
}

impl SortOrder {
    /// Split into the `sortBy` / `sortOrder` pair the server expects.
    pub fn split(&self) -> (&'static str, &'static str) {
        match self {
            SortOrder::DateDesc => ("date", "desc"),
            SortOrder::DateAsc => ("date", "asc"),
            SortOrder::NameAsc => ("name", "asc"),
            SortOrder::NameDesc => ("name", "desc"),
        }
    }

    /// Total order over items. Ties are broken by id ascending so that
    /// equal timestamps or names always come out in the same order.
    pub fn compare<T: Listable>(&self, a: &T, b: &T) -> Ordering {
        let primary = match self {
            SortOrder::DateDesc => b.timestamp().cmp(&a.timestamp()),
            SortOrder::DateAsc => a.timestamp().cmp(&b.timestamp()),
            SortOrder::NameAsc => a.name().to_lowercase().cmp(&b.name().to_lowercase()),
            SortOrder::NameDesc => b.name().to_lowercase().cmp(&a.name().to_lowercase()),
        };
        primary.then_with(|| a.id().cmp(b.id()))
    }

    pub fn sort<T: Listable>(&self, items: &mut [T]) {
        items.sort_by(|a, b| self.compare(a, b));
    }
}

impl QueryParam for SortOrder {
    fn as_str(&self) -> &'static str {
        match self {
            SortOrder::DateDesc => "date-desc",
            SortOrder::DateAsc => "date-asc",
            SortOrder::NameAsc => "name-asc",
            SortOrder::NameDesc => "name-desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date-desc" => Ok(SortOrder::DateDesc),
            "date-asc" => Ok(SortOrder::DateAsc),
            "name-asc" => Ok(SortOrder::NameAsc),
            "name-desc" => Ok(SortOrder::NameDesc),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Clone)]
    struct Row {
        id: &'static str,
        at: i64,
        name: &'static str,
    }

    impl Listable for Row {
        fn id(&self) -> &str {
            self.id
        }
        fn timestamp(&self) -> Option<DateTime<Utc>> {
            Utc.timestamp_opt(self.at, 0).single()
        }
        fn name(&self) -> &str {
            self.name
        }
    }

    fn ids(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_date_sort_breaks_ties_by_id() {
        let mut rows = vec![
            Row { id: "c", at: 10, name: "x" },
            Row { id: "a", at: 10, name: "y" },
            Row { id: "b", at: 20, name: "z" },
        ];

        SortOrder::DateDesc.sort(&mut rows);
        assert_eq!(ids(&rows), vec!["b", "a", "c"]);

        SortOrder::DateAsc.sort(&mut rows);
        assert_eq!(ids(&rows), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_name_sort_is_case_insensitive() {
        let mut rows = vec![
            Row { id: "1", at: 0, name: "beta" },
            Row { id: "2", at: 0, name: "Alpha" },
        ];
        SortOrder::NameAsc.sort(&mut rows);
        assert_eq!(ids(&rows), vec!["2", "1"]);
    }

    #[test]
    fn test_sort_order_parses_and_splits() {
        let sort: SortOrder = "name-desc".parse().unwrap();
        assert_eq!(sort.split(), ("name", "desc"));
        assert!("random".parse::<SortOrder>().is_err());
    }
}
