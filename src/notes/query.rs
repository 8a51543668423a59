/// List query parameters, filters and pagination shared by note and bookmark listings
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Raw list query as it arrives in the query string
///
/// Numbers are kept as strings so malformed values surface as validation
/// errors in the response envelope instead of extractor rejections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    /// Comma-separated
    pub tags: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Whitelisted sort key, already resolved to a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: &'static str,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn order_by(&self) -> String {
        format!("{} {}", self.column, self.order.as_sql())
    }
}

/// Search text and tag filter applied to notes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFilter {
    pub search: Option<String>,
    pub tags: Vec<String>,
}

impl NoteFilter {
    /// Append `AND ...` clauses against the note alias `n`, collecting binds in order
    pub fn push_sql(&self, sql: &mut String, binds: &mut Vec<String>) {
        if let Some(search) = &self.search {
            sql.push_str(" AND (n.title_fold LIKE ? ESCAPE '\\' OR n.content_fold LIKE ? ESCAPE '\\')");
            let pattern = format!("%{}%", escape_like(&fold_case(search)));
            binds.push(pattern.clone());
            binds.push(pattern);
        }

        if !self.tags.is_empty() {
            let placeholders = vec!["?"; self.tags.len()].join(", ");
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM json_each(n.tags) t WHERE t.value IN ({}))",
                placeholders
            ));
            binds.extend(self.tags.iter().cloned());
        }
    }
}

/// Page number and size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Rows to skip; saturates for page numbers far past the end
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Pagination metadata returned with every page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: PageRequest, total: i64) -> Self {
        Self {
            current_page: page.page,
            total_pages: (total + page.limit - 1) / page.limit,
            total,
            has_next: page.page.saturating_mul(page.limit) < total,
            has_prev: page.page > 1,
        }
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl ListQuery {
    pub fn page_request(&self) -> ApiResult<PageRequest> {
        let page = parse_positive(self.page.as_deref(), "page", 1)?;
        let limit = parse_positive(self.limit.as_deref(), "limit", DEFAULT_PAGE_SIZE)?;
        if limit > MAX_PAGE_SIZE {
            return Err(ApiError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(PageRequest { page, limit })
    }

    pub fn filter(&self) -> NoteFilter {
        let search = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let tags = self
            .tags
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        NoteFilter { search, tags }
    }

    /// Resolve `sortBy`/`sortOrder` against a whitelist of (field, column) pairs
    pub fn sort(
        &self,
        allowed: &[(&str, &'static str)],
        default_field: &str,
    ) -> ApiResult<SortSpec> {
        let field = self
            .sort_by
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(default_field);

        let column = allowed
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, column)| *column)
            .ok_or_else(|| {
                let names: Vec<&str> = allowed.iter().map(|(name, _)| *name).collect();
                ApiError::Validation(format!(
                    "sortBy must be one of: {}",
                    names.join(", ")
                ))
            })?;

        let order = match self.sort_order.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("") | Some("desc") => SortOrder::Desc,
            Some("asc") => SortOrder::Asc,
            Some(_) => {
                return Err(ApiError::Validation(
                    "sortOrder must be asc or desc".to_string(),
                ))
            }
        };

        Ok(SortSpec { column, order })
    }
}

fn parse_positive(value: Option<&str>, name: &str, default: i64) -> ApiResult<i64> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => match raw.parse::<i64>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(ApiError::Validation(format!(
                "{} must be a positive integer",
                name
            ))),
        },
    }
}

/// Case-fold text for search columns and patterns
///
/// SQLite's LIKE only folds ASCII, so both sides are folded here. The four
/// Turkish i variants (I, İ, ı, i) all fold to `i`.
pub fn fold_case(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .filter(|c| *c != '\u{0307}')
        .map(|c| if c == 'ı' { 'i' } else { c })
        .collect()
}

/// Escape LIKE wildcards so search text matches literally
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[(&str, &str)] = &[("createdAt", "n.created_at"), ("title", "n.title")];

    #[test]
    fn test_page_defaults() {
        let q = ListQuery::default();
        assert_eq!(q.page_request().unwrap(), PageRequest { page: 1, limit: 10 });
    }

    #[test]
    fn test_page_validation() {
        let q = ListQuery {
            page: Some("0".into()),
            ..Default::default()
        };
        assert!(q.page_request().is_err());

        let q = ListQuery {
            limit: Some("abc".into()),
            ..Default::default()
        };
        assert!(q.page_request().is_err());

        let q = ListQuery {
            limit: Some("101".into()),
            ..Default::default()
        };
        assert!(q.page_request().is_err());

        let q = ListQuery {
            page: Some("3".into()),
            limit: Some("5".into()),
            ..Default::default()
        };
        let page = q.page_request().unwrap();
        assert_eq!(page.offset(), 10);
    }

    #[test]
    fn test_huge_page_saturates() {
        let q = ListQuery {
            page: Some(i64::MAX.to_string()),
            limit: Some("100".into()),
            ..Default::default()
        };
        let page = q.page_request().unwrap();
        assert_eq!(page.offset(), i64::MAX);

        let p = Pagination::new(page, 25);
        assert_eq!(p.current_page, i64::MAX);
        assert_eq!(p.total_pages, 1);
        assert!(!p.has_next);
        assert!(p.has_prev);
    }

    #[test]
    fn test_fold_case() {
        assert_eq!(fold_case("ÇALIŞMA Planı"), "çalişma plani");
        assert_eq!(fold_case("İstanbul"), fold_case("istanbul"));
        assert_eq!(fold_case("Straße"), "straße");
    }

    #[test]
    fn test_sort_whitelist() {
        let q = ListQuery::default();
        let sort = q.sort(FIELDS, "createdAt").unwrap();
        assert_eq!(sort.order_by(), "n.created_at DESC");

        let q = ListQuery {
            sort_by: Some("title".into()),
            sort_order: Some("ASC".into()),
            ..Default::default()
        };
        assert_eq!(q.sort(FIELDS, "createdAt").unwrap().order_by(), "n.title ASC");

        let q = ListQuery {
            sort_by: Some("created_at; DROP TABLE note".into()),
            ..Default::default()
        };
        assert!(matches!(q.sort(FIELDS, "createdAt"), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_filter_parsing() {
        let q = ListQuery {
            search: Some("  ".into()),
            tags: Some("work, ,home,".into()),
            ..Default::default()
        };
        let filter = q.filter();
        assert_eq!(filter.search, None);
        assert_eq!(filter.tags, vec!["work", "home"]);
    }

    #[test]
    fn test_filter_sql() {
        let filter = NoteFilter {
            search: Some("50%_off".into()),
            tags: vec!["a".into(), "b".into()],
        };
        let mut sql = String::new();
        let mut binds = Vec::new();
        filter.push_sql(&mut sql, &mut binds);

        assert!(sql.contains("LIKE ? ESCAPE"));
        assert!(sql.contains("IN (?, ?)"));
        assert_eq!(binds, vec!["%50\\%\\_off%", "%50\\%\\_off%", "a", "b"]);
    }

    #[test]
    fn test_pagination_metadata() {
        let p = Pagination::new(PageRequest { page: 2, limit: 10 }, 25);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(p.has_prev);

        let p = Pagination::new(PageRequest { page: 1, limit: 10 }, 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next);
        assert!(!p.has_prev);
    }
}
