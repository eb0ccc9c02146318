use sea_orm::sea_query::LikeExpr;
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QuerySelect};

const LIKE_ESCAPE: char = '\\';

pub const DEFAULT_PAGE_LIMIT: u64 = 10;
pub const MAX_PAGE_LIMIT: u64 = 100;

/// Paging and free-text search shared by every list endpoint.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
}

#[derive(Debug)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

impl<T> PaginatedResult<T> {
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.limit)
    }
}

/// Apply pagination to a query with defaults and bounds checking.
/// Returns the modified query along with the calculated page and limit.
pub fn apply_pagination<T: EntityTrait>(
    query: sea_orm::Select<T>,
    page: Option<u64>,
    limit: Option<u64>,
) -> (sea_orm::Select<T>, u64, u64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT);
    let offset = (page - 1).saturating_mul(limit);

    (query.limit(limit).offset(offset), page, limit)
}

/// Apply case-insensitive substring search across multiple columns (OR condition).
/// Matches if the search term appears in any of the provided columns.
pub fn apply_multi_column_text_search<T>(
    query: sea_orm::Select<T>,
    columns: Vec<impl ColumnTrait>,
    search_term: &str,
) -> sea_orm::Select<T>
where
    T: EntityTrait,
{
    let search_term = search_term.trim();
    if search_term.is_empty() || columns.is_empty() {
        return query;
    }

    // SQLite's LIKE is case-insensitive for ASCII characters only
    let pattern = format!("%{}%", escape_like(search_term));
    let mut condition = Condition::any();

    for column in columns {
        let like = LikeExpr::new(pattern.clone()).escape(LIKE_ESCAPE);
        condition = condition.add(column.like(like));
    }

    query.filter(condition)
}

/// Makes `%`, `_` and the escape character match themselves inside a LIKE pattern.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}
