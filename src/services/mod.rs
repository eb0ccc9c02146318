pub mod album;
pub mod model;
pub mod query;

/// Catalog failures that callers can act on.
///
/// Everything else (database, connection) travels as a plain `eyre::Report`.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("{entity} name is required")]
    NameRequired { entity: &'static str },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
}

/// Trimmed, non-empty name or a `NameRequired` error.
pub(crate) fn require_name(
    entity: &'static str,
    name: Option<String>,
) -> Result<String, CatalogError> {
    name.map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or(CatalogError::NameRequired { entity })
}
