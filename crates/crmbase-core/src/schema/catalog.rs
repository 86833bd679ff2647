/// Catalog flavor: fixed catalogs enumerate a closed code set, variable
/// catalogs grow with the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    Fixed,
    Variable,
}

/// Backing lookup table of one catalog: maps coded values to display text,
/// optionally with a priority column driving sort order.
#[derive(Debug, Clone)]
pub struct CatalogInfo {
    pub table_name: String,
    pub code_column: String,
    pub text_column: String,
    pub sort_column: Option<String>,
}

impl CatalogInfo {
    pub fn new(
        table_name: impl Into<String>,
        code_column: impl Into<String>,
        text_column: impl Into<String>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            code_column: code_column.into(),
            text_column: text_column.into(),
            sort_column: None,
        }
    }

    pub fn with_sort_column(mut self, sort_column: impl Into<String>) -> Self {
        self.sort_column = Some(sort_column.into());
        self
    }
}
