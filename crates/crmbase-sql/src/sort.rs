use crate::fmt::Formatter;

use crmbase_core::{
    schema::{CatalogKind, FieldKind, Schema},
    Error, Result,
};

/// A resolved ORDER BY entry. Catalog fields sort by the catalog's text or
/// priority instead of the stored code, which requires an extra join
/// against the catalog table.
#[derive(Debug)]
pub struct QuerySortField {
    node_alias: String,
    field_column: String,
    numeric: bool,
    descending: bool,
    catalog: Option<CatalogJoin>,
}

#[derive(Debug)]
struct CatalogJoin {
    kind: CatalogKind,
    alias: String,
    table: String,
    code_column: String,
    text_column: String,
    sort_column: Option<String>,
}

impl QuerySortField {
    pub(crate) fn new(
        schema: &Schema,
        info_area_id: &str,
        node_alias: &str,
        is_root: bool,
        field_id: u32,
        descending: bool,
    ) -> Result<Self> {
        let area = schema
            .info_area(info_area_id)
            .ok_or_else(|| Error::statement_compile(format!("unknown information area {info_area_id}")))?;
        let field = area.field(field_id).ok_or_else(|| {
            Error::statement_compile(format!("unknown field {field_id} in {info_area_id}"))
        })?;

        let catalog_key = match field.kind {
            FieldKind::FixedCatalog { cat } => Some((CatalogKind::Fixed, cat)),
            FieldKind::VariableCatalog { cat } => Some((CatalogKind::Variable, cat)),
            _ => None,
        };

        let catalog = catalog_key
            .map(|(kind, cat)| -> Result<CatalogJoin> {
                let info = schema.catalog(kind, cat).ok_or_else(|| {
                    Error::statement_compile(format!("catalog {cat} is not registered"))
                })?;
                // The root's catalog alias stays short; nested nodes prefix
                // their own alias so two sorts never collide.
                let alias = if is_root {
                    format!("S{field_id}")
                } else {
                    format!("{node_alias}_S{field_id}")
                };
                Ok(CatalogJoin {
                    kind,
                    alias,
                    table: info.table_name.clone(),
                    code_column: info.code_column.clone(),
                    text_column: info.text_column.clone(),
                    sort_column: info.sort_column.clone(),
                })
            })
            .transpose()?;

        Ok(Self {
            node_alias: node_alias.to_string(),
            field_column: field.column_name(),
            numeric: field.kind.is_numeric(),
            descending,
            catalog,
        })
    }

    pub fn node_alias(&self) -> &str {
        &self.node_alias
    }

    pub(crate) fn add_to_from(&self, f: &mut Formatter<'_>) {
        if let Some(cat) = &self.catalog {
            fmt!(
                f,
                " LEFT JOIN " cat.table " " cat.alias
                " ON " self.node_alias "." self.field_column " = " cat.alias "." cat.code_column
            );
        }
    }

    fn add_to_order_by(&self, f: &mut Formatter<'_>) {
        let direction = if self.descending { " DESC" } else { "" };
        let collation = f.ctx.collation_name.clone();

        let Some(cat) = &self.catalog else {
            fmt!(f, self.node_alias "." self.field_column);
            if !self.numeric {
                if let Some(name) = &collation {
                    fmt!(f, " COLLATE " name);
                }
            }
            fmt!(f, direction);
            return;
        };

        let by_priority = match cat.kind {
            CatalogKind::Fixed => f.ctx.sort_fix_by_sort_info_and_code,
            CatalogKind::Variable => f.ctx.sort_var_by_sort_info,
        };

        match (&cat.sort_column, by_priority) {
            (Some(sort_column), true) => {
                // Priority 0 means "unranked" and sorts behind every ranked
                // entry but ahead of entries with no priority at all.
                let priority = format!("{}.{}", cat.alias, sort_column);
                fmt!(
                    f,
                    "CASE " priority " WHEN 0 THEN 30000 ELSE COALESCE(" priority
                    ",32000) END" direction ", "
                );
                match cat.kind {
                    CatalogKind::Fixed => {
                        fmt!(f, cat.alias "." cat.code_column direction);
                    }
                    CatalogKind::Variable => {
                        fmt!(f, cat.alias "." cat.text_column direction);
                    }
                }
            }
            _ => {
                fmt!(f, cat.alias "." cat.text_column);
                if let Some(name) = &collation {
                    fmt!(f, " COLLATE " name);
                }
                fmt!(f, direction);
            }
        }
    }
}

impl crate::fmt::ToSql for &QuerySortField {
    fn to_sql(self, f: &mut Formatter<'_>) {
        self.add_to_order_by(f);
    }
}
