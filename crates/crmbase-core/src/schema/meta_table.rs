use crate::driver::ColumnType;

/// One physical column as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMetaField {
    pub name: String,
    pub ty: ColumnType,
}

/// Lazily sorted column list of a physical table, used to introspect the
/// store's actual schema.
///
/// Name lookup is only defined once the list is sorted; an unsorted table
/// reports a miss instead of scanning linearly. That trade-off is
/// deliberate: callers that want lookups call `sort()` once after filling.
#[derive(Debug, Clone, Default)]
pub struct TableMetaInfo {
    pub name: String,
    fields: Vec<TableMetaField>,
    unsorted: bool,
}

impl TableMetaInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            unsorted: false,
        }
    }

    pub fn add_field(&mut self, name: impl Into<String>, ty: ColumnType) {
        self.fields.push(TableMetaField {
            name: name.into(),
            ty,
        });
        self.unsorted = true;
    }

    pub fn sort(&mut self) {
        self.fields.sort_by(|a, b| a.name.cmp(&b.name));
        self.unsorted = false;
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field_at(&self, index: usize) -> Option<&TableMetaField> {
        self.fields.get(index)
    }

    pub fn field(&self, name: &str) -> Option<&TableMetaField> {
        if self.unsorted {
            return None;
        }
        self.fields
            .binary_search_by(|f| f.name.as_str().cmp(name))
            .ok()
            .map(|idx| &self.fields[idx])
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lookup_requires_sorting() {
        let mut meta = TableMetaInfo::new("FI");
        meta.add_field("recid", ColumnType::Text);
        meta.add_field("F2", ColumnType::Integer);
        meta.add_field("F10", ColumnType::Text);

        // Unsorted tables report a miss even for present columns.
        assert!(meta.field("F2").is_none());

        meta.sort();
        assert_eq!(meta.field("F2").unwrap().ty, ColumnType::Integer);
        assert!(meta.has_field("recid"));
        assert!(!meta.has_field("F99"));
    }

    #[test]
    fn adding_after_sort_invalidates_lookup() {
        let mut meta = TableMetaInfo::new("KP");
        meta.add_field("F1", ColumnType::Text);
        meta.sort();
        assert!(meta.has_field("F1"));

        meta.add_field("F0", ColumnType::Text);
        assert!(!meta.has_field("F1"));
        meta.sort();
        assert!(meta.has_field("F0"));
    }
}
