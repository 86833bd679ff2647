use crmbase_core::schema::columns;

use std::sync::OnceLock;

/// A reusable statement shape for record CRUD on one information area:
/// the ordered field ids, the link columns written alongside them, and the
/// lazily built SQL for each operation.
///
/// The SQL text is cached here; physical statement reuse happens in the
/// driver's prepared-statement cache, keyed by that text. One template is
/// shared across many records, so all cached state is write-once.
#[derive(Debug)]
pub struct RecordTemplate {
    info_area_id: String,
    field_ids: Vec<u32>,
    link_field_names: Vec<String>,

    include_lookup_for_new: bool,
    include_lookup_for_update: bool,

    select_sql: OnceLock<String>,
    exists_sql: OnceLock<String>,
    insert_sql: OnceLock<String>,
    update_sql: OnceLock<String>,
    delete_sql: OnceLock<String>,
}

impl RecordTemplate {
    pub fn new(
        info_area_id: impl Into<String>,
        field_ids: Vec<u32>,
        link_field_names: Vec<String>,
    ) -> Self {
        Self {
            info_area_id: info_area_id.into(),
            field_ids,
            link_field_names,
            include_lookup_for_new: false,
            include_lookup_for_update: false,
            select_sql: OnceLock::new(),
            exists_sql: OnceLock::new(),
            insert_sql: OnceLock::new(),
            update_sql: OnceLock::new(),
            delete_sql: OnceLock::new(),
        }
    }

    /// Also write the lookup flag column on insert.
    pub fn with_lookup_for_new(mut self) -> Self {
        self.include_lookup_for_new = true;
        self
    }

    /// Also write the lookup flag column on update.
    pub fn with_lookup_for_update(mut self) -> Self {
        self.include_lookup_for_update = true;
        self
    }

    pub fn info_area_id(&self) -> &str {
        &self.info_area_id
    }

    pub fn field_ids(&self) -> &[u32] {
        &self.field_ids
    }

    pub fn link_field_names(&self) -> &[String] {
        &self.link_field_names
    }

    /// Number of value slots a bound record carries.
    pub fn value_count(&self) -> usize {
        self.field_ids.len() + self.link_field_names.len()
    }

    pub(crate) fn include_lookup_for_new(&self) -> bool {
        self.include_lookup_for_new
    }

    pub(crate) fn include_lookup_for_update(&self) -> bool {
        self.include_lookup_for_update
    }

    /// Writable columns in slot order: field columns first, then the link
    /// columns.
    fn value_columns(&self) -> impl Iterator<Item = String> + '_ {
        self.field_ids
            .iter()
            .map(|id| columns::field_column(*id))
            .chain(self.link_field_names.iter().cloned())
    }

    pub(crate) fn select_sql(&self) -> &str {
        self.select_sql.get_or_init(|| {
            let mut cols = vec![columns::RECORD_ID.to_string()];
            cols.extend(self.value_columns());
            format!(
                "SELECT {} FROM {} WHERE {} = ? LIMIT 1",
                cols.join(", "),
                self.info_area_id,
                columns::RECORD_ID,
            )
        })
    }

    pub(crate) fn exists_sql(&self) -> &str {
        self.exists_sql.get_or_init(|| {
            format!(
                "SELECT 1 FROM {} WHERE {} = ? LIMIT 1",
                self.info_area_id,
                columns::RECORD_ID,
            )
        })
    }

    /// The record id leads the column list; the lookup flag, when written,
    /// comes last.
    pub(crate) fn insert_sql(&self) -> &str {
        self.insert_sql.get_or_init(|| {
            let mut cols = vec![columns::RECORD_ID.to_string()];
            cols.extend(self.value_columns());
            cols.push(columns::VIRTUAL_AREA.to_string());
            if self.include_lookup_for_new {
                cols.push(columns::LOOKUP_ROW.to_string());
            }
            let slots = vec!["?"; cols.len()].join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.info_area_id,
                cols.join(", "),
                slots,
            )
        })
    }

    /// Mirror image of the insert shape: values first, the record id binds
    /// last in the WHERE clause.
    pub(crate) fn update_sql(&self) -> &str {
        self.update_sql.get_or_init(|| {
            let mut cols: Vec<String> = self.value_columns().collect();
            cols.push(columns::VIRTUAL_AREA.to_string());
            if self.include_lookup_for_update {
                cols.push(columns::LOOKUP_ROW.to_string());
            }
            let assignments = cols
                .iter()
                .map(|c| format!("{c} = ?"))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "UPDATE {} SET {} WHERE {} = ?",
                self.info_area_id,
                assignments,
                columns::RECORD_ID,
            )
        })
    }

    pub(crate) fn delete_sql(&self) -> &str {
        self.delete_sql.get_or_init(|| {
            format!(
                "DELETE FROM {} WHERE {} = ?",
                self.info_area_id,
                columns::RECORD_ID,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn statement_shapes() {
        let template = RecordTemplate::new("FI", vec![17, 5], vec!["LINK_PB_2".into()]);

        assert_eq!(template.value_count(), 3);
        assert_eq!(
            template.select_sql(),
            "SELECT recid, F17, F5, LINK_PB_2 FROM FI WHERE recid = ? LIMIT 1"
        );
        assert_eq!(template.exists_sql(), "SELECT 1 FROM FI WHERE recid = ? LIMIT 1");
        assert_eq!(
            template.insert_sql(),
            "INSERT INTO FI (recid, F17, F5, LINK_PB_2, virt_area) VALUES (?, ?, ?, ?, ?)"
        );
        assert_eq!(
            template.update_sql(),
            "UPDATE FI SET F17 = ?, F5 = ?, LINK_PB_2 = ?, virt_area = ? WHERE recid = ?"
        );
        assert_eq!(template.delete_sql(), "DELETE FROM FI WHERE recid = ?");
    }

    #[test]
    fn lookup_flag_column_is_appended() {
        let template = RecordTemplate::new("FI", vec![17], vec![])
            .with_lookup_for_new()
            .with_lookup_for_update();

        assert_eq!(
            template.insert_sql(),
            "INSERT INTO FI (recid, F17, virt_area, lookuprow) VALUES (?, ?, ?, ?)"
        );
        assert_eq!(
            template.update_sql(),
            "UPDATE FI SET F17 = ?, virt_area = ?, lookuprow = ? WHERE recid = ?"
        );
    }
}
