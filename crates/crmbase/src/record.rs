use crate::template::RecordTemplate;

use crmbase_core::{
    driver::{Connection, DatabaseRow},
    err,
    schema::RecordIdentifier,
    stmt::Value,
    Error, Result,
};

use std::sync::{Arc, Weak};

/// How a record holds on to its template. Weak binding is used when the
/// template lives in a shared registry that may be rebuilt on a metadata
/// change.
#[derive(Debug, Default)]
enum TemplateRef {
    #[default]
    None,
    Strong(Arc<RecordTemplate>),
    Weak(Weak<RecordTemplate>),
}

/// One business record bound to a [`RecordTemplate`].
///
/// Values are addressed by slot position in template order. A record
/// becomes `loaded` exactly after a successful load or insert; update and
/// delete leave the flag alone.
#[derive(Debug, Default)]
pub struct Record {
    identifier: Option<RecordIdentifier>,
    template: TemplateRef,
    values: Vec<Option<Value>>,
    row: Option<DatabaseRow>,
    loaded: bool,
    lookup_record: bool,
}

impl Record {
    pub fn new(identifier: RecordIdentifier) -> Self {
        Self {
            identifier: Some(identifier),
            ..Self::default()
        }
    }

    pub fn identifier(&self) -> Option<&RecordIdentifier> {
        self.identifier.as_ref()
    }

    pub fn set_identifier(&mut self, identifier: RecordIdentifier) {
        self.identifier = Some(identifier);
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_lookup_record(&self) -> bool {
        self.lookup_record
    }

    pub fn set_lookup_record(&mut self, lookup: bool) {
        self.lookup_record = lookup;
    }

    /// Bind a template the record owns for its lifetime.
    pub fn set_template(&mut self, template: Arc<RecordTemplate>) {
        self.resize_values(template.value_count());
        self.template = TemplateRef::Strong(template);
    }

    /// Bind a shared template without keeping it alive.
    pub fn set_template_weak(&mut self, template: &Arc<RecordTemplate>) {
        self.resize_values(template.value_count());
        self.template = TemplateRef::Weak(Arc::downgrade(template));
    }

    fn resize_values(&mut self, value_count: usize) {
        self.values.resize(value_count, None);
    }

    fn template(&self) -> Result<Arc<RecordTemplate>> {
        match &self.template {
            TemplateRef::None => Err(Error::missing_template()),
            TemplateRef::Strong(template) => Ok(template.clone()),
            TemplateRef::Weak(template) => template.upgrade().ok_or_else(Error::missing_template),
        }
    }

    fn record_id(&self) -> Result<&str> {
        self.identifier
            .as_ref()
            .map(|id| id.record_id.as_str())
            .ok_or_else(Error::missing_identifier)
    }

    fn info_area_id(&self) -> Result<&str> {
        self.identifier
            .as_ref()
            .map(|id| id.info_area_id.as_str())
            .ok_or_else(Error::missing_identifier)
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    pub fn set_value(&mut self, pos: usize, value: impl Into<Value>) -> Result<()> {
        let slot = self
            .values
            .get_mut(pos)
            .ok_or_else(|| err!("value position {} out of range", pos))?;
        *slot = Some(value.into());
        Ok(())
    }

    pub fn clear_values(&mut self) {
        for slot in &mut self.values {
            *slot = None;
        }
    }

    /// A non-empty caller-set value shadows the loaded backing row, so a
    /// record can be partially edited in place before an update.
    pub fn get_value(&self, pos: usize) -> Value {
        if let Some(Some(value)) = self.values.get(pos) {
            if !value.is_empty() {
                return value.clone();
            }
        }
        // Column 0 of the backing row is the record id.
        self.row
            .as_ref()
            .and_then(|row| row.value(pos + 1))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Fetch the backing row by record id and take ownership of it.
    pub fn load(&mut self, conn: &mut dyn Connection) -> Result<()> {
        let template = self.template()?;
        let record_id = self.record_id()?.to_string();

        tracing::debug!(record = %record_id, area = %template.info_area_id(), "loading record");
        let mut rows = conn.query(template.select_sql(), &[Value::from(record_id.clone())])?;
        match rows.take_row(0) {
            Some(row) => {
                self.row = Some(row);
                self.loaded = true;
                Ok(())
            }
            None => Err(Error::record_not_found(format!(
                "{}/{}",
                self.info_area_id()?,
                record_id
            ))),
        }
    }

    pub fn exists(&self, conn: &mut dyn Connection) -> Result<bool> {
        let template = self.template()?;
        let record_id = self.record_id()?.to_string();
        let found = conn.query_scalar(template.exists_sql(), &[Value::from(record_id)])?;
        Ok(found.is_some())
    }

    /// Insert the record. The record id leads the parameter vector.
    pub fn insert(&mut self, conn: &mut dyn Connection) -> Result<()> {
        let template = self.template()?;
        let record_id = self.record_id()?.to_string();
        let virt_area = self.info_area_id()?.to_string();

        let mut params = Vec::with_capacity(self.values.len() + 3);
        params.push(Value::from(record_id));
        for pos in 0..self.values.len() {
            params.push(self.get_value(pos));
        }
        params.push(Value::from(virt_area));
        if template.include_lookup_for_new() {
            params.push(Value::I64(self.lookup_record as i64));
        }

        conn.execute(template.insert_sql(), &params)?;
        self.loaded = true;
        Ok(())
    }

    /// Update the record. Values lead; the record id binds last, into the
    /// WHERE clause.
    pub fn update(&mut self, conn: &mut dyn Connection) -> Result<()> {
        let template = self.template()?;
        let record_id = self.record_id()?.to_string();
        let virt_area = self.info_area_id()?.to_string();

        let mut params = Vec::with_capacity(self.values.len() + 3);
        for pos in 0..self.values.len() {
            params.push(self.get_value(pos));
        }
        params.push(Value::from(virt_area));
        if template.include_lookup_for_update() {
            params.push(Value::I64(self.lookup_record as i64));
        }
        params.push(Value::from(record_id));

        conn.execute(template.update_sql(), &params)?;
        Ok(())
    }

    pub fn delete(&mut self, conn: &mut dyn Connection) -> Result<()> {
        let template = self.template()?;
        let record_id = self.record_id()?.to_string();
        conn.execute(template.delete_sql(), &[Value::from(record_id)])?;
        Ok(())
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for pos in 0..self.values.len() {
            writeln!(f, "field #{:05}: {}", pos + 1, self.get_value(pos))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bound_record() -> Record {
        let template = Arc::new(RecordTemplate::new("FI", vec![17, 5], vec![]));
        let mut record = Record::new(RecordIdentifier::new("FI", "r1"));
        record.set_template(template);
        record
    }

    #[test]
    fn template_binding_sizes_the_value_array() {
        let record = bound_record();
        assert_eq!(record.value_count(), 2);
        assert_eq!(record.get_value(0), Value::Null);
    }

    #[test]
    fn weak_binding_fails_once_the_template_is_gone() {
        let template = Arc::new(RecordTemplate::new("FI", vec![17], vec![]));
        let mut record = Record::new(RecordIdentifier::new("FI", "r1"));
        record.set_template_weak(&template);
        drop(template);

        let err = record.template().unwrap_err();
        assert!(err.is_missing_template());
    }

    #[test]
    fn set_value_is_bounds_checked() {
        let mut record = bound_record();
        assert!(record.set_value(0, "x").is_ok());
        assert!(record.set_value(2, "x").is_err());
    }

    #[test]
    fn caller_set_values_shadow_the_backing_row() {
        let mut record = bound_record();
        record.row = Some(DatabaseRow::from_vec(vec![
            Value::from("r1"),
            Value::from("loaded"),
            Value::I64(5),
        ]));

        assert_eq!(record.get_value(0), Value::from("loaded"));
        record.set_value(0, "edited").unwrap();
        assert_eq!(record.get_value(0), Value::from("edited"));
        // An empty caller value does not shadow.
        record.set_value(0, "").unwrap();
        assert_eq!(record.get_value(0), Value::from("loaded"));
    }

    #[test]
    fn debug_rendering() {
        let mut record = bound_record();
        record.set_value(0, "ACME").unwrap();
        assert_eq!(record.to_string(), "field #00001: ACME\nfield #00002: \n");
    }

    #[test]
    fn missing_identifier_and_template_are_distinct() {
        let record = Record::default();
        assert!(record.record_id().unwrap_err().is_missing_identifier());
        assert!(record.template().unwrap_err().is_missing_template());
    }
}
