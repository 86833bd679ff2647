use crmbase_core::stmt::Value;

/// Single-compile-pass accumulator: collected positional parameters, the
/// first structural error encountered, and the sort/collation settings of
/// the query being compiled.
///
/// A fresh context is created per compile; the same instance is never
/// shared between two statements.
#[derive(Debug, Default)]
pub struct StatementCreationContext {
    params: Vec<Value>,
    error: Option<String>,
    placeholder_position: Option<usize>,

    pub(crate) collation_name: Option<String>,
    pub(crate) sort_fix_by_sort_info_and_code: bool,
    pub(crate) sort_var_by_sort_info: bool,
}

impl StatementCreationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter; returns its zero-based position. The position of
    /// a [`Value::Placeholder`] is recorded so sub-query execution can
    /// rebind that slot without scanning for a sentinel value.
    pub fn push_param(&mut self, value: Value) -> usize {
        let position = self.params.len();
        if value.is_placeholder() && self.placeholder_position.is_none() {
            self.placeholder_position = Some(position);
        }
        self.params.push(value);
        position
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn into_params(self) -> Vec<Value> {
        self.params
    }

    pub fn placeholder_position(&self) -> Option<usize> {
        self.placeholder_position
    }

    /// Record a structural error. The first error wins; later ones are
    /// dropped so the reported message points at the root problem.
    pub fn set_error(&mut self, message: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(message.into());
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error_text(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
