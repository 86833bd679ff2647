use std::sync::Arc;

/// Create an ad-hoc [`Error`](crate::Error) from format arguments.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        $crate::Error::from_args(format_args!($($arg)*))
    };
}

/// An error that can occur in crmbase.
///
/// Kept at one word: the payload lives behind an `Arc` so results stay cheap
/// to move through the compile/execute call chain.
#[derive(Clone)]
pub struct Error {
    inner: Arc<ErrorInner>,
}

#[derive(Debug)]
struct ErrorInner {
    kind: ErrorKind,
    cause: Option<Error>,
}

/// The discriminated error kinds of this core.
///
/// The original sentinel contract survives as named variants:
/// `MissingIdentifier` stands in for the legacy `-2` status,
/// `MissingTemplate` for `-1`, and any `Err` for the non-zero execution
/// status. Callers can still tell "nothing to do" apart from "attempted and
/// failed".
#[derive(Debug)]
enum ErrorKind {
    /// Structural failure while compiling a statement. No SQL was emitted.
    StatementCompile(String),

    /// The underlying relational engine reported a failure.
    Driver(Box<dyn std::error::Error + Send + Sync>),

    /// A load found no row for the given identifier.
    RecordNotFound(String),

    /// A record operation was invoked without a bound template.
    MissingTemplate,

    /// A record operation was invoked without a record identifier.
    MissingIdentifier,

    /// A value could not be converted to the requested type.
    TypeConversion { value: String, target: &'static str },

    /// Anything that does not have a structured representation yet.
    Adhoc(String),

    Anyhow(anyhow::Error),
}

impl Error {
    pub fn from_args(args: std::fmt::Arguments<'_>) -> Self {
        ErrorKind::Adhoc(std::fmt::format(args)).into()
    }

    pub fn statement_compile(msg: impl Into<String>) -> Self {
        ErrorKind::StatementCompile(msg.into()).into()
    }

    pub fn driver_operation_failed(
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ErrorKind::Driver(Box::new(err)).into()
    }

    pub fn record_not_found(detail: impl Into<String>) -> Self {
        ErrorKind::RecordNotFound(detail.into()).into()
    }

    pub fn missing_template() -> Self {
        ErrorKind::MissingTemplate.into()
    }

    pub fn missing_identifier() -> Self {
        ErrorKind::MissingIdentifier.into()
    }

    pub fn type_conversion(value: impl std::fmt::Debug, target: &'static str) -> Self {
        ErrorKind::TypeConversion {
            value: format!("{value:?}"),
            target,
        }
        .into()
    }

    /// Adds context to this error. Context displays before the cause chain.
    pub fn context(self, consequent: Error) -> Error {
        Error {
            inner: Arc::new(ErrorInner {
                kind: match Arc::try_unwrap(consequent.inner) {
                    Ok(inner) => inner.kind,
                    Err(shared) => ErrorKind::Adhoc(shared.kind.to_string()),
                },
                cause: Some(self),
            }),
        }
    }

    pub fn is_statement_compile(&self) -> bool {
        matches!(self.inner.kind, ErrorKind::StatementCompile(_))
    }

    pub fn is_record_not_found(&self) -> bool {
        matches!(self.inner.kind, ErrorKind::RecordNotFound(_))
    }

    pub fn is_missing_template(&self) -> bool {
        matches!(self.inner.kind, ErrorKind::MissingTemplate)
    }

    pub fn is_missing_identifier(&self) -> bool {
        matches!(self.inner.kind, ErrorKind::MissingIdentifier)
    }

    fn chain(&self) -> impl Iterator<Item = &Error> {
        let mut err = Some(self);
        core::iter::from_fn(move || {
            let current = err?;
            err = current.inner.cause.as_ref();
            Some(current)
        })
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.inner.kind {
            ErrorKind::Driver(err) => Some(err.as_ref()),
            ErrorKind::Anyhow(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut it = self.chain().peekable();
        while let Some(err) = it.next() {
            core::fmt::Display::fmt(&err.inner.kind, f)?;
            if it.peek().is_some() {
                f.write_str(": ")?;
            }
        }
        Ok(())
    }
}

impl core::fmt::Debug for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if f.alternate() {
            f.debug_struct("Error")
                .field("kind", &self.inner.kind)
                .field("cause", &self.inner.cause)
                .finish()
        } else {
            core::fmt::Display::fmt(self, f)
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use ErrorKind::*;

        match self {
            StatementCompile(msg) => write!(f, "statement compilation failed: {msg}"),
            Driver(err) => write!(f, "driver operation failed: {err}"),
            RecordNotFound(detail) => write!(f, "record not found: {detail}"),
            MissingTemplate => f.write_str("record has no template"),
            MissingIdentifier => f.write_str("record has no identifier"),
            TypeConversion { value, target } => {
                write!(f, "cannot convert {value} to {target}")
            }
            Adhoc(msg) => f.write_str(msg),
            Anyhow(err) => core::fmt::Display::fmt(err, f),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            inner: Arc::new(ErrorInner { kind, cause: None }),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Error {
        Error::from(ErrorKind::Anyhow(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn error_size() {
        // One word, same as a bare pointer
        assert_eq!(
            core::mem::size_of::<usize>(),
            core::mem::size_of::<Error>()
        );
    }

    #[test]
    fn sentinel_kinds_are_distinguishable() {
        assert!(Error::missing_template().is_missing_template());
        assert!(Error::missing_identifier().is_missing_identifier());
        assert!(!Error::missing_template().is_missing_identifier());
    }

    #[test]
    fn compile_error_display() {
        let err = Error::statement_compile("no link from FI to KP");
        assert!(err.is_statement_compile());
        assert_eq!(
            err.to_string(),
            "statement compilation failed: no link from FI to KP"
        );
    }

    #[test]
    fn context_chain_display() {
        let err = Error::record_not_found("FI/00001")
            .context(err!("load failed"));
        assert_eq!(err.to_string(), "load failed: record not found: FI/00001");
    }

    #[test]
    fn anyhow_bridge() {
        let err: Error = anyhow::anyhow!("something failed").into();
        assert_eq!(err.to_string(), "something failed");
    }
}
