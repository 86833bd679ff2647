/// Identifies exactly one row in one information area.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordIdentifier {
    pub info_area_id: String,
    pub record_id: String,
}

impl RecordIdentifier {
    pub fn new(info_area_id: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            info_area_id: info_area_id.into(),
            record_id: record_id.into(),
        }
    }

    /// Detach an immutable copy from a possibly mutable source.
    pub fn detached(other: &RecordIdentifier) -> Self {
        other.clone()
    }
}

impl core::fmt::Display for RecordIdentifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.info_area_id, self.record_id)
    }
}
