use super::columns;

/// How two information areas relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationType {
    Ident,
    Parent,
    Child,
    Generic,
    OneToOne,
    OneToMany,
    ManyToOne,
    Unknown,
}

impl RelationType {
    /// The relation type of the opposite direction.
    ///
    /// `OneToOne` maps to `Parent` and `OneToMany`/`ManyToOne` have no
    /// reverse here even though `is_child_link` treats `OneToMany` as a
    /// child relation. Existing link configurations depend on the generated
    /// SQL staying as-is, so the mapping is pinned by tests rather than made
    /// symmetric.
    pub fn reverse(self) -> Self {
        match self {
            Self::Ident => Self::Ident,
            Self::Parent => Self::Child,
            Self::Child => Self::Parent,
            Self::OneToOne => Self::Parent,
            _ => Self::Unknown,
        }
    }
}

/// A declared relationship from one information area to another.
///
/// A link is either field-based (`source_field_id`/`dest_field_id` both
/// set, possibly extended to parallel multi-field arrays) or realized as a
/// physical foreign-key column on the source table.
#[derive(Debug, Clone)]
pub struct LinkInfo {
    pub info_area_id: String,
    pub target_info_area_id: String,
    pub link_id: i32,
    pub reverse_link_id: i32,
    pub relation_type: RelationType,

    pub source_field_id: Option<u32>,
    pub dest_field_id: Option<u32>,

    /// Parallel arrays for multi-field links.
    pub source_field_ids: Vec<u32>,
    pub dest_field_ids: Vec<u32>,

    /// Per-position literal overrides. A literal on one side replaces the
    /// field comparison for that position with a bound constant.
    pub source_values: Vec<Option<String>>,
    pub dest_values: Vec<Option<String>>,

    pub link_flag: u32,
}

impl LinkInfo {
    pub fn new(
        info_area_id: impl Into<String>,
        target_info_area_id: impl Into<String>,
        link_id: i32,
        relation_type: RelationType,
    ) -> Self {
        Self {
            info_area_id: info_area_id.into(),
            target_info_area_id: target_info_area_id.into(),
            link_id,
            reverse_link_id: -1,
            relation_type,
            source_field_id: None,
            dest_field_id: None,
            source_field_ids: Vec::new(),
            dest_field_ids: Vec::new(),
            source_values: Vec::new(),
            dest_values: Vec::new(),
            link_flag: 0,
        }
    }

    pub fn with_fields(mut self, source_field_id: u32, dest_field_id: u32) -> Self {
        self.source_field_id = Some(source_field_id);
        self.dest_field_id = Some(dest_field_id);
        self
    }

    pub fn is_field_link(&self) -> bool {
        self.source_field_id.is_some() && self.dest_field_id.is_some()
    }

    pub fn is_multi_field_link(&self) -> bool {
        !self.source_field_ids.is_empty()
    }

    pub fn is_generic(&self) -> bool {
        matches!(
            self.link_id,
            columns::GENERIC_LINK_ID | columns::GENERIC_REVERSE_LINK_ID
        )
    }

    /// True when the relation is a child relation from the source's point of
    /// view. `OneToMany` counts here even though it has no reverse mapping.
    pub fn is_child_link(&self) -> bool {
        matches!(
            self.relation_type,
            RelationType::Child | RelationType::OneToMany
        )
    }

    /// True exactly when the link is realized as a physical foreign-key
    /// column on the source table.
    pub fn has_column(&self) -> bool {
        matches!(
            self.relation_type,
            RelationType::ManyToOne | RelationType::OneToOne
        ) || self.link_id == columns::GENERIC_LINK_ID
    }

    /// The synthesized foreign-key column name on the source table.
    pub fn column_name(&self) -> String {
        columns::link_column(&self.target_info_area_id, self.link_id)
    }

    /// Identifier for this link occurrence, unique per area pair and id.
    pub fn ident_name(&self) -> String {
        format!(
            "{}_{}_{}",
            self.info_area_id, self.target_info_area_id, self.link_id
        )
    }

    /// Literal override for a multi-field position on the source side,
    /// normalized so a self-reference resolves to the local context: a
    /// value equal to the target area id is rewritten to this side's id.
    pub fn source_value_at(&self, pos: usize) -> Option<&str> {
        self.source_values
            .get(pos)
            .and_then(|v| v.as_deref())
            .map(|v| self.normalize(v, &self.target_info_area_id, &self.info_area_id))
    }

    /// Literal override for a multi-field position on the destination side,
    /// normalized the same way from the target's point of view.
    pub fn dest_value_at(&self, pos: usize) -> Option<&str> {
        self.dest_values
            .get(pos)
            .and_then(|v| v.as_deref())
            .map(|v| self.normalize(v, &self.info_area_id, &self.target_info_area_id))
    }

    fn normalize<'a>(&self, value: &'a str, other: &str, local: &'a str) -> &'a str {
        if value == other {
            local
        } else {
            value
        }
    }

    /// Synthesize the opposite-direction link when the schema lacks an
    /// explicit one. Returns `None` when the relation type has no defined
    /// reverse.
    pub fn create_virtual_reverse_link(&self) -> Option<LinkInfo> {
        let reverse_type = self.relation_type.reverse();
        if reverse_type == RelationType::Unknown {
            return None;
        }

        Some(LinkInfo {
            info_area_id: self.target_info_area_id.clone(),
            target_info_area_id: self.info_area_id.clone(),
            link_id: self.reverse_link_id,
            reverse_link_id: self.link_id,
            relation_type: reverse_type,
            source_field_id: self.dest_field_id,
            dest_field_id: self.source_field_id,
            source_field_ids: self.dest_field_ids.clone(),
            dest_field_ids: self.source_field_ids.clone(),
            source_values: self.dest_values.clone(),
            dest_values: self.source_values.clone(),
            link_flag: self.link_flag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reverse_relation_table() {
        assert_eq!(RelationType::Ident.reverse(), RelationType::Ident);
        assert_eq!(RelationType::Parent.reverse(), RelationType::Child);
        assert_eq!(RelationType::Child.reverse(), RelationType::Parent);
        // Asymmetric on purpose: OneToOne reverses to Parent, and the
        // one-to-many pair has no reverse at all.
        assert_eq!(RelationType::OneToOne.reverse(), RelationType::Parent);
        assert_eq!(RelationType::OneToMany.reverse(), RelationType::Unknown);
        assert_eq!(RelationType::ManyToOne.reverse(), RelationType::Unknown);
        assert_eq!(RelationType::Generic.reverse(), RelationType::Unknown);
    }

    #[test]
    fn one_to_many_is_still_a_child_link() {
        let link = LinkInfo::new("FI", "KP", 3, RelationType::OneToMany);
        assert!(link.is_child_link());
        assert!(link.create_virtual_reverse_link().is_none());
    }

    #[test]
    fn column_links() {
        let link = LinkInfo::new("FI", "KP", 2, RelationType::ManyToOne);
        assert!(link.has_column());
        assert_eq!(link.column_name(), "LINK_KP_2");

        let child = LinkInfo::new("FI", "KP", 3, RelationType::Child);
        assert!(!child.has_column());

        let generic = LinkInfo::new("FI", "KP", 126, RelationType::Generic);
        assert!(generic.has_column());
        assert!(generic.is_generic());
    }

    #[test]
    fn virtual_reverse_swaps_both_sides() {
        let mut link = LinkInfo::new("FI", "KP", 4, RelationType::Parent).with_fields(17, 1);
        link.reverse_link_id = 9;

        let rev = link.create_virtual_reverse_link().unwrap();
        assert_eq!(rev.info_area_id, "KP");
        assert_eq!(rev.target_info_area_id, "FI");
        assert_eq!(rev.link_id, 9);
        assert_eq!(rev.reverse_link_id, 4);
        assert_eq!(rev.relation_type, RelationType::Child);
        assert_eq!(rev.source_field_id, Some(1));
        assert_eq!(rev.dest_field_id, Some(17));
    }

    #[test]
    fn multi_field_literal_normalization() {
        let mut link = LinkInfo::new("FI", "PB", 5, RelationType::ManyToOne);
        link.source_field_ids = vec![2, 3];
        link.dest_field_ids = vec![7, 8];
        // A literal naming the opposite side collapses to the local area.
        link.source_values = vec![Some("PB".into()), Some("XX".into())];
        link.dest_values = vec![None, Some("FI".into())];

        assert_eq!(link.source_value_at(0), Some("FI"));
        assert_eq!(link.source_value_at(1), Some("XX"));
        assert_eq!(link.dest_value_at(0), None);
        assert_eq!(link.dest_value_at(1), Some("PB"));
    }
}
