//! Persisted physical-layout names. Existing stores depend on these
//! bit-for-bit; change nothing here without a data migration.

/// Primary key column of every information-area table.
pub const RECORD_ID: &str = "recid";

/// Flag column marking reference/lookup rows.
pub const LOOKUP_ROW: &str = "lookuprow";

/// Column holding the virtual information-area id of a row.
pub const VIRTUAL_AREA: &str = "virt_area";

/// Generic-link column pair: target information-area id and record id.
pub const GENERIC_LINK_AREA: &str = "LINK_AREA";
pub const GENERIC_LINK_RECID: &str = "LINK_RECID";

/// Reserved link id of the forward generic link. Realized as the
/// `LINK_AREA`/`LINK_RECID` column pair on the owning table.
pub const GENERIC_LINK_ID: i32 = 126;

/// Reserved link id of the reverse generic link. Has no physical column.
pub const GENERIC_REVERSE_LINK_ID: i32 = 127;

/// Database column name of a field: `F<fieldId>`.
pub fn field_column(field_id: u32) -> String {
    format!("F{field_id}")
}

/// Synthesized foreign-key column name: `LINK_<targetArea>_<linkId>`.
pub fn link_column(target_info_area_id: &str, link_id: i32) -> String {
    format!("LINK_{target_info_area_id}_{link_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn synthesized_names() {
        assert_eq!(field_column(17), "F17");
        assert_eq!(link_column("KP", 2), "LINK_KP_2");
    }
}
