use super::{FieldInfo, LinkInfo, VirtualLinkInfo};

/// One logical entity of the CRM schema. The physical table shares the
/// information-area id as its name.
#[derive(Debug, Clone, Default)]
pub struct InfoAreaInfo {
    pub id: String,

    /// True when the area maintains separate lookup rows that queries must
    /// exclude unless explicitly requested.
    pub has_lookup_rows: bool,

    pub fields: Vec<FieldInfo>,
    pub links: Vec<LinkInfo>,
    pub virtual_links: Vec<VirtualLinkInfo>,
}

impl InfoAreaInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn table_name(&self) -> &str {
        &self.id
    }

    pub fn add_field(&mut self, field: FieldInfo) {
        self.fields.push(field);
    }

    pub fn add_link(&mut self, link: LinkInfo) {
        self.links.push(link);
    }

    pub fn add_virtual_link(&mut self, link: VirtualLinkInfo) {
        self.virtual_links.push(link);
    }

    pub fn field(&self, field_id: u32) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.field_id == field_id)
    }

    /// Find a direct link to the given target area. With `link_id` the
    /// match is exact, otherwise the first declared link to that area wins.
    pub fn link_to(&self, target_info_area_id: &str, link_id: Option<i32>) -> Option<&LinkInfo> {
        self.links.iter().find(|l| {
            l.target_info_area_id == target_info_area_id
                && link_id.map_or(true, |id| l.link_id == id)
        })
    }

    /// Find a link by its id alone.
    pub fn link(&self, link_id: i32) -> Option<&LinkInfo> {
        self.links.iter().find(|l| l.link_id == link_id)
    }

    /// Find a registered virtual link reaching the given target area.
    pub fn virtual_link_to(&self, target_info_area_id: &str) -> Option<&VirtualLinkInfo> {
        self.virtual_links
            .iter()
            .find(|v| v.target_info_area_id() == Some(target_info_area_id))
    }
}
