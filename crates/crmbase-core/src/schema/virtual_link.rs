use super::LinkInfo;

/// Which side's join condition is rewritten when a virtual link is
/// flattened into the statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MoveLinks {
    #[default]
    DontMove,
    MoveFromSource,
    MoveFromTarget,
}

/// A derived link from a source area to a target area through an
/// intermediate area: `source <- intermediate -> target`.
///
/// Both underlying links are owned by the intermediate area and point
/// outwards. The link is only expressible as two plain joins when both of
/// them are realized as physical columns on the intermediate table.
#[derive(Debug, Clone)]
pub struct VirtualLinkInfo {
    /// Link from the intermediate area to the source area.
    pub link_to_source: Option<LinkInfo>,

    /// Link from the intermediate area to the target area.
    pub link_to_target: Option<LinkInfo>,

    pub move_links: MoveLinks,
}

impl VirtualLinkInfo {
    pub fn new(link_to_source: LinkInfo, link_to_target: LinkInfo) -> Self {
        Self {
            link_to_source: Some(link_to_source),
            link_to_target: Some(link_to_target),
            move_links: MoveLinks::DontMove,
        }
    }

    pub fn with_move_links(mut self, move_links: MoveLinks) -> Self {
        self.move_links = move_links;
        self
    }

    pub fn is_valid(&self) -> bool {
        match (&self.link_to_source, &self.link_to_target) {
            (Some(to_source), Some(to_target)) => {
                to_source.has_column() && to_target.has_column()
            }
            _ => false,
        }
    }

    pub fn intermediate_info_area_id(&self) -> Option<&str> {
        self.link_to_source
            .as_ref()
            .map(|link| link.info_area_id.as_str())
    }

    pub fn source_info_area_id(&self) -> Option<&str> {
        self.link_to_source
            .as_ref()
            .map(|link| link.target_info_area_id.as_str())
    }

    pub fn target_info_area_id(&self) -> Option<&str> {
        self.link_to_target
            .as_ref()
            .map(|link| link.target_info_area_id.as_str())
    }
}
