pub mod columns;

mod catalog;
pub use catalog::{CatalogInfo, CatalogKind};

mod field;
pub use field::{FieldFormat, FieldInfo, FieldKind};

mod info_area;
pub use info_area::InfoAreaInfo;

mod link;
pub use link::{LinkInfo, RelationType};

mod meta_table;
pub use meta_table::{TableMetaField, TableMetaInfo};

mod record_id;
pub use record_id::RecordIdentifier;

mod virtual_link;
pub use virtual_link::{MoveLinks, VirtualLinkInfo};

use indexmap::IndexMap;

/// The full metadata model: every information area plus the catalog
/// registries. Insertion order is preserved so compiled statements are
/// deterministic for a given metadata load.
#[derive(Debug, Default)]
pub struct Schema {
    areas: IndexMap<String, InfoAreaInfo>,
    fixed_catalogs: IndexMap<u32, CatalogInfo>,
    variable_catalogs: IndexMap<u32, CatalogInfo>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_info_area(&mut self, area: InfoAreaInfo) {
        self.areas.insert(area.id.clone(), area);
    }

    pub fn add_catalog(&mut self, kind: CatalogKind, nr: u32, catalog: CatalogInfo) {
        match kind {
            CatalogKind::Fixed => self.fixed_catalogs.insert(nr, catalog),
            CatalogKind::Variable => self.variable_catalogs.insert(nr, catalog),
        };
    }

    pub fn info_area(&self, id: &str) -> Option<&InfoAreaInfo> {
        self.areas.get(id)
    }

    pub fn info_area_mut(&mut self, id: &str) -> Option<&mut InfoAreaInfo> {
        self.areas.get_mut(id)
    }

    pub fn catalog(&self, kind: CatalogKind, nr: u32) -> Option<&CatalogInfo> {
        match kind {
            CatalogKind::Fixed => self.fixed_catalogs.get(&nr),
            CatalogKind::Variable => self.variable_catalogs.get(&nr),
        }
    }

    pub fn info_areas(&self) -> impl Iterator<Item = &InfoAreaInfo> {
        self.areas.values()
    }
}
