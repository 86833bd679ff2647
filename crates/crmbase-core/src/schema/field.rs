use super::columns;

/// The closed set of field kinds, computed once at metadata load time from
/// the original single-character type code and the format flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Date,
    Time,
    Numeric,
    /// Enumerated catalog; carries the catalog number.
    FixedCatalog {
        cat: u32,
    },
    /// Open catalog; carries the catalog number.
    VariableCatalog {
        cat: u32,
    },
    Participants,
    Text,
    Html,
}

impl FieldKind {
    /// Decode a kind from the metadata type code. `C` only means
    /// participants when a rep mode is configured for the field.
    pub fn from_code(code: char, cat: u32, format: &FieldFormat, rep_mode: bool) -> Self {
        if format.is_html {
            return Self::Html;
        }
        match code {
            'D' => Self::Date,
            'T' => Self::Time,
            'N' | 'L' | 'S' => Self::Numeric,
            'X' => Self::FixedCatalog { cat },
            'K' => Self::VariableCatalog { cat },
            'C' if rep_mode => Self::Participants,
            _ => Self::Text,
        }
    }

    pub const fn is_catalog(&self) -> bool {
        matches!(
            self,
            Self::FixedCatalog { .. } | Self::VariableCatalog { .. }
        )
    }

    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric)
    }
}

/// Format attributes decoded from the metadata bit flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldFormat {
    pub is_amount: bool,
    pub is_percent: bool,
    pub has_grouping_separator: bool,
    pub decimal_digits: u8,
    pub is_html: bool,
}

const FORMAT_AMOUNT: u32 = 1 << 0;
const FORMAT_PERCENT: u32 = 1 << 1;
const FORMAT_GROUPING: u32 = 1 << 2;
const FORMAT_HTML: u32 = 1 << 3;

impl FieldFormat {
    /// Decode the packed format word. Decimal digit count sits in bits 8-11.
    pub fn from_bits(format: u32) -> Self {
        Self {
            is_amount: format & FORMAT_AMOUNT != 0,
            is_percent: format & FORMAT_PERCENT != 0,
            has_grouping_separator: format & FORMAT_GROUPING != 0,
            decimal_digits: ((format >> 8) & 0xf) as u8,
            is_html: format & FORMAT_HTML != 0,
        }
    }
}

/// One column descriptor of an information area.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub info_area_id: String,

    pub field_id: u32,

    /// Display name
    pub name: String,

    /// Name used in XML payloads
    pub xml_name: String,

    pub kind: FieldKind,

    pub length: u32,

    /// Category id
    pub cat: i32,

    /// Unified category id
    pub ucat: i32,

    pub format: FieldFormat,

    /// Rights bit mask, kept raw
    pub rights: u32,

    /// Number of fields in the array-field group this field starts, when it
    /// is the first field of a declared contiguous range. Only the first
    /// field of the range carries the group.
    array_field_count: Option<u32>,
}

impl FieldInfo {
    pub fn new(info_area_id: impl Into<String>, field_id: u32, kind: FieldKind) -> Self {
        Self {
            info_area_id: info_area_id.into(),
            field_id,
            name: String::new(),
            xml_name: String::new(),
            kind,
            length: 0,
            cat: -1,
            ucat: -1,
            format: FieldFormat::default(),
            rights: 0,
            array_field_count: None,
        }
    }

    /// Database column name, `F<fieldId>`.
    pub fn column_name(&self) -> String {
        columns::field_column(self.field_id)
    }

    /// Declare an array-field range. Ignored unless this field is the first
    /// field of the range.
    pub fn set_array_field_range(&mut self, start_field_id: u32, count: u32) {
        if self.field_id == start_field_id {
            self.array_field_count = Some(count);
        }
    }

    pub fn array_field_count(&self) -> Option<u32> {
        self.array_field_count
    }
}
