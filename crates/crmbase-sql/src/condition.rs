use crate::fmt::Formatter;

use crmbase_core::{schema::columns, stmt::Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl CompareOp {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Like => "LIKE",
        }
    }
}

/// A filter attached to one query tree node, contributing to the WHERE
/// clause of the statement the node is compiled into.
#[derive(Debug, Clone)]
pub enum Condition {
    FieldValue {
        field_id: u32,
        op: CompareOp,
        value: Value,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

impl Condition {
    pub fn field(field_id: u32, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::FieldValue {
            field_id,
            op,
            value: value.into(),
        }
    }

    pub(crate) fn add_to_where(&self, alias: &str, f: &mut Formatter<'_>) {
        match self {
            Self::FieldValue {
                field_id,
                op,
                value,
            } => {
                let column = columns::field_column(*field_id);
                // NULL never matches `=`/`<>`; emit the IS forms instead.
                if value.is_null() && matches!(op, CompareOp::Eq | CompareOp::Ne) {
                    let is = if *op == CompareOp::Eq {
                        " IS NULL"
                    } else {
                        " IS NOT NULL"
                    };
                    fmt!(f, alias "." column is);
                } else {
                    fmt!(f, alias "." column " " op.as_sql() " " value.clone());
                }
            }
            Self::And(operands) => Self::add_group(alias, f, operands, " AND "),
            Self::Or(operands) => Self::add_group(alias, f, operands, " OR "),
        }
    }

    fn add_group(alias: &str, f: &mut Formatter<'_>, operands: &[Condition], sep: &str) {
        fmt!(f, "(");
        let mut s = "";
        for operand in operands {
            fmt!(f, s);
            operand.add_to_where(alias, f);
            s = sep;
        }
        fmt!(f, ")");
    }
}

/// Filter by the existence of a related row without joining it into the
/// statement's FROM clause.
#[derive(Debug, Clone)]
pub struct ExistsCondition {
    pub target_info_area_id: String,
    pub link_id: Option<i32>,
    pub condition: Option<Condition>,
    pub negate: bool,
}

impl ExistsCondition {
    pub fn new(target_info_area_id: impl Into<String>, link_id: Option<i32>) -> Self {
        Self {
            target_info_area_id: target_info_area_id.into(),
            link_id,
            condition: None,
            negate: false,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }
}
