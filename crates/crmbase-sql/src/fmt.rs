use crate::context::StatementCreationContext;

use crmbase_core::stmt::Value;

macro_rules! fmt {
    ($f:expr, $( $fragments:expr )*) => {{
        #[allow(unused_imports)]
        use $crate::fmt::ToSql;
        $(
            $fragments.to_sql($f);
        )*
    }};
}

/// Destination for one compile pass: the SQL text under construction plus
/// the parameter accumulator.
pub(crate) struct Formatter<'a> {
    pub(crate) dst: &'a mut String,
    pub(crate) ctx: &'a mut StatementCreationContext,
}

pub(crate) trait ToSql {
    fn to_sql(self, f: &mut Formatter<'_>);
}

impl ToSql for &str {
    fn to_sql(self, f: &mut Formatter<'_>) {
        f.dst.push_str(self);
    }
}

impl ToSql for &String {
    fn to_sql(self, f: &mut Formatter<'_>) {
        f.dst.push_str(self);
    }
}

impl ToSql for u32 {
    fn to_sql(self, f: &mut Formatter<'_>) {
        use std::fmt::Write;
        write!(f.dst, "{self}").unwrap();
    }
}

impl ToSql for i32 {
    fn to_sql(self, f: &mut Formatter<'_>) {
        use std::fmt::Write;
        write!(f.dst, "{self}").unwrap();
    }
}

/// Values render as a positional placeholder and land in the parameter list.
impl ToSql for &Value {
    fn to_sql(self, f: &mut Formatter<'_>) {
        f.ctx.push_param(self.clone());
        f.dst.push('?');
    }
}

impl ToSql for Value {
    fn to_sql(self, f: &mut Formatter<'_>) {
        f.ctx.push_param(self);
        f.dst.push('?');
    }
}

/// Comma delimited
pub(crate) struct Comma<L>(pub(crate) L);

impl<L> ToSql for Comma<L>
where
    L: IntoIterator,
    L::Item: ToSql,
{
    fn to_sql(self, f: &mut Formatter<'_>) {
        let mut s = "";
        for i in self.0 {
            fmt!(f, s i);
            s = ", ";
        }
    }
}
