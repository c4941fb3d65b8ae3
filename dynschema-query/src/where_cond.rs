/// Operands are raw SQL text: column names, `?` placeholders, or literals
/// rendered through the `From` impls / [`sql_str`].
#[derive(Debug, Clone)]
pub enum Where {
    And(Box<Where>, Box<Where>),
    Or(Box<Where>, Box<Where>),
    Not(Box<Where>),
    Eq(Box<Where>, Box<Where>),
    Ne(Box<Where>, Box<Where>),
    Lt(Box<Where>, Box<Where>),
    Le(Box<Where>, Box<Where>),
    Gt(Box<Where>, Box<Where>),
    Ge(Box<Where>, Box<Where>),
    Between(Box<Where>, Box<Where>, Box<Where>),
    In(Box<Where>, Vec<Where>),
    Like(Box<Where>, Box<Where>),
    IsNull(Box<Where>),
    Value(String),
}

impl From<&str> for Where {
    fn from(v: &str) -> Self {
        Self::Value(v.to_string())
    }
}

impl From<String> for Where {
    fn from(v: String) -> Self {
        Self::Value(v)
    }
}

macro_rules! impl_where_from_number {
    ($ty:ty) => {
        impl From<$ty> for Where {
            fn from(v: $ty) -> Self {
                Self::Value(v.to_string())
            }
        }
    };
}

impl_where_from_number! {u8}
impl_where_from_number! {i8}
impl_where_from_number! {u16}
impl_where_from_number! {i16}
impl_where_from_number! {u32}
impl_where_from_number! {i32}
impl_where_from_number! {u64}
impl_where_from_number! {i64}
impl_where_from_number! {f32}
impl_where_from_number! {f64}

/// Render a trusted string literal operand with quote doubling. Anything
/// user-supplied belongs in a bound `?` placeholder instead.
pub fn sql_str(s: &str) -> Where {
    Where::Value(format!("'{}'", s.replace('\'', "''")))
}

impl std::fmt::Display for Where {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self {
            Self::And(l, r) => write!(f, "({} AND {})", l, r),
            Self::Or(l, r) => write!(f, "({} OR {})", l, r),
            Self::Not(v) => write!(f, "(NOT {})", v),
            Self::Eq(l, r) => write!(f, "({} = {})", l, r),
            Self::Ne(l, r) => write!(f, "({} <> {})", l, r),
            Self::Lt(l, r) => write!(f, "({} < {})", l, r),
            Self::Le(l, r) => write!(f, "({} <= {})", l, r),
            Self::Gt(l, r) => write!(f, "({} > {})", l, r),
            Self::Ge(l, r) => write!(f, "({} >= {})", l, r),
            Self::Between(var, l, r) => write!(f, "({} BETWEEN {} AND {})", var, l, r),
            Self::In(var, list) => write!(
                f,
                "({} IN ({}))",
                var,
                list.iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<String>>()
                    .join(", ")
            ),
            Self::Like(var, lik) => write!(f, "({} LIKE {})", var, lik),
            Self::IsNull(var) => write!(f, "({} IS NULL)", var),
            Self::Value(v) => write!(f, "{}", v),
        }
    }
}

#[macro_export]
macro_rules! literal {
    ($lit:expr) => {
        $crate::Where::from($lit)
    };
}

#[macro_export]
macro_rules! and {
    ($left:expr, $right:expr) => {
        $crate::Where::And(
            Box::new($crate::literal!($left)),
            Box::new($crate::literal!($right)),
        )
    };
}

#[macro_export]
macro_rules! or {
    ($left:expr, $right:expr) => {
        $crate::Where::Or(
            Box::new($crate::literal!($left)),
            Box::new($crate::literal!($right)),
        )
    };
}

#[macro_export]
macro_rules! not {
    ($expr:expr) => {
        $crate::Where::Not(Box::new($crate::literal!($expr)))
    };
}

#[macro_export]
macro_rules! eq {
    ($left:expr, $right:expr) => {
        $crate::Where::Eq(
            Box::new($crate::literal!($left)),
            Box::new($crate::literal!($right)),
        )
    };
}

#[macro_export]
macro_rules! ne {
    ($left:expr, $right:expr) => {
        $crate::Where::Ne(
            Box::new($crate::literal!($left)),
            Box::new($crate::literal!($right)),
        )
    };
}

#[macro_export]
macro_rules! lt {
    ($left:expr, $right:expr) => {
        $crate::Where::Lt(
            Box::new($crate::literal!($left)),
            Box::new($crate::literal!($right)),
        )
    };
}

#[macro_export]
macro_rules! le {
    ($left:expr, $right:expr) => {
        $crate::Where::Le(
            Box::new($crate::literal!($left)),
            Box::new($crate::literal!($right)),
        )
    };
}

#[macro_export]
macro_rules! gt {
    ($left:expr, $right:expr) => {
        $crate::Where::Gt(
            Box::new($crate::literal!($left)),
            Box::new($crate::literal!($right)),
        )
    };
}

#[macro_export]
macro_rules! ge {
    ($left:expr, $right:expr) => {
        $crate::Where::Ge(
            Box::new($crate::literal!($left)),
            Box::new($crate::literal!($right)),
        )
    };
}

#[macro_export]
macro_rules! like {
    ($left:expr, $right:expr) => {
        $crate::Where::Like(
            Box::new($crate::literal!($left)),
            Box::new($crate::literal!($right)),
        )
    };
}

#[macro_export]
macro_rules! is_null {
    ($expr:expr) => {
        $crate::Where::IsNull(Box::new($crate::literal!($expr)))
    };
}
