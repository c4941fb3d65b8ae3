//! Semantic column metadata derived from native catalog type strings.

/// Semantic column type, mapped from the engine's native type text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    String,
    Text,
    Integer,
    BigInt,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Json,
    Enum,
    Set,
    Unknown,
}

impl ColumnKind {
    pub fn is_integer_family(&self) -> bool {
        matches!(self, Self::Integer | Self::BigInt)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer_family() || matches!(self, Self::Decimal)
    }

    pub fn is_text_like(&self) -> bool {
        matches!(self, Self::String | Self::Text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    pub name: String,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub length: Option<u32>,
    pub default: Option<String>,
    /// Declared values for enum/set columns, empty otherwise
    pub options: Vec<String>,
}

/// Declared foreign key constraint. Only ever built from real catalog
/// constraints, never from naming conventions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyMeta {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// Map a native type string (`varchar(255)`, `bigint unsigned`,
/// `enum('a','b')`, ...) to semantic kind, declared length and enum options.
pub fn parse_native_type(native: &str) -> (ColumnKind, Option<u32>, Vec<String>) {
    let lower = native.trim().to_ascii_lowercase();

    if lower.starts_with("enum(") {
        return (ColumnKind::Enum, None, parse_quoted_options(native));
    }
    if lower.starts_with("set(") {
        return (ColumnKind::Set, None, parse_quoted_options(native));
    }
    // Mysql convention for booleans
    if lower.starts_with("tinyint(1)") || lower.starts_with("bool") {
        return (ColumnKind::Boolean, None, vec![]);
    }
    if lower.contains("bigint") {
        return (ColumnKind::BigInt, None, vec![]);
    }
    if lower.starts_with("int")
        || lower.starts_with("mediumint")
        || lower.starts_with("smallint")
        || lower.starts_with("tinyint")
    {
        return (ColumnKind::Integer, None, vec![]);
    }
    if lower.starts_with("decimal")
        || lower.starts_with("numeric")
        || lower.starts_with("float")
        || lower.starts_with("double")
        || lower.starts_with("real")
    {
        return (ColumnKind::Decimal, None, vec![]);
    }
    if lower.starts_with("datetime") || lower.starts_with("timestamp") {
        return (ColumnKind::DateTime, None, vec![]);
    }
    if lower.starts_with("date") {
        return (ColumnKind::Date, None, vec![]);
    }
    if lower.starts_with("json") {
        return (ColumnKind::Json, None, vec![]);
    }
    if lower.contains("text") || lower.contains("clob") {
        return (ColumnKind::Text, None, vec![]);
    }
    if lower.starts_with("varchar")
        || lower.starts_with("nvarchar")
        || lower.starts_with("char")
        || lower.starts_with("character")
    {
        return (ColumnKind::String, parse_declared_length(&lower), vec![]);
    }

    (ColumnKind::Unknown, None, vec![])
}

fn parse_declared_length(lower: &str) -> Option<u32> {
    let open = lower.find('(')?;
    let close = lower[open..].find(')')? + open;

    lower[open + 1..close].trim().parse().ok()
}

/// Parse the quoted comma-separated value list of an enum/set declaration,
/// e.g. `enum('a','b','it''s')`. Handles `''` and `\'` escapes. Empty when the
/// string carries no value list.
pub fn parse_quoted_options(native: &str) -> Vec<String> {
    let Some(open) = native.find('(') else {
        return vec![];
    };
    let Some(close) = native.rfind(')') else {
        return vec![];
    };
    if close <= open {
        return vec![];
    }

    let body = &native[open + 1..close];
    let mut options = Vec::<String>::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if !in_quotes {
            if c == '\'' {
                in_quotes = true;
                current.clear();
            }
            continue;
        }

        match c {
            '\'' => {
                // Doubled quote is an escaped quote inside the value
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    current.push('\'');
                } else {
                    in_quotes = false;
                    options.push(std::mem::take(&mut current));
                }
            }
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            _ => current.push(c),
        }
    }

    options
}
