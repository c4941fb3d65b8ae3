//! Runtime table binding.
//!
//! A binding is the per-table configuration that a statically typed mapper
//! would carry at compile time, resolved from live metadata instead. It is a
//! plain value: cheap to clone, safe to hold across requests, recomputed after
//! schema changes.

/// Primary key representation for parameter conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Int,
    Str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableBinding {
    /// Sanitized, whitelisted physical table name.
    pub table: String,
    pub primary_key: String,
    pub key_kind: KeyKind,
    pub auto_increment: bool,
    /// `created_at` and `updated_at` both present.
    pub has_timestamps: bool,
    /// `deleted_at` present; reads filter it, deletes set it.
    pub soft_delete: bool,
}

impl TableBinding {
    /// Qualified `table.column` reference for disambiguated selects.
    pub fn qualified(&self, column: &str) -> String {
        format!("{}.{}", self.table, column)
    }

    pub fn qualified_key(&self) -> String {
        self.qualified(&self.primary_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified() {
        let binding = TableBinding {
            table: "posts".into(),
            primary_key: "id".into(),
            key_kind: KeyKind::Int,
            auto_increment: true,
            has_timestamps: true,
            soft_delete: false,
        };

        assert_eq!(binding.qualified("title"), "posts.title");
        assert_eq!(binding.qualified_key(), "posts.id");
    }
}
