//! Form and validation inference.
//!
//! Derives an ordered field-descriptor list and a parallel rule set from live
//! column metadata. `*_id` columns become searchable remote selects against
//! the referenced table; a declared FK constraint wins over the naming
//! heuristic, and the heuristic degrades gracefully when the guessed table is
//! not manageable.

use std::collections::HashMap;

use crate::{
    conn::Value,
    error::Result,
    ident::pluralize,
    meta::SchemaMetadata,
    query::{eq, like, QueryBuilder},
    types::{ColumnKind, ColumnMeta},
};

pub const DEFAULT_SEARCH_LIMIT: u64 = 20;

const HIDDEN_COLUMNS: &[&str] = &["created_at", "updated_at", "deleted_at"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetKind {
    TextInput,
    TextArea,
    NumberInput,
    Toggle,
    DatePicker,
    DateTimePicker,
    KeyValue,
    Select,
    MultiSelect,
    RemoteSelect,
}

/// Resolved foreign-key target for a remote-select field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationTarget {
    pub table: String,
    pub column: String,
    /// Constraint-backed, as opposed to guessed from the column name.
    pub declared: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: ColumnKind,
    pub widget: WidgetKind,
    pub required: bool,
    pub read_only: bool,
    pub max_length: Option<u32>,
    pub options: Vec<String>,
    pub relation: Option<RelationTarget>,
}

pub struct FormBuilder {
    meta: SchemaMetadata,
    search_limit: u64,
}

impl FormBuilder {
    pub fn new(meta: SchemaMetadata) -> Self {
        Self {
            meta,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn search_limit(mut self, limit: u64) -> Self {
        self.search_limit = limit;
        self
    }

    /// Ordered field descriptors for a create/edit/view form.
    ///
    /// Timestamp and soft-delete columns never appear. On create an
    /// auto-increment primary key is omitted; on edit it is present but
    /// read-only. `for_view` renders everything read-only.
    pub async fn build_form(
        &self,
        table: &str,
        is_edit: bool,
        for_view: bool,
    ) -> Vec<FieldDescriptor> {
        let Some(table) = self.meta.whitelist().sanitize_table(Some(table)).await else {
            return vec![];
        };

        let pk = self.meta.primary_key(&table).await;
        let pk_auto = self.meta.is_primary_auto_increment(&table).await;

        let mut fields = Vec::<FieldDescriptor>::new();
        for col in self.meta.columns(&table).await {
            if HIDDEN_COLUMNS.contains(&col.name.as_str()) {
                continue;
            }

            let is_pk = col.name == pk;
            if is_pk && pk_auto && !is_edit && !for_view {
                continue;
            }

            let relation = if is_pk {
                None
            } else {
                self.relation_target(&table, &col.name).await
            };

            let widget = match &relation {
                Some(_) => WidgetKind::RemoteSelect,
                None => widget_for(&col),
            };

            fields.push(FieldDescriptor {
                name: col.name.clone(),
                kind: col.kind,
                required: !col.nullable && col.default.is_none() && !is_pk,
                read_only: for_view || (is_edit && is_pk),
                max_length: col.length,
                options: col.options,
                relation,
                widget,
            });
        }

        fields
    }

    /// Validation rules keyed by field, mirroring [`build_form`]'s field set.
    /// Read-only fields carry no rules.
    pub async fn build_rules(&self, table: &str, is_edit: bool) -> HashMap<String, Vec<String>> {
        let fields = self.build_form(table, is_edit, false).await;
        let mut rules = HashMap::new();

        for field in fields {
            if field.read_only {
                continue;
            }

            let mut list = vec![if field.required {
                "required".to_string()
            } else {
                "nullable".to_string()
            }];

            match field.widget {
                WidgetKind::NumberInput => {
                    if field.kind == ColumnKind::Decimal {
                        list.push("numeric".into());
                    } else {
                        list.push("integer".into());
                    }
                }
                WidgetKind::Toggle => list.push("boolean".into()),
                WidgetKind::DatePicker | WidgetKind::DateTimePicker => list.push("date".into()),
                WidgetKind::KeyValue => list.push("array".into()),
                WidgetKind::Select | WidgetKind::MultiSelect => {
                    list.push("string".into());
                    if !field.options.is_empty() {
                        list.push(format!("in:{}", field.options.join(",")));
                    }
                }
                WidgetKind::RemoteSelect => {
                    if field.kind.is_integer_family() {
                        list.push("integer".into());
                    }
                    if let Some(relation) = &field.relation {
                        if relation.declared {
                            list.push(format!("exists:{},{}", relation.table, relation.column));
                        }
                    }
                }
                WidgetKind::TextInput | WidgetKind::TextArea => {
                    list.push("string".into());
                    if let Some(max) = field.max_length {
                        list.push(format!("max:{}", max));
                    }
                }
            }

            rules.insert(field.name, list);
        }

        rules
    }

    /// Validate submitted values against the derived rules. Returns
    /// field-keyed error messages; empty when everything passes.
    pub async fn validate(
        &self,
        table: &str,
        is_edit: bool,
        values: &HashMap<String, Value>,
    ) -> Result<HashMap<String, Vec<String>>> {
        let rules = self.build_rules(table, is_edit).await;
        let mut errors = HashMap::<String, Vec<String>>::new();

        for (field, list) in rules {
            let value = values.get(&field);
            let missing = value.map(|v| v.is_null()).unwrap_or(true);

            for rule in list {
                let problem = match rule.as_str() {
                    "required" if missing => Some("is required".to_string()),
                    _ if missing => None,
                    "integer" => check_integer(value),
                    "numeric" => check_numeric(value),
                    "boolean" => check_boolean(value),
                    "date" => check_date(value),
                    "array" => check_json(value),
                    _ if rule.starts_with("max:") => check_max(&rule, value),
                    _ if rule.starts_with("in:") => check_in(&rule, value),
                    _ if rule.starts_with("exists:") => {
                        self.check_exists(&rule, value).await?
                    }
                    _ => None,
                };

                if let Some(problem) = problem {
                    errors.entry(field.clone()).or_default().push(problem);
                }
            }
        }

        Ok(errors)
    }

    /// Bounded remote-select search: LIKE over the referenced table's search
    /// column, yielding `(key, label)` pairs.
    pub async fn search_related(
        &self,
        table: &str,
        column: &str,
        term: &str,
    ) -> Result<Vec<(Value, String)>> {
        let Some(relation) = self.relation_target(table, column).await else {
            return Ok(vec![]);
        };

        let search = self.meta.best_search_column(&relation.table).await;
        let pattern = format!("%{}%", term);

        let sql = QueryBuilder::select(&relation.table)
            .column("*")
            .where_cond(like!(search.as_str(), "?"))
            .order_by(&search, true)
            .limit(self.search_limit, 0)
            .build()?;

        let rows = self
            .meta
            .connection()
            .query_many(&sql, vec![Value::Str(pattern)])
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let map = row.into_map();
            let key = map.get(&relation.column).cloned().unwrap_or(Value::Null);
            let label = self.meta.compose_label(&relation.table, &map).await;
            out.push((key, label));
        }

        Ok(out)
    }

    /// Label for a single selected remote-select value.
    pub async fn resolve_label(
        &self,
        table: &str,
        column: &str,
        value: Value,
    ) -> Result<Option<String>> {
        let Some(relation) = self.relation_target(table, column).await else {
            return Ok(None);
        };

        let sql = QueryBuilder::select(&relation.table)
            .column("*")
            .where_cond(eq!(relation.column.as_str(), "?"))
            .build()?;

        let row = self
            .meta
            .connection()
            .query_one(&sql, vec![value])
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(
            self.meta.compose_label(&relation.table, &row.into_map()).await,
        ))
    }

    /// Resolve the FK target of a column. A declared constraint wins; else the
    /// `*_id` naming heuristic guesses `pluralize(stem)` with referenced
    /// column `id`, validated against the whitelist.
    async fn relation_target(&self, table: &str, column: &str) -> Option<RelationTarget> {
        if let Some(fk) = self.meta.foreign_keys(table).await.get(column) {
            return Some(RelationTarget {
                table: fk.referenced_table.clone(),
                column: fk.referenced_column.clone(),
                declared: true,
            });
        }

        let stem = column.strip_suffix("_id")?;
        if stem.is_empty() {
            return None;
        }

        let candidates = [pluralize(stem), stem.to_string()];
        for candidate in candidates {
            if let Some(table) = self
                .meta
                .whitelist()
                .sanitize_table(Some(&candidate))
                .await
            {
                return Some(RelationTarget {
                    table,
                    column: "id".to_string(),
                    declared: false,
                });
            }
        }

        None
    }

    async fn check_exists(&self, rule: &str, value: Option<&Value>) -> Result<Option<String>> {
        let Some(value) = value else {
            return Ok(None);
        };
        let spec = &rule["exists:".len()..];
        let Some((table, column)) = spec.split_once(',') else {
            return Ok(None);
        };
        let Some(table) = self.meta.whitelist().sanitize_table(Some(table)).await else {
            return Ok(None);
        };

        let sql = QueryBuilder::select(&table)
            .column(column)
            .where_cond(eq!(column, "?"))
            .limit(1, 0)
            .build()?;

        let row = self
            .meta
            .connection()
            .query_one(&sql, vec![value.clone()])
            .await?;

        Ok(match row {
            Some(_) => None,
            None => Some(format!("references a missing `{}` row", table)),
        })
    }
}

fn widget_for(col: &ColumnMeta) -> WidgetKind {
    match col.kind {
        ColumnKind::Text => WidgetKind::TextArea,
        ColumnKind::Integer | ColumnKind::BigInt | ColumnKind::Decimal => WidgetKind::NumberInput,
        ColumnKind::Boolean => WidgetKind::Toggle,
        ColumnKind::Date => WidgetKind::DatePicker,
        ColumnKind::DateTime => WidgetKind::DateTimePicker,
        ColumnKind::Json => WidgetKind::KeyValue,
        ColumnKind::Enum => WidgetKind::Select,
        ColumnKind::Set => WidgetKind::MultiSelect,
        ColumnKind::String | ColumnKind::Unknown => WidgetKind::TextInput,
    }
}

fn check_integer(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::U8(_)
        | Value::I8(_)
        | Value::U16(_)
        | Value::I16(_)
        | Value::U32(_)
        | Value::I32(_)
        | Value::U64(_)
        | Value::I64(_) => None,
        Value::Str(s) if s.parse::<i64>().is_ok() => None,
        _ => Some("must be an integer".to_string()),
    }
}

fn check_numeric(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::F32(_) | Value::F64(_) => None,
        Value::Str(s) if s.parse::<f64>().is_ok() => None,
        v => check_integer(Some(v)).map(|_| "must be numeric".to_string()),
    }
}

fn check_boolean(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Bool(_) => None,
        Value::U8(0) | Value::U8(1) | Value::I64(0) | Value::I64(1) => None,
        Value::Str(s) if matches!(s.as_str(), "0" | "1" | "true" | "false") => None,
        _ => Some("must be a boolean".to_string()),
    }
}

fn check_date(value: Option<&Value>) -> Option<String> {
    match value? {
        // `YYYY-MM-DD` prefix check, full parsing is the database's job
        Value::Str(s) if s.len() >= 10 && s.as_bytes()[4] == b'-' && s.as_bytes()[7] == b'-' => {
            None
        }
        _ => Some("must be a date".to_string()),
    }
}

fn check_json(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Str(s) if serde_json::from_str::<serde_json::Value>(s).is_ok() => None,
        _ => Some("must be a JSON document".to_string()),
    }
}

fn check_max(rule: &str, value: Option<&Value>) -> Option<String> {
    let max: usize = rule["max:".len()..].parse().ok()?;
    match value? {
        Value::Str(s) if s.chars().count() > max => {
            Some(format!("must be at most {} characters", max))
        }
        _ => None,
    }
}

fn check_in(rule: &str, value: Option<&Value>) -> Option<String> {
    let allowed = rule["in:".len()..].split(',').collect::<Vec<_>>();
    match value? {
        Value::Str(s) if allowed.contains(&s.as_str()) => None,
        Value::Str(_) => Some("is not one of the allowed values".to_string()),
        _ => None,
    }
}
