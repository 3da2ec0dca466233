//! Ready-made field and struct mappers.

use tracing::trace;

use crate::{
    kind::FieldExpressionKind,
    mapper::{push_field_reverse, push_struct_reverse, FieldMapper, StructMapper},
    types::{Field, Struct},
};

/// Retypes fields of type `from` to `to`, setting the converter pattern to
/// `forward`. The reverse restores `from` and sets the pattern to `backward`.
#[derive(Debug, Clone)]
pub struct ConvertType {
    pub from:     String,
    pub to:       String,
    pub forward:  String,
    pub backward: String,
}

impl ConvertType {
    pub fn new(from: &str, to: &str, forward: &str, backward: &str) -> Self {
        ConvertType {
            from:     from.to_string(),
            to:       to.to_string(),
            forward:  forward.to_string(),
            backward: backward.to_string(),
        }
    }
}

impl FieldMapper for ConvertType {
    fn map(&self, mut field: Field) -> Vec<Field> {
        if field.type_ != self.from {
            return vec![field];
        }
        trace!(field = %field.name, from = %self.from, to = %self.to, "converting field type");
        field.type_ = self.to.clone();
        FieldExpressionKind::Converter.set_pattern(&mut field, &self.forward);

        let (from, backward) = (self.from.clone(), self.backward.clone());
        push_field_reverse(&mut field, move |mut f: Field| {
            f.type_ = from.clone();
            FieldExpressionKind::Converter.set_pattern(&mut f, &backward);
            vec![f]
        });
        vec![field]
    }
}

/// `time.Time` fields become Unix nanoseconds.
pub fn time_to_int64() -> ConvertType {
    ConvertType::new(
        "time.Time",
        "int64",
        "$dest.$ = $src.$.UnixNano()",
        "$dest.$ = time.Unix(0, $src.$).UTC()",
    )
}

#[derive(Debug, Clone)]
pub struct RenameField {
    pub from: String,
    pub to:   String,
}

impl RenameField {
    pub fn new(from: &str, to: &str) -> Self {
        RenameField { from: from.to_string(), to: to.to_string() }
    }
}

impl FieldMapper for RenameField {
    fn map(&self, mut field: Field) -> Vec<Field> {
        if field.name == self.from {
            field.name = self.to.clone();
            let from = self.from.clone();
            push_field_reverse(&mut field, move |mut f: Field| {
                f.name = from.clone();
                vec![f]
            });
        }
        vec![field]
    }
}

/// Keeps the fields matching the predicate. Dropped fields have nothing to
/// reverse.
pub struct Filter(Box<dyn Fn(&Field) -> bool + Send + Sync>);

impl Filter {
    pub fn new(keep: impl Fn(&Field) -> bool + Send + Sync + 'static) -> Self {
        Filter(Box::new(keep))
    }
}

impl FieldMapper for Filter {
    fn map(&self, field: Field) -> Vec<Field> {
        if (self.0)(&field) {
            vec![field]
        } else {
            trace!(field = %field.name, "field filtered out");
            Vec::new()
        }
    }
}

/// Drops fields by name. Dropping a name twice is the same as dropping it once.
pub fn drop_fields(names: &[&str]) -> Filter {
    let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
    Filter::new(move |f| !names.contains(&f.name))
}

/// Sets a kind's pattern on one field by name, or on every field.
#[derive(Debug, Clone)]
pub struct SetPattern {
    pub kind:    FieldExpressionKind,
    pub field:   Option<String>,
    pub pattern: String,
}

impl SetPattern {
    pub fn new(kind: FieldExpressionKind, field: Option<&str>, pattern: &str) -> Self {
        SetPattern { kind, field: field.map(String::from), pattern: pattern.to_string() }
    }
}

impl FieldMapper for SetPattern {
    fn map(&self, mut field: Field) -> Vec<Field> {
        if self.field.as_deref().map_or(true, |name| name == field.name) {
            self.kind.set_pattern(&mut field, &self.pattern);
        }
        vec![field]
    }
}

/// Invokes the reverse attached to `field`, or passes it through.
pub fn reverse_field(field: Field) -> Vec<Field> {
    match field.reverse.clone() {
        Some(reverse) => reverse.call(field),
        None => vec![field],
    }
}

#[derive(Debug, Clone)]
pub struct Rename(pub String);

impl Rename {
    pub fn new(name: &str) -> Self {
        Rename(name.to_string())
    }
}

impl StructMapper for Rename {
    fn map(&self, mut record: Struct) -> Struct {
        let old = std::mem::replace(&mut record.name, self.0.clone());
        trace!(from = %old, to = %record.name, "renaming struct");
        push_struct_reverse(&mut record, move |mut s: Struct| {
            s.name = old.clone();
            s
        });
        record
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StripComments;

impl StructMapper for StripComments {
    fn map(&self, mut record: Struct) -> Struct {
        record.comment.clear();
        for field in &mut record.fields {
            field.comment.clear();
        }
        record
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StripTags;

impl StructMapper for StripTags {
    fn map(&self, mut record: Struct) -> Struct {
        for field in &mut record.fields {
            field.tag.clear();
        }
        record
    }
}

/// Appends a field. The reverse removes it again.
#[derive(Debug, Clone)]
pub struct AddField(pub Field);

impl StructMapper for AddField {
    fn map(&self, mut record: Struct) -> Struct {
        record.fields.push(self.0.clone());
        let name = self.0.name.clone();
        push_struct_reverse(&mut record, move |mut s: Struct| {
            if let Some(i) = s.fields.iter().rposition(|f| f.name == name) {
                s.fields.remove(i);
            }
            s
        });
        record
    }
}

/// Removes fields by name. The reverse puts them back at their old positions.
#[derive(Debug, Clone)]
pub struct RemoveFields(pub Vec<String>);

impl RemoveFields {
    pub fn new(names: &[&str]) -> Self {
        RemoveFields(names.iter().map(|n| n.to_string()).collect())
    }
}

impl StructMapper for RemoveFields {
    fn map(&self, mut record: Struct) -> Struct {
        let mut removed = Vec::new();
        let mut kept = Vec::new();
        for (i, field) in std::mem::take(&mut record.fields).into_iter().enumerate() {
            if self.0.contains(&field.name) {
                removed.push((i, field));
            } else {
                kept.push(field);
            }
        }
        record.fields = kept;
        if removed.is_empty() {
            return record;
        }
        push_struct_reverse(&mut record, move |mut s: Struct| {
            for (i, field) in &removed {
                let at = (*i).min(s.fields.len());
                s.fields.insert(at, field.clone());
            }
            s
        });
        record
    }
}

/// Runs the struct's attached reverse, then reverses every field.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReverseStruct;

impl StructMapper for ReverseStruct {
    fn map(&self, record: Struct) -> Struct {
        let mut record = match record.reverse.clone() {
            Some(reverse) => reverse.call(record),
            None => record,
        };
        let fields = std::mem::take(&mut record.fields);
        record.fields = fields.into_iter().flat_map(|f| reverse_field.apply(f)).collect();
        record
    }
}
