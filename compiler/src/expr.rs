//! Per-field pattern resolution.
//!
//! Each field expression kind binds a small set of tokens (`dest`/`src`,
//! `a`/`b`, `self`/`this`) to the variables of the function being
//! synthesized. The scopes below implement those bindings on top of the
//! token replacer.

use crate::{
    error::{ConvertError, ResultExt},
    kind::{FieldExpressionKind, SKIP},
    replacer::{replace, Chain, Head, Resolve, TokenRef},
    types::{Field, Struct},
    utils::untitle,
};

/// A variable of the synthesized function bound to a record.
#[derive(Debug, Clone)]
pub struct Operand<'a> {
    pub token:  &'static str,
    pub var:    String,
    pub type_:  String,
    pub record: &'a Struct,
}

/// The resolved statement and comment for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldExpression {
    pub field:   String,
    pub index:   usize,
    pub expr:    String,
    pub comment: String,
    pub skip:    bool,
}

/// Tokens of binary kinds inside a function body.
pub struct BinaryScope<'s, 'a> {
    pub left:     &'s Operand<'a>,
    pub right:    &'s Operand<'a>,
    pub field:    Option<&'s Field>,
    pub function: &'s str,
}

impl<'s, 'a> BinaryScope<'s, 'a> {
    fn operand(&self, token: &TokenRef) -> Option<(&'s Operand<'a>, bool)> {
        match &token.head {
            Head::Index(0) => Some((self.left, true)),
            Head::Index(1) => Some((self.right, false)),
            Head::Name(n) if n == self.left.token => Some((self.left, true)),
            Head::Name(n) if n == self.right.token => Some((self.right, false)),
            _ => None,
        }
    }

    /// Name of the current field on the right operand. Derived fields
    /// follow their origin when the right record has a field by that name.
    fn right_field_name(&self) -> Option<String> {
        let field = self.field?;
        match &field.origin {
            Some(origin) if self.right.record.field(origin).is_some() => Some(origin.clone()),
            _ => Some(field.name.clone()),
        }
    }

    fn current_field(&self, left: bool) -> Option<(String, String)> {
        if left {
            self.field.map(|f| (f.name.clone(), f.type_.clone()))
        } else {
            let name = self.right_field_name()?;
            let type_ = self.right.record.field(&name).map(|f| f.type_.clone())?;
            Some((name, type_))
        }
    }
}

impl Resolve for BinaryScope<'_, '_> {
    fn single(&self) -> Option<String> {
        Some(self.function.to_string())
    }

    fn by_index(&self, index: usize) -> Option<String> {
        match index {
            0 => Some(self.left.var.clone()),
            1 => Some(self.right.var.clone()),
            _ => None,
        }
    }

    fn by_name(&self, name: &str) -> Option<String> {
        if name == self.left.token {
            Some(self.left.var.clone())
        } else if name == self.right.token {
            Some(self.right.var.clone())
        } else {
            None
        }
    }

    fn field_by_name(&self, name: &str, field: &str) -> Option<String> {
        let operand = [self.left, self.right].into_iter().find(|o| o.token == name)?;
        operand.record.field(field)?;
        Some(format!("{}.{}", operand.var, field))
    }

    fn modifier(&self, token: &TokenRef, value: &str, keyword: &str) -> Option<String> {
        if token.item.is_some() {
            return None;
        }
        let (operand, left) = self.operand(token)?;
        let applied: Vec<&str> = token.modifiers.iter().map(String::as_str).collect();
        match (keyword, applied.as_slice(), &token.field) {
            ("", [], None) => {
                let name = if left { self.field?.name.clone() } else { self.right_field_name()? };
                Some(format!("{}.{}", value, name))
            }
            ("type", [], Some(field)) => operand.record.field(field).map(|f| f.type_.clone()),
            ("type", [], None) => Some(operand.type_.clone()),
            ("type", [""], None) => self.current_field(left).map(|(_, type_)| type_),
            _ => None,
        }
    }
}

/// Tokens of unary kinds inside a function body: `self` and `this`.
pub struct UnaryScope<'s, 'a> {
    pub operand:  &'s Operand<'a>,
    pub field:    Option<&'s Field>,
    pub function: &'s str,
}

const THIS: &str = "this";

impl Resolve for UnaryScope<'_, '_> {
    fn single(&self) -> Option<String> {
        Some(self.function.to_string())
    }

    fn by_index(&self, index: usize) -> Option<String> {
        (index == 0).then(|| self.operand.var.clone())
    }

    fn by_name(&self, name: &str) -> Option<String> {
        if name == self.operand.token {
            Some(self.operand.var.clone())
        } else if name == THIS {
            self.field.map(|f| format!("{}.{}", self.operand.var, f.name))
        } else {
            None
        }
    }

    fn field_by_name(&self, name: &str, field: &str) -> Option<String> {
        if name != self.operand.token {
            return None;
        }
        self.operand.record.field(field)?;
        Some(format!("{}.{}", self.operand.var, field))
    }

    fn modifier(&self, token: &TokenRef, value: &str, keyword: &str) -> Option<String> {
        if token.item.is_some() {
            return None;
        }
        let is_self = matches!(token.head, Head::Index(0))
            || token.name() == Some(self.operand.token);
        let is_this = token.name() == Some(THIS);
        let applied: Vec<&str> = token.modifiers.iter().map(String::as_str).collect();

        match (keyword, applied.as_slice(), &token.field) {
            ("", [], None) if is_self => self.field.map(|f| format!("{}.{}", value, f.name)),
            ("type", [], Some(field)) if is_self => {
                self.operand.record.field(field).map(|f| f.type_.clone())
            }
            ("type", [], None) if is_self => Some(self.operand.type_.clone()),
            ("type", [""], None) if is_self => self.field.map(|f| f.type_.clone()),
            ("type", [], None) if is_this => self.field.map(|f| f.type_.clone()),
            _ => None,
        }
    }
}

/// Tokens available while rewriting a signature template, before any
/// variable exists: record names and literal operand tokens.
pub struct SignatureScope<'a> {
    pub kind:  FieldExpressionKind,
    pub left:  &'a Struct,
    pub right: Option<&'a Struct>,
}

impl<'a> SignatureScope<'a> {
    fn record(&self, token: &TokenRef) -> Option<&'a Struct> {
        let spec = self.kind.spec();
        match &token.head {
            Head::Index(0) => Some(self.left),
            Head::Index(1) => self.right,
            Head::Name(n) if matches!(n.as_str(), "To" | "to" | "Self") || n == spec.left => Some(self.left),
            Head::Name(n) if matches!(n.as_str(), "From" | "from") || Some(n.as_str()) == spec.right => {
                self.right
            }
            _ => None,
        }
    }
}

impl Resolve for SignatureScope<'_> {
    fn by_index(&self, index: usize) -> Option<String> {
        match index {
            0 => Some(self.left.name.clone()),
            1 => self.right.map(|r| r.name.clone()),
            _ => None,
        }
    }

    fn by_name(&self, name: &str) -> Option<String> {
        let spec = self.kind.spec();
        match name {
            "To" | "Self" => Some(self.left.name.clone()),
            "to" => Some(untitle(&self.left.name)),
            "From" => self.right.map(|r| r.name.clone()),
            "from" => self.right.map(|r| untitle(&r.name)),
            n if n == spec.left || Some(n) == spec.right => Some(n.to_string()),
            _ => None,
        }
    }

    fn modifier(&self, token: &TokenRef, _value: &str, keyword: &str) -> Option<String> {
        if keyword != "type" || !token.modifiers.is_empty() || token.item.is_some() {
            return None;
        }
        self.record(token).map(Struct::type_expr)
    }
}

fn resolve_field<R: Resolve>(
    kind: FieldExpressionKind,
    index: usize,
    field: &Field,
    scope: &R,
) -> Result<FieldExpression, ConvertError> {
    let spec = kind.spec();
    let expr = replace(kind.effective_pattern(field), scope)?;
    let skip = expr.trim() == SKIP;
    let template = if skip { spec.skip_comment } else { spec.field_comment };
    let comment = replace(template, scope)?;
    Ok(FieldExpression { field: field.name.clone(), index, expr, comment, skip })
}

/// Resolves every field of the left record, in declaration order.
pub fn resolve_binary_fields(
    kind: FieldExpressionKind,
    left: &Operand<'_>,
    right: &Operand<'_>,
    function: &str,
) -> Result<Vec<FieldExpression>, ConvertError> {
    left.record
        .fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let scope = BinaryScope { left, right, field: Some(field), function };
            resolve_field(kind, index, field, &scope)
                .context(|| format!("resolving {} for field {}", kind, field.name))
        })
        .collect()
}

pub fn resolve_unary_fields(
    kind: FieldExpressionKind,
    operand: &Operand<'_>,
    function: &str,
) -> Result<Vec<FieldExpression>, ConvertError> {
    operand
        .record
        .fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let scope = UnaryScope { operand, field: Some(field), function };
            resolve_field(kind, index, field, &scope)
                .context(|| format!("resolving {} for field {}", kind, field.name))
        })
        .collect()
}

/// Resolves the kind's top-level function comment.
pub fn resolve_function_comment(
    kind: FieldExpressionKind,
    body: &impl Resolve,
    signature: &SignatureScope<'_>,
) -> Result<String, ConvertError> {
    replace(kind.spec().function_comment, &Chain(body, signature))
        .context(|| format!("resolving {} function comment", kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apple() -> Struct {
        Struct::new(
            "Apple",
            vec![Field::new("Picked", "time.Time"), Field::new("Weight", "Grams")],
        )
    }

    #[test]
    fn test_binary_scope_tokens() {
        let a = apple();
        let left = Operand { token: "a", var: "x".into(), type_: "Apple".into(), record: &a };
        let right = Operand { token: "b", var: "y".into(), type_: "*Apple".into(), record: &a };
        let scope = BinaryScope { left: &left, right: &right, field: Some(&a.fields[1]), function: "Eq" };

        let cases = [
            ("$a.$ == $b.$", "x.Weight == y.Weight"),
            ("$0 $1", "x y"),
            ("$b.$type", "*Apple"),
            ("$a.$.$type", "Grams"),
            ("$b.Picked.$type", "time.Time"),
            ("$a.Picked.Before($b.Picked)", "x.Picked.Before(y.Picked)"),
            ("$ $a.$title", "Eq X"),
        ];
        for (template, expected) in cases {
            assert_eq!(replace(template, &scope).unwrap(), expected, "{}", template);
        }
        assert!(replace("$dest.$", &scope).is_err());
    }

    #[test]
    fn test_right_field_follows_origin_across_records() {
        let a = apple();
        let mut orange = Struct::new("Orange", vec![Field::new("PickedAt", "int64")]);
        orange.fields[0].origin = Some("Picked".into());

        let left = Operand { token: "dest", var: "orange".into(), type_: "Orange".into(), record: &orange };
        let right = Operand { token: "src", var: "apple".into(), type_: "Apple".into(), record: &a };
        let fields = resolve_binary_fields(FieldExpressionKind::Converter, &left, &right, "AppleToOrange").unwrap();
        assert_eq!(fields[0].expr, "orange.PickedAt = apple.Picked");
        assert_eq!(fields[0].comment, "orange.PickedAt is converted from apple.Picked.");
        assert!(!fields[0].skip);
    }

    #[test]
    fn test_right_field_follows_origin_within_one_record_name() {
        let a = apple();
        let mut renamed = apple();
        renamed.fields[1].name = "Mass".into();
        renamed.fields[1].origin = Some("Weight".into());
        renamed.fields[0].origin = Some("Gone".into());

        let left = Operand { token: "dest", var: "out".into(), type_: "Apple".into(), record: &renamed };
        let right = Operand { token: "src", var: "src".into(), type_: "Apple".into(), record: &a };
        let fields = resolve_binary_fields(FieldExpressionKind::Converter, &left, &right, "Copy").unwrap();
        assert_eq!(fields[0].expr, "out.Picked = src.Picked");
        assert_eq!(fields[1].expr, "out.Mass = src.Weight");
    }

    #[test]
    fn test_unary_scope_and_skip() {
        let mut a = apple();
        FieldExpressionKind::Zeroer.set_pattern(&mut a.fields[1], "$this = 100");
        let operand = Operand { token: "self", var: "apple".into(), type_: "Apple".into(), record: &a };
        let fields = resolve_unary_fields(FieldExpressionKind::Zeroer, &operand, "NewApple").unwrap();
        assert!(fields[0].skip);
        assert_eq!(fields[0].comment, "apple.Picked is left at its zero value.");
        assert_eq!(fields[1].expr, "apple.Weight = 100");

        let truth = resolve_unary_fields(FieldExpressionKind::Truther, &operand, "IsSetApple").unwrap();
        assert_eq!(truth[0].expr, "apple.Picked != *new(time.Time)");
    }

    #[test]
    fn test_signature_scope() {
        let a = apple();
        let orange = Struct::new("Orange", vec![]);
        let scope = SignatureScope { kind: FieldExpressionKind::Converter, left: &orange, right: Some(&a) };
        assert_eq!(
            replace("$FromTo$To($from $From) $To", &scope).unwrap(),
            "AppleToOrange(apple Apple) Orange"
        );
        assert_eq!(replace("F($src $1.$type) $dest.$type", &scope).unwrap(), "F(src Apple) Orange");
    }

    #[test]
    fn test_unresolved_pattern_reports_field() {
        let mut a = apple();
        FieldExpressionKind::Comparer.set_pattern(&mut a.fields[0], "$a.$ == $c.$");
        let left = Operand { token: "a", var: "x".into(), type_: "Apple".into(), record: &a };
        let right = Operand { token: "b", var: "y".into(), type_: "Apple".into(), record: &a };
        let err = resolve_binary_fields(FieldExpressionKind::Comparer, &left, &right, "Eq").unwrap_err();
        assert!(err.to_string().starts_with("resolving comparer for field Picked: "));
        assert!(matches!(err.root(), ConvertError::UnresolvedToken { token, .. } if token == "$c"));
    }
}
