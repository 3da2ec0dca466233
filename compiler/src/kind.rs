use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;
use crate::types::Field;
use crate::utils::quote;

/// Pattern value meaning "emit no statement for this field".
pub const SKIP: &str = "skip";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Each field produces a statement writing into the output value.
    Value,
    /// Each field produces a boolean folded by the kind's reducer.
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    /// `&&`: exits `false` on the first false comparison.
    And,
    /// `||`: exits `true` on the first true comparison.
    Or,
}

impl Reducer {
    /// Value returned when no comparison short-circuits.
    pub fn neutral(self) -> bool {
        matches!(self, Reducer::And)
    }

    pub fn operator(self) -> &'static str {
        match self {
            Reducer::And => "&&",
            Reducer::Or => "||",
        }
    }
}

/// Constant description of a field expression kind.
#[derive(Debug)]
pub struct KindSpec {
    pub name:              &'static str,
    pub arity:             usize,
    pub shape:             Shape,
    pub reducer:           Option<Reducer>,
    pub default_pattern:   &'static str,
    /// Token naming the left (destination) operand.
    pub left:              &'static str,
    /// Token naming the right (source) operand of binary kinds.
    pub right:             Option<&'static str>,
    pub default_signature: &'static str,
    pub function_comment:  &'static str,
    pub field_comment:     &'static str,
    pub skip_comment:      &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldExpressionKind {
    Converter,
    Comparer,
    Copier,
    Orderer,
    Zeroer,
    Truther,
}

static CONVERTER: KindSpec = KindSpec {
    name:              "converter",
    arity:             2,
    shape:             Shape::Value,
    reducer:           None,
    default_pattern:   "$dest.$ = $src.$",
    left:              "dest",
    right:             Some("src"),
    default_signature: "$FromTo$To($from $From) $To",
    function_comment:  "$ converts $src into a new $To.",
    field_comment:     "$dest.$ is converted from $src.$.",
    skip_comment:      "$dest.$ is left at its zero value.",
};

static COMPARER: KindSpec = KindSpec {
    name:              "comparer",
    arity:             2,
    shape:             Shape::Bool,
    reducer:           Some(Reducer::And),
    default_pattern:   "$a.$ == $b.$",
    left:              "a",
    right:             Some("b"),
    default_signature: "Equal$To($a, $b $To) bool",
    function_comment:  "$ reports whether $a and $b hold equal values.",
    field_comment:     "$a.$ is compared with $b.$.",
    skip_comment:      "$a.$ is not compared.",
};

static COPIER: KindSpec = KindSpec {
    name:              "copier",
    arity:             2,
    shape:             Shape::Value,
    reducer:           None,
    default_pattern:   "$dest.$ = $src.$",
    left:              "dest",
    right:             Some("src"),
    default_signature: "Copy$To($src $From) $To",
    function_comment:  "$ returns a copy of $src.",
    field_comment:     "$dest.$ is copied from $src.$.",
    skip_comment:      "$dest.$ is not copied.",
};

static ORDERER: KindSpec = KindSpec {
    name:              "orderer",
    arity:             2,
    shape:             Shape::Bool,
    reducer:           Some(Reducer::Or),
    default_pattern:   "$a.$ < $b.$",
    left:              "a",
    right:             Some("b"),
    default_signature: "Less$To($a, $b $To) bool",
    function_comment:  "$ reports whether $a sorts before $b.",
    field_comment:     "$a.$ is ordered against $b.$.",
    skip_comment:      "$a.$ does not take part in the order.",
};

static ZEROER: KindSpec = KindSpec {
    name:              "zeroer",
    arity:             1,
    shape:             Shape::Value,
    reducer:           None,
    default_pattern:   SKIP,
    left:              "self",
    right:             None,
    default_signature: "New$Self() $Self",
    function_comment:  "$ returns a $Self with every field at its default.",
    field_comment:     "$this is set to its default.",
    skip_comment:      "$this is left at its zero value.",
};

static TRUTHER: KindSpec = KindSpec {
    name:              "truther",
    arity:             1,
    shape:             Shape::Bool,
    reducer:           Some(Reducer::Or),
    default_pattern:   "$this != *new($this.$type)",
    left:              "self",
    right:             None,
    default_signature: "IsSet$Self($self $Self) bool",
    function_comment:  "$ reports whether any field of $self is set.",
    field_comment:     "$this is checked against its zero value.",
    skip_comment:      "$this is not checked.",
};

impl FieldExpressionKind {
    pub const ALL: [FieldExpressionKind; 6] = [
        FieldExpressionKind::Converter,
        FieldExpressionKind::Comparer,
        FieldExpressionKind::Copier,
        FieldExpressionKind::Orderer,
        FieldExpressionKind::Zeroer,
        FieldExpressionKind::Truther,
    ];

    pub fn spec(self) -> &'static KindSpec {
        match self {
            FieldExpressionKind::Converter => &CONVERTER,
            FieldExpressionKind::Comparer => &COMPARER,
            FieldExpressionKind::Copier => &COPIER,
            FieldExpressionKind::Orderer => &ORDERER,
            FieldExpressionKind::Zeroer => &ZEROER,
            FieldExpressionKind::Truther => &TRUTHER,
        }
    }

    pub fn is_binary(self) -> bool {
        self.spec().arity == 2
    }

    /// The field's own pattern for this kind; empty when unset.
    pub fn pattern(self, field: &Field) -> &str {
        let exprs = &field.exprs;
        match self {
            FieldExpressionKind::Converter => &exprs.converter,
            FieldExpressionKind::Comparer => &exprs.comparer,
            FieldExpressionKind::Copier => &exprs.copier,
            FieldExpressionKind::Orderer => &exprs.orderer,
            FieldExpressionKind::Zeroer => &exprs.zeroer,
            FieldExpressionKind::Truther => &exprs.truther,
        }
    }

    pub fn set_pattern(self, field: &mut Field, pattern: &str) {
        let exprs = &mut field.exprs;
        let slot = match self {
            FieldExpressionKind::Converter => &mut exprs.converter,
            FieldExpressionKind::Comparer => &mut exprs.comparer,
            FieldExpressionKind::Copier => &mut exprs.copier,
            FieldExpressionKind::Orderer => &mut exprs.orderer,
            FieldExpressionKind::Zeroer => &mut exprs.zeroer,
            FieldExpressionKind::Truther => &mut exprs.truther,
        };
        *slot = pattern.to_string();
    }

    /// The field's pattern, or the kind default when the slot is empty.
    pub fn effective_pattern(self, field: &Field) -> &str {
        let own = self.pattern(field);
        if own.trim().is_empty() {
            self.spec().default_pattern
        } else {
            own
        }
    }
}

impl fmt::Display for FieldExpressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec().name)
    }
}

impl FromStr for FieldExpressionKind {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let kind = match lower.as_str() {
            "iszero" => Some(FieldExpressionKind::Truther),
            other => FieldExpressionKind::ALL.into_iter().find(|k| k.spec().name == other),
        };
        kind.ok_or_else(|| ConvertError::VerifierError(format!("Unknown field expression kind {}", quote(s))))
    }
}
