#![cfg(test)]

use brine_convgen_compiler::{
    builtin::{drop_fields, time_to_int64, RenameField, SetPattern},
    generate,
    mapper::compose,
    replacer::NoTokens,
    replace, Compose, Field, FieldExpressionKind, FieldMapper, Struct,
};
use proptest::prelude::*;

fn template_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,:;(){}\\[\\]+*/=<>!&|\\n\\t-]{0,40}"
}

fn quoted_body() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,()+*$-]{0,20}"
}

fn field_strategy() -> impl Strategy<Value = Field> {
    let names = prop::sample::select(vec!["Picked", "Weight", "Name", "Count", "Owner"]);
    let types = prop::sample::select(vec!["time.Time", "int64", "string", "Grams"]);
    (names, types).prop_map(|(name, type_)| Field::new(name, type_))
}

fn stage_strategy() -> impl Strategy<Value = u8> {
    0u8..4
}

fn stage(code: u8) -> Box<dyn FieldMapper + Send + Sync> {
    match code {
        0 => Box::new(time_to_int64()),
        1 => Box::new(RenameField::new("Weight", "Mass")),
        2 => Box::new(SetPattern::new(FieldExpressionKind::Comparer, None, "$a.$.Equal($b.$)")),
        _ => Box::new(drop_fields(&["Name"])),
    }
}

fn stages(codes: &[u8]) -> Compose {
    compose(codes.iter().map(|&code| stage(code)).collect())
}

type Summary = Vec<(String, String, Option<String>, String, String)>;

fn summary(fields: Vec<Field>) -> Summary {
    fields
        .into_iter()
        .map(|f| (f.name, f.type_, f.origin, f.exprs.converter, f.exprs.comparer))
        .collect()
}

/// Runs a generated comparer body against `values`, one per `_cmpN`.
/// Returns the result and the indexes evaluated before it was decided.
fn run_bool_body(body: &str, values: &[bool]) -> (bool, Vec<usize>) {
    let mut evaluated = Vec::new();
    let mut current = false;
    let mut lines = body.lines();
    while let Some(line) = lines.next() {
        if let Some(rest) = line.strip_prefix("_cmp") {
            let index: usize = rest.split(' ').next().and_then(|n| n.parse().ok()).expect("bad index");
            evaluated.push(index);
            current = values[index];
        } else if line.starts_with("if !_cmp") || line.starts_with("if _cmp") {
            let negated = line.starts_with("if !");
            let ret = lines.next().expect("missing return");
            lines.next();
            if current != negated {
                return (ret.trim() == "return true", evaluated);
            }
        } else if let Some(value) = line.strip_prefix("return ") {
            return (value == "true", evaluated);
        }
    }
    panic!("body never returned: {}", body);
}

proptest! {
    #[test]
    fn token_free_templates_are_unchanged(text in template_text()) {
        prop_assert_eq!(replace(&text, &NoTokens).unwrap(), text);
    }

    #[test]
    fn quoted_literals_are_never_scanned(
        before in template_text(),
        inner in quoted_body(),
        after in template_text(),
        quote in prop::sample::select(vec!['"', '\'', '`']),
    ) {
        let text = format!("{}{}{}{}{}", before, quote, inner, quote, after);
        prop_assert_eq!(replace(&text, &NoTokens).unwrap(), text);
    }

    #[test]
    fn comparer_short_circuits(values in prop::collection::vec(any::<bool>(), 0..8)) {
        let fields = (0..values.len()).map(|i| Field::new(&format!("F{}", i), "int")).collect();
        let record = Struct::new("Row", fields);
        let f = generate(FieldExpressionKind::Comparer, None, &[&record, &record]).unwrap();

        let (result, evaluated) = run_bool_body(&f.body, &values);
        prop_assert_eq!(result, values.iter().all(|v| *v));
        let stop = values.iter().position(|v| !*v).map_or(values.len(), |i| i + 1);
        prop_assert_eq!(evaluated, (0..stop).collect::<Vec<_>>());
    }

    #[test]
    fn orderer_short_circuits(values in prop::collection::vec(any::<bool>(), 0..8)) {
        let fields = (0..values.len()).map(|i| Field::new(&format!("F{}", i), "int")).collect();
        let record = Struct::new("Row", fields);
        let f = generate(FieldExpressionKind::Orderer, None, &[&record, &record]).unwrap();

        let (result, evaluated) = run_bool_body(&f.body, &values);
        prop_assert_eq!(result, values.iter().any(|v| *v));
        let stop = values.iter().position(|v| *v).map_or(values.len(), |i| i + 1);
        prop_assert_eq!(evaluated, (0..stop).collect::<Vec<_>>());
    }

    #[test]
    fn compose_is_associative(
        field in field_strategy(),
        a in prop::collection::vec(stage_strategy(), 0..3),
        b in prop::collection::vec(stage_strategy(), 0..3),
        c in prop::collection::vec(stage_strategy(), 0..3),
    ) {
        let flat: Vec<u8> = a.iter().chain(&b).chain(&c).copied().collect();
        let flat = summary(stages(&flat).apply(field.clone()));

        let left = Compose::new().then(Compose::new().then(stages(&a)).then(stages(&b))).then(stages(&c));
        let right = Compose::new().then(stages(&a)).then(Compose::new().then(stages(&b)).then(stages(&c)));

        prop_assert_eq!(&summary(left.apply(field.clone())), &flat);
        prop_assert_eq!(&summary(right.apply(field)), &flat);
    }

    #[test]
    fn composed_outputs_remember_their_origin(
        field in field_strategy(),
        codes in prop::collection::vec(stage_strategy(), 0..5),
    ) {
        for out in stages(&codes).apply(field.clone()) {
            prop_assert_eq!(out.origin.as_deref(), Some(field.name.as_str()));
        }
    }
}
