#![cfg(test)]

use brine_convgen_compiler::{
    builtin::{reverse_field, time_to_int64, Rename, RenameField, ReverseStruct, SetPattern},
    curry, derive, format_wrapped, generate, parse_signature, Compose, Field, FieldExpressionKind,
    FieldMapper, Function, MapFields, Pipeline, Struct, StructMapper,
};

fn apple() -> Struct {
    Struct::new(
        "Apple",
        vec![
            Field::new("Picked", "time.Time"),
            Field::new("LastEaten", "time.Time"),
            Field::new("Weight", "Grams"),
        ],
    )
}

fn orange() -> Struct {
    let pipeline = Pipeline::new().then(MapFields(time_to_int64())).then(Rename::new("Orange"));
    derive(&apple(), &pipeline).expect("derive failed")
}

#[test]
fn test_apple_to_orange() {
    let orange = orange();
    let fields: Vec<(String, String)> = orange.shape().1;
    assert_eq!(
        fields,
        vec![
            ("Picked".to_string(), "int64".to_string()),
            ("LastEaten".to_string(), "int64".to_string()),
            ("Weight".to_string(), "Grams".to_string()),
        ]
    );

    let f = generate(FieldExpressionKind::Converter, Some("$FromTo$To($from $From) $To"), &[&orange, &apple()])
        .expect("generate failed");
    let expected = "\
// AppleToOrange converts apple into a new Orange.
func AppleToOrange(apple Apple) Orange {
\tvar orange Orange
\t// orange.Picked is converted from apple.Picked.
\torange.Picked = apple.Picked.UnixNano()
\t// orange.LastEaten is converted from apple.LastEaten.
\torange.LastEaten = apple.LastEaten.UnixNano()
\t// orange.Weight is converted from apple.Weight.
\torange.Weight = apple.Weight
\treturn orange
}
";
    assert_eq!(f.to_string(), expected);
}

#[test]
fn test_orange_back_to_apple() {
    let orange = orange();

    // Field reverses only, then the struct name by hand.
    let back = Pipeline::new().then(MapFields(reverse_field)).then(Rename::new("Apple")).map(orange.clone());
    assert_eq!(back.shape(), apple().shape());

    let f = generate(FieldExpressionKind::Converter, None, &[&back, &orange]).expect("generate failed");
    assert_eq!(f.signature.to_string(), "func OrangeToApple(orange Orange) Apple");
    let lines: Vec<&str> = f.body.lines().collect();
    assert!(lines.contains(&"apple.Picked = time.Unix(0, orange.Picked).UTC()"));
    assert!(lines.contains(&"apple.LastEaten = time.Unix(0, orange.LastEaten).UTC()"));
    assert!(lines.contains(&"apple.Weight = orange.Weight"));

    // The struct reverse restores the name on its own.
    let back = ReverseStruct.map(orange);
    assert_eq!(back.shape(), apple().shape());
}

#[test]
fn test_renamed_field_reads_from_origin() {
    let pipeline = Pipeline::new()
        .then(MapFields(Compose::new().then(time_to_int64()).then(RenameField::new("Picked", "PickedAt"))))
        .then(Rename::new("Orange"));
    let orange = derive(&apple(), &pipeline).expect("derive failed");
    let f = generate(FieldExpressionKind::Converter, None, &[&orange, &apple()]).expect("generate failed");
    assert!(f.body.contains("orange.PickedAt = apple.Picked.UnixNano()"));
}

#[test]
fn test_renamed_field_without_struct_rename() {
    let renamed = derive(&apple(), &MapFields(RenameField::new("Weight", "Mass"))).expect("derive failed");
    let f = generate(FieldExpressionKind::Converter, Some("Copy(src Apple) Apple"), &[&renamed, &apple()])
        .expect("generate failed");
    assert!(f.body.contains("apple.Mass = src.Weight"));
    assert!(f.body.contains("apple.Picked = src.Picked"));
}

#[test]
fn test_empty_struct_comparer() {
    let empty = Struct::new("Empty", vec![]);
    let f = generate(FieldExpressionKind::Comparer, None, &[&empty, &empty]).expect("generate failed");
    assert_eq!(f.body, "return true");
    assert!(!f.body.contains("_cmp"));
}

#[test]
fn test_curried_function() {
    let lerp = Function::new(
        parse_signature("Lerp(a float64, b float64, t float64) float64").expect("parse failed"),
        "return a + (b-a)*t",
    );
    let wrapped = curry(lerp.clone(), 2, "0.5").expect("curry failed");
    let f = format_wrapped(&wrapped).expect("format failed");

    assert_eq!(f.signature.args.len(), lerp.signature.args.len() - 1);
    let lines: Vec<&str> = f.body.lines().collect();
    assert_eq!(lines, vec!["_in0 := a", "_in1 := b", "_out0 := Lerp(_in0, _in1, 0.5)", "return _out0"]);
}

#[test]
fn test_skip_fields_produce_no_statements() {
    let record = MapFields(SetPattern::new(FieldExpressionKind::Converter, Some("Weight"), "skip")).map(orange());
    let f = generate(FieldExpressionKind::Converter, None, &[&record, &apple()]).expect("generate failed");
    assert!(!f.body.contains("orange.Weight ="));
    assert!(f.body.contains("// orange.Weight is left at its zero value."));

    let record = MapFields(SetPattern::new(FieldExpressionKind::Comparer, None, "skip")).map(apple());
    let f = generate(FieldExpressionKind::Comparer, None, &[&record, &record]).expect("generate failed");
    assert_eq!(f.body.lines().filter(|l| !l.starts_with("//")).collect::<Vec<_>>(), vec!["return true"]);
}

fn sequential(stages: &[&dyn FieldMapper], record: &Struct) -> Vec<Field> {
    let mut out = Vec::new();
    for original in &record.fields {
        let mut current = vec![original.clone()];
        for stage in stages {
            current = current.into_iter().flat_map(|f| stage.map_from(f, original)).collect();
        }
        out.extend(current);
    }
    out
}

fn summary(fields: &[Field]) -> Vec<(String, String, Option<String>, String, String)> {
    fields
        .iter()
        .map(|f| {
            (f.name.clone(), f.type_.clone(), f.origin.clone(), f.exprs.converter.clone(), f.exprs.comparer.clone())
        })
        .collect()
}

#[test]
fn test_composition_is_associative_through_synthesis() {
    let a = time_to_int64;
    let b = || RenameField::new("Weight", "Mass");
    let c = || SetPattern::new(FieldExpressionKind::Comparer, Some("Mass"), "$a.$.Equal($b.$)");
    let derive_with = |mapper: Compose| Pipeline::new().then(MapFields(mapper)).then(Rename::new("Orange")).map(apple());

    let flat = derive_with(Compose::new().then(a()).then(b()).then(c()));
    let left = derive_with(Compose::new().then(Compose::new().then(a()).then(b())).then(c()));
    let right = derive_with(Compose::new().then(a()).then(Compose::new().then(b()).then(c())));
    let by_hand = sequential(&[&a(), &b(), &c()], &apple());

    assert_eq!(summary(&flat.fields), summary(&left.fields));
    assert_eq!(summary(&flat.fields), summary(&right.fields));
    assert_eq!(summary(&flat.fields), summary(&by_hand));

    let templates = [
        (FieldExpressionKind::Converter, "Convert(src Apple) Orange"),
        (FieldExpressionKind::Comparer, "Same(a Orange, b Apple) bool"),
    ];
    for (kind, template) in templates {
        let expected = generate(kind, Some(template), &[&flat, &apple()]).expect("generate failed").to_string();
        for other in [&left, &right] {
            let got = generate(kind, Some(template), &[other, &apple()]).expect("generate failed").to_string();
            assert_eq!(got, expected, "{}", kind);
        }
    }

    let flat = generate(FieldExpressionKind::Comparer, Some("Same(a Orange, b Apple) bool"), &[&flat, &apple()])
        .expect("generate failed");
    assert!(flat.body.contains("_cmp2 := bool(a.Mass.Equal(b.Weight))"));
}
