use tracing::debug;

use crate::{
    error::ConvertError,
    gen_func::{format_struct_binary_function, format_struct_unary_function},
    kind::FieldExpressionKind,
    mapper::StructMapper,
    types::{Function, Struct},
    verifier::verify_struct,
};

/// Synthesizes a `kind` function over `records`: `[to, from]` for binary
/// kinds, `[record]` for unary ones. `template` defaults to the kind's
/// default signature.
pub fn generate(
    kind: FieldExpressionKind,
    template: Option<&str>,
    records: &[&Struct],
) -> Result<Function, ConvertError> {
    let spec = kind.spec();
    if records.len() != spec.arity {
        return Err(ConvertError::Arity { kind: kind.to_string(), expected: spec.arity, got: records.len() });
    }
    let template = template.unwrap_or(spec.default_signature);
    debug!(%kind, template, "generating function");

    match records {
        [to, from] => format_struct_binary_function(kind, template, to, from),
        [record] => format_struct_unary_function(kind, template, record),
        _ => Err(ConvertError::Internal(format!("{} has arity {}", kind, spec.arity))),
    }
}

/// Runs `pipeline` over a copy of `source` and checks the result.
pub fn derive(source: &Struct, pipeline: &dyn StructMapper) -> Result<Struct, ConvertError> {
    let derived = pipeline.map(source.clone());
    verify_struct(&derived)?;
    debug!(from = %source.name, to = %derived.name, fields = derived.fields.len(), "derived struct");
    Ok(derived)
}

/// Derives a struct from `source` and the converter from `source` to it.
pub fn derive_converter(
    source: &Struct,
    pipeline: &dyn StructMapper,
    template: Option<&str>,
) -> Result<(Struct, Function), ConvertError> {
    let derived = derive(source, pipeline)?;
    let function = generate(FieldExpressionKind::Converter, template, &[&derived, source])?;
    Ok((derived, function))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builtin::{time_to_int64, Rename},
        mapper::{MapFields, Pipeline},
        types::Field,
    };

    fn apple() -> Struct {
        Struct::new(
            "Apple",
            vec![Field::new("Picked", "time.Time"), Field::new("Weight", "Grams")],
        )
    }

    #[test]
    fn test_generate_checks_arity() {
        let a = apple();
        let err = generate(FieldExpressionKind::Comparer, None, &[&a]).unwrap_err();
        assert!(matches!(err, ConvertError::Arity { expected: 2, got: 1, .. }));
        assert_eq!(err.to_string(), "comparer expects 2 record(s), got 1");

        let err = generate(FieldExpressionKind::Zeroer, None, &[&a, &a]).unwrap_err();
        assert!(matches!(err, ConvertError::Arity { expected: 1, got: 2, .. }));
    }

    #[test]
    fn test_generate_every_kind_with_defaults() {
        let a = apple();
        for kind in FieldExpressionKind::ALL {
            let records: Vec<&Struct> = if kind.is_binary() { vec![&a, &a] } else { vec![&a] };
            let f = generate(kind, None, &records).unwrap();
            assert!(!f.signature.comment.is_empty(), "{}", kind);
        }
    }

    #[test]
    fn test_derive_converter() {
        let pipeline = Pipeline::new().then(MapFields(time_to_int64())).then(Rename::new("Orange"));
        let (orange, f) = derive_converter(&apple(), &pipeline, None).unwrap();
        assert_eq!(orange.name, "Orange");
        assert_eq!(f.signature.to_string(), "func AppleToOrange(apple Apple) Orange");
        assert!(f.body.contains("orange.Picked = apple.Picked.UnixNano()"));
    }

    #[test]
    fn test_derive_rejects_invalid_result() {
        let pipeline = Pipeline::new().then(Rename::new("not valid"));
        assert!(matches!(derive(&apple(), &pipeline), Err(ConvertError::VerifierError(_))));
    }
}
