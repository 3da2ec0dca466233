//! Synthesis of whole functions from a record (or record pair) and a kind.

use tracing::debug;

use crate::{
    error::{ConvertError, ResultExt},
    expr::{
        resolve_binary_fields, resolve_function_comment, resolve_unary_fields, BinaryScope,
        FieldExpression, Operand, SignatureScope, UnaryScope,
    },
    kind::{FieldExpressionKind, Reducer, Shape},
    parser::parse_signature,
    replacer::replace,
    types::{Function, FunctionSignature, Param, Struct},
    utils::{base_type_name, comment_lines, is_pointer, strip_pointer, untitle},
};

/// Words that cannot name the output variable.
const KEYWORDS: [&str; 25] = [
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
    "for", "func", "go", "goto", "if", "import", "interface", "map", "package", "range",
    "return", "select", "struct", "switch", "type", "var",
];

/// Where the left operand of a synthesized function lives.
#[derive(Debug, Clone)]
enum Destination {
    /// A result of the function.
    Returned(Param),
    /// A pointer input written at the end of the body.
    Pointer(usize, Param),
    /// A plain input, read by boolean kinds.
    Input(usize, Param),
}

impl Destination {
    fn input(&self) -> Option<usize> {
        match self {
            Destination::Returned(_) => None,
            Destination::Pointer(i, _) | Destination::Input(i, _) => Some(*i),
        }
    }
}

fn matches_record(type_: &str, record: &Struct) -> bool {
    base_type_name(type_) == record.name
}

fn signature_error(signature: &FunctionSignature, msg: String) -> ConvertError {
    ConvertError::Signature { signature: signature.to_string(), msg }
}

/// Records' type parameters, left first, used when the signature declares none.
fn inherit_type_params(signature: &mut FunctionSignature, records: &[&Struct]) {
    if !signature.type_params.is_empty() {
        return;
    }
    for record in records {
        for param in &record.type_params {
            if !signature.type_params.iter().any(|p| p.name == param.name) {
                signature.type_params.push(param.clone());
            }
        }
    }
}

fn locate_destination(
    kind: FieldExpressionKind,
    signature: &FunctionSignature,
    record: &Struct,
) -> Result<Destination, ConvertError> {
    let inputs: Vec<&Param> = signature.inputs().collect();

    if kind.spec().shape == Shape::Bool {
        return inputs
            .iter()
            .position(|p| matches_record(&p.type_, record))
            .map(|i| Destination::Input(i, inputs[i].clone()))
            .ok_or_else(|| signature_error(signature, format!("no argument of type {}", record.name)));
    }

    let results: Vec<&Param> = signature
        .results
        .iter()
        .filter(|p| matches_record(&p.type_, record))
        .collect();
    match results.as_slice() {
        [only] if only.name.is_empty() && signature.results.len() > 1 => {
            return Err(signature_error(
                signature,
                format!(
                    "unnamed {} result is one of {}; name the results to return the others unchanged",
                    record.name,
                    signature.results.len()
                ),
            ))
        }
        [only] => return Ok(Destination::Returned((*only).clone())),
        [] => {}
        _ => {
            return Err(signature_error(
                signature,
                format!("ambiguous destination: {} results of type {}", results.len(), record.name),
            ))
        }
    }

    let pointers: Vec<usize> = inputs
        .iter()
        .enumerate()
        .filter(|(_, p)| is_pointer(&p.type_) && matches_record(&p.type_, record))
        .map(|(i, _)| i)
        .collect();
    match pointers.as_slice() {
        [i] => Ok(Destination::Pointer(*i, inputs[*i].clone())),
        [] => Err(signature_error(
            signature,
            format!("no result or pointer argument of type {}", record.name),
        )),
        _ => Err(signature_error(
            signature,
            format!("ambiguous destination: {} pointer arguments of type {}", pointers.len(), record.name),
        )),
    }
}

fn locate_source(
    signature: &FunctionSignature,
    record: &Struct,
    destination: &Destination,
) -> Result<(usize, Param), ConvertError> {
    signature
        .inputs()
        .enumerate()
        .find(|(i, p)| Some(*i) != destination.input() && matches_record(&p.type_, record))
        .map(|(i, p)| (i, p.clone()))
        .ok_or_else(|| signature_error(signature, format!("no source argument of type {}", record.name)))
}

fn argument_name(signature: &FunctionSignature, param: &Param) -> Result<String, ConvertError> {
    if param.name.is_empty() {
        return Err(signature_error(signature, format!("argument of type {} has no name", param.type_)));
    }
    Ok(param.name.clone())
}

/// The untitled record name, prefixed with `_` until nothing else uses it.
fn output_var(record: &Struct, signature: &FunctionSignature) -> String {
    let mut var = untitle(&record.name);
    let taken = |v: &str| {
        KEYWORDS.contains(&v)
            || signature.inputs().any(|p| p.name == v)
            || signature.results.iter().any(|p| p.name == v)
    };
    while taken(&var) {
        var.insert(0, '_');
    }
    var
}

fn destination_operand<'a>(
    token: &'static str,
    destination: &Destination,
    record: &'a Struct,
    signature: &FunctionSignature,
) -> Result<Operand<'a>, ConvertError> {
    let (var, type_) = match destination {
        Destination::Returned(p) if p.name.is_empty() => {
            (output_var(record, signature), strip_pointer(&p.type_).to_string())
        }
        Destination::Returned(p) => (p.name.clone(), p.type_.clone()),
        Destination::Pointer(_, p) => {
            argument_name(signature, p)?;
            (output_var(record, signature), strip_pointer(&p.type_).to_string())
        }
        Destination::Input(_, p) => (argument_name(signature, p)?, p.type_.clone()),
    };
    Ok(Operand { token, var, type_, record })
}

fn value_body(destination: &Destination, out: &Operand<'_>, fields: &[FieldExpression]) -> String {
    let mut lines = Vec::new();
    match destination {
        Destination::Returned(p) if !p.name.is_empty() => {
            if is_pointer(&p.type_) {
                lines.push(format!("{} = new({})", out.var, strip_pointer(&p.type_)));
            }
        }
        _ => lines.push(format!("var {} {}", out.var, out.type_)),
    }

    for field in fields {
        lines.extend(comment_lines(&field.comment));
        if !field.skip {
            lines.push(field.expr.clone());
        }
    }

    lines.push(match destination {
        Destination::Returned(p) if !p.name.is_empty() => "return".to_string(),
        Destination::Returned(p) if is_pointer(&p.type_) => format!("return &{}", out.var),
        Destination::Returned(_) => format!("return {}", out.var),
        Destination::Pointer(_, p) | Destination::Input(_, p) => format!("*{} = {}", p.name, out.var),
    });
    lines.join("\n")
}

fn bool_body(reducer: Reducer, fields: &[FieldExpression]) -> String {
    let mut lines = Vec::new();
    for field in fields {
        lines.extend(comment_lines(&field.comment));
        if field.skip {
            continue;
        }
        let cmp = format!("_cmp{}", field.index);
        lines.push(format!("{} := bool({})", cmp, field.expr));
        match reducer {
            Reducer::And => {
                lines.push(format!("if !{} {{", cmp));
                lines.push("\treturn false".to_string());
            }
            Reducer::Or => {
                lines.push(format!("if {} {{", cmp));
                lines.push("\treturn true".to_string());
            }
        }
        lines.push("}".to_string());
    }
    lines.push(format!("return {}", reducer.neutral()));
    lines.join("\n")
}

fn assemble_body(
    kind: FieldExpressionKind,
    destination: &Destination,
    out: &Operand<'_>,
    fields: &[FieldExpression],
) -> String {
    match kind.spec().reducer {
        Some(reducer) => bool_body(reducer, fields),
        None => value_body(destination, out, fields),
    }
}

/// Synthesizes a `kind` function reading `right` and producing (or comparing
/// against) `left`. `template` is the signature template, e.g.
/// `$FromTo$To($from $From) $To`.
pub fn format_struct_binary_function(
    kind: FieldExpressionKind,
    template: &str,
    left: &Struct,
    right: &Struct,
) -> Result<Function, ConvertError> {
    binary_function(kind, template, left, right)
        .context(|| format!("formatting {} function from {} to {}", kind, right.name, left.name))
}

fn binary_function(
    kind: FieldExpressionKind,
    template: &str,
    left: &Struct,
    right: &Struct,
) -> Result<Function, ConvertError> {
    let spec = kind.spec();
    let right_token = spec
        .right
        .ok_or_else(|| ConvertError::Internal(format!("{} has no right operand", kind)))?;

    let scope = SignatureScope { kind, left, right: Some(right) };
    let mut signature = parse_signature(&replace(template, &scope)?)?;
    inherit_type_params(&mut signature, &[left, right]);
    debug!(%kind, left = %left.name, right = %right.name, %signature, "synthesizing binary function");

    let destination = locate_destination(kind, &signature, left)?;
    let (source_index, source) = locate_source(&signature, right, &destination)?;
    debug_assert_ne!(destination.input(), Some(source_index));

    let left_op = destination_operand(spec.left, &destination, left, &signature)?;
    let right_op = Operand {
        token:  right_token,
        var:    argument_name(&signature, &source)?,
        type_:  source.type_.clone(),
        record: right,
    };

    let name = signature.name.clone();
    let fields = resolve_binary_fields(kind, &left_op, &right_op, &name)?;
    let body_scope = BinaryScope { left: &left_op, right: &right_op, field: None, function: &name };
    signature.comment = resolve_function_comment(kind, &body_scope, &scope)?;

    let body = assemble_body(kind, &destination, &left_op, &fields);
    Ok(Function::new(signature, &body))
}

/// Synthesizes a one-record `kind` function such as a zero-value constructor.
pub fn format_struct_unary_function(
    kind: FieldExpressionKind,
    template: &str,
    record: &Struct,
) -> Result<Function, ConvertError> {
    unary_function(kind, template, record).context(|| format!("formatting {} function for {}", kind, record.name))
}

fn unary_function(kind: FieldExpressionKind, template: &str, record: &Struct) -> Result<Function, ConvertError> {
    let scope = SignatureScope { kind, left: record, right: None };
    let mut signature = parse_signature(&replace(template, &scope)?)?;
    inherit_type_params(&mut signature, &[record]);
    debug!(%kind, record = %record.name, %signature, "synthesizing unary function");

    let destination = locate_destination(kind, &signature, record)?;
    let operand = destination_operand(kind.spec().left, &destination, record, &signature)?;

    let name = signature.name.clone();
    let fields = resolve_unary_fields(kind, &operand, &name)?;
    let body_scope = UnaryScope { operand: &operand, field: None, function: &name };
    signature.comment = resolve_function_comment(kind, &body_scope, &scope)?;

    let body = assemble_body(kind, &destination, &operand, &fields);
    Ok(Function::new(signature, &body))
}
