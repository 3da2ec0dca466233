use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;
use crate::utils::{comment_lines, indent};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeParam {
    pub name:       String,
    pub constraint: String,
}

impl TypeParam {
    pub fn new(name: &str, constraint: &str) -> Self {
        TypeParam { name: name.to_string(), constraint: constraint.to_string() }
    }
}

/// One pattern per field expression kind. An empty pattern means
/// "use the kind's default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldExprs {
    pub converter: String,
    pub comparer:  String,
    pub copier:    String,
    pub orderer:   String,
    pub zeroer:    String,
    pub truther:   String,
}

/// Produces the pre-transform field(s) from a post-transform field.
#[derive(Clone)]
pub struct FieldReverse(Arc<dyn Fn(Field) -> Vec<Field> + Send + Sync>);

impl FieldReverse {
    pub fn new(f: impl Fn(Field) -> Vec<Field> + Send + Sync + 'static) -> Self {
        FieldReverse(Arc::new(f))
    }

    pub fn call(&self, field: Field) -> Vec<Field> {
        (self.0)(field)
    }
}

impl fmt::Debug for FieldReverse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldReverse(..)")
    }
}

/// Produces the pre-transform struct from a post-transform struct.
#[derive(Clone)]
pub struct StructReverse(Arc<dyn Fn(Struct) -> Struct + Send + Sync>);

impl StructReverse {
    pub fn new(f: impl Fn(Struct) -> Struct + Send + Sync + 'static) -> Self {
        StructReverse(Arc::new(f))
    }

    pub fn call(&self, s: Struct) -> Struct {
        (self.0)(s)
    }
}

impl fmt::Debug for StructReverse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StructReverse(..)")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Field {
    pub name:    String,
    #[serde(rename = "type")]
    pub type_:   String,
    #[serde(default)]
    pub tag:     String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub exprs:   FieldExprs,
    /// Name of the field in the pipeline input this field was derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin:  Option<String>,
    #[serde(skip)]
    pub reverse: Option<FieldReverse>,
}

impl Field {
    pub fn new(name: &str, type_: &str) -> Self {
        Field { name: name.to_string(), type_: type_.to_string(), ..Default::default() }
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = tag.to_string();
        self
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = comment.to_string();
        self
    }

    /// Everything that shows up in generated code: name, type, tag, comment and patterns.
    pub fn shape(&self) -> (&str, &str, &str, &str, &FieldExprs) {
        (&self.name, &self.type_, &self.tag, &self.comment, &self.exprs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Struct {
    pub name:        String,
    #[serde(default)]
    pub type_params: Vec<TypeParam>,
    #[serde(default)]
    pub comment:     String,
    #[serde(default)]
    pub fields:      Vec<Field>,
    #[serde(skip)]
    pub reverse:     Option<StructReverse>,
}

impl Struct {
    pub fn new(name: &str, fields: Vec<Field>) -> Self {
        Struct { name: name.to_string(), fields, ..Default::default() }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The type expression naming this struct, with generic arguments: `Box[T, U]`.
    pub fn type_expr(&self) -> String {
        if self.type_params.is_empty() {
            self.name.clone()
        } else {
            let names: Vec<&str> = self.type_params.iter().map(|p| p.name.as_str()).collect();
            format!("{}[{}]", self.name, names.join(", "))
        }
    }

    /// Name and `(field name, field type)` list.
    pub fn shape(&self) -> (String, Vec<(String, String)>) {
        (
            self.name.clone(),
            self.fields.iter().map(|f| (f.name.clone(), f.type_.clone())).collect(),
        )
    }
}

impl fmt::Display for Struct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in comment_lines(&self.comment) {
            writeln!(f, "{}", line)?;
        }
        writeln!(f, "type {}{} struct {{", self.name, type_params_decl(&self.type_params))?;
        for field in &self.fields {
            for line in comment_lines(&field.comment) {
                writeln!(f, "\t{}", line)?;
            }
            if field.tag.is_empty() {
                writeln!(f, "\t{} {}", field.name, field.type_)?;
            } else {
                writeln!(f, "\t{} {} `{}`", field.name, field.type_, field.tag)?;
            }
        }
        writeln!(f, "}}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    #[serde(default)]
    pub name:  String,
    #[serde(rename = "type")]
    pub type_: String,
}

impl Param {
    pub fn new(name: &str, type_: &str) -> Self {
        Param { name: name.to_string(), type_: type_.to_string() }
    }

    fn render(&self) -> String {
        if self.name.is_empty() {
            self.type_.clone()
        } else {
            format!("{} {}", self.name, self.type_)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name:        String,
    #[serde(default)]
    pub type_params: Vec<TypeParam>,
    #[serde(default)]
    pub args:        Vec<Param>,
    #[serde(default)]
    pub results:     Vec<Param>,
    #[serde(default)]
    pub receiver:    Option<Param>,
    #[serde(default)]
    pub comment:     String,
}

pub fn type_params_decl(params: &[TypeParam]) -> String {
    if params.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = params
        .iter()
        .map(|p| format!("{} {}", p.name, p.constraint))
        .collect();
    format!("[{}]", parts.join(", "))
}

fn params_list(params: &[Param]) -> String {
    params.iter().map(Param::render).collect::<Vec<_>>().join(", ")
}

fn results_suffix(results: &[Param]) -> String {
    match results {
        [] => String::new(),
        [only] if only.name.is_empty() => format!(" {}", only.type_),
        _ => format!(" ({})", params_list(results)),
    }
}

impl FunctionSignature {
    /// Receiver (if any) followed by the declared arguments.
    pub fn inputs(&self) -> impl Iterator<Item = &Param> {
        self.receiver.iter().chain(self.args.iter())
    }

    /// The function type used when this signature is held as a value:
    /// `func(A, B) (X, Y)`. A receiver becomes the first parameter.
    pub fn value_type(&self) -> Result<String, ConvertError> {
        if !self.type_params.is_empty() {
            return Err(ConvertError::GenericValue(self.name.clone()));
        }
        let types: Vec<&str> = self.inputs().map(|p| p.type_.as_str()).collect();
        let results: Vec<Param> = self.results.iter().map(|r| Param::new("", &r.type_)).collect();
        Ok(format!("func({}){}", types.join(", "), results_suffix(&results)))
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("func ")?;
        if let Some(recv) = &self.receiver {
            write!(f, "({}) ", recv.render())?;
        }
        write!(
            f,
            "{}{}({}){}",
            self.name,
            type_params_decl(&self.type_params),
            params_list(&self.args),
            results_suffix(&self.results)
        )
    }
}

/// A signature plus its body. Body lines are unindented at the top level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub signature: FunctionSignature,
    pub body:      String,
}

impl Function {
    pub fn new(signature: FunctionSignature, body: &str) -> Self {
        Function { signature, body: body.to_string() }
    }

    /// The closure form `func(a A) X { ... }`, usable as a local definition.
    pub fn closure(&self) -> Result<String, ConvertError> {
        if !self.signature.type_params.is_empty() {
            return Err(ConvertError::GenericValue(self.signature.name.clone()));
        }
        let params: Vec<Param> = self.signature.inputs().cloned().collect();
        Ok(format!(
            "func({}){} {{\n{}\n}}",
            params_list(&params),
            results_suffix(&self.signature.results),
            indent(&self.body)
        ))
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in comment_lines(&self.signature.comment) {
            writeln!(f, "{}", line)?;
        }
        writeln!(f, "{} {{", self.signature)?;
        if !self.body.is_empty() {
            writeln!(f, "{}", indent(&self.body))?;
        }
        writeln!(f, "}}")
    }
}
