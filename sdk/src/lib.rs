//! brine-convgen
//!
//! Public entry points for generating record conversion code.
//!
//! - Re-exports of the compiler's records, mappers and error type
//! - Panic-free wrappers around synthesis: a panic inside the compiler is
//!   returned as `ConvertError::Internal`
//! - Loading record descriptions from JSON

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tracing::{debug, warn};

pub use brine_convgen_compiler::error::{ConvertError, ResultExt};
pub use brine_convgen_compiler::types::{Field, FieldExprs, Function, FunctionSignature, Param, Struct, TypeParam};
pub use brine_convgen_compiler::{
    parse_signature, Capture, Callable, Compose, FieldExpressionKind, FieldMapper, MapFields, Pipeline,
    StructMapper, WrappedFunction,
};

pub mod builtin {
    pub use brine_convgen_compiler::builtin::*;
}

pub mod error {
    pub use brine_convgen_compiler::error::{ConvertError, ResultExt};
}

/// Runs `op`, turning a panic into `ConvertError::Internal`.
fn guarded<T>(op: impl FnOnce() -> Result<T, ConvertError>) -> Result<T, ConvertError> {
    match panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(result) => result,
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(%msg, "compiler panicked");
            Err(ConvertError::Internal(msg))
        }
    }
}

/// See [`brine_convgen_compiler::generate`].
pub fn generate(
    kind: FieldExpressionKind,
    template: Option<&str>,
    records: &[&Struct],
) -> Result<Function, ConvertError> {
    guarded(|| brine_convgen_compiler::generate(kind, template, records))
}

/// See [`brine_convgen_compiler::derive`].
pub fn derive(source: &Struct, pipeline: &dyn StructMapper) -> Result<Struct, ConvertError> {
    guarded(|| brine_convgen_compiler::derive(source, pipeline))
}

/// See [`brine_convgen_compiler::derive_converter`].
pub fn derive_converter(
    source: &Struct,
    pipeline: &dyn StructMapper,
    template: Option<&str>,
) -> Result<(Struct, Function), ConvertError> {
    guarded(|| brine_convgen_compiler::derive_converter(source, pipeline, template))
}

pub fn format_wrapped(wrapped: &WrappedFunction) -> Result<Function, ConvertError> {
    guarded(|| brine_convgen_compiler::format_wrapped(wrapped))
}

/// Fixes argument `index` of `callable` to `literal` and renders the wrapper.
pub fn curry(callable: impl Into<Callable>, index: usize, literal: &str) -> Result<Function, ConvertError> {
    let callable = callable.into();
    guarded(|| {
        let wrapped = brine_convgen_compiler::curry(callable, index, literal)?;
        brine_convgen_compiler::format_wrapped(&wrapped)
    })
}

/// Reads a record description and checks it.
pub fn load_struct(json: &str) -> Result<Struct, ConvertError> {
    let record: Struct = serde_json::from_str(json)?;
    brine_convgen_compiler::verify_struct(&record)?;
    debug!(record = %record.name, fields = record.fields.len(), "loaded struct");
    Ok(record)
}

pub fn load_struct_file(path: impl AsRef<Path>) -> Result<Struct, ConvertError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    load_struct(&text).context(|| format!("while loading {}", path.display()))
}

/// Renders `result` as source, or as a `// error: ...` comment when it failed.
pub fn render_or_comment(result: Result<Function, ConvertError>) -> String {
    match result {
        Ok(function) => function.to_string(),
        Err(err) => format!("// error: {}\n", err.to_string().replace('\n', " ")),
    }
}
