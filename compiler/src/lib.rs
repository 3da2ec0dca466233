//! brine-convgen-compiler
//!
//! This crate implements:
//!  1) A `$`-token replacer for code templates,
//!  2) Field expression kinds (converter, comparer, copier, orderer, zeroer, truther)
//!     and per-field pattern resolution,
//!  3) Field and struct mapper pipelines with attachable reverses,
//!  4) Function synthesis from a struct pair, and wrapped functions (currying,
//!     result reshaping),
//!  5) A tokenizer + parser for function signatures, a struct verifier, and
//!     the error type (`ConvertError`).

pub mod error;
pub mod types;
pub mod utils;
pub mod tokenizer;
pub mod parser;
pub mod replacer;
pub mod kind;
pub mod expr;
pub mod gen_func;
pub mod mapper;
pub mod builtin;
pub mod wrap;
pub mod verifier;
pub mod compiler;

pub use compiler::{derive, derive_converter, generate};
pub use error::ConvertError;
pub use gen_func::{format_struct_binary_function, format_struct_unary_function};
pub use kind::FieldExpressionKind;
pub use mapper::{Compose, FieldMapper, MapFields, Pipeline, StructMapper};
pub use parser::parse_signature;
pub use replacer::replace;
pub use types::{Field, Function, FunctionSignature, Param, Struct, TypeParam};
pub use verifier::verify_struct;
pub use wrap::{curry, format_wrapped, reshape_results, Capture, Callable, WrappedFunction};
