//! Functions defined as a capture/call/capture around another function.
//!
//! A [`WrappedFunction`] binds each input capture to a fresh variable, calls
//! the wrapped function once and returns its output captures. Currying and
//! result reshaping are thin constructors on top.

use std::cell::RefCell;

use tracing::debug;

use crate::{
    error::{ConvertError, ResultExt},
    replacer::{replace, Head, Resolve, TokenRef},
    types::{Function, FunctionSignature, Param},
    utils::{title, tuple_members},
};

/// A value fed into (or returned out of) the wrapped call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    /// Label later captures refer to as `$name`. May be empty.
    pub name:   String,
    /// Template resolved against the wrapper's arguments.
    pub value:  String,
    /// A single type or a comma separated tuple.
    pub type_:  String,
    /// Pass `value` straight into the call instead of binding it first.
    pub inline: bool,
}

impl Capture {
    pub fn new(name: &str, value: &str, type_: &str) -> Self {
        Capture { name: name.to_string(), value: value.to_string(), type_: type_.to_string(), inline: false }
    }

    pub fn inline(value: &str, type_: &str) -> Self {
        Capture { inline: true, ..Capture::new("", value, type_) }
    }

    fn arity(&self) -> usize {
        tuple_members(&self.type_).len().max(1)
    }
}

#[derive(Debug, Clone)]
pub enum Callable {
    Function(Function),
    Wrapped(Box<WrappedFunction>),
}

impl Callable {
    pub fn signature(&self) -> &FunctionSignature {
        match self {
            Callable::Function(f) => &f.signature,
            Callable::Wrapped(w) => &w.signature,
        }
    }
}

impl From<Function> for Callable {
    fn from(f: Function) -> Self {
        Callable::Function(f)
    }
}

impl From<WrappedFunction> for Callable {
    fn from(w: WrappedFunction) -> Self {
        Callable::Wrapped(Box::new(w))
    }
}

#[derive(Debug, Clone)]
pub struct WrappedFunction {
    pub signature: FunctionSignature,
    pub wraps:     Option<Callable>,
    pub inputs:    Vec<Capture>,
    /// Empty means "return every result of the wrapped call".
    pub outputs:   Vec<Capture>,
}

impl WrappedFunction {
    pub fn new(signature: FunctionSignature, wraps: impl Into<Callable>) -> Self {
        WrappedFunction { signature, wraps: Some(wraps.into()), inputs: Vec::new(), outputs: Vec::new() }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.signature.name = name.to_string();
        self
    }
}

/// A capture after resolution: the variables (or inline expression) standing for it.
struct Bound {
    label: String,
    vars:  Vec<String>,
    type_: String,
}

fn bound_single(bound: &[Bound], label: &str) -> Option<String> {
    let b = bound.iter().rev().find(|b| !b.label.is_empty() && b.label == label)?;
    match b.vars.as_slice() {
        [only] => Some(only.clone()),
        _ => None,
    }
}

fn bound_item(bound: &[Bound], label: &str, item: usize) -> Option<String> {
    let b = bound.iter().rev().find(|b| !b.label.is_empty() && b.label == label)?;
    if b.vars.len() > 1 {
        b.vars.get(item).cloned()
    } else {
        None
    }
}

fn bound_type(bound: &[Bound], label: &str) -> Option<String> {
    bound
        .iter()
        .rev()
        .find(|b| !b.label.is_empty() && b.label == label)
        .map(|b| b.type_.clone())
}

/// The wrapper's own inputs, recording which of them templates reference.
struct WrapperArgs<'a> {
    signature: &'a FunctionSignature,
    used:      RefCell<Vec<bool>>,
}

impl<'a> WrapperArgs<'a> {
    fn new(signature: &'a FunctionSignature) -> Self {
        let count = signature.inputs().count();
        WrapperArgs { signature, used: RefCell::new(vec![false; count]) }
    }

    fn offset(&self) -> usize {
        usize::from(self.signature.receiver.is_some())
    }

    fn mark(&self, input: usize) {
        if let Some(slot) = self.used.borrow_mut().get_mut(input) {
            *slot = true;
        }
    }

    /// `$N` names the N-th declared argument; the receiver is reachable by name only.
    fn by_index(&self, index: usize) -> Option<String> {
        let param = self.signature.args.get(index)?;
        if param.name.is_empty() {
            return None;
        }
        self.mark(index + self.offset());
        Some(param.name.clone())
    }

    fn by_name(&self, name: &str) -> Option<String> {
        let position = self.signature.inputs().position(|p| !p.name.is_empty() && p.name == name)?;
        self.mark(position);
        Some(name.to_string())
    }

    fn type_of(&self, token: &TokenRef) -> Option<String> {
        match &token.head {
            Head::Index(i) => self.signature.args.get(*i).map(|p| p.type_.clone()),
            Head::Name(n) => self.signature.inputs().find(|p| &p.name == n).map(|p| p.type_.clone()),
            Head::Single => None,
        }
    }

    fn unreferenced(&self) -> Option<String> {
        let used = self.used.borrow();
        self.signature
            .inputs()
            .zip(used.iter())
            .enumerate()
            .find(|(_, (_, used))| !**used)
            .map(|(i, (p, _))| if p.name.is_empty() { format!("#{}", i) } else { p.name.clone() })
    }
}

/// Tokens of input capture values.
struct InputScope<'s, 'a> {
    args:  &'s WrapperArgs<'a>,
    bound: &'s [Bound],
}

impl Resolve for InputScope<'_, '_> {
    fn single(&self) -> Option<String> {
        Some(self.args.signature.name.clone())
    }

    fn by_index(&self, index: usize) -> Option<String> {
        self.args.by_index(index)
    }

    fn by_name(&self, name: &str) -> Option<String> {
        self.args.by_name(name).or_else(|| bound_single(self.bound, name))
    }

    fn tuple_by_index(&self, index: usize, item: usize) -> Option<String> {
        let b = self.bound.get(index)?;
        if b.vars.len() > 1 {
            b.vars.get(item).cloned()
        } else {
            None
        }
    }

    fn tuple_by_name(&self, name: &str, item: usize) -> Option<String> {
        bound_item(self.bound, name, item)
    }

    fn modifier(&self, token: &TokenRef, _value: &str, keyword: &str) -> Option<String> {
        if keyword != "type" || !token.modifiers.is_empty() || token.item.is_some() {
            return None;
        }
        self.args
            .type_of(token)
            .or_else(|| token.name().and_then(|n| bound_type(self.bound, n)))
    }
}

/// Tokens of output capture values: results of the wrapped call first.
struct OutputScope<'s, 'a> {
    args:     &'s WrapperArgs<'a>,
    bound:    &'s [Bound],
    results:  &'s [Param],
    out_vars: &'s [String],
    used_out: RefCell<Vec<bool>>,
}

impl OutputScope<'_, '_> {
    fn out(&self, index: usize) -> Option<String> {
        let var = self.out_vars.get(index)?;
        if let Some(slot) = self.used_out.borrow_mut().get_mut(index) {
            *slot = true;
        }
        Some(var.clone())
    }
}

impl Resolve for OutputScope<'_, '_> {
    fn single(&self) -> Option<String> {
        Some(self.args.signature.name.clone())
    }

    fn by_index(&self, index: usize) -> Option<String> {
        self.out(index)
    }

    fn by_name(&self, name: &str) -> Option<String> {
        match self.results.iter().position(|r| !r.name.is_empty() && r.name == name) {
            Some(i) => self.out(i),
            None => bound_single(self.bound, name).or_else(|| self.args.by_name(name)),
        }
    }

    fn tuple_by_name(&self, name: &str, item: usize) -> Option<String> {
        bound_item(self.bound, name, item)
    }

    fn modifier(&self, token: &TokenRef, _value: &str, keyword: &str) -> Option<String> {
        if keyword != "type" || !token.modifiers.is_empty() || token.item.is_some() {
            return None;
        }
        match &token.head {
            Head::Index(i) => self.results.get(*i).map(|r| r.type_.clone()),
            Head::Name(n) => self
                .results
                .iter()
                .find(|r| &r.name == n)
                .map(|r| r.type_.clone())
                .or_else(|| bound_type(self.bound, n))
                .or_else(|| self.args.type_of(token)),
            Head::Single => None,
        }
    }
}

/// Renders `wrapped` as a plain function.
pub fn format_wrapped(wrapped: &WrappedFunction) -> Result<Function, ConvertError> {
    render(wrapped).context(|| format!("formatting wrapper {}", wrapped.signature.name))
}

fn render(wrapped: &WrappedFunction) -> Result<Function, ConvertError> {
    let signature = &wrapped.signature;
    let inner = wrapped
        .wraps
        .as_ref()
        .ok_or_else(|| ConvertError::NothingWrapped(signature.name.clone()))?;
    let inner_sig = inner.signature();
    debug!(wrapper = %signature.name, wraps = %inner_sig.name, "formatting wrapped function");

    let args = WrapperArgs::new(signature);
    let mut bound: Vec<Bound> = Vec::new();
    let mut values = Vec::new();
    for (i, capture) in wrapped.inputs.iter().enumerate() {
        let scope = InputScope { args: &args, bound: &bound };
        let value = replace(&capture.value, &scope).context(|| format!("resolving input capture {}", i))?;
        let vars = match capture.arity() {
            _ if capture.inline => vec![value.clone()],
            1 => vec![format!("_in{}", i)],
            n => (0..n).map(|j| format!("_in{}_{}", i, j)).collect(),
        };
        bound.push(Bound { label: capture.name.clone(), vars, type_: capture.type_.clone() });
        values.push(value);
    }
    if let Some(argument) = args.unreferenced() {
        return Err(ConvertError::Unreferenced { function: signature.name.clone(), argument });
    }

    let mut lines = Vec::new();
    let callee = match inner {
        Callable::Function(f) => f.signature.name.clone(),
        Callable::Wrapped(w) => {
            let local = format_wrapped(w)?;
            lines.push(format!("{} := {}", local.signature.name, local.closure()?));
            local.signature.name
        }
    };

    for ((capture, value), b) in wrapped.inputs.iter().zip(&values).zip(&bound) {
        if !capture.inline {
            lines.push(format!("{} := {}", b.vars.join(", "), value));
        }
    }

    let mut call_args: Vec<String> = bound.iter().flat_map(|b| b.vars.iter().cloned()).collect();
    let expected = inner_sig.inputs().count();
    if call_args.len() != expected {
        return Err(ConvertError::Signature {
            signature: inner_sig.to_string(),
            msg:       format!("takes {} argument(s) but the captures supply {}", expected, call_args.len()),
        });
    }
    if inner_sig.inputs().last().is_some_and(|p| p.type_.starts_with("...")) {
        if let Some(last) = call_args.last_mut() {
            last.push_str("...");
        }
    }
    let call = match inner {
        Callable::Function(f) if f.signature.receiver.is_some() => {
            format!("{}.{}({})", call_args[0], callee, call_args[1..].join(", "))
        }
        _ => format!("{}({})", callee, call_args.join(", ")),
    };

    let out_vars: Vec<String> = (0..inner_sig.results.len()).map(|i| format!("_out{}", i)).collect();
    let outputs = OutputScope {
        args:     &args,
        bound:    &bound,
        results:  &inner_sig.results,
        out_vars: &out_vars,
        used_out: RefCell::new(vec![false; out_vars.len()]),
    };

    let mut tail = Vec::new();
    let mut returned = Vec::new();
    if wrapped.outputs.is_empty() {
        returned = (0..out_vars.len()).filter_map(|i| outputs.out(i)).collect();
    }
    for (j, capture) in wrapped.outputs.iter().enumerate() {
        let value = replace(&capture.value, &outputs).context(|| format!("resolving output capture {}", j))?;
        match capture.arity() {
            n if n == 1 || capture.inline => returned.push(value),
            n => {
                let vars: Vec<String> = (0..n).map(|k| format!("_res{}_{}", j, k)).collect();
                tail.push(format!("{} := {}", vars.join(", "), value));
                returned.extend(vars);
            }
        }
    }
    if returned.len() != signature.results.len() {
        return Err(ConvertError::Signature {
            signature: signature.to_string(),
            msg:       format!("returns {} value(s) but the outputs supply {}", signature.results.len(), returned.len()),
        });
    }

    let used = outputs.used_out.into_inner();
    if used.iter().any(|u| *u) {
        let lhs: Vec<&str> = out_vars
            .iter()
            .zip(&used)
            .map(|(var, used)| if *used { var.as_str() } else { "_" })
            .collect();
        lines.push(format!("{} := {}", lhs.join(", "), call));
    } else {
        lines.push(call);
    }
    lines.extend(tail);
    if !returned.is_empty() {
        lines.push(format!("return {}", returned.join(", ")));
    }

    Ok(Function::new(signature.clone(), &lines.join("\n")))
}

/// Gives unnamed inputs placeholder names so captures can refer to them.
fn with_named_inputs(signature: &FunctionSignature) -> FunctionSignature {
    let mut named = signature.clone();
    if let Some(recv) = named.receiver.as_mut() {
        if recv.name.is_empty() {
            recv.name = "recv".to_string();
        }
    }
    for (i, arg) in named.args.iter_mut().enumerate() {
        if arg.name.is_empty() {
            arg.name = format!("arg{}", i);
        }
    }
    named
}

fn pass_through(param: &Param) -> Capture {
    Capture::new("", &format!("${}", param.name), &param.type_)
}

/// Fixes argument `index` of `callable` to `literal`. The wrapper keeps the
/// remaining arguments, in order, and returns every result unchanged.
pub fn curry(callable: impl Into<Callable>, index: usize, literal: &str) -> Result<WrappedFunction, ConvertError> {
    let callable = callable.into();
    let inner = with_named_inputs(callable.signature());
    let target = inner.args.get(index).cloned().ok_or_else(|| ConvertError::Signature {
        signature: inner.to_string(),
        msg:       format!("no argument at index {}", index),
    })?;

    let mut signature = inner.clone();
    signature.name = format!("{}With{}", inner.name, title(&target.name));
    signature.args.remove(index);
    signature.comment = format!("{} calls {} with {} set to {}.", signature.name, inner.name, target.name, literal);

    let mut inputs: Vec<Capture> = inner.receiver.iter().map(pass_through).collect();
    for (i, arg) in inner.args.iter().enumerate() {
        inputs.push(if i == index { Capture::inline(literal, &arg.type_) } else { pass_through(arg) });
    }

    Ok(WrappedFunction { signature, wraps: Some(callable), inputs, outputs: Vec::new() })
}

/// Keeps the arguments of `callable` and replaces its results with `results`,
/// computed by the `outputs` captures.
pub fn reshape_results(callable: impl Into<Callable>, outputs: Vec<Capture>, results: Vec<Param>) -> WrappedFunction {
    let callable = callable.into();
    let inner = with_named_inputs(callable.signature());

    let mut signature = inner.clone();
    signature.name = format!("{}Reshaped", inner.name);
    signature.results = results;
    signature.comment = String::new();

    let inputs = inner.inputs().map(pass_through).collect();
    WrappedFunction { signature, wraps: Some(callable), inputs, outputs }
}
