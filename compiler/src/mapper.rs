//! Field and struct mapper pipelines.
//!
//! A field mapper turns one field into zero or more fields. Every output is
//! rewritten against the field that entered the pipeline: empty names and
//! types are inherited from it and its name is recorded as the output's
//! `origin`, which later lets synthesis find the matching source field.

use tracing::{debug, trace};

use crate::types::{Field, FieldReverse, Struct, StructReverse};

pub type BoxedFieldMapper = Box<dyn FieldMapper + Send + Sync>;
pub type BoxedStructMapper = Box<dyn StructMapper + Send + Sync>;

pub trait FieldMapper {
    fn map(&self, field: Field) -> Vec<Field>;

    /// Maps `field` and rewrites each output against `origin`, the field that
    /// entered the pipeline.
    fn map_from(&self, field: Field, origin: &Field) -> Vec<Field> {
        self.map(field)
            .into_iter()
            .map(|out| rewrite_from_origin(out, origin))
            .collect()
    }

    /// Runs the mapper as a whole pipeline on `field`.
    fn apply(&self, field: Field) -> Vec<Field> {
        let origin = field.clone();
        self.map_from(field, &origin)
    }
}

impl<F: Fn(Field) -> Vec<Field>> FieldMapper for F {
    fn map(&self, field: Field) -> Vec<Field> {
        self(field)
    }
}

pub fn rewrite_from_origin(mut field: Field, origin: &Field) -> Field {
    if field.name.is_empty() {
        field.name = origin.name.clone();
    }
    if field.type_.is_empty() {
        field.type_ = origin.type_.clone();
    }
    field.origin = Some(origin.name.clone());
    field
}

/// Field mappers applied in order, each stage flat-mapped over the outputs
/// of the previous one.
#[derive(Default)]
pub struct Compose {
    stages: Vec<BoxedFieldMapper>,
}

impl Compose {
    pub fn new() -> Self {
        Compose::default()
    }

    pub fn then(mut self, stage: impl FieldMapper + Send + Sync + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

pub fn compose(stages: Vec<BoxedFieldMapper>) -> Compose {
    Compose { stages }
}

impl FieldMapper for Compose {
    fn map(&self, field: Field) -> Vec<Field> {
        let origin = field.clone();
        self.map_from(field, &origin)
    }

    /// Every stage is rewritten against the same `origin`, so nesting a
    /// `Compose` inside another gives the same result as flattening it.
    fn map_from(&self, field: Field, origin: &Field) -> Vec<Field> {
        if self.stages.is_empty() {
            return vec![rewrite_from_origin(field, origin)];
        }
        let mut current = vec![field];
        for (i, stage) in self.stages.iter().enumerate() {
            current = current
                .into_iter()
                .flat_map(|f| stage.map_from(f, origin))
                .collect();
            trace!(origin = %origin.name, stage = i, outputs = current.len(), "field stage");
        }
        current
    }
}

pub trait StructMapper {
    fn map(&self, record: Struct) -> Struct;
}

impl<F: Fn(Struct) -> Struct> StructMapper for F {
    fn map(&self, record: Struct) -> Struct {
        self(record)
    }
}

/// Struct mappers applied strictly left to right.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<BoxedStructMapper>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline::default()
    }

    pub fn then(mut self, stage: impl StructMapper + Send + Sync + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl StructMapper for Pipeline {
    fn map(&self, record: Struct) -> Struct {
        debug!(record = %record.name, stages = self.stages.len(), "running struct pipeline");
        self.stages.iter().fold(record, |acc, stage| stage.map(acc))
    }
}

/// Lifts a field mapper to a struct mapper; each field is its own pipeline input.
pub struct MapFields<M>(pub M);

impl<M: FieldMapper> StructMapper for MapFields<M> {
    fn map(&self, mut record: Struct) -> Struct {
        let fields = std::mem::take(&mut record.fields);
        record.fields = fields.into_iter().flat_map(|f| self.0.apply(f)).collect();
        record
    }
}

/// Attaches `step` as the first reverse step of `field`. Steps attached
/// earlier run on each of its outputs, so reverses undo in opposite order.
pub fn push_field_reverse(field: &mut Field, step: impl Fn(Field) -> Vec<Field> + Send + Sync + 'static) {
    let previous = field.reverse.take();
    field.reverse = Some(FieldReverse::new(move |mut f: Field| {
        f.reverse = None;
        step(f)
            .into_iter()
            .flat_map(|g| match &previous {
                Some(prev) => prev.call(g),
                None => vec![g],
            })
            .collect()
    }));
}

/// Struct counterpart of [`push_field_reverse`].
pub fn push_struct_reverse(record: &mut Struct, step: impl Fn(Struct) -> Struct + Send + Sync + 'static) {
    let previous = record.reverse.take();
    record.reverse = Some(StructReverse::new(move |mut s: Struct| {
        s.reverse = None;
        let s = step(s);
        match &previous {
            Some(prev) => prev.call(s),
            None => s,
        }
    }));
}
