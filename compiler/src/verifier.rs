use std::collections::HashSet;

use crate::{
    error::ConvertError,
    types::Struct,
    utils::{is_identifier, quote},
};

/// Returns `Ok(())` if `record` can be used for synthesis, or
/// `Err(ConvertError::VerifierError(_))` otherwise.
pub fn verify_struct(record: &Struct) -> Result<(), ConvertError> {
    if !is_identifier(&record.name) {
        return Err(ConvertError::VerifierError(format!(
            "The struct name {} is not an identifier",
            quote(&record.name)
        )));
    }

    let mut type_params = HashSet::new();
    for param in &record.type_params {
        if !is_identifier(&param.name) {
            return Err(ConvertError::VerifierError(format!(
                "The type parameter {} of {} is not an identifier",
                quote(&param.name),
                quote(&record.name)
            )));
        }
        if !type_params.insert(param.name.as_str()) {
            return Err(ConvertError::VerifierError(format!(
                "The type parameter {} is declared twice in {}",
                quote(&param.name),
                quote(&record.name)
            )));
        }
    }

    let mut fields = HashSet::new();
    for field in &record.fields {
        if !is_identifier(&field.name) {
            return Err(ConvertError::VerifierError(format!(
                "The field name {} in {} is not an identifier",
                quote(&field.name),
                quote(&record.name)
            )));
        }
        if field.type_.trim().is_empty() {
            return Err(ConvertError::VerifierError(format!(
                "The field {} in {} has no type",
                quote(&field.name),
                quote(&record.name)
            )));
        }
        if !fields.insert(field.name.as_str()) {
            return Err(ConvertError::VerifierError(format!(
                "The field {} is defined twice in {}",
                quote(&field.name),
                quote(&record.name)
            )));
        }
    }

    Ok(())
}
