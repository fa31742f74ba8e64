//! Input columns decoded once per evaluation.

use std::collections::HashMap;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use modelframe_core::{DataTypeDef, FieldDef};

use crate::{
    error::EvalError,
    schema_convert::{data_type_to_arrow, is_string_type},
};

pub(crate) enum SourceColumn {
    /// Values as `f64`, nulls as NaN. `array` is the column as it arrived.
    Numeric { array: ArrayRef, values: Vec<f64> },
    /// Index into the declared levels; `None` for nulls and unknown labels.
    Factor { codes: Vec<Option<u32>> },
}

impl SourceColumn {
    pub(crate) fn decode(field: &FieldDef, array: &ArrayRef) -> Result<Self, EvalError> {
        check_compatible(field, array.data_type())?;
        match &field.data_type {
            DataTypeDef::Categorical(levels) => {
                let labels = cast(array, &DataType::Utf8)?;
                let labels = labels
                    .as_string_opt::<i32>()
                    .ok_or_else(|| unsupported(field, array))?;
                let index: HashMap<&str, u32> = levels
                    .iter()
                    .zip(0u32..)
                    .map(|(level, code)| (level.as_str(), code))
                    .collect();
                let codes = labels
                    .iter()
                    .map(|label| label.and_then(|l| index.get(l).copied()))
                    .collect();
                Ok(SourceColumn::Factor { codes })
            }
            _ => {
                let floats = cast(array, &DataType::Float64)?;
                let floats = floats
                    .as_primitive_opt::<Float64Type>()
                    .ok_or_else(|| unsupported(field, array))?;
                let values = floats.iter().map(|v| v.unwrap_or(f64::NAN)).collect();
                Ok(SourceColumn::Numeric {
                    array: array.clone(),
                    values,
                })
            }
        }
    }
}

/// Numeric fields need the exact Arrow type; categorical fields accept string
/// labels, plain or dictionary-encoded.
pub(crate) fn check_compatible(field: &FieldDef, found: &DataType) -> Result<(), EvalError> {
    let ok = match &field.data_type {
        DataTypeDef::Categorical(_) => match found {
            DataType::Dictionary(key, value) => {
                key.is_dictionary_key_type() && is_string_type(value)
            }
            other => is_string_type(other),
        },
        other => *found == data_type_to_arrow(other),
    };
    if ok {
        Ok(())
    } else {
        Err(mismatch(field, found.to_string()))
    }
}

pub(crate) fn mismatch(field: &FieldDef, found: String) -> EvalError {
    let expected = match &field.data_type {
        DataTypeDef::Categorical(_) => "Utf8 or Dictionary(_, Utf8)".to_string(),
        other => data_type_to_arrow(other).to_string(),
    };
    EvalError::SchemaMismatch {
        column: field.name.clone(),
        expected,
        found,
    }
}

fn unsupported(field: &FieldDef, array: &ArrayRef) -> EvalError {
    EvalError::UnsupportedArrowType {
        column: field.name.clone(),
        data_type: array.data_type().to_string(),
    }
}
