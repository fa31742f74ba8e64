use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema};
use arrow::record_batch::RecordBatch;
use modelframe_core::{DataTypeDef, FieldDef, Schema};

use crate::error::EvalError;

// ---------------------------------------------------------------------------
// modelframe schema -> Arrow schema
// ---------------------------------------------------------------------------

/// Converts a modelframe [`Schema`] into an Arrow schema.
///
/// Categorical fields become `Dictionary(Int32, Utf8)`; every field is nullable.
pub fn schema_to_arrow_schema(schema: &Schema) -> ArrowSchema {
    let fields: Vec<Field> = schema.iter().map(field_def_to_arrow_field).collect();
    ArrowSchema::new(fields)
}

pub(crate) fn field_def_to_arrow_field(f: &FieldDef) -> Field {
    Field::new(&f.name, data_type_to_arrow(&f.data_type), true)
}

/// Arrow type used for columns of `data_type` in produced batches.
pub fn data_type_to_arrow(data_type: &DataTypeDef) -> DataType {
    match data_type {
        DataTypeDef::Bool => DataType::Boolean,
        DataTypeDef::I8 => DataType::Int8,
        DataTypeDef::I16 => DataType::Int16,
        DataTypeDef::I32 => DataType::Int32,
        DataTypeDef::I64 => DataType::Int64,
        DataTypeDef::F32 => DataType::Float32,
        DataTypeDef::F64 => DataType::Float64,
        DataTypeDef::String => DataType::Utf8,
        DataTypeDef::Categorical(_) => {
            DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8))
        }
    }
}

// ---------------------------------------------------------------------------
// Arrow batch -> modelframe schema
// ---------------------------------------------------------------------------

/// Derives a [`Schema`] from the columns of `batch`.
///
/// Dictionary-encoded string columns become categoricals whose levels are the
/// non-null dictionary values in dictionary order. Plain string columns stay
/// `string`.
///
/// # Errors
///
/// [`EvalError::UnsupportedArrowType`] for column types with no modelframe
/// counterpart, [`EvalError::Schema`] for an empty or repeated dictionary.
pub fn schema_from_record_batch(batch: &RecordBatch) -> Result<Schema, EvalError> {
    let arrow_schema = batch.schema();
    let mut fields = Vec::with_capacity(batch.num_columns());
    for (field, column) in arrow_schema.fields().iter().zip(batch.columns()) {
        let data_type = match field.data_type() {
            DataType::Dictionary(_, value) if is_string_type(value) => {
                DataTypeDef::Categorical(dictionary_levels(field, column.as_ref())?)
            }
            other => arrow_to_data_type(other).ok_or_else(|| unsupported(field))?,
        };
        fields.push(FieldDef::new(field.name().clone(), data_type));
    }
    Ok(Schema::new(fields)?)
}

fn arrow_to_data_type(data_type: &DataType) -> Option<DataTypeDef> {
    let converted = match data_type {
        DataType::Boolean => DataTypeDef::Bool,
        DataType::Int8 => DataTypeDef::I8,
        DataType::Int16 => DataTypeDef::I16,
        DataType::Int32 => DataTypeDef::I32,
        DataType::Int64 => DataTypeDef::I64,
        DataType::Float32 => DataTypeDef::F32,
        DataType::Float64 => DataTypeDef::F64,
        DataType::Utf8 | DataType::LargeUtf8 => DataTypeDef::String,
        _ => return None,
    };
    Some(converted)
}

fn dictionary_levels(field: &Field, column: &dyn Array) -> Result<Vec<String>, EvalError> {
    let dictionary = column
        .as_any_dictionary_opt()
        .ok_or_else(|| unsupported(field))?;
    let values = dictionary.values();
    let levels: Vec<String> = if let Some(strings) = values.as_string_opt::<i32>() {
        strings.iter().flatten().map(str::to_owned).collect()
    } else if let Some(strings) = values.as_string_opt::<i64>() {
        strings.iter().flatten().map(str::to_owned).collect()
    } else {
        return Err(unsupported(field));
    };
    Ok(levels)
}

pub(crate) fn is_string_type(data_type: &DataType) -> bool {
    matches!(data_type, DataType::Utf8 | DataType::LargeUtf8)
}

fn unsupported(field: &Field) -> EvalError {
    EvalError::UnsupportedArrowType {
        column: field.name().clone(),
        data_type: field.data_type().to_string(),
    }
}
