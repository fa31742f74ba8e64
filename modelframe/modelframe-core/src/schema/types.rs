use std::{
    collections::HashSet,
    fmt::{Display, Formatter, Result},
    ops::Deref,
    str::FromStr,
};

use crate::error::SchemaError;

/// Logical column type.
///
/// `Categorical` carries its levels in declared order; that order defines the
/// integer codes `0..k-1` used for label encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataTypeDef {
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    String,
    Categorical(Vec<String>),
}

impl DataTypeDef {
    /// Convenience constructor for a categorical type.
    pub fn categorical<I, S>(levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DataTypeDef::Categorical(levels.into_iter().map(Into::into).collect())
    }

    /// `true` for types that evaluate directly to a number (booleans count as 0/1).
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataTypeDef::Bool
                | DataTypeDef::I8
                | DataTypeDef::I16
                | DataTypeDef::I32
                | DataTypeDef::I64
                | DataTypeDef::F32
                | DataTypeDef::F64
        )
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, DataTypeDef::Categorical(_))
    }

    /// Declared levels of a categorical type.
    pub fn levels(&self) -> Option<&[String]> {
        match self {
            DataTypeDef::Categorical(levels) => Some(levels),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            DataTypeDef::Bool => "bool",
            DataTypeDef::I8 => "i8",
            DataTypeDef::I16 => "i16",
            DataTypeDef::I32 => "i32",
            DataTypeDef::I64 => "i64",
            DataTypeDef::F32 => "f32",
            DataTypeDef::F64 => "f64",
            DataTypeDef::String => "string",
            DataTypeDef::Categorical(_) => "categorical",
        }
    }
}

impl Display for DataTypeDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            DataTypeDef::Categorical(levels) => write!(f, "categorical[{}]", levels.join(",")),
            other => f.write_str(other.type_name()),
        }
    }
}

/// Parses the names produced by [`DataTypeDef::type_name`], plus
/// `categorical[a,b,c]` for categoricals.
impl FromStr for DataTypeDef {
    type Err = SchemaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let ty = match s.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => DataTypeDef::Bool,
            "i8" | "int8" => DataTypeDef::I8,
            "i16" | "int16" => DataTypeDef::I16,
            "i32" | "int32" => DataTypeDef::I32,
            "i64" | "int64" => DataTypeDef::I64,
            "f32" | "float32" => DataTypeDef::F32,
            "f64" | "float64" => DataTypeDef::F64,
            "string" => DataTypeDef::String,
            _ => {
                let levels = s
                    .strip_prefix("categorical[")
                    .and_then(|rest| rest.strip_suffix(']'))
                    .ok_or_else(|| SchemaError::UnknownType(s.to_string()))?;
                DataTypeDef::categorical(
                    levels
                        .split(',')
                        .map(str::trim)
                        .filter(|level| !level.is_empty()),
                )
            }
        };
        Ok(ty)
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDef {
    pub name: String,
    pub data_type: DataTypeDef,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, data_type: DataTypeDef) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered sequence of [`FieldDef`] with unique names.
///
/// Immutable once constructed; categorical fields are checked for at least one
/// level and no repeated levels.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema(Vec<FieldDef>);

impl Schema {
    pub fn new(fields: Vec<FieldDef>) -> std::result::Result<Self, SchemaError> {
        let mut names = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !names.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
            if let DataTypeDef::Categorical(levels) = &field.data_type {
                check_levels(&field.name, levels)?;
            }
        }
        Ok(Self(fields))
    }

    pub fn as_slice(&self) -> &[FieldDef] {
        &self.0
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.0.iter().find(|f| f.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|f| f.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|f| f.name.as_str())
    }
}

fn check_levels(field: &str, levels: &[String]) -> std::result::Result<(), SchemaError> {
    if levels.is_empty() {
        return Err(SchemaError::EmptyLevels {
            field: field.to_string(),
        });
    }
    let mut seen = HashSet::with_capacity(levels.len());
    for level in levels {
        if !seen.insert(level.as_str()) {
            return Err(SchemaError::DuplicateLevel {
                field: field.to_string(),
                level: level.clone(),
            });
        }
    }
    Ok(())
}

impl TryFrom<Vec<FieldDef>> for Schema {
    type Error = SchemaError;

    fn try_from(value: Vec<FieldDef>) -> std::result::Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Schema> for Vec<FieldDef> {
    fn from(value: Schema) -> Self {
        value.0
    }
}

impl AsRef<[FieldDef]> for Schema {
    fn as_ref(&self) -> &[FieldDef] {
        self.as_slice()
    }
}

impl Deref for Schema {
    type Target = [FieldDef];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let text = super::format_schema(self.as_slice())?;
        f.write_str(&text)
    }
}
