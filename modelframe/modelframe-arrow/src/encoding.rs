use std::{fmt, str::FromStr};

/// How [`Evaluation::x`](crate::Evaluation::x) expands a categorical main effect
/// with `k` declared levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoricalEncoding {
    /// One column holding the level code `0..k-1`.
    Ordinal,
    /// `k` indicator columns named `{column}_{level}`.
    OneHot,
    /// `k-1` indicator columns; the first declared level is the reference.
    #[default]
    Dummy,
}

impl CategoricalEncoding {
    /// Number of design columns produced for `levels` levels.
    pub fn width(&self, levels: usize) -> usize {
        match self {
            CategoricalEncoding::Ordinal => 1,
            CategoricalEncoding::OneHot => levels,
            CategoricalEncoding::Dummy => levels.saturating_sub(1),
        }
    }
}

impl FromStr for CategoricalEncoding {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "ordinal" => Ok(Self::Ordinal),
            "one-hot" | "onehot" => Ok(Self::OneHot),
            "dummy" => Ok(Self::Dummy),
            _ => Err(format!(
                "invalid categorical encoding '{raw}': expected one of ordinal, one-hot, dummy"
            )),
        }
    }
}

impl fmt::Display for CategoricalEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CategoricalEncoding::Ordinal => "ordinal",
            CategoricalEncoding::OneHot => "one-hot",
            CategoricalEncoding::Dummy => "dummy",
        })
    }
}
