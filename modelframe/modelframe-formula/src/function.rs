//! Elementwise functions available as `name(term)` in formulas.

use std::fmt::{Display, Formatter, Result};

/// Elementwise `f64 -> f64` function. NaN inputs yield NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathFunction {
    Abs,
    Ceil,
    Floor,
    /// Rounds half away from zero.
    Round,
    /// Rounds half to even.
    Rint,
    Exp,
    Expm1,
    Log,
    Log1p,
    Log2,
    Log10,
    Sqrt,
    Cbrt,
    /// `-1`, `0` or `1`; zero keeps its sign.
    Signum,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
}

impl MathFunction {
    pub const ALL: [MathFunction; 23] = [
        MathFunction::Abs,
        MathFunction::Ceil,
        MathFunction::Floor,
        MathFunction::Round,
        MathFunction::Rint,
        MathFunction::Exp,
        MathFunction::Expm1,
        MathFunction::Log,
        MathFunction::Log1p,
        MathFunction::Log2,
        MathFunction::Log10,
        MathFunction::Sqrt,
        MathFunction::Cbrt,
        MathFunction::Signum,
        MathFunction::Sin,
        MathFunction::Cos,
        MathFunction::Tan,
        MathFunction::Asin,
        MathFunction::Acos,
        MathFunction::Atan,
        MathFunction::Sinh,
        MathFunction::Cosh,
        MathFunction::Tanh,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            MathFunction::Abs => "abs",
            MathFunction::Ceil => "ceil",
            MathFunction::Floor => "floor",
            MathFunction::Round => "round",
            MathFunction::Rint => "rint",
            MathFunction::Exp => "exp",
            MathFunction::Expm1 => "expm1",
            MathFunction::Log => "log",
            MathFunction::Log1p => "log1p",
            MathFunction::Log2 => "log2",
            MathFunction::Log10 => "log10",
            MathFunction::Sqrt => "sqrt",
            MathFunction::Cbrt => "cbrt",
            MathFunction::Signum => "signum",
            MathFunction::Sin => "sin",
            MathFunction::Cos => "cos",
            MathFunction::Tan => "tan",
            MathFunction::Asin => "asin",
            MathFunction::Acos => "acos",
            MathFunction::Atan => "atan",
            MathFunction::Sinh => "sinh",
            MathFunction::Cosh => "cosh",
            MathFunction::Tanh => "tanh",
        }
    }

    pub fn apply(&self, x: f64) -> f64 {
        match self {
            MathFunction::Abs => x.abs(),
            MathFunction::Ceil => x.ceil(),
            MathFunction::Floor => x.floor(),
            MathFunction::Round => x.round(),
            MathFunction::Rint => x.round_ties_even(),
            MathFunction::Exp => x.exp(),
            MathFunction::Expm1 => x.exp_m1(),
            MathFunction::Log => x.ln(),
            MathFunction::Log1p => x.ln_1p(),
            MathFunction::Log2 => x.log2(),
            MathFunction::Log10 => x.log10(),
            MathFunction::Sqrt => x.sqrt(),
            MathFunction::Cbrt => x.cbrt(),
            MathFunction::Signum if x == 0.0 => x,
            MathFunction::Signum => x.signum(),
            MathFunction::Sin => x.sin(),
            MathFunction::Cos => x.cos(),
            MathFunction::Tan => x.tan(),
            MathFunction::Asin => x.asin(),
            MathFunction::Acos => x.acos(),
            MathFunction::Atan => x.atan(),
            MathFunction::Sinh => x.sinh(),
            MathFunction::Cosh => x.cosh(),
            MathFunction::Tanh => x.tanh(),
        }
    }
}

impl Display for MathFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for f in MathFunction::ALL {
            assert_eq!(MathFunction::from_name(f.name()), Some(f));
        }
        assert_eq!(MathFunction::from_name("Log"), None);
        assert_eq!(MathFunction::from_name("pow"), None);
    }

    #[test]
    fn rounding_and_sign_edge_cases() {
        assert_eq!(MathFunction::Rint.apply(2.5), 2.0);
        assert_eq!(MathFunction::Round.apply(2.5), 3.0);
        assert_eq!(MathFunction::Signum.apply(0.0), 0.0);
        assert_eq!(MathFunction::Signum.apply(-3.0), -1.0);
        assert!(MathFunction::Signum.apply(f64::NAN).is_nan());
        assert!(MathFunction::Log.apply(f64::NAN).is_nan());
    }
}
