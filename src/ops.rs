use std::f64::consts::FRAC_PI_2;

/// Represents an operator that can appear in an expression tree.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OpKind {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Sin,
    Cos,
    Tan,
    Cot,
    Log,
    Ln,
    Asin,
    Acos,
    Atan,
    Acot,
    Sinh,
    Cosh,
    Tanh,
    Coth,
}

use OpKind::*;

/// Static metadata describing one operator: how it is spelled, how many
/// children it takes, its precedence rank for bracket decisions, and whether
/// rendering should treat it as a named function.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OpInfo {
    pub kind: OpKind,
    pub symbol: &'static str,
    pub alias: Option<&'static str>,
    pub arity: u8,
    pub precedence: u8,
    pub is_function: bool,
}

const fn info(
    kind: OpKind,
    symbol: &'static str,
    alias: Option<&'static str>,
    arity: u8,
    precedence: u8,
    is_function: bool,
) -> OpInfo {
    OpInfo {
        kind,
        symbol,
        alias,
        arity,
        precedence,
        is_function,
    }
}

/// Indexed by `OpKind as usize`.
pub const OP_TABLE: [OpInfo; 19] = [
    info(Add, "+", None, 2, 1, false),
    info(Sub, "-", None, 2, 1, false),
    info(Mul, "*", None, 2, 2, false),
    info(Div, "/", None, 2, 2, false),
    info(Pow, "^", None, 2, 3, false),
    info(Sin, "sin", None, 1, 3, true),
    info(Cos, "cos", None, 1, 3, true),
    info(Tan, "tan", Some("tg"), 1, 3, true),
    info(Cot, "cot", Some("ctg"), 1, 3, true),
    info(Log, "log", None, 2, 3, true),
    info(Ln, "ln", None, 1, 3, true),
    info(Asin, "arcsin", None, 1, 3, true),
    info(Acos, "arccos", None, 1, 3, true),
    info(Atan, "arctan", Some("arctg"), 1, 3, true),
    info(Acot, "arccot", Some("arcctg"), 1, 3, true),
    info(Sinh, "sinh", Some("sh"), 1, 3, true),
    info(Cosh, "cosh", Some("ch"), 1, 3, true),
    info(Tanh, "tanh", Some("th"), 1, 3, true),
    info(Coth, "coth", Some("cth"), 1, 3, true),
];

impl OpKind {
    pub fn info(&self) -> &'static OpInfo {
        &OP_TABLE[*self as usize]
    }

    pub fn symbol(&self) -> &'static str {
        self.info().symbol
    }

    pub fn arity(&self) -> u8 {
        self.info().arity
    }

    pub fn precedence(&self) -> u8 {
        self.info().precedence
    }

    pub fn is_function(&self) -> bool {
        self.info().is_function
    }

    /// Look an operator up by its symbol or its textual alias.
    pub fn from_token(token: &str) -> Option<OpKind> {
        OP_TABLE
            .iter()
            .find(|i| i.symbol == token || i.alias == Some(token))
            .map(|i| i.kind)
    }

    /// Numeric evaluation rule. Binary operators use both `a` (left) and `b`
    /// (right); unary operators use `a` only. `log` takes its base in `a`.
    pub fn apply(&self, a: f64, b: f64) -> f64 {
        match self {
            Add => a + b,
            Sub => a - b,
            Mul => a * b,
            Div => a / b,
            Pow => a.powf(b),
            Sin => a.sin(),
            Cos => a.cos(),
            Tan => a.tan(),
            Cot => 1.0 / a.tan(),
            Log => b.ln() / a.ln(),
            Ln => a.ln(),
            Asin => a.asin(),
            Acos => a.acos(),
            Atan => a.atan(),
            Acot => FRAC_PI_2 - a.atan(),
            Sinh => a.sinh(),
            Cosh => a.cosh(),
            Tanh => a.tanh(),
            Coth => 1.0 / a.tanh(),
        }
    }
}

/// Epsilon comparison for folded floating point results.
pub fn float_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < f64::EPSILON
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::assert_float_eq;

    #[test]
    fn t_token_lookup() {
        assert_eq!(OpKind::from_token("+"), Some(Add));
        assert_eq!(OpKind::from_token("sin"), Some(Sin));
        assert_eq!(OpKind::from_token("tg"), Some(Tan));
        assert_eq!(OpKind::from_token("ctg"), Some(Cot));
        assert_eq!(OpKind::from_token("arcctg"), Some(Acot));
        assert_eq!(OpKind::from_token("sh"), Some(Sinh));
        assert_eq!(OpKind::from_token("cth"), Some(Coth));
        assert_eq!(OpKind::from_token("frobnicate"), None);
        assert_eq!(OpKind::from_token(""), None);
    }

    #[test]
    fn t_metadata() {
        assert_eq!(Add.arity(), 2);
        assert_eq!(Log.arity(), 2);
        assert_eq!(Sin.arity(), 1);
        assert_eq!(Ln.arity(), 1);
        assert!(Add.precedence() < Mul.precedence());
        assert!(Mul.precedence() < Pow.precedence());
        assert_eq!(Add.precedence(), Sub.precedence());
        assert!(!Pow.is_function());
        assert!(Sin.is_function());
        assert!(Log.is_function());
        for (i, entry) in OP_TABLE.iter().enumerate() {
            assert_eq!(entry.kind as usize, i);
        }
    }

    #[test]
    fn t_apply() {
        assert_float_eq!(Add.apply(2.0, 3.0), 5.0);
        assert_float_eq!(Sub.apply(2.0, 3.0), -1.0);
        assert_float_eq!(Mul.apply(2.0, 3.0), 6.0);
        assert_float_eq!(Div.apply(3.0, 2.0), 1.5);
        assert_float_eq!(Pow.apply(2.0, 10.0), 1024.0);
        assert_float_eq!(Sin.apply(0.0, f64::NAN), 0.0);
        assert_float_eq!(Cos.apply(0.0, f64::NAN), 1.0);
        assert_float_eq!(Cot.apply(FRAC_PI_2, f64::NAN), 0.0, 1e-15);
        // log with the base on the left
        assert_float_eq!(Log.apply(2.0, 8.0), 3.0, 1e-15);
        assert_float_eq!(Ln.apply(std::f64::consts::E, f64::NAN), 1.0, 1e-15);
        assert_float_eq!(Acot.apply(1.0, f64::NAN), FRAC_PI_2 - 1.0f64.atan());
        assert_float_eq!(Coth.apply(1.0, f64::NAN), 1.0 / 1.0f64.tanh());
    }

    #[test]
    fn t_float_equal() {
        assert!(float_equal(0.0, 0.0));
        assert!(float_equal(1.0, 1.0 + f64::EPSILON / 2.0));
        assert!(!float_equal(1.0, 1.0 + 1e-9));
    }
}
