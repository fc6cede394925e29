use std::cmp::Ordering;
use std::fmt;

use crate::error::RuntimeError;

/// A runtime value produced by evaluating an expression.
#[derive(Debug, Clone)]
pub enum RuntimeValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
    List(Vec<RuntimeValue>),
}

impl RuntimeValue {
    pub fn is_truthy(&self) -> bool {
        match self {
            RuntimeValue::Int(n) => *n != 0,
            RuntimeValue::Float(f) => *f != 0.0,
            RuntimeValue::Str(s) => !s.is_empty(),
            RuntimeValue::Bool(b) => *b,
            RuntimeValue::None => false,
            RuntimeValue::List(items) => !items.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RuntimeValue::Int(_) => "int",
            RuntimeValue::Float(_) => "float",
            RuntimeValue::Str(_) => "str",
            RuntimeValue::Bool(_) => "bool",
            RuntimeValue::None => "NoneType",
            RuntimeValue::List(_) => "list",
        }
    }

    /// Integer view of ints and bools.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            RuntimeValue::Int(n) => Some(*n),
            RuntimeValue::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// Float view of any numeric value.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RuntimeValue::Float(f) => Some(*f),
            other => other.as_int().map(|n| n as f64),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            RuntimeValue::Int(_) | RuntimeValue::Float(_) | RuntimeValue::Bool(_)
        )
    }

    /// The `repr()` form: strings quoted, everything else as displayed.
    pub fn repr(&self) -> String {
        match self {
            RuntimeValue::Str(s) => quote(s),
            other => other.to_string(),
        }
    }

    /// Order two values for `<`, `>`, `min`, `max` and `sorted`.
    pub fn compare(&self, other: &RuntimeValue, op: &str) -> Result<Ordering, RuntimeError> {
        match (self, other) {
            (a, b) if a.is_numeric() && b.is_numeric() => {
                if let (Some(x), Some(y)) = (a.as_int(), b.as_int()) {
                    return Ok(x.cmp(&y));
                }
                let (x, y) = (a.as_float().unwrap_or(f64::NAN), b.as_float().unwrap_or(f64::NAN));
                x.partial_cmp(&y).ok_or_else(|| {
                    RuntimeError::ValueError("cannot order NaN".to_string())
                })
            }
            (RuntimeValue::Str(a), RuntimeValue::Str(b)) => Ok(a.cmp(b)),
            (RuntimeValue::List(a), RuntimeValue::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    if x != y {
                        return x.compare(y, op);
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            _ => Err(RuntimeError::TypeError(format!(
                "'{}' not supported between instances of '{}' and '{}'",
                op,
                self.type_name(),
                other.type_name()
            ))),
        }
    }
}

impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeValue::Int(n) => write!(f, "{}", n),
            RuntimeValue::Float(x) => write!(f, "{}", format_float(*x)),
            RuntimeValue::Str(s) => write!(f, "{}", s),
            RuntimeValue::Bool(true) => write!(f, "True"),
            RuntimeValue::Bool(false) => write!(f, "False"),
            RuntimeValue::None => write!(f, "None"),
            RuntimeValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item.repr())?;
                }
                write!(f, "]")
            }
        }
    }
}

impl PartialEq for RuntimeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (a, b) if a.is_numeric() && b.is_numeric() => match (a.as_int(), b.as_int()) {
                (Some(x), Some(y)) => x == y,
                _ => a.as_float() == b.as_float(), // NaN != NaN per IEEE 754
            },
            (RuntimeValue::Str(a), RuntimeValue::Str(b)) => a == b,
            (RuntimeValue::None, RuntimeValue::None) => true,
            (RuntimeValue::List(a), RuntimeValue::List(b)) => a == b,
            _ => false,
        }
    }
}

/// Shortest round-trip form with a `.0` on integral values and
/// two-digit exponents, matching how floats are usually printed.
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let abs = x.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let sci = format!("{:e}", x);
        let Some((mantissa, exponent)) = sci.split_once('e') else {
            return sci;
        };
        let (sign, digits) = match exponent.strip_prefix('-') {
            Some(digits) => ('-', digits),
            None => ('+', exponent),
        };
        return format!("{}e{}{:0>2}", mantissa, sign, digits);
    }

    if x.fract() == 0.0 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}

fn quote(s: &str) -> String {
    let delimiter = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delimiter);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delimiter);
    out
}
