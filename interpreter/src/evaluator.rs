use std::io::Write;

use crate::ast::{BinaryOperator, Expr, FStringPart, LogicalOperator, UnaryOperator};
use crate::builtins;
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::runtime_value::RuntimeValue;

const MAX_DEPTH: usize = 256;

/// Longest string or list a repetition may build.
const MAX_SEQUENCE_LEN: usize = 10_000_000;

/// Evaluate an expression to produce a RuntimeValue.
///
/// `output` receives whatever `print` writes while the expression runs.
pub fn evaluate(
    expr: &Expr,
    env: &Environment,
    output: &mut dyn Write,
    depth: usize,
) -> Result<RuntimeValue, RuntimeError> {
    if depth > MAX_DEPTH {
        return Err(RuntimeError::RecursionLimit);
    }

    match expr {
        // --- Literals ---
        Expr::IntLiteral(n) => Ok(RuntimeValue::Int(*n)),
        Expr::FloatLiteral(f) => Ok(RuntimeValue::Float(*f)),
        Expr::StringLiteral(s) => Ok(RuntimeValue::Str(s.clone())),
        Expr::BooleanLiteral(b) => Ok(RuntimeValue::Bool(*b)),
        Expr::NoneLiteral => Ok(RuntimeValue::None),

        Expr::FString(parts) => {
            let mut result = String::new();
            for part in parts {
                match part {
                    FStringPart::Literal(s) => result.push_str(s),
                    FStringPart::Expression { value, repr, spec } => {
                        let val = evaluate(value, env, output, depth + 1)?;
                        let val = if *repr {
                            RuntimeValue::Str(val.repr())
                        } else {
                            val
                        };
                        match spec {
                            Some(spec) => result.push_str(&format_with_spec(&val, spec)?),
                            None => result.push_str(&val.to_string()),
                        }
                    }
                }
            }
            Ok(RuntimeValue::Str(result))
        }

        Expr::List(items) => {
            let values = items
                .iter()
                .map(|item| evaluate(item, env, output, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(RuntimeValue::List(values))
        }

        // --- References ---
        Expr::Name(name) => env
            .get_variable(name)
            .cloned()
            .ok_or_else(|| RuntimeError::NameError(name.clone())),

        // --- Operations ---
        Expr::UnaryOperation { operator, operand } => {
            let val = evaluate(operand, env, output, depth + 1)?;
            match operator {
                UnaryOperator::LogicalNot => Ok(RuntimeValue::Bool(!val.is_truthy())),
                UnaryOperator::Negation => match val {
                    RuntimeValue::Float(f) => Ok(RuntimeValue::Float(-f)),
                    ref other => match other.as_int() {
                        Some(n) => n
                            .checked_neg()
                            .map(RuntimeValue::Int)
                            .ok_or(RuntimeError::Overflow),
                        None => Err(RuntimeError::TypeError(format!(
                            "bad operand type for unary -: '{}'",
                            other.type_name()
                        ))),
                    },
                },
            }
        }

        Expr::BinaryOperation {
            operator,
            left,
            right,
        } => {
            let l = evaluate(left, env, output, depth + 1)?;
            let r = evaluate(right, env, output, depth + 1)?;
            eval_binary_op(*operator, &l, &r)
        }

        Expr::LogicalOperation {
            operator,
            left,
            right,
        } => {
            let l = evaluate(left, env, output, depth + 1)?;
            let short_circuit = match operator {
                LogicalOperator::And => !l.is_truthy(),
                LogicalOperator::Or => l.is_truthy(),
            };
            if short_circuit {
                Ok(l)
            } else {
                evaluate(right, env, output, depth + 1)
            }
        }

        // --- Conditional ---
        Expr::Conditional {
            condition,
            true_branch,
            false_branch,
        } => {
            let cond_val = evaluate(condition, env, output, depth + 1)?;
            if cond_val.is_truthy() {
                evaluate(true_branch, env, output, depth + 1)
            } else {
                evaluate(false_branch, env, output, depth + 1)
            }
        }

        Expr::Index { target, index } => {
            let target = evaluate(target, env, output, depth + 1)?;
            let index = evaluate(index, env, output, depth + 1)?;
            eval_index(&target, &index)
        }

        // --- Invocations ---
        Expr::Call {
            function,
            args,
            kwargs,
        } => {
            if let Some(shadowing) = env.get_variable(function) {
                return Err(RuntimeError::TypeError(format!(
                    "'{}' object is not callable",
                    shadowing.type_name()
                )));
            }
            let (args, kwargs) = evaluate_arguments(args, kwargs, env, output, depth)?;
            builtins::call_function(function, args, kwargs, output)
        }

        Expr::MethodCall {
            receiver,
            method,
            args,
            kwargs,
        } => {
            let receiver = evaluate(receiver, env, output, depth + 1)?;
            let (args, kwargs) = evaluate_arguments(args, kwargs, env, output, depth)?;
            builtins::call_method(&receiver, method, args, kwargs)
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type Keywords = Vec<(String, RuntimeValue)>;

fn evaluate_arguments(
    args: &[Expr],
    kwargs: &[(String, Expr)],
    env: &Environment,
    output: &mut dyn Write,
    depth: usize,
) -> Result<(Vec<RuntimeValue>, Keywords), RuntimeError> {
    let args = args
        .iter()
        .map(|a| evaluate(a, env, output, depth + 1))
        .collect::<Result<Vec<_>, _>>()?;
    let kwargs = kwargs
        .iter()
        .map(|(name, value)| {
            evaluate(value, env, output, depth + 1).map(|v| (name.clone(), v))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((args, kwargs))
}

fn unsupported(op: BinaryOperator, left: &RuntimeValue, right: &RuntimeValue) -> RuntimeError {
    RuntimeError::TypeError(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

/// Apply a binary operator; also used by augmented assignment.
pub fn eval_binary_op(
    op: BinaryOperator,
    left: &RuntimeValue,
    right: &RuntimeValue,
) -> Result<RuntimeValue, RuntimeError> {
    use RuntimeValue::{Float, Int, List, Str};

    match op {
        BinaryOperator::Addition => match (left, right) {
            (Str(a), Str(b)) => Ok(Str(format!("{}{}", a, b))),
            (List(a), List(b)) => Ok(List(a.iter().chain(b).cloned().collect())),
            _ => numeric_binop(op, left, right, i64::checked_add, |a, b| a + b),
        },
        BinaryOperator::Subtraction => {
            numeric_binop(op, left, right, i64::checked_sub, |a, b| a - b)
        }
        BinaryOperator::Multiplication => match (left, right) {
            (Str(s), n) | (n, Str(s)) if n.as_int().is_some() => {
                let count = repeat_count(n.as_int().unwrap_or(0), s.len())?;
                Ok(Str(s.repeat(count)))
            }
            (List(items), n) | (n, List(items)) if n.as_int().is_some() => {
                let count = repeat_count(n.as_int().unwrap_or(0), items.len())?;
                Ok(List(std::iter::repeat_n(items, count).flatten().cloned().collect()))
            }
            _ => numeric_binop(op, left, right, i64::checked_mul, |a, b| a * b),
        },
        BinaryOperator::Division => {
            let (a, b) = float_operands(op, left, right)?;
            if b == 0.0 {
                return Err(RuntimeError::ZeroDivision("division by zero".into()));
            }
            Ok(Float(a / b))
        }
        BinaryOperator::FloorDivision => {
            if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
                if b == 0 {
                    return Err(RuntimeError::ZeroDivision(
                        "integer division or modulo by zero".into(),
                    ));
                }
                let q = a.checked_div(b).ok_or(RuntimeError::Overflow)?;
                let q = if a % b != 0 && ((a < 0) != (b < 0)) { q - 1 } else { q };
                return Ok(Int(q));
            }
            let (a, b) = float_operands(op, left, right)?;
            if b == 0.0 {
                return Err(RuntimeError::ZeroDivision("float floor division by zero".into()));
            }
            Ok(Float((a / b).floor()))
        }
        BinaryOperator::Modulo => {
            if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
                if b == 0 {
                    return Err(RuntimeError::ZeroDivision("integer modulo by zero".into()));
                }
                let r = a.checked_rem(b).ok_or(RuntimeError::Overflow)?;
                let r = if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r };
                return Ok(Int(r));
            }
            let (a, b) = float_operands(op, left, right)?;
            if b == 0.0 {
                return Err(RuntimeError::ZeroDivision("float modulo by zero".into()));
            }
            let r = a % b;
            Ok(Float(if r != 0.0 && ((r < 0.0) != (b < 0.0)) { r + b } else { r }))
        }
        BinaryOperator::Power => {
            if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
                if b >= 0 {
                    let exp = u32::try_from(b).map_err(|_| RuntimeError::Overflow)?;
                    return a.checked_pow(exp).map(Int).ok_or(RuntimeError::Overflow);
                }
                if a == 0 {
                    return Err(RuntimeError::ZeroDivision(
                        "0.0 cannot be raised to a negative power".into(),
                    ));
                }
            }
            let (a, b) = float_operands(op, left, right)?;
            Ok(Float(a.powf(b)))
        }
        BinaryOperator::Equality => Ok(RuntimeValue::Bool(left == right)),
        BinaryOperator::Inequality => Ok(RuntimeValue::Bool(left != right)),
        BinaryOperator::GreaterThan => {
            Ok(RuntimeValue::Bool(left.compare(right, op.symbol())?.is_gt()))
        }
        BinaryOperator::LessThan => {
            Ok(RuntimeValue::Bool(left.compare(right, op.symbol())?.is_lt()))
        }
        BinaryOperator::GreaterThanOrEqual => {
            Ok(RuntimeValue::Bool(left.compare(right, op.symbol())?.is_ge()))
        }
        BinaryOperator::LessThanOrEqual => {
            Ok(RuntimeValue::Bool(left.compare(right, op.symbol())?.is_le()))
        }
        BinaryOperator::Contains => contains(left, right).map(RuntimeValue::Bool),
        BinaryOperator::NotContains => contains(left, right).map(|c| RuntimeValue::Bool(!c)),
    }
}

fn numeric_binop(
    op: BinaryOperator,
    left: &RuntimeValue,
    right: &RuntimeValue,
    int_op: impl Fn(i64, i64) -> Option<i64>,
    float_op: impl Fn(f64, f64) -> f64,
) -> Result<RuntimeValue, RuntimeError> {
    if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
        return int_op(a, b)
            .map(RuntimeValue::Int)
            .ok_or(RuntimeError::Overflow);
    }
    let (a, b) = float_operands(op, left, right)?;
    Ok(RuntimeValue::Float(float_op(a, b)))
}

fn float_operands(
    op: BinaryOperator,
    left: &RuntimeValue,
    right: &RuntimeValue,
) -> Result<(f64, f64), RuntimeError> {
    match (left.as_float(), right.as_float()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(unsupported(op, left, right)),
    }
}

fn repeat_count(n: i64, item_len: usize) -> Result<usize, RuntimeError> {
    let count = usize::try_from(n.max(0)).map_err(|_| RuntimeError::Overflow)?;
    if count.saturating_mul(item_len) > MAX_SEQUENCE_LEN {
        return Err(RuntimeError::ValueError("repeated sequence is too long".into()));
    }
    Ok(count)
}

fn contains(needle: &RuntimeValue, haystack: &RuntimeValue) -> Result<bool, RuntimeError> {
    match (needle, haystack) {
        (_, RuntimeValue::List(items)) => Ok(items.contains(needle)),
        (RuntimeValue::Str(n), RuntimeValue::Str(h)) => Ok(h.contains(n.as_str())),
        (other, RuntimeValue::Str(_)) => Err(RuntimeError::TypeError(format!(
            "'in <string>' requires string as left operand, not {}",
            other.type_name()
        ))),
        (_, other) => Err(RuntimeError::TypeError(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

/// Resolve a possibly negative index against a sequence of `len` items.
pub fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let idx = if index < 0 { index + len } else { index };
    (0..len).contains(&idx).then_some(idx as usize)
}

fn eval_index(target: &RuntimeValue, index: &RuntimeValue) -> Result<RuntimeValue, RuntimeError> {
    let kind = match target {
        RuntimeValue::List(_) => "list",
        RuntimeValue::Str(_) => "string",
        other => {
            return Err(RuntimeError::TypeError(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            )));
        }
    };
    let Some(i) = index.as_int() else {
        return Err(RuntimeError::TypeError(format!(
            "{} indices must be integers, not {}",
            kind,
            index.type_name()
        )));
    };
    let out_of_range = || RuntimeError::IndexError(format!("{} index out of range", kind));

    match target {
        RuntimeValue::List(items) => normalize_index(i, items.len())
            .map(|idx| items[idx].clone())
            .ok_or_else(out_of_range),
        RuntimeValue::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            normalize_index(i, chars.len())
                .map(|idx| RuntimeValue::Str(chars[idx].to_string()))
                .ok_or_else(out_of_range)
        }
        _ => Err(out_of_range()),
    }
}

/// Format a value per an f-string spec: `[[fill]align][0][width][,][.precision][type]`.
pub fn format_with_spec(value: &RuntimeValue, spec: &str) -> Result<String, RuntimeError> {
    let invalid = || RuntimeError::ValueError(format!("Invalid format specifier '{}'", spec));
    let chars: Vec<char> = spec.chars().collect();
    let mut i = 0;

    let mut fill = ' ';
    let mut align = None;
    if chars.len() >= 2 && matches!(chars[1], '<' | '>' | '^') {
        fill = chars[0];
        align = Some(chars[1]);
        i = 2;
    } else if chars.first().is_some_and(|c| matches!(c, '<' | '>' | '^')) {
        align = Some(chars[0]);
        i = 1;
    }
    if align.is_none() && chars.get(i) == Some(&'0') {
        fill = '0';
        align = Some('>');
        i += 1;
    }

    let width_start = i;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    let width: usize = chars[width_start..i]
        .iter()
        .collect::<String>()
        .parse()
        .unwrap_or(0);

    let grouping = chars.get(i) == Some(&',');
    if grouping {
        i += 1;
    }

    let mut precision = None;
    if chars.get(i) == Some(&'.') {
        i += 1;
        let start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        precision = Some(
            chars[start..i]
                .iter()
                .collect::<String>()
                .parse::<usize>()
                .map_err(|_| invalid())?,
        );
    }

    let kind = chars.get(i).copied();
    if kind.is_some() {
        i += 1;
    }
    if i != chars.len() {
        return Err(invalid());
    }

    let type_error = || {
        RuntimeError::ValueError(format!(
            "Unknown format code '{}' for object of type '{}'",
            kind.unwrap_or('?'),
            value.type_name()
        ))
    };

    let mut body = match kind {
        Some('f') | Some('%') => {
            let x = value.as_float().ok_or_else(type_error)?;
            let x = if kind == Some('%') { x * 100.0 } else { x };
            let text = format!("{:.*}", precision.unwrap_or(6), x);
            if kind == Some('%') { format!("{}%", text) } else { text }
        }
        Some('d') => match value {
            RuntimeValue::Float(_) => return Err(type_error()),
            other => other.as_int().ok_or_else(type_error)?.to_string(),
        },
        Some('s') | None => match (value, precision) {
            (RuntimeValue::Str(s), Some(p)) => s.chars().take(p).collect(),
            (RuntimeValue::Float(x), Some(p)) => format!("{:.*}", p, x),
            (RuntimeValue::Str(s), None) => s.clone(),
            (other, _) if kind == Some('s') => {
                return Err(RuntimeError::ValueError(format!(
                    "Unknown format code 's' for object of type '{}'",
                    other.type_name()
                )));
            }
            (other, None) => other.to_string(),
            (_, Some(_)) => return Err(invalid()),
        },
        Some(_) => return Err(type_error()),
    };

    if grouping {
        if !value.is_numeric() {
            return Err(RuntimeError::ValueError("Cannot specify ',' with 's'.".into()));
        }
        body = group_thousands(&body);
    }

    let len = body.chars().count();
    if len >= width {
        return Ok(body);
    }
    let pad = width - len;
    let align = align.unwrap_or(if value.is_numeric() { '>' } else { '<' });
    let fill_str = |n: usize| fill.to_string().repeat(n);
    Ok(match align {
        '<' => format!("{}{}", body, fill_str(pad)),
        '^' => format!("{}{}{}", fill_str(pad / 2), body, fill_str(pad - pad / 2)),
        _ => format!("{}{}", fill_str(pad), body),
    })
}

/// Insert `,` every three digits of the integer part.
fn group_thousands(number: &str) -> String {
    let (sign, rest) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let split = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let (int_part, tail) = rest.split_at(split);

    let mut grouped = String::new();
    for (idx, c) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}{}{}", sign, grouped, tail)
}
