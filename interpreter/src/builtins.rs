use std::cmp::Ordering;
use std::io::Write;

use crate::ast::BinaryOperator;
use crate::error::RuntimeError;
use crate::evaluator::eval_binary_op;
use crate::runtime_value::RuntimeValue;

/// Largest list `range()` will materialise.
const MAX_RANGE_LEN: i64 = 1_000_000;

/// Positional and keyword arguments of one call, checked against a signature.
struct Arguments {
    function: String,
    positional: Vec<RuntimeValue>,
    keywords: Vec<(String, RuntimeValue)>,
}

impl Arguments {
    fn new(
        function: String,
        positional: Vec<RuntimeValue>,
        keywords: Vec<(String, RuntimeValue)>,
    ) -> Self {
        Arguments {
            function,
            positional,
            keywords,
        }
    }

    /// Require between `min` and `max` positional arguments and no unknown keywords.
    fn expect(&self, min: usize, max: usize) -> Result<(), RuntimeError> {
        if let Some((name, _)) = self.keywords.first() {
            return Err(RuntimeError::TypeError(format!(
                "{}() got an unexpected keyword argument '{}'",
                self.function, name
            )));
        }
        let given = self.positional.len();
        if given < min || given > max {
            let expected = if min == max {
                format!("exactly {}", min)
            } else if given < min {
                format!("at least {}", min)
            } else {
                format!("at most {}", max)
            };
            return Err(RuntimeError::TypeError(format!(
                "{}() takes {} argument{} ({} given)",
                self.function,
                expected,
                if min == max && min == 1 { "" } else { "s" },
                given
            )));
        }
        Ok(())
    }

    /// Remove and return a keyword argument.
    fn keyword(&mut self, name: &str) -> Option<RuntimeValue> {
        let idx = self.keywords.iter().position(|(k, _)| k == name)?;
        Some(self.keywords.remove(idx).1)
    }

    fn get(&self, idx: usize) -> Option<&RuntimeValue> {
        self.positional.get(idx)
    }

    fn first(&self) -> &RuntimeValue {
        self.positional.first().unwrap_or(&RuntimeValue::None)
    }

    fn str_arg(&self, idx: usize) -> Result<&str, RuntimeError> {
        match self.positional.get(idx) {
            Some(RuntimeValue::Str(s)) => Ok(s),
            Some(other) => Err(RuntimeError::TypeError(format!(
                "{}() argument {} must be str, not {}",
                self.function,
                idx + 1,
                other.type_name()
            ))),
            None => Err(RuntimeError::TypeError(format!(
                "{}() missing argument {}",
                self.function,
                idx + 1
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------------

/// Call a builtin function by name.
pub fn call_function(
    name: &str,
    positional: Vec<RuntimeValue>,
    keywords: Vec<(String, RuntimeValue)>,
    output: &mut dyn Write,
) -> Result<RuntimeValue, RuntimeError> {
    let mut args = Arguments::new(name.to_string(), positional, keywords);

    match name {
        "print" => {
            let sep = separator(&mut args, "sep", " ")?;
            let end = separator(&mut args, "end", "\n")?;
            args.expect(0, usize::MAX)?;
            let line: Vec<String> = args.positional.iter().map(|v| v.to_string()).collect();
            write!(output, "{}{}", line.join(&sep), end)
                .map_err(|e| RuntimeError::IoError(e.to_string()))?;
            Ok(RuntimeValue::None)
        }
        "len" => {
            args.expect(1, 1)?;
            match args.first() {
                RuntimeValue::Str(s) => Ok(RuntimeValue::Int(s.chars().count() as i64)),
                RuntimeValue::List(items) => Ok(RuntimeValue::Int(items.len() as i64)),
                other => Err(RuntimeError::TypeError(format!(
                    "object of type '{}' has no len()",
                    other.type_name()
                ))),
            }
        }
        "str" => {
            args.expect(0, 1)?;
            Ok(RuntimeValue::Str(
                args.get(0).map(|v| v.to_string()).unwrap_or_default(),
            ))
        }
        "repr" => {
            args.expect(1, 1)?;
            Ok(RuntimeValue::Str(args.first().repr()))
        }
        "int" => {
            args.expect(0, 1)?;
            args.get(0).map_or(Ok(RuntimeValue::Int(0)), to_int)
        }
        "float" => {
            args.expect(0, 1)?;
            args.get(0).map_or(Ok(RuntimeValue::Float(0.0)), to_float)
        }
        "bool" => {
            args.expect(0, 1)?;
            Ok(RuntimeValue::Bool(
                args.get(0).is_some_and(RuntimeValue::is_truthy),
            ))
        }
        "abs" => {
            args.expect(1, 1)?;
            match args.first() {
                RuntimeValue::Float(f) => Ok(RuntimeValue::Float(f.abs())),
                other => match other.as_int() {
                    Some(n) => n
                        .checked_abs()
                        .map(RuntimeValue::Int)
                        .ok_or(RuntimeError::Overflow),
                    None => Err(RuntimeError::TypeError(format!(
                        "bad operand type for abs(): '{}'",
                        other.type_name()
                    ))),
                },
            }
        }
        "round" => {
            let ndigits = args.keyword("ndigits");
            args.expect(1, 2)?;
            let ndigits = ndigits.or_else(|| args.get(1).cloned());
            round(args.first(), ndigits.as_ref())
        }
        "min" | "max" => {
            args.expect(1, usize::MAX)?;
            let items = if args.positional.len() == 1 {
                iterate(args.first())?
            } else {
                args.positional.clone()
            };
            extreme(name, items)
        }
        "sum" => {
            let start = args.keyword("start");
            args.expect(1, 2)?;
            let start = start
                .or_else(|| args.get(1).cloned())
                .unwrap_or(RuntimeValue::Int(0));
            iterate(args.first())?
                .iter()
                .try_fold(start, |acc, item| {
                    eval_binary_op(BinaryOperator::Addition, &acc, item)
                })
        }
        "range" => {
            args.expect(1, 3)?;
            let ints = args
                .positional
                .iter()
                .map(index_int)
                .collect::<Result<Vec<_>, _>>()?;
            let (start, stop, step) = match ints.as_slice() {
                [stop] => (0, *stop, 1),
                [start, stop] => (*start, *stop, 1),
                [start, stop, step] => (*start, *stop, *step),
                _ => unreachable!("argument count checked above"),
            };
            range(start, stop, step)
        }
        "sorted" => {
            let reverse = args.keyword("reverse").is_some_and(|r| r.is_truthy());
            args.expect(1, 1)?;
            sort(iterate(args.first())?, reverse).map(RuntimeValue::List)
        }
        "list" => {
            args.expect(0, 1)?;
            match args.get(0) {
                Some(value) => iterate(value).map(RuntimeValue::List),
                None => Ok(RuntimeValue::List(Vec::new())),
            }
        }
        "type" => {
            args.expect(1, 1)?;
            Ok(RuntimeValue::Str(format!(
                "<class '{}'>",
                args.first().type_name()
            )))
        }
        _ => Err(RuntimeError::NameError(name.to_string())),
    }
}

/// `sep=`/`end=` of print: a string, or None for the default.
fn separator(args: &mut Arguments, name: &str, default: &str) -> Result<String, RuntimeError> {
    match args.keyword(name) {
        None | Some(RuntimeValue::None) => Ok(default.to_string()),
        Some(RuntimeValue::Str(s)) => Ok(s),
        Some(other) => Err(RuntimeError::TypeError(format!(
            "{} must be None or a string, not {}",
            name,
            other.type_name()
        ))),
    }
}

/// Items of a list, or the characters of a string.
fn iterate(value: &RuntimeValue) -> Result<Vec<RuntimeValue>, RuntimeError> {
    match value {
        RuntimeValue::List(items) => Ok(items.clone()),
        RuntimeValue::Str(s) => Ok(s.chars().map(|c| RuntimeValue::Str(c.to_string())).collect()),
        other => Err(RuntimeError::TypeError(format!(
            "'{}' object is not iterable",
            other.type_name()
        ))),
    }
}

fn index_int(value: &RuntimeValue) -> Result<i64, RuntimeError> {
    value.as_int().ok_or_else(|| {
        RuntimeError::TypeError(format!(
            "'{}' object cannot be interpreted as an integer",
            value.type_name()
        ))
    })
}

fn to_int(value: &RuntimeValue) -> Result<RuntimeValue, RuntimeError> {
    match value {
        RuntimeValue::Float(f) => {
            if f.is_nan() {
                Err(RuntimeError::ValueError(
                    "cannot convert float NaN to integer".into(),
                ))
            } else if !f.is_finite() || f.trunc().abs() >= i64::MAX as f64 {
                Err(RuntimeError::Overflow)
            } else {
                Ok(RuntimeValue::Int(f.trunc() as i64))
            }
        }
        RuntimeValue::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(RuntimeValue::Int)
            .map_err(|_| {
                RuntimeError::ValueError(format!(
                    "invalid literal for int() with base 10: {}",
                    value.repr()
                ))
            }),
        other => other.as_int().map(RuntimeValue::Int).ok_or_else(|| {
            RuntimeError::TypeError(format!(
                "int() argument must be a string or a number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

fn to_float(value: &RuntimeValue) -> Result<RuntimeValue, RuntimeError> {
    match value {
        RuntimeValue::Str(s) => {
            let text = s.trim().to_lowercase();
            let parsed = match text.as_str() {
                "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
                "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
                "nan" => Some(f64::NAN),
                _ => text.parse::<f64>().ok(),
            };
            parsed.map(RuntimeValue::Float).ok_or_else(|| {
                RuntimeError::ValueError(format!(
                    "could not convert string to float: {}",
                    value.repr()
                ))
            })
        }
        other => other.as_float().map(RuntimeValue::Float).ok_or_else(|| {
            RuntimeError::TypeError(format!(
                "float() argument must be a string or a real number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

/// Round half to even, like Python's `round`.
fn round(value: &RuntimeValue, ndigits: Option<&RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let ndigits = match ndigits {
        None | Some(RuntimeValue::None) => None,
        Some(n) => Some(index_int(n)?),
    };

    match (value, ndigits) {
        (RuntimeValue::Float(f), None) => to_int(&RuntimeValue::Float(f.round_ties_even())),
        (RuntimeValue::Float(f), Some(n)) => {
            let factor = 10f64.powi(n.clamp(-308, 308) as i32);
            Ok(RuntimeValue::Float((f * factor).round_ties_even() / factor))
        }
        (other, n) => {
            let Some(i) = other.as_int() else {
                return Err(RuntimeError::TypeError(format!(
                    "type {} doesn't define __round__ method",
                    other.type_name()
                )));
            };
            match n {
                Some(n) if n < 0 => {
                    let factor = 10f64.powi((-n).min(18) as i32);
                    let rounded = ((i as f64) / factor).round_ties_even() * factor;
                    to_int(&RuntimeValue::Float(rounded))
                }
                _ => Ok(RuntimeValue::Int(i)),
            }
        }
    }
}

fn extreme(name: &str, items: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let mut iter = items.into_iter();
    let mut best = iter
        .next()
        .ok_or_else(|| RuntimeError::ValueError(format!("{}() arg is an empty sequence", name)))?;
    for item in iter {
        let ordering = item.compare(&best, if name == "min" { "<" } else { ">" })?;
        let better = if name == "min" {
            ordering == Ordering::Less
        } else {
            ordering == Ordering::Greater
        };
        if better {
            best = item;
        }
    }
    Ok(best)
}

fn range(start: i64, stop: i64, step: i64) -> Result<RuntimeValue, RuntimeError> {
    if step == 0 {
        return Err(RuntimeError::ValueError("range() arg 3 must not be zero".into()));
    }
    let span = if step > 0 {
        stop.saturating_sub(start)
    } else {
        start.saturating_sub(stop)
    };
    let len = if span <= 0 {
        0
    } else {
        (span - 1) / step.saturating_abs() + 1
    };
    if len > MAX_RANGE_LEN {
        return Err(RuntimeError::ValueError("range() is too large".into()));
    }
    Ok(RuntimeValue::List(
        (0..len)
            .map(|i| RuntimeValue::Int(start + i * step))
            .collect(),
    ))
}

/// Stable merge sort that stops at the first pair of values that cannot be
/// ordered, so a mixed list is a TypeError rather than an inconsistent order.
fn sort(mut items: Vec<RuntimeValue>, reverse: bool) -> Result<Vec<RuntimeValue>, RuntimeError> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = sort(items.split_off(items.len() / 2), reverse)?;
    let left = sort(items, reverse)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        // Equal items keep their original order in both directions.
        let right_first = if reverse {
            left[i].compare(&right[j], "<")?.is_lt()
        } else {
            right[j].compare(&left[i], "<")?.is_lt()
        };
        if right_first {
            merged.push(right[j].clone());
            j += 1;
        } else {
            merged.push(left[i].clone());
            i += 1;
        }
    }
    merged.extend_from_slice(&left[i..]);
    merged.extend_from_slice(&right[j..]);
    Ok(merged)
}

// ---------------------------------------------------------------------------
// Methods
// ---------------------------------------------------------------------------

/// Call a method on a string or list value.
pub fn call_method(
    receiver: &RuntimeValue,
    method: &str,
    positional: Vec<RuntimeValue>,
    keywords: Vec<(String, RuntimeValue)>,
) -> Result<RuntimeValue, RuntimeError> {
    let function = format!("{}.{}", receiver.type_name(), method);
    let mut args = Arguments::new(function, positional, keywords);
    let no_such_method = || RuntimeError::AttributeError {
        type_name: receiver.type_name().to_string(),
        name: method.to_string(),
    };

    match receiver {
        RuntimeValue::Str(s) => match method {
            "upper" => {
                args.expect(0, 0)?;
                Ok(RuntimeValue::Str(s.to_uppercase()))
            }
            "lower" => {
                args.expect(0, 0)?;
                Ok(RuntimeValue::Str(s.to_lowercase()))
            }
            "title" => {
                args.expect(0, 0)?;
                Ok(RuntimeValue::Str(title_case(s)))
            }
            "strip" | "lstrip" | "rstrip" => {
                args.expect(0, 1)?;
                let chars: Option<Vec<char>> = match args.get(0) {
                    None | Some(RuntimeValue::None) => None,
                    Some(_) => Some(args.str_arg(0)?.chars().collect()),
                };
                let matches = |c: char| match &chars {
                    Some(set) => set.contains(&c),
                    None => c.is_whitespace(),
                };
                let stripped = match method {
                    "lstrip" => s.trim_start_matches(matches),
                    "rstrip" => s.trim_end_matches(matches),
                    _ => s.trim_matches(matches),
                };
                Ok(RuntimeValue::Str(stripped.to_string()))
            }
            "split" => {
                let sep = args.keyword("sep");
                args.expect(0, 1)?;
                let sep = sep.or_else(|| args.get(0).cloned());
                let pieces: Vec<RuntimeValue> = match sep {
                    None | Some(RuntimeValue::None) => s
                        .split_whitespace()
                        .map(|p| RuntimeValue::Str(p.to_string()))
                        .collect(),
                    Some(RuntimeValue::Str(sep)) if sep.is_empty() => {
                        return Err(RuntimeError::ValueError("empty separator".into()));
                    }
                    Some(RuntimeValue::Str(sep)) => s
                        .split(sep.as_str())
                        .map(|p| RuntimeValue::Str(p.to_string()))
                        .collect(),
                    Some(other) => {
                        return Err(RuntimeError::TypeError(format!(
                            "must be str or None, not {}",
                            other.type_name()
                        )));
                    }
                };
                Ok(RuntimeValue::List(pieces))
            }
            "join" => {
                args.expect(1, 1)?;
                let items = iterate(args.first())?;
                let mut parts = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    match item {
                        RuntimeValue::Str(part) => parts.push(part.as_str()),
                        other => {
                            return Err(RuntimeError::TypeError(format!(
                                "sequence item {}: expected str instance, {} found",
                                idx,
                                other.type_name()
                            )));
                        }
                    }
                }
                Ok(RuntimeValue::Str(parts.join(s)))
            }
            "replace" => {
                args.expect(2, 2)?;
                Ok(RuntimeValue::Str(s.replace(args.str_arg(0)?, args.str_arg(1)?)))
            }
            "startswith" => {
                args.expect(1, 1)?;
                Ok(RuntimeValue::Bool(s.starts_with(args.str_arg(0)?)))
            }
            "endswith" => {
                args.expect(1, 1)?;
                Ok(RuntimeValue::Bool(s.ends_with(args.str_arg(0)?)))
            }
            "count" => {
                args.expect(1, 1)?;
                let sub = args.str_arg(0)?;
                let count = if sub.is_empty() {
                    s.chars().count() + 1
                } else {
                    s.matches(sub).count()
                };
                Ok(RuntimeValue::Int(count as i64))
            }
            "index" => {
                args.expect(1, 1)?;
                let byte = s
                    .find(args.str_arg(0)?)
                    .ok_or_else(|| RuntimeError::ValueError("substring not found".into()))?;
                Ok(RuntimeValue::Int(s[..byte].chars().count() as i64))
            }
            _ => Err(no_such_method()),
        },
        RuntimeValue::List(items) => match method {
            "count" => {
                args.expect(1, 1)?;
                let needle = args.first();
                Ok(RuntimeValue::Int(
                    items.iter().filter(|item| *item == needle).count() as i64,
                ))
            }
            "index" => {
                args.expect(1, 1)?;
                let needle = args.first();
                items
                    .iter()
                    .position(|item| item == needle)
                    .map(|idx| RuntimeValue::Int(idx as i64))
                    .ok_or_else(|| {
                        RuntimeError::ValueError(format!("{} is not in list", needle.repr()))
                    })
            }
            _ => Err(no_such_method()),
        },
        _ => Err(no_such_method()),
    }
}

/// Upper-case the first letter of every run of letters, lower-case the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut previous_cased = false;
    for c in s.chars() {
        if previous_cased {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        previous_cased = c.is_alphabetic();
    }
    out
}
