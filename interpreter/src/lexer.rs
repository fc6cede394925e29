use crate::error::SyntaxError;

// ---------------------------------------------------------------------------
// Token types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Int(i64),
    Float(f64),
    Str(String),
    /// Contents of an `f"..."` literal, escapes already resolved.
    FStr(String),
    True,
    False,
    NoneLit,

    Ident(String),

    // Keywords
    And,
    Or,
    Not,
    If,
    Else,
    In,

    // Operators
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    Eq,      // =
    PlusEq,  // +=
    MinusEq, // -=
    StarEq,  // *=
    SlashEq, // /=
    EqEq,    // ==
    BangEq,  // !=
    Lt,
    Gt,
    LtEq,
    GtEq,
    Comma,
    Dot,
    Colon,

    // Grouping
    LParen,
    RParen,
    LBracket,
    RBracket,
}

/// A token and the 1-based character column it starts at.
pub type Spanned = (Token, usize);

// ---------------------------------------------------------------------------
// Text tokenizer: one source line → Token stream
// ---------------------------------------------------------------------------

/// Split one line into tokens. Everything after an unquoted `#` is a comment.
pub fn tokenize(line: &str) -> Result<Vec<Spanned>, SyntaxError> {
    let chars: Vec<char> = line.chars().collect();
    let len = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < len {
        let c = chars[i];
        let column = i + 1;
        match c {
            ' ' | '\t' | '\r' | '\n' => {
                i += 1;
            }

            '#' => break,

            // String literals, optionally f-prefixed
            '"' | '\'' => {
                let s = read_string(&chars, &mut i)?;
                tokens.push((Token::Str(s), column));
            }
            'f' | 'F' if i + 1 < len && matches!(chars[i + 1], '"' | '\'') => {
                i += 1;
                let s = read_string(&chars, &mut i)?;
                tokens.push((Token::FStr(s), column));
            }

            '0'..='9' => {
                let token = read_number(&chars, &mut i)?;
                tokens.push((token, column));
            }
            '.' if i + 1 < len && chars[i + 1].is_ascii_digit() => {
                let token = read_number(&chars, &mut i)?;
                tokens.push((token, column));
            }

            // Identifiers and keywords
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < len && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                let token = match ident.as_str() {
                    "True" => Token::True,
                    "False" => Token::False,
                    "None" => Token::NoneLit,
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "if" => Token::If,
                    "else" => Token::Else,
                    "in" => Token::In,
                    _ => Token::Ident(ident),
                };
                tokens.push((token, column));
            }

            // One- or two-character operators
            '=' => {
                i += 1;
                tokens.push((pick(&chars, &mut i, '=', Token::EqEq, Token::Eq), column));
            }
            '!' => {
                i += 1;
                if i < len && chars[i] == '=' {
                    i += 1;
                    tokens.push((Token::BangEq, column));
                } else {
                    return Err(SyntaxError::new("invalid syntax", column));
                }
            }
            '<' => {
                i += 1;
                tokens.push((pick(&chars, &mut i, '=', Token::LtEq, Token::Lt), column));
            }
            '>' => {
                i += 1;
                tokens.push((pick(&chars, &mut i, '=', Token::GtEq, Token::Gt), column));
            }
            '+' => {
                i += 1;
                tokens.push((pick(&chars, &mut i, '=', Token::PlusEq, Token::Plus), column));
            }
            '-' => {
                i += 1;
                tokens.push((pick(&chars, &mut i, '=', Token::MinusEq, Token::Minus), column));
            }
            '*' => {
                i += 1;
                let token = if i < len && chars[i] == '*' {
                    i += 1;
                    Token::StarStar
                } else {
                    pick(&chars, &mut i, '=', Token::StarEq, Token::Star)
                };
                tokens.push((token, column));
            }
            '/' => {
                i += 1;
                let token = if i < len && chars[i] == '/' {
                    i += 1;
                    Token::SlashSlash
                } else {
                    pick(&chars, &mut i, '=', Token::SlashEq, Token::Slash)
                };
                tokens.push((token, column));
            }

            // Single-character tokens
            '%' => { i += 1; tokens.push((Token::Percent, column)); }
            ',' => { i += 1; tokens.push((Token::Comma, column)); }
            '.' => { i += 1; tokens.push((Token::Dot, column)); }
            ':' => { i += 1; tokens.push((Token::Colon, column)); }
            '(' => { i += 1; tokens.push((Token::LParen, column)); }
            ')' => { i += 1; tokens.push((Token::RParen, column)); }
            '[' => { i += 1; tokens.push((Token::LBracket, column)); }
            ']' => { i += 1; tokens.push((Token::RBracket, column)); }

            other => {
                return Err(SyntaxError::new(
                    format!("invalid character '{}'", other),
                    column,
                ));
            }
        }
    }

    Ok(tokens)
}

/// `second` if the next char is `next` (consuming it), else `first`.
fn pick(chars: &[char], i: &mut usize, next: char, second: Token, first: Token) -> Token {
    if *i < chars.len() && chars[*i] == next {
        *i += 1;
        second
    } else {
        first
    }
}

/// Read a quoted string starting at the opening quote; `i` ends past the closing one.
fn read_string(chars: &[char], i: &mut usize) -> Result<String, SyntaxError> {
    let column = *i + 1;
    let quote = chars[*i];
    *i += 1;
    let mut s = String::new();

    while *i < chars.len() {
        let c = chars[*i];
        *i += 1;
        if c == quote {
            return Ok(s);
        }
        if c != '\\' {
            s.push(c);
            continue;
        }
        let Some(&escaped) = chars.get(*i) else { break };
        *i += 1;
        match escaped {
            'n' => s.push('\n'),
            't' => s.push('\t'),
            'r' => s.push('\r'),
            '0' => s.push('\0'),
            '\\' | '\'' | '"' => s.push(escaped),
            // Unknown escapes keep their backslash
            other => {
                s.push('\\');
                s.push(other);
            }
        }
    }

    Err(SyntaxError::new("unterminated string literal", column))
}

fn read_number(chars: &[char], i: &mut usize) -> Result<Token, SyntaxError> {
    let column = *i + 1;
    let start = *i;
    let len = chars.len();
    let mut is_float = false;

    skip_digits(chars, i);
    let starts_name = |c: &char| c.is_alphabetic() || *c == '_';
    if *i < len && chars[*i] == '.' && !chars.get(*i + 1).is_some_and(starts_name) {
        is_float = true;
        *i += 1;
        skip_digits(chars, i);
    }
    if *i < len && matches!(chars[*i], 'e' | 'E') {
        let mut j = *i + 1;
        if j < len && matches!(chars[j], '+' | '-') {
            j += 1;
        }
        if j < len && chars[j].is_ascii_digit() {
            is_float = true;
            *i = j;
            skip_digits(chars, i);
        }
    }

    let text: String = chars[start..*i].iter().filter(|c| **c != '_').collect();
    if is_float {
        text.parse::<f64>()
            .map(Token::Float)
            .map_err(|_| SyntaxError::new("invalid decimal literal", column))
    } else {
        text.parse::<i64>()
            .map(Token::Int)
            .map_err(|_| SyntaxError::new("integer literal too large", column))
    }
}

fn skip_digits(chars: &[char], i: &mut usize) {
    while *i < chars.len() && (chars[*i].is_ascii_digit() || chars[*i] == '_') {
        *i += 1;
    }
}
