use crate::ast::{BinaryOperator, Expr, FStringPart, LogicalOperator, Statement, UnaryOperator};
use crate::error::SyntaxError;
use crate::lexer::{Spanned, Token, tokenize};

/// Deepest bracket/operator nesting a single line may use.
const MAX_NESTING: usize = 200;

// Binding powers (precedence). Higher = tighter binding.
// Left bp, right bp. For left-assoc: right = left + 1. For right-assoc: right = left.
const BP_CONDITIONAL: u8 = 2; // x if c else y
const BP_OR: u8 = 4; // or
const BP_AND: u8 = 6; // and
const BP_NOT: u8 = 8; // not
const BP_COMPARISON: u8 = 10; // == != < > <= >= in, not in
const BP_ADDITIVE: u8 = 12; // + -
const BP_MULTIPLICATIVE: u8 = 14; // * / // %
const BP_UNARY: u8 = 16; // -x
const BP_POWER: u8 = 18; // **
const BP_POSTFIX: u8 = 20; // call, index, method

/// Parse one line into a statement.
pub fn parse_statement(line: &str) -> Result<Statement, SyntaxError> {
    let tokens = tokenize(line)?;
    let mut parser = ExprParser::new(tokens, line.chars().count());

    let statement = if let Some(operator) = parser.assignment_operator() {
        let variable = parser.expect_ident()?;
        parser.advance();
        let value = parser.parse_expr(0)?;
        match operator {
            None => Statement::Assignment { variable, value },
            Some(operator) => Statement::AugmentedAssignment {
                variable,
                operator,
                value,
            },
        }
    } else {
        Statement::Expression(parser.parse_expr(0)?)
    };

    if !parser.at_end() {
        return Err(parser.error("invalid syntax"));
    }
    Ok(statement)
}

/// Parse a standalone expression (the inside of an f-string field).
pub fn parse_expression(source: &str) -> Result<Expr, SyntaxError> {
    let tokens = tokenize(source)?;
    let mut parser = ExprParser::new(tokens, source.chars().count());
    if parser.at_end() {
        return Err(parser.error("f-string: empty expression not allowed"));
    }
    let expr = parser.parse_expr(0)?;
    if !parser.at_end() {
        return Err(parser.error("invalid syntax"));
    }
    Ok(expr)
}

// ---------------------------------------------------------------------------
// Expression parser (Pratt / precedence climbing)
// ---------------------------------------------------------------------------

struct ExprParser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Column reported for errors at end of line.
    end_column: usize,
    depth: usize,
}

impl ExprParser {
    fn new(tokens: Vec<Spanned>, line_len: usize) -> Self {
        ExprParser {
            tokens,
            pos: 0,
            end_column: line_len + 1,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone())?;
        self.pos += 1;
        Some(token)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn column(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, col)| *col)
            .unwrap_or(self.end_column)
    }

    fn error(&self, msg: impl Into<String>) -> SyntaxError {
        SyntaxError::new(msg, self.column())
    }

    fn expect_ident(&mut self) -> Result<String, SyntaxError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error("expected a name")),
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), SyntaxError> {
        if self.peek() == Some(&expected) {
            self.pos += 1;
            Ok(())
        } else if self.at_end() {
            Err(self.error(format!("'{}' was never closed", what)))
        } else {
            Err(self.error(format!("expected '{}'", what)))
        }
    }

    /// Check if the line is an assignment: `ident = expr` or `ident op= expr`.
    /// Outer `None` means not an assignment; inner `None` means plain `=`.
    fn assignment_operator(&self) -> Option<Option<BinaryOperator>> {
        if !matches!(self.peek(), Some(Token::Ident(_))) {
            return None;
        }
        match self.peek_at(1)? {
            Token::Eq => Some(None),
            Token::PlusEq => Some(Some(BinaryOperator::Addition)),
            Token::MinusEq => Some(Some(BinaryOperator::Subtraction)),
            Token::StarEq => Some(Some(BinaryOperator::Multiplication)),
            Token::SlashEq => Some(Some(BinaryOperator::Division)),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Pratt parser core
    // ------------------------------------------------------------------

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error("too many nested parentheses"));
        }
        let result = self.parse_expr_inner(min_bp);
        self.depth -= 1;
        result
    }

    fn parse_expr_inner(&mut self, min_bp: u8) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_prefix()?;

        loop {
            let Some(token) = self.peek() else { break };
            let Some((l_bp, r_bp)) = infix_bp(token, self.peek_at(1)) else {
                break;
            };

            if l_bp < min_bp {
                break;
            }

            match token {
                // Special case: conditional expression
                Token::If => {
                    self.advance();
                    let condition = self.parse_expr(BP_OR)?;
                    self.expect(Token::Else, "else")?;
                    let false_branch = self.parse_expr(BP_CONDITIONAL)?;
                    left = Expr::Conditional {
                        condition: Box::new(condition),
                        true_branch: Box::new(left),
                        false_branch: Box::new(false_branch),
                    };
                    continue;
                }
                Token::LParen => {
                    left = self.parse_call(left)?;
                    continue;
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.parse_expr(0)?;
                    self.expect(Token::RBracket, "]")?;
                    left = Expr::Index {
                        target: Box::new(left),
                        index: Box::new(index),
                    };
                    continue;
                }
                Token::Dot => {
                    self.advance();
                    let method = self.expect_ident()?;
                    if self.peek() != Some(&Token::LParen) {
                        return Err(self.error("attribute access is only supported for method calls"));
                    }
                    self.advance();
                    let (args, kwargs) = self.parse_arguments()?;
                    left = Expr::MethodCall {
                        receiver: Box::new(left),
                        method,
                        args,
                        kwargs,
                    };
                    continue;
                }
                Token::And | Token::Or => {
                    let operator = if *token == Token::And {
                        LogicalOperator::And
                    } else {
                        LogicalOperator::Or
                    };
                    self.advance();
                    let right = self.parse_expr(r_bp)?;
                    left = Expr::LogicalOperation {
                        operator,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue;
                }
                _ => {}
            }

            let Some(op) = self.advance() else { break };
            let operator = match op {
                Token::Plus => BinaryOperator::Addition,
                Token::Minus => BinaryOperator::Subtraction,
                Token::Star => BinaryOperator::Multiplication,
                Token::Slash => BinaryOperator::Division,
                Token::SlashSlash => BinaryOperator::FloorDivision,
                Token::Percent => BinaryOperator::Modulo,
                Token::StarStar => BinaryOperator::Power,
                Token::EqEq => BinaryOperator::Equality,
                Token::BangEq => BinaryOperator::Inequality,
                Token::Gt => BinaryOperator::GreaterThan,
                Token::Lt => BinaryOperator::LessThan,
                Token::GtEq => BinaryOperator::GreaterThanOrEqual,
                Token::LtEq => BinaryOperator::LessThanOrEqual,
                Token::In => BinaryOperator::Contains,
                Token::Not => {
                    // `not in`: infix_bp only accepts Not when In follows
                    self.advance();
                    BinaryOperator::NotContains
                }
                _ => return Err(self.error("invalid syntax")),
            };
            let right = self.parse_expr(r_bp)?;

            left = Expr::BinaryOperation {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expr, SyntaxError> {
        let column = self.column();
        let token = self
            .advance()
            .ok_or_else(|| self.error("unexpected end of line"))?;

        match token {
            // Literals
            Token::Int(n) => Ok(Expr::IntLiteral(n)),
            Token::Float(f) => Ok(Expr::FloatLiteral(f)),
            Token::Str(s) => Ok(Expr::StringLiteral(s)),
            Token::FStr(s) => parse_fstring(&s, column),
            Token::True => Ok(Expr::BooleanLiteral(true)),
            Token::False => Ok(Expr::BooleanLiteral(false)),
            Token::NoneLit => Ok(Expr::NoneLiteral),

            Token::Ident(name) => Ok(Expr::Name(name)),

            // Unary operators
            Token::Not => {
                let operand = self.parse_expr(BP_NOT)?;
                Ok(Expr::UnaryOperation {
                    operator: UnaryOperator::LogicalNot,
                    operand: Box::new(operand),
                })
            }
            Token::Minus => {
                let operand = self.parse_expr(BP_UNARY)?;
                Ok(Expr::UnaryOperation {
                    operator: UnaryOperator::Negation,
                    operand: Box::new(operand),
                })
            }
            Token::Plus => self.parse_expr(BP_UNARY),

            // Parenthesized expression
            Token::LParen => {
                if self.peek() == Some(&Token::RParen) {
                    return Err(SyntaxError::new("tuples are not supported", column));
                }
                let expr = self.parse_expr(0)?;
                self.expect(Token::RParen, ")")?;
                Ok(expr)
            }

            Token::LBracket => {
                let mut items = Vec::new();
                while self.peek() != Some(&Token::RBracket) {
                    items.push(self.parse_expr(0)?);
                    if self.peek() == Some(&Token::Comma) {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.expect(Token::RBracket, "]")?;
                Ok(Expr::List(items))
            }

            _ => Err(SyntaxError::new("invalid syntax", column)),
        }
    }

    fn parse_call(&mut self, callee: Expr) -> Result<Expr, SyntaxError> {
        let Expr::Name(function) = callee else {
            return Err(self.error("only named functions can be called"));
        };
        self.advance();
        let (args, kwargs) = self.parse_arguments()?;
        Ok(Expr::Call {
            function,
            args,
            kwargs,
        })
    }

    /// Parse `a, b, key=value)`; the opening parenthesis is already consumed.
    fn parse_arguments(&mut self) -> Result<(Vec<Expr>, Vec<(String, Expr)>), SyntaxError> {
        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Expr)> = Vec::new();

        while self.peek() != Some(&Token::RParen) {
            if self.at_end() {
                break;
            }
            let is_keyword = matches!(
                (self.peek(), self.peek_at(1)),
                (Some(Token::Ident(_)), Some(Token::Eq))
            );
            if is_keyword {
                let name = self.expect_ident()?;
                if kwargs.iter().any(|(k, _)| *k == name) {
                    return Err(self.error(format!("keyword argument repeated: {}", name)));
                }
                self.advance();
                kwargs.push((name, self.parse_expr(0)?));
            } else {
                if !kwargs.is_empty() {
                    return Err(self.error("positional argument follows keyword argument"));
                }
                args.push(self.parse_expr(0)?);
            }

            if self.peek() == Some(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.expect(Token::RParen, ")")?;
        Ok((args, kwargs))
    }
}

/// Infix binding powers: returns (left_bp, right_bp) or None if not infix.
fn infix_bp(token: &Token, next: Option<&Token>) -> Option<(u8, u8)> {
    match token {
        Token::If => Some((BP_CONDITIONAL, BP_CONDITIONAL)),
        Token::Or => Some((BP_OR, BP_OR + 1)),
        Token::And => Some((BP_AND, BP_AND + 1)),
        Token::EqEq
        | Token::BangEq
        | Token::Lt
        | Token::Gt
        | Token::LtEq
        | Token::GtEq
        | Token::In => Some((BP_COMPARISON, BP_COMPARISON + 1)),
        Token::Not if next == Some(&Token::In) => Some((BP_COMPARISON, BP_COMPARISON + 1)),
        Token::Plus | Token::Minus => Some((BP_ADDITIVE, BP_ADDITIVE + 1)),
        Token::Star | Token::Slash | Token::SlashSlash | Token::Percent => {
            Some((BP_MULTIPLICATIVE, BP_MULTIPLICATIVE + 1))
        }
        // Right-associative; a unary minus on the right still binds
        Token::StarStar => Some((BP_POWER, BP_UNARY)),
        Token::LParen | Token::LBracket | Token::Dot => Some((BP_POSTFIX, BP_POSTFIX + 1)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// f-string parsing
// ---------------------------------------------------------------------------

/// Split f-string contents into literal text and `{expr[!r][:spec]}` fields.
fn parse_fstring(s: &str, column: usize) -> Result<Expr, SyntaxError> {
    let chars: Vec<char> = s.chars().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '{' if chars.get(i + 1) == Some(&'{') => {
                literal.push('{');
                i += 2;
            }
            '}' if chars.get(i + 1) == Some(&'}') => {
                literal.push('}');
                i += 2;
            }
            '}' => {
                return Err(SyntaxError::new(
                    "f-string: single '}' is not allowed",
                    column,
                ));
            }
            '{' => {
                i += 1;
                let field = read_field(&chars, &mut i)
                    .ok_or_else(|| SyntaxError::new("f-string: expecting '}'", column))?;
                if !literal.is_empty() {
                    parts.push(FStringPart::Literal(std::mem::take(&mut literal)));
                }
                parts.push(parse_field(&field, column)?);
            }
            c => {
                literal.push(c);
                i += 1;
            }
        }
    }

    if !literal.is_empty() {
        parts.push(FStringPart::Literal(literal));
    }
    Ok(Expr::FString(parts))
}

/// Collect the text of one replacement field up to its closing brace.
fn read_field(chars: &[char], i: &mut usize) -> Option<String> {
    let mut field = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    while *i < chars.len() {
        let c = chars[*i];
        *i += 1;
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                '}' if depth == 0 => return Some(field),
                '}' => depth -= 1,
                _ => {}
            },
        }
        field.push(c);
    }
    None
}

fn parse_field(field: &str, column: usize) -> Result<FStringPart, SyntaxError> {
    let (expression, spec) = split_top_level(field, ':');
    let (expression, repr) = match expression.trim_end().strip_suffix("!r") {
        Some(inner) => (inner, true),
        None => (
            expression.trim_end().strip_suffix("!s").unwrap_or(expression),
            false,
        ),
    };

    let value = parse_expression(expression)
        .map_err(|e| SyntaxError::new(format!("f-string: {}", e.message), column))?;

    Ok(FStringPart::Expression {
        value,
        repr,
        spec: spec.map(str::to_string),
    })
}

/// Split at the first `sep` outside quotes and brackets.
fn split_top_level(text: &str, sep: char) -> (&str, Option<&str>) {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (idx, c) in text.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth = depth.saturating_sub(1),
                c if c == sep && depth == 0 => {
                    return (&text[..idx], Some(&text[idx + c.len_utf8()..]));
                }
                _ => {}
            },
        }
    }
    (text, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(source: &str) -> Expr {
        match parse_statement(source).unwrap() {
            Statement::Expression(e) => e,
            other => panic!("expected an expression, got {other:?}"),
        }
    }

    fn int(n: i64) -> Box<Expr> {
        Box::new(Expr::IntLiteral(n))
    }

    #[test]
    fn precedence() {
        assert_eq!(
            expr("1 + 2 * 3"),
            Expr::BinaryOperation {
                operator: BinaryOperator::Addition,
                left: int(1),
                right: Box::new(Expr::BinaryOperation {
                    operator: BinaryOperator::Multiplication,
                    left: int(2),
                    right: int(3),
                }),
            }
        );
    }

    #[test]
    fn power_is_right_associative_and_beats_unary_minus() {
        let Expr::UnaryOperation { operator, operand } = expr("-2 ** 2") else {
            panic!("expected negation at the root");
        };
        assert_eq!(operator, UnaryOperator::Negation);
        assert!(matches!(*operand, Expr::BinaryOperation { operator: BinaryOperator::Power, .. }));

        let Expr::BinaryOperation { right, .. } = expr("2 ** 3 ** 2") else {
            panic!("expected power at the root");
        };
        assert!(matches!(*right, Expr::BinaryOperation { operator: BinaryOperator::Power, .. }));
    }

    #[test]
    fn assignments() {
        assert_eq!(
            parse_statement("x = 1").unwrap(),
            Statement::Assignment {
                variable: "x".into(),
                value: Expr::IntLiteral(1),
            }
        );
        assert_eq!(
            parse_statement("x -= 1").unwrap(),
            Statement::AugmentedAssignment {
                variable: "x".into(),
                operator: BinaryOperator::Subtraction,
                value: Expr::IntLiteral(1),
            }
        );
        assert!(matches!(
            parse_statement("x == 1").unwrap(),
            Statement::Expression(_)
        ));
    }

    #[test]
    fn calls_with_keywords() {
        assert_eq!(
            expr("print(a, end='')"),
            Expr::Call {
                function: "print".into(),
                args: vec![Expr::Name("a".into())],
                kwargs: vec![("end".into(), Expr::StringLiteral(String::new()))],
            }
        );
    }

    #[test]
    fn method_chain_and_index() {
        let Expr::MethodCall { receiver, method, .. } = expr("words[0].upper()") else {
            panic!("expected a method call");
        };
        assert_eq!(method, "upper");
        assert!(matches!(*receiver, Expr::Index { .. }));
    }

    #[test]
    fn conditional_expression() {
        assert!(matches!(
            expr("'a' if x > 1 else 'b'"),
            Expr::Conditional { .. }
        ));
    }

    #[test]
    fn not_in() {
        assert!(matches!(
            expr("x not in xs"),
            Expr::BinaryOperation { operator: BinaryOperator::NotContains, .. }
        ));
        assert!(matches!(
            expr("not x in xs"),
            Expr::UnaryOperation { operator: UnaryOperator::LogicalNot, .. }
        ));
    }

    #[test]
    fn fstring_fields() {
        let Expr::FString(parts) = expr("f'{name!r} has {{x}} {value:.2f}'") else {
            panic!("expected an f-string");
        };
        assert_eq!(parts.len(), 3);
        assert!(matches!(&parts[0], FStringPart::Expression { repr: true, spec: None, .. }));
        assert_eq!(parts[1], FStringPart::Literal(" has {x} ".into()));
        assert!(matches!(&parts[2], FStringPart::Expression { spec: Some(s), .. } if s == ".2f"));
    }

    #[test]
    fn syntax_errors_carry_columns() {
        let err = parse_statement("x = (1 + 2").unwrap_err();
        assert_eq!(err.message, "')' was never closed");
        assert_eq!(err.column, 11);

        let err = parse_statement("1 2").unwrap_err();
        assert_eq!(err.column, 3);

        assert!(parse_statement("print(1,").is_err());
        assert!(parse_statement("f'{}'").is_err());
        assert!(parse_statement("x.y").is_err());
    }
}
