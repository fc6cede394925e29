#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOperator {
    /// Arithmetic negation: -x
    Negation,
    /// Logical not: not x
    LogicalNot,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOperator {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    FloorDivision,
    Modulo,
    Power,
    Equality,
    Inequality,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Contains,
    NotContains,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Addition => "+",
            BinaryOperator::Subtraction => "-",
            BinaryOperator::Multiplication => "*",
            BinaryOperator::Division => "/",
            BinaryOperator::FloorDivision => "//",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Power => "**",
            BinaryOperator::Equality => "==",
            BinaryOperator::Inequality => "!=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::LessThan => "<",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::Contains => "in",
            BinaryOperator::NotContains => "not in",
        }
    }
}

/// Short-circuiting operators; they yield one of their operands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FStringPart {
    Literal(String),
    Expression {
        value: Expr,
        /// `!r` conversion requested.
        repr: bool,
        /// Format spec after the `:`, if any.
        spec: Option<String>,
    },
}

/// An expression AST node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Literals
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),
    BooleanLiteral(bool),
    NoneLiteral,
    FString(Vec<FStringPart>),
    List(Vec<Expr>),

    Name(String),

    // Operations
    UnaryOperation {
        operator: UnaryOperator,
        operand: Box<Expr>,
    },
    BinaryOperation {
        operator: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    LogicalOperation {
        operator: LogicalOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// `true_branch if condition else false_branch`
    Conditional {
        condition: Box<Expr>,
        true_branch: Box<Expr>,
        false_branch: Box<Expr>,
    },

    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },

    // Invocations
    Call {
        function: String,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },
}

/// One source line.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Assignment {
        variable: String,
        value: Expr,
    },
    /// `name op= value`
    AugmentedAssignment {
        variable: String,
        operator: BinaryOperator,
        value: Expr,
    },
    Expression(Expr),
}
