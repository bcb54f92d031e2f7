//! Everything that can go wrong turning formula text into a program, or
//! turning a program into a picture.

use failure::Fail;

/// Why a formula failed to compile.  Only the first failure found is
/// ever reported: a string that is broken in one way tends to make
/// perfectly good parts of it look broken as well.
#[derive(Debug, Clone, PartialEq, Fail)]
pub enum CompileError {
    /// No `;` between the first term and the rule for the next term.
    #[fail(display = "There was no semicolon to separate the first term from the rule for the next term.")]
    MissingSeparator,

    /// More than one `;`.
    #[fail(display = "Only one semicolon is permitted.")]
    ExtraSeparator,

    /// The first term is the base case; it cannot refer to itself.
    #[fail(display = "Cannot use the character {} when defining the first term.", _0)]
    SpecialReferenceInFirstTerm(char),

    /// A `[` that is never closed.
    #[fail(display = "A '[' was opened but never closed.")]
    UnbalancedBracket,

    /// A `[` inside another complex literal.
    #[fail(display = "Defining a complex number inside another complex number is not permitted.")]
    NestedBracket,

    /// A `]` with nothing to close.
    #[fail(display = "A ']' was found with no '[' before it.")]
    UnmatchedCloseBracket,

    /// A binary operator with no left operand.
    #[fail(display = "The operator '{}' has nothing on its left.", _0)]
    LeadingBinaryOperator(char),

    /// A binary operator with no right operand.
    #[fail(display = "The operator '{}' has nothing on its right.", _0)]
    TrailingBinaryOperator(char),

    /// A unary operator with no operand.
    #[fail(display = "The operator '{}' has nothing to operate on.", _0)]
    TrailingUnaryOperator(char),

    /// `a` applied to a complex, or `r`/`i` applied to a real.
    #[fail(display = "The operator '{}' cannot be applied to {}.", _0, _1)]
    UnaryTypeMismatch(char, &'static str),

    /// A binary operator joining a real and a complex.
    #[fail(display = "The operator '{}' must join two real numbers or two complex numbers.", _0)]
    MixedTypeOperands(char),

    /// The term reduces to a real, or to nothing at all.
    #[fail(display = "The result of '{}' is not a complex number.", _0)]
    ResultNotComplex(String),

    /// Operands left over with no operator to join them.
    #[fail(display = "'{}' contains values with no operator between them.", _0)]
    LeftoverTokens(String),

    /// More distinct real literals than the pool holds.
    #[fail(display = "Up to 10 unique normal numbers can be defined.")]
    TooManyConstants,

    /// More distinct complex literals than the pool holds.
    #[fail(display = "Up to 10 unique complex numbers can be defined.")]
    TooManyComplexConstants,

    /// The compiled first term does not produce exactly one complex.
    #[fail(display = "The result of the first term is not a complex number.")]
    FirstTermNotComplex,

    /// The compiled next-term rule does not produce exactly one complex.
    #[fail(display = "The result of the rule for the next term is not a complex number.")]
    NextTermNotComplex,

    /// A run of characters that is not a number.
    #[fail(display = "'{}' is not a valid number.", _0)]
    InvalidNumber(String),

    /// A bracketed literal that is not `[real,real]`.
    #[fail(display = "'{}' must have the form [x,y].", _0)]
    MalformedComplexLiteral(String),

    /// One half of a bracketed literal is a complex.
    #[fail(display = "'{}' must be a real number to be part of a complex number.", _0)]
    ComponentNotReal(String),
}

impl CompileError {
    /// The message shown to someone who typed the formula in.
    pub fn message_for_users(&self) -> String {
        format!("The given formula is invalid.\n{}", self)
    }
}

/// Failures that stop a frame from being drawn or saved.
#[derive(Debug, Fail)]
pub enum RenderError {
    /// The formula never compiled.
    #[fail(display = "{}", _0)]
    Compile(#[cause] CompileError),

    /// A display rectangle with no width or no height.
    #[fail(display = "Cannot use these bounds to display a set: {}", _0)]
    DegenerateBounds(String),

    /// A command-line value that does not parse.
    #[fail(display = "Could not parse the {}: '{}'", _0, _1)]
    InvalidArgument(&'static str, String),

    /// No fractal is known under this name.
    #[fail(display = "No built-in fractal is called '{}'.", _0)]
    UnknownFractal(String),

    /// The formula has no Julia companion.
    #[fail(display = "'{}' does not end in +c, so it has no Julia set.", _0)]
    NoJuliaSet(String),

    /// Writing the image out failed.
    #[fail(display = "Could not write the image: {}", _0)]
    Io(#[cause] std::io::Error),
}

impl From<CompileError> for RenderError {
    fn from(e: CompileError) -> Self {
        RenderError::Compile(e)
    }
}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        RenderError::Io(e)
    }
}
