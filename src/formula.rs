//! The compiled form of a formula: a postfix program per term, and the
//! two constant pools those programs index into.
//!
//! A `CompiledFormula` is built once and never changes afterwards, so
//! any number of renders may read it at the same time.

use std::ops::{Add, Mul, Sub};

use crate::complex::Complex;
use crate::errors::CompileError;

/// How many distinct literals of each kind a single formula may define.
pub const MAX_CONSTANTS: usize = 10;

/// A value the formula names with a single letter instead of spelling it
/// out; it is looked up in the iteration context when the program runs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Special {
    /// `c`: the point currently being drawn.
    Point,
    /// `p`: the previous term of the sequence.
    Previous,
    /// `f`: the first term of the sequence.
    First,
    /// `u`: the point last selected by the user.
    User,
}

impl Special {
    /// The letter for a special value, if `c` is one.
    pub fn from_symbol(c: char) -> Option<Special> {
        match c {
            'c' => Some(Special::Point),
            'p' => Some(Special::Previous),
            'f' => Some(Special::First),
            'u' => Some(Special::User),
            _ => None,
        }
    }

    /// The letter this value is written as.
    pub fn symbol(self) -> char {
        match self {
            Special::Point => 'c',
            Special::Previous => 'p',
            Special::First => 'f',
            Special::User => 'u',
        }
    }

    /// `p` and `f` only exist once the sequence has a first term.
    pub fn allowed_in_first_term(self) -> bool {
        match self {
            Special::Previous | Special::First => false,
            Special::Point | Special::User => true,
        }
    }
}

/// Whether a value is a plain real number or a complex one.  Every
/// sub-expression has exactly one of these, decided at compile time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    /// A single `f64`.
    Real,
    /// A `Complex`.
    Complex,
}

impl Kind {
    /// Used in error messages.
    pub fn describe(self) -> &'static str {
        match self {
            Kind::Real => "a real number",
            Kind::Complex => "a complex number",
        }
    }
}

/// `+`, `-` and `*`.  All three work on two reals or on two complexes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    /// `+`
    Add,
    /// `-`; the right operand is taken from the left.
    Subtract,
    /// `*`
    Multiply,
}

impl BinaryOperator {
    /// The operator written as `c`, if any.
    pub fn from_symbol(c: char) -> Option<BinaryOperator> {
        match c {
            '+' => Some(BinaryOperator::Add),
            '-' => Some(BinaryOperator::Subtract),
            '*' => Some(BinaryOperator::Multiply),
            _ => None,
        }
    }

    /// How the operator is written.
    pub fn symbol(self) -> char {
        match self {
            BinaryOperator::Add => '+',
            BinaryOperator::Subtract => '-',
            BinaryOperator::Multiply => '*',
        }
    }

    /// Applies the operator.  `num`'s complex type implements the same
    /// arithmetic traits as `f64`, so one body serves both kinds.
    #[inline]
    pub fn apply<T>(self, left: T, right: T) -> T
    where
        T: Add<Output = T> + Sub<Output = T> + Mul<Output = T>,
    {
        match self {
            BinaryOperator::Add => left + right,
            BinaryOperator::Subtract => left - right,
            BinaryOperator::Multiply => left * right,
        }
    }
}

/// `a`, `r` and `i`.  Each produces a real.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOperator {
    /// `a`: absolute value of a real.
    Abs,
    /// `r`: real part of a complex.
    RealPart,
    /// `i`: imaginary part of a complex.
    ImagPart,
}

impl UnaryOperator {
    /// The operator written as `c`, if any.
    pub fn from_symbol(c: char) -> Option<UnaryOperator> {
        match c {
            'a' => Some(UnaryOperator::Abs),
            'r' => Some(UnaryOperator::RealPart),
            'i' => Some(UnaryOperator::ImagPart),
            _ => None,
        }
    }

    /// How the operator is written.
    pub fn symbol(self) -> char {
        match self {
            UnaryOperator::Abs => 'a',
            UnaryOperator::RealPart => 'r',
            UnaryOperator::ImagPart => 'i',
        }
    }

    /// The kind the operand must have.
    pub fn operand_kind(self) -> Kind {
        match self {
            UnaryOperator::Abs => Kind::Real,
            UnaryOperator::RealPart | UnaryOperator::ImagPart => Kind::Complex,
        }
    }

    /// The instruction that carries the operator out.
    pub fn instruction(self) -> Instruction {
        match self {
            UnaryOperator::Abs => Instruction::Abs,
            UnaryOperator::RealPart => Instruction::RealPart,
            UnaryOperator::ImagPart => Instruction::ImagPart,
        }
    }
}

/// One step of a postfix program.  The machine keeps a real stack and a
/// complex stack; each instruction says which it reads and writes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Instruction {
    /// Push a value from the iteration context onto the complex stack.
    PushSpecial(Special),
    /// Push a slot of the real pool onto the real stack.
    PushReal(usize),
    /// Push a slot of the complex pool onto the complex stack, running
    /// its sub-term first if the slot is dynamic.
    PushComplex(usize),
    /// Pop right, pop left, push `left op right` on the stack of that kind.
    Binary(BinaryOperator, Kind),
    /// Real to real.
    Abs,
    /// Complex to real.
    RealPart,
    /// Complex to real.
    ImagPart,
    /// Pop the imaginary part, pop the real part, push the complex.
    MakeComplex,
}

/// A term compiled to postfix.  `source` is the normalized text it was
/// compiled from; two dynamic literals with equal source share a slot.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledTerm {
    source: String,
    code: Vec<Instruction>,
}

impl CompiledTerm {
    /// Wraps an already-emitted instruction sequence.
    pub fn new(source: String, code: Vec<Instruction>) -> CompiledTerm {
        CompiledTerm { source, code }
    }

    /// The instructions, in execution order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.code
    }

    /// The normalized source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when running the term would read `special`, directly or via
    /// a dynamic complex constant.
    pub fn references(&self, special: Special, constants: &ConstantPool) -> bool {
        self.code.iter().any(|instruction| match *instruction {
            Instruction::PushSpecial(s) => s == special,
            Instruction::PushComplex(slot) => match constants.complex(slot) {
                Some(ComplexConstant::Dynamic(term)) => term.references(special, constants),
                _ => false,
            },
            _ => false,
        })
    }

    /// True when the term reads nothing from the iteration context.
    pub fn is_constant(&self, constants: &ConstantPool) -> bool {
        [Special::Point, Special::Previous, Special::First, Special::User]
            .iter()
            .all(|s| !self.references(*s, constants))
    }
}

/// A complex literal.  Literals built only from numbers are worked out
/// once; literals that mention a special value are kept as a program and
/// re-run at most once per evaluation.
#[derive(Clone, Debug, PartialEq)]
pub enum ComplexConstant {
    /// A literal like `[1,2.5]`.
    Fixed(Complex),
    /// A literal like `[arp,aip]`.
    Dynamic(CompiledTerm),
}

/// The interned literals of one formula, shared by both of its terms.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConstantPool {
    reals: [Option<f64>; MAX_CONSTANTS],
    complexes: [Option<ComplexConstant>; MAX_CONSTANTS],
}

impl ConstantPool {
    /// The slot holding `value`, adding it if it is new.
    pub fn intern_real(&mut self, value: f64) -> Result<usize, CompileError> {
        intern(&mut self.reals, value, |held| *held == value)
            .ok_or(CompileError::TooManyConstants)
    }

    /// The slot holding `constant`, adding it if it is new.  Fixed
    /// literals match by value, dynamic ones by their normalized text.
    pub fn intern_complex(&mut self, constant: ComplexConstant) -> Result<usize, CompileError> {
        let matches = |held: &ComplexConstant| match (held, &constant) {
            (ComplexConstant::Fixed(a), ComplexConstant::Fixed(b)) => a == b,
            (ComplexConstant::Dynamic(a), ComplexConstant::Dynamic(b)) => a.source == b.source,
            _ => false,
        };
        if let Some(slot) = self.complexes.iter().position(|held| held.as_ref().map_or(false, &matches)) {
            return Ok(slot);
        }
        match self.complexes.iter().position(Option::is_none) {
            Some(slot) => {
                self.complexes[slot] = Some(constant);
                Ok(slot)
            }
            None => Err(CompileError::TooManyComplexConstants),
        }
    }

    /// The real in `slot`.
    #[inline]
    pub fn real(&self, slot: usize) -> Option<f64> {
        self.reals.get(slot).copied().flatten()
    }

    /// The complex literal in `slot`.
    #[inline]
    pub fn complex(&self, slot: usize) -> Option<&ComplexConstant> {
        self.complexes.get(slot).and_then(Option::as_ref)
    }

    /// Number of occupied real slots.
    pub fn real_count(&self) -> usize {
        self.reals.iter().filter(|slot| slot.is_some()).count()
    }

    /// Number of occupied complex slots.
    pub fn complex_count(&self) -> usize {
        self.complexes.iter().filter(|slot| slot.is_some()).count()
    }
}

fn intern<T, F>(slots: &mut [Option<T>], value: T, matches: F) -> Option<usize>
where
    F: Fn(&T) -> bool,
{
    if let Some(slot) = slots.iter().position(|held| held.as_ref().map_or(false, &matches)) {
        return Some(slot);
    }
    let slot = slots.iter().position(Option::is_none)?;
    slots[slot] = Some(value);
    Some(slot)
}

/// A formula ready to run: what the compiler hands the renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledFormula {
    pub(crate) first_term: CompiledTerm,
    pub(crate) next_term: CompiledTerm,
    pub(crate) constants: ConstantPool,
    pub(crate) constant_first_iterate: Option<Complex>,
}

impl CompiledFormula {
    /// The program producing the first term of the sequence.
    pub fn first_term(&self) -> &CompiledTerm {
        &self.first_term
    }

    /// The program producing each following term.
    pub fn next_term(&self) -> &CompiledTerm {
        &self.next_term
    }

    /// The interned literals.
    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    /// The first term, when it reads nothing from the context and could
    /// therefore be worked out at compile time.
    pub fn constant_first_iterate(&self) -> Option<Complex> {
        self.constant_first_iterate
    }

    /// True when nothing can be drawn until the user picks a point.
    pub fn needs_user_point(&self) -> bool {
        self.first_term.references(Special::User, &self.constants)
            || self.next_term.references(Special::User, &self.constants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_holds_ten_of_each() {
        let mut pool = ConstantPool::default();
        for i in 0..MAX_CONSTANTS {
            assert_eq!(pool.intern_real(i as f64), Ok(i));
        }
        assert_eq!(pool.intern_real(3.0), Ok(3));
        assert_eq!(pool.intern_real(10.0), Err(CompileError::TooManyConstants));
        assert_eq!(pool.real_count(), MAX_CONSTANTS);
    }

    #[test]
    fn fixed_and_dynamic_literals_never_share_a_slot() {
        let mut pool = ConstantPool::default();
        let fixed = ComplexConstant::Fixed(Complex::new(1.0, 2.0));
        let dynamic = ComplexConstant::Dynamic(CompiledTerm::new(
            "[rc,ic]".to_string(),
            vec![
                Instruction::PushSpecial(Special::Point),
                Instruction::RealPart,
                Instruction::PushSpecial(Special::Point),
                Instruction::ImagPart,
                Instruction::MakeComplex,
            ],
        ));
        assert_eq!(pool.intern_complex(fixed.clone()), Ok(0));
        assert_eq!(pool.intern_complex(dynamic.clone()), Ok(1));
        assert_eq!(pool.intern_complex(dynamic), Ok(1));
        assert_eq!(pool.intern_complex(fixed), Ok(0));
        assert_eq!(pool.complex_count(), 2);
    }

    #[test]
    fn subtraction_keeps_operand_order() {
        assert_eq!(BinaryOperator::Subtract.apply(1.0, 3.0), -2.0);
        assert_eq!(
            BinaryOperator::Subtract.apply(Complex::new(0.0, 0.0), Complex::new(1.0, 0.0)),
            Complex::new(-1.0, 0.0)
        );
    }

    #[test]
    fn references_look_through_dynamic_literals() {
        let mut pool = ConstantPool::default();
        let inner = CompiledTerm::new(
            "[ru,iu]".to_string(),
            vec![
                Instruction::PushSpecial(Special::User),
                Instruction::RealPart,
                Instruction::PushSpecial(Special::User),
                Instruction::ImagPart,
                Instruction::MakeComplex,
            ],
        );
        let slot = pool.intern_complex(ComplexConstant::Dynamic(inner)).unwrap();
        let outer = CompiledTerm::new("[ru,iu]".to_string(), vec![Instruction::PushComplex(slot)]);
        assert!(outer.references(Special::User, &pool));
        assert!(!outer.references(Special::Point, &pool));
        assert!(!outer.is_constant(&pool));
    }
}
