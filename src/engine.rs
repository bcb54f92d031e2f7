//! The stack machine that runs compiled terms.
//!
//! A `Machine` owns its two stacks and the per-evaluation cache of
//! dynamic complex constants, so one can be kept per renderer (or per
//! worker) and reused pixel after pixel without reallocating.  Nothing
//! survives from one `evaluate` call into the next.

use crate::complex::{Complex, ZERO};
use crate::formula::{ComplexConstant, CompiledTerm, ConstantPool, Instruction, Kind, Special, MAX_CONSTANTS};

/// Why a program produced no value.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum EvalFault {
    /// The program reads a special value the context does not have, such
    /// as `u` before any point was selected.  Not an error: the pixel is
    /// simply not drawn.
    ValueUnavailable(Special),
    /// The program popped an empty stack or named an empty constant slot.
    /// Compiled formulas are checked for this before they are handed out.
    Malformed,
}

/// The values a term may refer to by letter, for one evaluation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IterationContext {
    /// `c`
    pub current_point: Complex,
    /// `u`
    pub user_point: Option<Complex>,
    /// `f`
    pub first_iterate: Option<Complex>,
    /// `p`
    pub previous_iterate: Option<Complex>,
}

impl IterationContext {
    /// Bindings for the first term: the sequence does not exist yet.
    pub fn for_first_term(point: Complex, user_point: Option<Complex>) -> Self {
        IterationContext {
            current_point: point,
            user_point,
            first_iterate: None,
            previous_iterate: None,
        }
    }

    /// Bindings for the rule producing the next term.
    pub fn for_next_term(
        point: Complex,
        user_point: Option<Complex>,
        first: Complex,
        previous: Complex,
    ) -> Self {
        IterationContext {
            current_point: point,
            user_point,
            first_iterate: Some(first),
            previous_iterate: Some(previous),
        }
    }

    /// Every special value bound to zero.
    pub fn placeholder() -> Self {
        IterationContext::for_next_term(ZERO, Some(ZERO), ZERO, ZERO)
    }

    #[inline]
    fn lookup(&self, special: Special) -> Result<Complex, EvalFault> {
        let value = match special {
            Special::Point => Some(self.current_point),
            Special::User => self.user_point,
            Special::First => self.first_iterate,
            Special::Previous => self.previous_iterate,
        };
        value.ok_or(EvalFault::ValueUnavailable(special))
    }
}

/// Runs postfix programs.
#[derive(Debug)]
pub struct Machine {
    reals: Vec<f64>,
    complexes: Vec<Complex>,
    memo: [Option<Complex>; MAX_CONSTANTS],
}

impl Default for Machine {
    fn default() -> Self {
        Machine::new()
    }
}

impl Machine {
    /// A machine with empty stacks.
    pub fn new() -> Machine {
        Machine {
            reals: Vec::with_capacity(16),
            complexes: Vec::with_capacity(16),
            memo: [None; MAX_CONSTANTS],
        }
    }

    fn reset(&mut self) {
        self.reals.clear();
        self.complexes.clear();
        self.memo = [None; MAX_CONSTANTS];
    }

    /// Runs `term` and returns the complex it leaves behind.
    ///
    /// Compiled formulas leave exactly one complex and no reals; that is
    /// checked once at compile time by `verify`, not here.
    pub fn evaluate(
        &mut self,
        term: &CompiledTerm,
        constants: &ConstantPool,
        context: &IterationContext,
    ) -> Result<Complex, EvalFault> {
        self.reset();
        self.run(term, constants, context)?;
        self.complexes.pop().ok_or(EvalFault::Malformed)
    }

    /// Runs `term` with every special bound to zero and reports whether it
    /// finished with exactly one complex on the stack and nothing else.
    pub fn verify(&mut self, term: &CompiledTerm, constants: &ConstantPool) -> bool {
        self.reset();
        self.run(term, constants, &IterationContext::placeholder()).is_ok()
            && self.reals.is_empty()
            && self.complexes.len() == 1
    }

    fn run(
        &mut self,
        term: &CompiledTerm,
        constants: &ConstantPool,
        context: &IterationContext,
    ) -> Result<(), EvalFault> {
        for instruction in term.instructions() {
            match *instruction {
                Instruction::PushSpecial(special) => {
                    let value = context.lookup(special)?;
                    self.complexes.push(value);
                }
                Instruction::PushReal(slot) => {
                    let value = constants.real(slot).ok_or(EvalFault::Malformed)?;
                    self.reals.push(value);
                }
                Instruction::PushComplex(slot) => {
                    let value = self.resolve(slot, constants, context)?;
                    self.complexes.push(value);
                }
                Instruction::Binary(op, Kind::Real) => {
                    let right = self.pop_real()?;
                    let left = self.pop_real()?;
                    self.reals.push(op.apply(left, right));
                }
                Instruction::Binary(op, Kind::Complex) => {
                    let right = self.pop_complex()?;
                    let left = self.pop_complex()?;
                    self.complexes.push(op.apply(left, right));
                }
                Instruction::Abs => {
                    let value = self.pop_real()?;
                    self.reals.push(value.abs());
                }
                Instruction::RealPart => {
                    let value = self.pop_complex()?;
                    self.reals.push(value.re);
                }
                Instruction::ImagPart => {
                    let value = self.pop_complex()?;
                    self.reals.push(value.im);
                }
                Instruction::MakeComplex => {
                    let im = self.pop_real()?;
                    let re = self.pop_real()?;
                    self.complexes.push(Complex::new(re, im));
                }
            }
        }
        Ok(())
    }

    /// The value of a complex constant.  A dynamic slot runs its sub-term
    /// on top of the current stacks, at most once per `evaluate` call.
    fn resolve(
        &mut self,
        slot: usize,
        constants: &ConstantPool,
        context: &IterationContext,
    ) -> Result<Complex, EvalFault> {
        if let Some(value) = self.memo.get(slot).copied().flatten() {
            return Ok(value);
        }
        match constants.complex(slot) {
            Some(ComplexConstant::Fixed(value)) => Ok(*value),
            Some(ComplexConstant::Dynamic(term)) => {
                self.run(term, constants, context)?;
                let value = self.pop_complex()?;
                self.memo[slot] = Some(value);
                Ok(value)
            }
            None => Err(EvalFault::Malformed),
        }
    }

    #[inline]
    fn pop_real(&mut self) -> Result<f64, EvalFault> {
        self.reals.pop().ok_or(EvalFault::Malformed)
    }

    #[inline]
    fn pop_complex(&mut self) -> Result<Complex, EvalFault> {
        self.complexes.pop().ok_or(EvalFault::Malformed)
    }

    #[cfg(test)]
    fn memoized(&self) -> usize {
        self.memo.iter().filter(|m| m.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::BinaryOperator;

    fn folded_pair(special: Special) -> CompiledTerm {
        CompiledTerm::new(
            format!("[ar{0},ai{0}]", special.symbol()),
            vec![
                Instruction::PushSpecial(special),
                Instruction::RealPart,
                Instruction::Abs,
                Instruction::PushSpecial(special),
                Instruction::ImagPart,
                Instruction::Abs,
                Instruction::MakeComplex,
            ],
        )
    }

    #[test]
    fn subtraction_pops_right_operand_first() {
        let mut pool = ConstantPool::default();
        let one = pool
            .intern_complex(ComplexConstant::Fixed(Complex::new(1.0, 0.0)))
            .unwrap();
        let term = CompiledTerm::new(
            "p-[1.0,0.0]".to_string(),
            vec![
                Instruction::PushSpecial(Special::Previous),
                Instruction::PushComplex(one),
                Instruction::Binary(BinaryOperator::Subtract, Kind::Complex),
            ],
        );
        let context = IterationContext::placeholder();
        let result = Machine::new().evaluate(&term, &pool, &context);
        assert_eq!(result, Ok(Complex::new(-1.0, 0.0)));
    }

    #[test]
    fn missing_user_point_is_reported_not_panicked() {
        let term = CompiledTerm::new("u".to_string(), vec![Instruction::PushSpecial(Special::User)]);
        let context = IterationContext::for_first_term(ZERO, None);
        let result = Machine::new().evaluate(&term, &ConstantPool::default(), &context);
        assert_eq!(result, Err(EvalFault::ValueUnavailable(Special::User)));
    }

    #[test]
    fn dynamic_constants_run_once_per_evaluation() {
        let mut pool = ConstantPool::default();
        let slot = pool
            .intern_complex(ComplexConstant::Dynamic(folded_pair(Special::Previous)))
            .unwrap();
        let term = CompiledTerm::new(
            "[arp,aip]*[arp,aip]".to_string(),
            vec![
                Instruction::PushComplex(slot),
                Instruction::PushComplex(slot),
                Instruction::Binary(BinaryOperator::Multiply, Kind::Complex),
            ],
        );
        let mut machine = Machine::new();
        let context = IterationContext::for_next_term(ZERO, None, ZERO, Complex::new(-1.0, 2.0));
        assert_eq!(machine.evaluate(&term, &pool, &context), Ok(Complex::new(-3.0, 4.0)));
        assert_eq!(machine.memoized(), 1);

        // A fresh call must not see the previous call's cached value.
        let context = IterationContext::for_next_term(ZERO, None, ZERO, Complex::new(1.0, 1.0));
        assert_eq!(machine.evaluate(&term, &pool, &context), Ok(Complex::new(0.0, 2.0)));
    }

    #[test]
    fn verify_rejects_leftovers_and_underflow() {
        let pool = ConstantPool::default();
        let mut machine = Machine::new();
        let underflow = CompiledTerm::new(
            "+".to_string(),
            vec![Instruction::Binary(BinaryOperator::Add, Kind::Complex)],
        );
        let leftover = CompiledTerm::new(
            "cc".to_string(),
            vec![Instruction::PushSpecial(Special::Point), Instruction::PushSpecial(Special::Point)],
        );
        let fine = CompiledTerm::new("c".to_string(), vec![Instruction::PushSpecial(Special::Point)]);
        assert!(!machine.verify(&underflow, &pool));
        assert!(!machine.verify(&leftover, &pool));
        assert!(machine.verify(&fine, &pool));
    }
}
