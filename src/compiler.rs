//! Turns formula text into a `CompiledFormula`.
//!
//! There is no grouping in the formula language: apart from the brackets
//! that spell out a complex literal, everything is resolved by three
//! left-to-right sweeps over the token list.
//!
//! 1. Unary operators (taken right to left, so `aarp` nests properly)
//!    swallow the operand on their right.
//! 2. `*` joins its neighbours.
//! 3. `+` and `-` join theirs.
//!
//! Every sweep checks kinds as it goes: `a` wants a real, `r` and `i`
//! want a complex, and binary operators want two of the same.  Joining
//! two operands simply concatenates their code and appends the
//! operator, which is all postfix needs.

use itertools::Itertools;
use tracing::debug;

use crate::engine::{IterationContext, Machine};
use crate::errors::CompileError;
use crate::formula::{
    BinaryOperator, ComplexConstant, CompiledFormula, CompiledTerm, ConstantPool, Instruction,
    Kind, UnaryOperator,
};
use crate::tokenizer::{tokenize_formula, tokenize_term, Token};

/// A sub-expression that has been fully reduced: its kind, its code, and
/// its normalized text.
#[derive(Clone, Debug)]
struct Operand {
    kind: Kind,
    code: Vec<Instruction>,
    text: String,
    // True when anything in here reads the iteration context.
    dynamic: bool,
}

impl Operand {
    fn unary(mut self, op: UnaryOperator) -> Result<Operand, CompileError> {
        if self.kind != op.operand_kind() {
            return Err(CompileError::UnaryTypeMismatch(op.symbol(), self.kind.describe()));
        }
        self.code.push(op.instruction());
        self.kind = Kind::Real;
        self.text.insert(0, op.symbol());
        Ok(self)
    }

    fn join(mut self, op: BinaryOperator, right: Operand) -> Result<Operand, CompileError> {
        if self.kind != right.kind {
            return Err(CompileError::MixedTypeOperands(op.symbol()));
        }
        self.code.extend(right.code);
        self.code.push(Instruction::Binary(op, self.kind));
        self.text.push(op.symbol());
        self.text.push_str(&right.text);
        self.dynamic |= right.dynamic;
        Ok(self)
    }
}

#[derive(Clone, Debug)]
enum Item {
    Operand(Operand),
    Unary(UnaryOperator),
    Binary(BinaryOperator),
}

impl Item {
    fn is_operand(&self) -> bool {
        match self {
            Item::Operand(_) => true,
            _ => false,
        }
    }

    fn text(&self) -> String {
        match self {
            Item::Operand(operand) => operand.text.clone(),
            Item::Unary(op) => op.symbol().to_string(),
            Item::Binary(op) => op.symbol().to_string(),
        }
    }
}

/// Removes and returns the operand at `index`, leaving the list alone if
/// there is no operand there.
fn take_operand(items: &mut Vec<Item>, index: usize) -> Option<Operand> {
    if !items.get(index).map_or(false, Item::is_operand) {
        return None;
    }
    match items.remove(index) {
        Item::Operand(operand) => Some(operand),
        _ => None,
    }
}

fn apply_unary(items: &mut Vec<Item>) -> Result<(), CompileError> {
    for index in (0..items.len()).rev() {
        let op = match items[index] {
            Item::Unary(op) => op,
            _ => continue,
        };
        let operand = take_operand(items, index + 1)
            .ok_or_else(|| CompileError::TrailingUnaryOperator(op.symbol()))?;
        items[index] = Item::Operand(operand.unary(op)?);
    }
    Ok(())
}

fn apply_binary(items: &mut Vec<Item>, ops: &[BinaryOperator]) -> Result<(), CompileError> {
    let mut index = 0;
    while index < items.len() {
        let op = match items[index] {
            Item::Binary(op) if ops.contains(&op) => op,
            _ => {
                index += 1;
                continue;
            }
        };
        if index == 0 || !items[index - 1].is_operand() {
            return Err(CompileError::LeadingBinaryOperator(op.symbol()));
        }
        let right = take_operand(items, index + 1)
            .ok_or_else(|| CompileError::TrailingBinaryOperator(op.symbol()))?;
        let left = take_operand(items, index - 1)
            .ok_or_else(|| CompileError::LeadingBinaryOperator(op.symbol()))?;
        // The operator has slid into the left operand's place.
        items[index - 1] = Item::Operand(left.join(op, right)?);
    }
    Ok(())
}

/// Holds the constant pools while both terms of one formula compile.
#[derive(Debug, Default)]
pub struct Compiler {
    constants: ConstantPool,
    machine: Machine,
}

impl Compiler {
    /// A compiler with empty pools.
    pub fn new() -> Compiler {
        Compiler::default()
    }

    /// Compiles one term.  The result must be a complex.
    pub fn compile_term(&mut self, tokens: &[Token], first_term: bool) -> Result<CompiledTerm, CompileError> {
        let operand = self.reduce(tokens, first_term)?;
        if operand.kind != Kind::Complex {
            return Err(CompileError::ResultNotComplex(operand.text));
        }
        Ok(CompiledTerm::new(operand.text, operand.code))
    }

    /// Checks both terms and packages them with the pools.
    pub fn finish(
        mut self,
        first_term: CompiledTerm,
        next_term: CompiledTerm,
    ) -> Result<CompiledFormula, CompileError> {
        if !self.machine.verify(&first_term, &self.constants) {
            return Err(CompileError::FirstTermNotComplex);
        }
        if !self.machine.verify(&next_term, &self.constants) {
            return Err(CompileError::NextTermNotComplex);
        }
        let constant_first_iterate = if first_term.is_constant(&self.constants) {
            let context = IterationContext::placeholder();
            self.machine.evaluate(&first_term, &self.constants, &context).ok()
        } else {
            None
        };
        Ok(CompiledFormula {
            first_term,
            next_term,
            constants: self.constants,
            constant_first_iterate,
        })
    }

    fn reduce(&mut self, tokens: &[Token], first_term: bool) -> Result<Operand, CompileError> {
        let mut items = tokens
            .iter()
            .map(|token| self.lower(token, first_term))
            .collect::<Result<Vec<Item>, CompileError>>()?;

        apply_unary(&mut items)?;
        apply_binary(&mut items, &[BinaryOperator::Multiply])?;
        apply_binary(&mut items, &[BinaryOperator::Add, BinaryOperator::Subtract])?;

        match items.len() {
            0 => Err(CompileError::ResultNotComplex(String::new())),
            1 => take_operand(&mut items, 0)
                .ok_or_else(|| CompileError::LeftoverTokens(items.iter().map(Item::text).join(""))),
            _ => Err(CompileError::LeftoverTokens(items.iter().map(Item::text).join(""))),
        }
    }

    fn lower(&mut self, token: &Token, first_term: bool) -> Result<Item, CompileError> {
        match token {
            Token::Binary(op) => Ok(Item::Binary(*op)),
            Token::Unary(op) => Ok(Item::Unary(*op)),
            Token::Special(special) => {
                if first_term && !special.allowed_in_first_term() {
                    return Err(CompileError::SpecialReferenceInFirstTerm(special.symbol()));
                }
                Ok(Item::Operand(Operand {
                    kind: Kind::Complex,
                    code: vec![Instruction::PushSpecial(*special)],
                    text: special.symbol().to_string(),
                    dynamic: true,
                }))
            }
            Token::Literal(text) => {
                let value: f64 = text
                    .parse()
                    .map_err(|_| CompileError::InvalidNumber(text.clone()))?;
                let slot = self.constants.intern_real(value)?;
                Ok(Item::Operand(Operand {
                    kind: Kind::Real,
                    code: vec![Instruction::PushReal(slot)],
                    text: format!("{:?}", value),
                    dynamic: false,
                }))
            }
            Token::Bracketed(text) => self.lower_complex(text, first_term).map(Item::Operand),
        }
    }

    /// `[x,y]`: each half is its own real expression.  Literals that read
    /// nothing from the context are worked out now.
    fn lower_complex(&mut self, text: &str, first_term: bool) -> Result<Operand, CompileError> {
        let inner = text.trim_start_matches('[').trim_end_matches(']');
        let (re, im) = match inner.split(',').collect::<Vec<&str>>().as_slice() {
            [re, im] => (
                self.component(re, text, first_term)?,
                self.component(im, text, first_term)?,
            ),
            _ => return Err(CompileError::MalformedComplexLiteral(text.to_string())),
        };

        let source = format!("[{},{}]", re.text, im.text);
        let dynamic = re.dynamic || im.dynamic;
        let mut code = re.code;
        code.extend(im.code);
        code.push(Instruction::MakeComplex);
        let term = CompiledTerm::new(source.clone(), code);

        let constant = if dynamic {
            ComplexConstant::Dynamic(term)
        } else {
            let context = IterationContext::placeholder();
            let value = self
                .machine
                .evaluate(&term, &self.constants, &context)
                .map_err(|_| CompileError::MalformedComplexLiteral(text.to_string()))?;
            ComplexConstant::Fixed(value)
        };
        let slot = self.constants.intern_complex(constant)?;
        Ok(Operand {
            kind: Kind::Complex,
            code: vec![Instruction::PushComplex(slot)],
            text: source,
            dynamic,
        })
    }

    fn component(&mut self, text: &str, literal: &str, first_term: bool) -> Result<Operand, CompileError> {
        let tokens = tokenize_term(text)?;
        if tokens.is_empty() {
            return Err(CompileError::MalformedComplexLiteral(literal.to_string()));
        }
        let operand = self.reduce(&tokens, first_term)?;
        if operand.kind != Kind::Real {
            return Err(CompileError::ComponentNotReal(text.to_string()));
        }
        Ok(operand)
    }
}

/// Compiles formula text like `"c;p*p+c"`.
pub fn compile(raw: &str) -> Result<CompiledFormula, CompileError> {
    let (first_tokens, next_tokens) = tokenize_formula(raw)?;
    let mut compiler = Compiler::new();
    let first_term = compiler.compile_term(&first_tokens, true)?;
    let next_term = compiler.compile_term(&next_tokens, false)?;
    let formula = compiler.finish(first_term, next_term)?;
    debug!(
        formula = raw,
        first_len = formula.first_term().instructions().len(),
        next_len = formula.next_term().instructions().len(),
        reals = formula.constants().real_count(),
        complexes = formula.constants().complex_count(),
        "compiled formula"
    );
    Ok(formula)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complex::Complex;
    use crate::formula::Special;

    #[test]
    fn mandelbrot_compiles_to_postfix() {
        let formula = compile("c;p*p+c").unwrap();
        assert_eq!(
            formula.next_term().instructions(),
            &[
                Instruction::PushSpecial(Special::Previous),
                Instruction::PushSpecial(Special::Previous),
                Instruction::Binary(BinaryOperator::Multiply, Kind::Complex),
                Instruction::PushSpecial(Special::Point),
                Instruction::Binary(BinaryOperator::Add, Kind::Complex),
            ][..]
        );
        assert_eq!(formula.constants().real_count(), 0);
        assert_eq!(formula.constant_first_iterate(), None);
    }

    #[test]
    fn multiplication_binds_before_addition() {
        // c+p*p must become c (p p *) +, not (c p +) p *.
        let formula = compile("c;c+p*p").unwrap();
        assert_eq!(
            formula.next_term().instructions().last(),
            Some(&Instruction::Binary(BinaryOperator::Add, Kind::Complex))
        );
    }

    #[test]
    fn repeated_literals_share_slots() {
        let formula = compile("c;[2.0,2.0]*p+[2,2.0]").unwrap();
        assert_eq!(formula.constants().real_count(), 1);
        assert_eq!(formula.constants().complex_count(), 1);
    }

    #[test]
    fn dynamic_literals_share_slots_by_text() {
        let formula = compile("c;[arp,aip]*[arp,aip]-[arp,aip]+c").unwrap();
        assert_eq!(formula.constants().complex_count(), 1);
        match formula.constants().complex(0) {
            Some(ComplexConstant::Dynamic(term)) => assert_eq!(term.source(), "[arp,aip]"),
            other => panic!("expected a dynamic literal, got {:?}", other),
        }
    }

    #[test]
    fn constant_first_terms_are_precomputed() {
        let formula = compile("[1,0.5]*[1,0.5];p*p+c").unwrap();
        assert_eq!(formula.constant_first_iterate(), Some(Complex::new(0.75, 1.0)));
    }

    #[test]
    fn type_errors() {
        assert_eq!(compile("c;ap"), Err(CompileError::UnaryTypeMismatch('a', "a complex number")));
        assert_eq!(compile("c;r2*c"), Err(CompileError::UnaryTypeMismatch('r', "a real number")));
        assert_eq!(compile("c;p*2"), Err(CompileError::MixedTypeOperands('*')));
        assert_eq!(compile("c;rp+c"), Err(CompileError::MixedTypeOperands('+')));
        assert_eq!(compile("c;rp"), Err(CompileError::ResultNotComplex("rp".to_string())));
        assert_eq!(compile("c;[p,1]"), Err(CompileError::ComponentNotReal("p".to_string())));
    }

    #[test]
    fn operator_placement_errors() {
        assert_eq!(compile("c;p*+c"), Err(CompileError::TrailingBinaryOperator('*')));
        assert_eq!(compile("c;p+*c"), Err(CompileError::LeadingBinaryOperator('*')));
        assert_eq!(compile("c;p*a+c"), Err(CompileError::TrailingUnaryOperator('a')));
    }

    #[test]
    fn structural_errors() {
        assert_eq!(compile("c;"), Err(CompileError::ResultNotComplex(String::new())));
        assert_eq!(compile("c;cc"), Err(CompileError::LeftoverTokens("cc".to_string())));
        assert_eq!(compile("c;[1,2,3]"), Err(CompileError::MalformedComplexLiteral("[1,2,3]".to_string())));
        assert_eq!(compile("c;[,]"), Err(CompileError::MalformedComplexLiteral("[,]".to_string())));
        assert_eq!(compile("c;p*[1,]"), Err(CompileError::MalformedComplexLiteral("[1,]".to_string())));
        assert_eq!(compile("c;p*[1.2.3,0]"), Err(CompileError::InvalidNumber("1.2.3".to_string())));
    }

    #[test]
    fn eleventh_complex_literal_is_rejected() {
        let literals: Vec<String> = (0..11).map(|i| format!("[rc,{}]", i)).collect();
        let raw = format!("c;{}", literals.join("+"));
        assert_eq!(compile(&raw), Err(CompileError::TooManyConstants));

        let literals: Vec<String> = (0..11).map(|i| format!("[rc*{},ic*{}]", i % 4, i / 4)).collect();
        let raw = format!("c;{}", literals.join("+"));
        assert_eq!(compile(&raw), Err(CompileError::TooManyComplexConstants));
    }
}
