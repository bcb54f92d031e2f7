#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fractal explorer
//!
//! An escape-time fractal is drawn by taking each point on the complex
//! plane, building a sequence from it, and watching how quickly (if at
//! all) that sequence runs off to infinity.  The Mandelbrot set starts
//! its sequence at the point itself and squares-and-adds from there:
//! `c;p*p+c` in the little formula language this crate understands.
//!
//! A formula has two terms separated by `;`: how to make the first term
//! of the sequence, and how to make each term from the ones before it.
//! Terms are written with the special values `c` (the current point),
//! `p` (the previous term), `f` (the first term) and `u` (a point the
//! user picked); complex literals `[x,y]`; plain numbers; the unary
//! operators `a` (absolute value), `r` and `i` (real and imaginary
//! part); and `*`, `+` and `-`.  There are no parentheses: unary
//! operators bind first, then `*`, then `+` and `-`, left to right.
//!
//! Formulas are compiled once to a small postfix program, which a stack
//! machine then runs for every point and every iteration.  What stops an
//! orbit, and how the point is colored, is up to an `EscapePolicy`:
//! the classic escape radius, or one of the orbit traps.

pub mod builtin;
pub mod compiler;
pub mod complex;
pub mod engine;
pub mod errors;
pub mod escape;
pub mod formula;
pub mod planes;
pub mod tokenizer;
pub mod traps;

pub use compiler::compile;
pub use complex::Complex;
pub use engine::{EvalFault, IterationContext, Machine};
pub use errors::{CompileError, RenderError};
pub use escape::{render, EscapeTime, Orbit, RenderOutcome, RenderSettings};
pub use formula::CompiledFormula;
pub use planes::{DisplayBounds, PlaneMapper};
pub use traps::EscapePolicy;
