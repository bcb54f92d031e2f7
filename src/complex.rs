//! The complex value type every other part of the crate works in, plus
//! the little text parsers the command line uses to read points and
//! image sizes.
//!
//! We lean on `num`'s `Complex<f64>`: it is `Copy`, its `+`, `-` and `*`
//! return fresh values rather than mutating a receiver, and
//! `norm_sqr()` is the squared modulus the escape test wants.

use std::str::FromStr;

/// A point on the complex plane, and every iterate derived from one.
pub type Complex = num::Complex<f64>;

/// The origin.  Also the placeholder bound to every special reference
/// when a freshly compiled formula is test-driven.
pub const ZERO: Complex = Complex { re: 0.0, im: 0.0 };

/// Given a string and a separator, returns the two values
/// separated by the separator.
pub fn parse_pair<T: FromStr>(s: &str, separator: char) -> Option<(T, T)> {
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

/// A specific implementation of parse_pair using a comma and expecting
/// floating point numbers.
pub fn parse_complex(s: &str) -> Option<Complex> {
    parse_pair(s, ',').map(|(re, im)| Complex { re, im })
}
