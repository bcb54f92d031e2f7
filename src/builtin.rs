//! The formulas available without typing anything, and the Julia
//! companion of a formula.

use crate::tokenizer::split_formula;

/// A named formula.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Builtin {
    /// Display name.
    pub name: &'static str,
    /// Formula text.
    pub formula: &'static str,
}

/// Every built-in formula.
pub const BUILTINS: [Builtin; 3] = [
    Builtin {
        name: "Mandelbrot",
        formula: "c;p*p+c",
    },
    Builtin {
        name: "Burning Ship",
        formula: "c;[arp,aip]*[arp,aip]+c",
    },
    Builtin {
        name: "Buffalo",
        formula: "c;[arp,aip]*[arp,aip]-[arp,aip]+c",
    },
];

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Finds a built-in by name, ignoring case, spaces and punctuation, so
/// `burning-ship` finds "Burning Ship".
pub fn builtin(name: &str) -> Option<&'static Builtin> {
    let wanted = normalize(name);
    BUILTINS.iter().find(|b| normalize(b.name) == wanted)
}

/// The Julia set that goes with a formula whose rule ends by adding the
/// current point: the rule adds the selected point instead, and the
/// sequence starts from the current point.
pub fn julia_formula(raw: &str) -> Option<String> {
    let (_, rule) = split_formula(raw).ok()?;
    let body = rule.strip_suffix("+c")?;
    Some(format!("c;{}+u", body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;

    #[test]
    fn every_builtin_compiles() {
        for b in BUILTINS.iter() {
            assert!(compile(b.formula).is_ok(), "{} failed to compile", b.name);
        }
    }

    #[test]
    fn names_are_forgiving() {
        assert_eq!(builtin("burning-ship").map(|b| b.formula), Some("c;[arp,aip]*[arp,aip]+c"));
        assert_eq!(builtin("MANDELBROT").map(|b| b.name), Some("Mandelbrot"));
        assert_eq!(builtin("newton"), None);
    }

    #[test]
    fn julia_companions() {
        assert_eq!(julia_formula("c;p*p+c"), Some("c;p*p+u".to_string()));
        assert_eq!(
            julia_formula("c;[arp,aip]*[arp,aip]+c"),
            Some("c;[arp,aip]*[arp,aip]+u".to_string())
        );
        assert_eq!(julia_formula("c;p*p-c"), None);
        assert_eq!(julia_formula("c"), None);
    }
}
