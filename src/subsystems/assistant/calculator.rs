//! Arithmetic phrase evaluator.
//!
//! Pattern-based, single-operation: pull up to two numerals out of the
//! phrase, pick the operation by a fixed keyword precedence, compute, and
//! explain.  It is not an expression parser: no parentheses, no nesting, no
//! third operand.  A phrase mentioning two operations resolves by the
//! precedence below, not by reading order.
//!
//! Precedence: percent → square root → power → add → subtract → multiply →
//! divide → modulo → bare-symbol fallback.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static NUMERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+(?:\.[0-9]+)?").expect("numeral pattern is valid"));

/// Words and symbols that make an utterance look like arithmetic.
const MATH_WORDS: &[&str] = &[
    "plus", "add", "minus", "subtract", "multiply", "times", "divide", "percent",
    "percentage", "square root", "sqrt", "power", "modulo", "mod", "remainder", "x",
];
const MATH_SYMBOLS: &[char] = &['+', '-', '*', '/', '^', '%'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Percentage,
    SquareRoot,
    Power,
    Square,
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Modulo,
}

/// Outcome of one successful evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    pub operation: OperationKind,
    pub operand1: f64,
    pub operand2: Option<f64>,
    pub value: f64,
    pub explanation: String,
}

impl Calculation {
    /// User-facing text: the explanation, plus a fixed-precision value for
    /// non-integral division (4 places) and percentage (2 places) results.
    pub fn render(&self) -> String {
        let non_integral = self.value.is_finite() && self.value.fract() != 0.0;
        match self.operation {
            OperationKind::Division if non_integral => {
                format!("{} ({:.4})", self.explanation, self.value)
            }
            OperationKind::Percentage if non_integral => {
                format!("{} ({:.2})", self.explanation, self.value)
            }
            _ => self.explanation.clone(),
        }
    }
}

/// Why a phrase produced no result.  `Display` is the response text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CalcError {
    #[error("Please provide numbers for calculation.")]
    NeedNumbers,
    #[error("Cannot divide by zero.")]
    DivideByZero,
    #[error(
        "Please specify the operation clearly. For example: \"calculate 15 plus 23\" or \"what is 10 percent of 200\""
    )]
    Unspecified,
}

/// Evaluate `phrase` and return the calculation or the reason there is none.
pub fn evaluate(phrase: &str) -> Result<Calculation, CalcError> {
    let operands: Vec<f64> = NUMERAL
        .find_iter(phrase)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect();
    let Some(&a) = operands.first() else {
        return Err(CalcError::NeedNumbers);
    };
    let b = operands.get(1).copied();

    let lower = phrase.to_lowercase();
    let has = |needle: &str| lower.contains(needle);

    if has("percent") || has("%") {
        let b = b.ok_or(CalcError::Unspecified)?;
        if has("of") {
            let value = a * b / 100.0;
            return Ok(calc(
                OperationKind::Percentage,
                a,
                Some(b),
                value,
                format!("{}% of {} = {}", num(a), num(b), num(value)),
            ));
        }
        if b == 0.0 {
            return Err(CalcError::DivideByZero);
        }
        let value = a / b * 100.0;
        return Ok(calc(
            OperationKind::Percentage,
            a,
            Some(b),
            value,
            format!("{} is {:.2}% of {}", num(a), value, num(b)),
        ));
    }

    if has("square root") || has("sqrt") {
        let value = a.sqrt();
        return Ok(calc(OperationKind::SquareRoot, a, b, value, format!("√{} = {}", num(a), num(value))));
    }

    if has("power") || has("^") || has("**") {
        return Ok(match b {
            Some(b) => {
                let value = a.powf(b);
                calc(OperationKind::Power, a, Some(b), value, format!("{}^{} = {}", num(a), num(b), num(value)))
            }
            None => {
                let value = a * a;
                calc(OperationKind::Square, a, None, value, format!("{}² = {}", num(a), num(value)))
            }
        });
    }

    let keyword_op = if has("plus") || has("add") || has("+") {
        Some(OperationKind::Addition)
    } else if has("minus") || has("subtract") || has("-") {
        Some(OperationKind::Subtraction)
    } else if has("multiply") || has("times") || has("*") || has("x") {
        Some(OperationKind::Multiplication)
    } else if has("divide") || has("/") {
        Some(OperationKind::Division)
    } else if has("modulo") || has("mod") || has("remainder") {
        Some(OperationKind::Modulo)
    } else {
        None
    };

    if let Some(op) = keyword_op {
        let b = b.ok_or(CalcError::Unspecified)?;
        return binary(op, a, b);
    }

    // Nothing named an operation; with two operands, a bare symbol will do.
    let Some(b) = b else {
        return Err(CalcError::Unspecified);
    };
    let symbol_op = if has("+") {
        OperationKind::Addition
    } else if has("-") {
        OperationKind::Subtraction
    } else if has("*") || has("x") {
        OperationKind::Multiplication
    } else if has("/") {
        OperationKind::Division
    } else {
        return Err(CalcError::Unspecified);
    };
    binary(symbol_op, a, b)
}

/// Evaluate and render in one step; errors become their message.
pub fn respond(phrase: &str) -> String {
    match evaluate(phrase) {
        Ok(calculation) => calculation.render(),
        Err(e) => e.to_string(),
    }
}

/// Heuristic used by the router: does this utterance look like arithmetic?
///
/// True for any digit, any operator symbol, or an arithmetic word standing
/// on its own (so `exit` does not count as `x`).
pub fn is_math_command(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.chars().any(|c| c.is_ascii_digit() || MATH_SYMBOLS.contains(&c))
        || MATH_WORDS.iter().any(|w| super::router::contains_keyword(&lower, w))
}

fn binary(op: OperationKind, a: f64, b: f64) -> Result<Calculation, CalcError> {
    let (value, symbol) = match op {
        OperationKind::Addition => (a + b, "+"),
        OperationKind::Subtraction => (a - b, "-"),
        OperationKind::Multiplication => (a * b, "×"),
        OperationKind::Division => {
            if b == 0.0 {
                return Err(CalcError::DivideByZero);
            }
            (a / b, "÷")
        }
        OperationKind::Modulo => {
            if b == 0.0 {
                return Err(CalcError::DivideByZero);
            }
            (a % b, "mod")
        }
        _ => return Err(CalcError::Unspecified),
    };
    Ok(calc(op, a, Some(b), value, format!("{} {symbol} {} = {}", num(a), num(b), num(value))))
}

fn calc(
    operation: OperationKind,
    operand1: f64,
    operand2: Option<f64>,
    value: f64,
    explanation: String,
) -> Calculation {
    Calculation { operation, operand1, operand2, value, explanation }
}

/// Shortest round-trip decimal; integral values print without a fraction.
/// Overflow reads `Infinity`.
fn num(v: f64) -> String {
    if v == 0.0 {
        "0".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        v.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explain(phrase: &str) -> String {
        evaluate(phrase).unwrap().explanation
    }

    #[test]
    fn addition_by_keyword() {
        assert_eq!(explain("15 plus 23"), "15 + 23 = 38");
        assert_eq!(explain("calculate 15 plus 23"), "15 + 23 = 38");
    }

    #[test]
    fn percent_of() {
        let c = evaluate("10 percent of 200").unwrap();
        assert_eq!(c.operation, OperationKind::Percentage);
        assert_eq!(c.explanation, "10% of 200 = 20");
        assert_eq!(c.render(), "10% of 200 = 20");
    }

    #[test]
    fn percent_ratio_rounds_to_two_places() {
        let c = evaluate("what percent is 1 and 3").unwrap();
        assert_eq!(c.explanation, "1 is 33.33% of 3");
        assert_eq!(c.render(), "1 is 33.33% of 3 (33.33)");
    }

    #[test]
    fn square_root() {
        assert_eq!(explain("square root of 16"), "√16 = 4");
        assert_eq!(explain("sqrt 2"), format!("√2 = {}", 2f64.sqrt()));
    }

    #[test]
    fn power_and_implicit_square() {
        assert_eq!(explain("2 to the power 10"), "2^10 = 1024");
        let c = evaluate("7 power").unwrap();
        assert_eq!(c.operation, OperationKind::Square);
        assert_eq!(c.explanation, "7² = 49");
    }

    #[test]
    fn subtraction_multiplication_modulo() {
        assert_eq!(explain("10 minus 4"), "10 - 4 = 6");
        assert_eq!(explain("6 times 7"), "6 × 7 = 42");
        assert_eq!(explain("6 x 7"), "6 × 7 = 42");
        assert_eq!(explain("17 mod 5"), "17 mod 5 = 2");
    }

    #[test]
    fn division_formats_non_integral() {
        let c = evaluate("divide 10 by 4").unwrap();
        assert_eq!(c.explanation, "10 ÷ 4 = 2.5");
        assert_eq!(c.render(), "10 ÷ 4 = 2.5 (2.5000)");
        assert_eq!(evaluate("8 / 2").unwrap().render(), "8 ÷ 2 = 4");
    }

    #[test]
    fn divide_by_zero() {
        assert_eq!(evaluate("divide 7 by 0"), Err(CalcError::DivideByZero));
        assert_eq!(respond("7 / 0"), "Cannot divide by zero.");
        assert_eq!(evaluate("7 mod 0"), Err(CalcError::DivideByZero));
    }

    #[test]
    fn decimals_are_single_operands() {
        assert_eq!(explain("1.5 plus 2.25"), "1.5 + 2.25 = 3.75");
    }

    #[test]
    fn only_ascii_digits_are_operands() {
        assert_eq!(evaluate("५ plus ६"), Err(CalcError::NeedNumbers));
        assert_eq!(explain("५ plus 2 plus 3"), "2 + 3 = 5");
    }

    #[test]
    fn overflow_reads_infinity() {
        assert_eq!(explain("10 power 400"), "10^400 = Infinity");
    }

    #[test]
    fn missing_numbers() {
        assert_eq!(evaluate("plus minus"), Err(CalcError::NeedNumbers));
        assert_eq!(respond("add things"), "Please provide numbers for calculation.");
    }

    #[test]
    fn missing_second_operand_degrades_to_prompt() {
        assert_eq!(evaluate("add 5"), Err(CalcError::Unspecified));
        assert_eq!(evaluate("5 percent"), Err(CalcError::Unspecified));
        assert_eq!(evaluate("just 5 and 6"), Err(CalcError::Unspecified));
    }

    #[test]
    fn keyword_precedence_beats_reading_order() {
        // "plus" outranks "times" regardless of position.
        assert_eq!(explain("3 times 4 plus"), "3 + 4 = 7");
        // "percent" outranks everything.
        assert_eq!(evaluate("5 plus 10 percent of").unwrap().operation, OperationKind::Percentage);
    }

    #[test]
    fn extra_operands_are_ignored() {
        assert_eq!(explain("1 plus 2 plus 3"), "1 + 2 = 3");
    }

    #[test]
    fn math_heuristic() {
        assert!(is_math_command("what is 4 and 5"));
        assert!(is_math_command("seven plus eight"));
        assert!(is_math_command("a - b"));
        assert!(is_math_command("square root of nine"));
        assert!(!is_math_command("exit"));
        assert!(!is_math_command("turn off"));
        assert!(!is_math_command("tell me a story"));
    }
}
