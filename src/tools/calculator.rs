//! Arithmetic for policy questions involving amounts and limits.
//!
//! Invalid operations produce an [`Evaluation`] carrying an `error` message
//! rather than a Rust error, so the analysis agent can read and react to it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Largest `n` accepted by [`Calculation::Factorial`]; `20!` is the largest that fits in `u64`.
pub const MAX_FACTORIAL: u64 = 20;

/// A single calculator operation with its operands.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Calculation {
    /// `a + b`.
    Add {
        /// Left operand.
        a: f64,
        /// Right operand.
        b: f64,
    },
    /// `a - b`.
    Subtract {
        /// Left operand.
        a: f64,
        /// Right operand.
        b: f64,
    },
    /// `a * b`.
    Multiply {
        /// Left operand.
        a: f64,
        /// Right operand.
        b: f64,
    },
    /// `a / b`.
    Divide {
        /// Dividend.
        a: f64,
        /// Divisor.
        b: f64,
    },
    /// `a` raised to `b`.
    Exponentiate {
        /// Base.
        a: f64,
        /// Exponent.
        b: f64,
    },
    /// `n!`.
    Factorial {
        /// Operand.
        n: i64,
    },
    /// Primality of `n`.
    IsPrime {
        /// Operand.
        n: i64,
    },
    /// Square root of `n`.
    SquareRoot {
        /// Operand.
        n: f64,
    },
}

/// Outcome of a calculation: exactly one of `result` or `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    /// Operation label, e.g. `"addition"`.
    pub operation: &'static str,
    /// Computed value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Reason the operation could not be performed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Evaluation {
    fn ok(operation: &'static str, result: impl Into<Value>) -> Self {
        Self {
            operation,
            result: Some(result.into()),
            error: None,
        }
    }

    fn number(operation: &'static str, value: f64) -> Self {
        if value.is_finite() {
            Self::ok(operation, value)
        } else {
            Self::err(operation, "Result is not a finite number")
        }
    }

    fn err(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            result: None,
            error: Some(message.into()),
        }
    }

    /// Returns `true` when the calculation produced a value.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl Calculation {
    /// Performs the calculation.
    #[must_use]
    pub fn evaluate(&self) -> Evaluation {
        let evaluation = match *self {
            Self::Add { a, b } => Evaluation::number("addition", a + b),
            Self::Subtract { a, b } => Evaluation::number("subtraction", a - b),
            Self::Multiply { a, b } => Evaluation::number("multiplication", a * b),
            Self::Divide { a, b } => {
                if b == 0.0 {
                    Evaluation::err("division", "Division by zero is undefined")
                } else {
                    Evaluation::number("division", a / b)
                }
            }
            Self::Exponentiate { a, b } => Evaluation::number("exponentiation", a.powf(b)),
            Self::Factorial { n } => factorial(n),
            Self::IsPrime { n } => Evaluation::ok("prime_check", is_prime(n)),
            Self::SquareRoot { n } => {
                if n < 0.0 {
                    Evaluation::err(
                        "square_root",
                        "Square root of a negative number is undefined",
                    )
                } else {
                    Evaluation::number("square_root", n.sqrt())
                }
            }
        };
        debug!(operation = evaluation.operation, ok = evaluation.is_ok(), "calculator");
        evaluation
    }
}

fn factorial(n: i64) -> Evaluation {
    let Ok(n) = u64::try_from(n) else {
        return Evaluation::err("factorial", "Factorial of a negative number is undefined");
    };
    if n > MAX_FACTORIAL {
        return Evaluation::err(
            "factorial",
            format!("Factorial is limited to n <= {MAX_FACTORIAL}"),
        );
    }
    Evaluation::ok("factorial", (1..=n).product::<u64>())
}

fn is_prime(n: i64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3;
    while d <= n / d {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}
