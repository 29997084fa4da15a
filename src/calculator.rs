use serde::{Deserialize, Serialize};

use crate::error::CalcError;

/// The four supported operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    /// Parse the form tag (`add`, `subtract`, `multiply`, `divide`)
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "add" => Some(Operator::Add),
            "subtract" => Some(Operator::Subtract),
            "multiply" => Some(Operator::Multiply),
            "divide" => Some(Operator::Divide),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "×",
            Operator::Divide => "÷",
        }
    }

    /// Apply the operator; a divisor of exactly zero is an error, not infinity
    pub fn apply(self, lhs: f64, rhs: f64) -> Result<f64, CalcError> {
        match self {
            Operator::Add => Ok(lhs + rhs),
            Operator::Subtract => Ok(lhs - rhs),
            Operator::Multiply => Ok(lhs * rhs),
            Operator::Divide => {
                if rhs == 0.0 {
                    Err(CalcError::DivisionByZero)
                } else {
                    Ok(lhs / rhs)
                }
            }
        }
    }
}

/// One line of the calculation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationEntry {
    pub num1: f64,
    pub num2: f64,
    pub operator_symbol: String,
    pub result: String,
}

/// Round to two decimals, then drop trailing zeros and a dangling point
///
/// `4.0` becomes `"4"`, `4.5` becomes `"4.5"` and `4.567` becomes `"4.57"`.
pub fn format_result(value: f64) -> String {
    let fixed = format!("{:.2}", value);
    if !fixed.contains('.') {
        return fixed;
    }
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn parse_operand(raw: Option<&str>) -> Result<f64, CalcError> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .ok_or(CalcError::InvalidInput)
}

/// Evaluate a submitted calculator form
///
/// Both operands are parsed before the operator is looked at, so bad numbers
/// win over a bad operator.
pub fn calculate(
    num1: Option<&str>,
    num2: Option<&str>,
    operator: Option<&str>,
) -> Result<CalculationEntry, CalcError> {
    let lhs = parse_operand(num1)?;
    let rhs = parse_operand(num2)?;
    let op = operator
        .and_then(Operator::from_tag)
        .ok_or(CalcError::InvalidOperator)?;

    let value = op.apply(lhs, rhs)?;

    Ok(CalculationEntry {
        num1: lhs,
        num2: rhs,
        operator_symbol: op.symbol().to_string(),
        result: format_result(value),
    })
}
