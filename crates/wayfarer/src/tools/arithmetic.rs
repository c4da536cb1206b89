use std::future::ready;

use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use wayfarer_core::tool::{Error as ToolError, Tool, ToolResult};

/// Input of the arithmetic tools.
#[derive(Deserialize, JsonSchema)]
pub struct Operands {
    /// The left operand.
    a: i64,
    /// The right operand.
    b: i64,
}

/// The arithmetic operations, one tool each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `a + b`
    Addition,
    /// `a * b`
    Multiply,
    /// `a / b`, as a float.
    Division,
    /// `a - b`
    Subtraction,
}

impl Operation {
    /// Every operation, in the order they are offered to the model.
    pub const ALL: [Operation; 4] = [
        Operation::Addition,
        Operation::Multiply,
        Operation::Division,
        Operation::Subtraction,
    ];

    fn apply(self, a: i64, b: i64) -> ToolResult {
        let overflow =
            || ToolError::execution_error().with_reason("Integer overflow.");
        match self {
            Operation::Addition => {
                a.checked_add(b).map(|n| n.to_string()).ok_or_else(overflow)
            }
            Operation::Multiply => {
                a.checked_mul(b).map(|n| n.to_string()).ok_or_else(overflow)
            }
            Operation::Subtraction => {
                a.checked_sub(b).map(|n| n.to_string()).ok_or_else(overflow)
            }
            Operation::Division if b == 0 => Err(ToolError::execution_error()
                .with_reason("Denominator cannot be zero.")),
            // Debug keeps the fraction, so `4 / 2` reads `2.0`.
            Operation::Division => Ok(format!("{:?}", a as f64 / b as f64)),
        }
    }
}

/// Integer arithmetic, so that cost breakdowns are computed rather than
/// guessed by the model.
pub struct ArithmeticTool {
    operation: Operation,
    parameter_schema: Value,
}

impl ArithmeticTool {
    /// Creates the tool for `operation`.
    #[inline]
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            parameter_schema: schema_for!(Operands).to_value(),
        }
    }
}

impl Tool for ArithmeticTool {
    type Input = Operands;

    fn name(&self) -> &str {
        match self.operation {
            Operation::Addition => "addition",
            Operation::Multiply => "multiply",
            Operation::Division => "division",
            Operation::Subtraction => "subtraction",
        }
    }

    fn description(&self) -> &str {
        match self.operation {
            Operation::Addition => "Add two integers.",
            Operation::Multiply => "Multiply two integers.",
            Operation::Division => "Divide two integers.",
            Operation::Subtraction => "Subtract two integers.",
        }
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: Operands,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        ready(self.operation.apply(input.a, input.b))
    }
}

#[cfg(test)]
mod tests {
    use wayfarer_core::tool::ErrorKind;

    use super::*;

    #[test]
    fn test_apply() {
        assert_eq!(Operation::Addition.apply(1350, 600).unwrap(), "1950");
        assert_eq!(Operation::Multiply.apply(450, 3).unwrap(), "1350");
        assert_eq!(Operation::Subtraction.apply(30, 45).unwrap(), "-15");
        assert_eq!(Operation::Division.apply(7, 2).unwrap(), "3.5");
        assert_eq!(Operation::Division.apply(4, 2).unwrap(), "2.0");
    }

    #[test]
    fn test_errors() {
        let err = Operation::Division.apply(1, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutionError);
        assert_eq!(err.reason(), "Denominator cannot be zero.");
        assert!(Operation::Multiply.apply(i64::MAX, 2).is_err());
    }

    #[test]
    fn test_schema_requires_both_operands() {
        let tool = ArithmeticTool::new(Operation::Addition);
        let required = &tool.parameter_schema()["required"];
        assert_eq!(required, &serde_json::json!(["a", "b"]));
        assert_eq!(tool.name(), "addition");
    }
}
