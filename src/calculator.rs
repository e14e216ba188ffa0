use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [
        OperationKind::Add,
        OperationKind::Subtract,
        OperationKind::Multiply,
        OperationKind::Divide,
    ];

    /// Operation selected by holding up `count` fingers, if any.
    pub fn from_finger_count(count: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.trigger_count() == count)
    }

    pub fn trigger_count(&self) -> u32 {
        match self {
            OperationKind::Add => 1,
            OperationKind::Subtract => 2,
            OperationKind::Multiply => 3,
            OperationKind::Divide => 4,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OperationKind::Add => "ADD",
            OperationKind::Subtract => "SUBTRACT",
            OperationKind::Multiply => "MULTIPLY",
            OperationKind::Divide => "DIVIDE",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            OperationKind::Add => "+",
            OperationKind::Subtract => "-",
            OperationKind::Multiply => "×",
            OperationKind::Divide => "÷",
        }
    }

    /// Overlay color as RGB.
    pub fn color(&self) -> [u8; 3] {
        match self {
            OperationKind::Add => [50, 205, 50],
            OperationKind::Subtract => [0, 165, 255],
            OperationKind::Multiply => [211, 85, 186],
            OperationKind::Divide => [255, 144, 30],
        }
    }
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("division by zero")]
pub struct DivisionByZero;

pub type CalculationResult = Result<f64, DivisionByZero>;

/// Pure arithmetic on the two operand totals. Division rounds to two decimals.
pub fn compute(left: u32, right: u32, op: OperationKind) -> CalculationResult {
    let (l, r) = (left as f64, right as f64);
    match op {
        OperationKind::Add => Ok(l + r),
        OperationKind::Subtract => Ok(l - r),
        OperationKind::Multiply => Ok(l * r),
        OperationKind::Divide => {
            if right == 0 {
                Err(DivisionByZero)
            } else {
                Ok(round2(l / r))
            }
        }
    }
}

/// Halves go to the even neighbour: 0.125 becomes 0.12.
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

pub fn format_result(result: &CalculationResult) -> String {
    match result {
        Ok(value) if value.fract() == 0.0 => format!("{value:.0}"),
        Ok(value) => format!("{value}"),
        Err(_) => "Error!".to_string(),
    }
}
