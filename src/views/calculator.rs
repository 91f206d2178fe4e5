//! Four-function calculator behind the calculator view.

use std::fmt;

/// Arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "×",
            Self::Div => "÷",
        }
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            // Division by zero shows 0 instead of an error.
            Self::Div => {
                if b == 0.0 {
                    0.0
                } else {
                    a / b
                }
            }
        }
    }
}

/// One keypad key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalcKey {
    Digit(u8),
    Point,
    Op(Op),
    Equals,
    Clear,
    Backspace,
}

impl CalcKey {
    /// Keypad label.
    pub fn label(&self) -> String {
        match self {
            Self::Digit(d) => d.to_string(),
            Self::Point => ".".into(),
            Self::Op(op) => op.symbol().into(),
            Self::Equals => "=".into(),
            Self::Clear => "C".into(),
            Self::Backspace => "⌫".into(),
        }
    }
}

const ERROR_TEXT: &str = "Error";

/// Display buffer plus one pending operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Calculator {
    display: String,
    current: String,
    previous: String,
    op: Option<Op>,
}

impl Default for Calculator {
    fn default() -> Self {
        Self {
            display: "0".into(),
            current: String::new(),
            previous: String::new(),
            op: None,
        }
    }
}

impl Calculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn pending_op(&self) -> Option<Op> {
        self.op
    }

    pub fn press(&mut self, key: CalcKey) {
        match key {
            CalcKey::Digit(d) => {
                let c = char::from(b'0' + d.min(9));
                if self.display == "0" || self.display == ERROR_TEXT {
                    self.display = c.to_string();
                } else {
                    self.display.push(c);
                }
                self.current = self.display.clone();
            }
            CalcKey::Point => {
                if !self.display.contains('.') {
                    self.display.push('.');
                    self.current = self.display.clone();
                }
            }
            CalcKey::Op(op) => {
                if !self.current.is_empty() {
                    self.previous = std::mem::take(&mut self.current);
                    self.op = Some(op);
                    self.display = "0".into();
                }
            }
            CalcKey::Equals => self.evaluate(),
            CalcKey::Clear => *self = Self::default(),
            CalcKey::Backspace => {
                if self.display.chars().count() > 1 {
                    self.display.pop();
                } else {
                    self.display = "0".into();
                }
                self.current = self.display.clone();
            }
        }
    }

    fn evaluate(&mut self) {
        let Some(op) = self.op else { return };
        if self.previous.is_empty() || self.current.is_empty() {
            return;
        }
        let parsed = (self.previous.parse::<f64>(), self.current.parse::<f64>());
        let (Ok(a), Ok(b)) = parsed else {
            self.display = ERROR_TEXT.into();
            return;
        };
        let result = op.apply(a, b);
        if !result.is_finite() {
            self.display = ERROR_TEXT.into();
            return;
        }
        self.display = format_number(result);
        self.current = self.display.clone();
        self.previous.clear();
        self.op = None;
    }
}

/// Integers without decimals, otherwise at most four decimals with
/// trailing zeros trimmed.
pub fn format_number(value: f64) -> String {
    if value == value.trunc() && value.abs() < i64::MAX as f64 {
        return format!("{}", value as i64);
    }
    let fixed = format!("{:.4}", value);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

impl fmt::Display for Calculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}
