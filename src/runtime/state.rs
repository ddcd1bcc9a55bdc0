//! Simulation state store
//!
//! States are named, externally owned cells read and written across the
//! model. A state holds either a real or a text value; its kind is fixed by
//! the value it was declared with.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Value held by a state cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StateValue {
    /// Floating-point state
    Real(f64),
    /// String state
    Text(String),
}

impl StateValue {
    /// Real value, if this is a real state
    pub fn as_real(&self) -> Option<f64> {
        match self {
            StateValue::Real(v) => Some(*v),
            StateValue::Text(_) => None,
        }
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValue::Real(v) => f.write_str(&format_real(*v)),
            StateValue::Text(s) => f.write_str(s),
        }
    }
}

/// Format a real the way operators see it in messages and concatenations
///
/// Rounds to 15 significant digits and drops trailing zeros. Exponents below
/// -4 or above 14 switch to `E` notation with a signed, two-digit exponent.
pub fn format_real(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("{}Infinity", sign);
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let sci = format!("{:.14e}", value);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return value.to_string();
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return value.to_string();
    };
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(m) => ("-", m),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let digits = digits.trim_end_matches('0');

    if !(-4..15).contains(&exp) {
        let (lead, rest) = digits.split_at(1);
        let exp_sign = if exp < 0 { '-' } else { '+' };
        let fraction = if rest.is_empty() {
            String::new()
        } else {
            format!(".{}", rest)
        };
        return format!("{}{}{}E{}{:02}", sign, lead, fraction, exp_sign, exp.unsigned_abs());
    }

    if exp < 0 {
        let zeros = "0".repeat((-exp - 1) as usize);
        return format!("{}0.{}{}", sign, zeros, digits);
    }

    let int_len = exp as usize + 1;
    if digits.len() <= int_len {
        format!("{}{}{}", sign, digits, "0".repeat(int_len - digits.len()))
    } else {
        let (int, fraction) = digits.split_at(int_len);
        format!("{}{}.{}", sign, int, fraction)
    }
}

/// Outcome of writing a real value into the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealWrite {
    /// Value stored
    Written,
    /// No state with that name
    Missing,
    /// State exists but holds text
    NotReal,
}

/// Named state cells, ordered by name for stable serialization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateStore {
    states: BTreeMap<String, StateValue>,
}

impl StateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a state, replacing any existing one with the same name
    pub fn declare(&mut self, name: impl Into<String>, initial: StateValue) {
        self.states.insert(name.into(), initial);
    }

    /// Look up a state
    pub fn get(&self, name: &str) -> Option<&StateValue> {
        self.states.get(name)
    }

    /// Current value of a real state
    pub fn real(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(StateValue::as_real)
    }

    /// Overwrite a real state without changing its kind
    pub fn set_real(&mut self, name: &str, value: f64) -> RealWrite {
        match self.states.get_mut(name) {
            Some(StateValue::Real(cell)) => {
                *cell = value;
                RealWrite::Written
            }
            Some(StateValue::Text(_)) => RealWrite::NotReal,
            None => RealWrite::Missing,
        }
    }

    /// Overwrite a text state, returning false if absent or not text
    pub fn set_text(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.states.get_mut(name) {
            Some(StateValue::Text(cell)) => {
                *cell = value.into();
                true
            }
            _ => false,
        }
    }

    /// Iterate over states in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StateValue)> {
        self.states.iter().map(|(k, v)| (k.as_str(), v))
    }
}
