//! Reconciliation methods: which coherent vector a forecast is mapped to.
//!
//! Every method produces a linear map `y ↦ S·P·y` onto the column space of
//! `S`; they differ in the bottom map `P`:
//! - `Ols`: orthogonal projection, `P = (SᵗS)⁻¹Sᵗ`. Minimises `‖y − ŷ‖₂`.
//! - `Wls(w)`: `P = (SᵗWS)⁻¹SᵗW` with `W = diag(w)`. Minimises
//!   `(y − ŷ)ᵗ W (y − ŷ)`.
//! - `Structural`: `Wls` with `w_i = 1 / Σ_j S[i, j]`, down-weighting
//!   aggregates in proportion to how many bottom series they sum.
//! - `BottomUp`: `P = [0 | I_m]`; upper-level forecasts are discarded and
//!   re-derived from the bottom level.
use crate::reconciliation::errors::ReconcileError;
use ndarray::Array1;
use std::str::FromStr;

/// Reconciliation method; defaults to [`ReconciliationMethod::Ols`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ReconciliationMethod {
    #[default]
    Ols,
    Wls(Array1<f64>),
    Structural,
    BottomUp,
}

impl ReconciliationMethod {
    /// Short, stable name used in logs and by `FromStr`.
    pub fn name(&self) -> &'static str {
        match self {
            ReconciliationMethod::Ols => "ols",
            ReconciliationMethod::Wls(_) => "wls",
            ReconciliationMethod::Structural => "structural",
            ReconciliationMethod::BottomUp => "bottom_up",
        }
    }
}

impl FromStr for ReconciliationMethod {
    type Err = ReconcileError;

    /// Parse a method name (case-insensitive).
    ///
    /// Accepts `"ols"`, `"structural"` / `"wls_struct"`, and
    /// `"bottom_up"` / `"bottomup"`. Custom-weight WLS has no string form;
    /// build [`ReconciliationMethod::Wls`] directly.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ols" => Ok(ReconciliationMethod::Ols),
            "structural" | "wls_struct" => Ok(ReconciliationMethod::Structural),
            "bottom_up" | "bottomup" => Ok(ReconciliationMethod::BottomUp),
            _ => Err(ReconcileError::InvalidMethod {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'ols', 'structural', or 'bottom_up'.",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_accepts_aliases_case_insensitively() {
        assert_eq!("OLS".parse::<ReconciliationMethod>().unwrap(), ReconciliationMethod::Ols);
        assert_eq!(
            "wls_struct".parse::<ReconciliationMethod>().unwrap(),
            ReconciliationMethod::Structural
        );
        assert_eq!(
            "BottomUp".parse::<ReconciliationMethod>().unwrap(),
            ReconciliationMethod::BottomUp
        );
        assert!(matches!(
            "mint".parse::<ReconciliationMethod>(),
            Err(ReconcileError::InvalidMethod { .. })
        ));
    }

    #[test]
    fn default_is_ols() {
        assert_eq!(ReconciliationMethod::default(), ReconciliationMethod::Ols);
        assert_eq!(ReconciliationMethod::default().name(), "ols");
    }
}
