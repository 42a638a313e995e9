//! Calculator flow steps.
//!
//! The enclosing calculator owns the order in which steps are visited; the
//! assistant only records the latest one and uses it to pick copy.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A named stage of the settlement calculator flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Choosing between guaranteed and life-contingent payments.
    Mode,
    GuaranteedPayment,
    GuaranteedLumpSum,
    LifeContingent,
    Amount,
    Review,
    Offer,
}

/// Position of a step in the flow, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPosition {
    pub number: u8,
    pub total: u8,
    pub name: &'static str,
}

/// Number of steps the user walks through, whichever payment type they pick.
pub const FLOW_LENGTH: u8 = 5;

impl Step {
    /// All steps, in flow order.
    pub const ALL: [Step; 7] = [
        Step::Mode,
        Step::GuaranteedPayment,
        Step::GuaranteedLumpSum,
        Step::LifeContingent,
        Step::Amount,
        Step::Review,
        Step::Offer,
    ];

    /// Wire name of the step.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mode => "mode",
            Self::GuaranteedPayment => "guaranteed_payment",
            Self::GuaranteedLumpSum => "guaranteed_lump_sum",
            Self::LifeContingent => "life_contingent",
            Self::Amount => "amount",
            Self::Review => "review",
            Self::Offer => "offer",
        }
    }

    /// Where this step sits in the flow.
    ///
    /// The three payment-detail steps are alternatives for one another, so
    /// they share position 2.
    pub fn position(&self) -> StepPosition {
        let (number, name) = match self {
            Self::Mode => (1, "Payment Type"),
            Self::GuaranteedPayment => (2, "Guaranteed Payments"),
            Self::GuaranteedLumpSum => (2, "Guaranteed Lump Sums"),
            Self::LifeContingent => (2, "Life-Contingent Payments"),
            Self::Amount => (3, "Payment Amount"),
            Self::Review => (4, "Review"),
            Self::Offer => (5, "Your Offer"),
        };
        StepPosition {
            number,
            total: FLOW_LENGTH,
            name,
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Step {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Step::ALL
            .iter()
            .copied()
            .find(|step| step.as_str() == s.trim())
            .ok_or_else(|| ConfigError::UnknownStep(s.to_string()))
    }
}
