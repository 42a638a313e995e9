//! Assistant copy: replies, guidance, greetings and handoff summaries.
//!
//! Everything here is a pure function of its inputs and the static script.

use rust_decimal::Decimal;

use crate::flow::form::keys;
use crate::flow::{FormData, Step, format_currency};

use super::script;

const GENERAL_GUIDANCE: &str = "Hi! I can answer questions about your structured settlement as \
you work through the calculator. What would you like to know?";

const GENERAL_STEP_PROMPT: &str =
    "Let me know if you have questions about any step of the calculator.";

const EMPTY_SUMMARY: &str = "The customer opened the settlement calculator but has not entered \
any payment details yet.";

/// Reply to `user_message` on `step`. Always returns non-empty text.
pub fn generate_response(user_message: &str, step: Option<Step>, _form_data: &FormData) -> String {
    script::script_for(step)
        .reply_for(user_message.trim())
        .to_string()
}

/// What the user should do on `step`, using any form details already entered.
pub fn step_guidance(step: Option<Step>, form_data: &FormData) -> String {
    let Some(step) = step else {
        return GENERAL_GUIDANCE.to_string();
    };

    match step {
        Step::Mode => {
            "Start by choosing your payment type: guaranteed payments follow a fixed schedule, \
             life-contingent payments depend on someone's lifetime."
                .to_string()
        }
        Step::GuaranteedPayment | Step::LifeContingent => {
            let amount = form_data.amount(keys::PAYMENT_AMOUNT);
            let frequency = form_data.text(keys::PAYMENT_FREQUENCY);
            match (amount, frequency) {
                (Some(amount), Some(frequency)) => format!(
                    "You've entered {} paid {}. Next, confirm the start and end dates.",
                    format_currency(amount),
                    frequency.to_lowercase()
                ),
                (Some(amount), None) => format!(
                    "You've entered {} per payment. Now tell us how often it's paid.",
                    format_currency(amount)
                ),
                _ => "Enter the payment amount and how often it's paid, exactly as your annuity \
                      contract shows it."
                    .to_string(),
            }
        }
        Step::GuaranteedLumpSum => {
            let sums = form_data.lump_sums();
            if sums.is_empty() {
                "Add each lump sum from your settlement agreement with its amount and due date."
                    .to_string()
            } else {
                let added = format!(
                    "You've added {} lump sum{}",
                    sums.len(),
                    if sums.len() == 1 { "" } else { "s" }
                );
                // Amounts come straight from the form; a total past Decimal::MAX is left out
                let total = sums
                    .iter()
                    .try_fold(Decimal::ZERO, |acc, s| acc.checked_add(s.amount));
                match total {
                    Some(total) => format!(
                        "{added} totaling {}. Add any others your agreement lists.",
                        format_currency(total)
                    ),
                    None => format!("{added}. Add any others your agreement lists."),
                }
            }
        }
        Step::Amount => match form_data.amount(keys::PAYMENT_AMOUNT) {
            Some(amount) => format!(
                "Your payments are {} each. Choose how much of them you'd like to sell.",
                format_currency(amount)
            ),
            None => "Choose how much of your payments you'd like to sell.".to_string(),
        },
        Step::Review => {
            if form_data.is_empty() {
                "Check your answers before we calculate your estimate.".to_string()
            } else {
                format!(
                    "Check these details before we calculate your estimate:\n{}",
                    summary_lines(form_data).join("\n")
                )
            }
        }
        Step::Offer => {
            "Your estimate is ready. Ask me how it was calculated, or continue in our main chat \
             to talk to a specialist."
                .to_string()
        }
    }
}

/// Greeting for `step`; empty when the step has none configured.
pub fn welcome_message(step: Option<Step>, _form_data: &FormData) -> String {
    step.map(script::welcome_text).unwrap_or_default().to_string()
}

/// A readable recap of the calculator snapshot for the main chat. Never empty.
pub fn handoff_summary(form_data: &FormData) -> String {
    let lines = summary_lines(form_data);
    if lines.is_empty() {
        return EMPTY_SUMMARY.to_string();
    }
    format!("Settlement calculator summary:\n{}", lines.join("\n"))
}

/// "You're now on step N of M" notice for `step`.
pub fn step_change_message(step: Option<Step>) -> String {
    match step {
        Some(step) => {
            let pos = step.position();
            format!(
                "You're now on step {} of {}: {}.",
                pos.number, pos.total, pos.name
            )
        }
        None => GENERAL_STEP_PROMPT.to_string(),
    }
}

fn summary_lines(form_data: &FormData) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(kind) = form_data.text(keys::PAYMENT_TYPE) {
        lines.push(format!("- Payment type: {}", describe_payment_type(&kind)));
    }
    if let Some(amount) = form_data.amount(keys::PAYMENT_AMOUNT) {
        lines.push(format!("- Payment amount: {}", format_currency(amount)));
    }
    if let Some(frequency) = form_data.text(keys::PAYMENT_FREQUENCY) {
        lines.push(format!("- Frequency: {frequency}"));
    }
    match (
        form_data.text(keys::START_DATE),
        form_data.text(keys::END_DATE),
    ) {
        (Some(start), Some(end)) => lines.push(format!("- Payment period: {start} to {end}")),
        (Some(start), None) => lines.push(format!("- First payment: {start}")),
        (None, Some(end)) => lines.push(format!("- Final payment: {end}")),
        (None, None) => {}
    }
    if let Some(increase) = form_data.text(keys::ANNUAL_INCREASE) {
        lines.push(format!("- Annual increase: {}%", increase.trim_end_matches('%')));
    }
    for sum in form_data.lump_sums() {
        match sum.date {
            Some(date) => lines.push(format!(
                "- Lump sum: {} on {date}",
                format_currency(sum.amount)
            )),
            None => lines.push(format!("- Lump sum: {}", format_currency(sum.amount))),
        }
    }
    for (key, value) in form_data.extra_fields() {
        lines.push(format!("- {key}: {value}"));
    }

    lines
}

fn describe_payment_type(kind: &str) -> String {
    match kind.to_lowercase().as_str() {
        "guaranteed" => "Guaranteed".to_string(),
        "life" | "life_contingent" | "life-contingent" => "Life-contingent".to_string(),
        _ => kind.to_string(),
    }
}
