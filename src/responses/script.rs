//! Scripted reply tables, one per calculator step.
//!
//! Each table is a list of keyword rules checked in order, plus a default
//! reply used when no rule matches. Lookups by step always resolve: a missing
//! step falls back to the general table.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::flow::Step;

/// A keyword rule and the reply it produces.
#[derive(Debug, Clone)]
pub struct ReplyRule {
    pub regex: Regex,
    pub reply: &'static str,
}

/// Replies available on one step.
#[derive(Debug, Clone)]
pub struct StepScript {
    pub rules: Vec<ReplyRule>,
    pub default_reply: &'static str,
}

impl StepScript {
    /// The first matching rule's reply, or the default.
    pub fn reply_for(&self, input: &str) -> &'static str {
        self.rules
            .iter()
            .find(|rule| rule.regex.is_match(input))
            .map(|rule| rule.reply)
            .unwrap_or(self.default_reply)
    }
}

fn rule(pattern: &str, reply: &'static str) -> ReplyRule {
    ReplyRule {
        regex: Regex::new(pattern).unwrap(),
        reply,
    }
}

static GENERAL: LazyLock<StepScript> = LazyLock::new(|| StepScript {
    rules: vec![
        rule(
            r"(?i)\b(documents?|paperwork|papers)\b",
            "Most people need their settlement agreement, the annuity contract, and a recent \
             benefits letter. Once you start the calculator I can tell you which details matter \
             for your payment type.",
        ),
        rule(
            r"(?i)\b(how long|how fast|timeline|when will)\b",
            "Estimates are instant. Funding usually takes 45 to 90 days because a judge has to \
             approve every transfer of structured settlement payments.",
        ),
    ],
    default_reply: "I'm here to help you estimate what your structured settlement payments are \
                    worth. Choose a payment type to get started, or ask me anything about the \
                    process.",
});

static SCRIPTS: LazyLock<HashMap<Step, StepScript>> = LazyLock::new(|| {
    let mut scripts = HashMap::new();

    scripts.insert(
        Step::Mode,
        StepScript {
            rules: vec![
                rule(
                    r"(?i)\b(difference|which one|not sure|unsure|don'?t know)\b",
                    "Check your settlement agreement. If payments stop on a fixed date they're \
                     guaranteed; if they stop when someone passes away they're life-contingent.",
                ),
                rule(
                    r"(?i)\b(life|contingent|lifetime)\b",
                    "Life-contingent payments continue only while a named person is alive. \
                     Buyers price in that uncertainty, so we'll ask a few extra questions.",
                ),
                rule(
                    r"(?i)\bguaranteed?\b",
                    "Guaranteed payments are made on a fixed schedule no matter what happens. \
                     They're the most common type and usually receive the strongest offers.",
                ),
            ],
            default_reply: "Pick the payment type that matches your settlement agreement. If \
                            you're unsure, look at whether payments end on a set date or depend \
                            on someone's lifetime.",
        },
    );

    scripts.insert(
        Step::GuaranteedPayment,
        StepScript {
            rules: vec![
                rule(
                    r"(?i)\b(documents?|paperwork|papers|contract)\b",
                    "For guaranteed payments, keep your settlement agreement and annuity \
                     contract handy. They list the payment amount, how often it's paid, and the \
                     start and end dates.",
                ),
                rule(
                    r"(?i)\b(frequency|how often|monthly|quarterly|annual(ly)?|semi-?annual(ly)?)\b",
                    "Enter how often the payments arrive: monthly, quarterly, semi-annually or \
                     annually. It should match the schedule in your annuity contract.",
                ),
                rule(
                    r"(?i)\b(increase|cola|grow(s|th)?)\b",
                    "Some contracts raise the payment every year, often by 3%. If yours does, \
                     enter that annual increase so the estimate reflects it.",
                ),
            ],
            default_reply: "Enter the payment amount, how often it's paid, and the start and end \
                            dates from your annuity contract. I'll use them to estimate the \
                            present value.",
        },
    );

    scripts.insert(
        Step::GuaranteedLumpSum,
        StepScript {
            rules: vec![
                rule(
                    r"(?i)\b(documents?|paperwork|papers)\b",
                    "Your settlement agreement lists each lump sum with its amount and due date. \
                     Have it in front of you while you add them.",
                ),
                rule(
                    r"(?i)\b(multiple|another|more than one|several)\b",
                    "You can add as many lump sums as your agreement lists. Enter each one with \
                     its own amount and date.",
                ),
            ],
            default_reply: "Add each lump sum with its amount and the date it's due. Future lump \
                            sums can be sold in full or in part.",
        },
    );

    scripts.insert(
        Step::LifeContingent,
        StepScript {
            rules: vec![
                rule(
                    r"(?i)\b(health|medical|smok(e|er|ing))\b",
                    "Health details help buyers estimate how long payments will last. Share only \
                     what you're comfortable with; it stays confidential.",
                ),
                rule(
                    r"(?i)\b(documents?|paperwork|papers)\b",
                    "Bring your settlement agreement and annuity contract, plus the date of \
                     birth of the person the payments depend on.",
                ),
            ],
            default_reply: "Life-contingent payments depend on the measuring life. Enter the \
                            payment details and we'll ask a few questions about that person.",
        },
    );

    scripts.insert(
        Step::Amount,
        StepScript {
            rules: vec![rule(
                r"(?i)\b(how much|portion|part|some|all)\b",
                "You don't have to sell everything. You can sell part of each payment, or a set \
                 number of payments, and keep the rest.",
            )],
            default_reply: "Choose how much of your payments you'd like to sell. Selling fewer \
                            payments means a smaller lump sum but more income kept for later.",
        },
    );

    scripts.insert(
        Step::Review,
        StepScript {
            rules: vec![rule(
                r"(?i)\b(change|edit|wrong|fix|mistake|update)\b",
                "You can go back to any step to change your answers. Your progress is saved, so \
                 nothing will be lost.",
            )],
            default_reply: "Take a moment to check that everything matches your paperwork. When \
                            you're ready, continue to see your estimate.",
        },
    );

    scripts.insert(
        Step::Offer,
        StepScript {
            rules: vec![
                rule(
                    r"(?i)\b(why|low|discount(ed)?|rate)\b",
                    "The offer reflects the time value of money: future payments are discounted \
                     to today's value, and payments further out are discounted more.",
                ),
                rule(
                    r"(?i)\b(next|accept|proceed|court|judge|approv(e|al))\b",
                    "If you'd like to move forward, a specialist will confirm the details with \
                     you. Every transfer is reviewed and approved by a judge before funding.",
                ),
            ],
            default_reply: "This is your estimated lump sum. It's an estimate rather than a final \
                            quote; a specialist can walk you through the exact numbers.",
        },
    );

    scripts
});

/// The script for `step`; `None` or an unscripted step gets the general one.
pub fn script_for(step: Option<Step>) -> &'static StepScript {
    step.and_then(|s| SCRIPTS.get(&s)).unwrap_or(&GENERAL)
}

/// Greeting shown when the assistant opens on `step`. Empty when there is none.
pub fn welcome_text(step: Step) -> &'static str {
    match step {
        Step::Mode => {
            "Welcome! I'm your settlement assistant. Not sure which payment type you have? \
             Just ask."
        }
        Step::GuaranteedPayment => {
            "Let's capture your guaranteed payments. I can explain any field as you go."
        }
        Step::GuaranteedLumpSum => {
            "Now let's add your lump-sum payments. Ask me if you're unsure where to find them."
        }
        Step::LifeContingent => {
            "Life-contingent payments need a few extra details. I'll help you through them."
        }
        Step::Amount => {
            "Almost there. Decide how much you'd like to sell and I'll explain the trade-offs."
        }
        Step::Review => "",
        Step::Offer => {
            "Your estimate is ready! Ask me anything about it, or continue in our main chat."
        }
    }
}
