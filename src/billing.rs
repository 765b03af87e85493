//! Simulated messaging credits
//!
//! Every sent message costs credits: 0.25 for a normal message and 0.50
//! for an urgent one. Prepaid accounts cannot spend below zero; postpaid
//! accounts can. Each charge is recorded in a newest-first ledger.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::message::MessagePriority;

/// Amount of credits in hundredths
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credits(pub i64);

impl Credits {
    pub const ZERO: Credits = Credits(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }
}

impl std::ops::Sub for Credits {
    type Output = Credits;

    fn sub(self, rhs: Credits) -> Credits {
        Credits(self.0 - rhs.0)
    }
}

impl std::ops::Neg for Credits {
    type Output = Credits;

    fn neg(self) -> Credits {
        Credits(-self.0)
    }
}

impl fmt::Display for Credits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Credits {
    type Err = AppError;

    /// Parses `500`, `500.5` or `476.25`; at most two decimal places
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::InvalidCommand(format!("invalid credit amount '{}'", s));
        let s = s.trim();
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole, frac) = body.split_once('.').unwrap_or((body, ""));

        if whole.is_empty()
            || frac.len() > 2
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };
        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .ok_or_else(invalid)?;

        Ok(Credits(if negative { -cents } else { cents }))
    }
}

/// Billing plan of the client account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    /// Balance must cover each message
    Prepaid,
    /// Balance may go negative
    Postpaid,
}

impl FromStr for PlanType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prepaid" => Ok(PlanType::Prepaid),
            "postpaid" => Ok(PlanType::Postpaid),
            other => Err(AppError::InvalidCommand(format!("unknown plan '{}'", other))),
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanType::Prepaid => write!(f, "prepaid"),
            PlanType::Postpaid => write!(f, "postpaid"),
        }
    }
}

/// Price of a single message
pub fn message_cost(priority: MessagePriority) -> Credits {
    match priority {
        MessagePriority::Normal => Credits(25),
        MessagePriority::High => Credits(50),
    }
}

/// One line of the balance history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    /// Signed change: positive for credits added, negative for charges
    pub amount: Credits,
    pub description: String,
    /// Balance right after this entry
    pub balance: Credits,
}

/// Balance plus its history
#[derive(Debug, Clone)]
pub struct Wallet {
    plan: PlanType,
    balance: Credits,
    /// Newest first
    history: Vec<LedgerEntry>,
}

impl Wallet {
    /// Create a wallet seeded with an initial credit entry
    pub fn new(plan: PlanType, initial: Credits) -> Self {
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            date: Utc::now(),
            amount: initial,
            description: "Initial credit".to_string(),
            balance: initial,
        };
        Self {
            plan,
            balance: initial,
            history: vec![entry],
        }
    }

    pub fn plan(&self) -> PlanType {
        self.plan
    }

    pub fn balance(&self) -> Credits {
        self.balance
    }

    pub fn history(&self) -> &[LedgerEntry] {
        &self.history
    }

    /// Charge for one message to `recipient_name`
    ///
    /// On a prepaid plan a balance below the cost rejects the charge and
    /// leaves the wallet untouched.
    pub fn charge(
        &mut self,
        priority: MessagePriority,
        recipient_name: &str,
    ) -> Result<LedgerEntry, AppError> {
        let cost = message_cost(priority);

        if self.plan == PlanType::Prepaid && self.balance < cost {
            return Err(AppError::InsufficientBalance {
                required: cost,
                available: self.balance,
            });
        }

        self.balance = self.balance - cost;

        let label = match priority {
            MessagePriority::Normal => "Normal",
            MessagePriority::High => "Urgent",
        };
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            date: Utc::now(),
            amount: -cost,
            description: format!("{} message to {}", label, recipient_name),
            balance: self.balance,
        };
        self.history.insert(0, entry.clone());

        Ok(entry)
    }
}
