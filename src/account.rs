//! Logged-in client account
//!
//! Login is a mock: every valid document gets the same demo company with a
//! fresh wallet.

use crate::billing::{Credits, PlanType, Wallet};
use crate::config::Config;
use crate::document::Document;
use crate::fixtures::{CLIENT_ID, CLIENT_NAME};
use crate::types::ParticipantId;

/// Client account information
#[derive(Debug, Clone)]
pub struct Account {
    pub id: ParticipantId,
    pub name: String,
    /// Document used to log in
    pub document: Document,
    pub wallet: Wallet,
}

impl Account {
    /// Create the demo account for a validated document
    pub fn demo(document: Document, config: &Config) -> Self {
        Self {
            id: ParticipantId::new(CLIENT_ID),
            name: CLIENT_NAME.to_string(),
            document,
            wallet: Wallet::new(config.plan, config.initial_balance),
        }
    }

    pub fn plan(&self) -> PlanType {
        self.wallet.plan()
    }

    pub fn balance(&self) -> Credits {
        self.wallet.balance()
    }
}
