//! Session configuration
//!
//! Read from `CREDIT_CHAT_*` environment variables. A value that fails to
//! parse is logged and replaced by its default.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::billing::{Credits, PlanType};

const DELIVERY_DELAY_VAR: &str = "CREDIT_CHAT_DELIVERY_DELAY_MS";
const REPLY_DELAY_VAR: &str = "CREDIT_CHAT_REPLY_DELAY_MS";
const INITIAL_BALANCE_VAR: &str = "CREDIT_CHAT_INITIAL_BALANCE";
const PLAN_VAR: &str = "CREDIT_CHAT_PLAN";
const STATE_FILE_VAR: &str = "CREDIT_CHAT_STATE_FILE";

/// Default state file holding the login flag
pub const DEFAULT_STATE_FILE: &str = "credit_chat_state.json";

#[derive(Debug, Clone)]
pub struct Config {
    /// Time from sending a message until it is marked delivered
    pub delivery_delay: Duration,
    /// Time the recipient "types" before the automatic reply arrives
    pub reply_delay: Duration,
    /// Balance of a freshly logged-in account
    pub initial_balance: Credits,
    pub plan: PlanType,
    /// Where the login flag is persisted
    pub state_file: PathBuf,
    /// Command channel capacity
    pub channel_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            delivery_delay: Duration::from_millis(1000),
            reply_delay: Duration::from_millis(2000),
            initial_balance: Credits::from_cents(50_000),
            plan: PlanType::Prepaid,
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            channel_buffer: 256,
        }
    }
}

impl Config {
    /// Build a config from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            delivery_delay: parse_var(&lookup, DELIVERY_DELAY_VAR)
                .map(Duration::from_millis)
                .unwrap_or(defaults.delivery_delay),
            reply_delay: parse_var(&lookup, REPLY_DELAY_VAR)
                .map(Duration::from_millis)
                .unwrap_or(defaults.reply_delay),
            initial_balance: parse_var(&lookup, INITIAL_BALANCE_VAR)
                .unwrap_or(defaults.initial_balance),
            plan: parse_var(&lookup, PLAN_VAR).unwrap_or(defaults.plan),
            state_file: lookup(STATE_FILE_VAR)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.state_file),
            channel_buffer: defaults.channel_buffer,
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring {}={:?}: {}", key, raw, e);
            None
        }
    }
}
