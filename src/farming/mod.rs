//! Per-wallet farming: burn decisions, epoch participation, reward claims and the
//! state machine tying them together.

mod balance;
mod budget;
mod burn;
mod claim;
mod epoch;
mod error;
mod farmer;
mod submit;

#[cfg(test)]
mod testing;

pub(crate) use budget::FarmingBudget;
pub(crate) use farmer::{
    FarmerSettings, SharedServices, SummaryHandle, WalletFarmer, read_summary,
};
