// src/agents/config.rs

//! A centralized place for tuning trader behaviour parameters.
//!
//! Prices are per unit of compute capacity for one month of use.

// --- ZipTrader ---
// Learning rate and momentum are drawn once per trader from these ranges.
pub const ZIP_LEARNING_RATE_MIN: f64 = 0.1;
pub const ZIP_LEARNING_RATE_MAX: f64 = 0.5;
pub const ZIP_MOMENTUM_MIN: f64 = 0.2;
pub const ZIP_MOMENTUM_MAX: f64 = 0.8;
// Starting margins. Buy margins live in [-1, 0), sell margins in [0, inf).
pub const ZIP_INITIAL_BUY_MARGIN_MIN: f64 = -0.35;
pub const ZIP_INITIAL_BUY_MARGIN_MAX: f64 = -0.05;
pub const ZIP_INITIAL_SELL_MARGIN_MIN: f64 = 0.05;
pub const ZIP_INITIAL_SELL_MARGIN_MAX: f64 = 0.35;
// Target perturbation: tau = R * q + A.
pub const ZIP_RAISE_R_MAX: f64 = 1.05;
pub const ZIP_RAISE_A_MAX: f64 = 0.05;
pub const ZIP_LOWER_R_MIN: f64 = 0.95;
pub const ZIP_LOWER_A_MIN: f64 = -0.05;
// Closest a buy margin may get to zero.
pub const ZIP_BUY_MARGIN_CEILING: f64 = -1e-6;

// --- TestTrader ---
// Zero-intelligence quotes are drawn between the limit and these bounds.
pub const TEST_TRADER_MIN_PRICE: f64 = 0.01;
pub const TEST_TRADER_MAX_PRICE: f64 = 0.25;

// --- InstanceTrader ---
pub const TICKS_PER_MONTH: u64 = 720;
pub const RESERVED_TERM_MONTHS: u64 = 12;
// Up-front price of one reserved instance for the whole term.
pub const RESERVED_INSTANCE_PRICE: f64 = 0.60;
// Price of one unit bought from the provider on demand.
pub const ON_DEMAND_PRICE: f64 = 0.10;
// Limit price for reselling a spare unit for the rest of the month.
pub const RESALE_LIMIT_PRICE: f64 = 0.06;
pub const INSTANCE_PROB_BUYING_RI: f64 = 0.05;
// Deadline given to resale assignments, in ticks.
pub const RESALE_DEADLINE_TICKS: u64 = TICKS_PER_MONTH;

// --- Market maker ---
pub const MM_INITIAL_PROB_BUYING_RI: f64 = 0.5;
pub const MM_PROB_STEP: f64 = 0.05;
