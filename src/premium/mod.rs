//! Premium entitlement resolution.
//!
//! Everything here is pure: callers pass the clock in, which keeps the
//! boundary cases (expiry second, day rounding) testable without sleeping.

mod status;

pub use status::{
    boost_window, is_boost_expiring_soon, is_premium_active, premium_facts, premium_kind,
    remaining_boost_days, BoostWindow, PremiumFacts, PremiumKind, BOOST_DURATION_DAYS,
};
