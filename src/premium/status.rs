use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::store::types::Profile;

/// Length of one purchased visibility boost.
pub const BOOST_DURATION_DAYS: i64 = 7;

/// A boost counts as "expiring soon" within this many (whole) days of its end.
const EXPIRING_SOON_MAX_DAYS: i64 = 2;

/// Which entitlement currently makes a profile premium.
///
/// A profile can hold both at once; the subscription wins because it is the
/// longer-lived claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PremiumKind {
    Subscription,
    Boost,
}

/// The span a freshly credited boost should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoostWindow {
    pub activated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// True when the profile holds any live entitlement: a subscription flag or
/// an unexpired boost. A boost ending exactly at `now` is already over.
pub fn is_premium_active(profile: &Profile, now: DateTime<Utc>) -> bool {
    if profile.is_premium {
        return true;
    }
    matches!(profile.premium_boost_end_at, Some(end) if end > now)
}

/// Whole days of boost left, rounded up. Any remainder counts as a full day,
/// so 1h left reports 1 and 25h left reports 2. Expired or absent boosts
/// report `None`.
pub fn remaining_boost_days(profile: &Profile, now: DateTime<Utc>) -> Option<i64> {
    let end = profile.premium_boost_end_at?;
    let ms = (end - now).num_milliseconds();
    if ms <= 0 {
        return None;
    }
    Some((ms + 86_400_000 - 1) / 86_400_000)
}

/// True in the final stretch of a boost: at most two rounded-up days left.
pub fn is_boost_expiring_soon(profile: &Profile, now: DateTime<Utc>) -> bool {
    matches!(remaining_boost_days(profile, now), Some(days) if days <= EXPIRING_SOON_MAX_DAYS)
}

/// Which entitlement is in force, if any. Subscription outranks boost.
pub fn premium_kind(profile: &Profile, now: DateTime<Utc>) -> Option<PremiumKind> {
    if profile.is_premium {
        return Some(PremiumKind::Subscription);
    }
    match profile.premium_boost_end_at {
        Some(end) if end > now => Some(PremiumKind::Boost),
        _ => None,
    }
}

/// Everything a client needs to render an entitlement: the four resolver
/// answers plus the live boost's end date.
#[derive(Debug, Clone, Serialize)]
pub struct PremiumFacts {
    pub active: bool,
    pub kind: Option<PremiumKind>,
    pub remaining_boost_days: Option<i64>,
    pub expiring_soon: bool,
    pub boost_ends_at: Option<DateTime<Utc>>,
}

pub fn premium_facts(profile: &Profile, now: DateTime<Utc>) -> PremiumFacts {
    PremiumFacts {
        active: is_premium_active(profile, now),
        kind: premium_kind(profile, now),
        remaining_boost_days: remaining_boost_days(profile, now),
        expiring_soon: is_boost_expiring_soon(profile, now),
        boost_ends_at: profile.premium_boost_end_at.filter(|end| *end > now),
    }
}

/// Compute the window a new boost purchase grants.
///
/// Buying while a boost is still running stacks: the new window starts where
/// the old one ends. Otherwise it starts now. `activated_at` always records
/// the purchase moment, not the stacked start.
pub fn boost_window(now: DateTime<Utc>, current_end: Option<DateTime<Utc>>) -> BoostWindow {
    let base = match current_end {
        Some(end) if end > now => end,
        _ => now,
    };
    BoostWindow {
        activated_at: now,
        expires_at: base + Duration::days(BOOST_DURATION_DAYS),
    }
}
