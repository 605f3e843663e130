//! Access policy for market visibility tiers.
//!
//! `whisper` markets are labelled for pseudonymous participants but are as open
//! as `public` ones; only `private` markets consult the access list.

use crate::models::{Market, Visibility};

/// Whether `identity` may bet on (and see) `market`.
pub fn is_permitted(market: &Market, identity: &str) -> bool {
    match market.visibility {
        Visibility::Public | Visibility::Whisper => true,
        Visibility::Private => market
            .access_list
            .as_ref()
            .map_or(false, |allowed| allowed.iter().any(|member| member == identity)),
    }
}
