// ABOUTME: Collision-resistant string identifiers for messages, groups, members and images
// ABOUTME: Deterministic composite identifiers for direct conversation rows
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identifier generation
//!
//! Generated identifiers are `{prefix}_{millisecond-timestamp}_{9 base36
//! chars}`. The random tail makes collisions negligible without being
//! cryptographic; ordering comes from message timestamps, never from the id.
//! Direct-conversation ids are a pure function of the ordered account pair:
//! the pair is perspective-ordered (row owner first), not symmetric.

use chrono::Utc;
use rand::Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const RANDOM_LEN: usize = 9;

/// Generate a unique identifier with the given prefix
#[must_use]
pub fn new_id(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let mut rng = rand::thread_rng();
    let tail: String = (0..RANDOM_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{prefix}_{millis}_{tail}")
}

/// Message identifier (`msg_...`)
#[must_use]
pub fn message_id() -> String {
    new_id("msg")
}

/// Group identifier (`group_...`)
#[must_use]
pub fn group_id() -> String {
    new_id("group")
}

/// Group member identifier (`gm_...`)
#[must_use]
pub fn group_member_id() -> String {
    new_id("gm")
}

/// Group conversation identifier (`gconv_...`)
#[must_use]
pub fn group_conversation_id() -> String {
    new_id("gconv")
}

/// Deterministic direct-conversation identifier for the ordered pair
/// (`user_account`, `contact_account`); the row owner's account first
#[must_use]
pub fn conversation_id(user_account: &str, contact_account: &str) -> String {
    format!("conv_{user_account}_{contact_account}")
}

/// Identifier for the `index`-th image of a multi-image message
#[must_use]
pub fn image_id(message_id: &str, index: usize) -> String {
    format!("img_{message_id}_{index}")
}
