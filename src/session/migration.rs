//! Upgrade of string-tagged turns from older payloads
//!
//! Earlier payloads stored each turn as `"You: ..."` or `"Bot: ..."`. Those
//! are turned into structured turns on load and written back structured on
//! the next persist.

use super::types::{Role, Turn};
use serde::{Deserialize, Deserializer};

const USER_PREFIX: &str = "You:";
const ASSISTANT_PREFIX: &str = "Bot:";

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredTurn {
    Structured(Turn),
    Tagged(String),
}

pub(super) fn deserialize_turns<'de, D>(deserializer: D) -> Result<Vec<Turn>, D::Error>
where
    D: Deserializer<'de>,
{
    let stored = Vec::<StoredTurn>::deserialize(deserializer)?;
    let mut migrated = 0usize;

    let turns = stored
        .into_iter()
        .enumerate()
        .map(|(index, turn)| match turn {
            StoredTurn::Structured(turn) => turn,
            StoredTurn::Tagged(text) => {
                migrated += 1;
                from_tagged(index, &text)
            }
        })
        .collect();

    if migrated > 0 {
        tracing::debug!(count = migrated, "Migrated string-tagged turns");
    }
    Ok(turns)
}

/// Ids come from the turn's position, which is unique within its session
fn from_tagged(index: usize, text: &str) -> Turn {
    let (role, content) = if let Some(rest) = text.strip_prefix(USER_PREFIX) {
        (Role::User, rest)
    } else if let Some(rest) = text.strip_prefix(ASSISTANT_PREFIX) {
        (Role::Assistant, rest)
    } else {
        (Role::Assistant, text)
    };

    Turn {
        id: format!("legacy-{index}"),
        role,
        content: content.strip_prefix(' ').unwrap_or(content).to_string(),
    }
}
