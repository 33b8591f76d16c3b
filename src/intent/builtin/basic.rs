//! General-purpose intents

use crate::voice::{Reply, Slots};

/// Do nothing and make no noise
///
/// A filler for when the user decides they didn't want anything after all.
#[allow(clippy::unnecessary_wraps)]
pub fn cancel(_text: &str, _slots: &Slots) -> anyhow::Result<Option<Reply>> {
    Ok(Some(Reply::Silent))
}
