//! Team chat history

use super::rules::{CHAT_HISTORY_LEN, CHAT_RETENTION_MS};
use super::world::{ChatLogs, TeamMessage};
use crate::util::time::elapsed_since;

/// Append to the sender's team log, keeping only the most recent entries
pub fn push(logs: &mut ChatLogs, message: TeamMessage) {
    let log = logs.get_mut(message.team);
    log.push_back(message);
    while log.len() > CHAT_HISTORY_LEN {
        log.pop_front();
    }
}

/// Drop messages that have reached the retention age, keeping order
pub fn prune(logs: &mut ChatLogs, now: u64) {
    for log in [&mut logs.red, &mut logs.blue] {
        log.retain(|m| elapsed_since(m.timestamp, now) < CHAT_RETENTION_MS);
    }
}
