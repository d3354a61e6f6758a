//! End-to-end tests at the JSON request/response level.
//!
//! Each test file covers a specific scenario, driving a virtual-clock
//! cluster through `ClientConnection` exactly as the WebSocket loop does.

#![cfg(test)]

mod helpers;

mod test_cleanup_export;
mod test_client_delay;
mod test_cross_shard_scan;
mod test_delete;
mod test_determinism;
mod test_duplicate_timestamp;
mod test_end_session;
mod test_missing_fields;
mod test_own_read;
mod test_request_tag;
mod test_staleness;
mod test_unknown_message;
mod test_update_merge;
