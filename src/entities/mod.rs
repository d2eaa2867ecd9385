// Entity Models - Streamer profiles and period snapshots
//
// Each entity has:
// - Stable identity (UUID) assigned by the record store
// - A business key (streamer_id, or period type + label for snapshots)

pub mod streamer;
pub mod snapshot;

pub use streamer::{filter_streamers, Streamer, StreamerDraft, StreamerForm, StreamerRef};
pub use snapshot::{NewSnapshot, PeriodType, Snapshot, StreamerSnapshotData};
