// Sessions: shared state, the confirmation pause/resume pair, the gap asker and storage.

pub mod confirmation;
pub mod gap_asker;
pub mod models;
pub mod state;
pub mod store;
