pub mod add;
pub mod cancel;
pub mod categories;
pub mod check;
pub mod expand;
pub mod list;
pub mod reschedule;
pub mod timeline;

use crate::config::Config;
use crate::store::EventStore;

/// What every command needs: the merged configuration and the events file.
pub struct Context {
    pub config: Config,
    pub store: EventStore,
}

impl Context {
    pub fn new(config: Config) -> Self {
        let store = EventStore::new(config.events_file.clone());
        Self { config, store }
    }
}
