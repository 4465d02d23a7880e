use crate::events::GravityEvent;
use crate::store::{CacheStore, KvStore};
use gravity_utils::error::GravityError;

/// Everything an operation may touch, passed explicitly into every keeper method:
/// the store, the height of the block being executed and the events emitted so far
pub struct Context<'a> {
    store: &'a mut dyn KvStore,
    block_height: u64,
    events: Vec<GravityEvent>,
}

impl<'a> Context<'a> {
    pub fn new(store: &'a mut dyn KvStore, block_height: u64) -> Context<'a> {
        Context {
            store,
            block_height,
            events: Vec::new(),
        }
    }

    pub fn block_height(&self) -> u64 {
        self.block_height
    }

    pub fn store(&self) -> &dyn KvStore {
        &*self.store
    }

    pub fn store_mut(&mut self) -> &mut dyn KvStore {
        &mut *self.store
    }

    pub fn emit(&mut self, event: GravityEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[GravityEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<GravityEvent> {
        std::mem::take(&mut self.events)
    }

    /// Runs `f` against a staged copy of the store. Writes and events made by `f`
    /// are kept only if it returns Ok, on any error they are discarded.
    pub fn with_write_set<T, F>(&mut self, f: F) -> Result<T, GravityError>
    where
        F: FnOnce(&mut Context<'_>) -> Result<T, GravityError>,
    {
        let block_height = self.block_height;
        let mut cache = CacheStore::new(&mut *self.store);
        let (res, events) = {
            let mut staged = Context::new(&mut cache, block_height);
            let res = f(&mut staged);
            (res, staged.events)
        };
        match res {
            Ok(v) => {
                cache.commit();
                self.events.extend(events);
                Ok(v)
            }
            Err(e) => Err(e),
        }
    }
}
