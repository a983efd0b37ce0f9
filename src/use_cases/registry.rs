// Registry: the game-ID -> hub directory. Confines the only piece of shared
// mutable state outside a hub's own loop to lookup/insert/remove under a
// single lock, never held while dispatching a message.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::use_cases::hub::Hub;
use crate::use_cases::types::HubHandle;

pub struct RegistrySettings {
    pub hub_input_capacity: usize,
    pub replay_buffer_len: usize,
}

pub struct Registry {
    settings: RegistrySettings,
    hubs: RwLock<HashMap<String, HubHandle>>,
}

impl Registry {
    pub fn new(settings: RegistrySettings) -> Self {
        Registry {
            settings,
            hubs: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the hub for `game_id`, spawning one if none exists yet.
    ///
    /// Takes `&Arc<Self>` (not `&self`) so the newly spawned hub can hold its
    /// own clone of the registry and remove its own directory entry the
    /// instant its member set empties - see `reap` - instead of the entry
    /// only clearing out later, from the disconnecting client's own task.
    pub async fn get_or_create(self: &Arc<Self>, game_id: &str) -> HubHandle {
        if let Some(handle) = self.hubs.read().await.get(game_id) {
            return handle.clone();
        }
        let mut hubs = self.hubs.write().await;
        if let Some(handle) = hubs.get(game_id) {
            return handle.clone();
        }
        info!(game_id, "creating hub");
        let handle = Hub::spawn(
            game_id.to_string(),
            self.settings.hub_input_capacity,
            self.settings.replay_buffer_len,
            Arc::clone(self),
        );
        hubs.insert(game_id.to_string(), handle.clone());
        handle
    }

    /// Call once a connection has successfully joined `game_id`'s hub.
    pub fn register_connection(&self, handle: &HubHandle) {
        handle.active_connections.fetch_add(1, Ordering::SeqCst);
    }

    /// Call when a connection for `game_id` ends. Removes the directory
    /// entry once the last connection is gone; this races harmlessly against
    /// `reap` below (both check identity before removing), since a hub can
    /// also empty out and reap itself before this runs.
    pub async fn register_disconnect(&self, game_id: &str, active_connections: &Arc<AtomicUsize>) {
        let mut current = active_connections.load(Ordering::SeqCst);
        loop {
            if current == 0 {
                return;
            }
            match active_connections.compare_exchange(
                current,
                current - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        if current - 1 == 0 {
            self.remove_if_current(game_id, active_connections).await;
        }
    }

    /// Called by a hub's own dispatcher loop the moment its member set
    /// empties, so `get_or_create` can never hand a new connection a handle
    /// to a hub that has already exited: removal and lookup share this same
    /// write lock.
    pub async fn reap(&self, game_id: &str, active_connections: &Arc<AtomicUsize>) {
        self.remove_if_current(game_id, active_connections).await;
    }

    async fn remove_if_current(&self, game_id: &str, active_connections: &Arc<AtomicUsize>) {
        let mut hubs = self.hubs.write().await;
        if let Some(handle) = hubs.get(game_id) {
            if Arc::ptr_eq(&handle.active_connections, active_connections) {
                hubs.remove(game_id);
                info!(game_id, "hub directory entry removed");
            }
        }
    }
}
