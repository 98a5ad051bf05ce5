use moka::sync::Cache;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::Config;
use crate::db::Store;
use crate::models::ServerMessage;
use crate::ws::{Delivery, Hub, Purpose};

/// Process-wide state shared by the HTTP routes and every socket task.
pub struct AppState {
    pub config: Arc<Config>,
    pub hub: Mutex<Hub>,
    pub store: Arc<dyn Store>,
    join_debounce: Cache<String, ()>,
    /// Serializes analytics recomputes so concurrent triggers cannot drop
    /// each other's activities.
    pub analytics_lock: Mutex<()>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Arc<Self> {
        let join_debounce = Cache::builder()
            .max_capacity(100_000)
            .time_to_live(config.join_debounce())
            .build();
        info!("Join debounce cache initialized");

        Arc::new(Self {
            config: Arc::new(config),
            hub: Mutex::new(Hub::new()),
            store,
            join_debounce,
            analytics_lock: Mutex::new(()),
        })
    }

    pub async fn dispatch(&self, deliveries: Vec<Delivery>) -> usize {
        if deliveries.is_empty() {
            return 0;
        }
        self.hub.lock().await.deliver(deliveries)
    }

    /// Send one event to every connection in a chat group.
    pub async fn broadcast_to_group(&self, group_id: &str, message: ServerMessage) -> usize {
        let hub = self.hub.lock().await;
        let deliveries = hub.fan_out(Purpose::Chat, group_id, &message, None);
        hub.deliver(deliveries)
    }

    /// First join of a participant inside the debounce window returns true;
    /// repeats return false until the entry expires.
    pub fn first_join_in_window(&self, group_id: &str, participant_id: &str) -> bool {
        let key = format!("{}:{}", group_id, participant_id);
        self.join_debounce.entry(key).or_insert(()).is_fresh()
    }

    pub fn join_debounce_len(&self) -> u64 {
        self.join_debounce.run_pending_tasks();
        self.join_debounce.entry_count()
    }

    /// Push the group's online-user list once the registry has settled.
    pub fn schedule_presence_refresh(self: &Arc<Self>, group_id: String) {
        let state = Arc::clone(self);
        let settle = state.config.presence_settle();
        tokio::spawn(async move {
            tokio::time::sleep(settle).await;
            let mut hub = state.hub.lock().await;
            let deliveries = hub.take_presence_refresh(&group_id);
            let sent = hub.deliver(deliveries);
            debug!("Pushed online users of {} to {} connections", group_id, sent);
        });
    }

    /// Drop a closed connection from every room and notify the peers.
    pub async fn disconnect(self: &Arc<Self>, conn_id: &str) {
        let outcome = {
            let mut hub = self.hub.lock().await;
            let outcome = hub.disconnect(conn_id);
            hub.deliver(outcome.deliveries);
            outcome.refresh_groups
        };
        for group_id in outcome {
            self.schedule_presence_refresh(group_id);
        }
    }

    /// Periodically evict cursor overlays that went quiet.
    pub fn spawn_cursor_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let state = Arc::clone(self);
        let ttl = state.config.cursor_ttl();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(ttl / 2);
            loop {
                ticker.tick().await;
                let evicted = state.hub.lock().await.editor.evict_stale(ttl, Instant::now());
                if evicted > 0 {
                    debug!("Evicted {} idle cursor overlays", evicted);
                }
            }
        })
    }
}
