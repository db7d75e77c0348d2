use std::sync::Arc;
use std::time::Duration;

use lanseat_db::Database;
use lanseat_gateway::Dispatcher;

use crate::error::ApiError;
use crate::locks::KeyedLocks;
use crate::roster::RosterPublisher;
use crate::seatmap::SeatMapRenderer;

pub type AppState = Arc<AppStateInner>;

/// Runtime knobs the handlers read; filled from the environment by the server.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Platform user id that is always treated as admin
    pub owner_id: Option<String>,
    /// Debounce window of roster publishes
    pub roster_delay: Duration,
    /// Appended to the registration-complete DM
    pub payment_info: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            owner_id: None,
            roster_delay: Duration::from_secs(5),
            payment_info: None,
        }
    }
}

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub dispatcher: Dispatcher,
    pub publisher: RosterPublisher,
    /// Serializes the handling of one user's messages and button presses
    pub user_locks: KeyedLocks,
    pub config: BotConfig,
}

impl AppStateInner {
    pub fn new(
        db: Arc<Database>,
        dispatcher: Dispatcher,
        config: BotConfig,
        renderer: Arc<dyn SeatMapRenderer>,
    ) -> AppState {
        let publisher = RosterPublisher::new(db.clone(), dispatcher.clone(), renderer, config.roster_delay);
        Arc::new(Self {
            db,
            dispatcher,
            publisher,
            user_locks: KeyedLocks::new(),
            config,
        })
    }

    /// Run a storage call off the async runtime.
    pub async fn db<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        run_blocking(&self.db, f).await
    }
}

pub(crate) async fn run_blocking<F, T>(db: &Arc<Database>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    Ok(tokio::task::spawn_blocking(move || f(&db)).await??)
}
