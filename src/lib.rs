pub mod access;
pub mod api;
pub mod config;
pub mod db;
pub mod storage;
pub mod utils;

pub use db::DbPool;

use config::Config;
use storage::Storage;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub storage: Option<Storage>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, storage: Option<Storage>) -> Self {
        Self {
            config,
            db,
            storage,
        }
    }
}
