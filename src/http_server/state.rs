use std::sync::Arc;

use crate::config::Config;
use crate::database::Database;
use crate::storage::ObjectStorage;

pub struct AppState {
    pub db: Arc<Database>,
    pub storage: Arc<dyn ObjectStorage>,
    pub config: Config,
}
