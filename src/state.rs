use crate::broadcast::ResultBroadcaster;
use crate::config::Config;
use crate::db::SampleStore;
use crate::directory::StationDirectory;
use crate::session::SessionManager;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: SampleStore,
    pub directory: Arc<StationDirectory>,
    pub broadcaster: Arc<ResultBroadcaster>,
    pub sessions: Arc<SessionManager>,
}
