pub mod error;
pub mod routes;

use axum::Router;
use db::DBService;
use services::services::{
    assistant::AssistantService, session::SessionRegistry, test_run::TestRunService,
};

#[derive(Clone)]
pub struct AppState {
    db: DBService,
    sessions: SessionRegistry,
    test_runs: TestRunService,
    assistant: AssistantService,
}

impl AppState {
    pub fn new(db: DBService) -> Self {
        Self {
            db,
            sessions: SessionRegistry::new(),
            test_runs: TestRunService::new(),
            assistant: AssistantService::from_env(),
        }
    }

    pub fn with_assistant(db: DBService, assistant: AssistantService) -> Self {
        Self {
            db,
            sessions: SessionRegistry::new(),
            test_runs: TestRunService::new(),
            assistant,
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn test_runs(&self) -> &TestRunService {
        &self.test_runs
    }

    pub fn assistant(&self) -> &AssistantService {
        &self.assistant
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes::router())
        .with_state(state)
}
