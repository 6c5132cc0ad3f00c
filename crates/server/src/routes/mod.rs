pub mod ai_review;
pub mod chat;
pub mod questions;
pub mod sections;
pub mod sessions;
pub mod surveys;
pub mod test_runs;
pub mod threads;

use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(surveys::router())
        .merge(sections::router())
        .merge(questions::router())
        .merge(threads::router())
        .merge(sessions::router())
        .merge(test_runs::router())
        .merge(ai_review::router())
        .merge(chat::router())
}
