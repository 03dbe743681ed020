//! Dashboard view: the feedback table.

use std::sync::Arc;

use anyhow::Result;
use comfy_table::Table;
use fbdash_core::api::{ApiClient, FeedbackItem};
use fbdash_core::cache::{QueryCache, QueryState};
use fbdash_core::session::SessionManager;
use futures_util::FutureExt;

/// Query key for the dashboard's feedback listing.
pub const FEEDBACK_LIST_KEY: &str = "feedback-list";

/// Fetches the feedback list through the query cache and renders it.
///
/// Row order equals response order. A failed fetch renders a retryable
/// error state instead of crashing.
pub async fn run(api: &Arc<ApiClient>, session: &SessionManager) -> Result<Option<&'static str>> {
    let cache: QueryCache<Vec<FeedbackItem>> = QueryCache::new();

    let loader_api = Arc::clone(api);
    let mut handle = cache.subscribe(FEEDBACK_LIST_KEY, move || {
        let api = Arc::clone(&loader_api);
        async move { api.feedbacks().await }.boxed()
    });

    match handle.wait().await {
        QueryState::Success(items) => {
            println!("Feedback Dashboard");
            if let Some(user) = session.identity() {
                println!("Signed in as {}", user.username);
            }
            println!();
            render_table(&items);
            Ok(None)
        }
        QueryState::Failure(e) => {
            anyhow::bail!("Error loading feedbacks: {e}\nRun `fbdash dashboard` to retry.")
        }
        QueryState::Pending => anyhow::bail!("feedback fetch was cancelled"),
    }
}

fn render_table(items: &[FeedbackItem]) {
    if items.is_empty() {
        println!("No feedback yet.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Title", "Upvotes", "Status"]);
    for item in items {
        table.add_row(vec![
            item.title.clone(),
            item.upvotes.to_string(),
            item.status.to_string(),
        ]);
    }
    println!("{table}");
}
