//! HTTP client for the Trello REST API
//!
//! Requests are authorized with the `key` and `token` query parameters.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;

use crate::config::TrackerConfig;
use crate::error::{Error, Result};
use crate::types::{Board, BoardSnapshot, Person, Stage, Task, TaskHistory};

use super::wire::{self, WireAction, WireBoard, WireCard, WireList, WireMember};

/// Trello returns at most this many actions per request
const ACTIONS_PAGE_SIZE: usize = 1000;

/// Stop paging a single card's actions after this many pages
const MAX_ACTION_PAGES: usize = 20;

/// HTTP client for the tracker API
pub struct TrackerClient {
    config: TrackerConfig,
    http_client: reqwest::Client,
    base_url: String,
}

impl TrackerClient {
    /// Create a new tracker client from configuration
    ///
    /// Returns an error if the configuration is invalid or missing credentials.
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;

        let base_url = config.base_url.trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
            base_url,
        })
    }

    /// GET `path` with the credentials and `query` appended
    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let key = self.config.api_key.as_deref().unwrap_or_default();
        let token = self.config.token.as_deref().unwrap_or_default();

        let response = self
            .http_client
            .get(&url)
            .query(&[("key", key), ("token", token)])
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Tracker(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| Error::Tracker(format!("failed to parse response: {}", e)))
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::Tracker(format!(
                "API error ({}) for {}: {}",
                status, path, error_text
            )))
        }
    }

    /// GET with retry logic
    ///
    /// Retries transient failures (5xx, timeouts) with exponential backoff.
    async fn get_with_retry<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let mut last_error = None;
        let mut delay = Duration::from_millis(500);

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::debug!(
                    "Retrying GET {} (attempt {}/{}), waiting {:?}",
                    path,
                    attempt + 1,
                    self.config.max_retries + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_secs(30));
            }

            match self.get(path, query).await {
                Ok(value) => return Ok(value),
                Err(e) if is_retryable_error(&e) => {
                    tracing::warn!("Transient tracker error: {}", e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Tracker("max retries exceeded".to_string())))
    }

    /// Open boards of the authenticated member
    pub async fn boards(&self) -> Result<Vec<Board>> {
        let boards: Vec<WireBoard> = self
            .get_with_retry("/members/me/boards", &[("filter", "open")])
            .await?;
        Ok(boards
            .into_iter()
            .filter(|b| !b.closed)
            .map(Board::from)
            .collect())
    }

    /// Open lists of a board
    pub async fn stages(&self, board_id: &str) -> Result<Vec<Stage>> {
        let path = format!("/boards/{}/lists", urlencoding::encode(board_id));
        let lists: Vec<WireList> = self.get_with_retry(&path, &[("filter", "open")]).await?;
        Ok(lists.into_iter().map(Stage::from).collect())
    }

    /// Open cards of a board
    pub async fn tasks(&self, board_id: &str) -> Result<Vec<Task>> {
        let path = format!("/boards/{}/cards", urlencoding::encode(board_id));
        let cards: Vec<WireCard> = self.get_with_retry(&path, &[]).await?;
        Ok(cards.into_iter().map(Task::from).collect())
    }

    /// Members of a board
    pub async fn members(&self, board_id: &str) -> Result<Vec<Person>> {
        let path = format!("/boards/{}/members", urlencoding::encode(board_id));
        let members: Vec<WireMember> = self.get_with_retry(&path, &[("filter", "all")]).await?;
        Ok(members.into_iter().map(Person::from).collect())
    }

    /// Board with its lists and cards
    pub async fn board_snapshot(&self, board: Board) -> Result<BoardSnapshot> {
        let stages = self.stages(&board.id).await?;
        let tasks = self.tasks(&board.id).await?;
        Ok(BoardSnapshot {
            board,
            stages,
            tasks,
        })
    }

    /// A card with its list moves
    pub async fn task_history(&self, task_id: &str) -> Result<TaskHistory> {
        let card_path = format!("/cards/{}", urlencoding::encode(task_id));
        let card: WireCard = self.get_with_retry(&card_path, &[]).await?;

        let actions_path = format!("{}/actions", card_path);
        let limit = ACTIONS_PAGE_SIZE.to_string();
        let actions = collect_action_pages(ACTIONS_PAGE_SIZE, MAX_ACTION_PAGES, |before| {
            let (path, limit) = (&actions_path, &limit);
            async move {
                let mut query = vec![("filter", "updateCard:idList"), ("limit", limit.as_str())];
                if let Some(before) = before.as_deref() {
                    query.push(("before", before));
                }
                self.get_with_retry::<Vec<WireAction>>(path, &query).await
            }
        })
        .await?;

        wire::task_history(card, actions)
    }
}

/// Follow a newest-first action listing back to the card's first move.
///
/// `fetch(before)` returns one page of at most `page_size` actions older than
/// the action id `before`. A short page ends the listing.
async fn collect_action_pages<F, Fut>(
    page_size: usize,
    max_pages: usize,
    mut fetch: F,
) -> Result<Vec<WireAction>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Vec<WireAction>>>,
{
    let mut actions: Vec<WireAction> = Vec::new();
    let mut before: Option<String> = None;

    for page in 0..max_pages {
        let batch = fetch(before.clone()).await?;
        let full = batch.len() >= page_size;
        let cursor = batch.last().map(|a| a.id.clone()).filter(|id| !id.is_empty());
        actions.extend(batch);

        match cursor {
            Some(id) if full && before.as_deref() != Some(id.as_str()) => before = Some(id),
            _ => return Ok(actions),
        }

        if page + 1 == max_pages {
            tracing::warn!(
                pages = max_pages,
                actions = actions.len(),
                "Card history truncated; oldest moves were not fetched"
            );
        }
    }

    Ok(actions)
}

/// Check if an error is retryable (transient)
fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::Tracker(msg) => {
            // Retry on 5xx errors
            msg.contains("API error (5")
                // Retry on rate limiting
                || msg.contains("API error (429")
                // Retry on network/timeout errors
                || msg.contains("timeout")
                || msg.contains("connection")
                || msg.contains("request failed")
        }
        _ => false,
    }
}
