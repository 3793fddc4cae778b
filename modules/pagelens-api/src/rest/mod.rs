pub mod chat;

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use pagelens_engine::FillError;
use pagelens_store::PageSearch;

use crate::AppState;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

// --- Query structs ---

#[derive(Deserialize)]
pub struct PagingQuery {
    skip: Option<i64>,
    limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    name: Option<String>,
    industry: Option<String>,
    min_followers: Option<i32>,
    max_followers: Option<i32>,
    skip: Option<i64>,
    limit: Option<i64>,
}

// --- Pagination envelope ---

#[derive(Serialize)]
pub struct Paginated<T> {
    items: Vec<T>,
    total: i64,
    skip: i64,
    limit: i64,
    has_more: bool,
}

impl<T> Paginated<T> {
    fn new(items: Vec<T>, total: i64, skip: i64, limit: i64) -> Self {
        Self {
            has_more: skip + limit < total,
            items,
            total,
            skip,
            limit,
        }
    }
}

fn clamp_paging(skip: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let skip = skip.unwrap_or(0).max(0);
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    (skip, limit)
}

fn not_found(message: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

// --- Handlers ---

/// Fetch-or-fill: serve cached, repair, or scrape fresh via the fill engine.
pub async fn api_get_page(
    State(state): State<Arc<AppState>>,
    Path(handle): Path<String>,
) -> impl IntoResponse {
    match state.fill.fetch_or_fill(&handle).await {
        Ok(detail) => Json(detail).into_response(),
        Err(FillError::NotFound) => not_found("page not found"),
        Err(FillError::Internal(e)) => {
            warn!(handle = %handle, error = %e, "page fill failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn api_list_pages(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PagingQuery>,
) -> impl IntoResponse {
    let (skip, limit) = clamp_paging(params.skip, params.limit);

    let pages = match state.store.list_pages(skip, limit).await {
        Ok(pages) => pages,
        Err(e) => {
            warn!(error = %e, "failed to list pages");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    match state.store.count_pages().await {
        Ok(total) => Json(Paginated::new(pages, total, skip, limit)).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to count pages");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn api_search_pages(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> impl IntoResponse {
    let (skip, limit) = clamp_paging(params.skip, params.limit);
    let filter = PageSearch {
        name: params.name,
        industry: params.industry,
        min_followers: params.min_followers,
        max_followers: params.max_followers,
    };

    let pages = match state.store.search_pages(&filter, skip, limit).await {
        Ok(pages) => pages,
        Err(e) => {
            warn!(error = %e, "page search failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    match state.store.count_search(&filter).await {
        Ok(total) => Json(Paginated::new(pages, total, skip, limit)).into_response(),
        Err(e) => {
            warn!(error = %e, "page search count failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Posts of a cached page. A pure read: never triggers a fill.
pub async fn api_page_posts(
    State(state): State<Arc<AppState>>,
    Path(handle): Path<String>,
    Query(params): Query<PagingQuery>,
) -> impl IntoResponse {
    let (skip, limit) = clamp_paging(params.skip, params.limit);

    let page = match state.store.find_page(&handle).await {
        Ok(Some(page)) => page,
        Ok(None) => return not_found("page not found"),
        Err(e) => {
            warn!(handle = %handle, error = %e, "failed to load page");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let posts = state.store.list_posts(page.id, limit, skip).await;
    let total = state.store.count_posts(page.id).await;
    match (posts, total) {
        (Ok(posts), Ok(total)) => Json(Paginated::new(posts, total, skip, limit)).into_response(),
        (Err(e), _) | (_, Err(e)) => {
            warn!(handle = %handle, error = %e, "failed to list posts");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn api_post_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.store.get_post(id).await {
        Ok(Some(post)) => Json(post).into_response(),
        Ok(None) => not_found("post not found"),
        Err(e) => {
            warn!(post_id = id, error = %e, "failed to load post");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn api_post_comments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<PagingQuery>,
) -> impl IntoResponse {
    let (skip, limit) = clamp_paging(params.skip, params.limit);

    match state.store.get_post(id).await {
        Ok(Some(_)) => {}
        Ok(None) => return not_found("post not found"),
        Err(e) => {
            warn!(post_id = id, error = %e, "failed to load post");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let comments = state.store.list_comments(id, limit, skip).await;
    let total = state.store.count_comments(id).await;
    match (comments, total) {
        (Ok(comments), Ok(total)) => {
            Json(Paginated::new(comments, total, skip, limit)).into_response()
        }
        (Err(e), _) | (_, Err(e)) => {
            warn!(post_id = id, error = %e, "failed to list comments");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_more_matches_the_pagination_invariant() {
        // has_more == (skip + limit < total), item count <= limit
        let p = Paginated::new(vec![1, 2], 5, 0, 2);
        assert!(p.has_more);
        assert!(p.items.len() as i64 <= p.limit);

        let p = Paginated::new(vec![5], 5, 4, 2);
        assert!(!p.has_more);

        let p = Paginated::new(Vec::<i64>::new(), 0, 0, 10);
        assert!(!p.has_more);

        // Boundary: skip + limit == total is exhausted.
        let p = Paginated::new(vec![4, 5], 6, 4, 2);
        assert!(!p.has_more);
    }

    #[test]
    fn paging_defaults_and_clamps() {
        assert_eq!(clamp_paging(None, None), (0, DEFAULT_LIMIT));
        assert_eq!(clamp_paging(Some(-3), Some(0)), (0, 1));
        assert_eq!(clamp_paging(Some(20), Some(500)), (20, MAX_LIMIT));
    }
}
