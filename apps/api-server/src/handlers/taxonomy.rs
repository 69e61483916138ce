//! Read-only category and tag listings.

use actix_web::{HttpResponse, web};

use crate::middleware::AppResult;
use crate::state::AppState;

use super::presenter;

/// GET /api/categories
pub async fn categories(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let categories: Vec<_> = state
        .categories
        .all()
        .await?
        .into_iter()
        .map(presenter::category)
        .collect();
    Ok(HttpResponse::Ok().json(categories))
}

/// GET /api/tags
pub async fn tags(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let tags: Vec<_> = state
        .tags
        .all()
        .await?
        .into_iter()
        .map(presenter::tag)
        .collect();
    Ok(HttpResponse::Ok().json(tags))
}
