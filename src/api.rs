use crate::models::review::{ReportStatus, VoteDirection};
use serde::{Deserialize, Serialize};

#[cfg(feature = "ssr")]
use crate::config::ServerConfig;
#[cfg(feature = "ssr")]
use crate::db::Database;
#[cfg(feature = "ssr")]
use crate::error::{ReviewError, StoreError};
#[cfg(feature = "ssr")]
use crate::models::review::Viewer;
#[cfg(feature = "ssr")]
use crate::reconciler::submit_review;
#[cfg(feature = "ssr")]
use crate::store::{ReviewSubmissionStore, ReviewVoteStore};
#[cfg(feature = "ssr")]
use actix_web::{http::StatusCode, web, HttpResponse};
#[cfg(feature = "ssr")]
use leptos::logging::log;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VoteBatchRequest {
    pub review_ids: Vec<String>,
    pub viewer_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VoteRequest {
    pub viewer_id: String,
    pub direction: VoteDirection,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ViewerQuery {
    pub viewer_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ReportLookupRequest {
    pub review_ids: Vec<String>,
    pub viewer_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ReportRequest {
    pub viewer_id: String,
    pub reason: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReportStatusResponse {
    pub reported: bool,
    pub status: Option<ReportStatus>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ReviewRequest {
    pub viewer_id: String,
    pub rating: u8,
    pub comment: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(feature = "ssr")]
fn error_body(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ErrorBody {
        error: message.into(),
    })
}

#[cfg(feature = "ssr")]
fn store_error_response(context: &str, err: &StoreError) -> HttpResponse {
    let status = match err {
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::Conflict => StatusCode::CONFLICT,
        StoreError::Forbidden => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        leptos::logging::error!("[API] {}: {:?}", context, err);
    } else {
        log!("[API] {} rejected: {}", context, err);
    }
    error_body(status, err.to_string())
}

#[cfg(feature = "ssr")]
fn batch_too_large(config: &ServerConfig, count: usize) -> Option<HttpResponse> {
    (count > config.max_batch_ids).then(|| {
        error_body(
            StatusCode::BAD_REQUEST,
            format!("at most {} review ids per request", config.max_batch_ids),
        )
    })
}

// GET /api/courses/{course_id}/reviews
#[cfg(feature = "ssr")]
pub async fn get_course_reviews(
    db: web::Data<Database>,
    config: web::Data<ServerConfig>,
    course_id: web::Path<String>,
) -> HttpResponse {
    log!("[API] Received request for reviews of course: {}", course_id);
    match db.reviews_for_course(&course_id).await {
        Ok(mut reviews) => {
            // A page never holds more ids than one vote-state batch accepts.
            if reviews.len() > config.max_batch_ids {
                log!(
                    "[API] Course {} has {} reviews, returning the newest {}",
                    course_id,
                    reviews.len(),
                    config.max_batch_ids
                );
                reviews.truncate(config.max_batch_ids);
            }
            log!("[API] Returning {} reviews for course: {}", reviews.len(), course_id);
            HttpResponse::Ok().json(reviews)
        }
        Err(err) => store_error_response("Failed to fetch reviews", &err),
    }
}

// POST /api/courses/{course_id}/reviews
#[cfg(feature = "ssr")]
pub async fn create_course_review(
    db: web::Data<Database>,
    course_id: web::Path<String>,
    request: web::Json<ReviewRequest>,
) -> HttpResponse {
    let request = request.into_inner();
    let viewer = Viewer::new(request.viewer_id);
    match submit_review(db.get_ref(), Some(&viewer), &course_id, request.rating, &request.comment).await {
        Ok(review) => HttpResponse::Created().json(review),
        Err(err @ ReviewError::AlreadyReviewed) => error_body(StatusCode::CONFLICT, err.to_string()),
        Err(ReviewError::ReviewFailed(e)) => store_error_response("Failed to save review", &e),
        Err(err) => error_body(StatusCode::BAD_REQUEST, err.to_string()),
    }
}

// POST /api/reviews/votes
#[cfg(feature = "ssr")]
pub async fn batch_vote_state(
    db: web::Data<Database>,
    config: web::Data<ServerConfig>,
    request: web::Json<VoteBatchRequest>,
) -> HttpResponse {
    if let Some(rejection) = batch_too_large(&config, request.review_ids.len()) {
        return rejection;
    }
    log!("[API] Vote state requested for {} reviews", request.review_ids.len());
    match db
        .batch_get_vote_state(&request.review_ids, request.viewer_id.as_deref())
        .await
    {
        Ok(states) => HttpResponse::Ok().json(states),
        Err(err) => store_error_response("Failed to fetch vote states", &err),
    }
}

// PUT /api/reviews/{review_id}/vote
#[cfg(feature = "ssr")]
pub async fn put_vote(
    db: web::Data<Database>,
    review_id: web::Path<String>,
    request: web::Json<VoteRequest>,
) -> HttpResponse {
    match db
        .upsert_vote(&review_id, &request.viewer_id, request.direction)
        .await
    {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(err) => store_error_response("Failed to save vote", &err),
    }
}

// DELETE /api/reviews/{review_id}/vote?viewer_id=
#[cfg(feature = "ssr")]
pub async fn delete_vote(
    db: web::Data<Database>,
    review_id: web::Path<String>,
    query: web::Query<ViewerQuery>,
) -> HttpResponse {
    match db.delete_vote(&review_id, &query.viewer_id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(err) => store_error_response("Failed to remove vote", &err),
    }
}

// POST /api/reviews/reports/lookup
#[cfg(feature = "ssr")]
pub async fn lookup_reports(
    db: web::Data<Database>,
    config: web::Data<ServerConfig>,
    request: web::Json<ReportLookupRequest>,
) -> HttpResponse {
    if let Some(rejection) = batch_too_large(&config, request.review_ids.len()) {
        return rejection;
    }
    match db
        .reported_review_ids(&request.review_ids, &request.viewer_id)
        .await
    {
        Ok(reported) => {
            let mut ids: Vec<String> = reported.into_iter().collect();
            ids.sort();
            HttpResponse::Ok().json(ids)
        }
        Err(err) => store_error_response("Failed to fetch report status", &err),
    }
}

// GET /api/reviews/{review_id}/reports?viewer_id=
#[cfg(feature = "ssr")]
pub async fn get_report_status(
    db: web::Data<Database>,
    review_id: web::Path<String>,
    query: web::Query<ViewerQuery>,
) -> HttpResponse {
    match db.report_status(&review_id, &query.viewer_id).await {
        Ok(status) => HttpResponse::Ok().json(ReportStatusResponse {
            reported: status.is_some(),
            status,
        }),
        Err(err) => store_error_response("Failed to check report", &err),
    }
}

// POST /api/reviews/{review_id}/reports
#[cfg(feature = "ssr")]
pub async fn create_report(
    db: web::Data<Database>,
    review_id: web::Path<String>,
    request: web::Json<ReportRequest>,
) -> HttpResponse {
    let reason = request.reason.trim();
    if reason.is_empty() {
        return error_body(StatusCode::BAD_REQUEST, "Please provide a reason for reporting");
    }
    log!("[API] Report on review {} from {}", review_id, request.viewer_id);
    match db.insert_report(&review_id, &request.viewer_id, reason).await {
        Ok(()) => HttpResponse::Created().finish(),
        Err(err) => store_error_response("Failed to submit report", &err),
    }
}

/// Register the review API under the current scope.
#[cfg(feature = "ssr")]
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/courses/{course_id}/reviews", web::get().to(get_course_reviews))
        .route("/courses/{course_id}/reviews", web::post().to(create_course_review))
        .route("/reviews/votes", web::post().to(batch_vote_state))
        .route("/reviews/reports/lookup", web::post().to(lookup_reports))
        .route("/reviews/{review_id}/vote", web::put().to(put_vote))
        .route("/reviews/{review_id}/vote", web::delete().to(delete_vote))
        .route("/reviews/{review_id}/reports", web::get().to(get_report_status))
        .route("/reviews/{review_id}/reports", web::post().to(create_report));
}
