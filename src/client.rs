/// Browser side of the review store: talks to the JSON API served by `api`.
use crate::api::{ReportLookupRequest, ReportRequest, ReviewRequest, VoteBatchRequest, VoteRequest};
use crate::error::StoreError;
use crate::models::review::{NewReview, Review, VoteDirection, VoteState};
use crate::store::{ReviewSubmissionStore, ReviewVoteStore};
use gloo_net::http::{Request, Response};
use leptos::logging::log;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct HttpReviewStore {
    base_url: String,
}

impl Default for HttpReviewStore {
    fn default() -> Self {
        Self::new("/api")
    }
}

fn http_error(e: gloo_net::Error) -> StoreError {
    StoreError::Http(e.to_string())
}

fn check_status(response: Response) -> Result<Response, StoreError> {
    match response.status() {
        _ if response.ok() => Ok(response),
        403 => Err(StoreError::Forbidden),
        404 => Err(StoreError::NotFound),
        409 => Err(StoreError::Conflict),
        code => Err(StoreError::Status(code)),
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    check_status(response)?
        .json::<T>()
        .await
        .map_err(|e| StoreError::Malformed(e.to_string()))
}

impl HttpReviewStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn review_url(&self, review_id: &str, tail: &str) -> String {
        format!(
            "{}/reviews/{}/{}",
            self.base_url,
            urlencoding::encode(review_id),
            tail
        )
    }

    async fn post_json<B: Serialize>(&self, url: &str, body: &B) -> Result<Response, StoreError> {
        Request::post(url)
            .json(body)
            .map_err(http_error)?
            .send()
            .await
            .map_err(http_error)
    }
}

impl ReviewVoteStore for HttpReviewStore {
    async fn batch_get_vote_state(
        &self,
        review_ids: &[String],
        viewer_id: Option<&str>,
    ) -> Result<Vec<VoteState>, StoreError> {
        let body = VoteBatchRequest {
            review_ids: review_ids.to_vec(),
            viewer_id: viewer_id.map(str::to_string),
        };
        let url = format!("{}/reviews/votes", self.base_url);
        log!("[CLIENT] Fetching vote state for {} reviews", review_ids.len());
        read_json(self.post_json(&url, &body).await?).await
    }

    async fn upsert_vote(
        &self,
        review_id: &str,
        viewer_id: &str,
        direction: VoteDirection,
    ) -> Result<(), StoreError> {
        let body = VoteRequest {
            viewer_id: viewer_id.to_string(),
            direction,
        };
        let response = Request::put(&self.review_url(review_id, "vote"))
            .json(&body)
            .map_err(http_error)?
            .send()
            .await
            .map_err(http_error)?;
        check_status(response).map(|_| ())
    }

    async fn delete_vote(&self, review_id: &str, viewer_id: &str) -> Result<(), StoreError> {
        let url = format!(
            "{}?viewer_id={}",
            self.review_url(review_id, "vote"),
            urlencoding::encode(viewer_id)
        );
        let response = Request::delete(&url).send().await.map_err(http_error)?;
        check_status(response).map(|_| ())
    }

    async fn reported_review_ids(
        &self,
        review_ids: &[String],
        viewer_id: &str,
    ) -> Result<HashSet<String>, StoreError> {
        let body = ReportLookupRequest {
            review_ids: review_ids.to_vec(),
            viewer_id: viewer_id.to_string(),
        };
        let url = format!("{}/reviews/reports/lookup", self.base_url);
        let ids: Vec<String> = read_json(self.post_json(&url, &body).await?).await?;
        Ok(ids.into_iter().collect())
    }

    async fn find_report(&self, review_id: &str, viewer_id: &str) -> Result<bool, StoreError> {
        let url = format!(
            "{}?viewer_id={}",
            self.review_url(review_id, "reports"),
            urlencoding::encode(viewer_id)
        );
        let response = Request::get(&url).send().await.map_err(http_error)?;
        let status: crate::api::ReportStatusResponse = read_json(response).await?;
        Ok(status.reported)
    }

    async fn insert_report(
        &self,
        review_id: &str,
        viewer_id: &str,
        reason: &str,
    ) -> Result<(), StoreError> {
        let body = ReportRequest {
            viewer_id: viewer_id.to_string(),
            reason: reason.to_string(),
        };
        let response = self
            .post_json(&self.review_url(review_id, "reports"), &body)
            .await?;
        check_status(response).map(|_| ())
    }
}

impl ReviewSubmissionStore for HttpReviewStore {
    async fn reviews_for_course(&self, course_id: &str) -> Result<Vec<Review>, StoreError> {
        let url = format!(
            "{}/courses/{}/reviews",
            self.base_url,
            urlencoding::encode(course_id)
        );
        let response = Request::get(&url).send().await.map_err(http_error)?;
        read_json(response).await
    }

    // The API has no single-review lookup; scan the course's list instead.
    async fn find_review_by_author(
        &self,
        course_id: &str,
        viewer_id: &str,
    ) -> Result<Option<Review>, StoreError> {
        let reviews = self.reviews_for_course(course_id).await?;
        Ok(reviews.into_iter().find(|r| r.author_id == viewer_id))
    }

    async fn insert_review(&self, viewer_id: &str, review: &NewReview) -> Result<Review, StoreError> {
        let body = ReviewRequest {
            viewer_id: viewer_id.to_string(),
            rating: review.rating,
            comment: review.comment.clone(),
        };
        let url = format!(
            "{}/courses/{}/reviews",
            self.base_url,
            urlencoding::encode(&review.course_id)
        );
        read_json(self.post_json(&url, &body).await?).await
    }
}
