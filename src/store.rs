//! Capabilities the review page needs from the backing store.
//!
//! The server build implements them on top of sqlite (`db::Database`), the
//! browser build over HTTP (`client::HttpReviewStore`). Tests inject mocks.
use crate::error::StoreError;
use crate::models::review::{NewReview, Review, VoteDirection, VoteState};
use std::collections::HashSet;

#[allow(async_fn_in_trait)]
pub trait ReviewVoteStore {
    /// One round trip for all ids. Reviews without any votes may be absent.
    async fn batch_get_vote_state(
        &self,
        review_ids: &[String],
        viewer_id: Option<&str>,
    ) -> Result<Vec<VoteState>, StoreError>;

    /// Insert or flip the viewer's vote, unique on (review, viewer).
    async fn upsert_vote(
        &self,
        review_id: &str,
        viewer_id: &str,
        direction: VoteDirection,
    ) -> Result<(), StoreError>;

    async fn delete_vote(&self, review_id: &str, viewer_id: &str) -> Result<(), StoreError>;

    /// Ids among `review_ids` the viewer has already reported.
    async fn reported_review_ids(
        &self,
        review_ids: &[String],
        viewer_id: &str,
    ) -> Result<HashSet<String>, StoreError>;

    async fn find_report(&self, review_id: &str, viewer_id: &str) -> Result<bool, StoreError>;

    /// Fails with `StoreError::Conflict` on a duplicate and `StoreError::Forbidden` on a self-report.
    async fn insert_report(
        &self,
        review_id: &str,
        viewer_id: &str,
        reason: &str,
    ) -> Result<(), StoreError>;
}

#[allow(async_fn_in_trait)]
pub trait ReviewSubmissionStore {
    async fn reviews_for_course(&self, course_id: &str) -> Result<Vec<Review>, StoreError>;

    async fn find_review_by_author(
        &self,
        course_id: &str,
        viewer_id: &str,
    ) -> Result<Option<Review>, StoreError>;

    async fn insert_review(&self, viewer_id: &str, review: &NewReview) -> Result<Review, StoreError>;
}
