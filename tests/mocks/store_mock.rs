use edskool::error::StoreError;
use edskool::models::review::{NewReview, Review, VoteDirection, VoteState};
use edskool::store::{ReviewSubmissionStore, ReviewVoteStore};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

/// In-memory stand-in for the remote store. Counts every call so tests can
/// assert how many round trips an action cost.
#[derive(Default)]
pub struct MockStore {
    pub authors: HashMap<String, String>,
    pub base_scores: HashMap<String, i64>,
    pub votes: RefCell<HashMap<(String, String), VoteDirection>>,
    pub reports: RefCell<HashSet<(String, String)>>,
    pub reviews: RefCell<Vec<Review>>,
    pub batch_calls: Cell<usize>,
    pub calls: Cell<usize>,
    pub fail_mutations: Cell<bool>,
    pub omit_aggregate: Cell<bool>,
    pub fail_aggregate: Cell<bool>,
}

impl MockStore {
    pub fn with_reviews(reviews: &[Review]) -> Self {
        Self {
            authors: reviews
                .iter()
                .map(|r| (r.id.clone(), r.author_id.clone()))
                .collect(),
            base_scores: reviews.iter().map(|r| (r.id.clone(), r.vote_score)).collect(),
            reviews: RefCell::new(reviews.to_vec()),
            ..Default::default()
        }
    }

    fn hit(&self) {
        self.calls.set(self.calls.get() + 1);
    }

    fn score(&self, review_id: &str) -> i64 {
        let base = self.base_scores.get(review_id).copied().unwrap_or(0);
        base + self
            .votes
            .borrow()
            .iter()
            .filter(|((rid, _), _)| rid == review_id)
            .map(|(_, direction)| direction.weight())
            .sum::<i64>()
    }
}

impl ReviewVoteStore for MockStore {
    async fn batch_get_vote_state(
        &self,
        review_ids: &[String],
        viewer_id: Option<&str>,
    ) -> Result<Vec<VoteState>, StoreError> {
        self.hit();
        self.batch_calls.set(self.batch_calls.get() + 1);
        if self.fail_aggregate.get() {
            return Err(StoreError::Status(503));
        }
        if self.omit_aggregate.get() {
            return Ok(Vec::new());
        }
        let votes = self.votes.borrow();
        Ok(review_ids
            .iter()
            .filter(|id| self.authors.contains_key(*id))
            .map(|id| VoteState {
                review_id: id.clone(),
                vote_score: self.score(id),
                user_vote: viewer_id.and_then(|v| votes.get(&(id.clone(), v.to_string())).copied()),
            })
            .collect())
    }

    async fn upsert_vote(
        &self,
        review_id: &str,
        viewer_id: &str,
        direction: VoteDirection,
    ) -> Result<(), StoreError> {
        self.hit();
        if self.fail_mutations.get() {
            return Err(StoreError::Http("connection reset".into()));
        }
        self.votes
            .borrow_mut()
            .insert((review_id.to_string(), viewer_id.to_string()), direction);
        Ok(())
    }

    async fn delete_vote(&self, review_id: &str, viewer_id: &str) -> Result<(), StoreError> {
        self.hit();
        if self.fail_mutations.get() {
            return Err(StoreError::Http("connection reset".into()));
        }
        self.votes
            .borrow_mut()
            .remove(&(review_id.to_string(), viewer_id.to_string()));
        Ok(())
    }

    async fn reported_review_ids(
        &self,
        review_ids: &[String],
        viewer_id: &str,
    ) -> Result<HashSet<String>, StoreError> {
        self.hit();
        let reports = self.reports.borrow();
        Ok(review_ids
            .iter()
            .filter(|id| reports.contains(&((*id).clone(), viewer_id.to_string())))
            .cloned()
            .collect())
    }

    async fn find_report(&self, review_id: &str, viewer_id: &str) -> Result<bool, StoreError> {
        self.hit();
        Ok(self
            .reports
            .borrow()
            .contains(&(review_id.to_string(), viewer_id.to_string())))
    }

    async fn insert_report(
        &self,
        review_id: &str,
        viewer_id: &str,
        _reason: &str,
    ) -> Result<(), StoreError> {
        self.hit();
        if self.fail_mutations.get() {
            return Err(StoreError::Http("connection reset".into()));
        }
        if self.authors.get(review_id).map(String::as_str) == Some(viewer_id) {
            return Err(StoreError::Forbidden);
        }
        let fresh = self
            .reports
            .borrow_mut()
            .insert((review_id.to_string(), viewer_id.to_string()));
        if fresh {
            Ok(())
        } else {
            Err(StoreError::Conflict)
        }
    }
}

impl ReviewSubmissionStore for MockStore {
    async fn reviews_for_course(&self, course_id: &str) -> Result<Vec<Review>, StoreError> {
        self.hit();
        Ok(self
            .reviews
            .borrow()
            .iter()
            .filter(|r| r.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn find_review_by_author(
        &self,
        course_id: &str,
        viewer_id: &str,
    ) -> Result<Option<Review>, StoreError> {
        self.hit();
        Ok(self
            .reviews
            .borrow()
            .iter()
            .find(|r| r.course_id == course_id && r.author_id == viewer_id)
            .cloned())
    }

    async fn insert_review(&self, viewer_id: &str, review: &NewReview) -> Result<Review, StoreError> {
        self.hit();
        let saved = Review {
            id: format!("review-{}", self.reviews.borrow().len() + 1),
            course_id: review.course_id.clone(),
            rating: review.rating,
            comment: review.comment.clone(),
            created_at: chrono::Utc::now(),
            author_id: viewer_id.to_string(),
            vote_score: 0,
            user_vote: None,
            report_count: 0,
        };
        self.reviews.borrow_mut().push(saved.clone());
        Ok(saved)
    }
}
