//! Vote and report reconciliation for the reviews shown on a course page.
//!
//! State changes are split in three steps so the UI and the tests can drive
//! each one on its own: a pure `plan_*` check against the current board, an
//! async `perform_*` effect against the store, and a pure `apply_*` that
//! produces the next board. Boards are never mutated in place.
use crate::error::{ReviewError, StoreError};
use crate::models::review::{NewReview, Review, Viewer, VoteDirection, VoteState};
use crate::store::{ReviewSubmissionStore, ReviewVoteStore};
use leptos::logging::{error, log, warn};
use std::collections::HashSet;

/// Text typed into the report dialog and the review it targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportDraft {
    pub review_id: Option<String>,
    pub reason: String,
}

/// The viewer's projection of a course's reviews.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewBoard {
    reviews: Vec<Review>,
    reported: HashSet<String>,
    draft: ReportDraft,
}

/// Remote mutation a vote turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteMutation {
    Remove,
    Upsert(VoteDirection),
}

/// A vote that passed every local check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotePlan {
    pub review_id: String,
    pub viewer_id: String,
    pub current: Option<VoteDirection>,
    pub direction: VoteDirection,
}

impl VotePlan {
    pub fn is_removal(&self) -> bool {
        self.current == Some(self.direction)
    }

    pub fn mutation(&self) -> VoteMutation {
        if self.is_removal() {
            VoteMutation::Remove
        } else {
            VoteMutation::Upsert(self.direction)
        }
    }

    /// The viewer's vote once the mutation has landed.
    pub fn resulting_vote(&self) -> Option<VoteDirection> {
        if self.is_removal() {
            None
        } else {
            Some(self.direction)
        }
    }

    /// Score change used when the server does not hand back an aggregate.
    /// Removing undoes one vote, switching undoes one and adds one.
    pub fn score_delta(&self) -> i64 {
        let weight = self.direction.weight();
        match self.current {
            Some(current) if current == self.direction => -weight,
            Some(_) => 2 * weight,
            None => weight,
        }
    }
}

/// What the store said after a successful vote mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    Confirmed(VoteState),
    Unconfirmed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPlan {
    pub review_id: String,
    pub viewer_id: String,
    pub reason: String,
}

impl ReviewBoard {
    pub fn new(reviews: Vec<Review>) -> Self {
        Self {
            reviews,
            reported: HashSet::new(),
            draft: ReportDraft::default(),
        }
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn review(&self, review_id: &str) -> Option<&Review> {
        self.reviews.iter().find(|r| r.id == review_id)
    }

    pub fn review_ids(&self) -> Vec<String> {
        self.reviews.iter().map(|r| r.id.clone()).collect()
    }

    pub fn has_reported(&self, review_id: &str) -> bool {
        self.reported.contains(review_id)
    }

    pub fn report_draft(&self) -> &ReportDraft {
        &self.draft
    }

    fn replace_review(&self, review_id: &str, f: impl Fn(&Review) -> Review) -> ReviewBoard {
        let reviews = self
            .reviews
            .iter()
            .map(|r| if r.id == review_id { f(r) } else { r.clone() })
            .collect();
        ReviewBoard {
            reviews,
            reported: self.reported.clone(),
            draft: self.draft.clone(),
        }
    }

    /// Overwrite score and viewer vote from an authoritative answer.
    /// Reviews missing from `states` keep what they had.
    pub fn with_vote_states(&self, states: &[VoteState]) -> ReviewBoard {
        let reviews = self
            .reviews
            .iter()
            .map(|review| match states.iter().find(|s| s.review_id == review.id) {
                Some(state) => Review {
                    vote_score: state.vote_score,
                    user_vote: state.user_vote,
                    ..review.clone()
                },
                None => review.clone(),
            })
            .collect();
        ReviewBoard {
            reviews,
            reported: self.reported.clone(),
            draft: self.draft.clone(),
        }
    }

    pub fn with_reported(&self, reported: HashSet<String>) -> ReviewBoard {
        ReviewBoard {
            reviews: self.reviews.clone(),
            reported,
            draft: self.draft.clone(),
        }
    }

    pub fn plan_vote(
        &self,
        viewer: Option<&Viewer>,
        review_id: &str,
        direction: VoteDirection,
    ) -> Result<VotePlan, ReviewError> {
        let viewer = viewer.ok_or(ReviewError::VoteRequiresLogin)?;
        let review = self.review(review_id).ok_or(ReviewError::ReviewNotFound)?;
        if review.is_authored_by(viewer) {
            return Err(ReviewError::SelfVote);
        }
        Ok(VotePlan {
            review_id: review.id.clone(),
            viewer_id: viewer.id.clone(),
            current: review.user_vote,
            direction,
        })
    }

    /// Server-confirmed path: take the store's numbers as they are.
    pub fn apply_confirmed_vote(&self, state: &VoteState) -> ReviewBoard {
        self.replace_review(&state.review_id, |review| Review {
            vote_score: state.vote_score,
            user_vote: state.user_vote,
            ..review.clone()
        })
    }

    /// Fallback path: shift the local score by the plan's delta.
    pub fn apply_fallback_vote(&self, plan: &VotePlan) -> ReviewBoard {
        self.replace_review(&plan.review_id, |review| Review {
            vote_score: review.vote_score + plan.score_delta(),
            user_vote: plan.resulting_vote(),
            ..review.clone()
        })
    }

    pub fn apply_vote(&self, plan: &VotePlan, outcome: &VoteOutcome) -> ReviewBoard {
        match outcome {
            VoteOutcome::Confirmed(state) => self.apply_confirmed_vote(state),
            VoteOutcome::Unconfirmed => self.apply_fallback_vote(plan),
        }
    }

    fn check_reportable<'a>(
        &'a self,
        viewer: Option<&'a Viewer>,
        review_id: &str,
    ) -> Result<(&'a Viewer, &'a Review), ReviewError> {
        let viewer = viewer.ok_or(ReviewError::ReportRequiresLogin)?;
        let review = self.review(review_id).ok_or(ReviewError::ReviewNotFound)?;
        if review.is_authored_by(viewer) {
            return Err(ReviewError::SelfReport);
        }
        Ok((viewer, review))
    }

    pub fn plan_report(
        &self,
        viewer: Option<&Viewer>,
        review_id: &str,
        reason: &str,
    ) -> Result<ReportPlan, ReviewError> {
        let viewer = viewer.ok_or(ReviewError::ReportRequiresLogin)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ReviewError::EmptyReason);
        }
        let (viewer, review) = self.check_reportable(Some(viewer), review_id)?;
        if self.has_reported(&review.id) {
            return Err(ReviewError::AlreadyReported);
        }
        Ok(ReportPlan {
            review_id: review.id.clone(),
            viewer_id: viewer.id.clone(),
            reason: reason.to_string(),
        })
    }

    /// Plan a report from whatever the dialog currently holds.
    pub fn plan_drafted_report(&self, viewer: Option<&Viewer>) -> Result<ReportPlan, ReviewError> {
        let review_id = self
            .draft
            .review_id
            .as_deref()
            .ok_or(ReviewError::ReviewNotFound)?;
        self.plan_report(viewer, review_id, &self.draft.reason)
    }

    /// Accepted report: flag it, bump the count once and reset the dialog.
    pub fn apply_report(&self, plan: &ReportPlan) -> ReviewBoard {
        let mut next = self.replace_review(&plan.review_id, |review| Review {
            report_count: review.report_count + 1,
            ..review.clone()
        });
        next.reported.insert(plan.review_id.clone());
        next.draft = ReportDraft::default();
        next
    }

    /// The store already had a report from this viewer.
    pub fn mark_reported(&self, review_id: &str) -> ReviewBoard {
        let mut reported = self.reported.clone();
        reported.insert(review_id.to_string());
        self.with_reported(reported)
    }

    pub fn open_report(&self, viewer: Option<&Viewer>, review_id: &str) -> Result<ReviewBoard, ReviewError> {
        let (_, review) = self.check_reportable(viewer, review_id)?;
        if self.has_reported(&review.id) {
            return Err(ReviewError::AlreadyReported);
        }
        Ok(ReviewBoard {
            reviews: self.reviews.clone(),
            reported: self.reported.clone(),
            draft: ReportDraft {
                review_id: Some(review.id.clone()),
                reason: String::new(),
            },
        })
    }

    pub fn with_report_reason(&self, reason: impl Into<String>) -> ReviewBoard {
        ReviewBoard {
            reviews: self.reviews.clone(),
            reported: self.reported.clone(),
            draft: ReportDraft {
                review_id: self.draft.review_id.clone(),
                reason: reason.into(),
            },
        }
    }

    pub fn close_report(&self) -> ReviewBoard {
        self.with_report_reason(String::new()).clear_selection()
    }

    fn clear_selection(mut self) -> ReviewBoard {
        self.draft.review_id = None;
        self
    }

    pub fn report_hint(&self, review: &Review, viewer: Option<&Viewer>) -> &'static str {
        match viewer {
            None => "Sign in to report",
            Some(viewer) if review.is_authored_by(viewer) => "You cannot report your own review",
            Some(_) if self.has_reported(&review.id) => "You have already reported this review",
            Some(_) => "Report this review",
        }
    }
}

/// Tooltip for a vote button.
pub fn vote_hint(review: &Review, viewer: Option<&Viewer>, direction: VoteDirection) -> &'static str {
    match (viewer, direction) {
        (None, _) => "Sign in to vote",
        (Some(viewer), _) if review.is_authored_by(viewer) => "Cannot vote on your own review",
        (Some(_), VoteDirection::Up) if review.user_vote == Some(VoteDirection::Up) => "Remove upvote",
        (Some(_), VoteDirection::Down) if review.user_vote == Some(VoteDirection::Down) => {
            "Remove downvote"
        }
        (Some(_), VoteDirection::Up) => "Upvote",
        (Some(_), VoteDirection::Down) => "Downvote",
    }
}

/// Build the initial board. Anonymous viewers and empty pages cost no requests;
/// otherwise exactly one vote lookup and one report lookup cover every review.
pub async fn load_board<S: ReviewVoteStore>(
    store: &S,
    reviews: Vec<Review>,
    viewer: Option<&Viewer>,
) -> ReviewBoard {
    let board = ReviewBoard::new(reviews);
    let viewer = match viewer {
        Some(viewer) if !board.reviews.is_empty() => viewer,
        _ => return board,
    };

    let ids = board.review_ids();
    let (votes, reports) = futures::join!(
        store.batch_get_vote_state(&ids, Some(viewer.id.as_str())),
        store.reported_review_ids(&ids, &viewer.id)
    );

    let board = match votes {
        Ok(states) => {
            log!("[VOTES] Loaded vote state for {} of {} reviews", states.len(), ids.len());
            board.with_vote_states(&states)
        }
        Err(e) => {
            error!("[VOTES] Error fetching vote states: {}", e);
            board
        }
    };

    match reports {
        Ok(reported) => board.with_reported(reported),
        Err(e) => {
            error!("[REPORTS] Error fetching report status: {}", e);
            board
        }
    }
}

/// Send the vote mutation, then ask for the review's aggregate.
pub async fn perform_vote<S: ReviewVoteStore>(store: &S, plan: &VotePlan) -> Result<VoteOutcome, ReviewError> {
    let result = match plan.mutation() {
        VoteMutation::Remove => store.delete_vote(&plan.review_id, &plan.viewer_id).await,
        VoteMutation::Upsert(direction) => {
            store
                .upsert_vote(&plan.review_id, &plan.viewer_id, direction)
                .await
        }
    };
    if let Err(e) = result {
        error!("[VOTES] Vote error on review {}: {}", plan.review_id, e);
        return Err(ReviewError::VoteFailed(e));
    }

    let ids = [plan.review_id.clone()];
    match store.batch_get_vote_state(&ids, Some(plan.viewer_id.as_str())).await {
        Ok(states) => match states.into_iter().find(|s| s.review_id == plan.review_id) {
            Some(state) => Ok(VoteOutcome::Confirmed(state)),
            None => {
                log!("[VOTES] No aggregate for review {}, applying local delta", plan.review_id);
                Ok(VoteOutcome::Unconfirmed)
            }
        },
        Err(e) => {
            warn!("[VOTES] Count error on review {}: {}, applying local delta", plan.review_id, e);
            Ok(VoteOutcome::Unconfirmed)
        }
    }
}

/// Re-check the store for an earlier report, then insert.
pub async fn perform_report<S: ReviewVoteStore>(store: &S, plan: &ReportPlan) -> Result<(), ReviewError> {
    match store.find_report(&plan.review_id, &plan.viewer_id).await {
        Ok(true) => return Err(ReviewError::AlreadyReported),
        Ok(false) => {}
        Err(e) => {
            error!("[REPORTS] Could not check existing reports: {}", e);
            return Err(ReviewError::ReportFailed(e));
        }
    }

    match store
        .insert_report(&plan.review_id, &plan.viewer_id, &plan.reason)
        .await
    {
        Ok(()) => {
            log!("[REPORTS] Review {} reported", plan.review_id);
            Ok(())
        }
        Err(StoreError::Conflict) => Err(ReviewError::AlreadyReported),
        Err(StoreError::Forbidden) => Err(ReviewError::SelfReport),
        Err(e) => {
            error!("[REPORTS] Error reporting review: {}", e);
            Err(ReviewError::ReportFailed(e))
        }
    }
}

/// Fold a report result into the board: count once on success, remember the
/// flag on a duplicate, leave everything else alone.
pub fn settle_report(board: &ReviewBoard, plan: &ReportPlan, result: &Result<(), ReviewError>) -> ReviewBoard {
    match result {
        Ok(()) => board.apply_report(plan),
        Err(ReviewError::AlreadyReported) => board.mark_reported(&plan.review_id),
        Err(_) => board.clone(),
    }
}

pub async fn submit_review<S: ReviewSubmissionStore>(
    store: &S,
    viewer: Option<&Viewer>,
    course_id: &str,
    rating: u8,
    comment: &str,
) -> Result<Review, ReviewError> {
    let viewer = viewer.ok_or(ReviewError::ReviewRequiresLogin)?;
    let comment = comment.trim();
    if !(1..=5).contains(&rating) || comment.is_empty() {
        return Err(ReviewError::IncompleteReview);
    }

    match store.find_review_by_author(course_id, &viewer.id).await {
        Ok(Some(_)) => return Err(ReviewError::AlreadyReviewed),
        Ok(None) => {}
        Err(e) => return Err(ReviewError::ReviewFailed(e)),
    }

    let review = NewReview {
        course_id: course_id.to_string(),
        rating,
        comment: comment.to_string(),
    };
    match store.insert_review(&viewer.id, &review).await {
        Ok(saved) => {
            log!("[REVIEWS] Review {} submitted for course {}", saved.id, course_id);
            Ok(saved)
        }
        Err(StoreError::Conflict) => Err(ReviewError::AlreadyReviewed),
        Err(e) => {
            error!("[REVIEWS] Error submitting review: {}", e);
            Err(ReviewError::ReviewFailed(e))
        }
    }
}

/// Owns a board and a store for one viewer and runs every step of an action
/// in sequence. `&mut self` means one action at a time per reconciler.
pub struct VoteReconciler<S> {
    store: S,
    viewer: Option<Viewer>,
    board: ReviewBoard,
}

impl<S: ReviewVoteStore> VoteReconciler<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            viewer: None,
            board: ReviewBoard::default(),
        }
    }

    pub async fn initialize(&mut self, reviews: Vec<Review>, viewer: Option<Viewer>) {
        self.board = load_board(&self.store, reviews, viewer.as_ref()).await;
        self.viewer = viewer;
    }

    pub async fn vote(&mut self, review_id: &str, direction: VoteDirection) -> Result<(), ReviewError> {
        let plan = self.board.plan_vote(self.viewer.as_ref(), review_id, direction)?;
        let outcome = perform_vote(&self.store, &plan).await?;
        self.board = self.board.apply_vote(&plan, &outcome);
        Ok(())
    }

    pub async fn report(&mut self, review_id: &str, reason: &str) -> Result<(), ReviewError> {
        let plan = self.board.plan_report(self.viewer.as_ref(), review_id, reason)?;
        let result = perform_report(&self.store, &plan).await;
        self.board = settle_report(&self.board, &plan, &result);
        result
    }

    pub fn open_report(&mut self, review_id: &str) -> Result<(), ReviewError> {
        self.board = self.board.open_report(self.viewer.as_ref(), review_id)?;
        Ok(())
    }

    pub fn set_report_reason(&mut self, reason: &str) {
        self.board = self.board.with_report_reason(reason);
    }

    pub fn close_report(&mut self) {
        self.board = self.board.close_report();
    }

    /// Submit whatever the report dialog holds.
    pub async fn submit_drafted_report(&mut self) -> Result<(), ReviewError> {
        let plan = self.board.plan_drafted_report(self.viewer.as_ref())?;
        let result = perform_report(&self.store, &plan).await;
        self.board = settle_report(&self.board, &plan, &result);
        result
    }

    pub fn board(&self) -> &ReviewBoard {
        &self.board
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn review(id: &str, author: &str, score: i64, vote: Option<VoteDirection>) -> Review {
        Review {
            id: id.into(),
            course_id: "course-1".into(),
            rating: 4,
            comment: "Solid course".into(),
            created_at: Utc::now(),
            author_id: author.into(),
            vote_score: score,
            user_vote: vote,
            report_count: 0,
        }
    }

    fn plan(current: Option<VoteDirection>, direction: VoteDirection) -> VotePlan {
        VotePlan {
            review_id: "r1".into(),
            viewer_id: "alice".into(),
            current,
            direction,
        }
    }

    #[test]
    fn test_score_delta_signs() {
        use VoteDirection::{Down, Up};
        assert_eq!(plan(Some(Up), Up).score_delta(), -1);
        assert_eq!(plan(Some(Down), Down).score_delta(), 1);
        assert_eq!(plan(Some(Up), Down).score_delta(), -2);
        assert_eq!(plan(Some(Down), Up).score_delta(), 2);
        assert_eq!(plan(None, Up).score_delta(), 1);
        assert_eq!(plan(None, Down).score_delta(), -1);
    }

    #[test]
    fn test_same_direction_removes_vote() {
        let p = plan(Some(VoteDirection::Up), VoteDirection::Up);
        assert!(p.is_removal());
        assert_eq!(p.mutation(), VoteMutation::Remove);
        assert_eq!(p.resulting_vote(), None);

        let switch = plan(Some(VoteDirection::Up), VoteDirection::Down);
        assert_eq!(switch.mutation(), VoteMutation::Upsert(VoteDirection::Down));
        assert_eq!(switch.resulting_vote(), Some(VoteDirection::Down));
    }

    #[test]
    fn test_plan_vote_preconditions_in_order() {
        let board = ReviewBoard::new(vec![review("r1", "bob", 0, None)]);
        let bob = Viewer::new("bob");
        let alice = Viewer::new("alice");

        assert!(matches!(
            board.plan_vote(None, "missing", VoteDirection::Up),
            Err(ReviewError::VoteRequiresLogin)
        ));
        assert!(matches!(
            board.plan_vote(Some(&alice), "missing", VoteDirection::Up),
            Err(ReviewError::ReviewNotFound)
        ));
        assert!(matches!(
            board.plan_vote(Some(&bob), "r1", VoteDirection::Up),
            Err(ReviewError::SelfVote)
        ));
        assert!(board.plan_vote(Some(&alice), "r1", VoteDirection::Up).is_ok());
    }

    #[test]
    fn test_fallback_toggle_is_its_own_inverse() {
        let alice = Viewer::new("alice");
        let start = ReviewBoard::new(vec![review("r1", "bob", 3, None)]);

        let first = start.plan_vote(Some(&alice), "r1", VoteDirection::Up).unwrap();
        let board = start.apply_fallback_vote(&first);
        assert_eq!(board.review("r1").unwrap().vote_score, 4);

        let second = board.plan_vote(Some(&alice), "r1", VoteDirection::Up).unwrap();
        let board = board.apply_fallback_vote(&second);
        assert_eq!(board, start);
    }

    #[test]
    fn test_confirmed_vote_overrides_local_numbers() {
        let board = ReviewBoard::new(vec![review("r1", "bob", 0, None), review("r2", "bob", 7, None)]);
        let state = VoteState {
            review_id: "r1".into(),
            vote_score: 12,
            user_vote: Some(VoteDirection::Down),
        };
        let next = board.apply_confirmed_vote(&state);
        assert_eq!(next.review("r1").unwrap().vote_score, 12);
        assert_eq!(next.review("r1").unwrap().user_vote, Some(VoteDirection::Down));
        assert_eq!(next.review("r2").unwrap().vote_score, 7);
        // copy-on-write: the old board is untouched
        assert_eq!(board.review("r1").unwrap().vote_score, 0);
    }

    #[test]
    fn test_plan_report_checks() {
        let board = ReviewBoard::new(vec![review("r1", "bob", 0, None)]);
        let alice = Viewer::new("alice");

        assert!(matches!(board.plan_report(None, "r1", "spam"), Err(ReviewError::ReportRequiresLogin)));
        assert!(matches!(board.plan_report(Some(&alice), "r1", "   "), Err(ReviewError::EmptyReason)));
        assert!(matches!(
            board.plan_report(Some(&Viewer::new("bob")), "r1", "spam"),
            Err(ReviewError::SelfReport)
        ));

        let plan = board.plan_report(Some(&alice), "r1", "  spam link  ").unwrap();
        assert_eq!(plan.reason, "spam link");

        let reported = board.mark_reported("r1");
        assert!(matches!(
            reported.plan_report(Some(&alice), "r1", "spam"),
            Err(ReviewError::AlreadyReported)
        ));
        assert_eq!(reported.review("r1").unwrap().report_count, 0);
    }

    #[test]
    fn test_report_dialog_lifecycle() {
        let alice = Viewer::new("alice");
        let board = ReviewBoard::new(vec![review("r1", "bob", 0, None)]);

        let board = board.open_report(Some(&alice), "r1").unwrap();
        assert_eq!(board.report_draft().review_id.as_deref(), Some("r1"));
        let board = board.with_report_reason("Off-topic");

        let plan = board.plan_drafted_report(Some(&alice)).unwrap();
        let board = board.apply_report(&plan);
        assert!(board.has_reported("r1"));
        assert_eq!(board.review("r1").unwrap().report_count, 1);
        assert_eq!(board.report_draft(), &ReportDraft::default());

        assert!(matches!(board.open_report(Some(&alice), "r1"), Err(ReviewError::AlreadyReported)));
        assert_eq!(board.close_report().report_draft(), &ReportDraft::default());
    }

    #[test]
    fn test_hints() {
        let alice = Viewer::new("alice");
        let r = review("r1", "bob", 0, Some(VoteDirection::Up));
        assert_eq!(vote_hint(&r, None, VoteDirection::Up), "Sign in to vote");
        assert_eq!(vote_hint(&r, Some(&Viewer::new("bob")), VoteDirection::Up), "Cannot vote on your own review");
        assert_eq!(vote_hint(&r, Some(&alice), VoteDirection::Up), "Remove upvote");
        assert_eq!(vote_hint(&r, Some(&alice), VoteDirection::Down), "Downvote");

        let board = ReviewBoard::new(vec![r.clone()]);
        assert_eq!(board.report_hint(&r, None), "Sign in to report");
        assert_eq!(board.report_hint(&r, Some(&alice)), "Report this review");
        assert_eq!(
            board.mark_reported("r1").report_hint(&r, Some(&alice)),
            "You have already reported this review"
        );
    }
}
