use thiserror::Error;

/// Failure talking to the review store, either the local database or the HTTP API.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("request failed: {0}")]
    Http(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    Conflict,

    #[error("action not allowed on own review")]
    Forbidden,

    #[error("malformed record: {0}")]
    Malformed(String),
}

#[cfg(feature = "ssr")]
impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Every rejection a viewer can see. The message is what gets shown in the toast.
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("You must be logged in to vote")]
    VoteRequiresLogin,

    #[error("You must be logged in to report")]
    ReportRequiresLogin,

    #[error("You must be logged in to submit a review")]
    ReviewRequiresLogin,

    #[error("Review not found")]
    ReviewNotFound,

    #[error("Cannot vote on your own review")]
    SelfVote,

    #[error("You cannot report your own review")]
    SelfReport,

    #[error("Please provide a reason for reporting")]
    EmptyReason,

    #[error("You have already reported this review")]
    AlreadyReported,

    #[error("Please provide both rating and review")]
    IncompleteReview,

    #[error("You have already reviewed this course")]
    AlreadyReviewed,

    #[error("Failed to save vote")]
    VoteFailed(#[source] StoreError),

    #[error("Failed to submit report")]
    ReportFailed(#[source] StoreError),

    #[error("Error submitting review")]
    ReviewFailed(#[source] StoreError),
}

impl ReviewError {
    /// Remote failures the viewer may retry by hand.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ReviewError::VoteFailed(_) | ReviewError::ReportFailed(_) | ReviewError::ReviewFailed(_)
        )
    }
}
