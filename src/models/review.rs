// src/models/review.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of a helpfulness vote on a review.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDirection::Up => "up",
            VoteDirection::Down => "down",
        }
    }

    /// Contribution of one vote in this direction to a review's score.
    pub fn weight(&self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(VoteDirection::Up),
            "down" => Ok(VoteDirection::Down),
            other => Err(format!("unknown vote type: {}", other)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub id: String,                  // Unique ID for the review
    pub course_id: String,           // Course the review was written for
    pub rating: u8,                  // 1 to 5 stars
    pub comment: String,             // Free text of the review
    pub created_at: DateTime<Utc>,
    pub author_id: String,           // ID of the user who wrote the review
    pub vote_score: i64,             // Upvotes minus downvotes
    pub user_vote: Option<VoteDirection>, // The current viewer's vote, if any
    pub report_count: u32,
}

impl Review {
    pub fn is_authored_by(&self, viewer: &Viewer) -> bool {
        self.author_id == viewer.id
    }
}

/// Aggregate vote answer for one review, as seen by one viewer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VoteState {
    pub review_id: String,
    pub vote_score: i64,
    pub user_vote: Option<VoteDirection>,
}

/// Moderation status of a report. New reports start out pending.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Dismissed => "dismissed",
        }
    }
}

/// The signed-in user looking at a course page.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub id: String,
}

impl Viewer {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub course_id: String,
    pub rating: u8,
    pub comment: String,
}

/// Average rating and per-star counts for the reviews on one page.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingSummary {
    pub average: f64,
    pub total: usize,
    pub counts: [usize; 5], // index 0 holds one-star reviews
}

impl RatingSummary {
    pub fn from_reviews(reviews: &[Review]) -> Self {
        let mut counts = [0usize; 5];
        let mut sum = 0u64;
        for review in reviews {
            sum += u64::from(review.rating);
            if (1..=5).contains(&review.rating) {
                counts[usize::from(review.rating) - 1] += 1;
            }
        }
        let total = reviews.len();
        Self {
            average: sum as f64 / total.max(1) as f64,
            total,
            counts,
        }
    }

    pub fn count(&self, stars: u8) -> usize {
        match stars {
            1..=5 => self.counts[usize::from(stars) - 1],
            _ => 0,
        }
    }

    /// Share of reviews with exactly `stars`, as a whole percentage.
    pub fn percentage(&self, stars: u8) -> u32 {
        (self.count(stars) as f64 * 100.0 / self.total.max(1) as f64).round() as u32
    }

    /// Stars to fill in the headline row.
    pub fn filled_stars(&self) -> usize {
        self.average.floor() as usize
    }
}
