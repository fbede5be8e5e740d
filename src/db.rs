#[cfg(feature = "ssr")]
mod db_impl {
    use crate::error::StoreError;
    use crate::models::review::{NewReview, Review, ReportStatus, VoteDirection, VoteState};
    use crate::store::{ReviewSubmissionStore, ReviewVoteStore};
    use chrono::{DateTime, Utc};
    use leptos::logging;
    use leptos::logging::log;
    use rusqlite::types::Type;
    use rusqlite::{Connection, Error, OptionalExtension, Row, ToSql};
    use std::collections::HashSet;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    #[cfg(test)]
    mod tests {
        use super::*;

        // Helper function to create test database
        async fn create_test_db() -> Database {
            log!("[TEST] Creating in-memory test database");
            let db = Database::new(":memory:").unwrap();
            db.create_schema().await.unwrap();
            log!("[TEST] Database schema created");
            db
        }

        async fn seed_review(db: &Database, author: &str) -> Review {
            let review = NewReview {
                course_id: "rust-101".into(),
                rating: 5,
                comment: "Great pacing".into(),
            };
            db.insert_review(author, &review).await.unwrap()
        }

        #[tokio::test]
        async fn test_schema_creation() {
            log!("[TEST] Starting test_schema_creation");
            let db = create_test_db().await;

            let conn = db.conn.lock().await;
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type='table'")
                .unwrap();
            let tables: Vec<String> = stmt
                .query_map([], |row| row.get(0))
                .unwrap()
                .collect::<Result<_, _>>()
                .unwrap();

            assert!(tables.contains(&"course_reviews".to_string()));
            assert!(tables.contains(&"review_votes".to_string()));
            assert!(tables.contains(&"review_reports".to_string()));
        }

        #[tokio::test]
        async fn test_vote_lifecycle() {
            log!("[TEST] Starting test_vote_lifecycle");
            let db = create_test_db().await;
            let review = seed_review(&db, "author").await;
            let ids = vec![review.id.clone()];

            log!("[TEST] Testing first vote");
            db.upsert_vote(&review.id, "alice", VoteDirection::Up).await.unwrap();
            db.upsert_vote(&review.id, "bob", VoteDirection::Up).await.unwrap();
            let states = db.batch_get_vote_state(&ids, Some("alice")).await.unwrap();
            assert_eq!(states[0].vote_score, 2);
            assert_eq!(states[0].user_vote, Some(VoteDirection::Up));
            log!("[TEST] First vote - PASSED");

            log!("[TEST] Testing vote switch");
            db.upsert_vote(&review.id, "alice", VoteDirection::Down).await.unwrap();
            let states = db.batch_get_vote_state(&ids, Some("alice")).await.unwrap();
            assert_eq!(states[0].vote_score, 0);
            assert_eq!(states[0].user_vote, Some(VoteDirection::Down));
            log!("[TEST] Vote switch - PASSED");

            log!("[TEST] Testing vote removal");
            db.delete_vote(&review.id, "alice").await.unwrap();
            let states = db.batch_get_vote_state(&ids, Some("alice")).await.unwrap();
            assert_eq!(states[0].vote_score, 1);
            assert_eq!(states[0].user_vote, None);
            log!("[TEST] Vote removal - PASSED");

            // anonymous lookups still see the score
            let states = db.batch_get_vote_state(&ids, None).await.unwrap();
            assert_eq!(states[0].vote_score, 1);
            assert_eq!(states[0].user_vote, None);
        }

        #[tokio::test]
        async fn test_self_vote_rejected() {
            let db = create_test_db().await;
            let review = seed_review(&db, "author").await;
            let result = db.upsert_vote(&review.id, "author", VoteDirection::Up).await;
            assert!(matches!(result, Err(StoreError::Forbidden)));

            let result = db.upsert_vote("missing", "alice", VoteDirection::Up).await;
            assert!(matches!(result, Err(StoreError::NotFound)));
        }

        #[tokio::test]
        async fn test_batch_vote_state_covers_every_id() {
            let db = create_test_db().await;
            let first = seed_review(&db, "author").await;
            let second = db
                .insert_review(
                    "author",
                    &NewReview {
                        course_id: "go-101".into(),
                        rating: 3,
                        comment: "Okay".into(),
                    },
                )
                .await
                .unwrap();
            db.upsert_vote(&second.id, "alice", VoteDirection::Down).await.unwrap();

            let ids = vec![first.id.clone(), second.id.clone()];
            let states = db.batch_get_vote_state(&ids, Some("alice")).await.unwrap();
            assert_eq!(states.len(), 2);
            let second_state = states.iter().find(|s| s.review_id == second.id).unwrap();
            assert_eq!(second_state.vote_score, -1);

            assert!(db.batch_get_vote_state(&[], Some("alice")).await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_report_rules() {
            log!("[TEST] Starting test_report_rules");
            let db = create_test_db().await;
            let review = seed_review(&db, "author").await;

            assert!(!db.find_report(&review.id, "alice").await.unwrap());
            db.insert_report(&review.id, "alice", "spam").await.unwrap();
            assert!(db.find_report(&review.id, "alice").await.unwrap());

            log!("[TEST] Testing duplicate report");
            let duplicate = db.insert_report(&review.id, "alice", "spam again").await;
            assert!(matches!(duplicate, Err(StoreError::Conflict)));

            log!("[TEST] Testing self report");
            let own = db.insert_report(&review.id, "author", "oops").await;
            assert!(matches!(own, Err(StoreError::Forbidden)));

            let reported = db
                .reported_review_ids(&[review.id.clone(), "other".into()], "alice")
                .await
                .unwrap();
            assert_eq!(reported.len(), 1);
            assert!(reported.contains(&review.id));

            let listed = db.reviews_for_course("rust-101").await.unwrap();
            assert_eq!(listed[0].report_count, 1);
            assert_eq!(db.report_status(&review.id, "alice").await.unwrap(), Some(ReportStatus::Pending));
            log!("[TEST] test_report_rules completed successfully");
        }

        #[tokio::test]
        async fn test_one_review_per_course() {
            let db = create_test_db().await;
            let saved = seed_review(&db, "alice").await;
            assert_eq!(saved.vote_score, 0);

            let found = db.find_review_by_author("rust-101", "alice").await.unwrap();
            assert_eq!(found.map(|r| r.id), Some(saved.id));

            let again = db
                .insert_review(
                    "alice",
                    &NewReview {
                        course_id: "rust-101".into(),
                        rating: 1,
                        comment: "Changed my mind".into(),
                    },
                )
                .await;
            assert!(matches!(again, Err(StoreError::Conflict)));
        }
    }

    // sqlite-backed store for reviews, votes and reports
    #[derive(Debug)]
    pub struct Database {
        conn: Arc<Mutex<Connection>>,
    }

    const REVIEW_COLUMNS: &str = "r.id, r.course_id, r.rating, r.comment, r.created_at, r.user_id,
        (SELECT COALESCE(SUM(CASE v.vote_type WHEN 'up' THEN 1 ELSE -1 END), 0)
            FROM review_votes v WHERE v.review_id = r.id),
        (SELECT COUNT(*) FROM review_reports rr WHERE rr.review_id = r.id)";

    fn review_from_row(row: &Row<'_>) -> Result<Review, Error> {
        let created_at: String = row.get(4)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?
            .with_timezone(&Utc);
        Ok(Review {
            id: row.get(0)?,
            course_id: row.get(1)?,
            rating: row.get(2)?,
            comment: row.get(3)?,
            created_at,
            author_id: row.get(5)?,
            vote_score: row.get(6)?,
            user_vote: None,
            report_count: row.get(7)?,
        })
    }

    fn parse_vote(raw: Option<String>) -> Option<VoteDirection> {
        raw.and_then(|s| s.parse().ok())
    }

    fn placeholders(start: usize, count: usize) -> String {
        (start..start + count)
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ")
    }

    // Author of a review, NotFound if it does not exist
    fn review_author(conn: &Connection, review_id: &str) -> Result<String, StoreError> {
        conn.query_row(
            "SELECT user_id FROM course_reviews WHERE id = ?",
            [review_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(StoreError::NotFound)
    }

    impl Database {
        // Create a new database connection
        pub fn new(db_path: &str) -> Result<Self, Error> {
            let conn = Connection::open(db_path)?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            logging::log!("Database connection established at: {}", db_path);
            Ok(Database {
                conn: Arc::new(Mutex::new(conn)),
            })
        }

        // Create the database schema
        pub async fn create_schema(&self) -> Result<(), Error> {
            let conn = self.conn.lock().await;

            // 1. Reviews table, one review per user per course
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS course_reviews (
                    id TEXT PRIMARY KEY,
                    course_id TEXT NOT NULL,
                    user_id TEXT NOT NULL,
                    rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
                    comment TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    UNIQUE (course_id, user_id)
                );",
            )
            .map_err(|e| {
                logging::error!("Failed creating course_reviews table: {}", e);
                e
            })?;

            // 2. Votes, at most one per voter per review
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS review_votes (
                    review_id TEXT NOT NULL,
                    user_id TEXT NOT NULL,
                    vote_type TEXT NOT NULL CHECK (vote_type IN ('up', 'down')),
                    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                    PRIMARY KEY (review_id, user_id),
                    FOREIGN KEY (review_id) REFERENCES course_reviews(id) ON DELETE CASCADE
                );",
            )
            .map_err(|e| {
                logging::error!("Failed creating review_votes table: {}", e);
                e
            })?;

            // 3. Reports, at most one per reporter per review
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS review_reports (
                    id TEXT PRIMARY KEY,
                    review_id TEXT NOT NULL,
                    user_id TEXT NOT NULL,
                    reason TEXT NOT NULL CHECK (length(trim(reason)) > 0),
                    status TEXT NOT NULL DEFAULT 'pending'
                        CHECK (status IN ('pending', 'resolved', 'dismissed')),
                    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                    UNIQUE (review_id, user_id),
                    FOREIGN KEY (review_id) REFERENCES course_reviews(id) ON DELETE CASCADE
                );",
            )
            .map_err(|e| {
                logging::error!("Failed creating review_reports table: {}", e);
                e
            })?;
            Ok(())
        }

        pub async fn report_status(
            &self,
            review_id: &str,
            viewer_id: &str,
        ) -> Result<Option<ReportStatus>, StoreError> {
            let conn = self.conn.lock().await;
            let status: Option<String> = conn
                .query_row(
                    "SELECT status FROM review_reports WHERE review_id = ? AND user_id = ?",
                    [review_id, viewer_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(status.map(|s| match s.as_str() {
                "resolved" => ReportStatus::Resolved,
                "dismissed" => ReportStatus::Dismissed,
                _ => ReportStatus::Pending,
            }))
        }
    }

    impl ReviewVoteStore for Database {
        async fn batch_get_vote_state(
            &self,
            review_ids: &[String],
            viewer_id: Option<&str>,
        ) -> Result<Vec<VoteState>, StoreError> {
            if review_ids.is_empty() {
                return Ok(Vec::new());
            }
            let conn = self.conn.lock().await;
            let query = format!(
                "SELECT r.id,
                    COALESCE(SUM(CASE v.vote_type WHEN 'up' THEN 1 WHEN 'down' THEN -1 ELSE 0 END), 0),
                    MAX(CASE WHEN v.user_id = ?1 THEN v.vote_type END)
                FROM course_reviews r
                LEFT JOIN review_votes v ON v.review_id = r.id
                WHERE r.id IN ({})
                GROUP BY r.id",
                placeholders(2, review_ids.len())
            );
            let mut params: Vec<&dyn ToSql> = vec![&viewer_id];
            params.extend(review_ids.iter().map(|id| id as &dyn ToSql));

            let mut stmt = conn.prepare(&query)?;
            let rows = stmt.query_map(params.as_slice(), |row| {
                Ok(VoteState {
                    review_id: row.get(0)?,
                    vote_score: row.get(1)?,
                    user_vote: parse_vote(row.get(2)?),
                })
            })?;
            let states = rows.collect::<Result<Vec<_>, _>>()?;
            log!("[DB] Vote state for {} reviews", states.len());
            Ok(states)
        }

        async fn upsert_vote(
            &self,
            review_id: &str,
            viewer_id: &str,
            direction: VoteDirection,
        ) -> Result<(), StoreError> {
            let mut conn = self.conn.lock().await;
            let tx = conn.transaction()?;
            if review_author(&tx, review_id)? == viewer_id {
                return Err(StoreError::Forbidden);
            }
            tx.execute(
                "INSERT INTO review_votes (review_id, user_id, vote_type)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(review_id, user_id) DO UPDATE SET
                    vote_type = excluded.vote_type",
                [review_id, viewer_id, direction.as_str()],
            )?;
            tx.commit()?;
            log!("[DB] {} voted {} on review {}", viewer_id, direction, review_id);
            Ok(())
        }

        async fn delete_vote(&self, review_id: &str, viewer_id: &str) -> Result<(), StoreError> {
            let conn = self.conn.lock().await;
            conn.execute(
                "DELETE FROM review_votes WHERE review_id = ? AND user_id = ?",
                [review_id, viewer_id],
            )?;
            log!("[DB] {} removed vote on review {}", viewer_id, review_id);
            Ok(())
        }

        async fn reported_review_ids(
            &self,
            review_ids: &[String],
            viewer_id: &str,
        ) -> Result<HashSet<String>, StoreError> {
            if review_ids.is_empty() {
                return Ok(HashSet::new());
            }
            let conn = self.conn.lock().await;
            let query = format!(
                "SELECT review_id FROM review_reports WHERE user_id = ?1 AND review_id IN ({})",
                placeholders(2, review_ids.len())
            );
            let mut params: Vec<&dyn ToSql> = vec![&viewer_id];
            params.extend(review_ids.iter().map(|id| id as &dyn ToSql));

            let mut stmt = conn.prepare(&query)?;
            let rows = stmt.query_map(params.as_slice(), |row| row.get::<_, String>(0))?;
            Ok(rows.collect::<Result<HashSet<_>, _>>()?)
        }

        async fn find_report(&self, review_id: &str, viewer_id: &str) -> Result<bool, StoreError> {
            let conn = self.conn.lock().await;
            let found = conn
                .query_row(
                    "SELECT id FROM review_reports WHERE review_id = ? AND user_id = ?",
                    [review_id, viewer_id],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(found.is_some())
        }

        async fn insert_report(
            &self,
            review_id: &str,
            viewer_id: &str,
            reason: &str,
        ) -> Result<(), StoreError> {
            let mut conn = self.conn.lock().await;
            let tx = conn.transaction()?;
            if review_author(&tx, review_id)? == viewer_id {
                return Err(StoreError::Forbidden);
            }
            let existing = tx
                .query_row(
                    "SELECT id FROM review_reports WHERE review_id = ? AND user_id = ?",
                    [review_id, viewer_id],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            if existing.is_some() {
                log!("[DB] Duplicate report from {} on review {}", viewer_id, review_id);
                return Err(StoreError::Conflict);
            }

            let id = Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO review_reports (id, review_id, user_id, reason, status)
                VALUES (?1, ?2, ?3, ?4, ?5)",
                [
                    id.as_str(),
                    review_id,
                    viewer_id,
                    reason.trim(),
                    ReportStatus::Pending.as_str(),
                ],
            )?;
            tx.commit()?;
            log!("[DB] Report {} filed on review {}", id, review_id);
            Ok(())
        }
    }

    impl ReviewSubmissionStore for Database {
        async fn reviews_for_course(&self, course_id: &str) -> Result<Vec<Review>, StoreError> {
            let conn = self.conn.lock().await;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM course_reviews r WHERE r.course_id = ? ORDER BY r.created_at DESC",
                REVIEW_COLUMNS
            ))?;
            let rows = stmt.query_map([course_id], review_from_row)?;
            let reviews = rows.collect::<Result<Vec<_>, _>>()?;
            log!("Fetched {} reviews for course {}", reviews.len(), course_id);
            Ok(reviews)
        }

        async fn find_review_by_author(
            &self,
            course_id: &str,
            viewer_id: &str,
        ) -> Result<Option<Review>, StoreError> {
            let conn = self.conn.lock().await;
            let review = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM course_reviews r WHERE r.course_id = ? AND r.user_id = ?",
                        REVIEW_COLUMNS
                    ),
                    [course_id, viewer_id],
                    review_from_row,
                )
                .optional()?;
            Ok(review)
        }

        async fn insert_review(&self, viewer_id: &str, review: &NewReview) -> Result<Review, StoreError> {
            let mut conn = self.conn.lock().await;
            let tx = conn.transaction()?;
            let existing = tx
                .query_row(
                    "SELECT id FROM course_reviews WHERE course_id = ? AND user_id = ?",
                    [review.course_id.as_str(), viewer_id],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            if existing.is_some() {
                return Err(StoreError::Conflict);
            }

            let saved = Review {
                id: Uuid::new_v4().to_string(),
                course_id: review.course_id.clone(),
                rating: review.rating,
                comment: review.comment.trim().to_string(),
                created_at: Utc::now(),
                author_id: viewer_id.to_string(),
                vote_score: 0,
                user_vote: None,
                report_count: 0,
            };
            tx.execute(
                "INSERT INTO course_reviews (id, course_id, user_id, rating, comment, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    &saved.id,
                    &saved.course_id,
                    &saved.author_id,
                    saved.rating,
                    &saved.comment,
                    saved.created_at.to_rfc3339(),
                ],
            )?;
            tx.commit()?;
            log!("[DB] Review {} saved for course {}", saved.id, saved.course_id);
            Ok(saved)
        }
    }
}

#[cfg(feature = "ssr")]
pub use db_impl::Database;
