//! Community gallery of submitted favicons.
//!
//! Submissions are persisted through a [`SubmissionStore`]. The bundled
//! [`SqliteStore`] keeps them in a single SQLite table. [`GalleryCard`] is
//! the client-side view of one submission with optimistic counters.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PersistenceError;

#[cfg(feature = "gallery")]
mod schema;
#[cfg(feature = "gallery")]
mod store;

#[cfg(feature = "gallery")]
pub use store::SqliteStore;

// ============================================================================
// Data Model
// ============================================================================

/// A stored gallery entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: i64,
    pub website_url: String,
    pub email: String,
    /// RFC 3339 timestamp.
    pub created_at: String,
    pub loves_count: i64,
    pub clicks_count: i64,
    /// The favicon as a `data:` URL.
    pub favicon_image: Option<String>,
}

/// The fields a visitor submits.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmission {
    #[serde(default)]
    pub website_url: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub favicon_image: Option<String>,
}

impl NewSubmission {
    pub fn new(website_url: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            website_url: website_url.into(),
            email: email.into(),
            favicon_image: None,
        }
    }

    pub fn with_image(mut self, data_url: impl Into<String>) -> Self {
        self.favicon_image = Some(data_url.into());
        self
    }

    /// Both the website URL and the email are required.
    pub fn validate(&self) -> Result<(), PersistenceError> {
        if self.website_url.trim().is_empty() {
            return Err(PersistenceError::MissingField("websiteUrl"));
        }
        if self.email.trim().is_empty() {
            return Err(PersistenceError::MissingField("email"));
        }
        Ok(())
    }
}

/// A per-submission counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Counter {
    Loves,
    Clicks,
}

impl Counter {
    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::Loves => "loves_count",
            Self::Clicks => "clicks_count",
        }
    }
}

/// Persistence contract for gallery submissions.
pub trait SubmissionStore {
    /// All submissions, newest first.
    fn list(&self) -> Result<Vec<Submission>, PersistenceError>;

    /// Stores a new submission with zeroed counters.
    fn insert(&self, submission: &NewSubmission) -> Result<Submission, PersistenceError>;

    /// Atomically adds one to a counter and returns the new value.
    ///
    /// Fails with [`PersistenceError::NotFound`] if `id` does not exist.
    fn increment(&self, id: i64, counter: Counter) -> Result<i64, PersistenceError>;
}

/// Strips the scheme, a leading `www.` and a trailing slash.
pub fn display_url(url: &str) -> &str {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .map(|rest| rest.strip_prefix("www.").unwrap_or(rest))
        .unwrap_or(url);
    rest.strip_suffix('/').unwrap_or(rest)
}

// ============================================================================
// GalleryCard
// ============================================================================

/// One submission as shown to a visitor.
///
/// Loves and clicks count at most once per card. The counter is bumped
/// before the store answers; a failed love is rolled back, a failed click is
/// kept.
#[derive(Debug, Clone)]
pub struct GalleryCard {
    submission: Submission,
    loves: i64,
    clicks: i64,
    loved: bool,
    clicked: bool,
    love_pending: bool,
}

impl GalleryCard {
    pub fn new(submission: Submission) -> Self {
        Self {
            loves: submission.loves_count,
            clicks: submission.clicks_count,
            submission,
            loved: false,
            clicked: false,
            love_pending: false,
        }
    }

    pub fn submission(&self) -> &Submission {
        &self.submission
    }

    pub fn loves(&self) -> i64 {
        self.loves
    }

    pub fn clicks(&self) -> i64 {
        self.clicks
    }

    pub fn is_loved(&self) -> bool {
        self.loved
    }

    pub fn display_url(&self) -> &str {
        display_url(&self.submission.website_url)
    }

    /// Applies the optimistic love. Returns false if the card was already
    /// loved or a love is still in flight.
    pub fn begin_love(&mut self) -> bool {
        if self.loved || self.love_pending {
            return false;
        }
        self.loves += 1;
        self.loved = true;
        self.love_pending = true;
        true
    }

    /// Settles a love started with [`begin_love`](Self::begin_love).
    pub fn settle_love(&mut self, result: &Result<i64, PersistenceError>) {
        if !self.love_pending {
            return;
        }
        self.love_pending = false;
        match result {
            Ok(count) => self.loves = *count,
            Err(error) => {
                warn!(id = self.submission.id, %error, "love failed, reverting");
                self.loves -= 1;
                self.loved = false;
            }
        }
    }

    /// Loves the submission through `store`.
    pub fn love(&mut self, store: &dyn SubmissionStore) -> Result<i64, PersistenceError> {
        if !self.begin_love() {
            return Ok(self.loves);
        }
        let result = store.increment(self.submission.id, Counter::Loves);
        self.settle_love(&result);
        result
    }

    /// Records a visit. Only the first call per card reaches the store.
    pub fn click(&mut self, store: &dyn SubmissionStore) -> Result<i64, PersistenceError> {
        if self.clicked {
            return Ok(self.clicks);
        }
        self.clicked = true;
        self.clicks += 1;

        let result = store.increment(self.submission.id, Counter::Clicks);
        if let Err(error) = &result {
            warn!(id = self.submission.id, %error, "click tracking failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn submission(id: i64) -> Submission {
        Submission {
            id,
            website_url: "https://www.example.com/".into(),
            email: "owner@example.com".into(),
            created_at: "2026-01-01T00:00:00.000Z".into(),
            loves_count: 4,
            clicks_count: 10,
            favicon_image: None,
        }
    }

    /// Answers increments from a fixed script.
    struct ScriptedStore {
        answers: RefCell<Vec<Result<i64, PersistenceError>>>,
    }

    impl ScriptedStore {
        fn new(answers: Vec<Result<i64, PersistenceError>>) -> Self {
            Self {
                answers: RefCell::new(answers),
            }
        }
    }

    impl SubmissionStore for ScriptedStore {
        fn list(&self) -> Result<Vec<Submission>, PersistenceError> {
            Ok(Vec::new())
        }

        fn insert(&self, _: &NewSubmission) -> Result<Submission, PersistenceError> {
            Err(PersistenceError::Database("read only".into()))
        }

        fn increment(&self, _: i64, _: Counter) -> Result<i64, PersistenceError> {
            self.answers.borrow_mut().remove(0)
        }
    }

    #[test]
    fn display_url_strips_decoration() {
        assert_eq!(display_url("https://www.example.com/"), "example.com");
        assert_eq!(display_url("http://blog.example.com/path/"), "blog.example.com/path");
        assert_eq!(display_url("example.org"), "example.org");
        assert_eq!(display_url("ftp://www.example.org"), "ftp://www.example.org");
    }

    #[test]
    fn validation_requires_url_and_email() {
        assert!(NewSubmission::new("https://a.dev", "a@a.dev").validate().is_ok());
        assert!(matches!(
            NewSubmission::new(" ", "a@a.dev").validate(),
            Err(PersistenceError::MissingField("websiteUrl"))
        ));
        assert!(matches!(
            NewSubmission::new("https://a.dev", "").validate(),
            Err(PersistenceError::MissingField("email"))
        ));
    }

    #[test]
    fn love_takes_server_count() {
        let store = ScriptedStore::new(vec![Ok(9)]);
        let mut card = GalleryCard::new(submission(1));

        assert_eq!(card.love(&store).unwrap(), 9);
        assert_eq!(card.loves(), 9);
        assert!(card.is_loved());

        // A second love is ignored and does not reach the store.
        assert_eq!(card.love(&store).unwrap(), 9);
    }

    #[test]
    fn failed_love_is_reverted() {
        let store = ScriptedStore::new(vec![Err(PersistenceError::NotFound { id: 1 })]);
        let mut card = GalleryCard::new(submission(1));

        let err = card.love(&store).unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound { id: 1 }));
        assert_eq!(card.loves(), 4);
        assert!(!card.is_loved());
    }

    #[test]
    fn optimistic_love_is_visible_before_settling() {
        let mut card = GalleryCard::new(submission(2));
        assert!(card.begin_love());
        assert_eq!(card.loves(), 5);
        assert!(!card.begin_love());

        card.settle_love(&Err(PersistenceError::Database("offline".into())));
        assert_eq!(card.loves(), 4);
        assert!(card.begin_love());
    }

    #[test]
    fn clicks_count_once_and_are_not_reverted() {
        let store = ScriptedStore::new(vec![Err(PersistenceError::Database("offline".into()))]);
        let mut card = GalleryCard::new(submission(3));

        assert!(card.click(&store).is_err());
        assert_eq!(card.clicks(), 11);
        assert_eq!(card.click(&store).unwrap(), 11);
    }

    #[test]
    fn submission_json_is_camel_case() {
        let json = serde_json::to_string(&submission(5)).unwrap();
        assert!(json.contains("\"websiteUrl\""));
        assert!(json.contains("\"lovesCount\":4"));
        assert!(json.contains("\"faviconImage\":null"));
    }
}
