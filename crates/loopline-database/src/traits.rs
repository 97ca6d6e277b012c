//! Store traits implemented by the Postgres repositories.
//!
//! Services and job handlers depend on these instead of concrete
//! repositories so tests can substitute in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use loopline_core::result::AppResult;
use loopline_entity::connection::{Connection, ConnectionStatus, ConnectionWithUsers};
use loopline_entity::job::{CreateJob, Job};
use loopline_entity::message::{CreateMessage, Message, MessageWithSender, UnseenCount};
use loopline_entity::story::{CreateStory, Story, StoryWithAuthor};
use loopline_entity::user::{CreateUser, User, UserSummary};

/// User lookup and creation.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by primary key.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find a user by username (case-insensitive).
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Create a new user. Duplicate username is a `Conflict`.
    async fn create(&self, data: &CreateUser) -> AppResult<User>;

    /// Prefix search over usernames and display names.
    async fn search(&self, query: &str, limit: i64) -> AppResult<Vec<UserSummary>>;
}

/// Direct message persistence and queries.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a new message.
    async fn create(&self, data: &CreateMessage) -> AppResult<Message>;

    /// Full conversation between two users, oldest first, with sender
    /// fields populated.
    async fn conversation(&self, user_a: Uuid, user_b: Uuid)
        -> AppResult<Vec<MessageWithSender>>;

    /// Mark every message from `from_user_id` to `to_user_id` as seen.
    /// Returns the number of rows updated.
    async fn mark_seen(&self, from_user_id: Uuid, to_user_id: Uuid) -> AppResult<u64>;

    /// The most recent message per conversation partner of `user_id`,
    /// newest first.
    async fn recent_per_partner(&self, user_id: Uuid) -> AppResult<Vec<MessageWithSender>>;

    /// Unseen message counts grouped by recipient, for the daily digest.
    async fn unseen_counts(&self) -> AppResult<Vec<UnseenCount>>;
}

/// Connection request persistence and transitions.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Create a pending connection request. A duplicate (from, to) pair
    /// is a `Conflict`.
    async fn create(&self, from_user_id: Uuid, to_user_id: Uuid) -> AppResult<Connection>;

    /// Find a connection by primary key.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Connection>>;

    /// Find a connection with both participants loaded.
    async fn find_with_users(&self, id: Uuid) -> AppResult<Option<ConnectionWithUsers>>;

    /// Transition a pending connection to the given status. Returns
    /// `None` when the connection is absent or already decided.
    async fn decide(&self, id: Uuid, status: ConnectionStatus)
        -> AppResult<Option<Connection>>;

    /// All connections involving the user, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Connection>>;
}

/// Story persistence, views, and likes.
#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Persist a new story.
    async fn create(&self, data: &CreateStory) -> AppResult<Story>;

    /// Find a story by primary key.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Story>>;

    /// Delete a story. Returns `false` when it was already gone.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Recent stories with author fields and counters, newest first.
    async fn feed(&self, viewer_id: Uuid, limit: i64) -> AppResult<Vec<StoryWithAuthor>>;

    /// Record a view. Idempotent per (story, user); returns `true` when
    /// a new view row was inserted.
    async fn record_view(&self, story_id: Uuid, user_id: Uuid) -> AppResult<bool>;

    /// Toggle a like. Returns `true` when the story is now liked by the
    /// user.
    async fn toggle_like(&self, story_id: Uuid, user_id: Uuid) -> AppResult<bool>;

    /// Viewer summaries for a story, most recent first.
    async fn viewers(&self, story_id: Uuid) -> AppResult<Vec<UserSummary>>;
}

/// Durable job queue storage.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Enqueue a new job.
    async fn enqueue(&self, data: &CreateJob) -> AppResult<Job>;

    /// Find a job by primary key.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>>;

    /// Claim the next due pending job from a queue. Increments the
    /// attempt counter and marks the job running.
    async fn claim_due(&self, queue: &str, worker_id: &str) -> AppResult<Option<Job>>;

    /// Mark a job completed with an optional result document.
    async fn complete(&self, id: Uuid, result: Option<&serde_json::Value>) -> AppResult<()>;

    /// Mark a job failed terminally.
    async fn fail(&self, id: Uuid, error_message: &str) -> AppResult<()>;

    /// Put a job back to pending for a later attempt.
    async fn reschedule(
        &self,
        id: Uuid,
        run_at: DateTime<Utc>,
        error_message: &str,
    ) -> AppResult<()>;

    /// Recover jobs stranded in `running` by a crashed worker: rows
    /// with `started_at` at or before `cutoff` go back to pending while
    /// their attempt budget lasts, and are failed once it is spent.
    /// Returns how many rows were touched.
    async fn reclaim_stale(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;

    /// Jobs of `kind` created at or after `since`, any status.
    async fn recent_of_kind(&self, kind: &str, since: DateTime<Utc>) -> AppResult<Vec<Job>>;
}
