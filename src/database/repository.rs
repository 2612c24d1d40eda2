use async_trait::async_trait;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{
    Lesson, LessonChanges, LessonTracking, NewLesson, NewSerie, NewUser, Role, RoleChange, Serie,
    SerieChanges, User, UserChanges,
};

/// Storage for user profiles.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find(&self, id: &str) -> Result<Option<User>, DatabaseError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    async fn insert(&self, user: NewUser) -> Result<User, DatabaseError>;

    /// Insert, or refresh an existing profile. Empty identity fields and
    /// absent optional fields keep their stored values.
    async fn upsert(&self, user: NewUser) -> Result<User, DatabaseError>;

    async fn update(&self, id: &str, changes: UserChanges) -> Result<Option<User>, DatabaseError>;

    async fn set_role(&self, email: &str, role: Role) -> Result<RoleChange, DatabaseError>;
}

/// Storage for series and their subscriptions.
#[async_trait]
pub trait SerieRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Serie>, DatabaseError>;

    /// Newest first.
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Serie>, DatabaseError>;

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Serie>, DatabaseError>;

    async fn list_subscribed(&self, user_id: &str) -> Result<Vec<Serie>, DatabaseError>;

    /// Published series whose title contains `keyword`, ignoring case.
    async fn search_published(&self, keyword: &str) -> Result<Vec<Serie>, DatabaseError>;

    async fn insert(&self, serie: NewSerie) -> Result<Serie, DatabaseError>;

    async fn update(&self, id: Uuid, changes: SerieChanges)
        -> Result<Option<Serie>, DatabaseError>;

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError>;

    /// Returns false when the user was already subscribed.
    async fn subscribe(&self, id: Uuid, user_id: &str) -> Result<bool, DatabaseError>;

    /// Returns false when the user was not subscribed.
    async fn unsubscribe(&self, id: Uuid, user_id: &str) -> Result<bool, DatabaseError>;

    /// Non-empty email addresses of every subscriber.
    async fn subscriber_emails(&self, id: Uuid) -> Result<Vec<String>, DatabaseError>;
}

/// Storage for lessons, always addressed through their series.
#[async_trait]
pub trait LessonRepository: Send + Sync {
    async fn find(&self, serie_id: Uuid, lesson_id: Uuid) -> Result<Option<Lesson>, DatabaseError>;

    /// Creation order.
    async fn list_by_serie(&self, serie_id: Uuid) -> Result<Vec<Lesson>, DatabaseError>;

    async fn insert(&self, lesson: NewLesson) -> Result<Lesson, DatabaseError>;

    async fn update(
        &self,
        serie_id: Uuid,
        lesson_id: Uuid,
        changes: LessonChanges,
    ) -> Result<Option<Lesson>, DatabaseError>;

    async fn delete(&self, serie_id: Uuid, lesson_id: Uuid) -> Result<bool, DatabaseError>;
}

/// Storage for per-user tab tracking records.
#[async_trait]
pub trait TrackingRepository: Send + Sync {
    async fn find(&self, user_id: &str) -> Result<Option<LessonTracking>, DatabaseError>;

    async fn save(&self, tracking: &LessonTracking) -> Result<(), DatabaseError>;

    async fn delete(&self, user_id: &str) -> Result<(), DatabaseError>;
}
