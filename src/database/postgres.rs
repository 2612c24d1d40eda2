use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{
    ActiveLesson, Lesson, LessonChanges, LessonTracking, NewLesson, NewSerie, NewUser, Role,
    RoleChange, Serie, SerieChanges, User, UserChanges,
};
use super::repository::{LessonRepository, SerieRepository, TrackingRepository, UserRepository};

const USER_SELECT: &str = r#"
    SELECT u.id, u.name, u.email, u.username, u.role, u.gender, u.birthdate, u.avatar,
           ARRAY(
               SELECT sub.serie_id::text FROM subscriptions sub
               WHERE sub.user_id = u.id ORDER BY sub.created_at
           ) AS serie_subscribe,
           u.created_at, u.updated_at
    FROM users u
"#;

const SERIE_SELECT: &str = r#"
    SELECT s.id, s.title, s.description, s.is_publish, s.thumbnail,
           ARRAY(
               SELECT l.id FROM lessons l
               WHERE l.serie_id = s.id ORDER BY l.created_at, l.id
           ) AS lessons,
           s.subscriber_count, s.owner_id, s.topic, s.created_at, s.updated_at
    FROM series s
"#;

const LESSON_SELECT: &str = r#"
    SELECT id, serie_id, title, content, video, documents, description, transcript,
           transcript_status, summary, timeline, created_at, updated_at
    FROM lessons
"#;

/// Postgres-backed implementation of every repository.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `%keyword%` with LIKE metacharacters escaped.
fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find(&self, id: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("{} WHERE u.id = $1", USER_SELECT);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("{} WHERE lower(u.email) = lower($1) LIMIT 1", USER_SELECT);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<User, DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, username, gender, birthdate, avatar)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.gender)
        .bind(&user.birthdate)
        .bind(&user.avatar)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_insert(e, format!("user {}", user.id)))?;

        UserRepository::find(self, &user.id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", user.id)))
    }

    async fn upsert(&self, user: NewUser) -> Result<User, DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, username, gender, birthdate, avatar)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                name = COALESCE(NULLIF(EXCLUDED.name, ''), users.name),
                email = COALESCE(NULLIF(EXCLUDED.email, ''), users.email),
                username = COALESCE(NULLIF(EXCLUDED.username, ''), users.username),
                gender = COALESCE(EXCLUDED.gender, users.gender),
                birthdate = COALESCE(EXCLUDED.birthdate, users.birthdate),
                avatar = COALESCE(EXCLUDED.avatar, users.avatar),
                updated_at = now()
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.gender)
        .bind(&user.birthdate)
        .bind(&user.avatar)
        .execute(&self.pool)
        .await?;

        UserRepository::find(self, &user.id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", user.id)))
    }

    async fn update(&self, id: &str, changes: UserChanges) -> Result<Option<User>, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                username = COALESCE($4, username),
                gender = COALESCE($5, gender),
                birthdate = COALESCE($6, birthdate),
                avatar = COALESCE($7, avatar),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(&changes.username)
        .bind(&changes.gender)
        .bind(&changes.birthdate)
        .bind(&changes.avatar)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        UserRepository::find(self, id).await
    }

    async fn set_role(&self, email: &str, role: Role) -> Result<RoleChange, DatabaseError> {
        let Some(user) = self.find_by_email(email).await? else {
            return Ok(RoleChange::NotFound);
        };
        if user.role() == role {
            return Ok(RoleChange::Unchanged);
        }

        sqlx::query("UPDATE users SET role = $2, updated_at = now() WHERE id = $1")
            .bind(&user.id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;
        Ok(RoleChange::Updated)
    }
}

#[async_trait]
impl SerieRepository for PgStore {
    async fn find(&self, id: Uuid) -> Result<Option<Serie>, DatabaseError> {
        let sql = format!("{} WHERE s.id = $1", SERIE_SELECT);
        let serie = sqlx::query_as::<_, Serie>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(serie)
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Serie>, DatabaseError> {
        let sql = format!(
            "{} ORDER BY s.created_at DESC, s.id OFFSET $1 LIMIT $2",
            SERIE_SELECT
        );
        let series = sqlx::query_as::<_, Serie>(&sql)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(series)
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Serie>, DatabaseError> {
        let sql = format!(
            "{} WHERE s.owner_id = $1 ORDER BY s.created_at DESC",
            SERIE_SELECT
        );
        let series = sqlx::query_as::<_, Serie>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(series)
    }

    async fn list_subscribed(&self, user_id: &str) -> Result<Vec<Serie>, DatabaseError> {
        let sql = format!(
            "{} WHERE s.id IN (SELECT serie_id FROM subscriptions WHERE user_id = $1) \
             ORDER BY s.created_at DESC",
            SERIE_SELECT
        );
        let series = sqlx::query_as::<_, Serie>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(series)
    }

    async fn search_published(&self, keyword: &str) -> Result<Vec<Serie>, DatabaseError> {
        let sql = format!(
            "{} WHERE s.is_publish AND s.title ILIKE $1 ORDER BY s.created_at DESC",
            SERIE_SELECT
        );
        let series = sqlx::query_as::<_, Serie>(&sql)
            .bind(like_pattern(keyword))
            .fetch_all(&self.pool)
            .await?;
        Ok(series)
    }

    async fn insert(&self, serie: NewSerie) -> Result<Serie, DatabaseError> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO series (id, title, description, is_publish, thumbnail, owner_id, topic)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(&serie.title)
        .bind(&serie.description)
        .bind(serie.is_publish)
        .bind(&serie.thumbnail)
        .bind(&serie.owner_id)
        .bind(Serie::topic_for(id))
        .execute(&self.pool)
        .await?;

        SerieRepository::find(self, id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("serie {}", id)))
    }

    async fn update(
        &self,
        id: Uuid,
        changes: SerieChanges,
    ) -> Result<Option<Serie>, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE series SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                is_publish = COALESCE($4, is_publish),
                thumbnail = NULLIF(COALESCE($5, thumbnail), ''),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.is_publish)
        .bind(&changes.thumbnail)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        SerieRepository::find(self, id).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM series WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn subscribe(&self, id: Uuid, user_id: &str) -> Result<bool, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO subscriptions (user_id, serie_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if inserted {
            sqlx::query(
                "UPDATE series SET subscriber_count = subscriber_count + 1, updated_at = now() WHERE id = $1",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn unsubscribe(&self, id: Uuid, user_id: &str) -> Result<bool, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND serie_id = $2")
            .bind(user_id)
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        if removed {
            sqlx::query(
                "UPDATE series SET subscriber_count = GREATEST(subscriber_count - 1, 0), updated_at = now() WHERE id = $1",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(removed)
    }

    async fn subscriber_emails(&self, id: Uuid) -> Result<Vec<String>, DatabaseError> {
        let emails = sqlx::query_scalar::<_, String>(
            r#"
            SELECT u.email FROM subscriptions sub
            JOIN users u ON u.id = sub.user_id
            WHERE sub.serie_id = $1 AND u.email <> ''
            ORDER BY sub.created_at
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(emails)
    }
}

#[async_trait]
impl LessonRepository for PgStore {
    async fn find(&self, serie_id: Uuid, lesson_id: Uuid) -> Result<Option<Lesson>, DatabaseError> {
        let sql = format!("{} WHERE serie_id = $1 AND id = $2", LESSON_SELECT);
        let lesson = sqlx::query_as::<_, Lesson>(&sql)
            .bind(serie_id)
            .bind(lesson_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(lesson)
    }

    async fn list_by_serie(&self, serie_id: Uuid) -> Result<Vec<Lesson>, DatabaseError> {
        let sql = format!(
            "{} WHERE serie_id = $1 ORDER BY created_at, id",
            LESSON_SELECT
        );
        let lessons = sqlx::query_as::<_, Lesson>(&sql)
            .bind(serie_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(lessons)
    }

    async fn insert(&self, lesson: NewLesson) -> Result<Lesson, DatabaseError> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO lessons (id, serie_id, title, content, video, documents)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(lesson.serie_id)
        .bind(&lesson.title)
        .bind(&lesson.content)
        .bind(&lesson.video)
        .bind(&lesson.documents)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE series SET updated_at = now() WHERE id = $1")
            .bind(lesson.serie_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        LessonRepository::find(self, lesson.serie_id, id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("lesson {}", id)))
    }

    async fn update(
        &self,
        serie_id: Uuid,
        lesson_id: Uuid,
        changes: LessonChanges,
    ) -> Result<Option<Lesson>, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE lessons SET
                title = COALESCE($3, title),
                content = COALESCE($4, content),
                video = NULLIF(COALESCE($5, video), ''),
                documents = COALESCE($6, documents),
                updated_at = now()
            WHERE serie_id = $1 AND id = $2
            "#,
        )
        .bind(serie_id)
        .bind(lesson_id)
        .bind(&changes.title)
        .bind(&changes.content)
        .bind(&changes.video)
        .bind(&changes.documents)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        LessonRepository::find(self, serie_id, lesson_id).await
    }

    async fn delete(&self, serie_id: Uuid, lesson_id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM lessons WHERE serie_id = $1 AND id = $2")
            .bind(serie_id)
            .bind(lesson_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(FromRow)]
struct TrackingRow {
    user_id: String,
    active_lessons: Json<Vec<ActiveLesson>>,
    current_lesson: Option<Json<ActiveLesson>>,
    last_updated: chrono::DateTime<chrono::Utc>,
}

impl From<TrackingRow> for LessonTracking {
    fn from(row: TrackingRow) -> Self {
        Self {
            user_id: row.user_id,
            active_lessons: row.active_lessons.0,
            current_lesson: row.current_lesson.map(|json| json.0),
            last_updated: row.last_updated,
        }
    }
}

#[async_trait]
impl TrackingRepository for PgStore {
    async fn find(&self, user_id: &str) -> Result<Option<LessonTracking>, DatabaseError> {
        let row = sqlx::query_as::<_, TrackingRow>(
            "SELECT user_id, active_lessons, current_lesson, last_updated FROM lesson_tracking WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(LessonTracking::from))
    }

    async fn save(&self, tracking: &LessonTracking) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO lesson_tracking (user_id, active_lessons, current_lesson, last_updated)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                active_lessons = EXCLUDED.active_lessons,
                current_lesson = EXCLUDED.current_lesson,
                last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(&tracking.user_id)
        .bind(Json(&tracking.active_lessons))
        .bind(tracking.current_lesson.as_ref().map(Json))
        .bind(tracking.last_updated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM lesson_tracking WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
