//! In-memory repositories with the same observable behaviour as `PgStore`.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::database::models::{
    Lesson, LessonChanges, LessonTracking, NewLesson, NewSerie, NewUser, Role, RoleChange, Serie,
    SerieChanges, User, UserChanges,
};
use crate::database::{
    DatabaseError, LessonRepository, SerieRepository, TrackingRepository, UserRepository,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    series: Vec<Serie>,
    lessons: Vec<Lesson>,
    // (user_id, serie_id) in subscription order
    subscriptions: Vec<(String, Uuid)>,
    tracking: HashMap<String, LessonTracking>,
}

impl Tables {
    fn user(&self, id: &str) -> Option<User> {
        let mut user = self.users.iter().find(|u| u.id == id)?.clone();
        user.serie_subscribe = self
            .subscriptions
            .iter()
            .filter(|(user_id, _)| user_id == id)
            .map(|(_, serie_id)| serie_id.to_string())
            .collect();
        Some(user)
    }

    fn serie(&self, id: Uuid) -> Option<Serie> {
        let mut serie = self.series.iter().find(|s| s.id == id)?.clone();
        serie.lessons = self
            .lessons
            .iter()
            .filter(|l| l.serie_id == id)
            .map(|l| l.id)
            .collect();
        Some(serie)
    }

    /// Newest first.
    fn series_where(&self, keep: impl Fn(&Serie) -> bool) -> Vec<Serie> {
        self.series
            .iter()
            .rev()
            .filter(|s| keep(s))
            .filter_map(|s| self.serie(s.id))
            .collect()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }
}

fn keep_or_replace(current: &mut String, incoming: String) {
    if !incoming.is_empty() {
        *current = incoming;
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find(&self, id: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self.tables().user(id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables();
        let id = tables
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(|u| u.id.clone());
        Ok(id.and_then(|id| tables.user(&id)))
    }

    async fn insert(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut tables = self.tables();
        if tables.users.iter().any(|u| u.id == user.id) {
            return Err(DatabaseError::Duplicate(format!("user {}", user.id)));
        }

        let now = Utc::now();
        let id = user.id.clone();
        tables.users.push(User {
            id: user.id,
            name: user.name,
            email: user.email,
            username: user.username,
            role: Role::Student.as_str().to_string(),
            gender: user.gender,
            birthdate: user.birthdate,
            avatar: user.avatar,
            serie_subscribe: Vec::new(),
            created_at: now,
            updated_at: now,
        });
        Ok(tables.user(&id).expect("user just written"))
    }

    async fn upsert(&self, user: NewUser) -> Result<User, DatabaseError> {
        {
            let mut tables = self.tables();
            if let Some(existing) = tables.users.iter_mut().find(|u| u.id == user.id) {
                keep_or_replace(&mut existing.name, user.name);
                keep_or_replace(&mut existing.email, user.email);
                keep_or_replace(&mut existing.username, user.username);
                existing.gender = user.gender.or(existing.gender.take());
                existing.birthdate = user.birthdate.or(existing.birthdate.take());
                existing.avatar = user.avatar.or(existing.avatar.take());
                existing.updated_at = Utc::now();
                let id = existing.id.clone();
                return Ok(tables.user(&id).expect("user just written"));
            }
        }
        UserRepository::insert(self, user).await
    }

    async fn update(&self, id: &str, changes: UserChanges) -> Result<Option<User>, DatabaseError> {
        let mut tables = self.tables();
        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(username) = changes.username {
            user.username = username;
        }
        user.gender = changes.gender.or(user.gender.take());
        user.birthdate = changes.birthdate.or(user.birthdate.take());
        user.avatar = changes.avatar.or(user.avatar.take());
        user.updated_at = Utc::now();

        Ok(tables.user(id))
    }

    async fn set_role(&self, email: &str, role: Role) -> Result<RoleChange, DatabaseError> {
        let mut tables = self.tables();
        let Some(user) = tables
            .users
            .iter_mut()
            .find(|u| u.email.eq_ignore_ascii_case(email))
        else {
            return Ok(RoleChange::NotFound);
        };

        if user.role() == role {
            return Ok(RoleChange::Unchanged);
        }
        user.role = role.as_str().to_string();
        user.updated_at = Utc::now();
        Ok(RoleChange::Updated)
    }
}

#[async_trait]
impl SerieRepository for MemoryStore {
    async fn find(&self, id: Uuid) -> Result<Option<Serie>, DatabaseError> {
        Ok(self.tables().serie(id))
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Serie>, DatabaseError> {
        Ok(self
            .tables()
            .series_where(|_| true)
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Serie>, DatabaseError> {
        Ok(self.tables().series_where(|s| s.owner_id == owner_id))
    }

    async fn list_subscribed(&self, user_id: &str) -> Result<Vec<Serie>, DatabaseError> {
        let tables = self.tables();
        let subscribed: Vec<Uuid> = tables
            .subscriptions
            .iter()
            .filter(|(u, _)| u == user_id)
            .map(|(_, s)| *s)
            .collect();
        Ok(tables.series_where(|s| subscribed.contains(&s.id)))
    }

    async fn search_published(&self, keyword: &str) -> Result<Vec<Serie>, DatabaseError> {
        let needle = keyword.to_lowercase();
        Ok(self
            .tables()
            .series_where(|s| s.is_publish && s.title.to_lowercase().contains(&needle)))
    }

    async fn insert(&self, serie: NewSerie) -> Result<Serie, DatabaseError> {
        let mut tables = self.tables();
        let id = Uuid::new_v4();
        let now = Utc::now();
        tables.series.push(Serie {
            id,
            title: serie.title,
            description: serie.description,
            is_publish: serie.is_publish,
            thumbnail: serie.thumbnail,
            lessons: Vec::new(),
            subscriber_count: 0,
            owner_id: serie.owner_id,
            topic: Serie::topic_for(id),
            created_at: now,
            updated_at: now,
        });
        tables
            .serie(id)
            .ok_or_else(|| DatabaseError::NotFound("Serie not found".to_string()))
    }

    async fn update(
        &self,
        id: Uuid,
        changes: SerieChanges,
    ) -> Result<Option<Serie>, DatabaseError> {
        let mut tables = self.tables();
        let Some(serie) = tables.series.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            serie.title = title;
        }
        if let Some(description) = changes.description {
            serie.description = description;
        }
        if let Some(is_publish) = changes.is_publish {
            serie.is_publish = is_publish;
        }
        if let Some(thumbnail) = changes.thumbnail {
            serie.thumbnail = Some(thumbnail).filter(|t| !t.is_empty());
        }
        serie.updated_at = Utc::now();

        Ok(tables.serie(id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables();
        let before = tables.series.len();
        tables.series.retain(|s| s.id != id);
        if tables.series.len() == before {
            return Ok(false);
        }
        tables.lessons.retain(|l| l.serie_id != id);
        tables.subscriptions.retain(|(_, s)| *s != id);
        Ok(true)
    }

    async fn subscribe(&self, id: Uuid, user_id: &str) -> Result<bool, DatabaseError> {
        let mut tables = self.tables();
        if tables
            .subscriptions
            .iter()
            .any(|(u, s)| u == user_id && *s == id)
        {
            return Ok(false);
        }

        let Some(serie) = tables.series.iter_mut().find(|s| s.id == id) else {
            return Err(DatabaseError::NotFound("Serie not found".to_string()));
        };
        serie.subscriber_count += 1;
        serie.updated_at = Utc::now();
        tables.subscriptions.push((user_id.to_string(), id));
        Ok(true)
    }

    async fn unsubscribe(&self, id: Uuid, user_id: &str) -> Result<bool, DatabaseError> {
        let mut tables = self.tables();
        let before = tables.subscriptions.len();
        tables
            .subscriptions
            .retain(|(u, s)| !(u == user_id && *s == id));
        if tables.subscriptions.len() == before {
            return Ok(false);
        }

        if let Some(serie) = tables.series.iter_mut().find(|s| s.id == id) {
            serie.subscriber_count = (serie.subscriber_count - 1).max(0);
            serie.updated_at = Utc::now();
        }
        Ok(true)
    }

    async fn subscriber_emails(&self, id: Uuid) -> Result<Vec<String>, DatabaseError> {
        let tables = self.tables();
        Ok(tables
            .subscriptions
            .iter()
            .filter(|(_, s)| *s == id)
            .filter_map(|(u, _)| tables.users.iter().find(|user| &user.id == u))
            .map(|user| user.email.clone())
            .filter(|email| !email.is_empty())
            .collect())
    }
}

#[async_trait]
impl LessonRepository for MemoryStore {
    async fn find(&self, serie_id: Uuid, lesson_id: Uuid) -> Result<Option<Lesson>, DatabaseError> {
        Ok(self
            .tables()
            .lessons
            .iter()
            .find(|l| l.id == lesson_id && l.serie_id == serie_id)
            .cloned())
    }

    async fn list_by_serie(&self, serie_id: Uuid) -> Result<Vec<Lesson>, DatabaseError> {
        Ok(self
            .tables()
            .lessons
            .iter()
            .filter(|l| l.serie_id == serie_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, lesson: NewLesson) -> Result<Lesson, DatabaseError> {
        let mut tables = self.tables();
        let now = Utc::now();
        let Some(serie) = tables.series.iter_mut().find(|s| s.id == lesson.serie_id) else {
            return Err(DatabaseError::NotFound("Serie not found".to_string()));
        };
        serie.updated_at = now;

        let created = Lesson {
            id: Uuid::new_v4(),
            serie_id: lesson.serie_id,
            title: lesson.title,
            content: lesson.content,
            video: lesson.video,
            documents: lesson.documents,
            description: None,
            transcript: None,
            transcript_status: None,
            summary: None,
            timeline: None,
            created_at: now,
            updated_at: now,
        };
        tables.lessons.push(created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        serie_id: Uuid,
        lesson_id: Uuid,
        changes: LessonChanges,
    ) -> Result<Option<Lesson>, DatabaseError> {
        let mut tables = self.tables();
        let Some(lesson) = tables
            .lessons
            .iter_mut()
            .find(|l| l.id == lesson_id && l.serie_id == serie_id)
        else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            lesson.title = title;
        }
        if let Some(content) = changes.content {
            lesson.content = content;
        }
        if let Some(video) = changes.video {
            lesson.video = Some(video).filter(|v| !v.is_empty());
        }
        if let Some(documents) = changes.documents {
            lesson.documents = documents;
        }
        lesson.updated_at = Utc::now();

        Ok(Some(lesson.clone()))
    }

    async fn delete(&self, serie_id: Uuid, lesson_id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables();
        let before = tables.lessons.len();
        tables
            .lessons
            .retain(|l| !(l.id == lesson_id && l.serie_id == serie_id));
        Ok(tables.lessons.len() != before)
    }
}

#[async_trait]
impl TrackingRepository for MemoryStore {
    async fn find(&self, user_id: &str) -> Result<Option<LessonTracking>, DatabaseError> {
        Ok(self.tables().tracking.get(user_id).cloned())
    }

    async fn save(&self, tracking: &LessonTracking) -> Result<(), DatabaseError> {
        self.tables()
            .tracking
            .insert(tracking.user_id.clone(), tracking.clone());
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<(), DatabaseError> {
        self.tables().tracking.remove(user_id);
        Ok(())
    }
}
