use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A lesson open in one browser tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveLesson {
    pub lesson_id: String,
    pub serie_id: String,
    pub lesson_title: Option<String>,
    pub tab_id: String,
    pub last_active: DateTime<Utc>,
}

/// Per-user set of open lesson tabs plus the one that currently has focus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonTracking {
    pub user_id: String,
    pub active_lessons: Vec<ActiveLesson>,
    pub current_lesson: Option<ActiveLesson>,
    pub last_updated: DateTime<Utc>,
}

impl LessonTracking {
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            active_lessons: Vec::new(),
            current_lesson: None,
            last_updated: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.active_lessons.is_empty()
    }

    /// Drop tabs idle for longer than `window`. Returns how many were removed.
    pub fn prune_stale(&mut self, now: DateTime<Utc>, window: Duration) -> usize {
        let threshold = now - window;
        let before = self.active_lessons.len();
        self.active_lessons.retain(|tab| tab.last_active > threshold);

        let removed = before - self.active_lessons.len();
        if removed > 0 {
            self.current_lesson = self.most_recent().cloned();
            self.last_updated = now;
        }
        removed
    }

    /// Open (or re-open) a lesson in a tab; it becomes the current lesson.
    pub fn enter(&mut self, lesson: ActiveLesson) {
        let now = lesson.last_active;
        self.active_lessons.retain(|tab| tab.tab_id != lesson.tab_id);
        self.active_lessons.push(lesson.clone());
        self.current_lesson = Some(lesson);
        self.last_updated = now;
    }

    /// Close a tab. The most recently active remaining tab becomes current.
    pub fn exit(&mut self, tab_id: &str, now: DateTime<Utc>) {
        self.active_lessons.retain(|tab| tab.tab_id != tab_id);
        self.current_lesson = self.most_recent().cloned();
        self.last_updated = now;
    }

    /// Touch a tab and make it current. `None` when the tab is unknown.
    pub fn focus(&mut self, tab_id: &str, now: DateTime<Utc>) -> Option<ActiveLesson> {
        let tab = self
            .active_lessons
            .iter_mut()
            .find(|tab| tab.tab_id == tab_id)?;
        tab.last_active = now;
        let focused = tab.clone();

        self.current_lesson = Some(focused.clone());
        self.last_updated = now;
        Some(focused)
    }

    fn most_recent(&self) -> Option<&ActiveLesson> {
        self.active_lessons.iter().max_by_key(|tab| tab.last_active)
    }
}
