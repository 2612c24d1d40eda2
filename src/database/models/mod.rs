pub mod lesson;
pub mod serie;
pub mod tracking;
pub mod user;

pub use lesson::{Lesson, LessonChanges, NewLesson};
pub use serie::{NewSerie, Serie, SerieChanges};
pub use tracking::{ActiveLesson, LessonTracking};
pub use user::{NewUser, Role, RoleChange, User, UserChanges};
