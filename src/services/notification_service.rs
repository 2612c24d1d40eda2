use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::ServiceError;
use crate::clients::{escape_html, Mailer, OutgoingMail};
use crate::database::models::{Lesson, Serie};
use crate::database::SerieRepository;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotifyReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub recipient_count: usize,
    pub message_ids: Vec<String>,
}

/// Email fan-out to the subscribers of a series.
#[derive(Clone)]
pub struct NotificationService {
    series: Arc<dyn SerieRepository>,
    mailer: Arc<dyn Mailer>,
    batch_size: usize,
}

impl NotificationService {
    pub fn new(series: Arc<dyn SerieRepository>, mailer: Arc<dyn Mailer>, batch_size: usize) -> Self {
        Self {
            series,
            mailer,
            batch_size: batch_size.max(1),
        }
    }

    /// Send an instructor announcement to every subscriber.
    pub async fn notify_subscribers(
        &self,
        serie: &Serie,
        title: &str,
        message: &str,
    ) -> Result<NotifyReport, ServiceError> {
        let recipients = self.series.subscriber_emails(serie.id).await?;
        if recipients.is_empty() {
            return Ok(NotifyReport {
                success: true,
                message: Some("No subscribers to notify for this series.".to_string()),
                recipient_count: 0,
                message_ids: Vec::new(),
            });
        }

        let subject = format!("[{}] New announcement: {}", serie.title, title);
        let html = announcement_html(&serie.title, title, message);
        let message_ids = self
            .send_batches(&recipients, &subject, message, Some(html))
            .await?;

        info!(
            serie_id = %serie.id,
            topic = %serie.topic,
            recipients = recipients.len(),
            "Sent series announcement"
        );

        Ok(NotifyReport {
            success: true,
            message: None,
            recipient_count: recipients.len(),
            message_ids,
        })
    }

    /// Tell subscribers about a new lesson. Failures are logged only.
    pub async fn announce_lesson(&self, serie: &Serie, lesson: &Lesson) {
        if let Err(e) = self.try_announce_lesson(serie, lesson).await {
            warn!(
                serie_id = %serie.id,
                lesson_id = %lesson.id,
                error = %e,
                "Failed to announce new lesson"
            );
        }
    }

    async fn try_announce_lesson(&self, serie: &Serie, lesson: &Lesson) -> Result<(), ServiceError> {
        let recipients = self.series.subscriber_emails(serie.id).await?;
        if recipients.is_empty() {
            return Ok(());
        }

        let subject = format!("New Lesson in \"{}\"", serie.title);
        let text = format!(
            "A new lesson \"{}\" has been added to \"{}\". Check it out now!",
            lesson.title, serie.title
        );
        let html = lesson_html(&serie.title, &lesson.title);
        self.send_batches(&recipients, &subject, &text, Some(html))
            .await?;

        info!(serie_id = %serie.id, lesson_id = %lesson.id, "Announced new lesson");
        Ok(())
    }

    async fn send_batches(
        &self,
        recipients: &[String],
        subject: &str,
        text: &str,
        html: Option<String>,
    ) -> Result<Vec<String>, ServiceError> {
        let mut message_ids = Vec::new();
        for batch in recipients.chunks(self.batch_size) {
            let mail = OutgoingMail {
                bcc: batch.to_vec(),
                subject: subject.to_string(),
                text: text.to_string(),
                html: html.clone(),
            };
            message_ids.push(self.mailer.send(&mail).await?);
        }
        Ok(message_ids)
    }
}

fn lesson_html(serie_title: &str, lesson_title: &str) -> String {
    format!(
        r#"<html>
<body>
    <h2>New lesson in {serie}</h2>
    <p>A new lesson <strong>{lesson}</strong> has been added to {serie}. Check it out now!</p>
</body>
</html>"#,
        serie = escape_html(serie_title),
        lesson = escape_html(lesson_title),
    )
}

fn announcement_html(serie_title: &str, title: &str, message: &str) -> String {
    format!(
        r#"<html>
<body>
    <h2>Announcement from {serie}</h2>
    <p><strong>{title}</strong></p>
    <p style="white-space: pre-line;">{message}</p>
    <hr/>
    <p>Thank you for learning with EduConnect.</p>
</body>
</html>"#,
        serie = escape_html(serie_title),
        title = escape_html(title),
        message = escape_html(message),
    )
}
