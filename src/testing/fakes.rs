use async_trait::async_trait;
use std::sync::Mutex;

use crate::clients::{
    BatchDeleteResult, MailError, Mailer, MediaClient, MediaError, MediaKind, OutgoingMail,
    UploadFile,
};

/// Media service double. Uploads resolve to `https://media.test/{kind}/{filename}`.
#[derive(Default)]
pub struct RecordingMediaClient {
    fail_uploads: bool,
    deleted: Mutex<Vec<String>>,
    batch_deleted: Mutex<Vec<Vec<String>>>,
}

impl RecordingMediaClient {
    pub fn failing() -> Self {
        Self {
            fail_uploads: true,
            ..Default::default()
        }
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn batch_deleted(&self) -> Vec<Vec<String>> {
        self.batch_deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaClient for RecordingMediaClient {
    async fn upload(
        &self,
        kind: MediaKind,
        file: &UploadFile,
        _user_id: &str,
    ) -> Result<String, MediaError> {
        if self.fail_uploads {
            return Err(MediaError::Status(500));
        }
        Ok(format!("https://media.test/{}/{}", kind, file.filename))
    }

    async fn delete_file(&self, url_or_key: &str) -> bool {
        self.deleted.lock().unwrap().push(url_or_key.to_string());
        true
    }

    async fn delete_files_batch(&self, urls: &[String]) -> BatchDeleteResult {
        self.batch_deleted.lock().unwrap().push(urls.to_vec());
        BatchDeleteResult {
            deleted: urls.to_vec(),
            failed: Vec::new(),
        }
    }
}

/// Keeps every delivered mail; `failing()` refuses them all.
#[derive(Default)]
pub struct RecordingMailer {
    fail: bool,
    sent: Mutex<Vec<OutgoingMail>>,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<String, MailError> {
        if self.fail {
            return Err(MailError::Send("connection refused".to_string()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(mail.clone());
        Ok(format!("<{}@test>", sent.len()))
    }
}
