//! User-triggered writes for the photo screen
//!
//! Upload, like and visibility toggle run beside the rotation without pausing
//! it. Each outcome leaves a short-lived feedback message on the screen; only
//! a confirmed like patches the list in place, the other actions refresh it.

use base64::Engine;
use chrono::{DateTime, FixedOffset, Utc};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::MutationError;
use crate::fetch::FetchRequest;
use crate::pictures::{self, ActionReply};
use crate::runtime::ScreenRuntime;
use crate::text;

/// How long a feedback message stays up
pub const FEEDBACK_DURATION: Duration = Duration::from_secs(2);

/// Job progress once the file has been converted for upload
pub const PROGRESS_CONVERTED: i8 = 50;
pub const PROGRESS_DONE: i8 = 100;
pub const PROGRESS_FAILED: i8 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Error,
}

/// Cosmetic status message with a fixed lifetime
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    pub message: String,
    pub tone: Tone,
    pub expires_at: Instant,
}

impl Feedback {
    fn new(message: impl Into<String>, tone: Tone) -> Self {
        Self {
            message: message.into(),
            tone,
            expires_at: Instant::now() + FEEDBACK_DURATION,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, Tone::Success)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, Tone::Error)
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// A file picked for upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    /// MIME type, e.g. `image/jpeg`
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }

    /// File name up to its first `.`
    pub fn title(&self) -> &str {
        match self.name.split_once('.') {
            Some((stem, _)) => stem,
            None => &self.name,
        }
    }

    /// Embed the file as a base64 `data:` URL
    pub fn to_data_url(&self) -> Result<String, MutationError> {
        if self.bytes.is_empty() {
            return Err(MutationError::Conversion {
                file: self.name.clone(),
                reason: "file is empty".to_string(),
            });
        }

        Ok(format!(
            "data:{};base64,{}",
            self.mime,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        ))
    }
}

/// Progress of one file in an upload batch, `-1` on failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadJob {
    pub file: String,
    pub progress: i8,
}

/// Result of a finished upload batch
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReport {
    pub succeeded: usize,
    pub total: usize,
    pub jobs: Vec<UploadJob>,
}

impl UploadReport {
    pub fn message(&self) -> String {
        format!(
            "Upload complete! {}/{} pictures uploaded successfully.",
            self.succeeded, self.total
        )
    }
}

/// Description attached to every uploaded picture
pub fn upload_description(now: DateTime<Utc>, zone: FixedOffset) -> String {
    format!(
        "Uploaded on {}",
        text::format_date(now.timestamp(), zone).unwrap_or_default()
    )
}

impl ScreenRuntime {
    /// Submit one action, abandoning it if the screen goes away
    async fn submit(
        &self,
        request: &FetchRequest,
        fallback: &str,
    ) -> Result<ActionReply, MutationError> {
        let shared = &self.shared;
        if shared.cancel.is_cancelled() {
            return Err(MutationError::Unmounted);
        }

        let result = tokio::select! {
            _ = shared.cancel.cancelled() => return Err(MutationError::Unmounted),
            result = shared.gate.transport().send(request) => result,
        };

        Ok(ActionReply::decode(result?, fallback)?)
    }

    async fn report_failure(&self, error: &MutationError) {
        if !matches!(error, MutationError::Unmounted) {
            self.shared.set_feedback(Feedback::error(error.to_string())).await;
        }
    }

    fn current_id(rotation: &crate::rotation::Rotation) -> Result<String, MutationError> {
        rotation
            .current()
            .map(|item| item.id.clone())
            .ok_or(MutationError::NothingDisplayed)
    }

    /// Upload image files one at a time, then refresh the list once
    ///
    /// Non-image files are skipped. A failed file is marked `-1` and the
    /// batch carries on. Only one batch may run at a time.
    pub async fn upload(&self, files: Vec<UploadFile>) -> Result<UploadReport, MutationError> {
        let shared = &self.shared;
        if shared.cancel.is_cancelled() {
            return Err(MutationError::Unmounted);
        }

        let images: Vec<UploadFile> = files.into_iter().filter(UploadFile::is_image).collect();
        if images.is_empty() {
            let error = MutationError::NoImageFiles;
            self.report_failure(&error).await;
            return Err(error);
        }

        let _batch = shared
            .upload_lock
            .try_lock()
            .map_err(|_| MutationError::UploadInProgress)?;

        let mut jobs: Vec<UploadJob> = images
            .iter()
            .map(|file| UploadJob {
                file: file.name.clone(),
                progress: 0,
            })
            .collect();
        shared.uploads.send_replace(Some(jobs.clone()));

        let description = upload_description(Utc::now(), shared.zone);
        tracing::info!("Uploading {} pictures", images.len());

        for (i, file) in images.iter().enumerate() {
            let data_url = match file.to_data_url() {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", file.name, e);
                    jobs[i].progress = PROGRESS_FAILED;
                    shared.uploads.send_replace(Some(jobs.clone()));
                    continue;
                }
            };

            jobs[i].progress = PROGRESS_CONVERTED;
            shared.uploads.send_replace(Some(jobs.clone()));

            let request = pictures::upload_request(&data_url, file.title(), &description);
            jobs[i].progress = match self.submit(&request, "Upload failed").await {
                Ok(_) => PROGRESS_DONE,
                Err(MutationError::Unmounted) => return Err(MutationError::Unmounted),
                Err(e) => {
                    tracing::warn!("Upload of {} failed: {}", file.name, e);
                    PROGRESS_FAILED
                }
            };
            shared.uploads.send_replace(Some(jobs.clone()));
        }

        shared.refresh().await;

        let report = UploadReport {
            succeeded: jobs.iter().filter(|job| job.progress == PROGRESS_DONE).count(),
            total: jobs.len(),
            jobs,
        };
        shared.uploads.send_replace(None);

        tracing::info!("{}", report.message());
        let feedback = if report.succeeded > 0 {
            Feedback::success(report.message())
        } else {
            Feedback::error(report.message())
        };
        shared.set_feedback(feedback).await;

        Ok(report)
    }

    /// Like an item; on success only its like count changes
    pub async fn like(&self, id: &str) -> Result<u32, MutationError> {
        let reply = match self
            .submit(&pictures::like_request(id), "Failed to like picture")
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Like of {} failed: {}", id, e);
                self.report_failure(&e).await;
                return Err(e);
            }
        };

        let mut likes = reply.likes;
        let patched = self.shared.rotation.write().await.patch(id, |item| {
            let count = reply
                .likes
                .unwrap_or_else(|| item.like_count.unwrap_or(0) + 1);
            item.like_count = Some(count);
            likes = Some(count);
        });
        if !patched {
            tracing::debug!("Liked {} but it is no longer listed", id);
        }

        let likes = likes.unwrap_or(0);
        self.shared
            .set_feedback(Feedback::success(format!("Liked! ({} total)", likes)))
            .await;
        Ok(likes)
    }

    /// Like whatever is on screen right now
    pub async fn like_current(&self) -> Result<u32, MutationError> {
        let id = Self::current_id(&*self.shared.rotation.read().await)?;
        self.like(&id).await
    }

    /// Flip an item's visibility, then refresh the list
    ///
    /// Returns the new visibility as reported by the server.
    pub async fn toggle_visibility(&self, id: &str) -> Result<bool, MutationError> {
        let reply = match self
            .submit(
                &pictures::toggle_request(id),
                "Failed to toggle picture visibility",
            )
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Visibility toggle of {} failed: {}", id, e);
                self.report_failure(&e).await;
                return Err(e);
            }
        };

        let shown = reply.show_picture.is_some_and(|flag| flag.is_set());
        let message = if shown {
            "Picture shown"
        } else {
            "Picture hidden"
        };
        self.shared.set_feedback(Feedback::success(message)).await;

        self.shared.refresh().await;
        Ok(shown)
    }

    /// Hide whatever is on screen right now
    pub async fn hide_current(&self) -> Result<bool, MutationError> {
        let id = Self::current_id(&*self.shared.rotation.read().await)?;
        self.toggle_visibility(&id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::FetchError;
    use crate::fetch::{FetchGate, RawPayload};
    use crate::pictures::PictureFeed;
    use crate::runtime::ScreenContext;
    use crate::testing::ScriptedTransport;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tokio::time;

    const LIST: &str = "/pictures/get_pictures";
    const UPLOAD: &str = "/pictures/upload_picture";
    const LIKE: &str = "/pictures/like_picture";
    const TOGGLE: &str = "/pictures/toggle_picture_visibility";

    fn pictures(records: &[(&str, u32)]) -> Value {
        let records: Vec<Value> = records
            .iter()
            .map(|(f, likes)| json!({ "filename": f, "show_picture": 1, "likes": likes }))
            .collect();
        json!({ "success": true, "pictures": records })
    }

    async fn mount(transport: &Arc<ScriptedTransport>) -> ScreenRuntime {
        let gate = FetchGate::new(transport.clone());
        let feed = Arc::new(PictureFeed::new(&Config::default()));
        let zone = FixedOffset::west_opt(5 * 3600).unwrap();
        let runtime = ScreenRuntime::mount(ScreenContext::new(feed, gate, zone));
        time::sleep(Duration::from_millis(10)).await;
        runtime
    }

    fn png(name: &str) -> UploadFile {
        UploadFile::new(name, "image/png", vec![0x89, b'P', b'N', b'G'])
    }

    #[test]
    fn test_title_and_description() {
        assert_eq!(png("beach.day.png").title(), "beach");
        assert_eq!(png("noext").title(), "noext");

        let zone = FixedOffset::west_opt(5 * 3600).unwrap();
        let now = DateTime::parse_from_rfc3339("2025-03-04T02:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(upload_description(now, zone), "Uploaded on 3/3/2025");
    }

    #[test]
    fn test_data_url_conversion() {
        let url = UploadFile::new("a.jpg", "image/jpeg", b"hi".to_vec())
            .to_data_url()
            .unwrap();
        assert_eq!(url, "data:image/jpeg;base64,aGk=");

        let err = UploadFile::new("empty.png", "image/png", Vec::new())
            .to_data_url()
            .unwrap_err();
        assert!(matches!(err, MutationError::Conversion { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_batch_with_one_failure() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.json(LIST, pictures(&[("p1.png", 0)]));
        transport.respond(UPLOAD, |request| {
            let body = request.body.clone().unwrap_or_default();
            if body["title"] == "b" {
                Ok(RawPayload::Json(json!({ "success": false, "error": "disk full" })))
            } else {
                Ok(RawPayload::Json(json!({ "success": true, "filename": "x.png" })))
            }
        });
        let runtime = mount(&transport).await;
        let fetches = transport.count(LIST);

        let report = runtime
            .upload(vec![
                png("a.png"),
                UploadFile::new("notes.txt", "text/plain", b"hello".to_vec()),
                png("b.png"),
                png("c.png"),
            ])
            .await
            .unwrap();

        let progress: Vec<i8> = report.jobs.iter().map(|job| job.progress).collect();
        assert_eq!(progress, [100, -1, 100]);
        assert_eq!((report.succeeded, report.total), (2, 3));
        assert_eq!(transport.count(UPLOAD), 3);
        assert_eq!(transport.count(LIST), fetches + 1);

        let first = &transport.requests_to(UPLOAD)[0];
        let body = first.body.as_ref().unwrap();
        assert_eq!(body["title"], "a");
        assert!(body["picture"].as_str().unwrap().starts_with("data:image/png;base64,"));
        assert!(body["description"].as_str().unwrap().starts_with("Uploaded on "));

        let view = runtime.view().await;
        assert_eq!(view.uploads, None);
        assert_eq!(
            view.feedback.map(|f| f.message).as_deref(),
            Some("Upload complete! 2/3 pictures uploaded successfully.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_rejects_batches_without_images() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.json(LIST, pictures(&[("p1.png", 0)]));
        let runtime = mount(&transport).await;

        let err = runtime
            .upload(vec![UploadFile::new("a.pdf", "application/pdf", b"x".to_vec())])
            .await
            .unwrap_err();
        assert_eq!(err, MutationError::NoImageFiles);
        assert_eq!(transport.count(UPLOAD), 0);

        let feedback = runtime.view().await.feedback.unwrap();
        assert_eq!(feedback.message, "Please select valid image files.");
        assert_eq!(feedback.tone, Tone::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_one_upload_batch_at_a_time() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.json(LIST, pictures(&[("p1.png", 0)]));
        transport.reply_after(
            UPLOAD,
            Duration::from_secs(3),
            Ok(RawPayload::Json(json!({ "success": true }))),
        );
        let runtime = mount(&transport).await;

        let (first, second) = tokio::join!(
            runtime.upload(vec![png("a.png")]),
            runtime.upload(vec![png("b.png")])
        );
        assert_eq!(first.unwrap().succeeded, 1);
        assert_eq!(second.unwrap_err(), MutationError::UploadInProgress);
    }

    #[tokio::test(start_paused = true)]
    async fn test_like_patches_count_in_place() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.json(LIST, pictures(&[("p1.png", 0), ("p2.png", 5)]));
        let runtime = mount(&transport).await;
        let fetches = transport.count(LIST);

        transport.json(LIKE, json!({ "success": true, "likes": 1 }));
        assert_eq!(runtime.like_current().await, Ok(1));

        transport.json(LIKE, json!({ "success": true }));
        assert_eq!(runtime.like("p2.png").await, Ok(6));

        let view = runtime.view().await;
        let counts: Vec<Option<u32>> = view.items.iter().map(|item| item.like_count).collect();
        assert_eq!(counts, [Some(1), Some(6)]);
        assert_eq!(view.index, 0);
        assert_eq!(transport.count(LIST), fetches);
        assert_eq!(
            view.feedback.map(|f| f.message).as_deref(),
            Some("Liked! (6 total)")
        );

        time::sleep(FEEDBACK_DURATION + Duration::from_millis(100)).await;
        assert!(runtime.view().await.feedback.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_like_leaves_list_alone() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.json(LIST, pictures(&[("p1.png", 2)]));
        let runtime = mount(&transport).await;

        transport.json(LIKE, json!({ "success": false, "error": "Picture not found" }));
        let err = runtime.like("p1.png").await.unwrap_err();
        assert_eq!(
            err,
            MutationError::Remote(FetchError::Action("Picture not found".to_string()))
        );

        let view = runtime.view().await;
        assert_eq!(view.current.unwrap().like_count, Some(2));
        let feedback = view.feedback.unwrap();
        assert_eq!(feedback.message, "Picture not found");
        assert_eq!(feedback.tone, Tone::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hiding_current_picture_refreshes_and_reanchors() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.json(LIST, pictures(&[("p1.png", 0), ("p2.png", 0), ("p3.png", 0)]));
        let runtime = mount(&transport).await;
        runtime.next().await;
        runtime.next().await;
        assert_eq!(runtime.view().await.current.unwrap().id, "p3.png");
        let fetches = transport.count(LIST);

        transport.json(TOGGLE, json!({ "success": true, "show_picture": 0 }));
        transport.json(LIST, pictures(&[("p1.png", 0), ("p2.png", 0)]));
        assert_eq!(runtime.hide_current().await, Ok(false));

        let view = runtime.view().await;
        assert_eq!(transport.count(LIST), fetches + 1);
        assert_eq!(view.index, 0);
        assert_eq!(view.current.unwrap().id, "p1.png");
        assert_eq!(
            view.feedback.map(|f| f.message).as_deref(),
            Some("Picture hidden")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_toggle_does_not_refresh() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.json(LIST, pictures(&[("p1.png", 0)]));
        let runtime = mount(&transport).await;
        let fetches = transport.count(LIST);

        transport.reply(TOGGLE, Err(FetchError::status(500)));
        let err = runtime.toggle_visibility("p1.png").await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP error! status: 500");
        assert_eq!(transport.count(LIST), fetches);
        assert_eq!(runtime.view().await.items.len(), 1);
    }
}
