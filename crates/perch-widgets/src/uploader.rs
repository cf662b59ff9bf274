//! File upload queue.
//!
//! Every queued file moves through
//! `Waiting → Uploading → Success | Error(cancel | security | io)`. The
//! uploader sends one file at a time through a [`Transport`]; each completion
//! message advances the queue to the next waiting file until none is left.
//! In-flight sends are abortable, so [`Uploader::stop`] cancels the current
//! file immediately and a completion that arrives afterwards is ignored.

use futures::future::{self, AbortHandle, BoxFuture};
use perch_core::{Command, Component, ElementId, Error, Scene};
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use ratatui::Frame;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifies one queued file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(u64);

static NEXT_FILE_ID: AtomicU64 = AtomicU64::new(1);

impl FileId {
    pub fn next() -> Self {
        Self(NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Cancel,
    /// The destination refused the file (permissions).
    Security,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Cancel => "cancel",
            ErrorKind::Security => "security",
            ErrorKind::Io => "io",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("upload {kind} error: {message}")]
pub struct UploadError {
    pub kind: ErrorKind,
    pub message: String,
}

impl UploadError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancel, "upload stopped")
    }
}

impl From<io::Error> for UploadError {
    fn from(err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::PermissionDenied => ErrorKind::Security,
            _ => ErrorKind::Io,
        };
        Self::new(kind, err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Waiting,
    Uploading,
    Success,
    Error(ErrorKind),
}

impl FileStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, FileStatus::Success | FileStatus::Error(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedFile {
    pub id: FileId,
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub status: FileStatus,
}

/// Delivers one file somewhere. Resolves to the number of bytes sent.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, file: &QueuedFile) -> BoxFuture<'static, Result<u64, UploadError>>;
}

/// Copies files into a directory, keeping their names.
#[derive(Debug, Clone)]
pub struct DirectoryTransport {
    dir: PathBuf,
}

impl DirectoryTransport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Transport for DirectoryTransport {
    fn send(&self, file: &QueuedFile) -> BoxFuture<'static, Result<u64, UploadError>> {
        let from = file.path.clone();
        let to = self.dir.join(&file.name);
        Box::pin(async move { Ok(tokio::fs::copy(&from, &to).await?) })
    }
}

/// Why a file was not queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Not in the accept list.
    Type,
    /// Larger than the maximum size.
    Size { size: u64, max: u64 },
    /// Single-file mode and a file is already queued.
    Count,
    Disabled,
    /// Could not be read.
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploaderOptions {
    /// Accepted extensions without the dot; empty accepts everything.
    pub accept: Vec<String>,
    pub max_size: Option<u64>,
    pub multiple: bool,
    /// Start uploading as soon as files are queued.
    pub auto_start: bool,
}

impl Default for UploaderOptions {
    fn default() -> Self {
        Self {
            accept: Vec::new(),
            max_size: None,
            multiple: true,
            auto_start: false,
        }
    }
}

fn parse_bool(element: ElementId, name: &str, raw: &str) -> Result<bool, Error> {
    match raw.trim() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(Error::InvalidAttribute {
            element,
            name: format!("data-{name}"),
            value: raw.to_string(),
            reason: "expected true or false".into(),
        }),
    }
}

impl UploaderOptions {
    /// `accept` from a comma-separated list such as `".png, jpg"`.
    pub fn accept(mut self, list: &str) -> Self {
        self.accept = list
            .split(',')
            .map(|s| s.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        self
    }

    pub fn max_size(mut self, bytes: u64) -> Self {
        self.max_size = Some(bytes);
        self
    }

    pub fn single(mut self) -> Self {
        self.multiple = false;
        self
    }

    pub fn auto_start(mut self) -> Self {
        self.auto_start = true;
        self
    }

    /// Override fields from `data-accept`, `data-max-size`, `data-multiple`
    /// and `data-auto-start` on `element`.
    pub fn with_element(mut self, scene: &Scene, element: ElementId) -> Result<Self, Error> {
        let el = scene.require(element)?;
        if let Some(list) = el.data("accept") {
            self = self.accept(list);
        }
        if let Some(raw) = el.data("max-size") {
            let max = raw.trim().parse::<u64>().map_err(|e| Error::InvalidAttribute {
                element,
                name: "data-max-size".into(),
                value: raw.to_string(),
                reason: e.to_string(),
            })?;
            self.max_size = Some(max);
        }
        if let Some(raw) = el.data("multiple") {
            self.multiple = parse_bool(element, "multiple", raw)?;
        }
        if let Some(raw) = el.data("auto-start") {
            self.auto_start = parse_bool(element, "auto-start", raw)?;
        }
        Ok(self)
    }

    pub fn accepts(&self, name: &str) -> bool {
        if self.accept.is_empty() || self.accept.iter().any(|a| a == "*") {
            return true;
        }
        let ext = Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        ext.is_some_and(|ext| self.accept.iter().any(|a| *a == ext))
    }
}

/// A path after its metadata lookup.
pub type Inspected = Result<(PathBuf, u64), (PathBuf, String)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Queue these paths (after checking they exist and pass the filters).
    Add(Vec<PathBuf>),
    Inspected(Vec<Inspected>),
    Upload,
    Stop,
    Enable,
    Disable,
    Remove(FileId),
    Finished {
        file: FileId,
        attempt: u64,
        result: Result<u64, UploadError>,
    },

    /// Notice: a file joined the queue.
    Queued(FileId),
    /// Notice: a path was not queued.
    Rejected { path: PathBuf, reason: Rejection },
    /// Notice: a file changed status.
    Status { file: FileId, status: FileStatus },
    /// Notice: a file failed.
    Failed { file: FileId, error: UploadError },
    /// Notice: the queue ran out of waiting files.
    Complete,
}

struct Active {
    file: FileId,
    attempt: u64,
    abort: AbortHandle,
}

pub struct Uploader {
    files: Vec<QueuedFile>,
    transport: Arc<dyn Transport>,
    options: UploaderOptions,
    enabled: bool,
    running: bool,
    current: Option<Active>,
    attempts: u64,
}

impl Uploader {
    pub fn new(transport: impl Transport, options: UploaderOptions) -> Self {
        Self {
            files: Vec::new(),
            transport: Arc::new(transport),
            options,
            enabled: true,
            running: false,
            current: None,
            attempts: 0,
        }
    }

    pub fn files(&self) -> &[QueuedFile] {
        &self.files
    }

    pub fn file(&self, id: FileId) -> Option<&QueuedFile> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn options(&self) -> &UploaderOptions {
        &self.options
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_uploading(&self) -> bool {
        self.current.is_some()
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Refuse new files and new runs. A file already uploading finishes, but
    /// the queue does not advance past it.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.running = false;
    }

    /// Look up `paths` off the update loop; the result arrives as
    /// [`Message::Inspected`].
    pub fn add(&self, paths: Vec<PathBuf>) -> Command<Message> {
        if !self.enabled {
            return Command::batch(paths.into_iter().map(|path| {
                Command::message(Message::Rejected {
                    path,
                    reason: Rejection::Disabled,
                })
            }));
        }
        let lookups = paths.into_iter().map(|path| async move {
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => Ok((path, meta.len())),
                Ok(_) => Err((path, "not a regular file".to_string())),
                Err(err) => Err((path, err.to_string())),
            }
        });
        Command::perform(future::join_all(lookups), Message::Inspected)
    }

    fn enqueue(&mut self, inspected: Vec<Inspected>) -> Command<Message> {
        let mut notices = Vec::new();
        let mut queued = false;
        for item in inspected {
            let (path, size) = match item {
                Ok(found) => found,
                Err((path, why)) => {
                    notices.push(Command::message(Message::Rejected {
                        path,
                        reason: Rejection::Unreadable(why),
                    }));
                    continue;
                }
            };
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let reason = if !self.enabled {
                Some(Rejection::Disabled)
            } else if !self.options.accepts(&name) {
                Some(Rejection::Type)
            } else if let Some(max) = self.options.max_size.filter(|max| size > *max) {
                Some(Rejection::Size { size, max })
            } else if !self.options.multiple && self.files.iter().any(|f| !f.status.is_finished()) {
                Some(Rejection::Count)
            } else {
                None
            };
            if let Some(reason) = reason {
                tracing::debug!(path = %path.display(), ?reason, "file rejected");
                notices.push(Command::message(Message::Rejected { path, reason }));
                continue;
            }
            let id = FileId::next();
            tracing::debug!(file = %id, %name, size, "file queued");
            self.files.push(QueuedFile {
                id,
                path,
                name,
                size,
                status: FileStatus::Waiting,
            });
            notices.push(Command::message(Message::Queued(id)));
            queued = true;
        }
        if queued && self.options.auto_start {
            notices.push(self.upload());
        }
        Command::batch(notices)
    }

    /// Start working through the waiting files. Does nothing while disabled
    /// or while a file is already uploading.
    pub fn upload(&mut self) -> Command<Message> {
        if !self.enabled || self.current.is_some() {
            return Command::none();
        }
        self.running = true;
        self.advance()
    }

    /// Cancel the file in flight and stop the queue.
    pub fn stop(&mut self) -> Command<Message> {
        self.running = false;
        let Some(active) = self.current.take() else {
            return Command::none();
        };
        active.abort.abort();
        tracing::debug!(file = %active.file, "upload stopped");
        self.fail(active.file, UploadError::cancelled())
    }

    /// Drop a file that is not uploading.
    pub fn remove(&mut self, id: FileId) -> bool {
        if self.current.as_ref().is_some_and(|a| a.file == id) {
            return false;
        }
        let before = self.files.len();
        self.files.retain(|f| f.id != id);
        self.files.len() != before
    }

    fn set_status(&mut self, id: FileId, status: FileStatus) -> Command<Message> {
        match self.files.iter_mut().find(|f| f.id == id) {
            Some(file) => {
                file.status = status;
                Command::message(Message::Status { file: id, status })
            }
            None => Command::none(),
        }
    }

    fn fail(&mut self, id: FileId, error: UploadError) -> Command<Message> {
        tracing::debug!(file = %id, %error, "upload failed");
        let status = self.set_status(id, FileStatus::Error(error.kind));
        Command::batch([status, Command::message(Message::Failed { file: id, error })])
    }

    fn advance(&mut self) -> Command<Message> {
        if !self.running {
            return Command::none();
        }
        let Some(next) = self.files.iter().find(|f| f.status == FileStatus::Waiting) else {
            self.running = false;
            tracing::debug!("upload queue complete");
            return Command::message(Message::Complete);
        };
        let file = next.id;
        let (send, abort) = future::abortable(self.transport.send(next));
        self.attempts += 1;
        let attempt = self.attempts;
        self.current = Some(Active {
            file,
            attempt,
            abort,
        });
        tracing::debug!(%file, attempt, "upload started");
        let status = self.set_status(file, FileStatus::Uploading);
        let sent = Command::perform(send, move |outcome| Message::Finished {
            file,
            attempt,
            result: outcome.unwrap_or_else(|_| Err(UploadError::cancelled())),
        });
        Command::batch([status, sent])
    }

    fn finished(&mut self, file: FileId, attempt: u64, result: Result<u64, UploadError>) -> Command<Message> {
        if !self.current.as_ref().is_some_and(|a| a.attempt == attempt && a.file == file) {
            tracing::trace!(%file, attempt, "stale upload result");
            return Command::none();
        }
        self.current = None;
        let done = match result {
            Ok(bytes) => {
                tracing::debug!(%file, bytes, "upload succeeded");
                self.set_status(file, FileStatus::Success)
            }
            Err(error) => self.fail(file, error),
        };
        Command::batch([done, self.advance()])
    }
}

impl Component for Uploader {
    type Message = Message;

    fn update(&mut self, msg: Message) -> Command<Message> {
        match msg {
            Message::Add(paths) => self.add(paths),
            Message::Inspected(found) => self.enqueue(found),
            Message::Upload => self.upload(),
            Message::Stop => self.stop(),
            Message::Enable => {
                self.enable();
                Command::none()
            }
            Message::Disable => {
                self.disable();
                Command::none()
            }
            Message::Remove(id) => {
                self.remove(id);
                Command::none()
            }
            Message::Finished {
                file,
                attempt,
                result,
            } => self.finished(file, attempt, result),
            Message::Queued(_)
            | Message::Rejected { .. }
            | Message::Status { .. }
            | Message::Failed { .. }
            | Message::Complete => Command::none(),
        }
    }

    fn view(&self, frame: &mut Frame, area: Rect) {
        let lines: Vec<Line> = self
            .files
            .iter()
            .map(|f| {
                let (label, color) = match f.status {
                    FileStatus::Waiting => ("waiting".to_string(), Color::Gray),
                    FileStatus::Uploading => ("uploading".to_string(), Color::Yellow),
                    FileStatus::Success => ("done".to_string(), Color::Green),
                    FileStatus::Error(kind) => (format!("error: {kind}"), Color::Red),
                };
                Line::from(vec![
                    Span::raw(format!("{} ({} B) ", f.name, f.size)),
                    Span::styled(label, Style::default().fg(color)),
                ])
            })
            .collect();
        let title = if self.enabled { " Uploads " } else { " Uploads (disabled) " };
        frame.render_widget(Paragraph::new(lines).block(Block::bordered().title(title)), area);
    }

    fn dispose(&mut self) -> Command<Message> {
        self.stop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_core::testing::TestComponent;
    use perch_core::Element;
    use std::fs;
    use tempfile::TempDir;

    fn notices(cmd: Command<Message>) -> Vec<Message> {
        cmd.into_messages()
    }

    /// A source directory with a few files and an empty destination.
    fn fixture() -> (TempDir, TempDir, Vec<PathBuf>) {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for (name, body) in [("a.txt", "alpha"), ("b.txt", "bravo!"), ("c.png", "png")] {
            let path = src.path().join(name);
            fs::write(&path, body).unwrap();
            paths.push(path);
        }
        (src, dst, paths)
    }

    /// Never completes until aborted.
    struct Stalled;

    impl Transport for Stalled {
        fn send(&self, _: &QueuedFile) -> BoxFuture<'static, Result<u64, UploadError>> {
            Box::pin(future::pending())
        }
    }

    struct Refusing;

    impl Transport for Refusing {
        fn send(&self, _: &QueuedFile) -> BoxFuture<'static, Result<u64, UploadError>> {
            Box::pin(async { Err(io::Error::from(io::ErrorKind::PermissionDenied).into()) })
        }
    }

    fn statuses(u: &Uploader) -> Vec<FileStatus> {
        u.files().iter().map(|f| f.status).collect()
    }

    #[test]
    fn io_errors_map_to_kinds() {
        let denied: UploadError = io::Error::from(io::ErrorKind::PermissionDenied).into();
        assert_eq!(denied.kind, ErrorKind::Security);
        let missing: UploadError = io::Error::from(io::ErrorKind::NotFound).into();
        assert_eq!(missing.kind, ErrorKind::Io);
        assert_eq!(UploadError::cancelled().kind, ErrorKind::Cancel);
    }

    #[test]
    fn accept_list_matches_extensions() {
        let opts = UploaderOptions::default().accept(".PNG, jpg,");
        assert_eq!(opts.accept, vec!["png", "jpg"]);
        assert!(opts.accepts("photo.png"));
        assert!(opts.accepts("photo.JPG"));
        assert!(!opts.accepts("notes.txt"));
        assert!(!opts.accepts("README"));
        assert!(UploaderOptions::default().accepts("anything"));
    }

    #[test]
    fn options_from_element_attributes() {
        let mut scene = Scene::new(Rect::new(0, 0, 10, 10));
        let el = scene.add(
            Element::region(Rect::new(0, 0, 5, 1))
                .with_attr("data-accept", "txt")
                .with_attr("data-max-size", "10")
                .with_attr("data-multiple", "false"),
        );
        let opts = UploaderOptions::default().with_element(&scene, el).unwrap();
        assert_eq!(opts.accept, vec!["txt"]);
        assert_eq!(opts.max_size, Some(10));
        assert!(!opts.multiple);
        assert!(!opts.auto_start);

        let bad = scene.add(Element::region(Rect::new(0, 1, 5, 1)).with_attr("data-max-size", "big"));
        assert!(matches!(
            UploaderOptions::default().with_element(&scene, bad),
            Err(Error::InvalidAttribute { .. })
        ));
    }

    #[tokio::test]
    async fn filters_apply_to_added_paths() {
        let (src, dst, mut paths) = fixture();
        paths.push(src.path().join("missing.txt"));
        let options = UploaderOptions::default().accept("txt").max_size(5);
        let mut t = TestComponent::new(Uploader::new(DirectoryTransport::new(dst.path()), options));
        t.send(Message::Add(paths));
        t.settle().await;
        let names: Vec<&str> = t.component().files().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt"]);
    }

    #[test]
    fn rejections_are_reported_in_order() {
        let options = UploaderOptions::default().accept("txt").max_size(5);
        let mut u = Uploader::new(Stalled, options);
        let found = vec![
            Ok((PathBuf::from("a.txt"), 5)),
            Ok((PathBuf::from("b.txt"), 6)),
            Ok((PathBuf::from("c.png"), 1)),
            Err((PathBuf::from("gone.txt"), "not found".to_string())),
        ];
        let out = notices(u.update(Message::Inspected(found)));
        let queued = u.files()[0].id;
        assert_eq!(
            out,
            vec![
                Message::Queued(queued),
                Message::Rejected {
                    path: PathBuf::from("b.txt"),
                    reason: Rejection::Size { size: 6, max: 5 },
                },
                Message::Rejected {
                    path: PathBuf::from("c.png"),
                    reason: Rejection::Type,
                },
                Message::Rejected {
                    path: PathBuf::from("gone.txt"),
                    reason: Rejection::Unreadable("not found".into()),
                },
            ]
        );
    }

    #[tokio::test]
    async fn uploads_queue_into_directory() {
        let (_src, dst, paths) = fixture();
        let mut t = TestComponent::new(Uploader::new(
            DirectoryTransport::new(dst.path()),
            UploaderOptions::default(),
        ));
        t.send(Message::Add(paths));
        t.settle().await;
        assert_eq!(statuses(t.component()), vec![FileStatus::Waiting; 3]);

        t.send(Message::Upload);
        assert!(t.component().is_uploading());
        t.settle().await;
        assert_eq!(statuses(t.component()), vec![FileStatus::Success; 3]);
        assert!(!t.component().is_uploading());
        assert_eq!(fs::read_to_string(dst.path().join("b.txt")).unwrap(), "bravo!");
        assert!(dst.path().join("c.png").exists());
    }

    #[tokio::test]
    async fn vanished_source_is_an_io_error_and_queue_continues() {
        let (_src, dst, paths) = fixture();
        let mut t = TestComponent::new(Uploader::new(
            DirectoryTransport::new(dst.path()),
            UploaderOptions::default(),
        ));
        t.send(Message::Add(paths.clone()));
        t.settle().await;
        fs::remove_file(&paths[0]).unwrap();
        t.send(Message::Upload);
        t.settle().await;
        assert_eq!(
            statuses(t.component()),
            vec![FileStatus::Error(ErrorKind::Io), FileStatus::Success, FileStatus::Success]
        );
    }

    #[tokio::test]
    async fn permission_errors_are_security_errors() {
        let (_src, _dst, paths) = fixture();
        let mut t = TestComponent::new(Uploader::new(Refusing, UploaderOptions::default().single()));
        t.send(Message::Add(paths));
        t.settle().await;
        assert_eq!(t.component().files().len(), 1);
        t.send(Message::Upload);
        t.settle().await;
        assert_eq!(statuses(t.component()), vec![FileStatus::Error(ErrorKind::Security)]);
    }

    #[tokio::test]
    async fn stop_cancels_the_file_in_flight() {
        let (_src, _dst, paths) = fixture();
        let mut u = Uploader::new(Stalled, UploaderOptions::default());
        let inspected = paths.iter().map(|p| Ok((p.clone(), 1))).collect();
        let _ = u.update(Message::Inspected(inspected));

        let started = notices(u.upload());
        let first = u.files()[0].id;
        assert_eq!(
            started,
            vec![Message::Status { file: first, status: FileStatus::Uploading }]
        );

        let stopped = notices(u.stop());
        assert!(stopped.contains(&Message::Failed { file: first, error: UploadError::cancelled() }));
        assert_eq!(
            statuses(&u),
            vec![FileStatus::Error(ErrorKind::Cancel), FileStatus::Waiting, FileStatus::Waiting]
        );

        // The aborted send reports late; it must not restart the queue.
        let late = u.update(Message::Finished { file: first, attempt: 1, result: Ok(1) });
        assert!(late.is_none());
        assert!(!u.is_uploading());
    }

    #[tokio::test]
    async fn stopped_send_resolves_as_stale() {
        let (_src, _dst, paths) = fixture();
        let mut t = TestComponent::new(Uploader::new(Stalled, UploaderOptions::default()));
        t.send(Message::Add(paths));
        t.settle().await;
        t.send(Message::Upload);
        t.send(Message::Stop);
        t.settle().await;
        assert_eq!(t.scheduler().pending_futures(), 0);
        assert_eq!(
            statuses(t.component()),
            vec![FileStatus::Error(ErrorKind::Cancel), FileStatus::Waiting, FileStatus::Waiting]
        );
    }

    #[tokio::test]
    async fn auto_start_and_disable() {
        let (_src, dst, paths) = fixture();
        let mut t = TestComponent::new(Uploader::new(
            DirectoryTransport::new(dst.path()),
            UploaderOptions::default().auto_start(),
        ));
        t.send(Message::Disable);
        t.send(Message::Add(paths.clone()));
        t.settle().await;
        assert!(t.component().files().is_empty());

        t.send(Message::Enable);
        t.send(Message::Add(paths));
        t.settle().await;
        assert_eq!(statuses(t.component()), vec![FileStatus::Success; 3]);
    }

    #[test]
    fn single_mode_keeps_one_pending_file() {
        let mut u = Uploader::new(Stalled, UploaderOptions::default().single());
        let found = vec![Ok((PathBuf::from("a.txt"), 1)), Ok((PathBuf::from("b.txt"), 1))];
        let out = notices(u.update(Message::Inspected(found)));
        assert_eq!(u.files().len(), 1);
        assert!(out.contains(&Message::Rejected {
            path: PathBuf::from("b.txt"),
            reason: Rejection::Count,
        }));
        let id = u.files()[0].id;
        assert!(u.remove(id));
        assert!(u.files().is_empty());
    }
}
