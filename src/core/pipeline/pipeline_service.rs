// Pipeline coordinator - runs one session from download to downstream callback.
//
// Steps, all inside one background task:
// 1. Ensure the working folder exists
// 2. Fetch input files (per-file failures drop the file)
// 3. Extract gap entries (fatal on unreadable spreadsheets)
// 4. Render the document and the slide deck
// 5. Publish both artifacts and every fetched input (failures become null URLs)
// 6. POST the completion payload downstream
//
// Every external effect goes through a trait so the whole sequence can be
// exercised with mocks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::core::gaps::{
    extract_gaps, is_plain_file_name, FileRef, FileType, GapError, GapReport, SpreadsheetReader,
};
use crate::core::report::{build_deck, build_document, ReportDocument, SlideDeck};

pub const GPT_MODULE: &str = "gap_target";
pub const STATUS_COMPLETE: &str = "complete";

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Server responded with status {0}")]
    Status(u16),

    #[error("Failed to write {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("File name {0:?} is not a plain file name")]
    UnsafeName(String),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Drive setup failed: {0}")]
    Unconfigured(String),

    #[error("Drive API error: {0}")]
    Api(String),

    #[error("Failed to read {path}: {reason}")]
    Read { path: String, reason: String },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to write {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to build package {file}: {reason}")]
    Package { file: String, reason: String },
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Callback request failed: {0}")]
    Http(String),

    #[error("Callback responded with status {0}")]
    Status(u16),
}

/// Errors that stop a pipeline run. Nothing is sent downstream after one of these.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to prepare session folder {path}: {reason}")]
    Workspace { path: String, reason: String },

    #[error("Gap extraction failed")]
    Gap(#[from] GapError),

    #[error("Report rendering failed")]
    Render(#[from] RenderError),

    #[error("Completion callback failed")]
    Notify(#[from] NotifyError),

    #[error("Background step panicked or was aborted: {0}")]
    Task(String),

    #[error("Pipeline was cancelled")]
    Cancelled,
}

// ============================================================================
// PORTS
// ============================================================================

/// Downloads the body at `url` into `destination`, replacing any existing file.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<(), FetchError>;
}

/// Writes the generated artifacts to disk.
pub trait ArtifactRenderer: Send + Sync {
    fn render_document(&self, document: &ReportDocument, path: &Path) -> Result<(), RenderError>;
    fn render_deck(&self, deck: &SlideDeck, path: &Path) -> Result<(), RenderError>;
}

/// Uploads a file into the remote folder for a session and returns a shareable URL.
#[async_trait]
pub trait ArtifactPublisher: Send + Sync {
    async fn upload(&self, file_path: &Path, session_id: &str) -> Result<String, PublishError>;
}

/// Tells the downstream service that a session finished.
#[async_trait]
pub trait CompletionNotifier: Send + Sync {
    async fn notify(&self, payload: &CompletionPayload) -> Result<(), NotifyError>;
}

// ============================================================================
// REQUEST / RESULT TYPES
// ============================================================================

/// Everything the coordinator needs for one session.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub session_id: String,
    pub email: String,
    pub files: Vec<FileRef>,
    pub folder: PathBuf,
}

/// Body posted to the downstream service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionPayload {
    pub session_id: String,
    pub email: String,
    pub gpt_module: String,
    pub files: Vec<FileRef>,
    pub status: String,
}

impl CompletionPayload {
    pub fn complete(session_id: String, email: String, files: Vec<FileRef>) -> Self {
        Self {
            session_id,
            email,
            gpt_module: GPT_MODULE.to_string(),
            files,
            status: STATUS_COMPLETE.to_string(),
        }
    }
}

/// What happened to one input file during the fetch step.
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched(FileRef),
    /// No URL to download from.
    Skipped(FileRef),
    Failed { file: FileRef, error: FetchError },
}

/// Summary returned by a successful run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub payload: CompletionPayload,
    pub hardware_entries: usize,
    pub software_entries: usize,
    /// Inputs that were skipped or failed to download.
    pub dropped_files: usize,
    /// Files whose upload failed and were reported with a null URL.
    pub failed_uploads: usize,
}

/// Anything that can run a session to completion. The session dispatcher
/// only needs this, not the concrete adapters.
#[async_trait]
pub trait PipelineRunner: Send + Sync {
    async fn run(&self, request: PipelineRequest) -> Result<PipelineOutcome, PipelineError>;
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct PipelineService<F, R, W, P, N>
where
    F: FileFetcher,
    R: SpreadsheetReader + 'static,
    W: ArtifactRenderer + 'static,
    P: ArtifactPublisher,
    N: CompletionNotifier,
{
    fetcher: F,
    reader: Arc<R>,
    renderer: Arc<W>,
    publisher: P,
    notifier: N,
}

impl<F, R, W, P, N> PipelineService<F, R, W, P, N>
where
    F: FileFetcher,
    R: SpreadsheetReader + 'static,
    W: ArtifactRenderer + 'static,
    P: ArtifactPublisher,
    N: CompletionNotifier,
{
    pub fn new(fetcher: F, reader: R, renderer: W, publisher: P, notifier: N) -> Self {
        Self {
            fetcher,
            reader: Arc::new(reader),
            renderer: Arc::new(renderer),
            publisher,
            notifier,
        }
    }

    /// Download one file to `{folder}/{file_name}`.
    ///
    /// A second file with the same name overwrites the first one. Names that
    /// are not a single path component fail without touching the disk.
    pub async fn fetch_one(&self, mut file: FileRef, folder: &Path) -> FetchOutcome {
        let Some(url) = file.download_url().map(str::to_string) else {
            return FetchOutcome::Skipped(file);
        };
        if !is_plain_file_name(&file.file_name) {
            let error = FetchError::UnsafeName(file.file_name.clone());
            return FetchOutcome::Failed { file, error };
        }

        let destination = folder.join(&file.file_name);
        match self.fetcher.fetch(&url, &destination).await {
            Ok(()) => {
                file.local_path = Some(destination);
                FetchOutcome::Fetched(file)
            }
            Err(error) => FetchOutcome::Failed { file, error },
        }
    }

    /// Fetch every input, keeping only the files that arrived.
    async fn fetch_all(&self, files: Vec<FileRef>, folder: &Path) -> (Vec<FileRef>, usize) {
        let mut fetched = Vec::with_capacity(files.len());
        let mut dropped = 0;

        for file in files {
            match self.fetch_one(file, folder).await {
                FetchOutcome::Fetched(file) => fetched.push(file),
                FetchOutcome::Skipped(file) => {
                    dropped += 1;
                    tracing::warn!(file_name = %file.file_name, "Skipping file with no file_url");
                }
                FetchOutcome::Failed { file, error } => {
                    dropped += 1;
                    tracing::error!(file_name = %file.file_name, "Download failed: {}", error);
                }
            }
        }

        (fetched, dropped)
    }

    async fn extract(&self, files: &[FileRef]) -> Result<GapReport, PipelineError> {
        let reader = Arc::clone(&self.reader);
        let files = files.to_vec();

        tokio::task::spawn_blocking(move || extract_gaps(&files, reader.as_ref()))
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))?
            .map_err(PipelineError::from)
    }

    async fn render(
        &self,
        session_id: &str,
        gaps: &GapReport,
        folder: &Path,
    ) -> Result<(PathBuf, PathBuf), PipelineError> {
        let document = build_document(session_id, gaps);
        let deck = build_deck(session_id, gaps);
        let document_path = folder.join(&document.file_name);
        let deck_path = folder.join(&deck.file_name);

        let renderer = Arc::clone(&self.renderer);
        let (doc_out, deck_out) = (document_path.clone(), deck_path.clone());
        tokio::task::spawn_blocking(move || {
            renderer.render_document(&document, &doc_out)?;
            renderer.render_deck(&deck, &deck_out)
        })
        .await
        .map_err(|e| PipelineError::Task(e.to_string()))??;

        Ok((document_path, deck_path))
    }

    /// Upload one file; any failure is logged and reported as `None`.
    async fn publish(&self, path: &Path, session_id: &str) -> Option<String> {
        match self.publisher.upload(path, session_id).await {
            Ok(url) => {
                tracing::debug!(session_id, path = %path.display(), url = %url, "Uploaded file");
                Some(url)
            }
            Err(e) => {
                tracing::error!(session_id, path = %path.display(), "Upload error: {}", e);
                None
            }
        }
    }
}

fn artifact_ref(path: &Path, file_type: FileType, url: Option<String>) -> FileRef {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    FileRef::new(file_name, url, file_type)
}

#[async_trait]
impl<F, R, W, P, N> PipelineRunner for PipelineService<F, R, W, P, N>
where
    F: FileFetcher,
    R: SpreadsheetReader + 'static,
    W: ArtifactRenderer + 'static,
    P: ArtifactPublisher,
    N: CompletionNotifier,
{
    async fn run(&self, request: PipelineRequest) -> Result<PipelineOutcome, PipelineError> {
        let PipelineRequest {
            session_id,
            email,
            files,
            folder,
        } = request;

        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|e| PipelineError::Workspace {
                path: folder.display().to_string(),
                reason: e.to_string(),
            })?;

        let (mut files, dropped_files) = self.fetch_all(files, &folder).await;
        tracing::info!(
            session_id = %session_id,
            fetched = files.len(),
            dropped = dropped_files,
            "Fetched input files"
        );

        let gaps = self.extract(&files).await?;
        tracing::info!(
            session_id = %session_id,
            hardware = gaps.hardware.len(),
            software = gaps.software.len(),
            "Extracted gap entries"
        );

        let (document_path, deck_path) = self.render(&session_id, &gaps, &folder).await?;

        let mut failed_uploads = 0;
        let document_url = self.publish(&document_path, &session_id).await;
        let deck_url = self.publish(&deck_path, &session_id).await;
        failed_uploads += usize::from(document_url.is_none()) + usize::from(deck_url.is_none());

        for file in files.iter_mut() {
            let url = match file.local_path.clone() {
                Some(path) => self.publish(&path, &session_id).await,
                None => None,
            };
            failed_uploads += usize::from(url.is_none());
            file.file_url = url;
        }

        files.push(artifact_ref(&document_path, FileType::ReportDocument, document_url));
        files.push(artifact_ref(&deck_path, FileType::ReportDeck, deck_url));

        let payload = CompletionPayload::complete(session_id, email, files);
        self.notifier.notify(&payload).await?;
        tracing::info!(
            session_id = %payload.session_id,
            files = payload.files.len(),
            failed_uploads,
            "Sent completion payload"
        );

        Ok(PipelineOutcome {
            payload,
            hardware_entries: gaps.hardware.len(),
            software_entries: gaps.software.len(),
            dropped_files,
            failed_uploads,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gaps::GapError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Writes a marker file for every URL except the ones listed as broken.
    struct MockFetcher {
        broken: Vec<String>,
    }

    #[async_trait]
    impl FileFetcher for MockFetcher {
        async fn fetch(&self, url: &str, destination: &Path) -> Result<(), FetchError> {
            if self.broken.iter().any(|b| b == url) {
                return Err(FetchError::Status(404));
            }
            std::fs::write(destination, url).map_err(|e| FetchError::Write {
                path: destination.display().to_string(),
                reason: e.to_string(),
            })
        }
    }

    /// Rows keyed by file name; other files fail to parse.
    struct MockReader {
        sheets: HashMap<String, Vec<Vec<String>>>,
    }

    impl SpreadsheetReader for MockReader {
        fn read_rows(&self, path: &Path) -> Result<Vec<Vec<String>>, GapError> {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            self.sheets.get(&name).cloned().ok_or(GapError::Spreadsheet {
                file: name,
                reason: "zip header missing".to_string(),
            })
        }
    }

    struct MockRenderer;

    impl ArtifactRenderer for MockRenderer {
        fn render_document(
            &self,
            document: &ReportDocument,
            path: &Path,
        ) -> Result<(), RenderError> {
            std::fs::write(path, format!("{:?}", document.blocks)).unwrap();
            Ok(())
        }

        fn render_deck(&self, deck: &SlideDeck, path: &Path) -> Result<(), RenderError> {
            std::fs::write(path, format!("{:?}", deck.slides)).unwrap();
            Ok(())
        }
    }

    /// Records uploads; file names listed in `failing` return an error.
    struct MockPublisher {
        failing: Vec<String>,
        uploads: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ArtifactPublisher for MockPublisher {
        async fn upload(&self, file_path: &Path, session_id: &str) -> Result<String, PublishError> {
            let name = file_path.file_name().unwrap().to_string_lossy().into_owned();
            self.uploads
                .lock()
                .unwrap()
                .push((session_id.to_string(), name.clone()));
            if self.failing.contains(&name) {
                return Err(PublishError::Api("quota exceeded".to_string()));
            }
            Ok(format!("https://drive.test/{name}"))
        }
    }

    /// Shares its outbox with the test so payloads can be inspected after the run.
    #[derive(Default)]
    struct MockNotifier {
        sent: Arc<Mutex<Vec<CompletionPayload>>>,
    }

    #[async_trait]
    impl CompletionNotifier for MockNotifier {
        async fn notify(&self, payload: &CompletionPayload) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(payload.clone());
            Ok(())
        }
    }

    type TestPipeline =
        PipelineService<MockFetcher, MockReader, MockRenderer, MockPublisher, MockNotifier>;
    type Outbox = Arc<Mutex<Vec<CompletionPayload>>>;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn scenario_sheets() -> HashMap<String, Vec<Vec<String>>> {
        let header = cells(&["#", "Domain", "Platform", "Tier", "Status", "Recommendation"]);
        let mut sheets = HashMap::new();
        sheets.insert(
            "hw.xlsx".to_string(),
            vec![
                header.clone(),
                cells(&["1", "Compute", "Server", "Tier1", "Obsolete", "Replace with cloud VM"]),
            ],
        );
        sheets.insert(
            "sw.xlsx".to_string(),
            vec![header, cells(&["1", "Apps", "CRM", "Tier2", "Active", ""])],
        );
        sheets
    }

    fn pipeline(
        broken_urls: Vec<String>,
        failing_uploads: Vec<String>,
        sheets: HashMap<String, Vec<Vec<String>>>,
    ) -> (TestPipeline, Outbox) {
        let notifier = MockNotifier::default();
        let outbox = Arc::clone(&notifier.sent);
        let service = PipelineService::new(
            MockFetcher { broken: broken_urls },
            MockReader { sheets },
            MockRenderer,
            MockPublisher {
                failing: failing_uploads,
                uploads: Mutex::new(Vec::new()),
            },
            notifier,
        );
        (service, outbox)
    }

    fn request(folder: &Path, files: Vec<FileRef>) -> PipelineRequest {
        PipelineRequest {
            session_id: "S-42".to_string(),
            email: "ops@example.com".to_string(),
            files,
            folder: folder.to_path_buf(),
        }
    }

    fn input(name: &str, file_type: FileType) -> FileRef {
        FileRef::new(name, Some(format!("https://files.test/{name}")), file_type)
    }

    #[tokio::test]
    async fn test_full_run_sends_inputs_then_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("Temp_S-42");
        let (service, notifier) = pipeline(vec![], vec![], scenario_sheets());

        let outcome = service
            .run(request(
                &folder,
                vec![
                    input("hw.xlsx", FileType::HardwareGap),
                    input("sw.xlsx", FileType::SoftwareGap),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(outcome.hardware_entries, 1);
        assert_eq!(outcome.software_entries, 1);
        assert_eq!(outcome.failed_uploads, 0);

        let sent = notifier.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let payload = &sent[0];
        assert_eq!(payload.gpt_module, "gap_target");
        assert_eq!(payload.status, "complete");

        let names: Vec<_> = payload.files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "hw.xlsx",
                "sw.xlsx",
                "Target_GAP_Analysis_Report.docx",
                "Target_GAP_Analysis_Executive_Report.pptx"
            ]
        );
        assert_eq!(payload.files[0].file_url.as_deref(), Some("https://drive.test/hw.xlsx"));
        assert_eq!(payload.files[2].file_type, FileType::ReportDocument);
        assert_eq!(payload.files[3].file_type, FileType::ReportDeck);
        assert!(folder.join("Target_GAP_Analysis_Report.docx").exists());
    }

    #[tokio::test]
    async fn test_artifacts_are_published_before_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _notifier) = pipeline(vec![], vec![], scenario_sheets());

        service
            .run(request(dir.path(), vec![input("hw.xlsx", FileType::HardwareGap)]))
            .await
            .unwrap();

        let uploads = service.publisher.uploads.lock().unwrap();
        let names: Vec<_> = uploads.iter().map(|(_, n)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Target_GAP_Analysis_Report.docx",
                "Target_GAP_Analysis_Executive_Report.pptx",
                "hw.xlsx"
            ]
        );
        assert!(uploads.iter().all(|(session, _)| session == "S-42"));
    }

    #[tokio::test]
    async fn test_failed_downloads_and_missing_urls_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let (service, notifier) = pipeline(
            vec!["https://files.test/sw.xlsx".to_string()],
            vec![],
            scenario_sheets(),
        );
        let no_url = FileRef::new("notes.txt", None, FileType::Other("notes".to_string()));

        let outcome = service
            .run(request(
                dir.path(),
                vec![
                    input("hw.xlsx", FileType::HardwareGap),
                    input("sw.xlsx", FileType::SoftwareGap),
                    no_url,
                ],
            ))
            .await
            .unwrap();

        assert_eq!(outcome.dropped_files, 2);
        assert_eq!(outcome.software_entries, 0);
        let sent = notifier.lock().unwrap();
        assert_eq!(sent[0].files.len(), 3);
        assert!(sent[0]
            .files
            .iter()
            .all(|f| f.file_name != "sw.xlsx" && f.file_name != "notes.txt"));
    }

    #[tokio::test]
    async fn test_upload_failure_yields_null_url_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let (service, notifier) = pipeline(
            vec![],
            vec!["Target_GAP_Analysis_Report.docx".to_string(), "hw.xlsx".to_string()],
            scenario_sheets(),
        );

        let outcome = service
            .run(request(dir.path(), vec![input("hw.xlsx", FileType::HardwareGap)]))
            .await
            .unwrap();

        assert_eq!(outcome.failed_uploads, 2);
        let sent = notifier.lock().unwrap();
        let by_name: HashMap<_, _> = sent[0]
            .files
            .iter()
            .map(|f| (f.file_name.as_str(), f.file_url.clone()))
            .collect();
        assert_eq!(by_name["hw.xlsx"], None);
        assert_eq!(by_name["Target_GAP_Analysis_Report.docx"], None);
        assert!(by_name["Target_GAP_Analysis_Executive_Report.pptx"].is_some());
    }

    #[tokio::test]
    async fn test_malformed_spreadsheet_aborts_without_callback() {
        let dir = tempfile::tempdir().unwrap();
        let (service, notifier) = pipeline(vec![], vec![], HashMap::new());

        let err = service
            .run(request(dir.path(), vec![input("hw.xlsx", FileType::HardwareGap)]))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Gap(GapError::Spreadsheet { .. })));
        assert!(notifier.lock().unwrap().is_empty());
        assert!(service.publisher.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_file_names_share_one_local_path() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _notifier) = pipeline(vec![], vec![], HashMap::new());

        let tag = FileType::Other("x".into());
        let first = FileRef::new("data.bin", Some("https://a.test/one".to_string()), tag.clone());
        let second = FileRef::new("data.bin", Some("https://a.test/two".to_string()), tag);

        let FetchOutcome::Fetched(a) = service.fetch_one(first, dir.path()).await else {
            panic!("first fetch failed");
        };
        let FetchOutcome::Fetched(b) = service.fetch_one(second, dir.path()).await else {
            panic!("second fetch failed");
        };

        assert_eq!(a.local_path, b.local_path);
        let content = std::fs::read_to_string(b.local_path.unwrap()).unwrap();
        assert_eq!(content, "https://a.test/two");
    }

    #[tokio::test]
    async fn test_file_names_cannot_leave_the_session_folder() {
        let base = tempfile::tempdir().unwrap();
        let folder = base.path().join("Temp_S-42");
        std::fs::create_dir_all(&folder).unwrap();
        let (service, _notifier) = pipeline(vec![], vec![], HashMap::new());

        for name in ["../Temp_other_session.bin", "/tmp/absolute.bin", "nested/x.bin", "..", ""] {
            let url = Some("https://a.test/x".to_string());
            let file = FileRef::new(name, url, FileType::HardwareGap);
            let outcome = service.fetch_one(file, &folder).await;
            assert!(
                matches!(outcome, FetchOutcome::Failed { error: FetchError::UnsafeName(_), .. }),
                "{name:?} was accepted"
            );
        }

        assert!(!base.path().join("Temp_other_session.bin").exists());
        assert_eq!(std::fs::read_dir(&folder).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unsafe_input_is_dropped_and_the_run_continues() {
        let dir = tempfile::tempdir().unwrap();
        let (service, notifier) = pipeline(vec![], vec![], scenario_sheets());

        let outcome = service
            .run(request(
                dir.path(),
                vec![
                    input("hw.xlsx", FileType::HardwareGap),
                    input("../sw.xlsx", FileType::SoftwareGap),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(outcome.dropped_files, 1);
        assert_eq!(outcome.hardware_entries, 1);
        assert_eq!(outcome.software_entries, 0);
        let sent = notifier.lock().unwrap();
        assert!(sent[0].files.iter().all(|f| f.file_name != "../sw.xlsx"));
    }
}
