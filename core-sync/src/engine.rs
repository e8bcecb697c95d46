//! Catalog reconciliation
//!
//! [`SyncEngine`] keeps a local catalog consistent with one remote library:
//!
//! - **add** walks the library and inserts records for audio files not yet
//!   cataloged
//! - **verify** re-extracts metadata for every record, writing back changes
//!   and deleting records whose file is gone
//! - **clean** only checks existence and deletes records whose file is gone
//!
//! Every run opens a fresh [`SyncSession`]. Per-file and per-record failures
//! are logged, reported as events and counted; only errors for which
//! [`SyncError::is_fatal`] holds end a run early.

use bridge_traits::storage::RemoteLibraryApi;
use core_library::models::{CatalogRecord, RecordId, RecordSummary};
use core_library::CatalogStore;
use core_metadata::{classify, MediaKind, TagReader};
use core_runtime::config::CatalogConfig;
use core_runtime::events::{CatalogEvent, EventBus, RunKind};
use futures::{pin_mut, StreamExt};
use provider_seafile::RateLimitedGateway;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempPath;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::crawler::{crawl, CrawledFile};
use crate::error::{Result, SyncError};
use crate::metadata_processor::{scoped_temp_file, MetadataProcessor};
use crate::report::{RunReport, NO_MEDIA_WARNING};
use crate::session::{LibraryClient, SyncSession};
use crate::virtual_path::{self, RemoteLocation, VirtualPath};

const ROOT_PATH: &str = "/";

const SKIP_EMPTY: &str = "empty file";
const SKIP_UNKNOWN_TYPE: &str = "unknown media file type";
const SKIP_NOT_GATHERED: &str = "bad media type for this catalog";
const SKIP_VIDEO: &str = "video ingestion not implemented";
const SKIP_EXISTING: &str = "already cataloged";

/// A remote file downloaded for playback.
///
/// The local copy is deleted when this value is dropped.
#[derive(Debug)]
pub struct MaterializedMedia {
    pub path: TempPath,
    pub size: u64,
    pub location: RemoteLocation,
}

/// Runs add, verify and clean for one catalog.
pub struct SyncEngine {
    config: CatalogConfig,
    api: Arc<dyn RemoteLibraryApi>,
    store: Arc<dyn CatalogStore>,
    processor: MetadataProcessor,
    events: EventBus,
    cancel: CancellationToken,
}

impl SyncEngine {
    pub fn new(
        config: CatalogConfig,
        api: Arc<dyn RemoteLibraryApi>,
        store: Arc<dyn CatalogStore>,
        tag_reader: Arc<dyn TagReader>,
    ) -> Self {
        let processor =
            MetadataProcessor::new(config.catalog_id, config.header_size_bytes, tag_reader);

        Self {
            config,
            api,
            store,
            processor,
            events: EventBus::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Observe `token`: cancelling it stops a running procedure between files
    /// or records, or while it waits out throttling.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Write temporary files under `dir` instead of the system default.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.processor = self.processor.with_temp_dir(dir);
        self
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Resolve the configured library and start a session.
    pub async fn open_session(&self) -> Result<SyncSession> {
        self.config.validate()?;

        let gateway =
            RateLimitedGateway::new(self.config.rate_limit).with_cancellation(self.cancel.clone());
        SyncSession::open(self.api.clone(), gateway, &self.config.library_name).await
    }

    /// Insert a record for every audio file in the library that is not yet
    /// cataloged.
    ///
    /// Re-running add never duplicates records: files whose virtual path is
    /// already stored are skipped.
    #[instrument(skip(self), fields(catalog_id = self.config.catalog_id))]
    pub async fn add(&self) -> Result<RunReport> {
        let mut report = RunReport::new(RunKind::Add);
        self.started(RunKind::Add);

        let outcome = async {
            let session = self.open_session().await?;
            self.add_from_library(session.client(), &mut report).await
        }
        .await;

        self.finish(report, outcome)
    }

    /// Refresh every record from its remote file, deleting records whose file
    /// is gone.
    #[instrument(skip(self), fields(catalog_id = self.config.catalog_id))]
    pub async fn verify(&self) -> Result<RunReport> {
        let mut report = RunReport::new(RunKind::Verify);
        self.started(RunKind::Verify);

        let outcome = async {
            let mut session = self.open_session().await?;
            self.verify_records(&mut session, &mut report).await
        }
        .await;

        self.finish(report, outcome)
    }

    /// Delete every record whose remote file no longer exists.
    #[instrument(skip(self), fields(catalog_id = self.config.catalog_id))]
    pub async fn clean(&self) -> Result<RunReport> {
        let mut report = RunReport::new(RunKind::Clean);
        self.started(RunKind::Clean);

        let outcome = async {
            let mut session = self.open_session().await?;
            self.clean_records(&mut session, &mut report).await
        }
        .await;

        self.finish(report, outcome)
    }

    /// Download the file behind a stored virtual path to a local temporary
    /// file for playback.
    ///
    /// # Errors
    ///
    /// Returns `MalformedVirtualPath` for an undecodable value, or the remote
    /// or IO error that stopped the download.
    #[instrument(skip(self))]
    pub async fn prepare_media(&self, file: &str) -> Result<MaterializedMedia> {
        let location = virtual_path::decode(file)?;
        let session = self.open_session().await?;
        let client = session.client();

        let url = client
            .download_url(&location.path, &location.file_name)
            .await?;
        let bytes = client.fetch(&url, None).await?;

        let temp = scoped_temp_file(&location.file_name, self.processor.temp_dir())?;
        tokio::fs::write(temp.path(), &bytes).await?;

        info!(file = %location.file_name, size = bytes.len(), "Materialized remote media");

        Ok(MaterializedMedia {
            path: temp.into_temp_path(),
            size: bytes.len() as u64,
            location,
        })
    }

    /// [`prepare_media`](Self::prepare_media) for a stored record.
    pub async fn prepare_record(&self, id: RecordId) -> Result<MaterializedMedia> {
        let record: CatalogRecord =
            self.store
                .get_record(id)
                .await?
                .ok_or_else(|| core_library::LibraryError::NotFound {
                    entity_type: "CatalogRecord".to_string(),
                    id: id.to_string(),
                })?;
        self.prepare_media(&record.file).await
    }

    async fn add_from_library(&self, client: &LibraryClient, report: &mut RunReport) -> Result<()> {
        let files = crawl(client, ROOT_PATH);
        pin_mut!(files);

        while let Some(item) = files.next().await {
            self.check_cancelled()?;

            let file = match item {
                Ok(file) => file,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(error = %e, "Directory listing failed, skipping subtree");
                    report.totals.failed += 1;
                    self.emit(CatalogEvent::Warning {
                        catalog_id: self.config.catalog_id,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            report.totals.processed += 1;
            self.add_file(client, &file, report).await?;
        }

        Ok(())
    }

    async fn add_file(
        &self,
        client: &LibraryClient,
        file: &CrawledFile,
        report: &mut RunReport,
    ) -> Result<()> {
        let name = &file.entry.name;
        let file_field = virtual_path::encode(&client.library().name, &file.path, name);

        if file.entry.size == 0 {
            self.skip(report, &file_field, SKIP_EMPTY);
            return Ok(());
        }

        let gather = self.config.gather;
        match classify(name) {
            MediaKind::Audio if gather.music => {}
            MediaKind::Video if gather.video => {
                self.skip(report, &file_field, SKIP_VIDEO);
                return Ok(());
            }
            MediaKind::Unsupported => {
                self.skip(report, &file_field, SKIP_UNKNOWN_TYPE);
                return Ok(());
            }
            MediaKind::Audio | MediaKind::Video => {
                self.skip(report, &file_field, SKIP_NOT_GATHERED);
                return Ok(());
            }
        }

        if self
            .store
            .find_record_by_virtual_path(self.config.catalog_id, &file_field)
            .await?
            .is_some()
        {
            debug!(file = %file_field, "Skipping existing record");
            self.skip(report, &file_field, SKIP_EXISTING);
            return Ok(());
        }

        let metadata = match self.processor.extract(client, &file.path, &file.entry).await {
            Ok(metadata) => metadata,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(file = %file_field, error = %e, "Metadata extraction failed");
                report.totals.failed += 1;
                self.emit(CatalogEvent::FileSkipped {
                    catalog_id: self.config.catalog_id,
                    file: file_field,
                    reason: format!("metadata extraction failed: {}", e),
                });
                return Ok(());
            }
        };

        let id = match self.store.insert_record(&metadata).await {
            Ok(id) => id,
            Err(e) => {
                let e = SyncError::from(e);
                if e.is_fatal() {
                    return Err(e);
                }
                self.rejected(report, &metadata.file, &e);
                return Ok(());
            }
        };
        report.totals.added += 1;
        info!(record_id = %id, file = %metadata.file, "Added record");
        self.emit(CatalogEvent::RecordAdded {
            catalog_id: self.config.catalog_id,
            record_id: id.0,
            file: metadata.file,
        });

        Ok(())
    }

    async fn verify_records(&self, session: &mut SyncSession, report: &mut RunReport) -> Result<()> {
        let records = self
            .store
            .list_records_for_catalog(self.config.catalog_id)
            .await?;

        info!(records = records.len(), "Verifying catalog records");

        for record in records {
            self.check_cancelled()?;
            report.totals.processed += 1;

            let Some(location) = self.decode_or_skip(&record, report) else {
                continue;
            };

            let entry = match session.locate(&location.path, &location.file_name).await {
                Ok(entry) => entry,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    self.existence_unknown(&record, &e, report);
                    continue;
                }
            };

            let Some(entry) = entry else {
                self.remove(&record, report).await?;
                continue;
            };

            match self
                .processor
                .extract(session.client(), &location.path, &entry)
                .await
            {
                Ok(metadata) => {
                    let changed = match self.store.update_record_if_changed(record.id, &metadata).await {
                        Ok(changed) => changed,
                        Err(e) => {
                            let e = SyncError::from(e);
                            if e.is_fatal() {
                                return Err(e);
                            }
                            self.rejected(report, &record.file, &e);
                            continue;
                        }
                    };
                    if changed {
                        report.totals.updated += 1;
                        info!(record_id = %record.id, file = %record.file, "Updated record");
                        self.emit(CatalogEvent::RecordUpdated {
                            catalog_id: self.config.catalog_id,
                            record_id: record.id.0,
                            file: record.file,
                        });
                    } else {
                        self.emit(CatalogEvent::RecordChecked {
                            catalog_id: self.config.catalog_id,
                            record_id: record.id.0,
                            file: record.file,
                        });
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) if e.is_local() => {
                    warn!(file = %record.file, error = %e, "Local failure during verify, keeping record");
                    report.totals.failed += 1;
                    self.emit(CatalogEvent::FileSkipped {
                        catalog_id: self.config.catalog_id,
                        file: record.file.clone(),
                        reason: format!("local failure: {}", e),
                    });
                }
                Err(e) => {
                    warn!(file = %record.file, error = %e, "Remote file unreadable, removing record");
                    self.remove(&record, report).await?;
                }
            }
        }

        Ok(())
    }

    async fn clean_records(&self, session: &mut SyncSession, report: &mut RunReport) -> Result<()> {
        let records = self
            .store
            .list_records_for_catalog(self.config.catalog_id)
            .await?;

        info!(records = records.len(), "Cleaning catalog records");

        for record in records {
            self.check_cancelled()?;
            report.totals.processed += 1;

            let Some(location) = self.decode_or_skip(&record, report) else {
                continue;
            };

            match session.locate(&location.path, &location.file_name).await {
                Ok(Some(_)) => {}
                Ok(None) => self.remove(&record, report).await?,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => self.existence_unknown(&record, &e, report),
            }
        }

        debug!(
            listings = session.cache().remote_listings(),
            "Clean finished listing directories"
        );

        Ok(())
    }

    fn decode_or_skip(&self, record: &RecordSummary, report: &mut RunReport) -> Option<RemoteLocation> {
        match VirtualPath::parse(&record.file) {
            Ok(path) => Some(path.into_location()),
            Err(e) => {
                error!(record_id = %record.id, error = %e, "Stored virtual path is malformed");
                report.totals.failed += 1;
                self.emit(CatalogEvent::FileSkipped {
                    catalog_id: self.config.catalog_id,
                    file: record.file.clone(),
                    reason: e.to_string(),
                });
                None
            }
        }
    }

    /// The remote neither confirmed nor denied the file; keep the record.
    fn existence_unknown(&self, record: &RecordSummary, error: &SyncError, report: &mut RunReport) {
        warn!(file = %record.file, error = %error, "Existence check failed, keeping record");
        report.totals.failed += 1;
        self.emit(CatalogEvent::FileSkipped {
            catalog_id: self.config.catalog_id,
            file: record.file.clone(),
            reason: format!("existence check failed: {}", error),
        });
    }

    async fn remove(&self, record: &RecordSummary, report: &mut RunReport) -> Result<()> {
        if !self.store.delete_record(record.id).await? {
            debug!(record_id = %record.id, "Record already gone");
            return Ok(());
        }

        report.totals.removed += 1;
        info!(record_id = %record.id, file = %record.file, "Removed record");
        self.emit(CatalogEvent::RecordRemoved {
            catalog_id: self.config.catalog_id,
            record_id: record.id.0,
            file: record.file.clone(),
        });
        Ok(())
    }

    /// The store refused the extracted metadata; nothing was written.
    fn rejected(&self, report: &mut RunReport, file: &str, error: &SyncError) {
        warn!(file, error = %error, "Catalog store rejected metadata");
        report.totals.failed += 1;
        self.emit(CatalogEvent::FileSkipped {
            catalog_id: self.config.catalog_id,
            file: file.to_string(),
            reason: format!("rejected by catalog store: {}", error),
        });
    }

    fn skip(&self, report: &mut RunReport, file: &str, reason: &str) {
        debug!(file, reason, "Skipping file");
        report.totals.skipped += 1;
        self.emit(CatalogEvent::FileSkipped {
            catalog_id: self.config.catalog_id,
            file: file.to_string(),
            reason: reason.to_string(),
        });
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn emit(&self, event: CatalogEvent) {
        self.events.emit(event).ok();
    }

    fn started(&self, run: RunKind) {
        info!(run = %run, library = %self.config.library_name, "Catalog run started");
        self.emit(CatalogEvent::RunStarted {
            catalog_id: self.config.catalog_id,
            run,
        });
    }

    fn finish(&self, mut report: RunReport, outcome: Result<()>) -> Result<RunReport> {
        let catalog_id = self.config.catalog_id;
        let run = report.run;

        match outcome {
            Ok(()) => {
                if run == RunKind::Add && report.totals.added == 0 {
                    warn!("{}", NO_MEDIA_WARNING);
                    report.warnings.push(NO_MEDIA_WARNING.to_string());
                    self.emit(CatalogEvent::Warning {
                        catalog_id,
                        message: NO_MEDIA_WARNING.to_string(),
                    });
                }

                let totals = report.totals;
                info!(
                    run = %run,
                    processed = totals.processed,
                    added = totals.added,
                    updated = totals.updated,
                    removed = totals.removed,
                    skipped = totals.skipped,
                    failed = totals.failed,
                    "Catalog run completed"
                );
                self.emit(CatalogEvent::RunCompleted {
                    catalog_id,
                    run,
                    totals,
                });
                Ok(report)
            }
            Err(SyncError::Cancelled) => {
                info!(run = %run, "Catalog run cancelled");
                self.emit(CatalogEvent::RunCancelled {
                    catalog_id,
                    run,
                    totals: report.totals,
                });
                Err(SyncError::Cancelled)
            }
            Err(e) => {
                error!(run = %run, error = %e, "Catalog run failed");
                self.emit(CatalogEvent::RunFailed {
                    catalog_id,
                    run,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }
}
