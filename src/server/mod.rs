use crate::autofix::AutoFixRecord;
use crate::ingest::ImportSource;
use crate::item::{ItemStatus as InternalItemStatus, Severity as InternalSeverity, SubjectType as InternalSubjectType};
use crate::reconciliation::CommitSummary as InternalCommitSummary;
use crate::session::{init_workspace, SessionRegistry};
use crate::utils::IMPORTER_VERSION;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tonic::{Request, Response, Status};
use tracing::info;

// Import generated protobuf types
pub mod proto {
    tonic::include_proto!("importer");
}

use proto::import_daemon_server::{ImportDaemon, ImportDaemonServer};
use proto::*;

/// gRPC message limit; uploads travel as one message, so this must stay above
/// the largest configured `maxUploadBytes` (tonic defaults to 4 MiB)
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

/// Signal sent from the Shutdown RPC to the server loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    None,
    Shutdown,
}

pub struct ImportDaemonService {
    registry: Arc<SessionRegistry>,
    shutdown_tx: Arc<watch::Sender<ShutdownSignal>>,
}

impl ImportDaemonService {
    pub fn new(registry: Arc<SessionRegistry>, shutdown_tx: Arc<watch::Sender<ShutdownSignal>>) -> Self {
        Self {
            registry,
            shutdown_tx,
        }
    }

    /// Wrap in the generated server with the given message size limit
    pub fn into_server(self, max_message_bytes: usize) -> ImportDaemonServer<Self> {
        ImportDaemonServer::new(self)
            .max_decoding_message_size(max_message_bytes)
            .max_encoding_message_size(max_message_bytes)
    }
}

#[tonic::async_trait]
impl ImportDaemon for ImportDaemonService {
    async fn init(&self, request: Request<InitRequest>) -> Result<Response<InitResponse>, Status> {
        let req = request.into_inner();

        match init_workspace(Path::new(&req.workspace_path)).await {
            Ok(outcome) => Ok(Response::new(InitResponse {
                success: true,
                error: String::new(),
                created_config: outcome.created_config,
                created_store: outcome.created_store,
            })),
            Err(e) => Ok(Response::new(InitResponse {
                success: false,
                error: e.to_string(),
                created_config: false,
                created_store: false,
            })),
        }
    }

    async fn upload_file(
        &self,
        request: Request<UploadFileRequest>,
    ) -> Result<Response<UploadFileResponse>, Status> {
        let req = request.into_inner();

        let Some(subject) = subject_from_proto(req.subject()) else {
            return Ok(Response::new(UploadFileResponse {
                success: false,
                error: "Subject type is required".to_string(),
                ..Default::default()
            }));
        };

        match self
            .registry
            .upload(Path::new(&req.workspace_path), subject, &req.file_name, req.content)
            .await
        {
            Ok(session) => {
                let (columns, warnings) = match &session.source {
                    ImportSource::Spreadsheet(sheet) => (sheet.columns.clone(), sheet.warnings.clone()),
                    ImportSource::Document(_) => (vec![], vec![]),
                };
                Ok(Response::new(UploadFileResponse {
                    success: true,
                    error: String::new(),
                    session_id: session.id.clone(),
                    row_count: session.row_count() as u32,
                    columns,
                    warnings,
                    fingerprint: session.fingerprint.clone(),
                    is_document: session.source.is_document(),
                }))
            }
            Err(e) => Ok(Response::new(UploadFileResponse {
                success: false,
                error: e.to_string(),
                ..Default::default()
            })),
        }
    }

    async fn classify_session(
        &self,
        request: Request<ClassifySessionRequest>,
    ) -> Result<Response<ClassifySessionResponse>, Status> {
        let req = request.into_inner();

        match self.registry.classify(&req.session_id).await {
            Ok(session) => Ok(Response::new(ClassifySessionResponse {
                success: true,
                error: String::new(),
                session: Some(session_to_proto(&session)),
            })),
            Err(e) => Ok(Response::new(ClassifySessionResponse {
                success: false,
                error: e.to_string(),
                session: None,
            })),
        }
    }

    async fn apply_auto_fixes(
        &self,
        request: Request<ApplyAutoFixesRequest>,
    ) -> Result<Response<ApplyAutoFixesResponse>, Status> {
        let req = request.into_inner();

        let result = match self.registry.apply_auto_fixes(&req.session_id).await {
            Ok(fixes) => self
                .registry
                .get(&req.session_id)
                .await
                .map(|session| (fixes, session)),
            Err(e) => Err(e),
        };

        match result {
            Ok((fixes, session)) => Ok(Response::new(ApplyAutoFixesResponse {
                success: true,
                error: String::new(),
                fixes: fixes.iter().map(fix_to_proto).collect(),
                session: Some(session_to_proto(&session)),
            })),
            Err(e) => Ok(Response::new(ApplyAutoFixesResponse {
                success: false,
                error: e.to_string(),
                fixes: vec![],
                session: None,
            })),
        }
    }

    async fn correct_item(
        &self,
        request: Request<CorrectItemRequest>,
    ) -> Result<Response<CorrectItemResponse>, Status> {
        let req = request.into_inner();

        match self
            .registry
            .correct_item(&req.session_id, req.row, &req.field, &req.value)
            .await
        {
            Ok(item) => Ok(Response::new(CorrectItemResponse {
                success: true,
                error: String::new(),
                item: Some(item_to_proto(&item)),
            })),
            Err(e) => Ok(Response::new(CorrectItemResponse {
                success: false,
                error: e.to_string(),
                item: None,
            })),
        }
    }

    async fn discard_items(
        &self,
        request: Request<DiscardItemsRequest>,
    ) -> Result<Response<DiscardItemsResponse>, Status> {
        let req = request.into_inner();

        match self.registry.discard_items(&req.session_id, &req.rows).await {
            Ok(discarded) => Ok(Response::new(DiscardItemsResponse {
                success: true,
                error: String::new(),
                discarded: discarded as u32,
            })),
            Err(e) => Ok(Response::new(DiscardItemsResponse {
                success: false,
                error: e.to_string(),
                discarded: 0,
            })),
        }
    }

    async fn commit_session(
        &self,
        request: Request<CommitSessionRequest>,
    ) -> Result<Response<CommitSessionResponse>, Status> {
        let req = request.into_inner();

        match self.registry.commit(&req.session_id).await {
            Ok(summary) => Ok(Response::new(CommitSessionResponse {
                success: true,
                error: String::new(),
                message: summary.message(),
                summary: Some(summary_to_proto(&summary)),
            })),
            Err(e) => Ok(Response::new(CommitSessionResponse {
                success: false,
                error: e.to_string(),
                summary: None,
                message: String::new(),
            })),
        }
    }

    async fn get_session(
        &self,
        request: Request<GetSessionRequest>,
    ) -> Result<Response<ImportSession>, Status> {
        let req = request.into_inner();

        match self.registry.get(&req.session_id).await {
            Ok(session) => Ok(Response::new(session_to_proto(&session))),
            Err(e) => Err(Status::not_found(e.to_string())),
        }
    }

    async fn get_daemon_info(
        &self,
        _request: Request<GetDaemonInfoRequest>,
    ) -> Result<Response<DaemonInfo>, Status> {
        Ok(Response::new(DaemonInfo {
            version: IMPORTER_VERSION.to_string(),
        }))
    }

    async fn shutdown(
        &self,
        _request: Request<ShutdownRequest>,
    ) -> Result<Response<ShutdownResponse>, Status> {
        info!("Shutdown requested");
        match self.shutdown_tx.send(ShutdownSignal::Shutdown) {
            Ok(()) => Ok(Response::new(ShutdownResponse {
                success: true,
                message: "Daemon is shutting down".to_string(),
            })),
            Err(e) => Ok(Response::new(ShutdownResponse {
                success: false,
                message: e.to_string(),
            })),
        }
    }
}

// Helper functions for converting internal types to proto types

fn subject_from_proto(subject: SubjectType) -> Option<InternalSubjectType> {
    match subject {
        SubjectType::Customers => Some(InternalSubjectType::Customers),
        SubjectType::Products => Some(InternalSubjectType::Products),
        SubjectType::Sales => Some(InternalSubjectType::Sales),
        SubjectType::Unspecified => None,
    }
}

fn subject_to_proto(subject: InternalSubjectType) -> SubjectType {
    match subject {
        InternalSubjectType::Customers => SubjectType::Customers,
        InternalSubjectType::Products => SubjectType::Products,
        InternalSubjectType::Sales => SubjectType::Sales,
    }
}

fn status_to_proto(status: InternalItemStatus) -> ItemStatus {
    match status {
        InternalItemStatus::Ready => ItemStatus::Ready,
        InternalItemStatus::NeedsCorrection => ItemStatus::NeedsCorrection,
        InternalItemStatus::Error => ItemStatus::Error,
    }
}

fn severity_to_proto(severity: InternalSeverity) -> Severity {
    match severity {
        InternalSeverity::Warning => Severity::Warning,
        InternalSeverity::Error => Severity::Error,
    }
}

fn item_to_proto(item: &crate::item::ImportItem) -> ImportItem {
    ImportItem {
        row: item.row,
        original_data: item
            .original_data
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.as_text()))
            .collect(),
        mapped_data: item.mapped_data.clone().into_iter().collect(),
        status: status_to_proto(item.status) as i32,
        issues: item
            .issues
            .iter()
            .map(|issue| ImportIssue {
                field: issue.field.clone(),
                problem: issue.problem.clone(),
                current_value: issue.current_value.clone(),
                suggested_value: issue.suggested_value.clone(),
                severity: severity_to_proto(issue.severity) as i32,
                can_auto_fix: issue.can_auto_fix,
            })
            .collect(),
        needs_entity_creation: item.needs_entity_creation,
        matched_reference_name: item.matched_reference_name.clone(),
        committed: item.committed,
    }
}

fn fix_to_proto(fix: &AutoFixRecord) -> AutoFix {
    AutoFix {
        row: fix.row,
        field: fix.field.clone(),
        problem: fix.problem.clone(),
        original_value: fix.original_value.clone(),
        new_value: fix.new_value.clone(),
    }
}

fn summary_to_proto(summary: &InternalCommitSummary) -> CommitSummary {
    CommitSummary {
        created: summary.created,
        skipped_duplicates: summary.skipped_duplicates,
        customers_auto_created: summary.customers_auto_created,
        errored: summary.errored,
        pending_review: summary.pending_review,
        failed_rows: summary
            .failed_rows
            .iter()
            .map(|f| RowFailure {
                row: f.row,
                message: f.message.clone(),
            })
            .collect(),
    }
}

fn session_to_proto(session: &crate::session::ImportSession) -> ImportSession {
    let counts = session.status_counts();
    ImportSession {
        id: session.id.clone(),
        workspace_path: session.workspace.to_string_lossy().to_string(),
        subject: subject_to_proto(session.subject) as i32,
        file_name: session.file_name.clone(),
        fingerprint: session.fingerprint.clone(),
        state: session.state.as_str().to_string(),
        column_mapping: session
            .column_mapping
            .iter()
            .map(|m| ColumnMapping {
                source_column: m.source_column.clone(),
                canonical_field: m.canonical_field.clone(),
                confidence: m.confidence,
            })
            .collect(),
        items: session.items.iter().map(item_to_proto).collect(),
        ready_count: counts.ready,
        needs_correction_count: counts.needs_correction,
        error_count: counts.error,
        created_at: session.created_at.clone(),
        last_commit: session.last_commit.as_ref().map(summary_to_proto),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImporterConfig;

    #[test]
    fn test_message_limit_fits_default_upload() {
        // Leaves room for the file name and protobuf framing
        let max_upload = ImporterConfig::default().max_upload_bytes;
        assert!(DEFAULT_MAX_MESSAGE_BYTES >= max_upload + 64 * 1024);
    }

    #[tokio::test]
    async fn test_oversized_upload_gets_summary() {
        let temp = tempfile::tempdir().unwrap();
        init_workspace(temp.path()).await.unwrap();
        let (shutdown_tx, _) = watch::channel(ShutdownSignal::None);
        let service = ImportDaemonService::new(Arc::new(SessionRegistry::new()), Arc::new(shutdown_tx));

        let max_upload = ImporterConfig::default().max_upload_bytes;
        let response = service
            .upload_file(Request::new(UploadFileRequest {
                workspace_path: temp.path().to_string_lossy().to_string(),
                subject: SubjectType::Customers as i32,
                file_name: "clientes.csv".to_string(),
                content: vec![b'a'; max_upload + 1],
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(!response.success);
        assert!(response.error.contains("too large"), "{}", response.error);
    }
}
