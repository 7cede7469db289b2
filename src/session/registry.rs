use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::types::{ImportSession, SessionState};
use super::SessionError;
use crate::autofix::{apply_auto_fixes, apply_manual_correction, AutoFixRecord};
use crate::classify::{classifier_from_config, map_and_validate_with, Classifier};
use crate::config::load_config;
use crate::ingest::ImportSource;
use crate::item::{ImportItem, SubjectType};
use crate::reconciliation::{commit_items, CommitContext, CommitSummary};
use crate::store::{load_references, JsonFileStore};
use crate::template::PromptEngine;
use crate::utils::{compute_bytes_hash, now_iso};

/// In-memory import sessions.
///
/// Sessions are not persisted; restarting the daemon drops them.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, ImportSession>>,
    /// One store per workspace so writers share a lock
    stores: Mutex<HashMap<PathBuf, Arc<JsonFileStore>>>,
    /// Used instead of the configured classifier when set
    classifier: Option<Arc<dyn Classifier>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classifier(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier: Some(classifier),
            ..Default::default()
        }
    }

    pub async fn store_for(&self, workspace: &Path) -> Arc<JsonFileStore> {
        let mut stores = self.stores.lock().await;
        stores
            .entry(workspace.to_path_buf())
            .or_insert_with(|| Arc::new(JsonFileStore::for_workspace(workspace)))
            .clone()
    }

    /// Parse an upload and open a session for it
    pub async fn upload(
        &self,
        workspace: &Path,
        subject: SubjectType,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ImportSession, SessionError> {
        let config = load_config(workspace).await?;
        let fingerprint = compute_bytes_hash(&bytes);
        let source = ImportSource::from_upload(file_name, bytes, config.max_upload_bytes)?;

        let session = ImportSession {
            id: uuid::Uuid::new_v4().to_string(),
            workspace: workspace.to_path_buf(),
            subject,
            file_name: file_name.to_string(),
            fingerprint,
            source,
            column_mapping: Vec::new(),
            items: Vec::new(),
            state: SessionState::Uploaded,
            created_at: now_iso(),
            last_commit: None,
        };

        info!(
            session = %session.id,
            %subject,
            file = %file_name,
            rows = session.row_count(),
            "Upload accepted"
        );

        self.sessions
            .lock()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    pub async fn get(&self, session_id: &str) -> Result<ImportSession, SessionError> {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    /// Run the mapping stage. Allowed again until the first commit.
    pub async fn classify(&self, session_id: &str) -> Result<ImportSession, SessionError> {
        let session = self.get(session_id).await?;
        require_uncommitted(&session, "classify")?;

        let config = load_config(&session.workspace).await?;
        let classifier: Arc<dyn Classifier> = match &self.classifier {
            Some(classifier) => classifier.clone(),
            None => Arc::from(classifier_from_config(&config.classifier)?),
        };

        let store = self.store_for(&session.workspace).await;
        let references = load_references(store.as_ref()).await?;
        let instructions = PromptEngine::new()?
            .render_for_workspace(&session.workspace, session.subject)
            .await?;

        let outcome = map_and_validate_with(
            classifier.as_ref(),
            session.subject,
            &session.source,
            &references,
            config.sample_size,
            instructions,
        )
        .await?;

        self.update(session_id, |stored| {
            require_uncommitted(stored, "classify")?;
            stored.column_mapping = outcome.column_mapping;
            stored.items = outcome.items;
            stored.state = SessionState::Classified;
            Ok(stored.clone())
        })
        .await
    }

    pub async fn apply_auto_fixes(&self, session_id: &str) -> Result<Vec<AutoFixRecord>, SessionError> {
        self.update(session_id, |session| {
            require_reviewable(session, "apply auto-fixes")?;
            Ok(apply_auto_fixes(&mut session.items))
        })
        .await
    }

    pub async fn correct_item(
        &self,
        session_id: &str,
        row: u32,
        field: &str,
        value: &str,
    ) -> Result<ImportItem, SessionError> {
        self.update(session_id, |session| {
            require_reviewable(session, "correct items")?;
            let item = session
                .items
                .iter_mut()
                .find(|item| item.row == row)
                .ok_or(SessionError::ItemNotFound(row))?;
            if item.committed {
                return Err(SessionError::ItemCommitted(row));
            }
            apply_manual_correction(item, field, value);
            Ok(item.clone())
        })
        .await
    }

    /// Drop uncommitted rows from the session; returns how many were removed
    pub async fn discard_items(&self, session_id: &str, rows: &[u32]) -> Result<usize, SessionError> {
        self.update(session_id, |session| {
            require_reviewable(session, "discard items")?;
            let before = session.items.len();
            session
                .items
                .retain(|item| item.committed || !rows.contains(&item.row));
            Ok(before - session.items.len())
        })
        .await
    }

    /// Persist the ready rows not stored by an earlier commit.
    ///
    /// Rows left pending or in error stay in the session; once fixed they go
    /// out with the next commit.
    pub async fn commit(&self, session_id: &str) -> Result<CommitSummary, SessionError> {
        // Edits and a second commit are refused until this one ends
        let (mut session, previous) = self
            .update(session_id, |session| {
                require_reviewable(session, "commit")?;
                let previous = session.state;
                session.state = SessionState::Committing;
                Ok((session.clone(), previous))
            })
            .await?;

        let store = self.store_for(&session.workspace).await;
        let mut ctx = match self.commit_context(&session, store.as_ref()).await {
            Ok(ctx) => ctx,
            Err(e) => {
                self.update(session_id, |stored| {
                    stored.state = previous;
                    Ok(())
                })
                .await?;
                return Err(e);
            }
        };

        let summary =
            commit_items(store.as_ref(), &mut ctx, session.subject, &mut session.items).await;

        self.update(session_id, |stored| {
            stored.items = session.items;
            stored.state = SessionState::Committed;
            stored.last_commit = Some(summary.clone());
            Ok(())
        })
        .await?;

        Ok(summary)
    }

    async fn commit_context(
        &self,
        session: &ImportSession,
        store: &JsonFileStore,
    ) -> Result<CommitContext, SessionError> {
        let config = load_config(&session.workspace).await?;
        Ok(CommitContext::load(store, config.code_width).await?)
    }

    async fn update<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut ImportSession) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        f(session)
    }
}

/// Items exist and no commit is running
fn require_reviewable(session: &ImportSession, operation: &'static str) -> Result<(), SessionError> {
    match session.state {
        SessionState::Classified | SessionState::Committed => Ok(()),
        state => Err(SessionError::InvalidState { operation, state }),
    }
}

fn require_uncommitted(session: &ImportSession, operation: &'static str) -> Result<(), SessionError> {
    match session.state {
        SessionState::Uploaded | SessionState::Classified => Ok(()),
        state => Err(SessionError::InvalidState { operation, state }),
    }
}
