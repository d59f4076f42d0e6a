//! Per-session result holder
//!
//! A board keeps at most one result per attribute, all from the same
//! document-processing session. Starting a new session wipes it; results
//! tagged with any other session are refused, so an in-flight batch from
//! before a re-ingestion can never mix its values into the new set.

use crate::error::ExtractorError;
use crate::extractor::Extractor;
use crate::types::{BatchReport, BatchRequest, NormalizedResult};
use sheetwise_domain::{LlmProvider, Retriever, SessionId};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Default)]
struct BoardState {
    session: Option<SessionId>,
    results: Vec<NormalizedResult>,
}

impl BoardState {
    fn switch_to(&mut self, session: SessionId) {
        if self.session != Some(session) {
            info!("Starting session {} ({} results discarded)", session, self.results.len());
            self.session = Some(session);
            self.results.clear();
        }
    }
}

/// Latest results for the current session
#[derive(Debug, Default)]
pub struct ResultBoard {
    state: RwLock<BoardState>,
}

impl ResultBoard {
    /// Create an empty board with no session
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BoardState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BoardState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Switch to a new session, discarding every existing result
    pub fn begin_session(&self, session: SessionId) {
        self.write().switch_to(session);
    }

    /// Pick the session a batch runs under and make it current
    ///
    /// Decided and applied under one write lock, so a session begun by
    /// another caller in between is never rolled back.
    fn claim_session(&self, requested: Option<SessionId>) -> Result<SessionId, ExtractorError> {
        let mut state = self.write();
        let session = match (requested, state.session) {
            (Some(requested), Some(current)) if requested != current => {
                return Err(ExtractorError::SessionInvalidated(requested.to_string()));
            }
            (Some(requested), _) => requested,
            (None, Some(current)) => current,
            (None, None) => SessionId::new(),
        };
        state.switch_to(session);
        Ok(session)
    }

    /// Current session, if any
    pub fn current_session(&self) -> Option<SessionId> {
        self.read().session
    }

    /// Store a result, replacing any earlier one for the same attribute
    ///
    /// Fails when `session` is not the current session.
    pub fn publish(&self, session: SessionId, result: NormalizedResult) -> Result<(), ExtractorError> {
        let mut state = self.write();
        if state.session != Some(session) {
            return Err(ExtractorError::SessionInvalidated(session.to_string()));
        }

        match state
            .results
            .iter_mut()
            .find(|existing| existing.attribute_key == result.attribute_key)
        {
            Some(existing) => *existing = result,
            None => state.results.push(result),
        }
        Ok(())
    }

    /// Result for one attribute
    pub fn get(&self, attribute: &str) -> Option<NormalizedResult> {
        self.read()
            .results
            .iter()
            .find(|r| r.attribute_key == attribute)
            .cloned()
    }

    /// Copy of every result, in publication order
    pub fn snapshot(&self) -> Vec<NormalizedResult> {
        self.read().results.clone()
    }

    /// Number of results held
    pub fn len(&self) -> usize {
        self.read().results.len()
    }

    /// True when no results are held
    pub fn is_empty(&self) -> bool {
        self.read().results.is_empty()
    }

    /// Run a batch whose results land on this board as they complete
    ///
    /// The batch runs under the request's session, or the board's current
    /// session, or a fresh one. If another session begins while it runs, the
    /// batch stops and `SessionInvalidated` is returned.
    pub async fn run<L, R>(
        &self,
        extractor: &Extractor<L, R>,
        request: BatchRequest,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, ExtractorError>
    where
        L: LlmProvider,
        R: Retriever,
    {
        let session = self.claim_session(request.session)?;

        let batch_cancel = cancel.child_token();
        let request = request.with_session(session);
        let report = extractor
            .run_batch_with(&request, &batch_cancel, |result| {
                if self.publish(session, result.clone()).is_err() {
                    warn!("Session {} replaced mid-batch, stopping", session);
                    batch_cancel.cancel();
                }
            })
            .await?;

        if self.current_session() != Some(session) {
            return Err(ExtractorError::SessionInvalidated(session.to_string()));
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use sheetwise_domain::ContextSource;

    fn result(key: &str, value: &str) -> NormalizedResult {
        let raw = format!("{{\"{}\": \"{}\"}}", key, value);
        classify(key, Some(&raw), ContextSource::Document)
    }

    #[test]
    fn test_publish_requires_current_session() {
        let board = ResultBoard::new();
        let session = SessionId::new();

        assert!(board.publish(session, result("Gender", "Male")).is_err());

        board.begin_session(session);
        assert!(board.publish(session, result("Gender", "Male")).is_ok());
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_one_result_per_attribute() {
        let board = ResultBoard::new();
        let session = SessionId::new();
        board.begin_session(session);

        board.publish(session, result("Gender", "Male")).unwrap();
        board.publish(session, result("Colour", "black")).unwrap();
        board.publish(session, result("Gender", "Female")).unwrap();

        assert_eq!(board.len(), 2);
        assert_eq!(board.get("Gender").unwrap().display_value, "Female");
        let keys: Vec<_> = board.snapshot().into_iter().map(|r| r.attribute_key).collect();
        assert_eq!(keys, vec!["Gender", "Colour"]);
    }

    #[test]
    fn test_new_session_discards_results() {
        let board = ResultBoard::new();
        let old = SessionId::from_value(1);
        let new = SessionId::from_value(2);

        board.begin_session(old);
        board.publish(old, result("Gender", "Male")).unwrap();

        board.begin_session(new);
        assert!(board.is_empty());
        assert_eq!(
            board.publish(old, result("Colour", "black")),
            Err(ExtractorError::SessionInvalidated(old.to_string()))
        );
        assert!(board.get("Colour").is_none());
    }

    #[test]
    fn test_restarting_same_session_keeps_results() {
        let board = ResultBoard::new();
        let session = SessionId::new();
        board.begin_session(session);
        board.publish(session, result("Gender", "Male")).unwrap();

        board.begin_session(session);
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_stale_claim_leaves_newer_session_alone() {
        let board = ResultBoard::new();
        let stale = SessionId::from_value(1);
        let fresh = SessionId::from_value(2);

        board.begin_session(stale);
        board.begin_session(fresh);
        board.publish(fresh, result("Gender", "Male")).unwrap();

        assert_eq!(
            board.claim_session(Some(stale)),
            Err(ExtractorError::SessionInvalidated(stale.to_string()))
        );
        assert_eq!(board.current_session(), Some(fresh));
        assert_eq!(board.get("Gender").unwrap().display_value, "Male");

        assert_eq!(board.claim_session(None), Ok(fresh));
        assert_eq!(board.claim_session(Some(fresh)), Ok(fresh));
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_claim_without_session_starts_one() {
        let board = ResultBoard::new();
        let session = board.claim_session(None).unwrap();
        assert_eq!(board.current_session(), Some(session));
    }
}
