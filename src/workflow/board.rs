use metrics::counter;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, RwLockReadGuard};

use super::{bounded, classify, CancellationState, CancellationWorkflow, RestoreWorkflow, RetryAction, TransitionError};
use crate::client::ClinicApi;
use crate::error::{AppError, AppResult, WorkflowError};
use crate::models::{AssignmentId, AssignmentStatus};
use crate::preview::ImpactPreviewService;
use crate::registry::ShiftRegistry;

/// Drives the cancellation and restore workflows of every assignment against
/// the clinic API. Owns the registry; the registry is only mutated here, after
/// the upstream confirmed the change. No lock is held across an upstream call.
pub struct WorkflowBoard {
    api: Arc<dyn ClinicApi>,
    previews: ImpactPreviewService,
    registry: RwLock<ShiftRegistry>,
    cancellations: Mutex<HashMap<AssignmentId, CancellationWorkflow>>,
    restores: Mutex<HashMap<AssignmentId, RestoreWorkflow>>,
    request_timeout: Duration,
}

impl WorkflowBoard {
    pub fn new(api: Arc<dyn ClinicApi>, registry: ShiftRegistry, request_timeout: Duration) -> Self {
        Self {
            previews: ImpactPreviewService::new(api.clone(), request_timeout),
            api,
            registry: RwLock::new(registry),
            cancellations: Mutex::new(HashMap::new()),
            restores: Mutex::new(HashMap::new()),
            request_timeout,
        }
    }

    pub async fn registry(&self) -> RwLockReadGuard<'_, ShiftRegistry> {
        self.registry.read().await
    }

    /// Reloads the registry. The old collection stays visible until the new one
    /// arrived; changes confirmed while the list was in flight are replayed onto it.
    pub async fn reload(&self) -> Result<usize, WorkflowError> {
        let token = self.registry.write().await.begin_reload();

        let fresh = match ShiftRegistry::fetch(self.api.as_ref(), self.request_timeout).await {
            Ok(fresh) => fresh,
            Err(e) => {
                self.registry.write().await.abort_reload(token);
                return Err(e);
            }
        };

        let (count, ids) = {
            let mut registry = self.registry.write().await;
            if !registry.finish_reload(token, fresh) {
                tracing::debug!(token, "Discarding a reload superseded by a newer one");
            }
            let ids: HashSet<AssignmentId> = registry.assignments().iter().map(|a| a.id).collect();
            (ids.len(), ids)
        };
        self.prune_workflows(&ids).await;

        tracing::info!(assignments = count, "Doctor shift registry reloaded");
        Ok(count)
    }

    /// Drops workflows of assignments that left the registry, unless an upstream call is pending.
    async fn prune_workflows(&self, ids: &HashSet<AssignmentId>) {
        self.cancellations
            .lock()
            .await
            .retain(|id, workflow| ids.contains(id) || workflow.is_in_flight());
        self.restores
            .lock()
            .await
            .retain(|id, workflow| ids.contains(id) || workflow.is_in_flight());
    }

    // ---- cancellation ----

    pub async fn cancellation(&self, id: AssignmentId) -> CancellationWorkflow {
        self.cancellations
            .lock()
            .await
            .get(&id)
            .cloned()
            .unwrap_or_else(|| CancellationWorkflow::new(id))
    }

    /// Opens the cancellation dialog for an active assignment and loads its impact preview.
    pub async fn select_for_cancellation(&self, id: AssignmentId) -> AppResult<CancellationWorkflow> {
        self.expect_active(id).await?;

        let attempt = {
            let mut workflows = self.cancellations.lock().await;
            let workflow = workflows
                .entry(id)
                .or_insert_with(|| CancellationWorkflow::new(id));
            workflow.select()?
        };

        tracing::info!(assignment_id = id, attempt, "Cancellation preview requested");
        Ok(self.load_preview(id, attempt).await)
    }

    pub async fn enter_reason(&self, id: AssignmentId, reason: String) -> AppResult<CancellationWorkflow> {
        self.expect_active(id).await?;
        let mut workflows = self.cancellations.lock().await;
        let workflow = workflows.get_mut(&id).ok_or_else(|| no_open_dialog(id))?;
        workflow.enter_reason(reason)?;
        Ok(workflow.clone())
    }

    /// Commits the cancellation. Upstream failures end in the `Failed` state and
    /// leave the registry untouched.
    pub async fn confirm_cancellation(&self, id: AssignmentId) -> AppResult<CancellationWorkflow> {
        self.expect_active(id).await?;
        let reason = {
            let mut workflows = self.cancellations.lock().await;
            let workflow = workflows.get_mut(&id).ok_or_else(|| no_open_dialog(id))?;
            workflow.begin_commit()?
        };

        tracing::info!(assignment_id = id, "Committing shift cancellation");
        let outcome = bounded(self.request_timeout, self.api.cancel_and_reschedule(id, &reason)).await;

        if let Ok(result) = &outcome {
            self.registry
                .write()
                .await
                .apply_status_change(id, AssignmentStatus::Cancelled, None);
            tracing::info!(
                assignment_id = id,
                total = result.total_appointments,
                rescheduled = result.rescheduled_count,
                failed = result.failed_count,
                "Shift cancelled"
            );
        }

        let mut workflows = self.cancellations.lock().await;
        let workflow = workflows.get_mut(&id).ok_or_else(|| no_open_dialog(id))?;
        match outcome {
            Ok(result) => {
                workflow.commit_succeeded(result)?;
                counter!("shift_cancellations_total", "outcome" => "succeeded").increment(1);
            }
            Err(e) => {
                tracing::error!(error = %e, assignment_id = id, "Shift cancellation failed");
                workflow.commit_failed(classify(&e, WorkflowError::Commit))?;
                counter!("shift_cancellations_total", "outcome" => "failed").increment(1);
            }
        }
        Ok(workflow.clone())
    }

    pub async fn retry_cancellation(&self, id: AssignmentId) -> AppResult<CancellationWorkflow> {
        self.expect_active(id).await?;
        let attempt = {
            let mut workflows = self.cancellations.lock().await;
            let workflow = workflows.get_mut(&id).ok_or_else(|| no_open_dialog(id))?;
            match workflow.retry()? {
                RetryAction::EditReason => return Ok(workflow.clone()),
                RetryAction::FetchPreview(attempt) => attempt,
            }
        };

        tracing::info!(assignment_id = id, attempt, "Retrying cancellation preview");
        Ok(self.load_preview(id, attempt).await)
    }

    /// Closes the dialog. The entry is kept only while a preview is still
    /// outstanding, so its attempt counter can drop the late result.
    pub async fn abandon_cancellation(&self, id: AssignmentId) -> AppResult<CancellationWorkflow> {
        let mut workflows = self.cancellations.lock().await;
        let Some(workflow) = workflows.get_mut(&id) else {
            return Ok(CancellationWorkflow::new(id));
        };

        let awaiting_preview = workflow.state() == &CancellationState::PreviewLoading;
        workflow.abandon()?;
        tracing::debug!(assignment_id = id, "Cancellation dialog closed");

        if awaiting_preview {
            return Ok(workflow.clone());
        }
        workflows.remove(&id);
        Ok(CancellationWorkflow::new(id))
    }

    async fn load_preview(&self, id: AssignmentId, attempt: u64) -> CancellationWorkflow {
        let outcome = self.previews.fetch_preview(id).await;

        let mut workflows = self.cancellations.lock().await;
        let Some(workflow) = workflows.get_mut(&id) else {
            tracing::debug!(assignment_id = id, attempt, "Dropping preview of a closed workflow");
            return CancellationWorkflow::new(id);
        };

        let applied = match outcome {
            Ok(preview) => workflow.preview_resolved(attempt, preview),
            Err(error) => {
                counter!("shift_cancellation_previews_failed_total").increment(1);
                workflow.preview_failed(attempt, error)
            }
        };
        if let Err(TransitionError::Stale) = applied {
            tracing::debug!(assignment_id = id, attempt, "Dropping preview of a superseded attempt");
        }

        workflow.clone()
    }

    // ---- restore ----

    pub async fn restore(&self, id: AssignmentId) -> RestoreWorkflow {
        self.restores
            .lock()
            .await
            .get(&id)
            .cloned()
            .unwrap_or_else(|| RestoreWorkflow::new(id))
    }

    pub async fn begin_restore(&self, id: AssignmentId) -> AppResult<RestoreWorkflow> {
        self.expect_cancelled(id).await?;

        let mut workflows = self.restores.lock().await;
        let workflow = workflows.entry(id).or_insert_with(|| RestoreWorkflow::new(id));
        workflow.begin()?;
        Ok(workflow.clone())
    }

    pub async fn confirm_restore(&self, id: AssignmentId) -> AppResult<RestoreWorkflow> {
        self.expect_cancelled(id).await?;
        {
            let mut workflows = self.restores.lock().await;
            let workflow = workflows.get_mut(&id).ok_or_else(|| no_open_dialog(id))?;
            workflow.confirm()?;
        }

        tracing::info!(assignment_id = id, "Restoring cancelled shift");
        let outcome = bounded(self.request_timeout, self.api.restore_shift(id)).await;

        if outcome.is_ok() {
            self.registry
                .write()
                .await
                .apply_status_change(id, AssignmentStatus::Active, None);
        }

        let mut workflows = self.restores.lock().await;
        let workflow = workflows.get_mut(&id).ok_or_else(|| no_open_dialog(id))?;
        match outcome {
            Ok(()) => {
                workflow.succeeded()?;
                counter!("shift_restores_total", "outcome" => "succeeded").increment(1);
            }
            Err(e) => {
                tracing::error!(error = %e, assignment_id = id, "Shift restore failed");
                workflow.failed(classify(&e, WorkflowError::Restore))?;
                counter!("shift_restores_total", "outcome" => "failed").increment(1);
            }
        }
        Ok(workflow.clone())
    }

    pub async fn abandon_restore(&self, id: AssignmentId) -> AppResult<RestoreWorkflow> {
        let mut workflows = self.restores.lock().await;
        if let Some(workflow) = workflows.get_mut(&id) {
            workflow.abandon()?;
            workflows.remove(&id);
        }
        Ok(RestoreWorkflow::new(id))
    }

    async fn expect_active(&self, id: AssignmentId) -> AppResult<()> {
        self.expect_status(id, AssignmentStatus::Active, "Chỉ có thể hủy ca trực đang hoạt động")
            .await
    }

    async fn expect_cancelled(&self, id: AssignmentId) -> AppResult<()> {
        self.expect_status(id, AssignmentStatus::Cancelled, "Chỉ có thể khôi phục ca trực đã hủy")
            .await
    }

    async fn expect_status(&self, id: AssignmentId, status: AssignmentStatus, message: &str) -> AppResult<()> {
        let registry = self.registry.read().await;
        let assignment = registry
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("Doctor shift {} not found", id)))?;

        if assignment.status != status {
            return Err(AppError::Conflict(message.to_string()));
        }
        Ok(())
    }
}

fn no_open_dialog(id: AssignmentId) -> AppError {
    AppError::NotFound(format!("No open workflow for doctor shift {}", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClinicError;
    use crate::models::{CancellationResult, Doctor, DoctorShiftRecord, ImpactPreview, Shift};
    use crate::workflow::{messages, CancellationState, RestoreState};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeApi {
        calls: StdMutex<Vec<String>>,
        preview_failures: StdMutex<u32>,
        commit_error: Option<ClinicError>,
        restore_error: Option<ClinicError>,
        commit_delay: Duration,
        list_delay: Duration,
        listing: StdMutex<Option<Vec<DoctorShiftRecord>>>,
    }

    impl FakeApi {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn serve_listing(&self, records: Vec<DoctorShiftRecord>) {
            *self.listing.lock().unwrap() = Some(records);
        }
    }

    #[async_trait]
    impl ClinicApi for FakeApi {
        async fn list_doctor_shifts(&self) -> Result<Vec<DoctorShiftRecord>, ClinicError> {
            self.record("list".to_string());
            tokio::time::sleep(self.list_delay).await;
            Ok(self.listing.lock().unwrap().clone().unwrap_or_else(fixture))
        }

        async fn preview_cancellation(&self, id: AssignmentId) -> Result<ImpactPreview, ClinicError> {
            self.record(format!("preview:{}", id));
            {
                let mut failures = self.preview_failures.lock().unwrap();
                if *failures > 0 {
                    *failures -= 1;
                    return Err(ClinicError::Status { status: 500, message: None });
                }
            }
            Ok(ImpactPreview {
                affected_appointments: 3,
                has_replacement_doctor: true,
                replacement_doctor_id: Some(42),
                can_auto_reschedule: true,
                warning: None,
            })
        }

        async fn cancel_and_reschedule(&self, id: AssignmentId, reason: &str) -> Result<CancellationResult, ClinicError> {
            self.record(format!("cancel:{}:{}", id, reason));
            tokio::time::sleep(self.commit_delay).await;
            if let Some(err) = &self.commit_error {
                return Err(err.clone());
            }
            Ok(CancellationResult {
                total_appointments: 3,
                rescheduled_count: 3,
                failed_count: 0,
            })
        }

        async fn restore_shift(&self, id: AssignmentId) -> Result<(), ClinicError> {
            self.record(format!("restore:{}", id));
            match &self.restore_error {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    fn record(id: i32, status: AssignmentStatus, replacement: Option<i32>) -> DoctorShiftRecord {
        DoctorShiftRecord {
            id,
            doctor: Doctor {
                id: 10 + id,
                full_name: format!("Bác sĩ A{}", id),
                specialty: Some("Nhi khoa".to_string()),
            },
            shift: Shift {
                id: 1,
                name: "Ca sáng".to_string(),
                start_time: "07:00".to_string(),
                end_time: "11:30".to_string(),
            },
            work_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            status,
            replacement_doctor_id: replacement,
            cancellation_reason: None,
        }
    }

    fn fixture() -> Vec<DoctorShiftRecord> {
        vec![
            record(1, AssignmentStatus::Active, None),
            record(2, AssignmentStatus::Active, None),
            record(3, AssignmentStatus::Cancelled, Some(77)),
        ]
    }

    fn board(api: FakeApi) -> (WorkflowBoard, Arc<FakeApi>) {
        board_with_timeout(api, Duration::from_secs(5))
    }

    fn board_with_timeout(api: FakeApi, timeout: Duration) -> (WorkflowBoard, Arc<FakeApi>) {
        let api = Arc::new(api);
        let registry = ShiftRegistry::from_records(fixture());
        (WorkflowBoard::new(api.clone(), registry, timeout), api)
    }

    async fn snapshot(board: &WorkflowBoard) -> ShiftRegistry {
        board.registry().await.clone()
    }

    #[tokio::test]
    async fn test_cancel_scenario_marks_exactly_one_assignment() {
        let (board, api) = board(FakeApi::default());
        let before = snapshot(&board).await;

        let workflow = board.select_for_cancellation(1).await.unwrap();
        assert!(matches!(workflow.state(), CancellationState::PreviewReady { .. }));

        board.enter_reason(1, "Bác sĩ nghỉ ốm".to_string()).await.unwrap();
        let workflow = board.confirm_cancellation(1).await.unwrap();

        match workflow.state() {
            CancellationState::Succeeded { message, .. } => assert!(message.contains("3/3")),
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(api.calls(), vec!["preview:1", "cancel:1:Bác sĩ nghỉ ốm"]);

        let after = snapshot(&board).await;
        for (old, new) in before.assignments().iter().zip(after.assignments()) {
            if old.id == 1 {
                assert_eq!(old.status, AssignmentStatus::Active);
                assert_eq!(new.status, AssignmentStatus::Cancelled);
            } else {
                assert_eq!(old, new);
            }
        }
    }

    #[tokio::test]
    async fn test_empty_reason_never_reaches_upstream() {
        let (board, api) = board(FakeApi::default());
        board.select_for_cancellation(1).await.unwrap();
        board.enter_reason(1, "".to_string()).await.unwrap();

        let err = board.confirm_cancellation(1).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == messages::REASON_REQUIRED));

        assert_eq!(api.calls(), vec!["preview:1"]);
        assert!(matches!(
            board.cancellation(1).await.state(),
            CancellationState::ReasonEntry { .. }
        ));
    }

    #[tokio::test]
    async fn test_confirm_without_preview_is_rejected() {
        let (board, api) = board(FakeApi::default());
        let err = board.confirm_cancellation(2).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_preview_failure_then_retry() {
        let api = FakeApi {
            preview_failures: StdMutex::new(1),
            ..FakeApi::default()
        };
        let (board, api) = board(api);
        let before = snapshot(&board).await;

        let workflow = board.select_for_cancellation(2).await.unwrap();
        match workflow.state() {
            CancellationState::Failed { error, preview, .. } => {
                assert_eq!(error, &WorkflowError::PreviewFetch(messages::GENERIC_FAILURE.to_string()));
                assert!(preview.is_none());
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(snapshot(&board).await, before);

        let workflow = board.retry_cancellation(2).await.unwrap();
        assert!(matches!(workflow.state(), CancellationState::PreviewReady { .. }));
        assert_eq!(api.calls(), vec!["preview:2", "preview:2"]);
    }

    #[tokio::test]
    async fn test_commit_failure_leaves_registry_untouched() {
        let api = FakeApi {
            commit_error: Some(ClinicError::Status {
                status: 409,
                message: Some("Ca trực đã có lịch hẹn đang khám".to_string()),
            }),
            ..FakeApi::default()
        };
        let (board, _) = board(api);
        let before = snapshot(&board).await;

        board.select_for_cancellation(1).await.unwrap();
        board.enter_reason(1, "Nghỉ phép".to_string()).await.unwrap();
        let workflow = board.confirm_cancellation(1).await.unwrap();

        match workflow.state() {
            CancellationState::Failed { error, reason, .. } => {
                assert_eq!(error, &WorkflowError::Commit("Ca trực đã có lịch hẹn đang khám".to_string()));
                assert_eq!(reason.as_deref(), Some("Nghỉ phép"));
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(snapshot(&board).await, before);

        let workflow = board.retry_cancellation(1).await.unwrap();
        assert!(matches!(workflow.state(), CancellationState::ReasonEntry { reason, .. } if reason == "Nghỉ phép"));
    }

    #[tokio::test]
    async fn test_slow_commit_times_out() {
        let api = FakeApi {
            commit_delay: Duration::from_secs(5),
            ..FakeApi::default()
        };
        let (board, _) = board_with_timeout(api, Duration::from_millis(50));
        let before = snapshot(&board).await;

        board.select_for_cancellation(1).await.unwrap();
        board.enter_reason(1, "lý do".to_string()).await.unwrap();
        let workflow = board.confirm_cancellation(1).await.unwrap();

        assert!(matches!(
            workflow.state(),
            CancellationState::Failed { error: WorkflowError::Timeout(_), .. }
        ));
        assert_eq!(snapshot(&board).await, before);
    }

    #[tokio::test]
    async fn test_second_confirm_while_committing_is_rejected() {
        let api = FakeApi {
            commit_delay: Duration::from_millis(200),
            ..FakeApi::default()
        };
        let (board, api) = board(api);
        let board = Arc::new(board);

        board.select_for_cancellation(1).await.unwrap();
        board.enter_reason(1, "lý do".to_string()).await.unwrap();

        let first = {
            let board = board.clone();
            tokio::spawn(async move { board.confirm_cancellation(1).await })
        };
        while !board.cancellation(1).await.is_in_flight() {
            tokio::task::yield_now().await;
        }

        let second = board.confirm_cancellation(1).await.unwrap_err();
        assert!(matches!(second, AppError::Conflict(_)));
        assert!(board.select_for_cancellation(1).await.is_err());

        first.await.unwrap().unwrap();
        let commits = api.calls().iter().filter(|c| c.starts_with("cancel:")).count();
        assert_eq!(commits, 1);
    }

    #[tokio::test]
    async fn test_only_active_assignments_can_be_cancelled() {
        let (board, api) = board(FakeApi::default());
        assert!(matches!(board.select_for_cancellation(3).await, Err(AppError::Conflict(_))));
        assert!(matches!(board.select_for_cancellation(99).await, Err(AppError::NotFound(_))));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_restore_scenario_only_touches_status() {
        let (board, api) = board(FakeApi::default());
        let before = snapshot(&board).await;

        let workflow = board.begin_restore(3).await.unwrap();
        assert_eq!(workflow.state(), &RestoreState::Confirming);

        let workflow = board.confirm_restore(3).await.unwrap();
        assert!(matches!(workflow.state(), RestoreState::Succeeded { .. }));
        assert_eq!(api.calls(), vec!["restore:3"]);

        let after = snapshot(&board).await;
        for (old, new) in before.assignments().iter().zip(after.assignments()) {
            if old.id == 3 {
                assert_eq!(new.status, AssignmentStatus::Active);
                assert_eq!(new.replacement_doctor_id, Some(77));
                assert_eq!(new.doctor, old.doctor);
                assert_eq!(new.work_date, old.work_date);
                assert_eq!(new.cancellation_reason, old.cancellation_reason);
            } else {
                assert_eq!(old, new);
            }
        }
    }

    #[tokio::test]
    async fn test_restore_failure_keeps_cancelled_status() {
        let api = FakeApi {
            restore_error: Some(ClinicError::Network("connection reset".to_string())),
            ..FakeApi::default()
        };
        let (board, _) = board(api);
        let before = snapshot(&board).await;

        board.begin_restore(3).await.unwrap();
        let workflow = board.confirm_restore(3).await.unwrap();

        assert_eq!(
            workflow.state(),
            &RestoreState::Failed {
                error: WorkflowError::Restore(messages::GENERIC_FAILURE.to_string())
            }
        );
        assert_eq!(snapshot(&board).await, before);
    }

    #[tokio::test]
    async fn test_cancel_then_restore_round_trip() {
        let (board, _) = board(FakeApi::default());
        let before = snapshot(&board).await;

        board.select_for_cancellation(2).await.unwrap();
        board.enter_reason(2, "Họp chuyên môn".to_string()).await.unwrap();
        board.confirm_cancellation(2).await.unwrap();
        assert!(board.begin_restore(2).await.is_ok());
        board.confirm_restore(2).await.unwrap();

        assert_eq!(snapshot(&board).await, before);
        assert!(board.select_for_cancellation(2).await.is_ok());
    }

    #[tokio::test]
    async fn test_abandon_closes_dialog() {
        let (board, _) = board(FakeApi::default());
        board.select_for_cancellation(1).await.unwrap();

        let workflow = board.abandon_cancellation(1).await.unwrap();
        assert_eq!(workflow.state(), &CancellationState::Idle);
        assert!(matches!(board.confirm_cancellation(1).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_abandon_forgets_the_workflow() {
        let (board, _) = board(FakeApi::default());
        board.select_for_cancellation(1).await.unwrap();
        board.enter_reason(1, "lý do".to_string()).await.unwrap();
        board.abandon_cancellation(1).await.unwrap();
        assert!(!board.cancellations.lock().await.contains_key(&1));

        board.begin_restore(3).await.unwrap();
        board.abandon_restore(3).await.unwrap();
        assert!(!board.restores.lock().await.contains_key(&3));
        assert!(matches!(board.confirm_restore(3).await, Err(AppError::NotFound(_))));

        let workflow = board.select_for_cancellation(1).await.unwrap();
        assert!(matches!(workflow.state(), CancellationState::PreviewReady { .. }));
    }

    #[tokio::test]
    async fn test_abandon_while_loading_still_drops_late_preview() {
        let api = FakeApi {
            preview_failures: StdMutex::new(1),
            ..FakeApi::default()
        };
        let (board, _) = board(api);

        // Failed without a preview, then the retry is abandoned before it resolves
        board.select_for_cancellation(2).await.unwrap();
        let attempt = {
            let mut workflows = board.cancellations.lock().await;
            match workflows.get_mut(&2).unwrap().retry().unwrap() {
                RetryAction::FetchPreview(attempt) => attempt,
                other => panic!("unexpected retry {:?}", other),
            }
        };
        board.abandon_cancellation(2).await.unwrap();

        let workflow = board.load_preview(2, attempt).await;
        assert_eq!(workflow.state(), &CancellationState::Idle);
    }

    #[tokio::test]
    async fn test_reload_keeps_cancellation_confirmed_while_listing() {
        let api = FakeApi {
            list_delay: Duration::from_millis(200),
            commit_delay: Duration::from_millis(50),
            ..FakeApi::default()
        };
        let (board, api) = board(api);

        let cancel = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            board.select_for_cancellation(1).await.unwrap();
            board.enter_reason(1, "lý do".to_string()).await.unwrap();
            board.confirm_cancellation(1).await.unwrap()
        };
        let (reloaded, workflow) = tokio::join!(board.reload(), cancel);

        assert_eq!(reloaded.unwrap(), 3);
        assert!(matches!(workflow.state(), CancellationState::Succeeded { .. }));
        assert_eq!(board.registry().await.get(1).unwrap().status, AssignmentStatus::Cancelled);
        assert_eq!(board.registry().await.get(2).unwrap().status, AssignmentStatus::Active);
        assert_eq!(api.calls()[0], "list");
    }

    #[tokio::test]
    async fn test_failed_workflow_rechecks_status_after_reload() {
        let api = FakeApi {
            commit_error: Some(ClinicError::Network("connection reset".to_string())),
            ..FakeApi::default()
        };
        let (board, api) = board(api);

        board.select_for_cancellation(1).await.unwrap();
        board.enter_reason(1, "Nghỉ phép".to_string()).await.unwrap();
        let workflow = board.confirm_cancellation(1).await.unwrap();
        assert!(matches!(workflow.state(), CancellationState::Failed { preview: Some(_), .. }));

        // Someone else cancelled the shift upstream
        let mut records = fixture();
        records[0].status = AssignmentStatus::Cancelled;
        api.serve_listing(records);
        board.reload().await.unwrap();

        assert!(matches!(board.retry_cancellation(1).await, Err(AppError::Conflict(_))));
        assert!(matches!(
            board.enter_reason(1, "khác".to_string()).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(board.confirm_cancellation(1).await, Err(AppError::Conflict(_))));

        let commits = api.calls().iter().filter(|c| c.starts_with("cancel:")).count();
        assert_eq!(commits, 1);
    }

    #[tokio::test]
    async fn test_reload_prunes_workflows_of_vanished_assignments() {
        let (board, api) = board(FakeApi::default());
        board.select_for_cancellation(1).await.unwrap();
        board.select_for_cancellation(2).await.unwrap();
        board.begin_restore(3).await.unwrap();

        api.serve_listing(vec![record(1, AssignmentStatus::Active, None)]);
        assert_eq!(board.reload().await.unwrap(), 1);

        assert!(board.cancellations.lock().await.contains_key(&1));
        assert!(!board.cancellations.lock().await.contains_key(&2));
        assert!(!board.restores.lock().await.contains_key(&3));
        assert!(matches!(board.confirm_restore(3).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_reload_replaces_registry() {
        let (board, api) = board(FakeApi::default());
        board.select_for_cancellation(1).await.unwrap();
        board.enter_reason(1, "lý do".to_string()).await.unwrap();
        board.confirm_cancellation(1).await.unwrap();

        let count = board.reload().await.unwrap();
        assert_eq!(count, 3);
        assert_eq!(board.registry().await.get(1).unwrap().status, AssignmentStatus::Active);
        assert_eq!(api.calls().last().map(String::as_str), Some("list"));
    }
}
