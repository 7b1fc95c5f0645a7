//! Client-side session state machine for the check-in quiz.
//!
//! The controller owns a single [`SessionSnapshot`]. Every operation mutates it
//! under a lock that is never held across a remote call, so each suspension
//! point observes a consistent snapshot. Results of calls started before the
//! last [`SessionController::reset`] are dropped by comparing the session
//! generation captured at call start.

use std::sync::Arc;

use checkin_shared::{
    domain::{find_employee, Employee, EmployeeId, Question, SessionMode},
    error::SessionError,
    protocol::{FeedbackRequest, WriteSummaryRequest},
};
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::service::CheckinService;

/// Stored as feedback when grading succeeds without returning any text.
pub const EMPTY_FEEDBACK_ACK: &str = "Answer recorded.";

const EVENT_CAPACITY: usize = 256;

/// The remote operation currently in flight, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activity {
    #[default]
    Idle,
    Identifying,
    LoadingQuestion,
    SubmittingAnswer,
    RecordingResult,
    LoadingSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unidentified,
    AwaitingQuestion,
    AwaitingSummary,
    QuizActive,
    SubmittingAnswer,
    FeedbackShown,
    SummaryShown,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub mode: SessionMode,
    pub employee_input: String,
    pub employee: Option<Employee>,
    pub question: Option<Question>,
    pub feedback: Option<String>,
    /// The current question has been graded. Only a newly fetched question
    /// clears it.
    pub answered: bool,
    pub summary: Option<String>,
    pub error: Option<SessionError>,
    pub activity: Activity,
}

impl SessionSnapshot {
    pub fn initial(mode: SessionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.employee.is_none() {
            return SessionPhase::Unidentified;
        }

        match self.activity {
            Activity::LoadingQuestion => return SessionPhase::AwaitingQuestion,
            Activity::LoadingSummary => return SessionPhase::AwaitingSummary,
            Activity::SubmittingAnswer => return SessionPhase::SubmittingAnswer,
            Activity::Idle | Activity::Identifying | Activity::RecordingResult => {}
        }

        match self.mode {
            SessionMode::Quiz if self.feedback.is_some() => SessionPhase::FeedbackShown,
            SessionMode::Quiz if self.question.is_some() && !self.answered => {
                SessionPhase::QuizActive
            }
            SessionMode::Summary if self.summary.is_some() => SessionPhase::SummaryShown,
            _ => SessionPhase::Errored,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.activity != Activity::Idle
    }

    pub fn is_identifying(&self) -> bool {
        self.activity == Activity::Identifying
    }

    pub fn is_loading_question(&self) -> bool {
        self.activity == Activity::LoadingQuestion
    }

    pub fn is_submitting(&self) -> bool {
        self.activity == Activity::SubmittingAnswer
    }

    pub fn is_recording_result(&self) -> bool {
        self.activity == Activity::RecordingResult
    }

    pub fn is_loading_summary(&self) -> bool {
        self.activity == Activity::LoadingSummary
    }

    fn clear_content(&mut self) {
        self.employee = None;
        self.question = None;
        self.feedback = None;
        self.answered = false;
        self.summary = None;
        self.error = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmptyIdentifier,
    Busy(Activity),
    NotIdentified,
    EmployeeMismatch,
    WrongMode(SessionMode),
    NoQuestion,
    NotAnswered,
    AlreadyAnswered,
    NothingToRetry,
}

/// What became of an operation. Failures of the remote calls themselves are
/// reported through [`SessionSnapshot::error`], never here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    Applied,
    Rejected(RejectReason),
    /// The session was reset while the call was in flight.
    Discarded,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Changed(SessionSnapshot),
    StaleCompletionDiscarded { activity: Activity },
}

struct SessionState {
    snapshot: SessionSnapshot,
    generation: u64,
}

pub struct SessionController {
    service: Arc<dyn CheckinService>,
    inner: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    pub fn new(service: Arc<dyn CheckinService>) -> Arc<Self> {
        Self::with_mode(service, SessionMode::default())
    }

    pub fn with_mode(service: Arc<dyn CheckinService>, mode: SessionMode) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            service,
            inner: Mutex::new(SessionState {
                snapshot: SessionSnapshot::initial(mode),
                generation: 0,
            }),
            events,
        })
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().await.snapshot.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn set_employee_input(&self, text: &str) -> OperationOutcome {
        let mut inner = self.inner.lock().await;
        if inner.snapshot.is_busy() {
            return self.reject(RejectReason::Busy(inner.snapshot.activity));
        }
        if inner.snapshot.employee_input != text {
            inner.snapshot.employee_input = text.to_string();
            self.publish(&inner);
        }
        OperationOutcome::Applied
    }

    /// Resolves `raw_input` against a freshly fetched directory and chains
    /// into the question or summary fetch for `mode`.
    pub async fn identify(&self, raw_input: &str, mode: SessionMode) -> OperationOutcome {
        let trimmed = raw_input.trim();
        let generation = {
            let mut inner = self.inner.lock().await;
            if inner.snapshot.is_busy() {
                return self.reject(RejectReason::Busy(inner.snapshot.activity));
            }
            if trimmed.is_empty() {
                return self.reject(RejectReason::EmptyIdentifier);
            }

            inner.snapshot.clear_content();
            inner.snapshot.employee_input = raw_input.to_string();
            inner.snapshot.mode = mode;
            inner.snapshot.activity = Activity::Identifying;
            self.publish(&inner);
            inner.generation
        };

        info!(employee_id = trimmed, ?mode, generation, "session: identifying");
        let directory = self.service.list_employees().await;

        let employee_id = {
            let Some(mut inner) = self.current(generation, Activity::Identifying).await else {
                return OperationOutcome::Discarded;
            };

            let employee = match directory {
                Ok(directory) => find_employee(&directory, trimmed).cloned(),
                Err(err) => {
                    warn!(error = %err, "session: employee directory unavailable");
                    inner.snapshot.error = Some(SessionError::DirectoryUnreachable);
                    inner.snapshot.activity = Activity::Idle;
                    self.publish(&inner);
                    return OperationOutcome::Applied;
                }
            };

            let Some(employee) = employee else {
                info!(employee_id = trimmed, "session: employee not in directory");
                inner.snapshot.error = Some(SessionError::EmployeeNotFound);
                inner.snapshot.activity = Activity::Idle;
                self.publish(&inner);
                return OperationOutcome::Applied;
            };

            let employee_id = employee.id.clone();
            inner.snapshot.employee = Some(employee);
            inner.snapshot.error = None;
            inner.snapshot.activity = match mode {
                SessionMode::Quiz => Activity::LoadingQuestion,
                SessionMode::Summary => Activity::LoadingSummary,
            };
            self.publish(&inner);
            employee_id
        };

        match mode {
            SessionMode::Quiz => self.load_question(generation, employee_id).await,
            SessionMode::Summary => self.load_summary(generation, employee_id).await,
        }
    }

    /// Replaces the current question for the identified employee. Any
    /// feedback for the previous question is dropped.
    pub async fn fetch_question(&self, employee_id: &EmployeeId) -> OperationOutcome {
        let generation = {
            let mut inner = self.inner.lock().await;
            if let Err(reason) =
                Self::check_ready(&inner.snapshot, employee_id, SessionMode::Quiz)
            {
                return self.reject(reason);
            }

            inner.snapshot.feedback = None;
            inner.snapshot.error = None;
            inner.snapshot.activity = Activity::LoadingQuestion;
            self.publish(&inner);
            inner.generation
        };

        self.load_question(generation, employee_id.clone()).await
    }

    pub async fn fetch_summary(&self, employee_id: &EmployeeId) -> OperationOutcome {
        let generation = {
            let mut inner = self.inner.lock().await;
            if let Err(reason) =
                Self::check_ready(&inner.snapshot, employee_id, SessionMode::Summary)
            {
                return self.reject(reason);
            }

            inner.snapshot.error = None;
            inner.snapshot.activity = Activity::LoadingSummary;
            self.publish(&inner);
            inner.generation
        };

        self.load_summary(generation, employee_id.clone()).await
    }

    /// Leaves the feedback view and fetches the next question. Also retries
    /// a next-question fetch that failed.
    pub async fn next_question(&self) -> OperationOutcome {
        let employee_id = {
            let inner = self.inner.lock().await;
            let snapshot = &inner.snapshot;
            if snapshot.is_busy() {
                return self.reject(RejectReason::Busy(snapshot.activity));
            }
            let Some(employee) = &snapshot.employee else {
                return self.reject(RejectReason::NotIdentified);
            };
            if snapshot.mode != SessionMode::Quiz {
                return self.reject(RejectReason::WrongMode(snapshot.mode));
            }

            let fetch_failed = matches!(
                snapshot.error,
                Some(SessionError::QuestionFetchFailed { .. })
            );
            match snapshot.phase() {
                SessionPhase::FeedbackShown | SessionPhase::Errored => {}
                SessionPhase::QuizActive if fetch_failed => {}
                _ => return self.reject(RejectReason::NotAnswered),
            }
            employee.id.clone()
        };

        self.fetch_question(&employee_id).await
    }

    /// Re-issues the fetch that left an identified session without content.
    pub async fn retry(&self) -> OperationOutcome {
        let (employee_id, mode) = {
            let inner = self.inner.lock().await;
            let snapshot = &inner.snapshot;
            if snapshot.is_busy() {
                return self.reject(RejectReason::Busy(snapshot.activity));
            }
            let Some(employee) = &snapshot.employee else {
                return self.reject(RejectReason::NotIdentified);
            };
            if snapshot.phase() != SessionPhase::Errored {
                return self.reject(RejectReason::NothingToRetry);
            }
            (employee.id.clone(), snapshot.mode)
        };

        match mode {
            SessionMode::Quiz => self.fetch_question(&employee_id).await,
            SessionMode::Summary => self.fetch_summary(&employee_id).await,
        }
    }

    /// Grades `selected_option` for the current question, then records the
    /// result in the employee's summary log. A failed recording leaves the
    /// feedback on screen.
    pub async fn submit_answer(&self, selected_option: &str) -> OperationOutcome {
        let (generation, request) = {
            let mut inner = self.inner.lock().await;
            let snapshot = &inner.snapshot;
            let (Some(employee), Some(question)) = (&snapshot.employee, &snapshot.question) else {
                return self.reject(if snapshot.employee.is_none() {
                    RejectReason::NotIdentified
                } else {
                    RejectReason::NoQuestion
                });
            };
            if snapshot.is_busy() {
                return self.reject(RejectReason::Busy(snapshot.activity));
            }
            if snapshot.answered {
                return self.reject(RejectReason::AlreadyAnswered);
            }

            let request = FeedbackRequest {
                employee_id: employee.id.clone(),
                question: question.question.clone(),
                answer: selected_option.to_string(),
                options: question.options.clone(),
            };
            inner.snapshot.error = None;
            inner.snapshot.activity = Activity::SubmittingAnswer;
            self.publish(&inner);
            (inner.generation, request)
        };

        info!(employee_id = %request.employee_id, generation, "session: submitting answer");
        let graded = self.service.get_feedback(&request).await;

        {
            let Some(mut inner) = self.current(generation, Activity::SubmittingAnswer).await else {
                return OperationOutcome::Discarded;
            };
            match graded {
                Ok(feedback) => {
                    inner.snapshot.feedback =
                        Some(feedback.unwrap_or_else(|| EMPTY_FEEDBACK_ACK.to_string()));
                    inner.snapshot.answered = true;
                    inner.snapshot.activity = Activity::RecordingResult;
                    self.publish(&inner);
                }
                Err(err) => {
                    warn!(
                        employee_id = %request.employee_id,
                        error = %err,
                        "session: grading failed"
                    );
                    inner.snapshot.error = Some(SessionError::SubmissionFailed);
                    inner.snapshot.activity = Activity::Idle;
                    self.publish(&inner);
                    return OperationOutcome::Applied;
                }
            }
        }

        let recorded = self
            .service
            .write_summary(&WriteSummaryRequest::from(&request))
            .await;

        let Some(mut inner) = self.current(generation, Activity::RecordingResult).await else {
            return OperationOutcome::Discarded;
        };
        if let Err(err) = recorded {
            warn!(
                employee_id = %request.employee_id,
                error = %err,
                "session: recording result failed"
            );
            inner.snapshot.error = Some(SessionError::PersistenceFailed);
        }
        inner.snapshot.activity = Activity::Idle;
        self.publish(&inner);
        OperationOutcome::Applied
    }

    /// Switches between the quiz and summary entry views. Only allowed
    /// before identification.
    pub async fn switch_mode(&self, mode: SessionMode) -> OperationOutcome {
        let mut inner = self.inner.lock().await;
        if inner.snapshot.is_busy() {
            return self.reject(RejectReason::Busy(inner.snapshot.activity));
        }
        if inner.snapshot.employee.is_some() {
            return self.reject(RejectReason::WrongMode(inner.snapshot.mode));
        }
        if inner.snapshot.mode != mode {
            inner.snapshot.mode = mode;
            inner.snapshot.question = None;
            inner.snapshot.summary = None;
            inner.snapshot.error = None;
            self.publish(&inner);
        }
        OperationOutcome::Applied
    }

    /// Logs out. In-flight calls complete into the void.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        let initial = SessionSnapshot::initial(inner.snapshot.mode);
        if inner.snapshot != initial {
            info!(generation = inner.generation, "session: reset");
            inner.snapshot = initial;
            self.publish(&inner);
        }
    }

    async fn load_question(&self, generation: u64, employee_id: EmployeeId) -> OperationOutcome {
        info!(%employee_id, generation, "session: fetching question");
        let result = self.service.get_question(&employee_id).await;

        let Some(mut inner) = self.current(generation, Activity::LoadingQuestion).await else {
            return OperationOutcome::Discarded;
        };
        match result {
            Ok(question) => {
                inner.snapshot.question = Some(question);
                inner.snapshot.answered = false;
            }
            Err(err) => {
                warn!(%employee_id, error = %err, "session: question fetch failed");
                inner.snapshot.error = Some(SessionError::question_fetch_failed(err.detail()));
            }
        }
        inner.snapshot.activity = Activity::Idle;
        self.publish(&inner);
        OperationOutcome::Applied
    }

    async fn load_summary(&self, generation: u64, employee_id: EmployeeId) -> OperationOutcome {
        info!(%employee_id, generation, "session: fetching summary");
        let result = self.service.get_summary(&employee_id).await;

        let Some(mut inner) = self.current(generation, Activity::LoadingSummary).await else {
            return OperationOutcome::Discarded;
        };
        match result {
            Ok(summary) if summary.trim().is_empty() => {
                warn!(%employee_id, "session: summary response was blank");
                inner.snapshot.error = Some(SessionError::summary_fetch_failed(None));
            }
            Ok(summary) => inner.snapshot.summary = Some(summary),
            Err(err) => {
                warn!(%employee_id, error = %err, "session: summary fetch failed");
                inner.snapshot.error = Some(SessionError::summary_fetch_failed(err.detail()));
            }
        }
        inner.snapshot.activity = Activity::Idle;
        self.publish(&inner);
        OperationOutcome::Applied
    }

    /// Locks the state if no reset happened since `generation` was captured.
    async fn current(
        &self,
        generation: u64,
        activity: Activity,
    ) -> Option<MutexGuard<'_, SessionState>> {
        let inner = self.inner.lock().await;
        if inner.generation == generation {
            return Some(inner);
        }

        warn!(
            started = generation,
            current = inner.generation,
            ?activity,
            "session: discarding stale completion"
        );
        let _ = self
            .events
            .send(SessionEvent::StaleCompletionDiscarded { activity });
        None
    }

    fn check_ready(
        snapshot: &SessionSnapshot,
        employee_id: &EmployeeId,
        mode: SessionMode,
    ) -> Result<(), RejectReason> {
        if snapshot.is_busy() {
            return Err(RejectReason::Busy(snapshot.activity));
        }
        match &snapshot.employee {
            None => Err(RejectReason::NotIdentified),
            Some(employee) if employee.id != *employee_id => Err(RejectReason::EmployeeMismatch),
            Some(_) if snapshot.mode != mode => Err(RejectReason::WrongMode(snapshot.mode)),
            Some(_) => Ok(()),
        }
    }

    fn reject(&self, reason: RejectReason) -> OperationOutcome {
        debug!(?reason, "session: operation rejected");
        OperationOutcome::Rejected(reason)
    }

    fn publish(&self, inner: &SessionState) {
        let _ = self
            .events
            .send(SessionEvent::Changed(inner.snapshot.clone()));
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
