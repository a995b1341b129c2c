//! Fallback - 1 回の呼び出しの試行状態（値とエラーを運ぶ版の Phase）
//!
//! `Phase` が遷移表そのもので、`Attempt` はそれに結果を載せたものです。
//! バックエンドを持たないので、遷移はここだけでテストできます。

use crate::domain::{AccessError, BackendError, Operation, Phase, Step};

/// State of one two-tier call.
#[derive(Debug)]
pub enum Attempt<T> {
    LocalAttempt,
    /// `local_error` is `None` when the local API was never eligible.
    RemoteFallback { local_error: Option<BackendError> },
    Done(T),
    Failed(AccessError),
}

impl<T> Attempt<T> {
    pub fn start(local_eligible: bool) -> Self {
        match Phase::start(local_eligible) {
            Phase::LocalAttempt => Attempt::LocalAttempt,
            _ => Attempt::RemoteFallback { local_error: None },
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Attempt::LocalAttempt => Phase::LocalAttempt,
            Attempt::RemoteFallback { .. } => Phase::RemoteFallback,
            Attempt::Done(_) => Phase::Done,
            Attempt::Failed(_) => Phase::Failed,
        }
    }

    /// Feed the outcome of the backend call the current phase asked for.
    ///
    /// The next phase comes from [`Phase::advance`]; this only moves values
    /// and errors into it. Terminal states ignore further outcomes.
    pub fn record(self, operation: Operation, outcome: Result<T, BackendError>) -> Self {
        let from = self.phase();
        if from.is_terminal() {
            return self;
        }
        match (from.advance(step_of(&outcome)), self, outcome) {
            (Phase::Done, _, Ok(value)) => Attempt::Done(value),
            (Phase::RemoteFallback, _, Err(err)) => Attempt::RemoteFallback {
                local_error: Some(err),
            },
            (Phase::Failed, _, Err(BackendError::NotFound { id, .. })) => {
                Attempt::Failed(AccessError::NotFound { id })
            }
            (Phase::Failed, Attempt::RemoteFallback { local_error }, Err(remote)) => {
                Attempt::Failed(AccessError::FilesUnavailable {
                    operation,
                    local: local_error,
                    remote,
                })
            }
            // advance() は上記以外の組み合わせを返さない
            (_, current, _) => current,
        }
    }
}

/// Reduces an outcome to what [`Phase::advance`] needs.
pub fn step_of<T>(outcome: &Result<T, BackendError>) -> Step {
    match outcome {
        Ok(_) => Step::Succeeded,
        Err(e) if e.is_not_found() => Step::Missing,
        Err(_) => Step::Failed,
    }
}
