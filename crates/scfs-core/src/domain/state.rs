//! State - 1 回の呼び出しにおけるフォールバックの状態遷移
//!
//! # 状態遷移
//! ```text
//! LocalAttempt ──成功──────────────▶ Done
//!      │        └─NotFound────────▶ Failed
//!      └─失敗─▶ RemoteFallback ─成功─▶ Done
//!                    └─失敗/NotFound─▶ Failed
//! ```
//! 認証情報がなければ RemoteFallback から開始する。

use std::fmt;

/// Phase of a single two-tier (local then remote) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    LocalAttempt,
    RemoteFallback,
    Done,
    Failed,
}

/// What a backend call reported, reduced to what the transition needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Succeeded,
    /// The target id does not exist. Authoritative on either backend.
    Missing,
    Failed,
}

impl Phase {
    /// Entry phase: local first whenever it is eligible. Not configurable.
    pub fn start(local_eligible: bool) -> Self {
        if local_eligible {
            Phase::LocalAttempt
        } else {
            Phase::RemoteFallback
        }
    }

    pub fn advance(self, step: Step) -> Self {
        match (self, step) {
            (Phase::LocalAttempt, Step::Succeeded) => Phase::Done,
            (Phase::LocalAttempt, Step::Missing) => Phase::Failed,
            (Phase::LocalAttempt, Step::Failed) => Phase::RemoteFallback,
            (Phase::RemoteFallback, Step::Succeeded) => Phase::Done,
            (Phase::RemoteFallback, Step::Missing | Step::Failed) => Phase::Failed,
            (terminal, _) => terminal,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::LocalAttempt => "LOCAL_ATTEMPT",
            Phase::RemoteFallback => "REMOTE_FALLBACK",
            Phase::Done => "DONE",
            Phase::Failed => "FAILED",
        };
        f.write_str(name)
    }
}
