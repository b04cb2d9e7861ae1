use thiserror::Error;

/// Every way a client command can be refused.
///
/// Each variant maps onto a stable wire code (see [`GameError::code`]). A command that
/// returns one of these leaves the game untouched.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not allowed now: {0}")]
    BadState(String),
    #[error("invalid input: {0}")]
    BadInput(String),
    #[error("game is full")]
    Full,
    #[error("name already taken")]
    NameTaken,
    #[error("market {0} is locked by another player")]
    Locked(String),
    #[error("already done: {0}")]
    Already(String),
    #[error("no unused expert for {0}")]
    NoPower(String),
    #[error("trend {0} is not active")]
    NotActive(String),
    #[error("no unused lawyer")]
    NoLawyer,
    #[error("wrong time: {0}")]
    BadTime(String),
    #[error("cannot rewind: {0}")]
    GuardFail(String),
    #[error("card {0} is not available")]
    NotAvailable(String),
    #[error("card {0} is not owned by this player")]
    NotOwned(String),
    #[error("unknown card {0}")]
    Unknown(String),
    #[error("settlement is not final yet")]
    Wait,
    #[error("internal error: {0}")]
    Internal(String),
}

impl GameError {
    /// Wire code sent in `{ok:false, error, code}` acknowledgments.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::BadState(_) => "BAD_STATE",
            Self::BadInput(_) => "BAD_INPUT",
            Self::Full => "FULL",
            Self::NameTaken => "NAME_TAKEN",
            Self::Locked(_) => "LOCKED",
            Self::Already(_) => "ALREADY",
            Self::NoPower(_) => "NO_POWER",
            Self::NotActive(_) => "NOT_ACTIVE",
            Self::NoLawyer => "NO_LAWYER",
            Self::BadTime(_) => "BAD_TIME",
            Self::GuardFail(_) => "GUARD_FAIL",
            Self::NotAvailable(_) => "NOT_AVAILABLE",
            Self::NotOwned(_) => "NOT_OWNED",
            Self::Unknown(_) => "UNKNOWN",
            Self::Wait => "WAIT",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn bad_state(msg: impl Into<String>) -> Self {
        Self::BadState(msg.into())
    }

    pub fn bad_input(msg: impl Into<String>) -> Self {
        Self::BadInput(msg.into())
    }
}
