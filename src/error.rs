use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("lua error: {0}")]
    Lua(#[from] mlua::Error),

    #[error("driver script has no `{0}` function")]
    MissingEntryPoint(&'static str),

    #[error("invalid tuning: {0}")]
    InvalidTuning(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
