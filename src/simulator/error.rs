use thiserror::Error;

/// Fatal simulator errors. Soft anomalies never show up here, see
/// `engine::diagnostics`.
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("failed to decode {structure}: {source}")]
    Decode {
        structure: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("unknown action type '{0}'")]
    UnknownAction(String),

    #[error("channel differs: {resolved}, expected: {declared}")]
    ChannelMismatch { resolved: String, declared: String },

    #[error("channel filter is enabled, state is incomplete")]
    FilteredStateIncomplete,

    #[error("no simulator for exchange '{0}'")]
    UnsupportedExchange(String),
}

impl SimulatorError {
    pub(crate) fn decode(structure: &'static str) -> impl FnOnce(serde_json::Error) -> SimulatorError {
        move |source| SimulatorError::Decode { structure, source }
    }
}

pub type SimResult<T> = Result<T, SimulatorError>;
