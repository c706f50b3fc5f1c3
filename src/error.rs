use std::result;

use thiserror::Error;

use crate::eutils::PipelineStage;

/// Error types for E-utilities client operations
#[derive(Error, Debug)]
pub enum EutilsError {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// NCBI answered with a non-success HTTP status
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    /// Invalid query structure or parameters
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Neither UIDs nor a history session were supplied
    #[error(
        "{stage} needs input: supply a list of UIDs or a WebEnv/query_key window from a previous request"
    )]
    MissingInput { stage: PipelineStage },

    /// A chained source finished without producing a usable history session
    #[error("{stage} produced no WebEnv/query_key window to chain from")]
    SessionUnavailable { stage: PipelineStage },

    /// One stage of a chained pipeline failed
    #[error("pipeline failed at {stage}: {source}")]
    Pipeline {
        stage: PipelineStage,
        #[source]
        source: Box<EutilsError>,
    },
}

pub type Result<T> = result::Result<T, EutilsError>;

impl EutilsError {
    /// Wrap this error with the pipeline stage it occurred in
    ///
    /// Errors that already carry a stage are returned unchanged so the
    /// innermost failing stage is reported.
    pub fn at_stage(self, stage: PipelineStage) -> Self {
        match self {
            EutilsError::Pipeline { .. } => self,
            other => EutilsError::Pipeline {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The pipeline stage this error is attributed to, if any
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            EutilsError::Pipeline { stage, .. }
            | EutilsError::MissingInput { stage }
            | EutilsError::SessionUnavailable { stage } => Some(*stage),
            _ => None,
        }
    }

    /// HTTP status of a non-success response
    pub fn status(&self) -> Option<u16> {
        match self {
            EutilsError::ApiError { status, .. } => Some(*status),
            EutilsError::RequestError(err) => err.status().map(|s| s.as_u16()),
            EutilsError::Pipeline { source, .. } => source.status(),
            _ => None,
        }
    }
}
