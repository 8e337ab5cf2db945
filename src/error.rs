use thiserror::Error;

/// Failures while turning synthesized documents into archive bytes
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("failed to serialize {document}: {source}")]
    Yaml {
        document: &'static str,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to pack artifact archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("failed to write artifact archive: {0}")]
    Io(#[from] std::io::Error),
}

impl SynthesisError {
    pub fn yaml(document: &'static str) -> impl FnOnce(serde_yaml::Error) -> Self {
        move |source| SynthesisError::Yaml { document, source }
    }
}

/// Failures reported by the management backend or while reaching it
#[derive(Debug, Error)]
pub enum PublisherError {
    #[error("request to management backend failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("management backend responded with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("unexpected response from management backend: {0}")]
    InvalidResponse(String),
}
