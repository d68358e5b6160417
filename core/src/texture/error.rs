//! Error types for texture decoding.

/// Errors that can occur while decoding a texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureError {
    /// The standard image decoder rejected the data.
    Decode(String),
    /// A compressed-texture header failed validation.
    InvalidHeader(&'static str),
    /// The compressed-texture codec is not supported.
    Unsupported(String),
    /// The payload is shorter than its header declares.
    Truncated {
        /// Bytes required.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },
}

impl std::fmt::Display for TextureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode(msg) => write!(f, "image decode error: {msg}"),
            Self::InvalidHeader(reason) => write!(f, "invalid texture header: {reason}"),
            Self::Unsupported(codec) => write!(f, "unsupported texture codec '{codec}'"),
            Self::Truncated { expected, actual } => {
                write!(f, "texture data truncated: need {expected} bytes, have {actual}")
            }
        }
    }
}

impl std::error::Error for TextureError {}
