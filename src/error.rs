use thiserror::Error;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("Malformed header")]
    MalformedHeader,
    #[error("Unsupported color depth")]
    UnsupportedColorDepth,
    #[error("Unsupported compression")]
    UnsupportedCompression,
    #[error("Unsupported bit depth")]
    UnsupportedBitDepth,
    #[error("Unsupported component count")]
    UnsupportedComponentCount,
    #[error("Truncated read")]
    TruncatedRead,
    #[error("Invalid data")]
    InvalidData,

    // Logic errors
    #[error("Invalid argument")]
    InvalidArgument,
    #[error("Invalid argument width")]
    InvalidArgumentWidth,
    #[error("Invalid argument height")]
    InvalidArgumentHeight,
    #[error("Invalid argument bits per sample")]
    InvalidArgumentBitsPerSample,
    #[error("Invalid argument component count")]
    InvalidArgumentComponentCount,
    #[error("Invalid argument size")]
    InvalidArgumentSize,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
