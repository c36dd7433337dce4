/// Longest file extension accepted for a stored avatar.
const MAX_EXTENSION_LEN: usize = 16;

/// Result of deriving a storage extension from an upload filename.
#[derive(Debug, PartialEq, Eq)]
pub enum FilenameError {
    /// Filename is missing, empty or whitespace-only.
    Empty,
    /// Filename has no `.` or nothing after the last `.`.
    MissingExtension,
    /// Extension contains characters other than ASCII letters and digits, or is too long.
    InvalidExtension,
}

impl FilenameError {
    /// Returns a human-readable error message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "Filename cannot be empty",
            Self::MissingExtension => "Filename must have an extension",
            Self::InvalidExtension => {
                "Invalid file extension: only letters and digits are allowed"
            }
        }
    }
}

/// Derives the lower-cased extension (text after the last `.`) of an upload filename.
///
/// The extension becomes part of the on-disk file name, so it is restricted to
/// ASCII alphanumerics. Directory components in `filename` are irrelevant.
pub fn avatar_extension(filename: &str) -> Result<String, FilenameError> {
    let trimmed = filename.trim();

    if trimmed.is_empty() {
        return Err(FilenameError::Empty);
    }

    let (_, extension) = trimmed
        .rsplit_once('.')
        .ok_or(FilenameError::MissingExtension)?;

    if extension.is_empty() {
        return Err(FilenameError::MissingExtension);
    }

    if extension.len() > MAX_EXTENSION_LEN
        || !extension.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(FilenameError::InvalidExtension);
    }

    Ok(extension.to_ascii_lowercase())
}
