/// Errors that can occur while reading or writing preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefsError {
    /// No entry exists for the key.
    NotFound,
    /// The entry exists but holds a different type.
    WrongType,
    /// The underlying engine rejected the operation or returned truncated data.
    Storage,
    /// The namespace could not be opened in the requested mode.
    Unavailable,
    /// Store access attempted through a transaction that failed to open.
    Inactive,
}

impl core::fmt::Display for PrefsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PrefsError::NotFound => write!(f, "key not found"),
            PrefsError::WrongType => write!(f, "stored entry has a different type"),
            PrefsError::Storage => write!(f, "storage engine operation failed"),
            PrefsError::Unavailable => write!(f, "namespace could not be opened"),
            PrefsError::Inactive => write!(f, "transaction is not active"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;

    #[test]
    fn display_names_the_failure() {
        let mut out: heapless::String<64> = heapless::String::new();
        write!(out, "{}", PrefsError::Unavailable).unwrap();
        assert_eq!(out.as_str(), "namespace could not be opened");
    }
}
