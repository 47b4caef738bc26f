//! Loading / error / success union handed to views.

use crate::error::FetchError;

/// Observable state of one query. Exactly one variant holds at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    /// No outcome yet.
    Loading,
    /// The most recent fetch failed.
    Error(FetchError),
    /// The most recent fetch succeeded.
    Success(T),
}

impl<T> QueryState<T> {
    /// Whether the query is still waiting for its first outcome.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Whether the query failed.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Whether the query holds data.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Data, when successful.
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        match self {
            Self::Success(data) => Some(data),
            _ => None,
        }
    }

    /// Error, when failed.
    #[must_use]
    pub const fn error(&self) -> Option<&FetchError> {
        match self {
            Self::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Transform the success payload.
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryState<U> {
        match self {
            Self::Loading => QueryState::Loading,
            Self::Error(error) => QueryState::Error(error),
            Self::Success(data) => QueryState::Success(f(data)),
        }
    }
}

impl<T> From<Result<T, FetchError>> for QueryState<T> {
    fn from(result: Result<T, FetchError>) -> Self {
        match result {
            Ok(data) => Self::Success(data),
            Err(error) => Self::Error(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_are_mutually_exclusive() {
        let loading: QueryState<u8> = QueryState::Loading;
        assert!(loading.is_loading() && !loading.is_error() && !loading.is_success());

        let failed: QueryState<u8> = Err(FetchError::missing_token()).into();
        assert!(failed.is_error() && failed.data().is_none());
        assert_eq!(
            failed.error().map(|e| e.message.as_str()),
            Some("Token not found")
        );

        let ok: QueryState<u8> = Ok(3).into();
        assert_eq!(ok.clone().map(u16::from).data(), Some(&3_u16));
        assert!(ok.is_success() && ok.error().is_none());
    }
}
