//! Observable state of a fetch or a mutation.

/// Message used when a failure carries no message of its own.
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// State of a data fetch: `idle -> loading -> (data | error)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestState<T> {
    /// Result of the last successful call. Cleared by a failure.
    pub data: Option<T>,
    /// A call is in flight.
    pub loading: bool,
    /// Message of the last failure, never empty.
    pub error: Option<String>,
}

impl<T> RequestState<T> {
    /// `{ data: None, loading: false, error: None }`.
    pub fn idle() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.data.is_none() && !self.loading && self.error.is_none()
    }

    /// Not loading and holding exactly one of data or error.
    pub fn is_settled(&self) -> bool {
        !self.loading && (self.data.is_some() != self.error.is_some())
    }

    /// Enter the loading state. Previous data is kept until the call settles.
    pub fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub fn succeed(&mut self, data: T) {
        self.data = Some(data);
        self.loading = false;
        self.error = None;
    }

    /// Settle with an error; data is cleared.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.data = None;
        self.loading = false;
        self.error = Some(error_message(message.into()));
    }
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        Self::idle()
    }
}

/// State of a mutation. Mutations keep no data of their own.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MutationState {
    pub loading: bool,
    /// Message of the last failure; cleared when the next call starts.
    pub error: Option<String>,
}

impl MutationState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub fn succeed(&mut self) {
        self.loading = false;
        self.error = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.loading = false;
        self.error = Some(error_message(message.into()));
    }
}

/// Blank messages become [`GENERIC_ERROR_MESSAGE`].
pub fn error_message(message: String) -> String {
    if message.trim().is_empty() {
        GENERIC_ERROR_MESSAGE.to_string()
    } else {
        message
    }
}
