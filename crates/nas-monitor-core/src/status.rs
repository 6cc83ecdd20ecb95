//! Host status and derived connection state.

use serde::{Deserialize, Serialize};

/// Status reported to a status sink.
///
/// Known host states get their own variant; anything else the host reports
/// (an upper-cased event id, an unfamiliar query result) is kept verbatim in
/// [`Status::Other`]. [`Status::Dead`] is never decoded from host input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    /// Host is up and serving
    Ready,
    /// Host is booting
    Booting,
    /// Host is shutting down
    ShuttingDown,
    /// Host reported an error state
    Error,
    /// Host state could not be determined
    Unknown,
    /// Session gave up (auth rejected or retries exhausted)
    Dead,
    /// Any other status tag
    Other(String),
}

impl Status {
    /// Map a status tag to a status. Matching is exact.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "READY" => Self::Ready,
            "BOOTING" => Self::Booting,
            "SHUTTING_DOWN" => Self::ShuttingDown,
            "ERROR" => Self::Error,
            "UNKNOWN" => Self::Unknown,
            "DEAD" => Self::Dead,
            other => Self::Other(other.to_string()),
        }
    }

    /// Status for a tag reported by the host.
    ///
    /// `DEAD` is reserved for the session's own verdict, so a host tag with
    /// that spelling stays an ordinary [`Status::Other`].
    pub fn from_host_tag(tag: &str) -> Self {
        match Self::from_tag(tag) {
            Self::Dead => Self::Other(tag.to_string()),
            status => status,
        }
    }

    /// Status for a change event id; the id is upper-cased first.
    pub fn from_event_id(id: &str) -> Self {
        Self::from_host_tag(&id.to_uppercase())
    }

    /// Status for a query result payload.
    ///
    /// Strings are used as-is, `null` means [`Status::Unknown`], any other
    /// value is rendered as compact JSON.
    pub fn from_query_result(state: &serde_json::Value) -> Self {
        match state {
            serde_json::Value::String(s) => Self::from_host_tag(s),
            serde_json::Value::Null => Self::Unknown,
            other => Self::from_host_tag(&other.to_string()),
        }
    }

    /// Wire/display tag of this status.
    pub fn as_tag(&self) -> &str {
        match self {
            Self::Ready => "READY",
            Self::Booting => "BOOTING",
            Self::ShuttingDown => "SHUTTING_DOWN",
            Self::Error => "ERROR",
            Self::Unknown => "UNKNOWN",
            Self::Dead => "DEAD",
            Self::Other(tag) => tag,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl From<String> for Status {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.as_tag().to_string()
    }
}

/// Connection state derived from the events a session has observed.
///
/// Never stored as history; a session exposes only its current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    /// No transport open
    Disconnected,
    /// Transport opening or connect frame sent
    Connecting,
    /// Login request sent, waiting for the result
    Authenticating,
    /// Authenticated; host ready (or state not yet known)
    Ready,
    /// Host reported booting
    Booting,
    /// Host reported shutting down
    ShuttingDown,
    /// Host reported an error
    Error,
    /// Session gave up
    Dead,
}

impl ConnectionState {
    /// State of an authenticated session whose last known status is `status`.
    pub fn from_status(status: &Status) -> Self {
        match status {
            Status::Booting => Self::Booting,
            Status::ShuttingDown => Self::ShuttingDown,
            Status::Error => Self::Error,
            Status::Dead => Self::Dead,
            Status::Ready | Status::Unknown | Status::Other(_) => Self::Ready,
        }
    }

    /// Whether the session has given up.
    pub fn is_terminal(self) -> bool {
        self == Self::Dead
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Authenticating => "AUTHENTICATING",
            Self::Ready => "READY",
            Self::Booting => "BOOTING",
            Self::ShuttingDown => "SHUTTING_DOWN",
            Self::Error => "ERROR",
            Self::Dead => "DEAD",
        };
        f.write_str(name)
    }
}
