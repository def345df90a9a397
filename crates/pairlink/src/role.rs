use std::fmt;

/// Which side of a session a connection is on.
///
/// Each role listens on its own topic, so whatever is published for the
/// guest never reaches the host's connection and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Created (or re-claimed) the session with `hostSession`.
    Host,
    /// Joined an existing session with `joinSession`.
    Guest,
}

impl Role {
    /// Topic name prefix for this role.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Host => "h.",
            Self::Guest => "g.",
        }
    }

    /// The topic this role subscribes to for `session_id`.
    pub fn topic(self, session_id: &str) -> String {
        format!("{}{session_id}", self.prefix())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => f.write_str("host"),
            Self::Guest => f.write_str("guest"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_uses_role_prefix() {
        assert_eq!(Role::Host.topic("abc"), "h.abc");
        assert_eq!(Role::Guest.topic("abc"), "g.abc");
    }

    #[test]
    fn test_host_and_guest_topics_differ() {
        assert_ne!(Role::Host.topic("abc"), Role::Guest.topic("abc"));
    }
}
