use crate::ProtoError;

/// A parsed line of the newline-terminated admin text protocol. Any
/// connection whose first byte is not NUL is latched into admin mode for
/// its lifetime; every subsequent line is one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminRequest {
    /// `status` — one tab-separated line per registered function.
    Status,
    /// `workers` — one line per worker connection.
    Workers,
    /// `maxqueue <function> [<size>]` — set (or clear) a per-function
    /// queue-depth ceiling.
    MaxQueue {
        /// Function name the ceiling applies to.
        function: String,
        /// `None` clears the ceiling (unbounded queue).
        size: Option<usize>,
    },
    /// `shutdown` — stop the server once in-flight work drains, or
    /// immediately without the `graceful` flag.
    Shutdown {
        /// Whether to wait for in-flight jobs before exiting.
        graceful: bool,
    },
    /// `version` — report the server's version string.
    Version,
}

impl AdminRequest {
    /// Parse a single line (without its trailing newline) of the admin
    /// protocol.
    pub fn parse(line: &str) -> Result<Self, ProtoError> {
        let mut words = line.trim_end().split_whitespace();
        let verb = words.next().unwrap_or("");
        match verb {
            "status" => Ok(AdminRequest::Status),
            "workers" => Ok(AdminRequest::Workers),
            "version" => Ok(AdminRequest::Version),
            "shutdown" => Ok(AdminRequest::Shutdown {
                graceful: words.next() == Some("graceful"),
            }),
            "maxqueue" => {
                let function = words
                    .next()
                    .ok_or_else(|| ProtoError::MissingAdminArg {
                        command: "maxqueue".to_string(),
                    })?
                    .to_string();
                let size = match words.next() {
                    Some(raw) => Some(raw.parse::<usize>().map_err(|_| {
                        ProtoError::MissingAdminArg {
                            command: "maxqueue".to_string(),
                        }
                    })?),
                    None => None,
                };
                Ok(AdminRequest::MaxQueue { function, size })
            }
            other => Err(ProtoError::UnknownAdminVerb(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_verbs() {
        assert_eq!(AdminRequest::parse("status").unwrap(), AdminRequest::Status);
        assert_eq!(
            AdminRequest::parse("workers").unwrap(),
            AdminRequest::Workers
        );
        assert_eq!(AdminRequest::parse("version").unwrap(), AdminRequest::Version);
    }

    #[test]
    fn parses_shutdown_modes() {
        assert_eq!(
            AdminRequest::parse("shutdown").unwrap(),
            AdminRequest::Shutdown { graceful: false }
        );
        assert_eq!(
            AdminRequest::parse("shutdown graceful").unwrap(),
            AdminRequest::Shutdown { graceful: true }
        );
    }

    #[test]
    fn parses_maxqueue_with_and_without_size() {
        assert_eq!(
            AdminRequest::parse("maxqueue reverse 10").unwrap(),
            AdminRequest::MaxQueue {
                function: "reverse".to_string(),
                size: Some(10),
            }
        );
        assert_eq!(
            AdminRequest::parse("maxqueue reverse").unwrap(),
            AdminRequest::MaxQueue {
                function: "reverse".to_string(),
                size: None,
            }
        );
    }

    #[test]
    fn rejects_unknown_verb() {
        assert!(AdminRequest::parse("frobnicate").is_err());
        assert!(AdminRequest::parse("maxqueue").is_err());
    }
}
