use libc::c_int;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SignalError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignalError {
    /// `emit`/`subscribe` named a channel the source was not built with.
    #[error("unknown channel \"{0}\"")]
    UnknownChannel(String),

    #[error("unable to allocate memory for {what}")]
    Allocation { what: &'static str },

    /// A pthread call returned a non-zero code.
    #[error("operation {op} failed: code {code}")]
    Sync { op: &'static str, code: c_int },
}

#[cfg(test)]
mod test {
    use super::SignalError;

    #[test]
    fn messages() {
        assert_eq!(
            SignalError::UnknownChannel("b".into()).to_string(),
            "unknown channel \"b\""
        );
        assert_eq!(
            SignalError::Sync {
                op: "mutex_init",
                code: 12
            }
            .to_string(),
            "operation mutex_init failed: code 12"
        );
    }
}
