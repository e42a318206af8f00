use std::fmt::Display;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A null or otherwise malformed input to an API call.
    InvalidArgument,
    /// The parser or the literal reader rejected malformed source. Carries
    /// the byte offset of the failure, the reason, and a snippet of the
    /// remaining input.
    Syntax {
        offset: usize,
        message: &'static str,
        snippet: String,
    },
    /// An operator in the literal format was supplied a number of children
    /// that does not match its declared arity.
    ArityMismatch {
        offset: usize,
        expected: u8,
        found: u8,
    },
    /// A token did not name any registered operator.
    UnknownOperator(String),
    /// A lookup missed the variable table.
    UnknownVariable(String),
    /// A variable was evaluated before being assigned a value.
    UnboundVariable(String),
    /// A variable name longer than `MAX_NAME_LEN`.
    NameTooLong(String),
    /// Attempt to re-initialize a live tree or attach a second sink.
    Reinitialization,
    /// The operation needs a tree with at least a root node.
    EmptyTree,
    /// A child whose parent back-reference does not point at the node that
    /// owns it. Signals corruption or misuse, never repaired.
    BondFailed(usize),
    /// The tracked node count of a tree diverged from a fresh traversal.
    NodeCountMismatch { tracked: usize, actual: usize },
    /// Writing to a rendering sink failed.
    Io(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Error::*;
        match self {
            InvalidArgument => write!(f, "invalid argument"),
            Syntax {
                offset,
                message,
                snippet,
            } => write!(f, "syntax error at byte {offset}: {message} (near {snippet:?})"),
            ArityMismatch {
                offset,
                expected,
                found,
            } => write!(
                f,
                "arity mismatch at byte {offset}: operator takes {expected} children, found {found}"
            ),
            UnknownOperator(token) => write!(f, "unknown operator {token:?}"),
            UnknownVariable(name) => write!(f, "unknown variable {name:?}"),
            UnboundVariable(name) => write!(f, "variable {name:?} has no value assigned"),
            NameTooLong(name) => write!(f, "variable name {name:?} is too long"),
            Reinitialization => write!(f, "attempted to re-initialize a live object"),
            EmptyTree => write!(f, "the tree contains no nodes"),
            BondFailed(id) => write!(
                f,
                "parent link of node {id} does not match the node that owns it"
            ),
            NodeCountMismatch { tracked, actual } => write!(
                f,
                "tracked node count {tracked} does not match traversal count {actual}"
            ),
            Io(message) => write!(f, "sink write failed: {message}"),
        }
    }
}

impl std::error::Error for Error {}
