pub mod context;
pub mod derivative;
pub mod dot;
pub mod error;
pub mod eval;
pub mod io;
pub mod latex;
pub mod ops;
pub mod optimize;
pub mod parse;
pub mod tree;
pub mod vars;
pub mod walk;

mod macros;


pub use context::Context;
pub use derivative::differentiate;
pub use dot::write_dot;
pub use error::Error;
pub use eval::evaluate;
pub use io::{read_literal, write_infix, write_literal};
pub use latex::tex_formula;
pub use ops::OpKind;
pub use optimize::optimize;
pub use parse::parse;
pub use tree::{Node, NodeId, Payload, Status, Tree};
pub use vars::{MAX_NAME_LEN, Variable, VariableTable};
pub use walk::{Hooks, contains_variable, traverse, traverse_from};
