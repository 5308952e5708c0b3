pub mod compiler;
pub mod constants;
pub mod orchestration;
pub mod parser;
pub mod runtime;

pub use self::{
    compiler::{assemble, compile},
    parser::{parse, parse_assembly},
    runtime::Machine,
};
