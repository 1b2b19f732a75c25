pub mod compare;
pub mod runner;
pub mod testcase;
pub mod verdict;

pub use compare::*;
pub use runner::*;
pub use testcase::*;
pub use verdict::*;
