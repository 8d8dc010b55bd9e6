pub mod canon;
pub mod compare;
pub mod completions;
pub mod golden;
pub mod sim;
