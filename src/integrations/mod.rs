pub mod brian;

pub use brian::{AssistResponse, BrianClient};
