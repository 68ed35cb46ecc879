pub mod processing;
pub use processing::{ProcessingService, SUCCESS_ACK};
