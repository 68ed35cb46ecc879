pub mod paths;
pub mod retry;
pub mod uri;
