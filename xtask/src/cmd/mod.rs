pub mod preflight;
pub mod schema;
