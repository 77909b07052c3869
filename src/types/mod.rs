mod models;

pub use models::{Privacy, Project, Token};
