pub mod project;
pub mod update;
