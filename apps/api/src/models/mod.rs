pub mod proposal;
pub mod resume;
