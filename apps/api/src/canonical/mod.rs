// Canonicalization: raw extracted text + structured guess -> CanonicalResume.
// Every quantity, date and link in the source must survive into the record.

pub mod dates;
pub mod tokens;
pub mod validator;

pub use validator::{validate, CanonicalResume, ValidationError};
