pub mod serialization;

pub use serialization::{AbstractSerializer, CSV_HEADER};
