// Row types for the abuse detection tables

pub mod alert;
pub mod notification;

pub use alert::*;
pub use notification::*;

use thiserror::Error;

#[derive(Error, Debug)]
#[error("Invalid {column} value in database: {value}")]
pub struct DecodeError {
    pub column: &'static str,
    pub value: String,
}

pub(crate) fn parse_column<T: std::str::FromStr>(column: &'static str, value: String) -> Result<T, DecodeError> {
    value.parse().map_err(|_| DecodeError { column, value })
}
