#[cfg(test)]
#[macro_use]
extern crate assert_matches;
extern crate byteorder;
#[macro_use]
extern crate lazy_static;
extern crate libc;
#[macro_use]
extern crate log;

pub mod core;
pub mod examples;

#[cfg(target_os = "linux")]
pub mod linux;

use std::io::Error as IOError;
use std::result::Result as StdResult;

#[derive(Debug)]
pub enum Error {
    /// Indicates an error where a driver or protocol registration has
    /// already been assigned.
    InUse,
    /// Indicates an error where a buffer, table, or device is full or empty.
    Exhausted,
    /// Indicates an error where a packet or frame is malformed.
    Malformed,
    /// Indicates an error where a frame was not addressed to or handled by
    /// this stack.
    Ignored,
    /// Indicates an error where an address resolution did not complete in
    /// time.
    Timeout,
    /// Indicates an error where the operation was not performed.
    NoOp,
    /// Indicates a generic IO error.
    IO(IOError),
}

impl From<IOError> for Error {
    fn from(err: IOError) -> Error {
        Error::IO(err)
    }
}

pub type Result<T> = StdResult<T, Error>;
