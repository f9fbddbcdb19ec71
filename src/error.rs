// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Error objects and codes.

use std::error;
use std::fmt;
use std::io;
use std::result;

use serde::ser;

/// The result of a serialization operation.
pub type Result<T> = result::Result<T, Error>;

/// The detailed cause of an encoding failure.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ErrorCode {
    /// No encoding rule matches the value and no custom pickler is
    /// registered for its type.  Carries the offending type name.
    Unpicklable(String),
    /// The value graph nests deeper than the recursion limit.
    RecursionTooDeep,
    /// A tuple directly contains itself, which cannot be represented
    /// without a memo entry that tuples never get before emission.
    RecursiveTuple,
    /// The value cannot be used as a dictionary key or set element.
    ValueNotHashable,
    /// The recursion counter was nonzero after the top-level value was
    /// written.
    UnbalancedRecursion,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ErrorCode::Unpicklable(ref ty) => write!(f, "no encoding for values of type {ty}"),
            ErrorCode::RecursionTooDeep => write!(f, "value graph nests too deeply"),
            ErrorCode::RecursiveTuple => write!(f, "tuple contains itself"),
            ErrorCode::ValueNotHashable => write!(f, "value not hashable"),
            ErrorCode::UnbalancedRecursion => write!(f, "recursion counter unbalanced after write"),
        }
    }
}

/// An error from serializing a value into a pickle stream.
#[derive(Debug)]
pub enum Error {
    /// The byte sink reported an I/O error, propagated as-is.
    Io(io::Error),
    /// The value graph could not be encoded.
    Encoding(ErrorCode),
    /// Reading a record field failed; carries the inner cause.
    FieldRead {
        /// Name of the field being read.
        field: String,
        /// The failure reported by the field accessor.
        source: Box<dyn error::Error + Send + Sync>,
    },
    /// A custom pickler or a `Serialize` implementation reported an error.
    Custom(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref err) => fmt::Display::fmt(err, f),
            Error::Encoding(ref code) => write!(f, "encoding error: {code}"),
            Error::FieldRead { ref field, ref source } => {
                write!(f, "failed to read field {field}: {source}")
            }
            Error::Custom(ref msg) => f.write_str(msg),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            Error::FieldRead { ref source, .. } => Some(&**source),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Error {
        Error::Custom(msg.to_string())
    }
}
