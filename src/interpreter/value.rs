/// Array value representation.
///
/// Defines the `Array` type backing `Value::Array`. Arrays are homogeneous,
/// keep a membership set of rendered items for the `in` operator, and carry
/// their own iteration cursor.
pub mod array;
/// Object value representation.
///
/// Defines the `Object` type backing `Value::Object`. Objects map strings to
/// values while preserving key insertion order for iteration, and updating an
/// existing key keeps its position.
pub mod object;
/// Byte stream values.
///
/// Defines the in-memory replayable stream produced by codecs and response
/// bodies, and the open-file stream produced by the `open` command. Both can
/// be read, sought, and closed.
pub mod stream;
/// HTTP values.
///
/// Defines the request, response, cookie, form-data, and tuple values, along
/// with their selectable fields and the `Set-Cookie` parsing the response
/// cookie map is built from.
pub mod http;
/// JSON conversion.
///
/// Maps runtime values onto JSON documents and back for the `encode json`
/// and `decode json` commands.
pub mod json;

pub mod core;

pub use core::Value;
