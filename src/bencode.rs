//! Bencode decoding ([BEP-3]).
//!
//! Tracker responses arrive bencoded. Only the decoding half is needed here:
//! responses are parsed into a loosely typed [`Value`] tree, and callers pull
//! typed fields out of it with the `as_*` accessors, which return `None`
//! instead of panicking when a field has an unexpected type.
//!
//! ```
//! use piecewise::bencode::decode;
//!
//! let value = decode(b"d13:downloadSpeedi512ee").unwrap();
//! assert_eq!(value.get(b"downloadSpeed").and_then(|v| v.as_integer()), Some(512));
//! assert_eq!(value.get(b"downloadSpeed").and_then(|v| v.as_str()), None);
//! ```
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html

mod decode;
mod error;
mod value;

pub use decode::decode;
pub use error::BencodeError;
pub use value::Value;

#[cfg(test)]
mod tests;
