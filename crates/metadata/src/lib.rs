//! # Knowledge Metadata
//!
//! Typed metadata values and the codec that maps them onto flat vector-store payloads.
//!
//! ```text
//! {"metadata": {"tags": ["x", "y"], "source": {"table": "orders"}}}
//!     │  flatten
//!     ▼
//! {"metadata.tags": "['x', 'y']", "metadata.source.table": "orders"}
//!     │  unflatten (list literals decoded)
//!     ▼
//! {"metadata": {"tags": ["x", "y"], "source": {"table": "orders"}}}
//! ```

mod codec;
mod error;
mod literal;
mod value;

pub use codec::{flatten, flatten_reporting, unflatten, unflatten_reporting, DELIMITER};
pub use error::{CodecError, Result};
pub use literal::{decode_list, encode_list, looks_like_list};
pub use value::{FlatMetadata, Metadata, Scalar, Value};
