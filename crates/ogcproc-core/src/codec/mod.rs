//! Argument codec.
//!
//! Encode direction ([`flatten`]): the ordered `key value` pairs a form
//! submits for a compiled tool. Decode direction ([`decode`]): rebuild the
//! nested execution payload from those pairs at invocation time.

mod decode;
mod flatten;

pub use decode::{decode, parse_tokens, FlatArguments};
pub use flatten::{command_template, flatten, FlatArgument};

/// Values a form submits for a field left empty.
pub(crate) fn is_unset(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == "None"
}
