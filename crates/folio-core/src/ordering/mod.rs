//! Sibling ordering

pub mod order_key;

pub use order_key::{
    generate_order_key, is_order_key_unique, key_between, validate_order_key, INITIAL_KEY,
};
