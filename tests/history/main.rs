//! History store integration tests.

mod support;
mod persistence;
mod retention;
