//! `DataProvider` implementations.
//!
//! Provides concrete data sources for the
//! [`DataProvider`](crate::provider::DataProvider) trait. Currently includes
//! [`ArrayDataProvider`], an in-memory provider over a vector of rows.

mod array;

pub use array::ArrayDataProvider;
