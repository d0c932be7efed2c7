pub mod backend;
pub mod catalog;
pub mod composite;
pub mod consts;
pub mod error;
pub mod expression;
pub mod filters;
pub mod image;
pub mod indices;
pub mod kernel;
pub mod keyed;
pub mod masks;
pub mod priority;
pub mod query;
pub mod retry;
pub mod scores;
pub mod season;
pub mod stats;
