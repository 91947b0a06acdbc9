pub mod activities;
pub mod audit;
pub mod config;
pub mod cross_validator;
pub mod export;
pub mod fetch;
pub mod lunar_validator;
pub mod merger;
pub mod model;
pub mod paths;
pub mod pipeline;
pub mod primary;
pub mod reference;
pub mod score;
pub mod secondary;
pub mod store;
pub mod text;
pub mod util;
pub mod vocab;
