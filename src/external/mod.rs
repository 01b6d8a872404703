pub mod castai;
pub mod cost_provider;
pub mod scripted;
