pub mod interfaces;
pub mod templates;
pub mod usecases;
