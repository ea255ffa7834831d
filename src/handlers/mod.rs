pub mod article;
pub mod category;
pub mod upload;
