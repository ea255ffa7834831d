pub mod article;
pub mod category;
