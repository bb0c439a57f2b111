pub mod base;
pub mod openai;
pub mod types;

#[cfg(test)]
pub mod mock;
