pub mod email;
pub mod render;

#[cfg(test)]
pub mod mocks;
