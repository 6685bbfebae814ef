pub mod convert;
pub mod time;

#[cfg(test)]
mod utils_test;
