pub mod building_block;
pub mod config;
pub mod error;
pub mod protocols;

#[cfg(test)]
mod test_circuits;
