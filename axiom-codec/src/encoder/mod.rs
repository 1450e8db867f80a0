/// Byte encoding committed to by the AxiomV2Query contract
pub mod native;

#[cfg(test)]
mod tests;
