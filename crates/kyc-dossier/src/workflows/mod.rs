pub mod dossier;
pub mod monitoring;

#[cfg(test)]
pub(crate) mod testing;
