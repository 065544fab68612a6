//! Output formats for delta alignments

#[cfg(feature = "io-delta")] pub mod delta;

#[cfg(feature = "io-delta")] pub use delta::DeltaWriter;
