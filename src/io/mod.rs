//! Input seams: sensor archives and the region of interest

pub mod archive;
pub mod region;

pub use archive::{InMemoryArchive, ObservationArchive, RawObservation};
pub use region::RegionMask;
