pub mod reading;
pub mod run;

pub use reading::{
    Classification, ClassifiedReading, CleanedReading, Coordinate, CoordinateSource, RawReading,
    Reading,
};
pub use run::{CleaningRun, RunStatus};
