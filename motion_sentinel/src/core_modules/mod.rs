pub mod binarizer;
pub mod decision;
pub mod differencer;
pub mod frame;
pub mod morphology;
pub mod noise_suppressor;
pub mod region_extractor;
