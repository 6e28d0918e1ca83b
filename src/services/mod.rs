pub mod extraction;
pub mod relay;
pub mod storage;
pub mod worker;
