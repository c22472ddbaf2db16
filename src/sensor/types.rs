use crate::detection::types::Sample;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorEvent {
    Sample(Sample),
}
