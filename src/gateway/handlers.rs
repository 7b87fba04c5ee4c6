pub mod health;
pub mod pipeline;

pub use health::health_check;
pub use pipeline::{
    pipeline_status, start_classic, start_lightweight, stop_classic, stop_lightweight,
};
