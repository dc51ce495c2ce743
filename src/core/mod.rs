pub mod csv_io;
pub mod etl;

pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
pub use etl::EtlEngine;
