//! # RadFHIR Core
//!
//! 核心模块，提供统一错误定义、FHIR资源模型和通用标识符工具。

pub mod error;
pub mod models;
pub mod utils;

pub use error::{RadFhirError, Result};
pub use models::*;
