//! 聚合器状态机
//!
//! Empty --ingest--> Collecting --finalize--> Finalized
//! Finalized 之后仍可继续 ingest，状态回到 Collecting。

use radfhir_core::{RadFhirError, Result};
use serde::{Deserialize, Serialize};

/// 聚合器状态
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AggregatorState {
    /// 尚未接收任何记录
    #[default]
    Empty,
    /// 正在接收记录
    Collecting,
    /// 已生成最终的检查资源
    Finalized,
}

/// 状态转换事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AggregatorEvent {
    Ingest,
    Finalize,
}

impl AggregatorState {
    /// 检查状态转换是否有效
    pub fn can_transition(&self, event: AggregatorEvent) -> bool {
        self.transition(event).is_ok()
    }

    /// 执行状态转换；空会话上的 finalize 是唯一的非法转换
    pub fn transition(&self, event: AggregatorEvent) -> Result<AggregatorState> {
        match (self, event) {
            (_, AggregatorEvent::Ingest) => Ok(AggregatorState::Collecting),
            (AggregatorState::Empty, AggregatorEvent::Finalize) => Err(RadFhirError::NoRecordsIngested),
            (_, AggregatorEvent::Finalize) => Ok(AggregatorState::Finalized),
        }
    }
}
