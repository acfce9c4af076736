use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// 列统计 (写入提示词，供模型回答聚合类问题)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub name: String,
    pub non_empty: usize,
    pub numeric: Option<NumericSummary>,
}

/// 数值列汇总：仅当所有非空值都能解析为十进制数时存在
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub sum: BigDecimal,
    pub min: BigDecimal,
    pub max: BigDecimal,
}
