use crate::models::{ColumnStats, NumericSummary, Table};
use bigdecimal::BigDecimal;
use std::str::FromStr;

/// 小数位 (scale) 绝对值上限；超出的值 (如 `1e999999999`) 按非数字处理
const MAX_SCALE: i64 = 64;

/// 逐列统计非空数量；全部非空值均为数字的列额外计算 sum / min / max
pub fn column_stats(table: &Table) -> Vec<ColumnStats> {
    table
        .columns()
        .enumerate()
        .map(|(idx, name)| {
            let values: Vec<&str> = table
                .rows()
                .iter()
                .filter_map(|row| row[idx].as_deref())
                .collect();
            ColumnStats {
                name: name.to_string(),
                non_empty: values.len(),
                numeric: numeric_summary(&values),
            }
        })
        .collect()
}

fn numeric_summary(values: &[&str]) -> Option<NumericSummary> {
    let mut parsed = values
        .iter()
        .map(|v| parse_decimal(v.trim()));

    let first = parsed.next()??;
    let mut summary = NumericSummary {
        sum: first.clone(),
        min: first.clone(),
        max: first,
    };

    for value in parsed {
        let value = value?;
        if value < summary.min {
            summary.min = value.clone();
        }
        if value > summary.max {
            summary.max = value.clone();
        }
        summary.sum += value;
    }

    Some(summary)
}

fn parse_decimal(value: &str) -> Option<BigDecimal> {
    let parsed = BigDecimal::from_str(value).ok()?;
    let (_, scale) = parsed.as_bigint_and_exponent();
    (scale.abs() <= MAX_SCALE).then_some(parsed)
}
