use crate::error::{MergeError, MissingSide};
use crate::models::{Cell, Table};
use indexmap::IndexSet;
use std::collections::{HashMap, HashSet};

/// 表头与明细共享的关联键
pub const JOIN_KEY: &str = "CHAVE DE ACESSO";

/// 重名列后缀 (左 / 右)
const LEFT_SUFFIX: &str = "_x";
const RIGHT_SUFFIX: &str = "_y";

/// 左外连接：表头为左表，明细为右表
///
/// - 每个表头行至少出现一次 (无匹配明细时右侧字段全部为 None)
/// - 一个关联键匹配多条明细时按明细顺序展开，表头字段在每行重复
/// - 关联键为空的表头行不匹配任何明细
pub fn merge_tables(
    header: Option<&Table>,
    items: Option<&Table>,
    key: &str,
) -> Result<Table, MergeError> {
    tracing::debug!(key, "merging header and items tables");

    let (header, items) = match (header, items) {
        (Some(h), Some(i)) => (h, i),
        (None, None) => return Err(missing_input(MissingSide::Both)),
        (None, Some(_)) => return Err(missing_input(MissingSide::Header)),
        (Some(_), None) => return Err(missing_input(MissingSide::Items)),
    };

    let (Some(header_key), Some(items_key)) = (header.column_index(key), items.column_index(key))
    else {
        let header_columns = header.column_names();
        let items_columns = items.column_names();
        tracing::error!(
            key,
            ?header_columns,
            ?items_columns,
            "merge column not found in one of the tables"
        );
        return Err(MergeError::MissingKey {
            key: key.to_string(),
            header_columns,
            items_columns,
        });
    };

    let columns = merged_columns(header, items, key).map_err(structural)?;
    let right_width = items.column_count() - 1;

    // 倒排索引：关联键 -> 明细行号 (保持明细原始顺序)
    let mut item_index: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, row) in items.rows().iter().enumerate() {
        if let Some(k) = row[items_key].as_deref() {
            item_index.entry(k).or_default().push(idx);
        }
    }

    let mut merged = Table::with_columns(columns);
    let mut header_keys: HashSet<&str> = HashSet::new();

    for row in header.rows() {
        let key_value = row[header_key].as_deref();
        if let Some(k) = key_value {
            header_keys.insert(k);
        }

        match key_value.and_then(|k| item_index.get(k)) {
            Some(matches) => {
                for &item_idx in matches {
                    let item_row = &items.rows()[item_idx];
                    let mut out: Vec<Cell> = Vec::with_capacity(merged.column_count());
                    out.extend(row.iter().cloned());
                    out.extend(
                        item_row
                            .iter()
                            .enumerate()
                            .filter(|(idx, _)| *idx != items_key)
                            .map(|(_, cell)| cell.clone()),
                    );
                    merged.push_row(out).map_err(structural)?;
                }
            }
            None => {
                let mut out: Vec<Cell> = Vec::with_capacity(merged.column_count());
                out.extend(row.iter().cloned());
                out.extend(std::iter::repeat(None).take(right_width));
                merged.push_row(out).map_err(structural)?;
            }
        }
    }

    let orphan_items = item_index
        .iter()
        .filter(|(k, _)| !header_keys.contains(*k))
        .map(|(_, rows)| rows.len())
        .sum::<usize>();
    if orphan_items > 0 {
        tracing::warn!(
            orphan_items,
            "item rows without a matching header were dropped by the left join"
        );
    }

    tracing::info!(
        rows = merged.row_count(),
        header_rows = header.row_count(),
        item_rows = items.row_count(),
        "merge completed, resulting table has {} records",
        merged.row_count()
    );
    Ok(merged)
}

/// 输出列：表头列在前，明细非键列在后；两侧重名的非键列追加 _x / _y
fn merged_columns(header: &Table, items: &Table, key: &str) -> Result<IndexSet<String>, String> {
    let mut columns = IndexSet::with_capacity(header.column_count() + items.column_count());

    let left = header.columns().map(|name| {
        if name != key && items.has_column(name) {
            format!("{name}{LEFT_SUFFIX}")
        } else {
            name.to_string()
        }
    });
    let right = items.columns().filter(|name| *name != key).map(|name| {
        if header.has_column(name) {
            format!("{name}{RIGHT_SUFFIX}")
        } else {
            name.to_string()
        }
    });

    for name in left.chain(right) {
        if columns.contains(&name) {
            return Err(format!("column '{name}' would appear twice in the merged table"));
        }
        columns.insert(name);
    }
    Ok(columns)
}

fn missing_input(side: MissingSide) -> MergeError {
    tracing::error!(%side, "cannot merge: input table absent");
    MergeError::MissingInput { side }
}

fn structural(message: impl ToString) -> MergeError {
    let message = message.to_string();
    tracing::error!(%message, "unexpected merge failure");
    MergeError::Structural { message }
}
