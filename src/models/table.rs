use indexmap::IndexSet;
use std::fmt;
use thiserror::Error;

/// 单元格：空单元格 / 缺失字段为 None
pub type Cell = Option<String>;

/// 数据表来源 (用于诊断日志)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Header,
    Items,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Header => f.write_str("header"),
            TableKind::Items => f.write_str("items"),
        }
    }
}

/// 行宽与列数不一致
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("row has {actual} cells but table has {expected} columns")]
pub struct TableShapeError {
    pub expected: usize,
    pub actual: usize,
}

/// 内存表：有序且唯一的列名 + 行数据
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: IndexSet<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn with_columns(columns: IndexSet<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// 追加一行，行宽必须等于列数
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), TableShapeError> {
        if row.len() != self.columns.len() {
            return Err(TableShapeError {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// 列名列表 (诊断用)
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().cloned().collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.get_index_of(name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// 按行号和列名取值
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    /// 某一列的全部取值 (列不存在时返回 None)
    pub fn column_values<'a>(
        &'a self,
        column: &str,
    ) -> Option<impl Iterator<Item = Option<&'a str>> + 'a> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(move |row| row[idx].as_deref()))
    }
}
