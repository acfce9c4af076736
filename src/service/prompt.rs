use crate::data::{column_stats, JOIN_KEY};
use crate::models::Table;
use std::fmt::Write as _;

const INSTRUCTIONS: &str = "\
You are a data analyst answering questions about Brazilian electronic invoices (notas fiscais).
The dataset below is the left join of invoice headers and invoice line items on the column \"{key}\". \
Header fields are repeated on every item row of the same invoice, so count distinct \"{key}\" values \
when asked about invoices rather than items.
Answer using only the data provided. Reply in the same language as the question, concisely. \
If the answer cannot be determined from the data, say so.";

/// 合并表渲染成的提示词上下文 (构建一次，每次查询复用)
#[derive(Debug, Clone)]
pub struct TableContext {
    text: String,
    total_rows: usize,
    rows_included: usize,
}

impl TableContext {
    /// 渲染列信息、列统计和前 `max_rows` 行 CSV
    pub fn render(
        table: &Table,
        max_rows: usize,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let total_rows = table.row_count();
        let rows_included = total_rows.min(max_rows);

        let mut text = INSTRUCTIONS.replace("{key}", JOIN_KEY);
        writeln!(text)?;
        writeln!(text)?;
        writeln!(
            text,
            "Dataset: {total_rows} rows, {} columns.",
            table.column_count()
        )?;

        writeln!(text, "Column statistics (computed over all rows):")?;
        for stats in column_stats(table) {
            match &stats.numeric {
                Some(n) => writeln!(
                    text,
                    "- {}: {} values, sum={}, min={}, max={}",
                    stats.name, stats.non_empty, n.sum, n.min, n.max
                )?,
                None => writeln!(text, "- {}: {} values", stats.name, stats.non_empty)?,
            }
        }
        writeln!(text)?;

        if rows_included < total_rows {
            writeln!(
                text,
                "First {rows_included} of {total_rows} rows as CSV (the statistics above cover every row):"
            )?;
        } else {
            writeln!(text, "All {total_rows} rows as CSV:")?;
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(table.columns())?;
        for row in table.rows().iter().take(rows_included) {
            writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
        }
        let csv = String::from_utf8(writer.into_inner().map_err(|e| e.to_string())?)?;
        text.push_str(&csv);

        Ok(Self {
            text,
            total_rows,
            rows_included,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn rows_included(&self) -> usize {
        self.rows_included
    }

    pub fn is_truncated(&self) -> bool {
        self.rows_included < self.total_rows
    }
}
