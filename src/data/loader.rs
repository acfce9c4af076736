use crate::config::AppConfig;
use crate::error::LoadError;
use crate::models::{Cell, Table, TableKind};
use indexmap::IndexSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// CSV 表加载器 (表头 / 明细两个实例，仅诊断标签不同)
#[derive(Debug, Clone)]
pub struct TableLoader {
    kind: TableKind,
    path: PathBuf,
    delimiter: u8,
}

impl TableLoader {
    pub fn new(kind: TableKind, path: impl Into<PathBuf>, delimiter: u8) -> Self {
        Self {
            kind,
            path: path.into(),
            delimiter,
        }
    }

    pub fn header(config: &AppConfig) -> Self {
        Self::new(
            TableKind::Header,
            &config.data.header_path,
            config.data.delimiter,
        )
    }

    pub fn items(config: &AppConfig) -> Self {
        Self::new(TableKind::Items, &config.data.items_path, config.data.delimiter)
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取整个文件；任何失败都以 [`LoadError`] 返回，不会 panic
    pub fn load(&self) -> Result<Table, LoadError> {
        tracing::debug!(kind = %self.kind, path = %self.path.display(), "loading table");

        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::error!(kind = %self.kind, path = %self.path.display(), "file not found");
                return Err(LoadError::NotFound {
                    kind: self.kind,
                    path: self.path.clone(),
                });
            }
            Err(e) => return Err(self.malformed(e)),
        };

        match self.read_from(file) {
            Ok(table) => {
                tracing::info!(
                    kind = %self.kind,
                    rows = table.row_count(),
                    columns = table.column_count(),
                    "{} loaded with {} records", self.kind, table.row_count()
                );
                Ok(table)
            }
            Err(e) => Err(self.malformed(e)),
        }
    }

    /// 从任意 reader 解析 CSV
    pub fn read_from<R: Read>(
        &self,
        reader: R,
    ) -> Result<Table, Box<dyn std::error::Error + Send + Sync>> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        if headers.is_empty() || headers.iter().all(str::is_empty) {
            return Err("no header row found".into());
        }
        let mut table = Table::with_columns(dedupe_columns(headers.iter()));

        for record in rdr.records() {
            let record = record?;
            let row: Vec<Cell> = record
                .iter()
                .map(|field| (!field.is_empty()).then(|| field.to_string()))
                .collect();
            table.push_row(row)?;
        }

        Ok(table)
    }

    fn malformed(&self, cause: impl std::fmt::Display) -> LoadError {
        let cause = cause.to_string();
        tracing::error!(kind = %self.kind, path = %self.path.display(), %cause, "failed to load table");
        LoadError::Malformed {
            kind: self.kind,
            path: self.path.clone(),
            cause,
        }
    }
}

/// 重复列名按 `name`, `name.1`, `name.2` 重命名
fn dedupe_columns<'a>(names: impl Iterator<Item = &'a str>) -> IndexSet<String> {
    let mut columns = IndexSet::new();
    for (idx, name) in names.enumerate() {
        let name = if idx == 0 {
            name.trim_start_matches('\u{feff}')
        } else {
            name
        };
        if columns.insert(name.to_string()) {
            continue;
        }
        let mut suffix = 1;
        while !columns.insert(format!("{name}.{suffix}")) {
            suffix += 1;
        }
    }
    columns
}
