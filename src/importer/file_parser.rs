// ==========================================
// 车队收益台账系统 - 文件解析器实现
// ==========================================
// 职责: 阶段 READING - 字节流 → 表头 + 原始数据行
// 支持: CSV (UTF-8, 行尾混用) / Excel (.xlsx)
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::import_pipeline_trait::{FileParser, ParsedFile};
use calamine::{Reader, Xlsx};
use csv::ReaderBuilder;
use std::io::Cursor;

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvFileParser;

impl FileParser for CsvFileParser {
    fn parse(&self, bytes: &[u8]) -> ImportResult<ParsedFile> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(Cursor::new(bytes));

        // 读取表头
        let header: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if header.iter().all(|h| h.is_empty()) {
            return Err(ImportError::EmptyFile);
        }

        // 读取所有数据行
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let cells: Vec<String> = record.iter().map(|v| v.trim().to_string()).collect();

            // 跳过完全空白的行
            if cells.iter().all(|v| v.is_empty()) {
                continue;
            }

            rows.push(cells);
        }

        Ok(ParsedFile { header, rows })
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
// 读取第一个工作表，首行为表头
pub struct ExcelFileParser;

impl FileParser for ExcelFileParser {
    fn parse(&self, bytes: &[u8]) -> ImportResult<ParsedFile> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;

        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

        let mut range_rows = range.rows();
        let header_row = range_rows.next().ok_or(ImportError::EmptyFile)?;

        let header: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        if header.iter().all(|h| h.is_empty()) {
            return Err(ImportError::EmptyFile);
        }

        let mut rows = Vec::new();
        for data_row in range_rows {
            let cells: Vec<String> = data_row
                .iter()
                .map(|cell| cell.to_string().trim().to_string())
                .collect();

            // 跳过完全空白的行
            if cells.iter().all(|v| v.is_empty()) {
                continue;
            }

            rows.push(cells);
        }

        Ok(ParsedFile { header, rows })
    }
}
