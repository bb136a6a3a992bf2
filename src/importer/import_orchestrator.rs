// ==========================================
// 车队收益台账系统 - 导入编排器实现
// ==========================================
// 职责: 串联全部导入阶段，落库台账条目，上报进度，汇总结果
// 状态机: IDLE → READING → MAPPING → PARSING → RESOLVING
//         → PERSISTING → COMPLETE；MAPPING 缺失日期列 → ABORTED
// 红线: 编排器单次使用（run 消费 self）；阶段严格串行；
//       单行落库失败不中止其余行（不存在跨整文件的事务）
// ==========================================

use crate::config::session::SessionConfig;
use crate::domain::ledger::{ImportIssue, ImportSummary, LedgerEntry, RowRecord};
use crate::domain::types::{EntityKind, ImportStep, Severity};
use crate::importer::column_mapper::ColumnMapper;
use crate::importer::entity_resolver::{EntityResolutionPlan, EntityResolver, NameResolution};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::CsvFileParser;
use crate::importer::import_pipeline_trait::{
    ColumnMapper as ColumnMapperTrait, EntityResolver as EntityResolverTrait, FileParser,
    ProgressSink, ProgressSnapshot, RowParser as RowParserTrait,
};
use crate::importer::row_parser::RowParser;
use crate::repository::persistence_gateway::PersistenceGateway;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

// ==========================================
// ImportOrchestrator
// ==========================================
pub struct ImportOrchestrator<G>
where
    G: PersistenceGateway,
{
    gateway: G,
    session: SessionConfig,

    // 管道组件
    file_parser: Box<dyn FileParser>,
    column_mapper: Box<dyn ColumnMapperTrait>,
    row_parser: Box<dyn RowParserTrait>,
    entity_resolver: Box<dyn EntityResolverTrait>,

    // 进度上报（可缺省，headless 运行）
    progress_sink: Option<Arc<dyn ProgressSink>>,

    step: ImportStep,
}

impl<G> ImportOrchestrator<G>
where
    G: PersistenceGateway,
{
    /// 创建编排器（默认 CSV 解析器，组件按会话配置构建）
    pub fn new(gateway: G, session: SessionConfig) -> Self {
        let column_mapper = Box::new(ColumnMapper::new(&session));
        let row_parser = Box::new(RowParser::new(&session));

        Self {
            gateway,
            file_parser: Box::new(CsvFileParser),
            column_mapper,
            row_parser,
            entity_resolver: Box::new(EntityResolver),
            progress_sink: None,
            step: ImportStep::Idle,
            session,
        }
    }

    /// 替换文件解析器（如 ExcelFileParser）
    pub fn with_file_parser(mut self, parser: Box<dyn FileParser>) -> Self {
        self.file_parser = parser;
        self
    }

    /// 挂接进度 sink
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress_sink = Some(sink);
        self
    }

    /// 执行一次完整导入
    ///
    /// # 参数
    /// - file_bytes: 输入文件字节流（全量载入内存，预期数据量下无流式需求）
    ///
    /// # 返回
    /// - Ok(summary): 终态 COMPLETE 或 ABORTED 的汇总
    /// - Err: 文件不可解析等导入前置失败
    pub async fn run(mut self, file_bytes: &[u8]) -> ImportResult<ImportSummary> {
        let start = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        let mut issues: Vec<ImportIssue> = Vec::new();

        info!(batch_id = %batch_id, bytes = file_bytes.len(), "开始导入历史流水");

        // === 阶段 READING: 全量读入 ===
        self.enter(ImportStep::Reading);
        let parsed = self.file_parser.parse(file_bytes)?;
        let total_rows = parsed.rows.len();
        info!(total_rows = total_rows, "文件读取完成");
        self.report(self.step.base_percent(), &issues);

        // === 阶段 MAPPING: 表头识别 ===
        self.enter(ImportStep::Mapping);
        let mapping = match self.column_mapper.map_columns(&parsed.header) {
            Ok((mapping, mapping_warnings)) => {
                issues.extend(mapping_warnings);
                mapping
            }
            Err(ImportError::MissingRequiredColumn { field }) => {
                // 致命: 零行处理，直接 ABORTED
                error!(field = %field, "必需列缺失，导入中止");
                self.enter(ImportStep::Aborted);
                issues.push(ImportIssue::error(
                    0,
                    Some(field.clone()),
                    format!("missing required field: {field}"),
                ));
                self.report(100, &issues);
                return Ok(Self::build_summary(
                    batch_id,
                    0,
                    0,
                    &issues,
                    &EntityResolutionPlan::default(),
                    ImportStep::Aborted,
                    start,
                ));
            }
            Err(other) => return Err(other),
        };
        debug!(?mapping, "列映射完成");
        self.report(self.step.base_percent(), &issues);

        // === 阶段 PARSING: 逐行解析 ===
        self.enter(ImportStep::Parsing);
        let mut records: Vec<RowRecord> = Vec::new();
        for (idx, raw) in parsed.rows.iter().enumerate() {
            // 行号以数据行 1 起算（不含表头）
            let row_number = idx + 1;
            match self.row_parser.parse_row(raw, &mapping, row_number) {
                Ok((record, row_warnings)) => {
                    issues.extend(row_warnings);
                    records.push(record);
                }
                Err(issue) => {
                    warn!(row_number = row_number, message = %issue.message, "行解析失败");
                    issues.push(issue);
                }
            }
        }
        info!(
            parsed = records.len(),
            rejected = total_rows - records.len(),
            "行解析完成"
        );
        self.report(self.step.base_percent(), &issues);

        if self.cancelled() {
            return Ok(self.finish_cancelled(batch_id, total_rows, 0, issues, start));
        }

        // === 阶段 RESOLVING: 实体解析/自动建档 ===
        self.enter(ImportStep::Resolving);
        let plan = self
            .entity_resolver
            .resolve(&records, &self.gateway)
            .await?;
        self.report(self.step.base_percent(), &issues);

        if self.cancelled() {
            return Ok(self.finish_cancelled(batch_id, total_rows, 0, issues, start));
        }

        // === 阶段 PERSISTING: 逐行落库 ===
        self.enter(ImportStep::Persisting);
        let mut succeeded = 0usize;
        let to_persist = records.len();

        for (persist_idx, record) in records.iter().enumerate() {
            // 取消只在行间生效；已落库的行不回滚
            if self.cancelled() {
                for remaining in &records[persist_idx..] {
                    issues.push(ImportIssue::error(
                        remaining.row_number,
                        None,
                        "import cancelled before row was persisted",
                    ));
                }
                warn!(persisted = succeeded, "导入被取消，剩余行未落库");
                break;
            }

            match self.persist_record(record, &plan).await {
                Ok(()) => succeeded += 1,
                Err(issue) => issues.push(issue),
            }

            if (persist_idx + 1) % self.session.progress_row_interval == 0 {
                self.report(Self::persisting_percent(persist_idx + 1, to_persist), &issues);
            }
        }
        self.report(self.step.base_percent(), &issues);

        // === 终态 COMPLETE: 汇总 ===
        self.enter(ImportStep::Complete);
        issues.sort_by_key(|i| i.row_number);
        let summary = Self::build_summary(
            batch_id,
            total_rows,
            succeeded,
            &issues,
            &plan,
            ImportStep::Complete,
            start,
        );
        self.report(100, &issues);

        info!(
            batch_id = %summary.batch_id,
            total = summary.total_rows,
            succeeded = summary.succeeded_rows,
            failed = summary.failed_rows,
            warnings = summary.warning_rows,
            elapsed_ms = summary.elapsed_ms,
            "历史流水导入完成"
        );

        Ok(summary)
    }

    /// 单行落库: 实体 id 回填 + 台账条目转换 + 写入
    async fn persist_record(
        &self,
        record: &RowRecord,
        plan: &EntityResolutionPlan,
    ) -> Result<(), ImportIssue> {
        let driver_id = Self::resolved_id(plan, EntityKind::Driver, &record.driver_name)
            .map_err(|reason| {
                ImportIssue::error(
                    record.row_number,
                    Some("DRIVER".to_string()),
                    format!(
                        "driver \"{}\" could not be provisioned: {reason}",
                        record.driver_name
                    ),
                )
            })?;
        let vehicle_id = Self::resolved_id(plan, EntityKind::Vehicle, &record.vehicle_name)
            .map_err(|reason| {
                ImportIssue::error(
                    record.row_number,
                    Some("VEHICLE".to_string()),
                    format!(
                        "vehicle \"{}\" could not be provisioned: {reason}",
                        record.vehicle_name
                    ),
                )
            })?;

        // 业务日期取行内解析值；审计时间取导入时刻的系统 UTC 时间
        let now = Utc::now();
        let entry = LedgerEntry {
            entry_id: Uuid::new_v4().to_string(),
            entry_date: record.date,
            driver_id,
            vehicle_id,
            earnings: record.earnings.clone(),
            total_earnings: record.total_earnings(),
            notes: record.notes.clone(),
            created_at: now,
            updated_at: now,
        };

        self.gateway.save_entry(&entry).await.map_err(|e| {
            error!(row_number = record.row_number, error = %e, "台账条目落库失败");
            ImportIssue::error(
                record.row_number,
                None,
                format!("row could not be persisted: {e}"),
            )
        })
    }

    fn resolved_id(
        plan: &EntityResolutionPlan,
        kind: EntityKind,
        name: &str,
    ) -> Result<crate::domain::types::EntityId, String> {
        match plan.lookup(kind, name) {
            Some(NameResolution::Resolved(id)) => Ok(id.clone()),
            Some(NameResolution::Failed(reason)) => Err(reason.clone()),
            None => Err("name was never resolved".to_string()),
        }
    }

    /// 取消收尾: 终态 COMPLETE，未落库行数计入 failed
    fn finish_cancelled(
        &mut self,
        batch_id: String,
        total_rows: usize,
        succeeded: usize,
        mut issues: Vec<ImportIssue>,
        start: Instant,
    ) -> ImportSummary {
        warn!(batch_id = %batch_id, "导入在阶段边界被取消");
        issues.push(ImportIssue::error(0, None, "import cancelled"));
        self.enter(ImportStep::Complete);
        issues.sort_by_key(|i| i.row_number);
        let summary = Self::build_summary(
            batch_id,
            total_rows,
            succeeded,
            &issues,
            &EntityResolutionPlan::default(),
            ImportStep::Complete,
            start,
        );
        self.report(100, &issues);
        summary
    }

    fn build_summary(
        batch_id: String,
        total_rows: usize,
        succeeded_rows: usize,
        issues: &[ImportIssue],
        plan: &EntityResolutionPlan,
        final_step: ImportStep,
        start: Instant,
    ) -> ImportSummary {
        // 带警告落库的行数（会话级 row 0 不计入；被排除的行按失败计，不重复计警告）
        let error_rows: HashSet<usize> = issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .map(|i| i.row_number)
            .collect();
        let warning_rows: HashSet<usize> = issues
            .iter()
            .filter(|i| {
                i.severity == Severity::Warning
                    && i.row_number > 0
                    && !error_rows.contains(&i.row_number)
            })
            .map(|i| i.row_number)
            .collect();

        ImportSummary {
            batch_id,
            total_rows,
            succeeded_rows,
            failed_rows: total_rows - succeeded_rows,
            warning_rows: warning_rows.len(),
            issues: issues.to_vec(),
            created_entities: plan.created_counts().clone(),
            final_step,
            imported_at: Utc::now(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn persisting_percent(done: usize, total: usize) -> u8 {
        let span =
            ImportStep::Persisting.base_percent() - ImportStep::Resolving.base_percent();
        let base = ImportStep::Resolving.base_percent() as usize;
        (base + span as usize * done / total.max(1)) as u8
    }

    fn enter(&mut self, step: ImportStep) {
        debug!(from = %self.step, to = %step, "导入阶段切换");
        self.step = step;
    }

    fn cancelled(&self) -> bool {
        self.session.cancel.is_cancelled()
    }

    fn report(&self, percent: u8, issues: &[ImportIssue]) {
        let Some(sink) = &self.progress_sink else {
            return;
        };
        let snapshot = ProgressSnapshot {
            current_step: self.step,
            percent_complete: percent,
            errors_so_far: issues
                .iter()
                .filter(|i| i.severity == Severity::Error)
                .count(),
            warnings_so_far: issues
                .iter()
                .filter(|i| i.severity == Severity::Warning)
                .count(),
        };
        sink.on_progress(&snapshot);
    }
}
