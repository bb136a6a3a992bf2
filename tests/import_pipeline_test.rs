// ==========================================
// 车队收益台账系统 - 导入管道集成测试
// ==========================================
// 覆盖: 端到端导入、表头缺失中止、实体去重建档、
//       取消、单行落库失败隔离、进度上报
// ==========================================


use async_trait::async_trait;
use fleet_ledger::repository::error::{GatewayError, GatewayResult};
use fleet_ledger::{
    CancelFlag, EntityId, EntityKind, ImportOrchestrator, ImportStep, LedgerEntry,
    PersistenceGateway, ProgressSink, ProgressSnapshot, Severity, UNKNOWN_DRIVER, UNKNOWN_VEHICLE,
};
use std::sync::{Arc, Mutex};
use test_helpers::{count_rows, create_test_gateway, day_first_session, query_one};

// ==========================================
// 场景: 规范文件端到端
// ==========================================
#[tokio::test]
async fn test_clean_file_end_to_end() {
    fleet_ledger::logging::init_test();
    let (_tmp, gateway, db_path) = create_test_gateway().unwrap();
    let csv = b"Date,Driver,Vehicle,Uber,Careem\n25/12/2023,John,Toyota Camry,75.25,50.00\n";

    let summary = ImportOrchestrator::new(gateway, day_first_session())
        .run(csv)
        .await
        .unwrap();

    assert_eq!(summary.total_rows, 1);
    assert_eq!(summary.succeeded_rows, 1);
    assert_eq!(summary.failed_rows, 0);
    assert!(summary.issues.is_empty());
    assert_eq!(summary.final_step, ImportStep::Complete);
    assert_eq!(summary.created_count(EntityKind::Driver), 1);
    assert_eq!(summary.created_count(EntityKind::Vehicle), 1);

    // 业务日期为 UTC 零点；合计收益为各平台之和
    assert_eq!(count_rows(&db_path, "ledger_entry"), 1);
    let entry_date: String = query_one(&db_path, "SELECT entry_date FROM ledger_entry");
    assert!(entry_date.starts_with("2023-12-25T00:00:00"));
    let total: f64 = query_one(&db_path, "SELECT total_earnings FROM ledger_entry");
    assert!((total - 125.25).abs() < 1e-9);
    let driver_name: String = query_one(
        &db_path,
        "SELECT e.name FROM entity e JOIN ledger_entry l ON l.driver_id = e.entity_id",
    );
    assert_eq!(driver_name, "John");
}

// ==========================================
// 场景: 日期不可解析 → 整行排除
// ==========================================
#[tokio::test]
async fn test_unparseable_date_row_excluded() {
    let (_tmp, gateway, db_path) = create_test_gateway().unwrap();
    let csv = b"Date,Driver,Vehicle,Uber,Careem\nnot-a-date,John,Toyota,10,0\n";

    let summary = ImportOrchestrator::new(gateway, day_first_session())
        .run(csv)
        .await
        .unwrap();

    assert_eq!(summary.failed_rows, 1);
    assert_eq!(summary.succeeded_rows, 0);
    let errors: Vec<_> = summary
        .issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "unparseable date: not-a-date");
    assert_eq!(errors[0].row_number, 1);

    assert_eq!(count_rows(&db_path, "ledger_entry"), 0);
    // 被排除行不参与实体建档
    assert_eq!(count_rows(&db_path, "entity"), 0);
}

// ==========================================
// 场景: 表头无日期列 → ABORTED，零行处理
// ==========================================
#[tokio::test]
async fn test_missing_date_column_aborts() {
    let (_tmp, gateway, db_path) = create_test_gateway().unwrap();
    let csv = b"Driver,Vehicle,Uber,Careem\nJohn,Toyota,10,0\n";

    let summary = ImportOrchestrator::new(gateway, day_first_session())
        .run(csv)
        .await
        .unwrap();

    assert_eq!(summary.final_step, ImportStep::Aborted);
    assert_eq!(summary.total_rows, 0);
    assert_eq!(summary.succeeded_rows, 0);
    assert_eq!(summary.issues.len(), 1);
    assert_eq!(summary.issues[0].severity, Severity::Error);
    assert_eq!(summary.issues[0].message, "missing required field: DATE");

    assert_eq!(count_rows(&db_path, "ledger_entry"), 0);
    assert_eq!(count_rows(&db_path, "entity"), 0);
}

// ==========================================
// 场景: 重复新名称只建档一次，两行同 id
// ==========================================
#[tokio::test]
async fn test_repeated_new_driver_created_once() {
    let (_tmp, gateway, db_path) = create_test_gateway().unwrap();
    let csv = b"Date,Driver,Vehicle,Uber,Careem\n\
        25/12/2023,Maria,Toyota,10,0\n\
        26/12/2023,maria,Honda,20,5\n";

    let summary = ImportOrchestrator::new(gateway, day_first_session())
        .run(csv)
        .await
        .unwrap();

    assert_eq!(summary.succeeded_rows, 2);
    assert_eq!(summary.created_count(EntityKind::Driver), 1);

    let driver_count: i64 = query_one(
        &db_path,
        "SELECT COUNT(*) FROM entity WHERE kind = 'driver'",
    );
    assert_eq!(driver_count, 1);
    let distinct_refs: i64 = query_one(
        &db_path,
        "SELECT COUNT(DISTINCT driver_id) FROM ledger_entry",
    );
    assert_eq!(distinct_refs, 1);
}

// ==========================================
// 场景: 可选字段全空白 → 占位值落库，计警告不计失败
// ==========================================
#[tokio::test]
async fn test_blank_optional_fields_persist_with_placeholders() {
    let (_tmp, gateway, db_path) = create_test_gateway().unwrap();
    let csv = b"Date,Driver,Vehicle,Uber,Careem\n25/12/2023,,,75.25,50.00\n";

    let summary = ImportOrchestrator::new(gateway, day_first_session())
        .run(csv)
        .await
        .unwrap();

    assert_eq!(summary.succeeded_rows, 1);
    assert_eq!(summary.failed_rows, 0);
    assert_eq!(summary.warning_rows, 1);
    assert_eq!(summary.issue_count(Severity::Warning), 2);
    assert_eq!(summary.issue_count(Severity::Error), 0);

    let driver_name: String = query_one(
        &db_path,
        "SELECT e.name FROM entity e JOIN ledger_entry l ON l.driver_id = e.entity_id",
    );
    assert_eq!(driver_name, UNKNOWN_DRIVER);
    let vehicle_name: String = query_one(
        &db_path,
        "SELECT e.name FROM entity e JOIN ledger_entry l ON l.vehicle_id = e.entity_id",
    );
    assert_eq!(vehicle_name, UNKNOWN_VEHICLE);
}

// ==========================================
// 场景: 问题列表按行号排序
// ==========================================
#[tokio::test]
async fn test_issues_sorted_by_row_number() {
    let (_tmp, gateway, _db_path) = create_test_gateway().unwrap();
    let csv = b"Date,Driver,Vehicle,Uber,Careem\n\
        bad-date,John,Toyota,10,0\n\
        25/12/2023,,Honda,20,5\n\
        also-bad,Maria,Kia,30,0\n";

    let summary = ImportOrchestrator::new(gateway, day_first_session())
        .run(csv)
        .await
        .unwrap();

    let numbers: Vec<usize> = summary.issues.iter().map(|i| i.row_number).collect();
    let mut sorted = numbers.clone();
    sorted.sort_unstable();
    assert_eq!(numbers, sorted);
    assert_eq!(summary.failed_rows, 2);
    assert_eq!(summary.succeeded_rows, 1);
}

// ==========================================
// 进度上报
// ==========================================
struct RecordingSink {
    snapshots: Mutex<Vec<ProgressSnapshot>>,
}

impl ProgressSink for RecordingSink {
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot.clone());
    }
}

#[tokio::test]
async fn test_progress_reported_at_phase_boundaries_and_row_interval() {
    let (_tmp, gateway, _db_path) = create_test_gateway().unwrap();

    // 5 行数据，落库阶段每 2 行上报一次
    let mut csv = String::from("Date,Driver,Vehicle,Uber,Careem\n");
    for day in 1..=5 {
        csv.push_str(&format!("{day}/12/2023,John,Toyota,10,0\n"));
    }

    let sink = Arc::new(RecordingSink {
        snapshots: Mutex::new(Vec::new()),
    });
    let session = day_first_session().with_progress_row_interval(2);

    let summary = ImportOrchestrator::new(gateway, session)
        .with_progress_sink(sink.clone())
        .run(csv.as_bytes())
        .await
        .unwrap();
    assert_eq!(summary.succeeded_rows, 5);

    let snapshots = sink.snapshots.lock().unwrap();
    let steps: Vec<ImportStep> = snapshots.iter().map(|s| s.current_step).collect();
    assert!(steps.contains(&ImportStep::Reading));
    assert!(steps.contains(&ImportStep::Mapping));
    assert!(steps.contains(&ImportStep::Parsing));
    assert!(steps.contains(&ImportStep::Resolving));
    // 行间上报 + 阶段边界上报
    assert!(steps.iter().filter(|s| **s == ImportStep::Persisting).count() >= 3);
    assert_eq!(snapshots.last().unwrap().percent_complete, 100);

    // 百分比单调不减
    let percents: Vec<u8> = snapshots.iter().map(|s| s.percent_complete).collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
}

// ==========================================
// 取消: 落库行间生效，已落库行不回滚
// ==========================================
struct CancellingSink {
    flag: CancelFlag,
}

impl ProgressSink for CancellingSink {
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        if snapshot.current_step == ImportStep::Persisting && snapshot.percent_complete < 95 {
            self.flag.cancel();
        }
    }
}

#[tokio::test]
async fn test_cancellation_between_persisted_rows() {
    let (_tmp, gateway, db_path) = create_test_gateway().unwrap();
    let csv = b"Date,Driver,Vehicle,Uber,Careem\n\
        1/12/2023,John,Toyota,10,0\n\
        2/12/2023,John,Toyota,10,0\n\
        3/12/2023,John,Toyota,10,0\n";

    let session = day_first_session().with_progress_row_interval(1);
    let sink = Arc::new(CancellingSink {
        flag: session.cancel.clone(),
    });

    let summary = ImportOrchestrator::new(gateway, session)
        .with_progress_sink(sink)
        .run(csv)
        .await
        .unwrap();

    // 第 1 行落库后取消；其余行降级为 ERROR
    assert_eq!(summary.final_step, ImportStep::Complete);
    assert_eq!(summary.succeeded_rows, 1);
    assert_eq!(summary.failed_rows, 2);
    assert!(summary
        .issues
        .iter()
        .any(|i| i.message == "import cancelled before row was persisted"));
    assert_eq!(count_rows(&db_path, "ledger_entry"), 1);
}

#[tokio::test]
async fn test_cancellation_before_resolving_persists_nothing() {
    let (_tmp, gateway, db_path) = create_test_gateway().unwrap();
    let csv = b"Date,Driver,Vehicle,Uber,Careem\n25/12/2023,John,Toyota,10,0\n";

    let session = day_first_session();
    session.cancel.cancel(); // 运行前即已取消

    let summary = ImportOrchestrator::new(gateway, session)
        .run(csv)
        .await
        .unwrap();

    assert_eq!(summary.final_step, ImportStep::Complete);
    assert_eq!(summary.succeeded_rows, 0);
    assert_eq!(summary.failed_rows, 1);
    assert_eq!(count_rows(&db_path, "ledger_entry"), 0);
    assert_eq!(count_rows(&db_path, "entity"), 0);
}

// ==========================================
// 失败隔离: 单行落库失败 / 单实体建档失败
// ==========================================
// 测试用网关: 指定名称建档必败，指定司机的条目写入必败
struct FlakyGateway {
    ids: Mutex<std::collections::HashMap<(EntityKind, String), EntityId>>,
    saved: Mutex<Vec<LedgerEntry>>,
    failing_create: Option<String>,
    failing_save_driver: Option<EntityId>,
}

impl FlakyGateway {
    fn new() -> Self {
        Self {
            ids: Mutex::new(std::collections::HashMap::new()),
            saved: Mutex::new(Vec::new()),
            failing_create: None,
            failing_save_driver: None,
        }
    }
}

#[async_trait]
impl PersistenceGateway for FlakyGateway {
    async fn find_entity_by_name(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> GatewayResult<Option<EntityId>> {
        Ok(self.ids.lock().unwrap().get(&(kind, name.to_lowercase())).cloned())
    }

    async fn create_entity(&self, kind: EntityKind, name: &str) -> GatewayResult<EntityId> {
        if self.failing_create.as_deref() == Some(name) {
            return Err(GatewayError::QueryError("disk full".to_string()));
        }
        let id = EntityId(format!("{kind}-{}", name.to_lowercase()));
        self.ids
            .lock()
            .unwrap()
            .insert((kind, name.to_lowercase()), id.clone());
        Ok(id)
    }

    async fn save_entry(&self, entry: &LedgerEntry) -> GatewayResult<()> {
        if self.failing_save_driver.as_ref() == Some(&entry.driver_id) {
            return Err(GatewayError::QueryError("constraint failed".to_string()));
        }
        self.saved.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

#[tokio::test]
async fn test_entity_creation_failure_downgrades_only_referencing_rows() {
    let mut gateway = FlakyGateway::new();
    gateway.failing_create = Some("Maria".to_string());
    let csv = b"Date,Driver,Vehicle,Uber,Careem\n\
        1/12/2023,Maria,Toyota,10,0\n\
        2/12/2023,John,Toyota,20,0\n\
        3/12/2023,Maria,Honda,30,0\n";

    let summary = ImportOrchestrator::new(gateway, day_first_session())
        .run(csv)
        .await
        .unwrap();

    // Maria 的两行降级为 ERROR，John 的行正常落库
    assert_eq!(summary.succeeded_rows, 1);
    assert_eq!(summary.failed_rows, 2);
    let provision_errors: Vec<_> = summary
        .issues
        .iter()
        .filter(|i| i.message.contains("could not be provisioned"))
        .collect();
    assert_eq!(provision_errors.len(), 2);
    assert!(provision_errors[0].message.contains("Maria"));
}

#[tokio::test]
async fn test_persistence_failure_does_not_halt_remaining_rows() {
    let mut gateway = FlakyGateway::new();
    gateway.failing_save_driver = Some(EntityId("driver-bad".to_string()));
    let csv = b"Date,Driver,Vehicle,Uber,Careem\n\
        1/12/2023,Bad,Toyota,10,0\n\
        2/12/2023,Good,Toyota,20,0\n";

    let summary = ImportOrchestrator::new(gateway, day_first_session())
        .run(csv)
        .await
        .unwrap();

    assert_eq!(summary.succeeded_rows, 1);
    assert_eq!(summary.failed_rows, 1);
    assert!(summary
        .issues
        .iter()
        .any(|i| i.message.starts_with("row could not be persisted")));
    assert_eq!(summary.final_step, ImportStep::Complete);
}

// ==========================================
// 会话级警告: 可选列未匹配
// ==========================================
#[tokio::test]
async fn test_unmapped_optional_columns_reported_as_session_warnings() {
    let (_tmp, gateway, _db_path) = create_test_gateway().unwrap();
    // 仅日期与 Uber 列；Driver/Vehicle/Careem 均未匹配
    let csv = b"Fecha,Uber\n25/12/2023,75.25\n";

    let summary = ImportOrchestrator::new(gateway, day_first_session())
        .run(csv)
        .await
        .unwrap();

    assert_eq!(summary.succeeded_rows, 1);
    let session_warnings: Vec<_> = summary
        .issues
        .iter()
        .filter(|i| i.row_number == 0)
        .collect();
    assert_eq!(session_warnings.len(), 3);
    assert!(session_warnings
        .iter()
        .all(|i| i.severity == Severity::Warning));
}
