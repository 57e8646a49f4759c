//! Spreadsheet import of clients.
//!
//! A workbook is read into a [`SheetTable`] first; everything after that
//! works on the table, so the reconciliation steps do not depend on the file
//! format.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use maws_common::{AppError, AppResult};
use maws_db::entities::{client, client_column};
use sea_orm::Set;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::client::{ClientService, NewClient};
use super::client_column::ClientColumnService;
use super::tag::TagService;

/// Data key and column accessor holding the client name.
pub const NAME_KEY: &str = "고객명";
/// Data key and column accessor holding the client phone.
pub const PHONE_KEY: &str = "연락처";
/// Header whose value names the client's tag.
pub const CATEGORY_KEY: &str = "고객분류";
/// Prefix of a mapping value that requests a new column.
pub const NEW_COLUMN_PREFIX: &str = "new_";

const MAX_REPORTED_ERRORS: usize = 5;
const NEW_COLUMN_BASE_ORDER: i32 = 100;

/// Header and cell text of one worksheet. Every row has one cell per header;
/// empty cells are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Text of a cell. Whole floats print without a fraction so phone numbers
/// stored as numbers survive.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        #[allow(clippy::float_cmp)]
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_datetime().map_or_else(
            || dt.as_f64().to_string(),
            |d| {
                if d.time() == chrono::NaiveTime::MIN {
                    d.format("%Y-%m-%d").to_string()
                } else {
                    d.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            },
        ),
    }
}

/// Read the first worksheet of an `.xlsx` file into raw rows.
pub fn read_workbook(bytes: &[u8]) -> AppResult<Vec<Vec<String>>> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| AppError::BadRequest(format!("엑셀 파일을 읽을 수 없습니다: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::BadRequest("워크시트가 없습니다.".to_string()))?
        .map_err(|e| AppError::BadRequest(format!("워크시트를 읽을 수 없습니다: {e}")))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

/// Suffix repeated headers with `_2`, `_3`, … so every key is distinct.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut result = Vec::with_capacity(headers.len());

    for header in headers {
        let mut candidate = header.clone();
        if seen.contains(&candidate) {
            let count = counts.entry(header.clone()).or_insert(1);
            loop {
                *count += 1;
                candidate = format!("{header}_{count}");
                if !seen.contains(&candidate) {
                    break;
                }
            }
        }
        seen.insert(candidate.clone());
        result.push(candidate);
    }
    result
}

/// Turn raw rows into a table.
///
/// The first row holds the headers. Blank rows are dropped. When any header
/// is blank, the first data row supplies those headers and is then dropped;
/// headers still blank get `placeholder(index)`.
pub fn normalize_table(
    mut raw: Vec<Vec<String>>,
    placeholder: impl Fn(usize) -> String,
) -> AppResult<SheetTable> {
    if raw.is_empty() {
        return Err(AppError::BadRequest("엑셀 파일에 데이터가 없습니다.".to_string()));
    }
    let mut headers: Vec<String> = raw.remove(0).into_iter().map(|h| h.trim().to_string()).collect();
    let width = raw.iter().map(Vec::len).max().unwrap_or(0).max(headers.len());
    headers.resize(width, String::new());

    let mut rows: Vec<Vec<String>> = raw
        .into_iter()
        .map(|mut row| {
            row.resize(width, String::new());
            row
        })
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .collect();

    if headers.iter().any(String::is_empty) {
        let first = if rows.is_empty() { None } else { Some(rows.remove(0)) };
        for (i, header) in headers.iter_mut().enumerate() {
            if header.is_empty() {
                *header = first
                    .as_ref()
                    .map(|row| row[i].trim().to_string())
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| placeholder(i));
            }
        }
    }

    Ok(SheetTable {
        headers: dedupe_headers(headers),
        rows,
    })
}

/// Fixed client field a header can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedField {
    Name,
    Phone,
}

impl FixedField {
    const fn key(self) -> &'static str {
        match self {
            Self::Name => NAME_KEY,
            Self::Phone => PHONE_KEY,
        }
    }
}

/// A header matches a rule when it contains any of the keywords.
struct HeaderRule {
    field: FixedField,
    keywords: &'static [&'static str],
}

/// Checked in order; the first matching rule wins.
const HEADER_RULES: [HeaderRule; 2] = [
    HeaderRule {
        field: FixedField::Name,
        keywords: &["고객명", "이름", "성명", "컬렉터명", "성함"],
    },
    HeaderRule {
        field: FixedField::Phone,
        keywords: &["연락처", "전화번호", "전화", "휴대폰", "핸드폰"],
    },
];

/// Fixed field a header names by the rule table.
#[must_use]
pub fn match_header_rule(header: &str) -> Option<FixedField> {
    HEADER_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| header.contains(k)))
        .map(|rule| rule.field)
}

/// Where a column's cells go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellTarget {
    Fixed(FixedField),
    Category,
    Data(String),
}

impl CellTarget {
    fn key(&self) -> &str {
        match self {
            Self::Fixed(field) => field.key(),
            Self::Category => CATEGORY_KEY,
            Self::Data(key) => key,
        }
    }
}

/// Outcome of reconciling headers with a mapping.
#[derive(Debug, Clone, Default)]
pub struct ColumnPlan {
    /// One target per header.
    pub targets: Vec<CellTarget>,
    /// Headers that need a new client column.
    pub new_columns: Vec<String>,
    /// Header to final key.
    pub column_mapping: BTreeMap<String, String>,
}

/// Fills each fixed field and contact key at most once.
#[derive(Default)]
struct FixedSlots {
    name: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    email: Option<String>,
}

impl FixedSlots {
    /// Claim `field` for `header`, or keep the header as data when an earlier
    /// header already holds it.
    fn claim(&mut self, field: FixedField, header: &str, data_key: String) -> CellTarget {
        let slot = match field {
            FixedField::Name => &mut self.name,
            FixedField::Phone => &mut self.phone,
        };
        match slot {
            None => {
                *slot = Some(header.to_string());
                CellTarget::Fixed(field)
            }
            Some(first) => {
                warn!(
                    field = field.key(),
                    first = %first,
                    header = %header,
                    "Header matches an already filled field, keeping it as data"
                );
                CellTarget::Data(data_key)
            }
        }
    }

    /// Claim a contact data key for `header`. Only the first matching header
    /// is imported; later ones are skipped.
    fn claim_contact(&mut self, key: &str, header: &str) -> Option<CellTarget> {
        let slot = if key == ADDRESS_KEY { &mut self.address } else { &mut self.email };
        match slot {
            None => {
                *slot = Some(header.to_string());
                Some(CellTarget::Data(key.to_string()))
            }
            Some(first) => {
                warn!(key, first = %first, header = %header, "Duplicate contact header skipped");
                None
            }
        }
    }
}

/// Resolve every header to a target.
///
/// Explicitly mapped headers go first: a column id or accessor renames the
/// header to that accessor, a `new_*` value queues a column named after the
/// header. The rest go through the rule table, then fall back to data keyed
/// by the header itself.
#[must_use]
pub fn plan_columns(
    headers: &[String],
    mapping: &BTreeMap<String, String>,
    existing: &[client_column::Model],
) -> ColumnPlan {
    let mut slots = FixedSlots::default();
    let mut targets: Vec<Option<CellTarget>> = vec![None; headers.len()];
    let mut new_columns = Vec::new();

    for (i, header) in headers.iter().enumerate() {
        let Some(mapped) = mapping.get(header) else {
            continue;
        };
        if mapped.starts_with(NEW_COLUMN_PREFIX) {
            if !new_columns.contains(header) {
                new_columns.push(header.clone());
            }
            targets[i] = Some(CellTarget::Data(header.clone()));
            continue;
        }
        let Some(column) = existing
            .iter()
            .find(|c| c.id == *mapped)
            .or_else(|| existing.iter().find(|c| c.accessor == *mapped))
        else {
            warn!(header = %header, mapped = %mapped, "Mapping names no known column");
            continue;
        };
        let accessor = column.accessor.clone();
        targets[i] = Some(match accessor.as_str() {
            NAME_KEY => slots.claim(FixedField::Name, header, accessor),
            PHONE_KEY => slots.claim(FixedField::Phone, header, accessor),
            CATEGORY_KEY => CellTarget::Category,
            _ => CellTarget::Data(accessor),
        });
    }

    for (i, header) in headers.iter().enumerate() {
        if targets[i].is_some() {
            continue;
        }
        targets[i] = Some(match match_header_rule(header) {
            Some(field) => slots.claim(field, header, header.clone()),
            None if header == CATEGORY_KEY => CellTarget::Category,
            None => CellTarget::Data(header.clone()),
        });
    }

    let targets: Vec<CellTarget> = targets.into_iter().flatten().collect();
    let column_mapping = headers
        .iter()
        .zip(&targets)
        .map(|(h, t)| (h.clone(), t.key().to_string()))
        .collect();

    ColumnPlan {
        targets,
        new_columns,
        column_mapping,
    }
}

/// Result of an import with a column mapping.
#[derive(Debug, Clone, Serialize)]
pub struct MappingImportReport {
    pub message: String,
    pub created_count: usize,
    pub failed_count: usize,
    pub column_mapping: BTreeMap<String, String>,
    pub new_columns_created: usize,
    pub errors: Vec<String>,
}

/// Result of an import without a mapping.
#[derive(Debug, Clone, Serialize)]
pub struct SimpleImportReport {
    pub success: bool,
    pub message: String,
    pub total_rows: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub error_details: Vec<String>,
    pub column_mapping: BTreeMap<String, String>,
    pub detected_columns: Vec<String>,
}

const ADDRESS_KEY: &str = "주소";
const EMAIL_KEY: &str = "이메일";

/// Where a simple-import header goes.
fn simple_target(header: &str, slots: &mut FixedSlots) -> Option<CellTarget> {
    if let Some(field) = match_header_rule(header) {
        return Some(slots.claim(field, header, header.to_string()));
    }
    if header.contains("주소") {
        return slots.claim_contact(ADDRESS_KEY, header);
    }
    if header.contains("이메일") || header.to_lowercase().contains("email") {
        return slots.claim_contact(EMAIL_KEY, header);
    }
    if header.is_empty() || header.starts_with("컬럼_") {
        return None;
    }
    Some(CellTarget::Data(header.to_string()))
}

/// Client fields collected from one row.
struct RowValues {
    client: NewClient,
    category: Option<String>,
}

fn collect_row(targets: &[Option<CellTarget>], row: &[String]) -> RowValues {
    let mut client = NewClient::default();
    let mut category = None;

    for (target, cell) in targets.iter().zip(row) {
        let value = cell.trim();
        if value.is_empty() {
            continue;
        }
        match target {
            Some(CellTarget::Fixed(FixedField::Name)) => client.name = Some(value.to_string()),
            Some(CellTarget::Fixed(FixedField::Phone)) => client.phone = Some(value.to_string()),
            Some(CellTarget::Category) => category = Some(value.to_string()),
            Some(CellTarget::Data(key)) => {
                client.data.insert(key.clone(), Value::String(value.to_string()));
            }
            None => {}
        }
    }
    RowValues { client, category }
}

fn row_error(index: usize, err: &AppError) -> String {
    format!("행 {}: {err}", index + 2)
}

/// Excel import service.
#[derive(Clone)]
pub struct ExcelImportService {
    clients: ClientService,
    columns: ClientColumnService,
    tags: TagService,
}

impl ExcelImportService {
    /// Create a new import service.
    #[must_use]
    pub const fn new(clients: ClientService, columns: ClientColumnService, tags: TagService) -> Self {
        Self {
            clients,
            columns,
            tags,
        }
    }

    /// Import a workbook using an explicit header mapping.
    pub async fn import_with_mapping(
        &self,
        gallery_id: &str,
        bytes: &[u8],
        mapping: &BTreeMap<String, String>,
    ) -> AppResult<MappingImportReport> {
        let table = normalize_table(read_workbook(bytes)?, |i| format!("column{}", i + 1))?;
        self.import_table_with_mapping(gallery_id, &table, mapping).await
    }

    /// Import an already parsed table using an explicit header mapping.
    pub async fn import_table_with_mapping(
        &self,
        gallery_id: &str,
        table: &SheetTable,
        mapping: &BTreeMap<String, String>,
    ) -> AppResult<MappingImportReport> {
        let existing = self.columns.repository().find_by_gallery(gallery_id).await?;
        let plan = plan_columns(&table.headers, mapping, &existing);

        let new_columns_created = self
            .create_missing_columns(gallery_id, &plan.new_columns, &existing)
            .await?;

        let targets: Vec<Option<CellTarget>> = plan.targets.into_iter().map(Some).collect();
        let mut created_count = 0;
        let mut errors = Vec::new();

        for (i, row) in table.rows.iter().enumerate() {
            let values = collect_row(&targets, row);
            match self.create_row(gallery_id, values).await {
                Ok(client) => {
                    debug!(row = i + 2, client_id = %client.id, "Imported row");
                    created_count += 1;
                }
                Err(e) => {
                    debug!(row = i + 2, error = %e, "Row import failed");
                    errors.push(row_error(i, &e));
                }
            }
        }

        let failed_count = errors.len();
        info!(
            gallery_id = %gallery_id,
            rows = table.rows.len(),
            created_count,
            failed_count,
            new_columns_created,
            "Excel import with mapping finished"
        );
        errors.truncate(MAX_REPORTED_ERRORS);

        Ok(MappingImportReport {
            message: format!("업로드 완료: 성공 {created_count}건, 실패 {failed_count}건"),
            created_count,
            failed_count,
            column_mapping: plan.column_mapping,
            new_columns_created,
            errors,
        })
    }

    /// Create queued columns whose accessor the gallery does not have yet.
    async fn create_missing_columns(
        &self,
        gallery_id: &str,
        headers: &[String],
        existing: &[client_column::Model],
    ) -> AppResult<usize> {
        let known: HashSet<&str> = existing.iter().map(|c| c.accessor.as_str()).collect();
        let models: Vec<client_column::ActiveModel> = headers
            .iter()
            .filter(|h| !known.contains(h.as_str()))
            .enumerate()
            .map(|(i, header)| {
                let order = NEW_COLUMN_BASE_ORDER + i32::try_from(i).unwrap_or(i32::MAX - NEW_COLUMN_BASE_ORDER);
                self.columns
                    .new_model(gallery_id, header.clone(), header.clone(), "text".to_string(), order)
            })
            .collect();

        let created = models.len();
        self.columns.repository().create_many(models).await?;
        Ok(created)
    }

    async fn create_row(&self, gallery_id: &str, values: RowValues) -> AppResult<client::Model> {
        let RowValues {
            mut client,
            category,
        } = values;
        if let Some(category) = category {
            let (tag, _) = self.tags.get_or_create(gallery_id, &category, None).await?;
            client.tag_ids.push(tag.id);
        }
        self.clients.create_client(gallery_id, client).await
    }

    /// Import a workbook with the built-in header rules, merging rows into
    /// existing clients with the same name and phone.
    pub async fn import_simple(&self, gallery_id: &str, bytes: &[u8]) -> AppResult<SimpleImportReport> {
        let table = normalize_table(read_workbook(bytes)?, |i| format!("컬럼_{}", i + 1))?;
        self.import_table_simple(gallery_id, &table).await
    }

    /// Simple import of an already parsed table.
    pub async fn import_table_simple(
        &self,
        gallery_id: &str,
        table: &SheetTable,
    ) -> AppResult<SimpleImportReport> {
        let mut slots = FixedSlots::default();
        let targets: Vec<Option<CellTarget>> = table
            .headers
            .iter()
            .map(|h| simple_target(h, &mut slots))
            .collect();
        let column_mapping: BTreeMap<String, String> = table
            .headers
            .iter()
            .zip(&targets)
            .filter_map(|(h, t)| t.as_ref().map(|t| (h.clone(), t.key().to_string())))
            .collect();

        let mut success_count = 0;
        let mut errors = Vec::new();
        for (i, row) in table.rows.iter().enumerate() {
            let values = collect_row(&targets, row);
            match self.merge_or_create(gallery_id, values.client).await {
                Ok(()) => success_count += 1,
                Err(e) => errors.push(row_error(i, &e)),
            }
        }

        let error_count = errors.len();
        info!(gallery_id = %gallery_id, success_count, error_count, "Simple Excel import finished");
        errors.truncate(MAX_REPORTED_ERRORS);

        Ok(SimpleImportReport {
            success: true,
            message: format!("처리 완료: 성공 {success_count}건, 실패 {error_count}건"),
            total_rows: table.rows.len(),
            success_count,
            error_count,
            error_details: errors,
            column_mapping,
            detected_columns: table.headers.clone(),
        })
    }

    async fn merge_or_create(&self, gallery_id: &str, input: NewClient) -> AppResult<()> {
        if let (Some(name), Some(phone)) = (input.name.as_deref(), input.phone.as_deref()) {
            let repo = self.clients.repository();
            if let Some(existing) = repo.find_by_name_and_phone(gallery_id, name, phone).await? {
                let mut data: Map<String, Value> = existing.data.as_object().cloned().unwrap_or_default();
                data.extend(input.data);
                let mut active: client::ActiveModel = existing.into();
                active.data = Set(Value::Object(data));
                active.updated_at = Set(Some(chrono::Utc::now().into()));
                repo.update(active).await?;
                return Ok(());
            }
        }
        self.clients.create_client(gallery_id, input).await.map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::tag::{DEFAULT_TAG_NAME, tests::test_tag};
    use chrono::Utc;
    use maws_db::repositories::{ClientColumnRepository, ClientRepository, TagRepository};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult, Statement};
    use serde_json::json;
    use std::sync::Arc;

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    fn column(id: &str, accessor: &str) -> client_column::Model {
        client_column::Model {
            id: id.to_string(),
            gallery_id: "g1".to_string(),
            header: accessor.to_string(),
            accessor: accessor.to_string(),
            column_type: "text".to_string(),
            order: 0,
            created_at: Utc::now().into(),
        }
    }

    fn service(db: DatabaseConnection) -> ExcelImportService {
        service_on(Arc::new(db))
    }

    fn service_on(db: Arc<DatabaseConnection>) -> ExcelImportService {
        let tags = TagService::new(TagRepository::new(db.clone()));
        ExcelImportService::new(
            ClientService::new(ClientRepository::new(db.clone()), tags.clone()),
            ClientColumnService::new(ClientColumnRepository::new(db)),
            tags,
        )
    }

    fn count_row(n: i64) -> BTreeMap<&'static str, sea_orm::Value> {
        BTreeMap::from([("num_items", sea_orm::Value::BigInt(Some(n)))])
    }

    fn exec_ok() -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }
    }

    #[test]
    fn test_normalize_fills_blank_headers_from_first_row() {
        let raw = vec![
            strings(&["고객명", "", ""]),
            strings(&["", "", ""]),
            strings(&["", "연락처", ""]),
            strings(&["홍길동", "010-1234-5678", "x"]),
        ];
        let table = normalize_table(raw, |i| format!("컬럼_{}", i + 1)).unwrap();

        assert_eq!(table.headers, strings(&["고객명", "연락처", "컬럼_3"]));
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][1], "010-1234-5678");
    }

    #[test]
    fn test_normalize_dedupes_headers() {
        let raw = vec![strings(&["메모", "메모", "메모_2", "메모"]), strings(&["a", "b", "c", "d"])];
        let table = normalize_table(raw, |i| format!("column{}", i + 1)).unwrap();
        assert_eq!(table.headers, strings(&["메모", "메모_2", "메모_2_2", "메모_3"]));
    }

    #[test]
    fn test_normalize_pads_short_rows() {
        let raw = vec![strings(&["고객명", "연락처"]), strings(&["홍길동"])];
        let table = normalize_table(raw, |i| format!("column{}", i + 1)).unwrap();
        assert_eq!(table.rows[0], strings(&["홍길동", ""]));
        assert!(normalize_table(vec![], |_| String::new()).is_err());
    }

    #[test]
    fn test_rule_table_order() {
        assert_eq!(match_header_rule("컬렉터명"), Some(FixedField::Name));
        assert_eq!(match_header_rule("휴대폰 번호"), Some(FixedField::Phone));
        assert_eq!(match_header_rule("직업"), None);
    }

    #[test]
    fn test_plan_maps_existing_column_to_accessor() {
        let headers = strings(&["이름", "전화", "구매작품"]);
        let mapping = BTreeMap::from([("구매작품".to_string(), "col-1".to_string())]);
        let plan = plan_columns(&headers, &mapping, &[column("col-1", "purchased_artwork")]);

        assert_eq!(plan.targets[0], CellTarget::Fixed(FixedField::Name));
        assert_eq!(plan.targets[1], CellTarget::Fixed(FixedField::Phone));
        assert_eq!(plan.targets[2], CellTarget::Data("purchased_artwork".to_string()));
        assert_eq!(plan.column_mapping["구매작품"], "purchased_artwork");
        assert!(plan.new_columns.is_empty());
    }

    #[test]
    fn test_plan_keeps_second_name_header_as_data() {
        let headers = strings(&["고객명", "성함", "고객분류"]);
        let plan = plan_columns(&headers, &BTreeMap::new(), &[]);

        assert_eq!(plan.targets[0], CellTarget::Fixed(FixedField::Name));
        assert_eq!(plan.targets[1], CellTarget::Data("성함".to_string()));
        assert_eq!(plan.targets[2], CellTarget::Category);
    }

    #[test]
    fn test_plan_explicit_name_mapping_wins_over_rules() {
        let headers = strings(&["이름", "컬렉터"]);
        let mapping = BTreeMap::from([("컬렉터".to_string(), "col-name".to_string())]);
        let plan = plan_columns(&headers, &mapping, &[column("col-name", NAME_KEY)]);

        assert_eq!(plan.targets[1], CellTarget::Fixed(FixedField::Name));
        assert_eq!(plan.targets[0], CellTarget::Data("이름".to_string()));
    }

    #[test]
    fn test_collect_row_omits_blank_values() {
        let targets = vec![
            Some(CellTarget::Fixed(FixedField::Name)),
            Some(CellTarget::Data("직업".to_string())),
            Some(CellTarget::Data("메모".to_string())),
            None,
        ];
        let values = collect_row(&targets, &strings(&["홍길동", "작가", "  ", "skip"]));

        assert_eq!(values.client.name.as_deref(), Some("홍길동"));
        assert_eq!(values.client.data.len(), 1);
        assert_eq!(values.client.data["직업"], json!("작가"));
    }

    #[test]
    fn test_simple_targets() {
        let mut slots = FixedSlots::default();
        assert_eq!(
            simple_target("고객 이름", &mut slots),
            Some(CellTarget::Fixed(FixedField::Name))
        );
        assert_eq!(
            simple_target("Email", &mut slots),
            Some(CellTarget::Data("이메일".to_string()))
        );
        assert_eq!(
            simple_target("E-mail", &mut slots),
            Some(CellTarget::Data("E-mail".to_string()))
        );
        assert_eq!(
            simple_target("자택 주소", &mut slots),
            Some(CellTarget::Data("주소".to_string()))
        );
        assert_eq!(simple_target("컬럼_4", &mut slots), None);
    }

    #[test]
    fn test_simple_targets_keep_first_contact_header() {
        let mut slots = FixedSlots::default();
        assert_eq!(
            simple_target("자택 주소", &mut slots),
            Some(CellTarget::Data("주소".to_string()))
        );
        assert_eq!(simple_target("회사 주소", &mut slots), None);
        assert_eq!(
            simple_target("이메일 주소", &mut slots),
            None,
            "contains 주소, so it counts as a second address header"
        );
        assert_eq!(
            simple_target("Email", &mut slots),
            Some(CellTarget::Data("이메일".to_string()))
        );
        assert_eq!(simple_target("이메일(업무)", &mut slots), None);
    }

    #[tokio::test]
    async fn test_import_creates_new_column_and_tagged_clients() {
        let client = |id: &str, name: &str| client::Model {
            id: id.to_string(),
            gallery_id: "g1".to_string(),
            name: Some(name.to_string()),
            phone: Some("010-0000-0000".to_string()),
            data: json!({"직업": "작가"}),
            created_at: Utc::now().into(),
            updated_at: None,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<client_column::Model>::new()])
            .append_query_results([[client("c1", "홍길동")]])
            .append_query_results([[count_row(0)]])
            .append_query_results([[test_tag("t1", DEFAULT_TAG_NAME)]])
            .append_query_results([[client("c2", "김철수")]])
            .append_query_results([[count_row(0)]])
            .append_query_results([[test_tag("t1", DEFAULT_TAG_NAME)]])
            .append_exec_results([exec_ok(), exec_ok(), exec_ok()])
            .into_connection();
        let db = Arc::new(db);

        let table = SheetTable {
            headers: strings(&["고객명", "연락처", "직업"]),
            rows: vec![
                strings(&["홍길동", "010-1111-2222", "작가"]),
                strings(&["김철수", "010-3333-4444", "교사"]),
            ],
        };
        let mapping = BTreeMap::from([("직업".to_string(), "new_1".to_string())]);

        let report = service_on(db.clone())
            .import_table_with_mapping("g1", &table, &mapping)
            .await
            .unwrap();

        assert_eq!(report.created_count, 2);
        assert_eq!(report.failed_count, 0);
        assert_eq!(report.new_columns_created, 1);
        assert_eq!(report.column_mapping["직업"], "직업");
        assert_eq!(report.column_mapping["고객명"], NAME_KEY);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let statements: Vec<&Statement> = log.iter().flat_map(|t| t.statements()).collect();
        let inserted_data: Vec<serde_json::Value> = statements
            .iter()
            .filter(|s| s.sql.starts_with(r#"INSERT INTO "client" "#))
            .flat_map(|s| s.values.iter().flat_map(|v| v.0.iter()))
            .filter_map(|v| match v {
                sea_orm::Value::Json(Some(j)) => Some((**j).clone()),
                _ => None,
            })
            .collect();
        assert_eq!(inserted_data, vec![json!({"직업": "작가"}), json!({"직업": "교사"})]);
        let tag_links = statements
            .iter()
            .filter(|s| s.sql.starts_with(r#"INSERT INTO "client_tag""#))
            .count();
        assert_eq!(tag_links, 2);
    }

    #[tokio::test]
    async fn test_reupload_skips_existing_column() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[column("col-1", "직업")]])
            .into_connection();

        let table = SheetTable {
            headers: strings(&["직업"]),
            rows: vec![],
        };
        let mapping = BTreeMap::from([("직업".to_string(), "new_1".to_string())]);
        let report = service(db)
            .import_table_with_mapping("g1", &table, &mapping)
            .await
            .unwrap();

        assert_eq!(report.new_columns_created, 0);
        assert_eq!(report.created_count, 0);
    }

    #[tokio::test]
    async fn test_row_failures_are_counted() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<client_column::Model>::new()])
            .into_connection();

        let table = SheetTable {
            headers: strings(&["고객명"]),
            rows: vec![strings(&["홍길동"])],
        };
        let report = service(db)
            .import_table_with_mapping("g1", &table, &BTreeMap::new())
            .await
            .unwrap();

        assert_eq!(report.created_count, 0);
        assert_eq!(report.failed_count, 1);
        assert!(report.errors[0].starts_with("행 2:"));
    }
}
