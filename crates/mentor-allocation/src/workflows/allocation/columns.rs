use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use super::capacity::coerce_capacity;
use super::domain::{EligibilityProfile, FieldValue, Mentor, Stage, Student};
use super::policy::Policy;
use super::table::{Table, TableKind};
use super::AllocationError;
use crate::workflows::normalizer::{is_blank_sentinel, normalize_name};

/// Canonical field a table column resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Field {
    Eligibility(Stage),
    StudentId,
    MentorId,
    RemainingCapacity,
    InitialCapacity,
}

impl Field {
    fn builtin_synonyms(self) -> &'static [&'static str] {
        match self {
            Field::Eligibility(Stage::Type) => &["major_code", "type", "کدرشته", "کد رشته"],
            Field::Eligibility(Stage::Group) => &["exam_group", "group", "گروه آزمایشی"],
            Field::Eligibility(Stage::Gender) => &["gender", "sex", "جنسیت"],
            Field::Eligibility(Stage::GraduationStatus) => &[
                "graduation_status",
                "student_status",
                "دانش آموز فارغ",
                "وضعیت تحصیلی",
            ],
            Field::Eligibility(Stage::Center) => &["center", "center_code", "مرکز گلستان صدرا", "مرکز"],
            Field::Eligibility(Stage::Finance) => &["finance", "finance_code", "مالی حکمت بنیاد", "مالی"],
            Field::Eligibility(Stage::School) => &["school_code", "school", "کد مدرسه"],
            Field::Eligibility(Stage::CapacityGate) | Field::RemainingCapacity => &[
                "remaining_capacity",
                "capacity",
                "ظرفیت باقی مانده",
                "ظرفیت",
            ],
            Field::StudentId => &["student_id", "national_id", "کد ملی", "کدملی"],
            Field::MentorId => &["mentor_id", "employee_code", "کد کارمندی پشتیبان", "پشتیبان"],
            Field::InitialCapacity => &["initial_capacity", "total_capacity", "ظرفیت کل"],
        }
    }

    fn declared_column(self, policy: &Policy) -> Option<&str> {
        match self {
            Field::Eligibility(stage) => Some(policy.stage_column(stage)),
            Field::RemainingCapacity => Some(policy.capacity_column()),
            _ => None,
        }
    }

    fn display_name(self, policy: &Policy) -> String {
        match self.declared_column(policy) {
            Some(column) => column.to_string(),
            None => self.builtin_synonyms()[0].to_string(),
        }
    }

    /// Accepted header spellings, declared column first, without duplicates.
    pub fn accepted_names(self, policy: &Policy) -> Vec<String> {
        let mut names = Vec::new();
        if let Some(declared) = self.declared_column(policy) {
            names.push(declared.to_string());
            names.extend(policy.aliases_for(declared).iter().cloned());
        }
        names.extend(self.builtin_synonyms().iter().map(|name| name.to_string()));

        let mut seen = BTreeSet::new();
        names.retain(|name| seen.insert(normalize_name(name)));
        names
    }
}

fn required_fields(kind: TableKind) -> Vec<Field> {
    let mut fields: Vec<Field> = Stage::ELIGIBILITY.into_iter().map(Field::Eligibility).collect();
    match kind {
        TableKind::Students => fields.push(Field::StudentId),
        TableKind::Pool => {
            fields.push(Field::MentorId);
            fields.push(Field::RemainingCapacity);
        }
    }
    fields
}

/// Header positions for each canonical field, resolved once per table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    columns: BTreeMap<Field, usize>,
}

impl ColumnMap {
    pub fn resolve(table: &Table, kind: TableKind, policy: &Policy) -> Result<Self, AllocationError> {
        let mut header_index: HashMap<String, usize> = HashMap::new();
        for (position, header) in table.headers().iter().enumerate() {
            header_index.entry(normalize_name(header)).or_insert(position);
        }

        let lookup = |field: Field| {
            field
                .accepted_names(policy)
                .iter()
                .find_map(|name| header_index.get(&normalize_name(name)).copied())
        };

        let mut columns = BTreeMap::new();
        for field in required_fields(kind) {
            let position = lookup(field).ok_or_else(|| AllocationError::DataMissing {
                table: kind,
                column: field.display_name(policy),
                accepted: field.accepted_names(policy),
            })?;
            columns.insert(field, position);
        }
        if kind == TableKind::Pool {
            if let Some(position) = lookup(Field::InitialCapacity) {
                columns.insert(Field::InitialCapacity, position);
            }
        }

        debug!(table = %kind, columns = columns.len(), "resolved table columns");
        Ok(Self { columns })
    }

    pub fn position(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    fn cell<'t>(&self, table: &'t Table, row: usize, field: Field) -> &'t str {
        self.position(field)
            .map(|column| table.cell(row, column))
            .unwrap_or_default()
    }

    fn profile(&self, table: &Table, row: usize) -> EligibilityProfile {
        EligibilityProfile::from_pairs(
            Stage::ELIGIBILITY
                .into_iter()
                .map(|stage| (stage, FieldValue::parse(self.cell(table, row, Field::Eligibility(stage))))),
        )
    }
}

/// Resolve and convert the student table.
pub fn load_students(table: &Table, policy: &Policy) -> Result<Vec<Student>, AllocationError> {
    let columns = ColumnMap::resolve(table, TableKind::Students, policy)?;

    (0..table.len())
        .map(|row| {
            let id = columns.cell(table, row, Field::StudentId).trim();
            if id.is_empty() {
                return Err(AllocationError::BlankIdentifier {
                    table: TableKind::Students,
                    row: row + 1,
                });
            }
            Ok(Student::new(id, columns.profile(table, row)))
        })
        .collect()
}

/// Resolve and convert the mentor pool, coercing capacities.
pub fn load_pool(table: &Table, policy: &Policy) -> Result<Vec<Mentor>, AllocationError> {
    let columns = ColumnMap::resolve(table, TableKind::Pool, policy)?;
    let mut seen = BTreeSet::new();
    let mut pool = Vec::with_capacity(table.len());

    for row in 0..table.len() {
        let id = columns.cell(table, row, Field::MentorId).trim();
        if id.is_empty() {
            return Err(AllocationError::BlankIdentifier {
                table: TableKind::Pool,
                row: row + 1,
            });
        }
        if !seen.insert(id.to_string()) {
            return Err(AllocationError::DuplicateMentor {
                mentor_id: id.to_string(),
            });
        }

        let invalid = |source| AllocationError::InvalidCapacity {
            mentor_id: id.to_string(),
            source,
        };
        let remaining = coerce_capacity(columns.cell(table, row, Field::RemainingCapacity))
            .map_err(invalid)?;
        let initial_raw = columns.cell(table, row, Field::InitialCapacity);
        let initial = if is_blank_sentinel(initial_raw) {
            remaining
        } else {
            coerce_capacity(initial_raw).map_err(invalid)?
        };

        pool.push(
            Mentor::new(id, columns.profile(table, row), remaining).with_initial_capacity(initial),
        );
    }

    Ok(pool)
}
