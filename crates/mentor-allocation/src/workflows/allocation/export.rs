//! Flat CSV views over batch outputs.

use serde::Serialize;
use std::io::Write;

use super::domain::{Mentor, Stage};
use super::outcome::{AllocationLogEntry, AllocationRecord};
use super::trace::TraceRecord;

#[derive(Debug, Clone, Serialize)]
pub struct PoolRowView<'a> {
    pub mentor_id: &'a str,
    pub remaining_capacity: i64,
    pub initial_capacity: i64,
    pub allocations_new: u32,
    pub occupancy_ratio: String,
}

impl<'a> From<&'a Mentor> for PoolRowView<'a> {
    fn from(mentor: &'a Mentor) -> Self {
        Self {
            mentor_id: &mentor.id,
            remaining_capacity: mentor.remaining_capacity,
            initial_capacity: mentor.initial_capacity,
            allocations_new: mentor.allocations_new,
            occupancy_ratio: format!("{:.6}", mentor.occupancy_ratio()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogRowView<'a> {
    pub row_index: usize,
    pub student_id: &'a str,
    pub status: &'static str,
    pub mentor_id: Option<&'a str>,
    pub candidate_count: usize,
    pub stage_counts: String,
    pub failed_stage: Option<Stage>,
    pub capacity_before: Option<i64>,
    pub capacity_after: Option<i64>,
    pub selection_reason: Option<&'a str>,
    pub error_type: Option<&'static str>,
    pub detailed_reason: Option<&'a str>,
    pub suggested_actions: String,
}

impl<'a> From<&'a AllocationLogEntry> for LogRowView<'a> {
    fn from(entry: &'a AllocationLogEntry) -> Self {
        Self {
            row_index: entry.row_index,
            student_id: &entry.student_id,
            status: entry.status.label(),
            mentor_id: entry.mentor_id.as_deref(),
            candidate_count: entry.candidate_count,
            stage_counts: entry
                .stage_counts
                .iter()
                .map(|count| format!("{}={}", count.stage, count.survivors))
                .collect::<Vec<_>>()
                .join("|"),
            failed_stage: entry.failed_stage,
            capacity_before: entry.capacity_before,
            capacity_after: entry.capacity_after,
            selection_reason: entry.selection_reason.as_deref(),
            error_type: entry.error.map(|kind| kind.code()),
            detailed_reason: entry.detailed_reason.as_deref(),
            suggested_actions: entry.suggested_actions.join("; "),
        }
    }
}

pub fn write_allocations<W: Write>(writer: W, records: &[AllocationRecord]) -> Result<(), csv::Error> {
    write_rows(writer, records.iter())
}

pub fn write_pool<W: Write>(writer: W, pool: &[Mentor]) -> Result<(), csv::Error> {
    write_rows(writer, pool.iter().map(PoolRowView::from))
}

pub fn write_log<W: Write>(writer: W, logs: &[AllocationLogEntry]) -> Result<(), csv::Error> {
    write_rows(writer, logs.iter().map(LogRowView::from))
}

pub fn write_trace<W: Write>(writer: W, trace: &[TraceRecord]) -> Result<(), csv::Error> {
    write_rows(writer, trace.iter())
}

fn write_rows<W, I, T>(writer: W, rows: I) -> Result<(), csv::Error>
where
    W: Write,
    I: IntoIterator<Item = T>,
    T: Serialize,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}
