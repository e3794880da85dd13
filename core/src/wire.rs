//! # Bus Encodings
//!
//! Fixed-layout little-endian encodings for the snapshots published into
//! the memory matrix. Layouts are append-only: new fields go at the end
//! so stale readers keep decoding the prefix they know.

use talos_config::{SystemHealth, SystemStateVector};
use talos_execution::Task;
use talos_fault::{FaultKind, FaultReport};
use talos_sched::ScheduleDecision;

use talos_execution::TaskId;

/// Encoded size of a system-state snapshot.
pub const SYSTEM_STATE_LEN: usize = 21;

/// Encoded size of a schedule decision.
pub const DECISION_LEN: usize = 9;

/// Encoded size of a fault report.
pub const FAULT_REPORT_LEN: usize = 17;

/// Encoded size of one task summary.
pub const TASK_SUMMARY_LEN: usize = 14;

/// Encode a system-state snapshot.
pub fn encode_system_state(sys: &SystemStateVector) -> [u8; SYSTEM_STATE_LEN] {
    let mut buf = [0u8; SYSTEM_STATE_LEN];
    buf[0..4].copy_from_slice(&sys.cpu_load.to_le_bytes());
    buf[4..8].copy_from_slice(&sys.memory_usage.to_le_bytes());
    buf[8..12].copy_from_slice(&sys.temperature.to_le_bytes());
    buf[12..16].copy_from_slice(&sys.power_draw.to_le_bytes());
    buf[16..20].copy_from_slice(&sys.active_tasks.to_le_bytes());
    buf[20] = sys.health.as_feature() as u8;
    buf
}

/// Decode a system-state snapshot.
pub fn decode_system_state(buf: &[u8; SYSTEM_STATE_LEN]) -> SystemStateVector {
    let f32_at = |i: usize| f32::from_le_bytes(buf[i..i + 4].try_into().unwrap());
    SystemStateVector {
        cpu_load: f32_at(0),
        memory_usage: f32_at(4),
        temperature: f32_at(8),
        power_draw: f32_at(12),
        active_tasks: u32::from_le_bytes(buf[16..20].try_into().unwrap()),
        health: match buf[20] {
            1 => SystemHealth::Recovery,
            2 => SystemHealth::Degraded,
            _ => SystemHealth::Normal,
        },
    }
}

/// Encode a schedule decision.
pub fn encode_decision(decision: &ScheduleDecision) -> [u8; DECISION_LEN] {
    let mut buf = [0u8; DECISION_LEN];
    buf[0..4].copy_from_slice(&decision.task.as_u32().to_le_bytes());
    buf[4] = decision.core;
    buf[5..9].copy_from_slice(&decision.slice_ms.to_le_bytes());
    buf
}

/// Decode a schedule decision.
pub fn decode_decision(buf: &[u8; DECISION_LEN]) -> ScheduleDecision {
    ScheduleDecision {
        task: TaskId::from_raw(u32::from_le_bytes(buf[0..4].try_into().unwrap())),
        core: buf[4],
        slice_ms: u32::from_le_bytes(buf[5..9].try_into().unwrap()),
    }
}

/// Encode a fault report.
pub fn encode_fault_report(report: &FaultReport) -> [u8; FAULT_REPORT_LEN] {
    let mut buf = [0u8; FAULT_REPORT_LEN];
    buf[0] = report.kind.as_raw();
    buf[1..5].copy_from_slice(&report.task.as_u32().to_le_bytes());
    buf[5..9].copy_from_slice(&report.address.to_le_bytes());
    buf[9..17].copy_from_slice(&report.at_ms.to_le_bytes());
    buf
}

/// Decode a fault report; `None` for the zeroed no-fault pattern.
pub fn decode_fault_report(buf: &[u8; FAULT_REPORT_LEN]) -> Option<FaultReport> {
    let kind = FaultKind::from_raw(buf[0])?;
    Some(FaultReport {
        kind,
        task: TaskId::from_raw(u32::from_le_bytes(buf[1..5].try_into().unwrap())),
        address: u32::from_le_bytes(buf[5..9].try_into().unwrap()),
        at_ms: u64::from_le_bytes(buf[9..17].try_into().unwrap()),
    })
}

/// Encode the descriptor table as a sequence of task summaries.
pub fn encode_task_summaries(tasks: &[Task]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(tasks.len() * TASK_SUMMARY_LEN);
    for task in tasks {
        buf.extend_from_slice(&task.id.as_u32().to_le_bytes());
        buf.extend_from_slice(&task.period_ms.to_le_bytes());
        buf.extend_from_slice(&task.deadline_ms.to_le_bytes());
        buf.push(task.criticality.as_feature() as u8);
        buf.push(u8::from(task.active));
    }
    buf
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use talos_config::MAX_TASKS;
    use talos_memory::Region;

    #[test]
    fn system_state_roundtrip() {
        let sys = SystemStateVector {
            cpu_load: 0.75,
            memory_usage: 0.5,
            temperature: 61.5,
            power_draw: 3.25,
            active_tasks: 4,
            health: SystemHealth::Degraded,
        };
        let decoded = decode_system_state(&encode_system_state(&sys));
        assert_eq!(decoded, sys);
    }

    #[test]
    fn decision_roundtrip() {
        let decision = ScheduleDecision {
            task: TaskId::from_raw(7),
            core: 2,
            slice_ms: 50,
        };
        assert_eq!(decode_decision(&encode_decision(&decision)), decision);
    }

    #[test]
    fn fault_report_roundtrip() {
        let report = FaultReport {
            kind: FaultKind::Memory,
            task: TaskId::from_raw(2),
            address: 0x2000,
            at_ms: 12345,
        };
        assert_eq!(decode_fault_report(&encode_fault_report(&report)), Some(report));
    }

    #[test]
    fn zeroed_fault_buffer_decodes_as_no_fault() {
        assert_eq!(decode_fault_report(&[0u8; FAULT_REPORT_LEN]), None);
    }

    #[test]
    fn full_task_table_fits_its_region() {
        assert!(MAX_TASKS * TASK_SUMMARY_LEN <= Region::TaskDescriptors.capacity());
    }

    #[test]
    fn encodings_fit_their_regions() {
        assert!(SYSTEM_STATE_LEN <= Region::SystemState.capacity());
        assert!(DECISION_LEN <= Region::SchedulerDecisions.capacity());
        assert!(FAULT_REPORT_LEN <= Region::FaultReports.capacity());
    }
}
