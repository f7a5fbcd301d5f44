use std::sync::Mutex;
use std::time::{Duration, Instant};

#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTiming {
    pub phase: String,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub phases: Vec<PhaseTiming>,
    pub total: Duration,
    pub peak_memory_mb: Option<u64>,
}

struct MonitorState {
    phase_started: Instant,
    phases: Vec<PhaseTiming>,
    peak_memory_mb: u64,
    #[cfg(feature = "cli")]
    system: System,
}

/// Records how long each ETL phase takes and, with the `cli` feature,
/// the peak resident memory of the process.
pub struct RunMonitor {
    enabled: bool,
    started: Instant,
    state: Mutex<MonitorState>,
    #[cfg(feature = "cli")]
    pid: Option<Pid>,
}

impl RunMonitor {
    pub fn new(enabled: bool) -> Self {
        let now = Instant::now();
        Self {
            enabled,
            started: now,
            state: Mutex::new(MonitorState {
                phase_started: now,
                phases: Vec::new(),
                peak_memory_mb: 0,
                #[cfg(feature = "cli")]
                system: System::new(),
            }),
            #[cfg(feature = "cli")]
            pid: sysinfo::get_current_pid().ok(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 開始計時下一個階段
    pub fn start_phase(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.phase_started = Instant::now();
        }
    }

    pub fn finish_phase(&self, phase: &str) {
        if !self.enabled {
            return;
        }
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let elapsed = state.phase_started.elapsed();
        let memory_mb = self.sample_memory_mb(&mut state);
        if let Some(mb) = memory_mb {
            state.peak_memory_mb = state.peak_memory_mb.max(mb);
        }
        state.phases.push(PhaseTiming {
            phase: phase.to_string(),
            elapsed,
        });

        match memory_mb {
            Some(mb) => tracing::info!("📊 {} took {:?} (memory {}MB)", phase, elapsed, mb),
            None => tracing::info!("📊 {} took {:?}", phase, elapsed),
        }
    }

    #[cfg(feature = "cli")]
    fn sample_memory_mb(&self, state: &mut MonitorState) -> Option<u64> {
        let pid = self.pid?;
        state.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        state
            .system
            .process(pid)
            .map(|process| process.memory() / 1024 / 1024)
    }

    #[cfg(not(feature = "cli"))]
    fn sample_memory_mb(&self, _state: &mut MonitorState) -> Option<u64> {
        None
    }

    pub fn summary(&self) -> Option<RunSummary> {
        if !self.enabled {
            return None;
        }
        let state = self.state.lock().ok()?;
        Some(RunSummary {
            phases: state.phases.clone(),
            total: self.started.elapsed(),
            peak_memory_mb: (state.peak_memory_mb > 0).then_some(state.peak_memory_mb),
        })
    }

    pub fn log_final_stats(&self) {
        if let Some(summary) = self.summary() {
            tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Peak Memory: {}",
                summary.total,
                summary
                    .peak_memory_mb
                    .map(|mb| format!("{}MB", mb))
                    .unwrap_or_else(|| "n/a".to_string())
            );
        }
    }
}

impl Default for RunMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
