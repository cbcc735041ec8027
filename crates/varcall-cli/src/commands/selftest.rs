//! `varcall selftest`: dispatch libc `labs` through both trampolines.
//!
//! Every thread waits on a barrier and then issues its first call at the same
//! time, so the sites are resolved under contention. The vararg site receives
//! the bound method descriptor, the calli site a tagged native pointer.

use std::path::PathBuf;
use std::sync::Barrier;

use anyhow::{anyhow, bail, Context};
use serde::Serialize;
use tracing::info;
use varcall_engine::{
    arch, invoke, take_last_failure, Bridge, DispatchConfig, Library, NativeMethod,
    PassThroughGenerator, StatsSnapshot,
};
use varcall_sdk::{CallSignature, HiddenArgument, HiddenWord, ValueType};

use crate::output::StyledOutput;

#[derive(Debug, Default, Serialize)]
pub struct ThreadOutcome {
    pub calls: usize,
    pub mismatches: usize,
    pub failures: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SelftestReport {
    pub threads: usize,
    pub calls: usize,
    pub mismatches: usize,
    pub failures: Vec<String>,
    pub vararg_stub: Option<usize>,
    pub calli_stub: Option<usize>,
    pub stats: StatsSnapshot,
}

impl SelftestReport {
    /// Named checks and whether each held.
    pub fn checks(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("every call returned labs(x)", self.mismatches == 0),
            ("no dispatch failures", self.failures.is_empty()),
            ("vararg site resolved", self.vararg_stub.is_some()),
            ("calli site resolved", self.calli_stub.is_some()),
            (
                "both sites share the pass-through stub",
                self.vararg_stub.is_some() && self.vararg_stub == self.calli_stub,
            ),
            (
                "no generator failures recorded",
                self.stats.generation_failures == 0,
            ),
        ]
    }

    pub fn passed(&self) -> bool {
        self.checks().iter().all(|(_, ok)| *ok)
    }
}

fn argument(thread: usize, iteration: usize) -> i64 {
    -((thread * 1_000_000 + iteration + 1) as i64)
}

fn run_thread(
    barrier: &Barrier,
    thread: usize,
    iterations: usize,
    calls: &[(&varcall_engine::CallSiteDescriptor, HiddenWord)],
) -> ThreadOutcome {
    let mut outcome = ThreadOutcome::default();
    barrier.wait();
    for iteration in 0..iterations {
        let value = argument(thread, iteration);
        for (site, hidden) in calls {
            // SAFETY: both sites resolve to the pass-through stub, which
            // jumps to `labs(long)`; `hidden` names the bound descriptor or
            // its tagged entry point.
            let result = unsafe { invoke::call_u64(site, *hidden, [value as u64, 0, 0]) } as i64;
            outcome.calls += 1;
            if let Some(error) = take_last_failure() {
                outcome.failures.push(format!("{} site: {}", site.kind(), error));
            } else if result != value.abs() {
                outcome.mismatches += 1;
            }
        }
    }
    outcome
}

/// Run the self-test and collect the results.
pub fn run(
    threads: usize,
    iterations: usize,
    config: DispatchConfig,
) -> anyhow::Result<SelftestReport> {
    if !arch::SUPPORTED {
        bail!(
            "native call dispatch is not implemented for {}",
            std::env::consts::ARCH
        );
    }
    if threads == 0 {
        bail!("--threads must be at least 1");
    }

    let process = Library::this_process()?;
    // Boxed so the descriptor address passed as the hidden word stays put.
    let labs = Box::new(NativeMethod::bind(process, "labs")?);
    let native_word = HiddenArgument::native(labs.entry().addr())?.encode()?;

    let bridge = Bridge::with_config(PassThroughGenerator::new(), config);
    let vararg = bridge.vararg_site(CallSignature::variadic(
        1,
        vec![ValueType::I64],
        ValueType::I64,
    ));
    let calli = bridge.calli_site(CallSignature::c(vec![ValueType::I64], ValueType::I64));
    info!(threads, iterations, "starting self-test");

    let calls = [(&*vararg, labs.hidden_word()), (&*calli, native_word)];
    let barrier = Barrier::new(threads);
    let outcomes = crossbeam::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|thread| {
                let barrier = &barrier;
                let calls = &calls;
                scope.spawn(move |_| run_thread(barrier, thread, iterations, calls))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join())
            .collect::<Result<Vec<_>, _>>()
    })
    .map_err(|_| anyhow!("self-test thread panicked"))?
    .map_err(|_| anyhow!("self-test thread panicked"))?;

    let mut report = SelftestReport {
        threads,
        calls: 0,
        mismatches: 0,
        failures: Vec::new(),
        vararg_stub: vararg.try_get_cached_stub().map(|entry| entry.addr()),
        calli_stub: calli.try_get_cached_stub().map(|entry| entry.addr()),
        stats: bridge.stats(),
    };
    for outcome in outcomes {
        report.calls += outcome.calls;
        report.mismatches += outcome.mismatches;
        report.failures.extend(outcome.failures);
    }
    Ok(report)
}

pub fn execute(
    threads: usize,
    iterations: usize,
    config: Option<PathBuf>,
    out: &mut StyledOutput,
) -> anyhow::Result<()> {
    let config = match config {
        Some(path) => DispatchConfig::from_path(&path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => DispatchConfig::default(),
    };

    let report = run(threads, iterations, config)?;

    out.bold(&format!(
        "varcall selftest: {} threads, {} calls",
        report.threads, report.calls
    ));
    out.newline();
    for (name, ok) in report.checks() {
        out.check(ok, name);
    }
    for failure in report.failures.iter().take(5) {
        out.field("failure", failure);
    }
    out.newline();
    out.bold("Slow path");
    out.newline();
    out.line(&serde_json::to_string_pretty(&report.stats)?);
    out.flush();

    if !report.passed() {
        bail!("self-test failed");
    }
    Ok(())
}
