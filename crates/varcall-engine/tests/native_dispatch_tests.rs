//! End-to-end tests through the real trampolines

#![cfg(all(unix, any(target_arch = "x86_64", target_arch = "aarch64")))]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use varcall_engine::{
    clear_last_failure, invoke, take_last_failure, Bridge, DispatchError, Library, NativeMethod,
    PassThroughGenerator,
};
use varcall_sdk::{
    CallSignature, EntryPoint, GenerationError, GenerationRequest, GenerationResult,
    HiddenArgument, HiddenWord, TargetKind, TransitionBlock, ValueType,
};

// ============================================================================
// Native targets
// ============================================================================

extern "C" fn weighted_sum(a: u64, b: u64, c: u64) -> u64 {
    a * 100 + b * 10 + c
}

extern "C" fn weighted_sum_alt(a: u64, b: u64, c: u64) -> u64 {
    c + b * 10 + a * 100
}

extern "C" fn scaled_product(a: u64, x: f64, y: f64) -> f64 {
    a as f64 + x * y
}

fn entry_of(address: usize) -> EntryPoint {
    EntryPoint::new(address).unwrap()
}

fn sum_entry() -> EntryPoint {
    entry_of(weighted_sum as usize)
}

// Register probes: return the hidden-argument or call-site register.

#[cfg(target_arch = "x86_64")]
#[unsafe(naked)]
unsafe extern "C" fn probe_hidden_register() {
    std::arch::naked_asm!("mov rax, r10", "ret");
}

#[cfg(target_arch = "x86_64")]
#[unsafe(naked)]
unsafe extern "C" fn probe_call_site_register() {
    std::arch::naked_asm!("mov rax, r11", "ret");
}

#[cfg(target_arch = "aarch64")]
#[unsafe(naked)]
unsafe extern "C" fn probe_hidden_register() {
    std::arch::naked_asm!("mov x0, x12", "ret");
}

#[cfg(target_arch = "aarch64")]
#[unsafe(naked)]
unsafe extern "C" fn probe_call_site_register() {
    std::arch::naked_asm!("mov x0, x15", "ret");
}

fn counting_bridge(entry: EntryPoint) -> (Bridge, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let bridge = Bridge::new(move |_: &GenerationRequest<'_>| -> GenerationResult<EntryPoint> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(entry)
    });
    (bridge, calls)
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_vararg_first_call_generates_then_caches() {
    let (bridge, calls) = counting_bridge(sum_entry());
    let site = bridge.vararg_site(CallSignature::variadic(
        1,
        vec![ValueType::U64, ValueType::U64, ValueType::U64],
        ValueType::U64,
    ));
    let method = Box::new(NativeMethod::new("weighted_sum", sum_entry()));

    let first = unsafe { invoke::call_u64(&site, method.hidden_word(), [1, 2, 3]) };
    assert_eq!(first, 123);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(site.try_get_cached_stub(), Some(sum_entry()));

    let second = unsafe { invoke::call_u64(&site, method.hidden_word(), [4, 5, 6]) };
    assert_eq!(second, 456);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let stats = bridge.stats();
    assert_eq!(stats.slow_path_entries, 1);
    assert_eq!(stats.stub_stores, 1);
}

#[test]
fn test_calli_native_target_is_tagged_and_decoded() {
    let seen = Arc::new(Mutex::new(None));
    let log = seen.clone();
    let bridge = Bridge::new(move |request: &GenerationRequest<'_>| -> GenerationResult<EntryPoint> {
        *log.lock() = Some(request.target);
        Ok(entry_of(request.target.address()))
    });
    let site = bridge.calli_site(CallSignature::c(
        vec![ValueType::U64, ValueType::U64, ValueType::U64],
        ValueType::U64,
    ));

    let p2 = weighted_sum as usize;
    let word = HiddenArgument::native(p2).unwrap().encode().unwrap();
    assert_eq!(word.raw(), (p2 << 1) | 1);

    let result = unsafe { invoke::call_u64(&site, word, [7, 8, 9]) };
    assert_eq!(result, 789);

    let target = seen.lock().unwrap();
    assert_eq!(target, HiddenArgument::NativeTarget(p2));
    assert_eq!(target.kind(), TargetKind::Native);
}

#[test]
fn test_generation_failure_reaches_caller_uncached() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let bridge = Bridge::new(move |_: &GenerationRequest<'_>| -> GenerationResult<EntryPoint> {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(GenerationError::OutOfMemory("stub heap exhausted".into()))
        } else {
            Ok(sum_entry())
        }
    });
    let site = bridge.calli_site(CallSignature::c(vec![ValueType::U64], ValueType::U64));
    let word = HiddenArgument::native(weighted_sum as usize).unwrap().encode().unwrap();

    clear_last_failure();
    let result = unsafe { invoke::call_u64(&site, word, [1, 1, 1]) };
    assert_eq!(result, 0);
    assert_eq!(
        take_last_failure(),
        Some(DispatchError::Generation(GenerationError::OutOfMemory(
            "stub heap exhausted".into()
        )))
    );
    assert!(!site.is_resolved());

    // The next call generates again and succeeds
    let result = unsafe { invoke::call_u64(&site, word, [1, 1, 1]) };
    assert_eq!(result, 111);
    assert!(take_last_failure().is_none());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(bridge.stats().generation_failures, 1);
}

#[test]
fn test_failed_float_call_returns_zero() {
    let bridge = Bridge::new(|_: &GenerationRequest<'_>| -> GenerationResult<EntryPoint> {
        Err(GenerationError::UnsupportedSignature("no float marshaling".into()))
    });
    let site = bridge.calli_site(CallSignature::c(
        vec![ValueType::U64, ValueType::F64, ValueType::F64],
        ValueType::F64,
    ));
    let word = HiddenArgument::native(scaled_product as usize).unwrap().encode().unwrap();

    clear_last_failure();
    let result = unsafe { invoke::call_f64(&site, word, 1, [2.0, 3.0]) };
    assert_eq!(result, 0.0);
    assert!(matches!(
        take_last_failure(),
        Some(DispatchError::Generation(GenerationError::UnsupportedSignature(_)))
    ));
}

// ============================================================================
// Register preservation
// ============================================================================

#[test]
fn test_hidden_register_survives_slow_path() {
    let probe = EntryPoint::of(probe_hidden_register);
    let (bridge, _) = counting_bridge(probe);
    let site = bridge.calli_site(CallSignature::c(vec![], ValueType::Pointer));
    let word = HiddenWord::from_raw((0x7654_3210 << 1) | 1);

    // First call goes through the slow path, second through the fast path
    let slow = unsafe { invoke::call_u64(&site, word, [0, 0, 0]) };
    let fast = unsafe { invoke::call_u64(&site, word, [0, 0, 0]) };
    assert_eq!(slow as usize, word.raw());
    assert_eq!(fast as usize, word.raw());
}

#[test]
fn test_call_site_register_survives_slow_path() {
    let probe = EntryPoint::of(probe_call_site_register);
    let (bridge, _) = counting_bridge(probe);
    let site = bridge.vararg_site(CallSignature::variadic(0, vec![], ValueType::Pointer));
    let method = Box::new(NativeMethod::new("probe", probe));

    let slow = unsafe { invoke::call_u64(&site, method.hidden_word(), [0, 0, 0]) };
    let fast = unsafe { invoke::call_u64(&site, method.hidden_word(), [0, 0, 0]) };
    assert_eq!(slow as usize, site.address());
    assert_eq!(fast as usize, site.address());
}

#[test]
fn test_fast_path_matches_direct_call() {
    let probe = EntryPoint::of(probe_hidden_register);
    let (bridge, _) = counting_bridge(probe);
    let site = bridge.calli_site(CallSignature::c(vec![], ValueType::Pointer));
    let word = HiddenWord::from_raw(0x5000);

    unsafe { invoke::call_u64(&site, word, [0, 0, 0]) };
    let stub = site.try_get_cached_stub().unwrap();

    let direct = unsafe { invoke::call_entry_u64(stub, site.address(), word, [0, 0, 0]) };
    let through = unsafe { invoke::call_u64(&site, word, [0, 0, 0]) };
    assert_eq!(direct, through);

    let direct = unsafe { invoke::call_entry_u64(sum_entry(), 0, word, [3, 4, 5]) };
    assert_eq!(direct, 345);
}

#[test]
fn test_float_arguments_survive_slow_path() {
    let (bridge, calls) = counting_bridge(entry_of(scaled_product as usize));
    let site = bridge.calli_site(CallSignature::c(
        vec![ValueType::U64, ValueType::F64, ValueType::F64],
        ValueType::F64,
    ));
    let word = HiddenArgument::native(scaled_product as usize).unwrap().encode().unwrap();

    let slow = unsafe { invoke::call_f64(&site, word, 2, [1.5, 4.0]) };
    assert_eq!(slow, 8.0);
    let fast = unsafe { invoke::call_f64(&site, word, 10, [0.25, 2.0]) };
    assert_eq!(fast, 10.5);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_vararg_float_arguments_survive_slow_path() {
    if !varcall_sdk::VARIADIC_FLOATS_IN_REGISTERS {
        return;
    }
    let (bridge, _) = counting_bridge(entry_of(scaled_product as usize));
    let site = bridge.vararg_site(CallSignature::variadic(
        1,
        vec![ValueType::U64, ValueType::F64, ValueType::F64],
        ValueType::F64,
    ));
    let method = Box::new(NativeMethod::new("scaled_product", entry_of(scaled_product as usize)));

    let result = unsafe { invoke::call_f64(&site, method.hidden_word(), 1, [3.0, 3.0]) };
    assert_eq!(result, 10.0);
}

#[test]
fn test_transition_block_captures_registers() {
    let captured: Arc<Mutex<Option<TransitionBlock>>> = Arc::new(Mutex::new(None));
    let log = captured.clone();
    let bridge = Bridge::new(move |request: &GenerationRequest<'_>| -> GenerationResult<EntryPoint> {
        *log.lock() = Some(*request.transition_block);
        Ok(entry_of(scaled_product as usize))
    });
    let site = bridge.calli_site(CallSignature::c(
        vec![ValueType::U64, ValueType::F64, ValueType::F64],
        ValueType::F64,
    ));
    let word = HiddenArgument::native(scaled_product as usize).unwrap().encode().unwrap();

    let result = unsafe { invoke::call_f64(&site, word, 6, [0.5, -2.0]) };
    assert_eq!(result, 5.0);

    let block = captured.lock().unwrap();
    assert_eq!(block.argument_register(0), 6);
    assert_eq!(block.hidden_word(), word);
    assert_eq!(block.call_site, site.address());
    assert_ne!(block.stack_arguments, 0);
    let floats = block.float_registers().expect("calli sites save float registers");
    assert_eq!(floats.f64_at(0), 0.5);
    assert_eq!(floats.f64_at(1), -2.0);
}

// ============================================================================
// Distinct sites
// ============================================================================

#[test]
fn test_sites_cache_independently() {
    let bridge = Bridge::new(|request: &GenerationRequest<'_>| -> GenerationResult<EntryPoint> {
        if request.site.signature.ret() == ValueType::F64 {
            Ok(entry_of(scaled_product as usize))
        } else {
            Ok(entry_of(weighted_sum_alt as usize))
        }
    });
    let ints = bridge.calli_site(CallSignature::c(
        vec![ValueType::U64, ValueType::U64, ValueType::U64],
        ValueType::U64,
    ));
    let floats = bridge.calli_site(CallSignature::c(
        vec![ValueType::U64, ValueType::F64, ValueType::F64],
        ValueType::F64,
    ));
    let word = HiddenWord::from_raw(0x1000);

    assert_eq!(unsafe { invoke::call_u64(&ints, word, [1, 0, 1]) }, 101);
    assert_eq!(unsafe { invoke::call_f64(&floats, word, 1, [2.0, 2.0]) }, 5.0);
    assert_ne!(ints.try_get_cached_stub(), floats.try_get_cached_stub());
}

// ============================================================================
// Pass-through stubs
// ============================================================================

#[test]
fn test_pass_through_to_libc() {
    let process = Library::this_process().unwrap();
    let labs = Box::new(NativeMethod::bind(process, "labs").unwrap());
    let bridge = Bridge::new(PassThroughGenerator::new());

    let vararg = bridge.vararg_site(CallSignature::variadic(1, vec![ValueType::I64], ValueType::I64));
    let result = unsafe { invoke::call_u64(&vararg, labs.hidden_word(), [(-42i64) as u64, 0, 0]) };
    assert_eq!(result as i64, 42);

    let calli = bridge.calli_site(CallSignature::c(vec![ValueType::I64], ValueType::I64));
    let word = HiddenArgument::native(labs.entry().addr()).unwrap().encode().unwrap();
    let result = unsafe { invoke::call_u64(&calli, word, [(-9i64) as u64, 0, 0]) };
    assert_eq!(result as i64, 9);

    // Fast path, through the already cached forwarder
    let result = unsafe { invoke::call_u64(&calli, word, [(-1i64) as u64, 0, 0]) };
    assert_eq!(result as i64, 1);
}

#[test]
fn test_pass_through_method_and_native_share_stub() {
    let bridge = Bridge::new(PassThroughGenerator::new());
    let site = bridge.calli_site(CallSignature::c(
        vec![ValueType::U64, ValueType::U64, ValueType::U64],
        ValueType::U64,
    ));
    let method = Box::new(NativeMethod::new("weighted_sum", sum_entry()));
    let native = HiddenArgument::native(weighted_sum_alt as usize).unwrap().encode().unwrap();

    assert_eq!(unsafe { invoke::call_u64(&site, method.hidden_word(), [1, 2, 3]) }, 123);
    assert_eq!(unsafe { invoke::call_u64(&site, native, [3, 2, 1]) }, 321);
    assert_eq!(bridge.stats().generations, 1);
}

#[test]
fn test_pass_through_rejects_aggregates() {
    let bridge = Bridge::new(PassThroughGenerator::new());
    let site = bridge.calli_site(CallSignature::c(
        vec![ValueType::Struct { size: 32, align: 8 }],
        ValueType::Void,
    ));
    let word = HiddenArgument::native(weighted_sum as usize).unwrap().encode().unwrap();

    clear_last_failure();
    unsafe { invoke::call_u64(&site, word, [0, 0, 0]) };
    assert!(matches!(
        take_last_failure(),
        Some(DispatchError::Generation(GenerationError::UnsupportedSignature(_)))
    ));
    assert!(!site.is_resolved());
}
