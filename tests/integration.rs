//! End-to-end scenarios exercised against a real `Heap`, each one backed by a fresh `mmap`'d
//! region so tests never interfere with each other's allocations.

use duoheap::Heap;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn scenario_small_allocation_updates_stats_and_lands_in_segregated_region() {
    init_logging();
    let mut heap = Heap::init().expect("heap init");

    let p = heap.malloc(30).expect("malloc(30)");
    assert_eq!(heap.stats().allocation_count, 1);
    assert_eq!(heap.stats().free_count, 0);

    unsafe { heap.free(Some(p)) };
    assert_eq!(heap.stats().allocation_count, 1);
    assert_eq!(heap.stats().free_count, 1);
}

#[test]
fn scenario_large_allocation_is_served_by_buddy_and_merges_back_on_free() {
    init_logging();
    let mut heap = Heap::init().expect("heap init");

    let mut report_before = Vec::new();
    heap.stats_print(&mut report_before).unwrap();

    let p = heap.malloc(5000).expect("malloc(5000)");
    unsafe { heap.free(Some(p)) };

    let mut report_after = Vec::new();
    heap.stats_print(&mut report_after).unwrap();

    // After the single 5000-byte block merges all the way back up, the buddy free-list
    // section of the report should read exactly as it did right after init.
    let buddy_section = |report: &[u8]| {
        let text = String::from_utf8_lossy(report);
        text.split("buddy free lists:").nth(1).unwrap().split("segregated free lists:").next().unwrap().to_string()
    };
    assert_eq!(buddy_section(&report_before), buddy_section(&report_after));
}

#[test]
fn scenario_freed_slot_is_reused_by_next_same_size_request() {
    init_logging();
    let mut heap = Heap::init().expect("heap init");

    let a = heap.malloc(50).expect("malloc a");
    let b = heap.malloc(50).expect("malloc b");
    let _c = heap.malloc(50).expect("malloc c");

    unsafe { heap.free(Some(b)) };
    let d = heap.malloc(50).expect("malloc d");

    assert_eq!(d, b, "d should reuse b's freed slot");
}

#[test]
fn scenario_realloc_grows_a_string_payload_byte_for_byte() {
    init_logging();
    let mut heap = Heap::init().expect("heap init");

    let p = heap.malloc(10).expect("malloc(10)");
    unsafe {
        p.as_ptr().copy_from(b"Short".as_ptr(), 5);
    }

    let p = unsafe { heap.realloc(Some(p), 20) }.expect("realloc to 20");
    unsafe {
        p.as_ptr().add(5).copy_from(b" and longer!".as_ptr(), 12);
    }

    let payload = unsafe { std::slice::from_raw_parts(p.as_ptr(), 17) };
    assert_eq!(payload, b"Short and longer!");

    unsafe { heap.free(Some(p)) };
}

#[test]
fn scenario_many_small_allocations_survive_eviction_of_even_slots_and_large_allocations() {
    init_logging();
    let mut heap = Heap::init().expect("heap init");

    let mut blocks: Vec<(usize, std::ptr::NonNull<u8>)> = Vec::new();
    for i in 0..5000 {
        if let Some(ptr) = heap.malloc(50) {
            unsafe { ptr.as_ptr().write(i as u8) };
            blocks.push((i, ptr));
        }
    }

    let (freed, survivors): (Vec<_>, Vec<_>) = blocks.into_iter().partition(|(i, _)| i % 2 == 0);
    for (_, ptr) in &freed {
        unsafe { heap.free(Some(*ptr)) };
    }

    let mut big = Vec::new();
    for _ in 0..3 {
        if let Some(ptr) = heap.malloc(10_240) {
            big.push(ptr);
        }
    }
    assert_eq!(big.len(), 3, "all three 10,240-byte blocks should come from the buddy region");

    for (i, ptr) in &survivors {
        let value = unsafe { ptr.as_ptr().read() };
        assert_eq!(value, *i as u8, "surviving small block must still hold its written byte");
    }

    for (_, ptr) in survivors {
        unsafe { heap.free(Some(ptr)) };
    }
    for ptr in big {
        unsafe { heap.free(Some(ptr)) };
    }
}

#[test]
fn scenario_free_then_free_null_changes_no_counters_and_does_not_crash() {
    init_logging();
    let mut heap = Heap::init().expect("heap init");

    let p = heap.malloc(1).expect("malloc(1)");
    unsafe { heap.free(Some(p)) };
    let free_count_after_first = heap.stats().free_count;

    unsafe { heap.free(None) };
    assert_eq!(heap.stats().free_count, free_count_after_first);
}

#[test]
fn invariant_total_bytes_is_conserved_across_allocate_free_cycles() {
    init_logging();
    let mut heap = Heap::init().expect("heap init");
    let total = heap.stats().total_bytes;

    let mut live = Vec::new();
    for _ in 0..100 {
        if let Some(ptr) = heap.malloc(64) {
            live.push(ptr);
        }
    }
    for ptr in live {
        unsafe { heap.free(Some(ptr)) };
    }

    assert_eq!(heap.stats().total_bytes, total, "total_bytes is fixed at init and never mutated");
    assert_eq!(heap.stats().allocation_count, heap.stats().free_count);
    assert_eq!(heap.stats().total_allocated + heap.stats().total_free, total);
    assert_eq!(heap.stats().total_allocated, 0);
}

#[test]
fn round_trip_free_of_malloc_changes_total_allocated_back_to_zero() {
    init_logging();
    let mut heap = Heap::init().expect("heap init");

    let p = heap.malloc(123).expect("malloc");
    assert!(heap.stats().total_allocated > 0);
    unsafe { heap.free(Some(p)) };
    assert_eq!(heap.stats().total_allocated, 0);
}
