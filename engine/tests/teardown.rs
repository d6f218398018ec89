//! Dropping a tree releases exactly the memory it owns.
//!
//! Runs without the libtest harness so no other thread allocates while the
//! counting allocator is being read.

use arbor_engine::test_tree::{build_test_tree_categorical, grow_random_tree, test_dataset};
use arbor_engine::DecisionTree;
use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicIsize, Ordering};

struct CountingAlloc;

static LIVE_BYTES: AtomicIsize = AtomicIsize::new(0);

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc(layout);
        if !ptr.is_null() {
            LIVE_BYTES.fetch_add(layout.size() as isize, Ordering::SeqCst);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        LIVE_BYTES.fetch_sub(layout.size() as isize, Ordering::SeqCst);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = System.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            LIVE_BYTES.fetch_add(new_size as isize - layout.size() as isize, Ordering::SeqCst);
        }
        new_ptr
    }
}

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

fn live() -> isize {
    LIVE_BYTES.load(Ordering::SeqCst)
}

fn scores(tree: &DecisionTree) -> Vec<f64> {
    let data = test_dataset();
    (0..data.num_rows()).map(|row| tree.predict(&data, row, 1.0)).collect()
}

fn dropping_a_tree_frees_all_of_its_nodes() {
    let baseline = live();
    let tree = grow_random_tree(17, 200);
    let held = live() - baseline;
    assert!(held > 0);

    drop(tree);
    assert_eq!(live(), baseline, "tree left memory behind after drop");
}

fn dropping_one_tree_leaves_its_sibling_intact() {
    let sibling = build_test_tree_categorical();
    let expected = scores(&sibling);
    let sibling_len = sibling.len();

    let baseline = live();
    let mut ensemble = vec![grow_random_tree(3, 50), grow_random_tree(4, 80)];
    let after_build = live();
    assert!(after_build > baseline);

    let removed = ensemble.remove(1);
    let removed_bytes = {
        let before_drop = live();
        drop(removed);
        before_drop - live()
    };
    assert!(removed_bytes > 0);

    drop(ensemble);
    assert_eq!(live(), baseline, "ensemble left memory behind after drop");

    assert_eq!(sibling.len(), sibling_len);
    assert_eq!(scores(&sibling), expected);
}

fn main() {
    // first use registers tracing callsites; keep that out of the measurements
    drop(grow_random_tree(1, 5));

    dropping_a_tree_frees_all_of_its_nodes();
    dropping_one_tree_leaves_its_sibling_intact();
    println!("teardown: ok");
}
