//! Undo/redo behaviour: stack discipline, locality, and the interplay
//! between restores and concurrent remote edits.

use rewind_core::{Op, OpId, Replica};

fn deliver<V: Clone>(to: &mut Replica<V>, ops: &[Op<V>]) {
    to.apply(ops.iter().cloned().map(Some)).expect("apply");
}

#[test]
fn linear_undo_undo_redo() {
    let mut a = Replica::new("a");
    a.set(1);
    let s2 = a.set(2);
    a.set(3);
    assert_eq!(a.undo_stack().len(), 3);

    a.undo().expect("undo newest");
    assert_eq!(a.get(), [2]);
    a.undo().expect("undo again");
    assert_eq!(a.get(), [1]);

    a.redo().expect("redo");
    assert_eq!(a.get(), [2]);

    // The redo put the second write back on the undo stack.
    let top = a.undo_stack().last().expect("top of undo stack");
    assert_eq!(top.id, s2.id);
    assert_eq!(a.redo_stack().len(), 1);
}

#[test]
fn undo_then_remote_write_then_redo() {
    let mut a = Replica::new("a");
    let mut b = Replica::new("b");

    let black = a.set("black");
    let red = a.set("red");
    deliver(&mut b, &[black, red]);
    let green = b.set("green");
    deliver(&mut a, &[green]);
    assert_eq!(a.get(), ["green"]);

    // a reverts its own "red"; that also rolls back past b's later edit.
    let undo = a.undo().expect("undo");
    deliver(&mut b, &[undo]);
    assert_eq!(a.get(), ["black"]);
    assert_eq!(b.get(), ["black"]);

    // Redo reverts the undo, bringing back the state the undo removed.
    let redo = a.redo().expect("redo");
    deliver(&mut b, &[redo]);
    assert_eq!(a.get(), ["green"]);
    assert_eq!(b.get(), ["green"]);
}

#[test]
fn concurrent_undos_merge_into_a_combined_view() {
    let mut a = Replica::new("a");
    let mut b = Replica::new("b");

    // a writes 2 then 3; b writes 4 without having seen either.
    let a1 = a.set(2);
    let a2 = a.set(3);
    let b1 = b.set(4);
    deliver(&mut a, &[b1.clone()]);
    deliver(&mut b, &[a1, a2]);

    // b merges the branches with a final write.
    let b2 = b.set(5);
    deliver(&mut a, &[b2]);
    assert_eq!(a.get(), [5]);
    assert_eq!(b.get(), [5]);

    // Both undo concurrently, with no sync in between.
    let a_undo = a.undo().expect("a undo");
    let b_undo = b.undo().expect("b undo");
    assert_eq!(a.get(), [2]);
    assert_eq!(b.get(), [3, 4]);

    deliver(&mut a, &[b_undo]);
    deliver(&mut b, &[a_undo]);
    assert_eq!(a.get(), [3, 4, 2]);
    assert_eq!(b.get(), [3, 4, 2]);
}

#[test]
fn undo_skips_foreign_writes_between_own_writes() {
    let mut a = Replica::new("a");
    let mut b = Replica::new("b");

    let a1 = a.set(1);
    deliver(&mut b, &[a1]);
    let b1 = b.set(2);
    deliver(&mut a, &[b1]);
    a.set(3);

    // The foreign write never entered a's undo stack.
    assert_eq!(a.undo_stack().len(), 2);

    a.undo().expect("undo own newest");
    assert_eq!(a.get(), [2]);

    // The next undo anchors a's *first* write; reverting to the state before
    // it leaves nothing visible.
    a.undo().expect("undo own first");
    assert!(a.get().is_empty());
    assert!(a.undo().is_none());
}

#[test]
fn redo_is_undone_by_the_following_undo() {
    let mut a = Replica::new("a");
    a.set(1);
    a.set(2);

    a.undo().expect("undo");
    assert_eq!(a.get(), [1]);
    a.redo().expect("redo");
    assert_eq!(a.get(), [2]);

    // The redo stacked the restored write, so undo reverts it again.
    a.undo().expect("undo the redone write");
    assert_eq!(a.get(), [1]);
}

#[test]
fn redo_stack_entries_resolve_to_writes_in_two_hops() {
    let mut a = Replica::new("a");
    a.set(1);
    a.set(2);
    a.undo().expect("undo");
    a.redo().expect("redo");

    // Stack discipline keeps every undo-stack entry a terminal write, which
    // is what bounds the redo resolution chain.
    for op in a.undo_stack() {
        assert!(op.is_set());
    }
    for op in a.redo_stack() {
        assert!(op.is_restore());
    }
}

#[test]
fn interleaved_undo_redo_rounds_deepen_resolution() {
    let mut a = Replica::new("a");
    a.set(1);
    a.set(2);

    let mut last_depth = 0;
    for _ in 0..5 {
        a.undo().expect("undo");
        a.redo().expect("redo");
        assert_eq!(a.get(), [2]);

        let (_, meta) = &a.terminal_heads()[0];
        assert!(meta.depth > last_depth, "depth must keep growing");
        last_depth = meta.depth;
    }
}

#[test]
fn traces_run_from_current_heads_to_their_terminals() {
    let mut a = Replica::new("a");
    let mut b = Replica::new("b");
    let a1 = a.set(1);
    let a2 = a.set(2);
    deliver(&mut b, &[a1, a2]);
    let b1 = b.set(3);
    deliver(&mut a, &[b1]);
    a.undo().expect("undo");

    for (terminal, meta) in a.terminal_heads() {
        let first = meta.trace.first().expect("non-empty trace");
        let last = meta.trace.last().expect("non-empty trace");
        assert!(a.heads().contains(first));
        assert_eq!(last, &terminal.id);
    }
}

#[test]
fn undo_and_redo_round_trip_through_serialisation() {
    let mut a = Replica::new("a");
    a.set(7);
    let undo = a.undo().expect("undo");
    let redo = a.redo().expect("redo");

    for op in [undo, redo] {
        let json = serde_json::to_string(&op).expect("serialise");
        let back: Op<i64> = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back, op);
    }
}

#[test]
fn cached_and_plain_replicas_agree_on_a_full_scenario() {
    fn run(mut a: Replica<i64>, mut b: Replica<i64>) -> (Vec<i64>, Vec<(OpId, usize)>) {
        let a1 = a.set(1);
        deliver(&mut b, &[a1]);
        let b1 = b.set(3);
        let b2 = b.set(4);
        let a_undo = a.undo().expect("undo");
        let a_redo = a.redo().expect("redo");
        deliver(&mut a, &[b1, b2]);
        deliver(&mut b, &[a_undo, a_redo]);
        for _ in 0..3 {
            let u = a.undo().expect("undo");
            deliver(&mut b, &[u]);
            let r = a.redo().expect("redo");
            deliver(&mut b, &[r]);
        }
        let summary = a
            .terminal_heads()
            .iter()
            .map(|(op, meta)| (op.id.clone(), meta.depth))
            .collect();
        assert_eq!(a.get(), b.get());
        (a.get().to_vec(), summary)
    }

    let plain = run(Replica::new("a"), Replica::new("b"));
    let cached = run(Replica::with_cache("a"), Replica::with_cache("b"));
    assert_eq!(plain, cached);
}
