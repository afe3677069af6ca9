//! Properties of the operation log under arbitrary edit sequences

use proptest::prelude::*;
use topo_editor::Snapshot;
use topo_test_utils::{add_element, remove_element, set_property, TestEditor, COMPUTE};

#[derive(Debug, Clone)]
enum Step {
    Add(u8),
    Remove(u8),
    SetCpus(u8, i64),
    Move(u8),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0..4u8).prop_map(Step::Add),
        (0..4u8).prop_map(Step::Remove),
        (0..4u8, -2..80i64).prop_map(|(e, v)| Step::SetCpus(e, v)),
        any::<u8>().prop_map(Step::Move),
    ]
}

/// Apply one step; returns the snapshot before and the result after
fn apply(t: &TestEditor, step: &Step) -> (Snapshot, Result<Snapshot, topo_editor::EditorError>) {
    let before = t.snapshot();
    let result = match step {
        Step::Add(e) => t.exec(add_element(&format!("E{e}"), COMPUTE)),
        Step::Remove(e) => t.exec(remove_element(&format!("E{e}"))),
        Step::SetCpus(e, v) => t.exec(set_property(&format!("E{e}"), "cpus", *v)),
        Step::Move(raw) => {
            let len = isize::try_from(before.operations.len()).unwrap();
            t.undo_redo(isize::from(*raw) % (len + 1) - 1)
        }
    };
    (before, result)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_log_stays_linear(steps in proptest::collection::vec(step(), 1..16)) {
        let t = TestEditor::new();
        for step in &steps {
            let (before, result) = apply(&t, step);
            let after = t.snapshot();
            let len = isize::try_from(after.operations.len()).unwrap();

            prop_assert!(after.last_operation_index >= -1 && after.last_operation_index < len);
            prop_assert!(after.last_saved_operation_index <= after.last_operation_index);
            match (&result, step) {
                (Err(_), _) => {
                    prop_assert_eq!(&after, &before);
                }
                (Ok(_), Step::Move(_)) => {
                    prop_assert_eq!(after.operations.len(), before.operations.len());
                }
                (Ok(_), _) => {
                    let kept = usize::try_from(before.last_operation_index + 1).unwrap();
                    prop_assert_eq!(after.operations.len(), kept + 1);
                    prop_assert_eq!(&after.operations[..kept], &before.operations[..kept]);
                    prop_assert_eq!(after.last_operation_index, isize::try_from(kept).unwrap());
                }
            }
        }
    }

    #[test]
    fn prop_replay_reproduces_the_document(steps in proptest::collection::vec(step(), 1..16)) {
        let t = TestEditor::new();
        for step in &steps {
            let _ = apply(&t, step);
        }
        let live = t.snapshot();
        t.undo_redo(-1).unwrap();
        let replayed = if live.last_operation_index >= 0 {
            t.undo_redo(live.last_operation_index).unwrap()
        } else {
            t.snapshot()
        };
        prop_assert_eq!(replayed.fingerprint, live.fingerprint);
        prop_assert_eq!(replayed.document, live.document);
    }
}
